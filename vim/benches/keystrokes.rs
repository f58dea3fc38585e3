//! Keystroke throughput of the engine over a rope buffer.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use vim_engine::{EditorId, Engine, InputEvent, KeyCode, KeyEvent, RopeBuffer};

fn generate_sample_text(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!(
            "This is line {} with some (sample) text for benchmarking vim operations.\n",
            i + 1
        ));
        if i % 10 == 0 {
            text.push('\n'); // paragraph breaks
        }
    }
    text
}

fn setup(lines: usize) -> (Engine, EditorId, RopeBuffer) {
    let mut engine = Engine::new();
    let id = engine.open_editor();
    (engine, id, RopeBuffer::new(&generate_sample_text(lines)).with_caret(0))
}

fn feed(engine: &mut Engine, id: EditorId, buf: &mut RopeBuffer, keys: &[KeyEvent]) {
    for key in keys {
        black_box(engine.handle_event(id, buf, InputEvent::Key(*key)));
    }
}

fn keys(notation: &str) -> Vec<KeyEvent> {
    vim_engine::parse_keys(notation).unwrap()
}

fn benchmark_simple_movements(c: &mut Criterion) {
    let (mut engine, id, mut buf) = setup(1000);
    let sequence = keys("jjllhk");

    c.bench_function("simple movements (hjkl)", |b| {
        b.iter(|| feed(&mut engine, id, &mut buf, &sequence));
    });
}

fn benchmark_word_movements(c: &mut Criterion) {
    let (mut engine, id, mut buf) = setup(1000);
    let sequence = keys("wwwbw");

    c.bench_function("word movements (w/b)", |b| {
        b.iter(|| feed(&mut engine, id, &mut buf, &sequence));
    });
}

fn benchmark_delete_operations(c: &mut Criterion) {
    let (mut engine, id, buf) = setup(1000);
    let sequence = keys("50Gdwdd");

    c.bench_function("delete operations (dw, dd)", |b| {
        b.iter_batched(
            || buf.clone(),
            |mut buf| feed(&mut engine, id, &mut buf, &sequence),
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_visual_selection(c: &mut Criterion) {
    let (mut engine, id, mut buf) = setup(1000);
    let sequence = keys("vwwwwwi(<Esc>");

    c.bench_function("visual selection", |b| {
        b.iter(|| feed(&mut engine, id, &mut buf, &sequence));
    });
}

fn benchmark_search_operations(c: &mut Criterion) {
    let (mut engine, id, mut buf) = setup(1000);

    c.bench_function("search operations", |b| {
        b.iter(|| {
            black_box(engine.handle_event(id, &mut buf, InputEvent::Key(KeyEvent::char('/'))));
            for ch in "line 9".chars() {
                black_box(engine.handle_event(id, &mut buf, InputEvent::ReceivedChar(ch)));
            }
            black_box(engine.handle_event(id, &mut buf, InputEvent::Key(KeyEvent::plain(KeyCode::Enter))));
        });
    });
}

fn benchmark_mapped_keys(c: &mut Criterion) {
    let (mut engine, id, mut buf) = setup(1000);
    for line in ["nnoremap <Leader>j 5j", "nmap J <Leader>j", "nnoremap JK k"] {
        engine.context().execute_ex(line).unwrap();
    }
    let sequence = keys("JKJK");

    c.bench_function("mapping resolution", |b| {
        b.iter(|| feed(&mut engine, id, &mut buf, &sequence));
    });
}

fn benchmark_complex_sequence(c: &mut Criterion) {
    let (mut engine, id, buf) = setup(1000);
    let sequence = keys("5jwwdwihello world<Esc>3.uu");

    c.bench_function("complex keystroke sequence", |b| {
        b.iter_batched(
            || buf.clone(),
            |mut buf| feed(&mut engine, id, &mut buf, &sequence),
            BatchSize::SmallInput,
        );
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = benchmark_simple_movements,
              benchmark_word_movements,
              benchmark_delete_operations,
              benchmark_visual_selection,
              benchmark_search_operations,
              benchmark_mapped_keys,
              benchmark_complex_sequence
}
criterion_main!(benches);

use pretty_assertions::assert_eq;
use vim_engine::{Buffer, Effect, Engine, Error, RegisterSet, RopeBuffer, SelectionType};

mod support;
use support::Harness;
use support::mock_clipboard::MockClipboard;

fn register(h: &Harness, name: char) -> Result<String, Error> {
    h.engine
        .context()
        .registers
        .read()
        .get(name, None)
        .map(|content| content.text)
}

#[test]
fn test_yy_p_puts_line_below() {
    let mut h = Harness::new("a\nb\n");
    h.keys("yyp");
    assert_eq!(h.text(), "a\na\nb\n");
    assert_eq!(h.caret(), 2);
}

#[test]
fn test_xp_swaps_chars() {
    let mut h = Harness::new("ab");
    h.keys("xp");
    assert_eq!(h.text(), "ba");
    assert_eq!(h.caret(), 1);
}

#[test]
fn test_yank_word_put_before() {
    let mut h = Harness::new("foo bar").at(4);
    h.keys("yiw");
    assert_eq!(h.caret(), 4);
    assert_eq!(register(&h, '0').unwrap(), "bar");

    h.keys("P");
    assert_eq!(h.text(), "foo barbar");
    assert_eq!(h.caret(), 6);
}

#[test]
fn test_put_with_count() {
    let mut h = Harness::new("ab");
    h.keys("yl3p");
    assert_eq!(h.text(), "aaaab");
    assert_eq!(h.caret(), 3);
}

#[test]
fn test_named_register_and_append() {
    let mut h = Harness::new("one\ntwo\n");
    h.keys("\"ayyj\"ap");
    assert_eq!(h.text(), "one\ntwo\none\n");
    assert_eq!(h.caret(), 8);

    let mut h = Harness::new("one\ntwo\n");
    h.keys("\"ayyj\"Ayy");
    assert_eq!(register(&h, 'a').unwrap(), "one\ntwo\n");
    let content = h.engine.context().registers.read().get('a', None).unwrap();
    assert_eq!(content.kind, SelectionType::LineWise);
}

#[test]
fn test_numbered_registers_shift() {
    let mut h = Harness::new("1\n2\n3\n");
    h.keys("dddd");
    assert_eq!(h.text(), "3\n");
    assert_eq!(register(&h, '1').unwrap(), "2\n");
    assert_eq!(register(&h, '2').unwrap(), "1\n");
}

#[test]
fn test_small_delete_register() {
    let mut h = Harness::new("abc");
    h.keys("x");
    assert_eq!(register(&h, '-').unwrap(), "a");
    assert_eq!(register(&h, '"').unwrap(), "a");
    assert_eq!(register(&h, '1'), Err(Error::EmptyRegister('1')));
}

#[test]
fn test_black_hole_keeps_unnamed() {
    let mut h = Harness::new("a\nb\n");
    h.keys("yyj\"_dd");
    assert_eq!(h.text(), "a\n");
    h.keys("p");
    assert_eq!(h.text(), "a\na\n");
}

#[test]
fn test_visual_put_swaps_register() {
    let mut h = Harness::new("foo bar");
    h.keys("yiwwviwp");
    assert_eq!(h.text(), "foo foo");
    assert_eq!(register(&h, '"').unwrap(), "bar");
    assert_eq!(h.mode(), vim_engine::Mode::Normal);
}

#[test]
fn test_clipboard_registers() {
    let clipboard = MockClipboard::new();
    let registers = RegisterSet::with_clipboard(Box::new(clipboard.clone())).shared();
    let mut h = Harness::with_engine(Engine::builder().registers(registers).build(), "line\n");

    h.keys("\"+yy");
    assert_eq!(clipboard.contents().as_deref(), Some("line\n"));

    clipboard.put("pasted ");
    h.keys("\"+P");
    assert_eq!(h.text(), "pasted line\n");
}

#[test]
fn test_file_name_register() {
    let mut h = Harness::new("").with_buffer(RopeBuffer::new("x\n").with_file_name("notes.txt"));
    h.keys("\"%p");
    assert_eq!(h.text(), "xnotes.txt\n");

    let effects = h.keys("\"%yy");
    assert!(effects.contains(&Effect::Error(Error::ReadOnlyRegister('%'))));
    assert_eq!(h.mode(), vim_engine::Mode::Normal);
}

#[test]
fn test_empty_register_is_reported() {
    let mut h = Harness::new("abc");
    let effects = h.keys("\"bp");
    assert!(effects.contains(&Effect::Error(Error::EmptyRegister('b'))));
    assert_eq!(h.text(), "abc");
}

#[test]
fn test_insert_register_contents() {
    let mut h = Harness::new("foo");
    h.keys("\"ayiwA<C-r>a<Esc>");
    assert_eq!(h.text(), "foofoo");
    assert_eq!(h.mode(), vim_engine::Mode::Normal);
}

#[test]
fn test_multi_caret_register_holds_primary_text() {
    let mut h = Harness::new("ab\ncd\n");
    h.buf.set_carets(&[0, 3]);
    h.keys("x");
    assert_eq!(h.text(), "b\nd\n");
    assert_eq!(register(&h, '"'), Ok("a".to_string()));
    assert_eq!(register(&h, '-'), Ok("a".to_string()));

    // every caret puts the same text
    h.keys("p");
    assert_eq!(h.text(), "ba\nda\n");
}

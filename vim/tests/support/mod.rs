#![allow(dead_code)]

pub mod mock_buffer;
pub mod mock_clipboard;

use vim_engine::{EditorId, Effect, Engine, Mode, RopeBuffer};

/// Routes engine logs through the test harness' captured output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One editor on one buffer, driven by key notation.
pub struct Harness {
    pub engine: Engine,
    pub id: EditorId,
    pub buf: RopeBuffer,
}

impl Harness {
    pub fn new(text: &str) -> Self {
        Self::with_engine(Engine::new(), text)
    }

    pub fn with_engine(mut engine: Engine, text: &str) -> Self {
        init_tracing();
        let id = engine.open_editor();
        Self {
            engine,
            id,
            buf: RopeBuffer::new(text),
        }
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.buf = self.buf.with_caret(offset);
        self
    }

    pub fn with_buffer(mut self, buf: RopeBuffer) -> Self {
        self.buf = buf;
        self
    }

    pub fn keys(&mut self, notation: &str) -> Vec<Effect> {
        self.engine
            .handle_keys(self.id, &mut self.buf, notation)
            .expect("valid key notation")
    }

    pub fn ex(&mut self, line: &str) -> Vec<Effect> {
        self.engine.execute_ex(self.id, &mut self.buf, line)
    }

    pub fn text(&self) -> String {
        self.buf.text()
    }

    pub fn caret(&self) -> usize {
        self.buf.caret()
    }

    pub fn mode(&self) -> Mode {
        self.engine.mode(self.id).expect("editor is open")
    }
}

use std::sync::Arc;

use parking_lot::Mutex;
use vim_engine::Clipboard;

/// A clipboard whose contents the test keeps a handle on.
#[derive(Default, Debug, Clone)]
pub struct MockClipboard {
    content: Arc<Mutex<Option<String>>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.content.lock().clone()
    }

    pub fn put(&self, text: &str) {
        *self.content.lock() = Some(text.to_string());
    }
}

impl Clipboard for MockClipboard {
    fn get(&mut self) -> Option<String> {
        self.content.lock().clone()
    }

    fn set(&mut self, text: String) {
        *self.content.lock() = Some(text);
    }
}

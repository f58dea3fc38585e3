use ropey::Rope;
use vim_engine::Buffer;

/// A bare [`Buffer`]: no undo, no viewport, only the required methods.
///
/// Counts change brackets so tests can check they stay balanced.
pub struct MockBuffer {
    rope: Rope,
    carets: Vec<usize>,
    pub depth: isize,
    pub changes: usize,
}

impl MockBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            carets: vec![0],
            depth: 0,
            changes: 0,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

impl Buffer for MockBuffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_count(&self) -> usize {
        let lines = self.rope.len_lines();
        // ropey counts the empty line after a trailing newline
        if lines > 1 && self.rope.len_chars() > 0 && self.rope.char(self.rope.len_chars() - 1) == '\n' {
            lines - 1
        } else {
            lines
        }
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.rope.len_chars()).then(|| self.rope.char(offset))
    }

    fn line_start(&self, line: usize) -> usize {
        self.rope.line_to_char(line.min(self.line_count().saturating_sub(1)))
    }

    fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.rope.len_chars());
        self.rope
            .char_to_line(offset)
            .min(self.line_count().saturating_sub(1))
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.rope.len_chars());
        self.rope.slice(start.min(end)..end).to_string()
    }

    fn insert(&mut self, offset: usize, text: &str) {
        self.rope.insert(offset.min(self.rope.len_chars()), text);
    }

    fn delete(&mut self, start: usize, end: usize) {
        let end = end.min(self.rope.len_chars());
        self.rope.remove(start.min(end)..end);
    }

    fn carets(&self) -> Vec<usize> {
        self.carets.clone()
    }

    fn set_carets(&mut self, carets: &[usize]) {
        let len = self.rope.len_chars();
        self.carets = carets.iter().map(|&c| c.min(len)).collect();
        if self.carets.is_empty() {
            self.carets.push(0);
        }
    }

    fn begin_change(&mut self) {
        self.depth += 1;
        self.changes += 1;
    }

    fn end_change(&mut self) {
        self.depth -= 1;
    }
}

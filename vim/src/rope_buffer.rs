//! A [`Buffer`] backed by a `ropey` rope, with snapshot undo.
//!
//! Good enough for tests, benchmarks and small hosts; real editors adapt
//! their own document model instead.

use ropey::Rope;

use crate::traits::Buffer;
use crate::types::Selection;

#[derive(Debug, Clone)]
pub struct RopeBuffer {
    rope: Rope,
    carets: Vec<usize>,
    selections: Vec<Selection>,
    viewport: Option<(usize, usize)>,
    file_name: Option<String>,
    undo: Vec<(Rope, Vec<usize>)>,
    redo: Vec<(Rope, Vec<usize>)>,
    depth: usize,
    /// The open change group already has its snapshot.
    grouped: bool,
}

impl RopeBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            carets: vec![0],
            selections: Vec::new(),
            viewport: None,
            file_name: None,
            undo: Vec::new(),
            redo: Vec::new(),
            depth: 0,
            grouped: false,
        }
    }

    pub fn with_caret(mut self, offset: usize) -> Self {
        self.carets = vec![offset.min(self.rope.len_chars())];
        self
    }

    pub fn with_carets(mut self, carets: &[usize]) -> Self {
        self.set_carets(carets);
        self
    }

    pub fn with_viewport(mut self, first: usize, last: usize) -> Self {
        self.viewport = Some((first, last));
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The primary caret.
    pub fn caret(&self) -> usize {
        self.carets.first().copied().unwrap_or(0)
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }
}

impl Buffer for RopeBuffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_count(&self) -> usize {
        let lines = self.rope.len_lines();
        // ropey reports an empty line after a trailing newline
        if lines > 1 && self.rope.len_chars() > 0 && self.rope.char(self.rope.len_chars() - 1) == '\n'
        {
            lines - 1
        } else {
            lines
        }
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.rope.len_chars()).then(|| self.rope.char(offset))
    }

    fn line_start(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line)
    }

    fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.rope.len_chars());
        self.rope.char_to_line(offset).min(self.last_line())
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    fn insert(&mut self, offset: usize, text: &str) {
        self.checkpoint();
        let offset = offset.min(self.rope.len_chars());
        self.rope.insert(offset, text);
    }

    fn delete(&mut self, start: usize, end: usize) {
        self.checkpoint();
        let len = self.rope.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        if start < end {
            self.rope.remove(start..end);
        }
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

    fn set_selections(&mut self, selections: &[Selection]) {
        self.selections = selections.to_vec();
    }

    fn visible_lines(&self) -> Option<(usize, usize)> {
        self.viewport
    }

    fn file_name(&self) -> Option<String> {
        self.file_name.clone()
    }

    fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some((rope, carets)) => {
                let current = std::mem::replace(&mut self.rope, rope);
                self.redo.push((current, self.carets.clone()));
                self.carets = carets;
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some((rope, carets)) => {
                let current = std::mem::replace(&mut self.rope, rope);
                self.undo.push((current, self.carets.clone()));
                self.carets = carets;
                true
            }
            None => false,
        }
    }

    fn begin_change(&mut self) {
        self.depth += 1;
    }

    fn end_change(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.grouped = false;
        }
    }
}

impl RopeBuffer {
    /// Snapshots before a mutation: once per change group, or per edit
    /// outside of one. Empty groups leave the history alone.
    fn checkpoint(&mut self) {
        if self.grouped {
            return;
        }
        self.undo.push((self.rope.clone(), self.carets.clone()));
        self.redo.clear();
        self.grouped = self.depth > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        let buf = RopeBuffer::new("one\ntwo\n");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.line_end(1), 7);
        assert_eq!(buf.line_text(1), "two");
        assert_eq!(buf.line_of(8), 1);
    }

    #[test]
    fn empty_buffer_has_one_line() {
        let buf = RopeBuffer::new("");
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_end(0), 0);
    }

    #[test]
    fn grouped_changes_undo_together() {
        let mut buf = RopeBuffer::new("abc");
        buf.begin_change();
        buf.delete(0, 1);
        buf.insert(0, "xy");
        buf.end_change();
        assert_eq!(buf.text(), "xybc");
        assert!(buf.undo());
        assert_eq!(buf.text(), "abc");
        assert!(buf.redo());
        assert_eq!(buf.text(), "xybc");
    }

    #[test]
    fn empty_groups_keep_redo() {
        let mut buf = RopeBuffer::new("abc");
        buf.delete(0, 1);
        assert!(buf.undo());
        buf.begin_change();
        buf.end_change();
        assert!(buf.redo());
        assert_eq!(buf.text(), "bc");
    }
}

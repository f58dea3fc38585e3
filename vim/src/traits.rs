use crate::types::{Position, Selection};

/// The host editor's text buffer, as seen by the engine.
///
/// Offsets are char indices. Lines are separated by `'\n'`; a trailing
/// newline terminates the last line rather than starting a new one.
pub trait Buffer {
    // Basic queries
    fn len_chars(&self) -> usize;
    /// Number of lines, at least 1.
    fn line_count(&self) -> usize;
    fn char_at(&self, offset: usize) -> Option<char>;
    /// Offset of the first char of `line`.
    fn line_start(&self, line: usize) -> usize;
    /// Line containing `offset`, clamped to the last line.
    fn line_of(&self, offset: usize) -> usize;
    fn slice(&self, start: usize, end: usize) -> String;

    // Mutation
    fn insert(&mut self, offset: usize, text: &str);
    fn delete(&mut self, start: usize, end: usize);

    // Carets, primary first.
    fn carets(&self) -> Vec<usize>;
    fn set_carets(&mut self, carets: &[usize]);

    /// Display the current visual selections. Empty clears them.
    fn set_selections(&mut self, _selections: &[Selection]) {}

    /// Best-effort scrolling hint.
    fn scroll_to_caret(&mut self) {}

    /// First and last visible lines, if the host has a viewport.
    fn visible_lines(&self) -> Option<(usize, usize)> {
        None
    }

    fn file_name(&self) -> Option<String> {
        None
    }

    // Undo storage belongs to the host.
    fn undo(&mut self) -> bool {
        false
    }
    fn redo(&mut self) -> bool {
        false
    }

    /// Brackets the mutations of one command so the host can group them.
    fn begin_change(&mut self) {}
    fn end_change(&mut self) {}

    /// Offset of the terminator of `line` (or the buffer end).
    fn line_end(&self, line: usize) -> usize {
        let start = self.line_start(line);
        let next = if line + 1 < self.line_count() {
            self.line_start(line + 1)
        } else {
            self.len_chars()
        };
        if next > start && self.char_at(next - 1) == Some('\n') {
            next - 1
        } else {
            next
        }
    }

    fn line_len(&self, line: usize) -> usize {
        self.line_end(line) - self.line_start(line)
    }

    fn line_text(&self, line: usize) -> String {
        self.slice(self.line_start(line), self.line_end(line))
    }

    fn last_line(&self) -> usize {
        self.line_count().saturating_sub(1)
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_of(offset);
        Position {
            line,
            col: offset.saturating_sub(self.line_start(line)),
        }
    }

    /// Offset of `pos`, clamped to the buffer and to the line terminator.
    fn offset_at(&self, pos: Position) -> usize {
        let line = pos.line.min(self.last_line());
        let start = self.line_start(line);
        (start + pos.col).min(self.line_end(line))
    }

    /// Offset of the first non-blank char of `line` (its end if all blank).
    fn first_non_blank(&self, line: usize) -> usize {
        let end = self.line_end(line);
        let mut offset = self.line_start(line);
        while offset < end && matches!(self.char_at(offset), Some(' ' | '\t')) {
            offset += 1;
        }
        offset
    }

    fn replace(&mut self, start: usize, end: usize, text: &str) {
        self.delete(start, end);
        self.insert(start, text);
    }
}

pub trait Clipboard {
    fn get(&mut self) -> Option<String>;
    fn set(&mut self, text: String);
}

/// The Vimscript-like expression evaluator used by `<expr>` mappings.
///
/// The engine treats it as a black box producing a key-notation string.
pub trait Evaluator {
    fn evaluate(&mut self, expression: &str) -> Result<String, String>;
}

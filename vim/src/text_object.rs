//! Text objects: `iw`, `aW`, `is`, `ap`, `i(`, `a"`, ...
//!
//! Objects return half-open ranges, so no inclusive adjustment applies to
//! them afterwards.

use crate::error::{Error, Result};
use crate::motion::{CharClass, char_class, find_unmatched, sentence_starts};
use crate::traits::Buffer;
use crate::types::{SelectionType, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObject {
    Word { big: bool, around: bool },
    Sentence { around: bool },
    Paragraph { around: bool },
    Block { open: char, close: char, around: bool },
    Quote { quote: char, around: bool },
}

impl TextObject {
    pub fn selection_type(&self) -> SelectionType {
        match self {
            TextObject::Paragraph { .. } => SelectionType::LineWise,
            _ => SelectionType::CharWise,
        }
    }

    /// The object around `caret`, repeated `count` times.
    pub fn range(&self, buf: &dyn Buffer, caret: usize, count: usize) -> Result<TextRange> {
        let count = count.max(1);
        match *self {
            TextObject::Word { big, around } => word(buf, caret, count, big, around),
            TextObject::Sentence { around } => sentence(buf, caret, count, around),
            TextObject::Paragraph { around } => paragraph(buf, caret, count, around),
            TextObject::Block { open, close, around } => block(buf, caret, count, open, close, around),
            TextObject::Quote { quote, around } => quoted(buf, caret, quote, around),
        }
    }
}

fn class(buf: &dyn Buffer, offset: usize, big: bool) -> Option<CharClass> {
    match buf.char_at(offset) {
        Some('\n') | None => None,
        Some(c) => Some(char_class(c, big)),
    }
}

/// End of the run of `class` chars starting at `offset`, on one line.
fn run_end(buf: &dyn Buffer, offset: usize, big: bool) -> usize {
    let kind = class(buf, offset, big);
    let mut end = offset;
    while kind.is_some() && class(buf, end, big) == kind {
        end += 1;
    }
    end
}

fn run_start(buf: &dyn Buffer, offset: usize, big: bool) -> usize {
    let kind = class(buf, offset, big);
    let mut start = offset;
    while start > 0 && kind.is_some() && class(buf, start - 1, big) == kind {
        start -= 1;
    }
    start
}

fn word(buf: &dyn Buffer, caret: usize, count: usize, big: bool, around: bool) -> Result<TextRange> {
    if class(buf, caret, big).is_none() {
        return Err(Error::InvalidMotion);
    }
    let start = run_start(buf, caret, big);
    let on_blank = class(buf, caret, big) == Some(CharClass::Blank);
    let mut end = start;
    for _ in 0..count {
        if class(buf, end, big).is_none() {
            break;
        }
        end = run_end(buf, end, big);
        if around {
            // `aw` on a word takes the following blanks, on blanks the word.
            let next = class(buf, end, big);
            let wanted = if on_blank { next != Some(CharClass::Blank) } else { next == Some(CharClass::Blank) };
            if next.is_some() && wanted {
                end = run_end(buf, end, big);
            }
        }
    }
    let mut start = start;
    if around && !on_blank && class(buf, end - 1, big) != Some(CharClass::Blank) {
        // No trailing blanks: take the leading ones instead.
        while start > 0 && class(buf, start - 1, big) == Some(CharClass::Blank) {
            start -= 1;
        }
    }
    Ok(TextRange::new(start, end))
}

fn sentence(buf: &dyn Buffer, caret: usize, count: usize, around: bool) -> Result<TextRange> {
    let starts = sentence_starts(buf);
    let len = buf.len_chars();
    let index = starts.iter().rposition(|&s| s <= caret).unwrap_or(0);
    let start = starts.get(index).copied().unwrap_or(0);
    let mut end = starts.get(index + count).copied().unwrap_or(len);
    if !around {
        while end > start && buf.char_at(end - 1).is_some_and(char::is_whitespace) {
            end -= 1;
        }
    }
    if start >= end {
        return Err(Error::InvalidMotion);
    }
    Ok(TextRange::new(start, end))
}

fn paragraph(buf: &dyn Buffer, caret: usize, count: usize, around: bool) -> Result<TextRange> {
    let blank = |line: usize| buf.line_len(line) == 0;
    let last = buf.last_line();
    let first = buf.line_of(caret);
    let mut start = first;
    while start > 0 && blank(start - 1) == blank(first) {
        start -= 1;
    }
    let mut line = first;
    for i in 0..count {
        if i > 0 {
            if line >= last {
                return Err(Error::InvalidMotion);
            }
            line += 1;
        }
        let kind = blank(line);
        while line < last && blank(line + 1) == kind {
            line += 1;
        }
        if around && !kind && line < last {
            line += 1;
            while line < last && blank(line + 1) {
                line += 1;
            }
        }
    }
    if around && !blank(first) && !(line > first && blank(line)) {
        // No blank lines after the paragraph: take the ones before it.
        while start > 0 && blank(start - 1) {
            start -= 1;
        }
    }
    let end = (buf.line_end(line) + 1).min(buf.len_chars());
    Ok(TextRange::new(buf.line_start(start), end))
}

fn block(
    buf: &dyn Buffer,
    caret: usize,
    count: usize,
    open: char,
    close: char,
    around: bool,
) -> Result<TextRange> {
    let mut from = caret;
    let mut left = None;
    for i in 0..count {
        let found = if i == 0 && buf.char_at(from) == Some(open) {
            Some(from)
        } else {
            find_unmatched(buf, from, open, close, false)
        };
        match found {
            Some(offset) => {
                left = Some(offset);
                from = offset;
            }
            None => return Err(Error::InvalidMotion),
        }
    }
    let left = left.ok_or(Error::InvalidMotion)?;
    let right = find_unmatched(buf, left, open, close, true).ok_or(Error::InvalidMotion)?;
    if around {
        return Ok(TextRange::new(left, right + 1));
    }
    let mut start = left + 1;
    let mut end = right;
    if buf.char_at(start) == Some('\n') {
        start += 1;
        let close_line = buf.line_of(right);
        let line_start = buf.line_start(close_line);
        if line_start > start
            && buf.slice(line_start, right).chars().all(|c| c == ' ' || c == '\t')
        {
            end = line_start;
        }
    }
    Ok(TextRange::new(start, end.max(start)))
}

fn quoted(buf: &dyn Buffer, caret: usize, quote: char, around: bool) -> Result<TextRange> {
    let line = buf.line_of(caret);
    let (line_start, line_end) = (buf.line_start(line), buf.line_end(line));
    let mut quotes = Vec::new();
    let mut offset = line_start;
    while offset < line_end {
        match buf.char_at(offset) {
            Some('\\') => offset += 1,
            Some(c) if c == quote => quotes.push(offset),
            _ => {}
        }
        offset += 1;
    }
    let (left, right) = quotes
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .find(|&(l, r)| l <= caret && caret <= r)
        .or_else(|| {
            quotes
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .find(|&(l, _)| l > caret)
        })
        .ok_or(Error::InvalidMotion)?;
    if !around {
        return Ok(TextRange::new(left + 1, right));
    }
    let mut end = right + 1;
    while end < line_end && matches!(buf.char_at(end), Some(' ' | '\t')) {
        end += 1;
    }
    let mut start = left;
    if end == right + 1 {
        while start > line_start && matches!(buf.char_at(start - 1), Some(' ' | '\t')) {
            start -= 1;
        }
    }
    Ok(TextRange::new(start, end))
}

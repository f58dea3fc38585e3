//! Applying operators and the editing actions built on the same primitives.
//!
//! Every multi-range edit is applied from the highest offset down so the
//! offsets of ranges not yet processed stay valid, and every mutation keeps
//! the marks in step.

use tracing::debug;

use crate::command::Operator;
use crate::error::{Error, Result};
use crate::marks::Marks;
use crate::options::IndentConfig;
use crate::range::ResolvedRange;
use crate::register::{RegisterContent, RegisterSet};
use crate::traits::Buffer;
use crate::types::SelectionType;

pub(crate) fn insert_text(buf: &mut dyn Buffer, marks: &mut Marks, offset: usize, text: &str) {
    if text.is_empty() {
        return;
    }
    buf.insert(offset, text);
    marks.on_insert(offset, text.chars().count());
}

pub(crate) fn delete_text(buf: &mut dyn Buffer, marks: &mut Marks, start: usize, end: usize) {
    if start >= end {
        return;
    }
    buf.delete(start, end);
    marks.on_delete(start, end);
}

fn replace_text(buf: &mut dyn Buffer, marks: &mut Marks, start: usize, end: usize, text: &str) {
    if buf.slice(start, end) == text {
        return;
    }
    delete_text(buf, marks, start, end);
    insert_text(buf, marks, start, text);
}

/// Where the carets end up, and whether Insert mode follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorOutcome {
    pub carets: Vec<usize>,
    pub insert: bool,
}

pub struct OperatorRequest<'a> {
    pub operator: Operator,
    /// One range per caret, primary first.
    pub targets: &'a [ResolvedRange],
    pub carets: &'a [usize],
    pub register: Option<char>,
    pub indent: IndentConfig,
    /// Shift steps for `>`/`<` (a count in Visual mode).
    pub shifts: usize,
}

/// The register payload for `range`.
pub fn register_content(buf: &dyn Buffer, target: &ResolvedRange) -> RegisterContent {
    match target.kind {
        SelectionType::CharWise => {
            RegisterContent::charwise(buf.slice(target.range.start(), target.range.end()))
        }
        SelectionType::LineWise => {
            RegisterContent::linewise(buf.slice(target.range.start(), target.range.end()))
        }
        SelectionType::BlockWise => RegisterContent::blockwise(
            target.range.pairs().map(|(s, e)| buf.slice(s, e)).collect(),
        ),
    }
}

/// Applies `req` to every target. Register failures leave the buffer untouched.
pub fn apply_operator(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    registers: &mut RegisterSet,
    req: OperatorRequest<'_>,
) -> Result<OperatorOutcome> {
    let primary = req.targets.first().ok_or(Error::InvalidMotion)?;
    match req.operator {
        Operator::Yank => registers.store_yank(req.register, register_content(buf, primary))?,
        Operator::Delete | Operator::Change => {
            registers.store_delete(req.register, register_content(buf, primary))?
        }
        _ => {}
    }
    debug!(operator = ?req.operator, targets = req.targets.len(), "apply operator");

    let mut order: Vec<usize> = (0..req.targets.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(req.targets[i].range.start()));

    let mut results: Vec<Vec<usize>> = vec![Vec::new(); req.targets.len()];
    buf.begin_change();
    for i in order {
        let target = &req.targets[i];
        let caret = req.carets.get(i).copied().unwrap_or(target.range.start());
        let before = buf.len_chars();
        let (edit_at, carets) = apply_one(buf, marks, &req, target, caret);
        let delta = buf.len_chars() as isize - before as isize;
        // Carets of ranges above this one move with the edit.
        for done in results.iter_mut().flatten() {
            if *done > edit_at {
                *done = done.saturating_add_signed(delta);
            }
        }
        results[i] = carets;
    }
    buf.end_change();

    let start = primary.range.start();
    marks.set_special('[', start);
    if req.operator.is_change() {
        marks.set_special('.', start);
    }
    let end = match req.operator {
        Operator::Delete | Operator::Change => start,
        _ => primary.range.end().saturating_sub(1).max(start),
    };
    marks.set_special(']', end);

    Ok(OperatorOutcome {
        carets: results.into_iter().flatten().collect(),
        insert: req.operator == Operator::Change,
    })
}

/// Applies the operator to one target; returns the lowest edited offset and
/// the resulting carets.
fn apply_one(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    req: &OperatorRequest<'_>,
    target: &ResolvedRange,
    caret: usize,
) -> (usize, Vec<usize>) {
    let (start, end) = (target.range.start(), target.range.end());
    match (req.operator, target.kind) {
        (Operator::Yank, SelectionType::LineWise) => {
            let line = buf.line_of(start);
            let caret = if buf.line_of(caret) > line {
                buf.offset_at(crate::types::Position::new(line, buf.position(caret).col))
            } else {
                caret
            };
            (start, vec![caret])
        }
        (Operator::Yank, _) => (start, vec![start.min(caret)]),
        (Operator::Delete, SelectionType::LineWise) => {
            let mut from = start;
            if end == buf.len_chars() && from > 0 && buf.char_at(end - 1) != Some('\n') {
                // The last line has no terminator: take the one before it.
                from -= 1;
            }
            delete_text(buf, marks, from, end);
            let line = buf.line_of(from.min(buf.len_chars().saturating_sub(1)));
            (from, vec![buf.first_non_blank(line)])
        }
        (Operator::Change, SelectionType::LineWise) => {
            let stop = if end > start && buf.char_at(end - 1) == Some('\n') {
                end - 1
            } else {
                end
            };
            delete_text(buf, marks, start, stop);
            (start, vec![start])
        }
        (Operator::Delete | Operator::Change, _) => {
            for (s, e) in target.range.pairs().rev() {
                delete_text(buf, marks, s, e);
            }
            let carets = if req.operator == Operator::Change && target.kind == SelectionType::BlockWise {
                // One caret per block line; earlier lines shrink later starts.
                let mut removed = 0;
                target
                    .range
                    .pairs()
                    .map(|(s, e)| {
                        let at = s - removed;
                        removed += e - s;
                        at
                    })
                    .collect()
            } else {
                vec![start]
            };
            (start, carets)
        }
        (Operator::IndentRight | Operator::IndentLeft, _) => {
            let first = buf.line_of(start);
            let last = buf.line_of(end.saturating_sub(1).max(start));
            for line in (first..=last).rev() {
                shift_line(buf, marks, line, req.indent, req.operator == Operator::IndentRight, req.shifts.max(1));
            }
            (start, vec![buf.first_non_blank(first)])
        }
        (_, _) => {
            for (s, e) in target.range.pairs().rev() {
                let text = buf.slice(s, e);
                let mapped: String = text.chars().map(|c| map_case(req.operator, c)).collect();
                replace_text(buf, marks, s, e, &mapped);
            }
            let caret = if target.kind == SelectionType::LineWise && target.range.contains(caret) {
                caret
            } else {
                start
            };
            (start, vec![caret])
        }
    }
}

fn map_case(op: Operator, c: char) -> char {
    match op {
        Operator::Lowercase => c.to_lowercase().next().unwrap_or(c),
        Operator::Uppercase => c.to_uppercase().next().unwrap_or(c),
        Operator::ToggleCase => toggle_case(c),
        Operator::Rot13 => match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        },
        _ => c,
    }
}

pub(crate) fn toggle_case(c: char) -> char {
    if c.is_uppercase() {
        c.to_lowercase().next().unwrap_or(c)
    } else {
        c.to_uppercase().next().unwrap_or(c)
    }
}

fn shift_line(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    line: usize,
    indent: IndentConfig,
    right: bool,
    steps: usize,
) {
    let text = buf.line_text(line);
    if right && text.is_empty() {
        return;
    }
    let current = indent.measure(&text);
    let wanted = if right {
        current + indent.width * steps
    } else {
        current.saturating_sub(indent.width * steps)
    };
    let leading = text.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    let start = buf.line_start(line);
    replace_text(buf, marks, start, start + leading, &indent.indent_string(wanted));
}

/// `p`, `P`, `gp`, `gP` for one caret. Returns the new caret.
pub fn put(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    content: &RegisterContent,
    caret: usize,
    before: bool,
    cursor_after: bool,
    count: usize,
) -> usize {
    let count = count.max(1);
    match content.kind {
        SelectionType::CharWise => {
            let line = buf.line_of(caret);
            let at = if before || buf.line_len(line) == 0 {
                caret
            } else {
                (caret + 1).min(buf.line_end(line))
            };
            let text = content.text.repeat(count);
            let len = text.chars().count();
            insert_text(buf, marks, at, &text);
            marks.set_special('[', at);
            marks.set_special(']', at + len.saturating_sub(1));
            if cursor_after {
                at + len
            } else {
                at + len.saturating_sub(1)
            }
        }
        SelectionType::LineWise => {
            let line = buf.line_of(caret);
            let mut text = content.text.repeat(count);
            let at = if before {
                buf.line_start(line)
            } else {
                let end = buf.line_end(line);
                if end >= buf.len_chars() {
                    // No terminator to put after: supply one, drop the last.
                    text.pop();
                    text.insert(0, '\n');
                    end
                } else {
                    end + 1
                }
            };
            let first = if at == buf.line_end(line) && !before { at + 1 } else { at };
            insert_text(buf, marks, at, &text);
            marks.set_special('[', first);
            let lines = content.lines().len() * count;
            let last_line = buf.line_of(first) + lines - 1;
            marks.set_special(']', buf.line_start(last_line));
            if cursor_after {
                let next = (last_line + 1).min(buf.line_count());
                if next >= buf.line_count() {
                    buf.len_chars()
                } else {
                    buf.line_start(next)
                }
            } else {
                buf.first_non_blank(buf.line_of(first))
            }
        }
        SelectionType::BlockWise => {
            let pos = buf.position(caret);
            let col = if before || buf.line_len(pos.line) == 0 {
                pos.col
            } else {
                pos.col + 1
            };
            let pieces = content.lines();
            let width = pieces.iter().map(|p| p.chars().count()).max().unwrap_or(0);
            for (i, piece) in pieces.iter().enumerate().rev() {
                let line = pos.line + i;
                while line > buf.last_line() {
                    let end = buf.len_chars();
                    insert_text(buf, marks, end, "\n");
                }
                let line_len = buf.line_len(line);
                let start = buf.line_start(line);
                let mut text = String::new();
                if line_len < col {
                    text.push_str(&" ".repeat(col - line_len));
                }
                let mut chunk = String::new();
                for _ in 0..count {
                    chunk.push_str(piece);
                    if col < line_len {
                        // Keep the columns aligned when text follows.
                        chunk.push_str(&" ".repeat(width - piece.chars().count()));
                    }
                }
                text.push_str(&chunk);
                insert_text(buf, marks, start + col.min(line_len), &text);
            }
            let top = buf.line_start(pos.line) + col;
            marks.set_special('[', top);
            top
        }
    }
}

/// `J`/`gJ`: joins `count` lines (at least two) starting at `line`.
pub fn join_lines(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    line: usize,
    count: usize,
    spaces: bool,
) -> Result<usize> {
    let joins = count.max(2) - 1;
    if line + 1 > buf.last_line() {
        return Err(Error::InvalidMotion);
    }
    let joins = joins.min(buf.last_line() - line);
    let mut caret = buf.line_start(line);
    for _ in 0..joins {
        let end = buf.line_end(line);
        let next_start = end + 1;
        let mut skip = next_start;
        let next_end = buf.line_end(line + 1);
        if spaces {
            while skip < next_end && matches!(buf.char_at(skip), Some(' ' | '\t')) {
                skip += 1;
            }
        }
        let line_start = buf.line_start(line);
        let ends_blank = end > line_start && matches!(buf.char_at(end - 1), Some(' ' | '\t'));
        let separator = if !spaces
            || end == line_start
            || ends_blank
            || skip == next_end
            || buf.char_at(skip) == Some(')')
        {
            ""
        } else {
            " "
        };
        replace_text(buf, marks, end, skip, separator);
        caret = end;
    }
    marks.set_special('.', caret);
    Ok(caret)
}

/// `r{char}` over `count` chars from `caret`. Returns the new caret.
pub fn replace_chars(
    buf: &mut dyn Buffer,
    marks: &mut Marks,
    caret: usize,
    count: usize,
    ch: char,
) -> Result<usize> {
    let line = buf.line_of(caret);
    let end = caret + count.max(1);
    if end > buf.line_end(line) {
        return Err(Error::InvalidMotion);
    }
    if ch == '\n' {
        replace_text(buf, marks, caret, end, "\n");
        return Ok(caret + 1);
    }
    let text: String = std::iter::repeat_n(ch, end - caret).collect();
    replace_text(buf, marks, caret, end, &text);
    marks.set_special('.', caret);
    Ok(end - 1)
}

/// Replaces every char of `range` (keeping line terminators) with `ch`.
pub fn replace_range(buf: &mut dyn Buffer, marks: &mut Marks, target: &ResolvedRange, ch: char) {
    for (s, e) in target.range.pairs().rev() {
        let text: String = buf
            .slice(s, e)
            .chars()
            .map(|c| if c == '\n' { c } else { ch })
            .collect();
        replace_text(buf, marks, s, e, &text);
    }
}

/// `~` in Normal mode. Returns the new caret.
pub fn toggle_case_chars(buf: &mut dyn Buffer, marks: &mut Marks, caret: usize, count: usize) -> Result<usize> {
    let line = buf.line_of(caret);
    let end = (caret + count.max(1)).min(buf.line_end(line));
    if caret >= end {
        return Err(Error::InvalidMotion);
    }
    let text: String = buf.slice(caret, end).chars().map(toggle_case).collect();
    replace_text(buf, marks, caret, end, &text);
    marks.set_special('.', caret);
    Ok(end.min(buf.line_end(line).saturating_sub(1).max(buf.line_start(line))))
}

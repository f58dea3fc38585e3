//! Motion offset computations.
//!
//! Every motion is a pure function of the buffer and a [`MotionContext`]
//! returning the target offset, or [`Error::InvalidMotion`] when no movement
//! is possible. Callers decide what to do with the offset (move carets,
//! extend a selection, build an operator range).

use tracing::trace;

use crate::command::{Argument, CommandFlags, Operator};
use crate::error::{Error, Result};
use crate::marks::Marks;
use crate::options::Options;
use crate::search::{self, SearchDirection};
use crate::traits::Buffer;
use crate::types::Mode;

/// A host-provided motion: `(buffer, context) -> target offset`.
pub type MotionFn = fn(&dyn Buffer, &MotionContext<'_>) -> Result<usize>;

/// Not comparable: `Custom` holds a function pointer. Commands compare by
/// their registry id instead.
#[derive(Debug, Clone, Copy)]
pub enum Motion {
    /// `h`, `<BS>`, `<Left>`; the char is the `whichwrap` flag allowing a
    /// wrap to the previous line.
    Left { wrap: char },
    /// `l`, `<Space>`, `<Right>`.
    Right { wrap: char },
    Up,
    Down,
    LineStart,
    FirstNonBlank,
    LineEnd,
    LastNonBlank,
    Column,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEndForward { big: bool },
    WordEndBackward { big: bool },
    GotoLineFirst,
    GotoLineLast,
    /// `+`, `<CR>`
    NextLineStart,
    /// `-`
    PrevLineStart,
    /// `_`, also the doubled-operator motion (`dd`).
    CurrentLine,
    ParagraphForward,
    ParagraphBackward,
    SentenceForward,
    SentenceBackward,
    /// `%`, or `{count}%` to a line percentage.
    MatchPair,
    FindChar { forward: bool, till: bool },
    RepeatFind { reverse: bool },
    MarkLine,
    MarkExact,
    ScreenTop,
    ScreenMiddle,
    ScreenBottom,
    ScrollDown,
    ScrollUp,
    Search { forward: bool },
    SearchNext { reverse: bool },
    SearchWord { forward: bool },
    Custom(MotionFn),
}

/// The last `f`/`F`/`t`/`T`, repeated by `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastFind {
    pub ch: char,
    pub forward: bool,
    pub till: bool,
}

/// Everything a motion may read.
pub struct MotionContext<'a> {
    pub caret: usize,
    pub count: usize,
    /// 0 when no count was typed.
    pub raw_count: usize,
    pub argument: Option<&'a Argument>,
    pub mode: Mode,
    pub operator: Option<Operator>,
    pub options: &'a Options,
    /// Preferred column for vertical motions (`usize::MAX` after `$`).
    pub column: Option<usize>,
    pub marks: &'a Marks,
    pub last_find: Option<LastFind>,
    pub last_search: Option<(&'a str, SearchDirection)>,
}

impl Motion {
    /// Flags that depend on the count or on remembered state.
    pub fn adjust_flags(&self, flags: CommandFlags, ctx: &MotionContext<'_>) -> CommandFlags {
        let charwise = |inclusive: bool| {
            let mut flags = flags - (CommandFlags::INCLUSIVE | CommandFlags::EXCLUSIVE);
            flags |= if inclusive {
                CommandFlags::INCLUSIVE
            } else {
                CommandFlags::EXCLUSIVE
            };
            flags
        };
        match self {
            Motion::MatchPair if ctx.raw_count > 0 => {
                (flags - CommandFlags::INCLUSIVE) | CommandFlags::LINEWISE
            }
            Motion::RepeatFind { reverse } => match ctx.last_find {
                Some(last) => charwise(last.forward != *reverse),
                None => flags,
            },
            _ => flags,
        }
    }

    pub fn offset(&self, buf: &dyn Buffer, ctx: &MotionContext<'_>) -> Result<usize> {
        let offset = match *self {
            Motion::Left { wrap } => move_left(buf, ctx, wrap),
            Motion::Right { wrap } => move_right(buf, ctx, wrap),
            Motion::Up => move_vertical(buf, ctx, false),
            Motion::Down => move_vertical(buf, ctx, true),
            Motion::LineStart => Ok(buf.line_start(buf.line_of(ctx.caret))),
            Motion::FirstNonBlank => Ok(buf.first_non_blank(buf.line_of(ctx.caret))),
            Motion::LineEnd => {
                let line = target_line_down(buf, ctx.caret, ctx.count - 1)?;
                Ok(last_char(buf, line))
            }
            Motion::LastNonBlank => {
                let line = target_line_down(buf, ctx.caret, ctx.count - 1)?;
                Ok(last_non_blank(buf, line))
            }
            Motion::Column => {
                let line = buf.line_of(ctx.caret);
                let start = buf.line_start(line);
                Ok((start + ctx.count - 1).min(last_char(buf, line).max(start)))
            }
            Motion::WordForward { big } => word_forward(buf, ctx.caret, ctx.count, big),
            Motion::WordBackward { big } => word_backward(buf, ctx.caret, ctx.count, big),
            Motion::WordEndForward { big } => word_end_forward(buf, ctx.caret, ctx.count, big, false),
            Motion::WordEndBackward { big } => word_end_backward(buf, ctx.caret, ctx.count, big),
            Motion::GotoLineFirst => {
                let line = if ctx.raw_count == 0 { 0 } else { ctx.count - 1 };
                Ok(buf.first_non_blank(line.min(buf.last_line())))
            }
            Motion::GotoLineLast => {
                let line = if ctx.raw_count == 0 {
                    buf.last_line()
                } else {
                    ctx.count - 1
                };
                Ok(buf.first_non_blank(line.min(buf.last_line())))
            }
            Motion::NextLineStart => {
                let line = buf.line_of(ctx.caret);
                if line >= buf.last_line() {
                    return Err(Error::InvalidMotion);
                }
                Ok(buf.first_non_blank((line + ctx.count).min(buf.last_line())))
            }
            Motion::PrevLineStart => {
                let line = buf.line_of(ctx.caret);
                if line == 0 {
                    return Err(Error::InvalidMotion);
                }
                Ok(buf.first_non_blank(line.saturating_sub(ctx.count)))
            }
            Motion::CurrentLine => {
                let line = target_line_down(buf, ctx.caret, ctx.count - 1)?;
                Ok(buf.first_non_blank(line))
            }
            Motion::ParagraphForward => paragraph(buf, ctx.caret, ctx.count, true),
            Motion::ParagraphBackward => paragraph(buf, ctx.caret, ctx.count, false),
            Motion::SentenceForward => sentence(buf, ctx.caret, ctx.count, true),
            Motion::SentenceBackward => sentence(buf, ctx.caret, ctx.count, false),
            Motion::MatchPair if ctx.raw_count > 0 => {
                let percent = ctx.count.min(100);
                let line = (buf.line_count() * percent).div_ceil(100).saturating_sub(1);
                Ok(buf.first_non_blank(line.min(buf.last_line())))
            }
            Motion::MatchPair => match_pair(buf, ctx.caret),
            Motion::FindChar { forward, till } => {
                let ch = ctx
                    .argument
                    .and_then(Argument::as_char)
                    .ok_or(Error::InvalidMotion)?;
                find_char(buf, ctx.caret, ctx.count, ch, forward, till)
            }
            Motion::RepeatFind { reverse } => {
                let last = ctx.last_find.ok_or(Error::InvalidMotion)?;
                let forward = last.forward != reverse;
                // A repeated `t` must not get stuck right before its target.
                let from = match (last.till, forward) {
                    (true, true) => ctx.caret + 1,
                    (true, false) => ctx.caret.saturating_sub(1),
                    _ => ctx.caret,
                };
                find_char(buf, from, ctx.count, last.ch, forward, last.till)
                    .or_else(|_| find_char(buf, ctx.caret, ctx.count, last.ch, forward, last.till))
            }
            Motion::MarkLine => {
                let name = mark_name(ctx)?;
                let offset = ctx.marks.get(name)?;
                Ok(buf.first_non_blank(buf.line_of(offset)))
            }
            Motion::MarkExact => {
                let name = mark_name(ctx)?;
                Ok(ctx.marks.get(name)?.min(buf.len_chars()))
            }
            Motion::ScreenTop | Motion::ScreenMiddle | Motion::ScreenBottom => {
                let (top, bottom) = buf.visible_lines().unwrap_or((0, buf.last_line()));
                let bottom = bottom.min(buf.last_line());
                let line = match self {
                    Motion::ScreenTop => (top + ctx.count - 1).min(bottom),
                    Motion::ScreenBottom => bottom.saturating_sub(ctx.count - 1).max(top),
                    _ => top + (bottom - top) / 2,
                };
                Ok(buf.first_non_blank(line))
            }
            Motion::ScrollDown | Motion::ScrollUp => {
                let amount = scroll_amount(buf, ctx);
                let down = matches!(self, Motion::ScrollDown);
                let line = buf.line_of(ctx.caret);
                if (down && line >= buf.last_line()) || (!down && line == 0) {
                    return Err(Error::InvalidMotion);
                }
                let target = if down {
                    (line + amount).min(buf.last_line())
                } else {
                    line.saturating_sub(amount)
                };
                Ok(column_offset(buf, target, ctx.column.unwrap_or(ctx.caret - buf.line_start(line)), ctx.mode))
            }
            Motion::Search { forward } => {
                let pattern = match ctx.argument {
                    Some(Argument::ExString(p)) if !p.is_empty() => p.as_str(),
                    _ => ctx.last_search.map(|(p, _)| p).ok_or(Error::InvalidMotion)?,
                };
                let direction = if forward {
                    SearchDirection::Forward
                } else {
                    SearchDirection::Backward
                };
                search::find(buf, ctx.caret, pattern, direction, ctx.count, ctx.options)
            }
            Motion::SearchNext { reverse } => {
                let (pattern, direction) = ctx
                    .last_search
                    .ok_or_else(|| Error::PatternNotFound(String::new()))?;
                let direction = if reverse { direction.reversed() } else { direction };
                search::find(buf, ctx.caret, pattern, direction, ctx.count, ctx.options)
            }
            Motion::SearchWord { forward } => {
                let pattern = search::word_pattern(buf, ctx.caret).ok_or(Error::InvalidMotion)?;
                let direction = if forward {
                    SearchDirection::Forward
                } else {
                    SearchDirection::Backward
                };
                search::find(buf, ctx.caret, &pattern, direction, ctx.count, ctx.options)
            }
            Motion::Custom(f) => f(buf, ctx),
        }?;
        trace!(?self, from = ctx.caret, to = offset, "motion");
        Ok(offset)
    }
}

fn mark_name(ctx: &MotionContext<'_>) -> Result<char> {
    ctx.argument
        .and_then(Argument::as_char)
        .ok_or(Error::InvalidMotion)
}

/// Lines moved by `<C-d>`/`<C-u>`.
pub fn scroll_amount(buf: &dyn Buffer, ctx: &MotionContext<'_>) -> usize {
    if ctx.raw_count > 0 {
        return ctx.count;
    }
    if ctx.options.scroll > 0 {
        return ctx.options.scroll;
    }
    match buf.visible_lines() {
        Some((top, bottom)) => ((bottom.saturating_sub(top) + 1) / 2).max(1),
        None => 10,
    }
}

/// Offset of the last character of `line` (its start when empty).
pub fn last_char(buf: &dyn Buffer, line: usize) -> usize {
    let start = buf.line_start(line);
    buf.line_end(line).saturating_sub(1).max(start)
}

fn last_non_blank(buf: &dyn Buffer, line: usize) -> usize {
    let start = buf.line_start(line);
    let mut offset = buf.line_end(line);
    while offset > start {
        match buf.char_at(offset - 1) {
            Some(' ' | '\t') => offset -= 1,
            _ => break,
        }
    }
    offset.saturating_sub(1).max(start)
}

fn target_line_down(buf: &dyn Buffer, caret: usize, lines: usize) -> Result<usize> {
    let line = buf.line_of(caret);
    if lines > 0 && line >= buf.last_line() {
        return Err(Error::InvalidMotion);
    }
    Ok((line + lines).min(buf.last_line()))
}

/// Offset of `col` in `line`, clamped to what `mode` allows.
pub fn column_offset(buf: &dyn Buffer, line: usize, col: usize, mode: Mode) -> usize {
    let start = buf.line_start(line);
    let len = buf.line_len(line);
    let max = match mode {
        Mode::Insert | Mode::Replace | Mode::OpPending { .. } => len,
        // Visual mode reaches the line terminator only after `$`.
        Mode::Visual(_) | Mode::Select(_) if col == usize::MAX => len,
        _ => len.saturating_sub(1),
    };
    start + col.min(max)
}

fn move_left(buf: &dyn Buffer, ctx: &MotionContext<'_>, wrap: char) -> Result<usize> {
    let wraps = ctx.options.wraps(&wrap.to_string());
    let mut offset = ctx.caret;
    for _ in 0..ctx.count {
        let line = buf.line_of(offset);
        if offset > buf.line_start(line) {
            offset -= 1;
        } else if wraps && line > 0 {
            offset = last_char(buf, line - 1);
        } else {
            break;
        }
    }
    if offset == ctx.caret {
        Err(Error::InvalidMotion)
    } else {
        Ok(offset)
    }
}

fn move_right(buf: &dyn Buffer, ctx: &MotionContext<'_>, wrap: char) -> Result<usize> {
    let wraps = ctx.options.wraps(&wrap.to_string());
    let past_end = matches!(ctx.mode, Mode::Insert | Mode::Replace | Mode::OpPending { .. })
        || ctx.options.allows_onemore();
    let mut offset = ctx.caret;
    for _ in 0..ctx.count {
        let line = buf.line_of(offset);
        let end = buf.line_end(line);
        let limit = if past_end || end == buf.line_start(line) {
            end
        } else {
            end - 1
        };
        if offset < limit {
            offset += 1;
        } else if wraps && line < buf.last_line() {
            offset = buf.line_start(line + 1);
        } else {
            break;
        }
    }
    if offset == ctx.caret {
        Err(Error::InvalidMotion)
    } else {
        Ok(offset)
    }
}

fn move_vertical(buf: &dyn Buffer, ctx: &MotionContext<'_>, down: bool) -> Result<usize> {
    let line = buf.line_of(ctx.caret);
    if (down && line >= buf.last_line()) || (!down && line == 0) {
        return Err(Error::InvalidMotion);
    }
    let target = if down {
        (line + ctx.count).min(buf.last_line())
    } else {
        line.saturating_sub(ctx.count)
    };
    let col = ctx.column.unwrap_or(ctx.caret - buf.line_start(line));
    Ok(column_offset(buf, target, col, ctx.mode))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Blank,
    Punct,
    Word,
}

pub(crate) fn char_class(c: char, big: bool) -> CharClass {
    if c.is_whitespace() {
        CharClass::Blank
    } else if big || c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

fn class_at(buf: &dyn Buffer, offset: usize, big: bool) -> CharClass {
    buf.char_at(offset)
        .map_or(CharClass::Blank, |c| char_class(c, big))
}

fn is_empty_line_at(buf: &dyn Buffer, offset: usize) -> bool {
    let line = buf.line_of(offset);
    buf.line_start(line) == offset && buf.line_len(line) == 0
}

pub(crate) fn word_forward(buf: &dyn Buffer, caret: usize, count: usize, big: bool) -> Result<usize> {
    let len = buf.len_chars();
    if caret >= len {
        return Err(Error::InvalidMotion);
    }
    let mut pos = caret;
    for _ in 0..count {
        if pos >= len {
            break;
        }
        let class = class_at(buf, pos, big);
        if class != CharClass::Blank {
            while pos < len && class_at(buf, pos, big) == class {
                pos += 1;
            }
        }
        while pos < len && class_at(buf, pos, big) == CharClass::Blank {
            // An empty line counts as a word.
            if buf.char_at(pos) == Some('\n') && pos > caret && is_empty_line_at(buf, pos) {
                break;
            }
            pos += 1;
            if pos < len && is_empty_line_at(buf, pos) && buf.char_at(pos - 1) == Some('\n') {
                break;
            }
        }
    }
    Ok(pos.min(len))
}

pub(crate) fn word_backward(buf: &dyn Buffer, caret: usize, count: usize, big: bool) -> Result<usize> {
    if caret == 0 {
        return Err(Error::InvalidMotion);
    }
    let mut pos = caret;
    for _ in 0..count {
        if pos == 0 {
            break;
        }
        pos -= 1;
        while pos > 0 && class_at(buf, pos, big) == CharClass::Blank {
            if is_empty_line_at(buf, pos) {
                break;
            }
            pos -= 1;
        }
        let class = class_at(buf, pos, big);
        if class == CharClass::Blank {
            continue;
        }
        while pos > 0 && class_at(buf, pos - 1, big) == class {
            pos -= 1;
        }
    }
    Ok(pos)
}

pub(crate) fn word_end_forward(
    buf: &dyn Buffer,
    caret: usize,
    count: usize,
    big: bool,
    stay: bool,
) -> Result<usize> {
    let len = buf.len_chars();
    let stays = stay && class_at(buf, caret, big) != CharClass::Blank;
    if caret >= len || (caret + 1 >= len && !stays) {
        return Err(Error::InvalidMotion);
    }
    let mut pos = caret;
    for i in 0..count {
        // With `stay` (the `cw` rule) the word under the caret counts.
        if !(stays && i == 0) {
            pos += 1;
        }
        while pos < len && class_at(buf, pos, big) == CharClass::Blank {
            pos += 1;
        }
        if pos >= len {
            return Ok(len.saturating_sub(1));
        }
        let class = class_at(buf, pos, big);
        while pos + 1 < len && class_at(buf, pos + 1, big) == class {
            pos += 1;
        }
    }
    Ok(pos)
}

fn word_end_backward(buf: &dyn Buffer, caret: usize, count: usize, big: bool) -> Result<usize> {
    if caret == 0 {
        return Err(Error::InvalidMotion);
    }
    let mut pos = caret;
    for _ in 0..count {
        let class = class_at(buf, pos, big);
        if class != CharClass::Blank {
            while pos > 0 && class_at(buf, pos, big) == class {
                pos -= 1;
            }
        }
        while pos > 0 && class_at(buf, pos, big) == CharClass::Blank {
            if is_empty_line_at(buf, pos) && pos != caret {
                break;
            }
            pos -= 1;
        }
    }
    Ok(pos)
}

fn paragraph(buf: &dyn Buffer, caret: usize, count: usize, forward: bool) -> Result<usize> {
    let len = buf.len_chars();
    if (forward && caret + 1 >= len) || (!forward && caret == 0) {
        return Err(Error::InvalidMotion);
    }
    let blank = |line: usize| buf.line_len(line) == 0;
    let mut line = buf.line_of(caret);
    for _ in 0..count {
        if forward {
            while line < buf.last_line() && blank(line) {
                line += 1;
            }
            while line < buf.last_line() && !blank(line) {
                line += 1;
            }
            if line >= buf.last_line() && !blank(line) {
                return Ok(last_char(buf, buf.last_line()));
            }
        } else {
            while line > 0 && blank(line) {
                line -= 1;
            }
            while line > 0 && !blank(line) {
                line -= 1;
            }
            if line == 0 {
                return Ok(0);
            }
        }
    }
    Ok(buf.line_start(line))
}

/// Sentence start offsets, via Unicode sentence boundaries plus empty lines.
pub(crate) fn sentence_starts(buf: &dyn Buffer) -> Vec<usize> {
    use unicode_segmentation::UnicodeSegmentation;

    let text = buf.slice(0, buf.len_chars());
    let mut starts = Vec::new();
    let mut offset = 0;
    for sentence in text.split_sentence_bounds() {
        let skip = sentence.chars().take_while(|c| c.is_whitespace()).count();
        if skip < sentence.chars().count() {
            starts.push(offset + skip);
        }
        offset += sentence.chars().count();
    }
    for line in 0..buf.line_count() {
        if buf.line_len(line) == 0 {
            starts.push(buf.line_start(line));
        }
    }
    starts.sort_unstable();
    starts.dedup();
    starts
}

fn sentence(buf: &dyn Buffer, caret: usize, count: usize, forward: bool) -> Result<usize> {
    let starts = sentence_starts(buf);
    let mut pos = caret;
    for _ in 0..count {
        let next = if forward {
            starts.iter().copied().find(|&s| s > pos)
        } else {
            starts.iter().rev().copied().find(|&s| s < pos)
        };
        match next {
            Some(s) => pos = s,
            None if forward => {
                pos = buf.len_chars().saturating_sub(1);
                break;
            }
            None => {
                pos = 0;
                break;
            }
        }
    }
    if pos == caret {
        Err(Error::InvalidMotion)
    } else {
        Ok(pos)
    }
}

const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

fn match_pair(buf: &dyn Buffer, caret: usize) -> Result<usize> {
    let line_end = buf.line_end(buf.line_of(caret));
    let mut pos = caret;
    let (open, close, forward) = loop {
        if pos >= line_end {
            return Err(Error::InvalidMotion);
        }
        let c = buf.char_at(pos).ok_or(Error::InvalidMotion)?;
        if let Some(&(o, cl)) = PAIRS.iter().find(|(o, cl)| *o == c || *cl == c) {
            break (o, cl, c == o);
        }
        pos += 1;
    };
    find_unmatched(buf, pos, open, close, forward).ok_or(Error::InvalidMotion)
}

/// Finds the bracket balancing the one at `from` (exclusive of `from`).
pub(crate) fn find_unmatched(
    buf: &dyn Buffer,
    from: usize,
    open: char,
    close: char,
    forward: bool,
) -> Option<usize> {
    let mut depth = 0usize;
    let len = buf.len_chars();
    let mut pos = from;
    loop {
        if forward {
            pos += 1;
            if pos >= len {
                return None;
            }
        } else {
            if pos == 0 {
                return None;
            }
            pos -= 1;
        }
        let c = buf.char_at(pos)?;
        let (same, other) = if forward { (open, close) } else { (close, open) };
        if c == same {
            depth += 1;
        } else if c == other {
            if depth == 0 {
                return Some(pos);
            }
            depth -= 1;
        }
    }
}

fn find_char(
    buf: &dyn Buffer,
    caret: usize,
    count: usize,
    ch: char,
    forward: bool,
    till: bool,
) -> Result<usize> {
    let line = buf.line_of(caret);
    let (start, end) = (buf.line_start(line), buf.line_end(line));
    let mut pos = caret;
    let mut found = 0;
    while found < count {
        if forward {
            pos += 1;
            if pos >= end {
                return Err(Error::InvalidMotion);
            }
        } else {
            if pos <= start {
                return Err(Error::InvalidMotion);
            }
            pos -= 1;
        }
        if buf.char_at(pos) == Some(ch) {
            found += 1;
        }
    }
    Ok(match (till, forward) {
        (true, true) => pos - 1,
        (true, false) => pos + 1,
        _ => pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rope_buffer::RopeBuffer;

    fn ctx<'a>(options: &'a Options, marks: &'a Marks, caret: usize, count: usize) -> MotionContext<'a> {
        MotionContext {
            caret,
            count: count.max(1),
            raw_count: count,
            argument: None,
            mode: Mode::Normal,
            operator: None,
            options,
            column: None,
            marks,
            last_find: None,
            last_search: None,
        }
    }

    #[test]
    fn words() {
        let buf = RopeBuffer::new("foo.bar  baz\nqux");
        assert_eq!(word_forward(&buf, 0, 1, false), Ok(3));
        assert_eq!(word_forward(&buf, 0, 1, true), Ok(9));
        assert_eq!(word_forward(&buf, 9, 1, false), Ok(13));
        assert_eq!(word_backward(&buf, 13, 1, false), Ok(9));
        assert_eq!(word_backward(&buf, 9, 2, false), Ok(3));
        assert_eq!(word_end_forward(&buf, 0, 1, false, false), Ok(2));
        assert_eq!(word_end_forward(&buf, 2, 1, false, false), Ok(3));
        assert_eq!(word_end_forward(&buf, 2, 1, false, true), Ok(2));
        assert_eq!(word_end_backward(&buf, 9, 1, false), Ok(6));
    }

    #[test]
    fn word_forward_stops_on_empty_line() {
        let buf = RopeBuffer::new("abc\n\ndef");
        assert_eq!(word_forward(&buf, 0, 1, false), Ok(4));
        assert_eq!(word_forward(&buf, 4, 1, false), Ok(5));
    }

    #[test]
    fn word_motions_fail_at_buffer_edges() {
        let buf = RopeBuffer::new("abc");
        assert_eq!(word_forward(&buf, 2, 1, false), Ok(3));
        assert_eq!(word_forward(&buf, 3, 1, false), Err(Error::InvalidMotion));
        assert_eq!(word_end_forward(&buf, 2, 1, false, false), Err(Error::InvalidMotion));
        assert_eq!(word_end_forward(&buf, 2, 1, false, true), Ok(2));
        assert_eq!(word_backward(&buf, 0, 1, false), Err(Error::InvalidMotion));
    }

    #[test]
    fn left_right_respect_whichwrap() {
        let buf = RopeBuffer::new("ab\ncd");
        let options = Options::default();
        let marks = Marks::default();
        let left = Motion::Left { wrap: 'h' };
        assert_eq!(left.offset(&buf, &ctx(&options, &marks, 3, 0)), Err(Error::InvalidMotion));
        let bs = Motion::Left { wrap: 'b' };
        assert_eq!(bs.offset(&buf, &ctx(&options, &marks, 3, 0)), Ok(1));
        let right = Motion::Right { wrap: 'l' };
        assert_eq!(right.offset(&buf, &ctx(&options, &marks, 1, 0)), Err(Error::InvalidMotion));
        assert_eq!(right.offset(&buf, &ctx(&options, &marks, 0, 5)), Ok(1));
    }

    #[test]
    fn vertical_keeps_column() {
        let buf = RopeBuffer::new("abcdef\nab\nabcdef");
        let options = Options::default();
        let marks = Marks::default();
        let mut c = ctx(&options, &marks, 4, 0);
        c.column = Some(4);
        assert_eq!(Motion::Down.offset(&buf, &c), Ok(8));
        c.caret = 8;
        assert_eq!(Motion::Down.offset(&buf, &c), Ok(14));
        c.caret = 14;
        assert_eq!(Motion::Down.offset(&buf, &c), Err(Error::InvalidMotion));
    }

    #[test]
    fn goto_line_uses_raw_count() {
        let buf = RopeBuffer::new("a\n  b\nc\n");
        let options = Options::default();
        let marks = Marks::default();
        assert_eq!(Motion::GotoLineLast.offset(&buf, &ctx(&options, &marks, 0, 0)), Ok(6));
        assert_eq!(Motion::GotoLineLast.offset(&buf, &ctx(&options, &marks, 0, 2)), Ok(4));
        assert_eq!(Motion::GotoLineFirst.offset(&buf, &ctx(&options, &marks, 6, 0)), Ok(0));
    }

    #[test]
    fn find_and_till() {
        let buf = RopeBuffer::new("a,b,c,d");
        assert_eq!(find_char(&buf, 0, 2, ',', true, false), Ok(3));
        assert_eq!(find_char(&buf, 0, 1, ',', true, true), Ok(0));
        assert_eq!(find_char(&buf, 6, 1, ',', false, true), Ok(6));
        assert_eq!(find_char(&buf, 6, 1, ',', false, false), Ok(5));
        assert_eq!(find_char(&buf, 0, 9, ',', true, false), Err(Error::InvalidMotion));
    }

    #[test]
    fn matching_brackets() {
        let buf = RopeBuffer::new("f(a[1], (b))");
        assert_eq!(match_pair(&buf, 0), Ok(11));
        assert_eq!(match_pair(&buf, 11), Ok(1));
        assert_eq!(match_pair(&buf, 3), Ok(5));
        let buf = RopeBuffer::new("none here");
        assert_eq!(match_pair(&buf, 0), Err(Error::InvalidMotion));
    }

    #[test]
    fn paragraphs() {
        let buf = RopeBuffer::new("a\nb\n\nc\nd\n\ne");
        assert_eq!(paragraph(&buf, 0, 1, true), Ok(4));
        assert_eq!(paragraph(&buf, 0, 2, true), Ok(9));
        assert_eq!(paragraph(&buf, 9, 1, false), Ok(4));
        assert_eq!(paragraph(&buf, 4, 1, false), Ok(0));
    }

    #[test]
    fn sentences() {
        let buf = RopeBuffer::new("One two. Three four. Five.");
        assert_eq!(sentence(&buf, 0, 1, true), Ok(9));
        assert_eq!(sentence(&buf, 0, 2, true), Ok(21));
        assert_eq!(sentence(&buf, 21, 1, false), Ok(9));
    }

    #[test]
    fn line_percent() {
        let buf = RopeBuffer::new("1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n");
        let options = Options::default();
        let marks = Marks::default();
        let offset = Motion::MatchPair.offset(&buf, &ctx(&options, &marks, 0, 50)).unwrap();
        assert_eq!(buf.line_of(offset), 4);
    }
}

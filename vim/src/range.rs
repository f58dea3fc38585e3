//! Turns an operator's motion argument into the text it acts on.

use tracing::trace;

use crate::command::{Command, CommandFlags, CommandKind, Operator};
use crate::error::{Error, Result};
use crate::motion::{Motion, MotionContext, word_end_forward};
use crate::traits::Buffer;
use crate::types::{SelectionType, TextRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub range: TextRange,
    pub kind: SelectionType,
}

/// `2d3w` acts on six words; no count on either side stays "no count".
pub fn combine_counts(operator: &Command, motion: &Command) -> (usize, usize) {
    let count = operator.count * motion.count;
    if operator.raw_count == 0 && motion.raw_count == 0 {
        (count, 0)
    } else {
        (count, count)
    }
}

/// Range for `motion` from `ctx.caret`, where `ctx` already carries the
/// combined count and the operator.
pub fn resolve_range(
    buf: &dyn Buffer,
    motion: &Command,
    ctx: &MotionContext<'_>,
    forced: Option<SelectionType>,
) -> Result<ResolvedRange> {
    let caret = ctx.caret;
    let (target, mut flags) = match motion.kind() {
        CommandKind::TextObject(object) => {
            let range = object.range(buf, caret, ctx.count)?;
            let kind = forced.unwrap_or(object.selection_type());
            let range = if kind == SelectionType::LineWise {
                snap_lines(buf, range.start(), range.end().saturating_sub(1).max(range.start()))
            } else {
                range
            };
            return Ok(ResolvedRange { range, kind });
        }
        CommandKind::Motion(Motion::WordForward { big })
            if ctx.operator == Some(Operator::Change)
                && buf.char_at(caret).is_some_and(|c| !c.is_whitespace()) =>
        {
            // `cw` on a word behaves like `ce`.
            let end = word_end_forward(buf, caret, ctx.count, *big, true)?;
            let flags = (motion.flags() - CommandFlags::EXCLUSIVE) | CommandFlags::INCLUSIVE;
            (end, flags)
        }
        CommandKind::Motion(m) => {
            let target = m.offset(buf, ctx)?;
            (target, m.adjust_flags(motion.flags(), ctx))
        }
        _ => return Err(Error::InvalidMotion),
    };

    match forced {
        Some(SelectionType::LineWise) => flags |= CommandFlags::LINEWISE,
        Some(SelectionType::CharWise) if flags.contains(CommandFlags::LINEWISE) => {
            flags = (flags - CommandFlags::LINEWISE - CommandFlags::INCLUSIVE)
                | CommandFlags::EXCLUSIVE;
        }
        Some(SelectionType::CharWise) => flags.toggle(CommandFlags::INCLUSIVE | CommandFlags::EXCLUSIVE),
        Some(SelectionType::BlockWise) => {
            return Ok(ResolvedRange {
                range: block_range(buf, caret, target),
                kind: SelectionType::BlockWise,
            });
        }
        None => {}
    }

    let (start, end) = (caret.min(target), caret.max(target));
    if flags.contains(CommandFlags::LINEWISE) {
        return Ok(ResolvedRange {
            range: snap_lines(buf, start, end),
            kind: SelectionType::LineWise,
        });
    }

    let mut end = end;
    if flags.contains(CommandFlags::INCLUSIVE) {
        // Never swallow a line terminator (`d$` on an empty line).
        let on_terminator = end == buf.line_end(buf.line_of(end));
        if !on_terminator {
            end = (end + 1).min(buf.len_chars());
        }
    } else if ctx.operator.is_some() {
        if matches!(motion.kind(), CommandKind::Motion(Motion::WordForward { .. })) {
            end = word_motion_end(buf, start, end);
        }
        let (start_line, end_line) = (buf.line_of(start), buf.line_of(end));
        if end_line > start_line && end == buf.line_start(end_line) {
            if start <= buf.first_non_blank(start_line) {
                // The motion becomes linewise over the lines before `end`.
                return Ok(ResolvedRange {
                    range: snap_lines(buf, start, end - 1),
                    kind: SelectionType::LineWise,
                });
            }
            end = buf.line_end(end_line - 1);
        }
    }
    trace!(start, end, "resolved range");
    Ok(ResolvedRange {
        range: TextRange::new(start, end),
        kind: SelectionType::CharWise,
    })
}

/// Whole lines from the line of `start` through the line of `end`,
/// including the final terminator when there is one.
pub fn snap_lines(buf: &dyn Buffer, start: usize, end: usize) -> TextRange {
    let first = buf.line_of(start);
    let last = buf.line_of(end);
    let end = (buf.line_end(last) + 1).min(buf.len_chars());
    TextRange::new(buf.line_start(first), end)
}

/// One range per line between the two corners, inclusive of both columns.
pub fn block_range(buf: &dyn Buffer, a: usize, b: usize) -> TextRange {
    let (pa, pb) = (buf.position(a), buf.position(b));
    let (left, right) = (pa.col.min(pb.col), pa.col.max(pb.col));
    block_lines(buf, pa.line.min(pb.line), pa.line.max(pb.line), left, Some(right + 1))
}

/// Columns `[left, right)` on each line; `None` runs to each line's end.
pub fn block_lines(
    buf: &dyn Buffer,
    first: usize,
    last: usize,
    left: usize,
    right: Option<usize>,
) -> TextRange {
    TextRange::block((first..=last).map(|line| {
        let start = buf.line_start(line);
        let len = buf.line_len(line);
        let right = right.map_or(len, |r| r.min(len));
        (start + left.min(len), start + right.max(left.min(len)))
    }))
}

/// A `w` under an operator stops at the end of the last word it moved over
/// when that word ends a line.
fn word_motion_end(buf: &dyn Buffer, start: usize, end: usize) -> usize {
    let mut stop = end;
    let mut crossed = false;
    while stop > start {
        match buf.char_at(stop - 1) {
            Some('\n') => crossed = true,
            Some(c) if c.is_whitespace() => {}
            _ => break,
        }
        stop -= 1;
    }
    if !crossed {
        return end;
    }
    if stop > start {
        return stop;
    }
    // Only blanks before the line end: take them.
    buf.line_end(buf.line_of(start))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::CommandSpec;
    use crate::marks::Marks;
    use crate::options::Options;
    use crate::registry::CommandRegistry;
    use crate::rope_buffer::RopeBuffer;
    use crate::types::Mode;

    fn motion(id: &str, raw_count: usize) -> Command {
        let spec: Arc<CommandSpec> = CommandRegistry::with_defaults().get(id).unwrap();
        Command::new(spec, raw_count, None, vec![])
    }

    fn resolve(text: &str, caret: usize, op: Operator, id: &str, forced: Option<SelectionType>) -> (String, SelectionType) {
        let buf = RopeBuffer::new(text);
        let options = Options::default();
        let marks = Marks::default();
        let cmd = motion(id, 0);
        let ctx = MotionContext {
            caret,
            count: 1,
            raw_count: 0,
            argument: None,
            mode: Mode::OpPending { return_mode: Default::default(), forced },
            operator: Some(op),
            options: &options,
            column: None,
            marks: &marks,
            last_find: None,
            last_search: None,
        };
        let resolved = resolve_range(&buf, &cmd, &ctx, forced).unwrap();
        let text = resolved
            .range
            .pairs()
            .map(|(s, e)| buf.slice(s, e))
            .collect::<Vec<_>>()
            .join("|");
        (text, resolved.kind)
    }

    #[test]
    fn counts_combine() {
        let op = motion("operator.delete", 2);
        let w = motion("motion.word.forward", 3);
        assert_eq!(combine_counts(&op, &w), (6, 6));
        let op = motion("operator.delete", 0);
        let w = motion("motion.word.forward", 0);
        assert_eq!(combine_counts(&op, &w), (1, 0));
    }

    #[test]
    fn exclusive_and_inclusive() {
        assert_eq!(resolve("foo bar", 0, Operator::Delete, "motion.word.forward", None).0, "foo ");
        assert_eq!(resolve("foo bar", 0, Operator::Delete, "motion.word.end", None).0, "foo");
        assert_eq!(resolve("foo bar", 4, Operator::Delete, "motion.line.end", None).0, "bar");
        assert_eq!(resolve("foo bar", 0, Operator::Change, "motion.word.forward", None).0, "foo");
    }

    #[test]
    fn word_stops_at_line_end() {
        assert_eq!(resolve("foo\n  bar", 0, Operator::Delete, "motion.word.forward", None).0, "foo");
        assert_eq!(resolve("abc\n", 2, Operator::Delete, "motion.word.forward", None).0, "c");
    }

    #[test]
    fn linewise_snaps_to_whole_lines() {
        let (text, kind) = resolve("a\nbb\ncc\n", 3, Operator::Delete, "motion.down", None);
        assert_eq!(text, "bb\ncc\n");
        assert_eq!(kind, SelectionType::LineWise);
        let (text, _) = resolve("a\nbb", 3, Operator::Yank, "motion.line.current", None);
        assert_eq!(text, "bb");
    }

    #[test]
    fn exclusive_to_column_zero_becomes_linewise() {
        let (text, kind) = resolve("a\nb\n\nc", 0, Operator::Delete, "motion.paragraph.forward", None);
        assert_eq!((text.as_str(), kind), ("a\nb\n", SelectionType::LineWise));
        let (text, kind) = resolve("xa\nb\n\nc", 1, Operator::Delete, "motion.paragraph.forward", None);
        assert_eq!((text.as_str(), kind), ("a\nb", SelectionType::CharWise));
    }

    #[test]
    fn forced_types() {
        let (text, kind) = resolve("foo bar", 0, Operator::Delete, "motion.word.end", Some(SelectionType::CharWise));
        assert_eq!((text.as_str(), kind), ("fo", SelectionType::CharWise));
        let (text, _) = resolve("ab\ncd\n", 0, Operator::Delete, "motion.down", Some(SelectionType::CharWise));
        assert_eq!(text, "ab\n");
        let (text, kind) = resolve("abc\ndef\n", 0, Operator::Delete, "motion.down", Some(SelectionType::BlockWise));
        assert_eq!((text.as_str(), kind), ("a|d", SelectionType::BlockWise));
    }
}

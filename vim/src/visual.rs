//! Visual selection geometry: operator ranges, remembered shapes and the
//! count-scaled reselection used by `gv` and `{count}v`.

use crate::options::SelectionMode;
use crate::range::{block_lines, snap_lines};
use crate::traits::Buffer;
use crate::types::{SelectionType, TextRange};

/// The shape of the last visual operation, replayed by `{count}v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualChange {
    pub lines: usize,
    pub columns: usize,
    pub kind: SelectionType,
}

/// A remembered selection, restored by `gv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRange {
    pub anchor: usize,
    pub head: usize,
    pub kind: SelectionType,
    /// The selection was extended with `$`.
    pub to_line_end: bool,
}

/// The text an operator acts on for a selection from `anchor` to `head`.
pub fn selection_range(
    buf: &dyn Buffer,
    anchor: usize,
    head: usize,
    kind: SelectionType,
    selection: SelectionMode,
    to_line_end: bool,
) -> TextRange {
    let (start, end) = (anchor.min(head), anchor.max(head));
    match kind {
        SelectionType::CharWise => {
            let end = if selection == SelectionMode::Exclusive {
                end
            } else {
                (end + 1).min(buf.len_chars())
            };
            TextRange::new(start, end)
        }
        SelectionType::LineWise => snap_lines(buf, start, end),
        SelectionType::BlockWise => {
            let (a, h) = (buf.position(anchor), buf.position(head));
            let left = a.col.min(h.col);
            let right = if to_line_end {
                None
            } else if selection == SelectionMode::Exclusive {
                Some(a.col.max(h.col).max(left))
            } else {
                Some(a.col.max(h.col) + 1)
            };
            block_lines(buf, a.line.min(h.line), a.line.max(h.line), left, right)
        }
    }
}

/// The `'<` and `'>` offsets of a selection.
pub fn selection_marks(buf: &dyn Buffer, anchor: usize, head: usize, kind: SelectionType) -> (usize, usize) {
    let (start, end) = (anchor.min(head), anchor.max(head));
    match kind {
        SelectionType::LineWise => {
            let last = buf.line_of(end);
            (
                buf.line_start(buf.line_of(start)),
                buf.line_end(last).saturating_sub(1).max(buf.line_start(last)),
            )
        }
        SelectionType::BlockWise => {
            let (a, h) = (buf.position(anchor), buf.position(head));
            let top = buf.line_start(a.line.min(h.line)) + a.col.min(h.col);
            let bottom = buf.line_start(a.line.max(h.line)) + a.col.max(h.col);
            (top, bottom)
        }
        SelectionType::CharWise => (start, end),
    }
}

/// Measures a selection for later `{count}v` reuse.
pub fn visual_change(buf: &dyn Buffer, anchor: usize, head: usize, kind: SelectionType) -> VisualChange {
    let (start, end) = (anchor.min(head), anchor.max(head));
    let (sp, ep) = (buf.position(start), buf.position(end));
    let lines = ep.line - sp.line + 1;
    let columns = match kind {
        SelectionType::LineWise => ep.col,
        SelectionType::CharWise if lines > 1 => ep.col,
        SelectionType::CharWise => ep.col - sp.col + 1,
        SelectionType::BlockWise => {
            let (a, h) = (buf.position(anchor), buf.position(head));
            a.col.abs_diff(h.col) + 1
        }
    };
    VisualChange { lines, columns, kind }
}

/// The head of a selection starting at `start` with the shape of `change`
/// scaled by `count`.
///
/// Linewise and blockwise shapes, and characterwise ones spanning lines,
/// multiply their line count; single-line characterwise and blockwise
/// shapes multiply their width.
pub fn calculate_visual_range(buf: &dyn Buffer, change: VisualChange, count: usize, start: usize) -> usize {
    let count = count.max(1);
    let mut lines = change.lines.max(1);
    let mut columns = change.columns;
    if change.kind != SelectionType::CharWise || lines > 1 {
        lines *= count;
    }
    if (change.kind == SelectionType::CharWise && lines == 1) || change.kind == SelectionType::BlockWise {
        columns *= count;
    }
    let sp = buf.position(start);
    let end_line = (sp.line + lines - 1).min(buf.last_line());
    let line_start = buf.line_start(end_line);
    let last_col = buf.line_len(end_line).saturating_sub(1);
    match change.kind {
        SelectionType::LineWise => line_start + sp.col.min(last_col),
        SelectionType::CharWise if lines > 1 => line_start + columns.min(last_col),
        SelectionType::CharWise => {
            let line_last = buf.line_start(sp.line) + buf.line_len(sp.line).saturating_sub(1);
            (start + columns.saturating_sub(1)).min(line_last.max(start))
        }
        SelectionType::BlockWise => line_start + (sp.col + columns.saturating_sub(1)).min(last_col),
    }
}

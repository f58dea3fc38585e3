/// A position within a text buffer.
///
/// Positions are zero-indexed; columns count chars from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based column position.
    pub col: usize,
}

impl Position {
    /// The origin position (0, 0).
    pub const ZERO: Position = Position { line: 0, col: 0 };

    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// The shape of a selection or operator range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionType {
    /// Character-wise selection (v).
    #[default]
    CharWise,
    /// Line-wise selection (V).
    LineWise,
    /// Block-wise selection (Ctrl-V).
    BlockWise,
}

/// The mode to return to once an operator-pending or command-line state ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnMode {
    #[default]
    Normal,
    Insert,
    Visual(SelectionType),
    Select(SelectionType),
}

impl From<ReturnMode> for Mode {
    fn from(mode: ReturnMode) -> Self {
        match mode {
            ReturnMode::Normal => Mode::Normal,
            ReturnMode::Insert => Mode::Insert,
            ReturnMode::Visual(kind) => Mode::Visual(kind),
            ReturnMode::Select(kind) => Mode::Select(kind),
        }
    }
}

/// The current mode of the vim engine.
///
/// Vim is a modal editor where the same keys perform different
/// actions depending on the current mode. Exactly one mode is active per editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Normal mode - for navigation and operators.
    #[default]
    Normal,
    /// Insert mode - for typing text.
    Insert,
    /// Replace mode - typed text overwrites.
    Replace,
    /// Visual mode - for selecting text.
    Visual(SelectionType),
    /// Select mode - typing replaces the selection.
    Select(SelectionType),
    /// An operator was typed and a motion or text object is expected.
    OpPending {
        return_mode: ReturnMode,
        forced: Option<SelectionType>,
    },
    /// Command-line entry (`:`, `/`, `?`).
    CmdLine(ReturnMode),
}

impl Mode {
    pub fn is_visual(&self) -> bool {
        matches!(self, Mode::Visual(_))
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Mode::Select(_))
    }

    /// Whether the caret may rest one past the last character of a line.
    pub fn allows_past_end(&self) -> bool {
        matches!(
            self,
            Mode::Insert | Mode::Replace | Mode::Visual(_) | Mode::Select(_)
        )
    }

    pub fn selection_type(&self) -> Option<SelectionType> {
        match self {
            Mode::Visual(kind) | Mode::Select(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Short display label for status lines.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Replace => "REPLACE",
            Mode::Visual(SelectionType::CharWise) => "VISUAL",
            Mode::Visual(SelectionType::LineWise) => "VISUAL LINE",
            Mode::Visual(SelectionType::BlockWise) => "VISUAL BLOCK",
            Mode::Select(SelectionType::CharWise) => "SELECT",
            Mode::Select(SelectionType::LineWise) => "SELECT LINE",
            Mode::Select(SelectionType::BlockWise) => "SELECT BLOCK",
            Mode::OpPending { .. } => "OP PENDING",
            Mode::CmdLine(_) => "COMMAND",
        }
    }
}

/// A range of text as char offsets.
///
/// Each `(start, end)` pair is half-open and normalized so `start <= end`.
/// Characterwise and linewise ranges carry one pair; blockwise ranges carry
/// one pair per covered line, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            starts: vec![start],
            ends: vec![end],
        }
    }

    /// A blockwise range from per-line pairs.
    pub fn block(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let (starts, ends) = pairs
            .into_iter()
            .map(|(s, e)| if s <= e { (s, e) } else { (e, s) })
            .unzip();
        Self { starts, ends }
    }

    pub fn start(&self) -> usize {
        self.starts.iter().copied().min().unwrap_or(0)
    }

    pub fn end(&self) -> usize {
        self.ends.iter().copied().max().unwrap_or(0)
    }

    pub fn is_multiple(&self) -> bool {
        self.starts.len() > 1
    }

    pub fn pairs(&self) -> impl DoubleEndedIterator<Item = (usize, usize)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().all(|(s, e)| s == e)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.pairs().any(|(s, e)| offset >= s && offset < e)
    }
}

/// A text selection with its type, as handed to the host for display.
///
/// `anchor` is the fixed end and `head` the active end; both are caret
/// offsets, so the anchor may be after the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
    /// The type of selection (character, line or block).
    pub kind: SelectionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_range_normalizes() {
        let range = TextRange::new(9, 3);
        assert_eq!((range.start(), range.end()), (3, 9));
        assert!(!range.is_multiple());
    }

    #[test]
    fn block_range_bounds() {
        let range = TextRange::block([(2, 4), (8, 10), (14, 16)]);
        assert!(range.is_multiple());
        assert_eq!(range.start(), 2);
        assert_eq!(range.end(), 16);
        assert!(range.contains(9));
        assert!(!range.contains(5));
    }
}

//! The command model: what a completed key sequence means.

use std::sync::Arc;

use bitflags::bitflags;

use crate::error::Result;
use crate::key::KeyEvent;
use crate::motion::Motion;
use crate::text_object::TextObject;
use crate::traits::Buffer;
use crate::types::SelectionType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandFlags: u32 {
        const LINEWISE = 1 << 0;
        const CHARACTERWISE = 1 << 1;
        const BLOCKWISE = 1 << 2;
        const INCLUSIVE = 1 << 3;
        const EXCLUSIVE = 1 << 4;
        /// Vertical motion keeping the preferred column.
        const KEEP_COLUMN = 1 << 5;
        /// Sets the preferred column to the end of line (`$`).
        const COLUMN_END = 1 << 6;
        /// Sets the `'` mark before moving.
        const JUMP = 1 << 7;
        /// The keys are recorded for `.`.
        const SAVE_STROKE = 1 << 8;
    }
}

impl CommandFlags {
    pub fn selection_type(self) -> SelectionType {
        if self.contains(CommandFlags::LINEWISE) {
            SelectionType::LineWise
        } else if self.contains(CommandFlags::BLOCKWISE) {
            SelectionType::BlockWise
        } else {
            SelectionType::CharWise
        }
    }
}

/// What a command waits for after its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentType {
    #[default]
    None,
    Motion,
    Character,
    Digraph,
    ExString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Motion(Box<Command>),
    Character(char),
    /// A character entered as a two-key digraph.
    Digraph(char),
    ExString(String),
}

impl Argument {
    pub fn as_char(&self) -> Option<char> {
        match self {
            Argument::Character(c) | Argument::Digraph(c) => Some(*c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Delete,
    Change,
    Yank,
    IndentRight,
    IndentLeft,
    Lowercase,
    Uppercase,
    ToggleCase,
    Rot13,
}

impl Operator {
    pub fn is_change(self) -> bool {
        !matches!(self, Operator::Yank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertKind {
    Before,
    After,
    LineStart,
    LineEnd,
    /// `gI`
    Column0,
    OpenBelow,
    OpenAbove,
    /// `gi`
    LastInsert,
}

/// A host-provided action over the buffer.
pub type ActionFn = fn(&mut dyn Buffer, &Command) -> Result<()>;

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Insert(InsertKind),
    Put { before: bool, cursor_after: bool },
    ReplaceChar,
    ReplaceMode,
    ToggleCaseChar,
    JoinLines { spaces: bool },
    Repeat,
    Undo,
    Redo,
    SetMark,
    Visual(SelectionType),
    ReselectVisual,
    SwapVisualEnds { block_column: bool },
    SelectMode(SelectionType),
    ToggleVisualSelect,
    ForceMotionType(SelectionType),
    CommandLine,
    BlockInsert { append: bool },
    Custom(ActionFn),
}

#[derive(Debug, Clone)]
pub enum CommandKind {
    Motion(Motion),
    TextObject(TextObject),
    Operator(Operator),
    Action(Action),
    /// Replays other keys, unmapped, with the same count and register.
    Alias(Vec<KeyEvent>),
}

/// A registry entry. Two entries are equal when their ids are.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Stable identifier, e.g. `"motion.word.forward"`.
    pub id: String,
    pub kind: CommandKind,
    pub flags: CommandFlags,
    pub argument: ArgumentType,
}

impl CommandSpec {
    pub fn new(id: impl Into<String>, kind: CommandKind, flags: CommandFlags) -> Self {
        Self {
            id: id.into(),
            kind,
            flags,
            argument: ArgumentType::None,
        }
    }

    pub fn with_argument(mut self, argument: ArgumentType) -> Self {
        self.argument = argument;
        self
    }
}

impl PartialEq for CommandSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandSpec {}

/// A command being built or ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub spec: Arc<CommandSpec>,
    /// Effective count, at least 1.
    pub count: usize,
    /// The typed count, 0 when none.
    pub raw_count: usize,
    pub register: Option<char>,
    pub argument: Option<Argument>,
    pub keys: Vec<KeyEvent>,
}

impl Command {
    pub fn new(spec: Arc<CommandSpec>, raw_count: usize, register: Option<char>, keys: Vec<KeyEvent>) -> Self {
        Self {
            spec,
            count: raw_count.max(1),
            raw_count,
            register,
            argument: None,
            keys,
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.spec.kind
    }

    pub fn flags(&self) -> CommandFlags {
        self.spec.flags
    }

    pub fn argument_type(&self) -> ArgumentType {
        self.spec.argument
    }

    pub fn motion_argument(&self) -> Option<&Command> {
        match &self.argument {
            Some(Argument::Motion(cmd)) => Some(cmd),
            _ => None,
        }
    }
}

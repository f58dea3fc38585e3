/// Errors produced by the engine.
///
/// All of them are recoverable at keystroke granularity: whenever one is
/// raised the pending command has already been discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("motion failed")]
    InvalidMotion,

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("unsupported mapping argument: {0}")]
    UnsupportedMappingArgument(String),

    #[error("recursive mapping exceeded depth {depth}")]
    RecursiveMappingOverflow { depth: usize },

    #[error("no such mapping: {0}")]
    NoMapping(String),

    #[error("invalid key notation: {0}")]
    InvalidKeyNotation(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid argument for option {name}: {value}")]
    InvalidOptionValue { name: String, value: String },

    #[error("register {0} is read-only")]
    ReadOnlyRegister(char),

    #[error("invalid register name: {0}")]
    InvalidRegister(char),

    #[error("nothing in register {0}")]
    EmptyRegister(char),

    #[error("invalid mark: {0}")]
    InvalidMark(char),

    #[error("mark not set: {0}")]
    MarkNotSet(char),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("expression evaluation failed: {0}")]
    Expression(String),

    #[error("not an editor command: {0}")]
    NotAnEditorCommand(String),
}

pub type Result<T> = std::result::Result<T, Error>;

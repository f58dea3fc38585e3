//! A Vim emulation core for host text editors.
//!
//! The [`Engine`] turns key events into Vim commands (counts, registers,
//! operators, motions, text objects, visual selections) and applies them
//! to anything implementing [`Buffer`]. Mappings, registers, options and
//! the command registry are shared between the editors of a session.

pub mod command;
pub mod digraph;
pub mod engine;
pub mod error;
pub mod ex;
pub mod key;
pub mod mapping;
pub mod marks;
pub mod motion;
pub mod notation;
pub mod operator;
pub mod options;
pub mod range;
pub mod register;
pub mod registry;
pub mod rope_buffer;
pub mod search;
pub mod text_object;
pub mod traits;
pub mod types;
pub mod visual;

pub use crate::command::{Action, ArgumentType, Command, CommandFlags, CommandKind, CommandSpec, Operator};
pub use crate::engine::{EditorId, Effect, Engine, EngineBuilder, EngineContext, EngineSnapshot};
pub use crate::error::{Error, Result};
pub use crate::ex::ExOutcome;
pub use crate::key::{InputEvent, KeyCode, KeyEvent, Modifiers};
pub use crate::mapping::{MapMode, MappingTable, MappingTarget, SharedMappings};
pub use crate::motion::{Motion, MotionContext};
pub use crate::notation::{keys_to_string, parse_keys};
pub use crate::options::{Options, SelectionMode, SharedOptions};
pub use crate::register::{RegisterContent, RegisterSet, SharedRegisters};
pub use crate::registry::{CommandRegistry, SharedCommands};
pub use crate::rope_buffer::RopeBuffer;
pub use crate::traits::{Buffer, Clipboard, Evaluator};
pub use crate::types::{Mode, Position, ReturnMode, Selection, SelectionType, TextRange};

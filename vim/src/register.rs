//! Registers for yanked, deleted and special text.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::error::{Error, Result};
use crate::traits::Clipboard;
use crate::types::SelectionType;

/// Registers shared by every editor of a session.
pub type SharedRegisters = Arc<RwLock<RegisterSet>>;

/// The payload of one register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterContent {
    pub text: String,
    pub kind: SelectionType,
    /// Per-line pieces of a blockwise yank.
    pub block: Option<Vec<String>>,
}

impl RegisterContent {
    pub fn charwise(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SelectionType::CharWise,
            block: None,
        }
    }

    /// Linewise text always ends with a newline.
    pub fn linewise(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self {
            text,
            kind: SelectionType::LineWise,
            block: None,
        }
    }

    pub fn blockwise(lines: Vec<String>) -> Self {
        Self {
            text: lines.join("\n"),
            kind: SelectionType::BlockWise,
            block: Some(lines),
        }
    }

    /// The lines of a blockwise payload (or of the text otherwise).
    pub fn lines(&self) -> Vec<String> {
        match &self.block {
            Some(lines) => lines.clone(),
            None => self
                .text
                .strip_suffix('\n')
                .unwrap_or(&self.text)
                .split('\n')
                .map(str::to_string)
                .collect(),
        }
    }

    fn append(&mut self, other: RegisterContent) {
        if self.kind == SelectionType::LineWise || other.kind == SelectionType::LineWise {
            if !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            *self = RegisterContent::linewise(format!("{}{}", self.text, other.text));
        } else if self.kind == SelectionType::BlockWise || other.kind == SelectionType::BlockWise {
            let mut lines = self.lines();
            lines.extend(other.lines());
            *self = RegisterContent::blockwise(lines);
        } else {
            self.text.push_str(&other.text);
        }
    }
}

pub fn is_valid_register(name: char) -> bool {
    name.is_ascii_alphanumeric() || "\"-_+*%.:/".contains(name)
}

pub fn is_read_only(name: char) -> bool {
    "%.:/".contains(name)
}

#[derive(Default)]
pub struct RegisterSet {
    registers: HashMap<char, RegisterContent>,
    unnamed: Option<RegisterContent>,
    last_inserted: Option<String>,
    last_command: Option<String>,
    last_search: Option<String>,
    clipboard: Option<Mutex<Box<dyn Clipboard + Send>>>,
}

impl std::fmt::Debug for RegisterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterSet")
            .field("registers", &self.registers)
            .field("unnamed", &self.unnamed)
            .field("clipboard", &self.clipboard.is_some())
            .finish()
    }
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clipboard(clipboard: Box<dyn Clipboard + Send>) -> Self {
        Self {
            clipboard: Some(Mutex::new(clipboard)),
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedRegisters {
        Arc::new(RwLock::new(self))
    }

    /// Stores yanked text. Without a register name it goes to `"0`.
    pub fn store_yank(&mut self, register: Option<char>, content: RegisterContent) -> Result<()> {
        match register {
            Some('_') => Ok(()),
            None | Some('"') => {
                self.registers.insert('0', content.clone());
                self.set_unnamed(content);
                Ok(())
            }
            Some(name) => self.write_named(name, content),
        }
    }

    /// Stores deleted text, applying the numbered-register history rule:
    /// deletes spanning lines shift `"1`..`"9`, smaller ones go to `"-`.
    pub fn store_delete(&mut self, register: Option<char>, content: RegisterContent) -> Result<()> {
        match register {
            Some('_') => Ok(()),
            None | Some('"') => {
                let small =
                    content.kind == SelectionType::CharWise && !content.text.contains('\n');
                if small {
                    self.registers.insert('-', content.clone());
                } else {
                    self.shift_numbered();
                    self.registers.insert('1', content.clone());
                }
                self.set_unnamed(content);
                Ok(())
            }
            Some(name) => self.write_named(name, content),
        }
    }

    fn shift_numbered(&mut self) {
        for n in (1..9).rev() {
            let from = char::from_digit(n, 10).unwrap_or('1');
            let to = char::from_digit(n + 1, 10).unwrap_or('9');
            if let Some(content) = self.registers.remove(&from) {
                self.registers.insert(to, content);
            }
        }
    }

    fn write_named(&mut self, name: char, content: RegisterContent) -> Result<()> {
        if is_read_only(name) {
            return Err(Error::ReadOnlyRegister(name));
        }
        if !is_valid_register(name) {
            return Err(Error::InvalidRegister(name));
        }
        trace!(register = %name, len = content.text.len(), "register write");
        if name.is_ascii_uppercase() {
            let lower = name.to_ascii_lowercase();
            let merged = match self.registers.remove(&lower) {
                Some(mut existing) => {
                    existing.append(content);
                    existing
                }
                None => content,
            };
            self.registers.insert(lower, merged.clone());
            self.set_unnamed(merged);
            return Ok(());
        }
        if (name == '+' || name == '*')
            && let Some(clipboard) = &self.clipboard
        {
            clipboard.lock().set(content.text.clone());
        }
        self.registers.insert(name, content.clone());
        self.set_unnamed(content);
        Ok(())
    }

    fn set_unnamed(&mut self, content: RegisterContent) {
        self.unnamed = Some(content);
    }

    /// Reads a register; `file_name` backs the `%` register.
    pub fn get(&self, name: char, file_name: Option<&str>) -> Result<RegisterContent> {
        if !is_valid_register(name) {
            return Err(Error::InvalidRegister(name));
        }
        let empty = || Error::EmptyRegister(name);
        match name {
            '"' => self.unnamed.clone().ok_or_else(empty),
            '_' => Err(empty()),
            '%' => file_name.map(RegisterContent::charwise).ok_or_else(empty),
            '.' => self.last_inserted.clone().map(RegisterContent::charwise).ok_or_else(empty),
            ':' => self.last_command.clone().map(RegisterContent::charwise).ok_or_else(empty),
            '/' => self.last_search.clone().map(RegisterContent::charwise).ok_or_else(empty),
            '+' | '*' => {
                if let Some(clipboard) = &self.clipboard
                    && let Some(text) = clipboard.lock().get()
                {
                    let local = self.registers.get(&name).filter(|c| c.text == text);
                    return Ok(match local {
                        Some(content) => content.clone(),
                        None if text.ends_with('\n') => RegisterContent::linewise(text),
                        None => RegisterContent::charwise(text),
                    });
                }
                self.registers.get(&name).cloned().ok_or_else(empty)
            }
            _ => self
                .registers
                .get(&name.to_ascii_lowercase())
                .cloned()
                .ok_or_else(empty),
        }
    }

    pub fn set_last_inserted(&mut self, text: impl Into<String>) {
        self.last_inserted = Some(text.into());
    }

    pub fn set_last_command(&mut self, text: impl Into<String>) {
        self.last_command = Some(text.into());
    }

    pub fn set_last_search(&mut self, text: impl Into<String>) {
        self.last_search = Some(text.into());
    }

    pub fn last_search(&self) -> Option<&str> {
        self.last_search.as_deref()
    }
}

/// The host clipboard via `arboard`.
#[cfg(feature = "clipboard")]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(inner) => Some(Self { inner }),
            Err(err) => {
                tracing::warn!(%err, "system clipboard unavailable");
                None
            }
        }
    }
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn get(&mut self) -> Option<String> {
        self.inner.get_text().ok()
    }

    fn set(&mut self, text: String) {
        if let Err(err) = self.inner.set_text(text) {
            tracing::warn!(%err, "clipboard write failed");
        }
    }
}

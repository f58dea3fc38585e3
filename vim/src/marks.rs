use std::collections::HashMap;

use crate::error::{Error, Result};

/// Per-editor marks, stored as char offsets and kept in step with edits.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    marks: HashMap<char, usize>,
}

impl Marks {
    /// Sets a mark on behalf of the user (`m{mark}`).
    ///
    /// `<` and `>` follow the visual selection and cannot be set this way.
    pub fn set(&mut self, name: char, offset: usize) -> Result<()> {
        if !(name.is_ascii_alphanumeric() || "'`[]".contains(name)) {
            return Err(Error::InvalidMark(name));
        }
        let name = if name == '`' { '\'' } else { name };
        self.marks.insert(name, offset);
        Ok(())
    }

    pub(crate) fn set_special(&mut self, name: char, offset: usize) {
        self.marks.insert(name, offset);
    }

    pub fn get(&self, name: char) -> Result<usize> {
        let name = if name == '`' { '\'' } else { name };
        if !(name.is_ascii_alphanumeric() || "'[]<>.".contains(name)) {
            return Err(Error::InvalidMark(name));
        }
        self.marks.get(&name).copied().ok_or(Error::MarkNotSet(name))
    }

    pub(crate) fn on_insert(&mut self, offset: usize, len: usize) {
        for mark in self.marks.values_mut() {
            if *mark >= offset {
                *mark += len;
            }
        }
    }

    pub(crate) fn on_delete(&mut self, start: usize, end: usize) {
        let len = end - start;
        for mark in self.marks.values_mut() {
            if *mark >= end {
                *mark -= len;
            } else if *mark > start {
                *mark = start;
            }
        }
    }
}

//! Editor options read by motions, operators and the key resolver.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Value of the `selection` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Inclusive,
    Exclusive,
    Old,
}

impl SelectionMode {
    fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Inclusive => "inclusive",
            SelectionMode::Exclusive => "exclusive",
            SelectionMode::Old => "old",
        }
    }
}

/// Options shared by every editor of a session.
pub type SharedOptions = Arc<RwLock<Options>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub selection: SelectionMode,
    /// Lines scrolled by `<C-d>`/`<C-u>`; 0 means half the viewport.
    pub scroll: usize,
    pub virtualedit: Vec<String>,
    pub whichwrap: Vec<String>,
    pub shiftwidth: usize,
    pub tabstop: usize,
    pub expandtab: bool,
    pub wrapscan: bool,
    pub ignorecase: bool,
    pub smartcase: bool,
    pub timeout: bool,
    /// Milliseconds to wait for an ambiguous mapping.
    pub timeoutlen: u64,
    pub maxmapdepth: usize,
    pub mapleader: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            selection: SelectionMode::Inclusive,
            scroll: 0,
            virtualedit: Vec::new(),
            whichwrap: vec!["b".to_string(), "s".to_string()],
            shiftwidth: 8,
            tabstop: 8,
            expandtab: false,
            wrapscan: true,
            ignorecase: false,
            smartcase: false,
            timeout: true,
            timeoutlen: 1000,
            maxmapdepth: 1000,
            mapleader: "\\".to_string(),
        }
    }
}

/// A single option value as reported by [`Options::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Number(usize),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Number,
    String,
    List(&'static [&'static str]),
}

const WHICHWRAP: &[&str] = &["b", "s", "h", "l", "<", ">", "~", "[", "]"];
const VIRTUALEDIT: &[&str] = &["block", "insert", "all", "onemore", "none", "NONE"];

// (name, short name, kind)
const OPTIONS: &[(&str, &str, Kind)] = &[
    ("selection", "sel", Kind::String),
    ("scroll", "scr", Kind::Number),
    ("virtualedit", "ve", Kind::List(VIRTUALEDIT)),
    ("whichwrap", "ww", Kind::List(WHICHWRAP)),
    ("shiftwidth", "sw", Kind::Number),
    ("tabstop", "ts", Kind::Number),
    ("expandtab", "et", Kind::Bool),
    ("wrapscan", "ws", Kind::Bool),
    ("ignorecase", "ic", Kind::Bool),
    ("smartcase", "scs", Kind::Bool),
    ("timeout", "to", Kind::Bool),
    ("timeoutlen", "tm", Kind::Number),
    ("maxmapdepth", "mmd", Kind::Number),
    ("mapleader", "mapleader", Kind::String),
];

fn lookup(name: &str) -> Option<(&'static str, Kind)> {
    OPTIONS
        .iter()
        .find(|(full, short, _)| *full == name || *short == name)
        .map(|(full, _, kind)| (*full, *kind))
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidOptionValue {
            name: "options".to_string(),
            value: e.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Result<OptionValue> {
        let (name, _) = lookup(name).ok_or_else(|| Error::UnknownOption(name.to_string()))?;
        Ok(match name {
            "selection" => OptionValue::String(self.selection.as_str().to_string()),
            "scroll" => OptionValue::Number(self.scroll),
            "virtualedit" => OptionValue::String(self.virtualedit.join(",")),
            "whichwrap" => OptionValue::String(self.whichwrap.join(",")),
            "shiftwidth" => OptionValue::Number(self.shiftwidth),
            "tabstop" => OptionValue::Number(self.tabstop),
            "expandtab" => OptionValue::Bool(self.expandtab),
            "wrapscan" => OptionValue::Bool(self.wrapscan),
            "ignorecase" => OptionValue::Bool(self.ignorecase),
            "smartcase" => OptionValue::Bool(self.smartcase),
            "timeout" => OptionValue::Bool(self.timeout),
            "timeoutlen" => OptionValue::Number(self.timeoutlen as usize),
            "maxmapdepth" => OptionValue::Number(self.maxmapdepth),
            _ => OptionValue::String(self.mapleader.clone()),
        })
    }

    /// Applies one `:set` argument, e.g. `sw=4`, `noet`, `ww+=h,l`, `ws!`.
    pub fn set(&mut self, arg: &str) -> Result<()> {
        let arg = arg.trim();
        if let Some(split) = arg.find(['=', ':']) {
            let (lhs, value) = (&arg[..split], &arg[split + 1..]);
            let (name, op) = match lhs.chars().last() {
                Some(c @ ('+' | '-' | '^')) => (&lhs[..lhs.len() - 1], Some(c)),
                _ => (lhs, None),
            };
            return self.assign(name, op, value);
        }

        let (name, toggle) = match arg.strip_suffix('!') {
            Some(name) => (name, true),
            None => (arg, false),
        };
        if let Some((full, Kind::Bool)) = lookup(name) {
            let value = if toggle {
                !self.bool_value(full)
            } else {
                true
            };
            return self.set_bool(full, value);
        }
        for (prefix, value) in [("no", Some(false)), ("inv", None)] {
            if let Some(stripped) = name.strip_prefix(prefix)
                && let Some((full, Kind::Bool)) = lookup(stripped)
            {
                let value = value.unwrap_or_else(|| !self.bool_value(full));
                return self.set_bool(full, value);
            }
        }
        match lookup(name) {
            Some(_) => Err(Error::InvalidOptionValue {
                name: name.to_string(),
                value: String::new(),
            }),
            None => Err(Error::UnknownOption(name.to_string())),
        }
    }

    fn assign(&mut self, name: &str, op: Option<char>, value: &str) -> Result<()> {
        let (full, kind) = lookup(name).ok_or_else(|| Error::UnknownOption(name.to_string()))?;
        let invalid = || Error::InvalidOptionValue {
            name: full.to_string(),
            value: value.to_string(),
        };
        match kind {
            Kind::Bool => return Err(invalid()),
            Kind::Number => {
                let n: usize = value.parse().map_err(|_| invalid())?;
                let current = match self.get(full)? {
                    OptionValue::Number(n) => n,
                    _ => 0,
                };
                let n = match op {
                    Some('+') => current.saturating_add(n),
                    Some('-') => current.saturating_sub(n),
                    Some(_) => current.saturating_mul(n),
                    None => n,
                };
                if full == "tabstop" && n == 0 {
                    return Err(invalid());
                }
                match full {
                    "scroll" => self.scroll = n,
                    "shiftwidth" => self.shiftwidth = n,
                    "tabstop" => self.tabstop = n,
                    "timeoutlen" => self.timeoutlen = n as u64,
                    _ => self.maxmapdepth = n,
                }
            }
            Kind::String => match full {
                "selection" => {
                    if op.is_some() {
                        return Err(invalid());
                    }
                    self.selection = match value {
                        "inclusive" => SelectionMode::Inclusive,
                        "exclusive" => SelectionMode::Exclusive,
                        "old" => SelectionMode::Old,
                        _ => return Err(invalid()),
                    };
                }
                _ => {
                    self.mapleader = match op {
                        Some('+') => format!("{}{value}", self.mapleader),
                        Some('^') => format!("{value}{}", self.mapleader),
                        Some(_) => self.mapleader.replace(value, ""),
                        None => value.to_string(),
                    };
                }
            },
            Kind::List(allowed) => {
                let items = parse_list(value);
                if items.iter().any(|item| !allowed.contains(&item.as_str())) {
                    return Err(invalid());
                }
                let list = if full == "whichwrap" {
                    &mut self.whichwrap
                } else {
                    &mut self.virtualedit
                };
                apply_list(list, op, items);
            }
        }
        debug!(option = full, value, "option set");
        Ok(())
    }

    fn bool_value(&self, name: &str) -> bool {
        matches!(self.get(name), Ok(OptionValue::Bool(true)))
    }

    fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        match name {
            "expandtab" => self.expandtab = value,
            "wrapscan" => self.wrapscan = value,
            "ignorecase" => self.ignorecase = value,
            "smartcase" => self.smartcase = value,
            "timeout" => self.timeout = value,
            _ => return Err(Error::UnknownOption(name.to_string())),
        }
        debug!(option = name, value, "option set");
        Ok(())
    }

    /// Whether `whichwrap` contains `flag`.
    pub fn wraps(&self, flag: &str) -> bool {
        self.whichwrap.iter().any(|f| f == flag)
    }

    /// Whether `virtualedit` lets Normal mode rest past the last character.
    pub fn allows_onemore(&self) -> bool {
        self.virtualedit.iter().any(|v| v == "onemore" || v == "all")
    }

    pub fn indent(&self) -> IndentConfig {
        IndentConfig {
            width: if self.shiftwidth == 0 {
                self.tabstop
            } else {
                self.shiftwidth
            },
            tabstop: self.tabstop.max(1),
            expandtab: self.expandtab,
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_list(list: &mut Vec<String>, op: Option<char>, items: Vec<String>) {
    match op {
        None => *list = items,
        Some('+') => {
            list.retain(|v| !items.contains(v));
            list.extend(items);
        }
        Some('^') => {
            list.retain(|v| !items.contains(v));
            let mut items = items;
            items.append(list);
            *list = items;
        }
        Some(_) => list.retain(|v| !items.contains(v)),
    }
}

/// Converts indentation widths to whitespace and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentConfig {
    /// One shift step.
    pub width: usize,
    pub tabstop: usize,
    pub expandtab: bool,
}

impl IndentConfig {
    /// Whitespace that indents to `width` columns.
    pub fn indent_string(&self, width: usize) -> String {
        if self.expandtab {
            " ".repeat(width)
        } else {
            let mut s = "\t".repeat(width / self.tabstop);
            s.push_str(&" ".repeat(width % self.tabstop));
            s
        }
    }

    /// Display width of the leading whitespace of `line`.
    pub fn measure(&self, line: &str) -> usize {
        let mut width = 0;
        for c in line.chars() {
            match c {
                ' ' => width += 1,
                '\t' => width += self.tabstop - width % self.tabstop,
                _ => break,
            }
        }
        width
    }
}

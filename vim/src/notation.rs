//! Vim key notation (`<C-w>`, `<lt>`, `<Plug>`, ...) parsing and printing.

use std::fmt;

use crate::error::{Error, Result};
use crate::key::{KeyCode, KeyEvent, Modifiers};

/// Default `mapleader`.
pub const DEFAULT_LEADER: &str = "\\";

/// Parses a key notation string into normalized keystrokes.
///
/// `<Leader>` expands to [`DEFAULT_LEADER`]. Unknown `<...>` groups are
/// taken literally, character by character, as Vim does.
pub fn parse_keys(input: &str) -> Result<Vec<KeyEvent>> {
    parse_keys_with_leader(input, DEFAULT_LEADER)
}

/// Parses key notation, expanding `<Leader>` to `leader`.
pub fn parse_keys_with_leader(input: &str, leader: &str) -> Result<Vec<KeyEvent>> {
    let mut keys = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '<'
            && let Some(rel) = chars[i + 1..].iter().position(|&c| c == '>')
        {
            let name: String = chars[i + 1..i + 1 + rel].iter().collect();
            if name.eq_ignore_ascii_case("leader") {
                if leader.contains('<') && leader.len() > 1 {
                    keys.extend(parse_keys_with_leader(leader, DEFAULT_LEADER)?);
                } else {
                    keys.extend(leader.chars().map(KeyEvent::char));
                }
                i += rel + 2;
                continue;
            }
            if let Some(key) = parse_special(&name) {
                keys.push(key.normalized());
                i += rel + 2;
                continue;
            }
        }
        keys.push(KeyEvent::char(c));
        i += 1;
    }
    Ok(keys)
}

/// Parses a single key written in notation, e.g. `"<C-v>"` or `"x"`.
pub fn parse_key(input: &str) -> Result<KeyEvent> {
    let keys = parse_keys(input)?;
    match keys.as_slice() {
        [key] => Ok(*key),
        _ => Err(Error::InvalidKeyNotation(input.to_string())),
    }
}

fn parse_special(name: &str) -> Option<KeyEvent> {
    let mut mods = Modifiers::empty();
    let mut rest = name;
    // Modifier prefixes; a trailing "-" alone is the minus key (`<C-->`).
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        let flag = match rest.as_bytes()[0].to_ascii_lowercase() {
            b'c' => Modifiers::CTRL,
            b's' => Modifiers::SHIFT,
            b'a' | b'm' => Modifiers::ALT,
            b'd' => Modifiers::META,
            _ => return None,
        };
        mods |= flag;
        rest = &rest[2..];
    }

    let mut chars = rest.chars();
    if let (Some(c), None) = (chars.next(), chars.clone().next()) {
        if mods.is_empty() {
            // `<x>` without modifiers is not notation.
            return None;
        }
        return Some(KeyEvent::new(KeyCode::Char(c), mods));
    }

    let lower = rest.to_ascii_lowercase();
    let code = match lower.as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" | "nl" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "del" | "delete" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "plug" => KeyCode::Plug,
        "nop" => KeyCode::Nop,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        "bslash" => KeyCode::Char('\\'),
        f if f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
        _ => return None,
    };
    Some(KeyEvent::new(code, mods))
}

/// Formats a key sequence back into notation.
pub fn keys_to_string(keys: &[KeyEvent]) -> String {
    keys.iter().map(ToString::to_string).collect()
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.code {
            KeyCode::Char(' ') => Some("Space".to_string()),
            KeyCode::Char('<') => Some("lt".to_string()),
            KeyCode::Char('|') => Some("Bar".to_string()),
            KeyCode::Char(c) => {
                if self.mods.is_empty() {
                    return write!(f, "{c}");
                }
                Some(c.to_string())
            }
            KeyCode::Esc => Some("Esc".to_string()),
            KeyCode::Enter => Some("CR".to_string()),
            KeyCode::Backspace => Some("BS".to_string()),
            KeyCode::Tab => Some("Tab".to_string()),
            KeyCode::Delete => Some("Del".to_string()),
            KeyCode::Insert => Some("Insert".to_string()),
            KeyCode::Up => Some("Up".to_string()),
            KeyCode::Down => Some("Down".to_string()),
            KeyCode::Left => Some("Left".to_string()),
            KeyCode::Right => Some("Right".to_string()),
            KeyCode::Home => Some("Home".to_string()),
            KeyCode::End => Some("End".to_string()),
            KeyCode::PageUp => Some("PageUp".to_string()),
            KeyCode::PageDown => Some("PageDown".to_string()),
            KeyCode::F(n) => Some(format!("F{n}")),
            KeyCode::Plug => Some("Plug".to_string()),
            KeyCode::Nop => Some("Nop".to_string()),
        };
        let name = name.unwrap_or_default();
        f.write_str("<")?;
        for (flag, prefix) in [
            (Modifiers::CTRL, "C-"),
            (Modifiers::SHIFT, "S-"),
            (Modifiers::ALT, "M-"),
            (Modifiers::META, "D-"),
        ] {
            if self.mods.contains(flag) {
                f.write_str(prefix)?;
            }
        }
        write!(f, "{name}>")
    }
}

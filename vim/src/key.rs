/// Key codes representing individual keys on the keyboard.
///
/// This enum provides a platform-agnostic representation of keys.
/// Hosts should map their platform-specific key events to these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A character key. Shifted letters are canonicalized to their uppercase
    /// form by [`KeyEvent::normalized`].
    Char(char),
    /// The Escape key, used to exit modes and cancel operations.
    Esc,
    /// The Enter/Return key.
    Enter,
    /// The Backspace key.
    Backspace,
    Tab,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function keys `<F1>` through `<F12>`.
    F(u8),
    /// The `<Plug>` pseudo key. It can never be typed, so sequences starting
    /// with it are only reachable through mappings.
    Plug,
    /// The `<Nop>` pseudo key. Mapping to it makes a key do nothing.
    Nop,
}

bitflags::bitflags! {
    /// Keyboard modifier flags.
    ///
    /// These can be combined to represent multiple modifiers held simultaneously.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// A key press event with optional modifiers.
///
/// This is the keystroke unit for mappings, commands and typed input.
/// Equality is structural, so hosts should call [`KeyEvent::normalized`]
/// (the engine does this on entry) before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifier keys held during the key press.
    pub mods: Modifiers,
}

impl KeyEvent {
    pub const fn new(code: KeyCode, mods: Modifiers) -> Self {
        Self { code, mods }
    }

    /// An unmodified key.
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::empty(),
        }
    }

    /// An unmodified character key.
    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    /// A character key with Ctrl held.
    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: Modifiers::CTRL,
        }
    }

    /// Canonical form used for every lookup.
    ///
    /// Shift on a character is folded into the character itself (`S-a` is
    /// `A`), and Ctrl letters are lowercase (`C-A` is `C-a`).
    pub fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(c) => {
                let mut mods = self.mods;
                let mut c = c;
                if mods.contains(Modifiers::SHIFT) && !c.is_control() {
                    mods.remove(Modifiers::SHIFT);
                    if c.is_ascii_lowercase() {
                        c = c.to_ascii_uppercase();
                    }
                }
                if mods.contains(Modifiers::CTRL) && c.is_ascii_uppercase() {
                    c = c.to_ascii_lowercase();
                }
                Self {
                    code: KeyCode::Char(c),
                    mods,
                }
            }
            _ => self,
        }
    }

    pub fn is_escape(&self) -> bool {
        self.code == KeyCode::Esc || *self == Self::ctrl('[')
    }

    /// The character this key types, if it is an unmodified printable key.
    pub fn typed_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self.mods.intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META) =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn as_digit(&self) -> Option<u32> {
        self.typed_char().and_then(|c| c.to_digit(10))
    }
}

impl From<char> for KeyEvent {
    fn from(c: char) -> Self {
        Self::char(c)
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::plain(code)
    }
}

/// Input events that can be processed by the vim engine.
///
/// This enum distinguishes between key presses (used for commands)
/// and text input (used in insert and command-line modes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press event, typically used for commands and navigation.
    Key(KeyEvent),
    /// A character received in text input mode (insert or command-line).
    /// This allows hosts to handle composed characters and IME input.
    /// It bypasses mapping resolution.
    ReceivedChar(char),
}

impl From<KeyEvent> for InputEvent {
    fn from(key: KeyEvent) -> Self {
        InputEvent::Key(key)
    }
}

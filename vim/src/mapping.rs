//! Mode-scoped key mapping tries.
//!
//! Each mode class owns a trie keyed by keystrokes. Lookups report whether
//! the typed keys map exactly, may still grow into a longer mapping, or
//! cannot map at all. Entries remember their owner so a plugin's mappings
//! can be dropped in one write.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::key::KeyEvent;
use crate::notation::keys_to_string;
use crate::types::Mode;

/// Mapping table shared by every editor of a session.
pub type SharedMappings = Arc<RwLock<MappingTable>>;

bitflags::bitflags! {
    /// Mode classes a mapping applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapMode: u8 {
        const NORMAL     = 0b00_0001;
        const VISUAL     = 0b00_0010;
        const SELECT     = 0b00_0100;
        const OP_PENDING = 0b00_1000;
        const INSERT     = 0b01_0000;
        const CMD_LINE   = 0b10_0000;

        /// `:map`
        const NVO = Self::NORMAL.bits() | Self::VISUAL.bits() | Self::SELECT.bits() | Self::OP_PENDING.bits();
        /// `:vmap`
        const VISUAL_SELECT = Self::VISUAL.bits() | Self::SELECT.bits();
        /// `:map!`
        const INSERT_CMD_LINE = Self::INSERT.bits() | Self::CMD_LINE.bits();
    }
}

impl MapMode {
    /// The mode class consulted while `mode` is active.
    pub fn for_mode(mode: Mode) -> MapMode {
        match mode {
            Mode::Normal => MapMode::NORMAL,
            Mode::Insert | Mode::Replace => MapMode::INSERT,
            Mode::Visual(_) => MapMode::VISUAL,
            Mode::Select(_) => MapMode::SELECT,
            Mode::OpPending { .. } => MapMode::OP_PENDING,
            Mode::CmdLine(_) => MapMode::CMD_LINE,
        }
    }

    const CLASSES: [MapMode; 6] = [
        MapMode::NORMAL,
        MapMode::VISUAL,
        MapMode::SELECT,
        MapMode::OP_PENDING,
        MapMode::INSERT,
        MapMode::CMD_LINE,
    ];

    pub(crate) fn classes(self) -> impl Iterator<Item = MapMode> {
        Self::CLASSES.into_iter().filter(move |class| self.contains(*class))
    }

    fn letter(self) -> char {
        Self::CLASSES
            .iter()
            .zip("nxsoic".chars())
            .find(|(class, _)| **class == self)
            .map_or(' ', |(_, letter)| letter)
    }
}

/// Identifies who registered a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Owner(pub u64);

impl Owner {
    /// Mappings typed by the user (`:map` and friends).
    pub const USER: Owner = Owner(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingTarget {
    Keys(Vec<KeyEvent>),
    /// Evaluated when the mapping fires; the result is replayed as keys.
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingInfo {
    pub from_keys: Vec<KeyEvent>,
    pub target: MappingTarget,
    pub owner: Owner,
    pub recursive: bool,
    pub modes: MapMode,
    pub nowait: bool,
    pub silent: bool,
    /// The rhs as written, for listings.
    pub rhs_text: String,
}

impl MappingInfo {
    pub fn keys(from: Vec<KeyEvent>, to: Vec<KeyEvent>, modes: MapMode, recursive: bool) -> Self {
        let rhs_text = keys_to_string(&to);
        Self {
            from_keys: from,
            target: MappingTarget::Keys(to),
            owner: Owner::USER,
            recursive,
            modes,
            nowait: false,
            silent: false,
            rhs_text,
        }
    }

    pub fn expression(from: Vec<KeyEvent>, expr: impl Into<String>, modes: MapMode, recursive: bool) -> Self {
        let expr = expr.into();
        Self {
            from_keys: from,
            target: MappingTarget::Expression(expr.clone()),
            owner: Owner::USER,
            recursive,
            modes,
            nowait: false,
            silent: false,
            rhs_text: expr,
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_nowait(mut self, nowait: bool) -> Self {
        self.nowait = nowait;
        self
    }

    /// One line of `:map` output.
    pub fn describe(&self, class: MapMode) -> String {
        format!(
            "{}  {:<12} {}{}",
            class.letter(),
            keys_to_string(&self.from_keys),
            if self.recursive { ' ' } else { '*' },
            self.rhs_text
        )
    }
}

/// Outcome of looking up typed keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoMapping,
    /// More keys could complete a longer mapping. `exact` is the mapping
    /// the keys so far would commit to on timeout, if any.
    AmbiguousPrefix { exact: Option<Arc<MappingInfo>> },
    Mapped(Arc<MappingInfo>),
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<KeyEvent, TrieNode>,
    mapping: Option<Arc<MappingInfo>>,
}

impl TrieNode {
    fn find(&self, keys: &[KeyEvent]) -> Option<&TrieNode> {
        keys.iter().try_fold(self, |node, key| node.children.get(key))
    }

    fn remove(&mut self, keys: &[KeyEvent]) -> Option<Arc<MappingInfo>> {
        match keys.split_first() {
            None => self.mapping.take(),
            Some((key, rest)) => {
                let child = self.children.get_mut(key)?;
                let removed = child.remove(rest);
                if child.is_empty() {
                    self.children.remove(key);
                }
                removed
            }
        }
    }

    fn retain(&mut self, keep: &impl Fn(&MappingInfo) -> bool) -> usize {
        let mut removed = 0;
        if self.mapping.as_ref().is_some_and(|m| !keep(m.as_ref())) {
            self.mapping = None;
            removed += 1;
        }
        self.children.retain(|_, child| {
            removed += child.retain(keep);
            !child.is_empty()
        });
        removed
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Arc<MappingInfo>>) {
        if let Some(mapping) = &self.mapping {
            out.push(mapping);
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }

    fn is_empty(&self) -> bool {
        self.mapping.is_none() && self.children.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MappingTable {
    tries: HashMap<MapMode, TrieNode>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedMappings {
        Arc::new(RwLock::new(self))
    }

    /// Adds `info` to every mode class it names, replacing existing entries.
    pub fn add(&mut self, info: MappingInfo) -> Result<()> {
        if info.from_keys.is_empty() {
            return Err(Error::InvalidMapping("empty lhs".to_string()));
        }
        debug!(
            lhs = %keys_to_string(&info.from_keys),
            rhs = %info.rhs_text,
            recursive = info.recursive,
            owner = info.owner.0,
            "mapping added"
        );
        let info = Arc::new(info);
        for class in info.modes.classes() {
            let mut node = self.tries.entry(class).or_default();
            for key in &info.from_keys {
                node = node.children.entry(*key).or_default();
            }
            node.mapping = Some(info.clone());
        }
        Ok(())
    }

    /// Whether an exact mapping for `keys` exists in any of `modes`.
    pub fn contains(&self, modes: MapMode, keys: &[KeyEvent]) -> bool {
        modes.classes().any(|class| {
            self.tries
                .get(&class)
                .and_then(|trie| trie.find(keys))
                .is_some_and(|node| node.mapping.is_some())
        })
    }

    /// Removes the mapping for `keys` from `modes` (`:unmap`).
    pub fn remove(&mut self, modes: MapMode, keys: &[KeyEvent]) -> Result<()> {
        let mut removed = false;
        for class in modes.classes() {
            if let Some(trie) = self.tries.get_mut(&class) {
                removed |= trie.remove(keys).is_some();
            }
        }
        if removed {
            Ok(())
        } else {
            Err(Error::NoMapping(keys_to_string(keys)))
        }
    }

    /// Drops every mapping registered by `owner`, in every mode.
    pub fn remove_owner(&mut self, owner: Owner) -> usize {
        let removed: usize = self
            .tries
            .values_mut()
            .map(|trie| trie.retain(&|m: &MappingInfo| m.owner != owner))
            .sum();
        debug!(owner = owner.0, removed, "owner mappings removed");
        removed
    }

    /// `:mapclear` for `modes`.
    pub fn clear(&mut self, modes: MapMode) {
        for class in modes.classes() {
            self.tries.remove(&class);
        }
    }

    pub fn resolve(&self, mode: MapMode, keys: &[KeyEvent]) -> Resolution {
        let Some(node) = self.tries.get(&mode).and_then(|trie| trie.find(keys)) else {
            return Resolution::NoMapping;
        };
        match &node.mapping {
            Some(mapping) if node.children.is_empty() || mapping.nowait => {
                Resolution::Mapped(mapping.clone())
            }
            exact if !node.children.is_empty() => Resolution::AmbiguousPrefix {
                exact: exact.clone(),
            },
            _ => Resolution::NoMapping,
        }
    }

    /// The longest mapping matching a prefix of `keys`.
    pub fn longest_match(&self, mode: MapMode, keys: &[KeyEvent]) -> Option<Arc<MappingInfo>> {
        let mut node = self.tries.get(&mode)?;
        let mut best = None;
        for key in keys {
            match node.children.get(key) {
                Some(child) => {
                    node = child;
                    if let Some(mapping) = &node.mapping {
                        best = Some(mapping.clone());
                    }
                }
                None => break,
            }
        }
        best
    }

    /// Mappings in `modes` whose lhs starts with `prefix`, for `:map` listings.
    pub fn list(&self, modes: MapMode, prefix: &[KeyEvent]) -> Vec<String> {
        let mut lines = Vec::new();
        for class in modes.classes() {
            let Some(node) = self.tries.get(&class).and_then(|trie| trie.find(prefix)) else {
                continue;
            };
            let mut found = Vec::new();
            node.collect(&mut found);
            found.sort_by(|a, b| a.from_keys.cmp(&b.from_keys));
            lines.extend(found.iter().map(|m| m.describe(class)));
        }
        lines
    }
}

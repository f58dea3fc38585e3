//! Key sequence to command lookup, one trie per mode class.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::command::{
    Action, ArgumentType, CommandFlags as F, CommandKind, CommandSpec, InsertKind, Operator,
};
use crate::error::{Error, Result};
use crate::key::KeyEvent;
use crate::mapping::MapMode;
use crate::motion::{Motion, MotionFn};
use crate::notation::parse_keys;
use crate::text_object::TextObject;
use crate::types::SelectionType;

pub type SharedCommands = Arc<RwLock<CommandRegistry>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLookup {
    None,
    Prefix,
    Found(Arc<CommandSpec>),
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<KeyEvent, Node>,
    command: Option<Arc<CommandSpec>>,
}

impl Node {
    fn retain(&mut self, keep: &impl Fn(&CommandSpec) -> bool) {
        if self.command.as_ref().is_some_and(|c| !keep(c)) {
            self.command = None;
        }
        self.children.retain(|_, child| {
            child.retain(keep);
            child.command.is_some() || !child.children.is_empty()
        });
    }
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    roots: HashMap<MapMode, Node>,
    by_id: HashMap<String, Arc<CommandSpec>>,
}

const NXO: MapMode = MapMode::NORMAL.union(MapMode::VISUAL).union(MapMode::OP_PENDING);
const N: MapMode = MapMode::NORMAL;
const X: MapMode = MapMode::VISUAL;
const NX: MapMode = MapMode::NORMAL.union(MapMode::VISUAL);
const XO: MapMode = MapMode::VISUAL.union(MapMode::OP_PENDING);
const XS: MapMode = MapMode::VISUAL_SELECT;

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedCommands {
        Arc::new(RwLock::new(self))
    }

    /// Binds `keys` (in key notation) to `spec` in every class of `modes`.
    /// A later registration for the same keys replaces the earlier one.
    pub fn register(&mut self, modes: MapMode, keys: &str, spec: CommandSpec) -> Result<()> {
        let keys = parse_keys(keys)?;
        if keys.is_empty() {
            return Err(Error::InvalidKeyNotation(String::new()));
        }
        let spec = self
            .by_id
            .get(&spec.id)
            .filter(|existing| ***existing == spec)
            .cloned()
            .unwrap_or_else(|| Arc::new(spec));
        for class in modes.classes() {
            let mut node = self.roots.entry(class).or_default();
            for key in &keys {
                node = node.children.entry(*key).or_default();
            }
            node.command = Some(spec.clone());
        }
        self.by_id.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Registers a host motion under a stable id.
    pub fn register_motion(
        &mut self,
        id: &str,
        keys: &str,
        flags: F,
        motion: MotionFn,
    ) -> Result<()> {
        debug!(id, keys, "registering custom motion");
        self.register(
            NXO,
            keys,
            CommandSpec::new(id, CommandKind::Motion(Motion::Custom(motion)), flags),
        )
    }

    /// Removes every binding of `id`. Returns whether anything was bound.
    pub fn unregister(&mut self, id: &str) -> bool {
        if self.by_id.remove(id).is_none() {
            return false;
        }
        for root in self.roots.values_mut() {
            root.retain(&|spec| spec.id != id);
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<Arc<CommandSpec>> {
        self.by_id.get(id).cloned()
    }

    /// An exact binding wins over longer ones sharing its prefix.
    pub fn lookup(&self, class: MapMode, keys: &[KeyEvent]) -> CommandLookup {
        let Some(mut node) = self.roots.get(&class) else {
            return CommandLookup::None;
        };
        for key in keys {
            match node.children.get(key) {
                Some(child) => node = child,
                None => return CommandLookup::None,
            }
        }
        match &node.command {
            Some(spec) => CommandLookup::Found(spec.clone()),
            None if node.children.is_empty() => CommandLookup::None,
            None => CommandLookup::Prefix,
        }
    }

    /// The built-in Vim command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, modes: MapMode, keys: &[&str], spec: CommandSpec) {
        for k in keys {
            if let Err(err) = self.register(modes, k, spec.clone()) {
                tracing::error!(keys = %k, %err, "invalid default binding");
            }
        }
    }

    fn motion(&mut self, keys: &[&str], id: &str, motion: Motion, flags: F) {
        self.bind(NXO, keys, CommandSpec::new(id, CommandKind::Motion(motion), flags));
    }

    fn motion_arg(&mut self, keys: &[&str], id: &str, motion: Motion, flags: F, arg: ArgumentType) {
        let spec = CommandSpec::new(id, CommandKind::Motion(motion), flags).with_argument(arg);
        self.bind(NXO, keys, spec);
    }

    fn object(&mut self, keys: &[&str], id: &str, object: TextObject) {
        let flags = match object.selection_type() {
            SelectionType::LineWise => F::LINEWISE,
            _ => F::CHARACTERWISE | F::EXCLUSIVE,
        };
        self.bind(XO, keys, CommandSpec::new(id, CommandKind::TextObject(object), flags));
    }

    fn action(&mut self, modes: MapMode, keys: &[&str], id: &str, action: Action, flags: F) {
        self.bind(modes, keys, CommandSpec::new(id, CommandKind::Action(action), flags));
    }

    fn operator(&mut self, modes: MapMode, keys: &[&str], id: &str, op: Operator, flags: F) {
        let flags = if op.is_change() { flags | F::SAVE_STROKE } else { flags };
        let spec = CommandSpec::new(id, CommandKind::Operator(op), flags)
            .with_argument(ArgumentType::Motion);
        self.bind(modes, keys, spec);
    }

    fn alias(&mut self, key: &str, id: &str, to: &str) {
        match parse_keys(to) {
            Ok(keys) => self.bind(N, &[key], CommandSpec::new(id, CommandKind::Alias(keys), F::empty())),
            Err(err) => tracing::error!(to, %err, "invalid alias"),
        }
    }

    fn register_defaults(&mut self) {
        use Motion as M;

        self.motion(&["h", "<C-h>"], "motion.left", M::Left { wrap: 'h' }, F::EXCLUSIVE);
        self.motion(&["<BS>"], "motion.left.backspace", M::Left { wrap: 'b' }, F::EXCLUSIVE);
        self.motion(&["<Left>"], "motion.left.arrow", M::Left { wrap: '<' }, F::EXCLUSIVE);
        self.motion(&["l"], "motion.right", M::Right { wrap: 'l' }, F::EXCLUSIVE);
        self.motion(&["<Space>"], "motion.right.space", M::Right { wrap: 's' }, F::EXCLUSIVE);
        self.motion(&["<Right>"], "motion.right.arrow", M::Right { wrap: '>' }, F::EXCLUSIVE);
        self.motion(&["j", "<Down>", "<C-n>", "<C-j>"], "motion.down", M::Down, F::LINEWISE | F::KEEP_COLUMN);
        self.motion(&["k", "<Up>", "<C-p>"], "motion.up", M::Up, F::LINEWISE | F::KEEP_COLUMN);
        self.motion(&["0", "<Home>"], "motion.line.start", M::LineStart, F::EXCLUSIVE);
        self.motion(&["^"], "motion.line.first-non-blank", M::FirstNonBlank, F::EXCLUSIVE);
        self.motion(&["$", "<End>"], "motion.line.end", M::LineEnd, F::INCLUSIVE | F::COLUMN_END);
        self.motion(&["g_"], "motion.line.last-non-blank", M::LastNonBlank, F::INCLUSIVE);
        self.motion(&["<Bar>"], "motion.column", M::Column, F::EXCLUSIVE);
        self.motion(&["w"], "motion.word.forward", M::WordForward { big: false }, F::EXCLUSIVE);
        self.motion(&["W"], "motion.bigword.forward", M::WordForward { big: true }, F::EXCLUSIVE);
        self.motion(&["b"], "motion.word.backward", M::WordBackward { big: false }, F::EXCLUSIVE);
        self.motion(&["B"], "motion.bigword.backward", M::WordBackward { big: true }, F::EXCLUSIVE);
        self.motion(&["e"], "motion.word.end", M::WordEndForward { big: false }, F::INCLUSIVE);
        self.motion(&["E"], "motion.bigword.end", M::WordEndForward { big: true }, F::INCLUSIVE);
        self.motion(&["ge"], "motion.word.end.backward", M::WordEndBackward { big: false }, F::INCLUSIVE);
        self.motion(&["gE"], "motion.bigword.end.backward", M::WordEndBackward { big: true }, F::INCLUSIVE);
        self.motion(&["gg"], "motion.goto.first", M::GotoLineFirst, F::LINEWISE | F::JUMP);
        self.motion(&["G"], "motion.goto.last", M::GotoLineLast, F::LINEWISE | F::JUMP);
        self.motion(&["+", "<CR>", "<C-m>"], "motion.line.next", M::NextLineStart, F::LINEWISE);
        self.motion(&["-"], "motion.line.previous", M::PrevLineStart, F::LINEWISE);
        self.motion(&["_"], "motion.line.current", M::CurrentLine, F::LINEWISE);
        self.motion(&["}"], "motion.paragraph.forward", M::ParagraphForward, F::EXCLUSIVE | F::JUMP);
        self.motion(&["{"], "motion.paragraph.backward", M::ParagraphBackward, F::EXCLUSIVE | F::JUMP);
        self.motion(&[")"], "motion.sentence.forward", M::SentenceForward, F::EXCLUSIVE | F::JUMP);
        self.motion(&["("], "motion.sentence.backward", M::SentenceBackward, F::EXCLUSIVE | F::JUMP);
        self.motion(&["%"], "motion.match-pair", M::MatchPair, F::INCLUSIVE | F::JUMP);
        self.motion(&["H"], "motion.screen.top", M::ScreenTop, F::LINEWISE | F::JUMP);
        self.motion(&["M"], "motion.screen.middle", M::ScreenMiddle, F::LINEWISE | F::JUMP);
        self.motion(&["L"], "motion.screen.bottom", M::ScreenBottom, F::LINEWISE | F::JUMP);
        self.motion(&["<C-d>"], "motion.scroll.down", M::ScrollDown, F::LINEWISE | F::KEEP_COLUMN);
        self.motion(&["<C-u>"], "motion.scroll.up", M::ScrollUp, F::LINEWISE | F::KEEP_COLUMN);
        self.motion(&["n"], "motion.search.next", M::SearchNext { reverse: false }, F::EXCLUSIVE | F::JUMP);
        self.motion(&["N"], "motion.search.previous", M::SearchNext { reverse: true }, F::EXCLUSIVE | F::JUMP);
        self.motion(&["*"], "motion.search.word.forward", M::SearchWord { forward: true }, F::EXCLUSIVE | F::JUMP);
        self.motion(&["#"], "motion.search.word.backward", M::SearchWord { forward: false }, F::EXCLUSIVE | F::JUMP);
        self.motion(&[";"], "motion.find.repeat", M::RepeatFind { reverse: false }, F::INCLUSIVE);
        self.motion(&[","], "motion.find.reverse", M::RepeatFind { reverse: true }, F::INCLUSIVE);

        let ch = ArgumentType::Character;
        self.motion_arg(&["f"], "motion.find.forward", M::FindChar { forward: true, till: false }, F::INCLUSIVE, ch);
        self.motion_arg(&["F"], "motion.find.backward", M::FindChar { forward: false, till: false }, F::EXCLUSIVE, ch);
        self.motion_arg(&["t"], "motion.till.forward", M::FindChar { forward: true, till: true }, F::INCLUSIVE, ch);
        self.motion_arg(&["T"], "motion.till.backward", M::FindChar { forward: false, till: true }, F::EXCLUSIVE, ch);
        self.motion_arg(&["'"], "motion.mark.line", M::MarkLine, F::LINEWISE | F::JUMP, ch);
        self.motion_arg(&["`"], "motion.mark.exact", M::MarkExact, F::EXCLUSIVE | F::JUMP, ch);
        let ex = ArgumentType::ExString;
        self.motion_arg(&["/"], "motion.search.forward", M::Search { forward: true }, F::EXCLUSIVE | F::JUMP, ex);
        self.motion_arg(&["?"], "motion.search.backward", M::Search { forward: false }, F::EXCLUSIVE | F::JUMP, ex);

        // Select mode only moves with the cursor keys.
        let select = |id: &str, motion: Motion, flags: F| {
            CommandSpec::new(id, CommandKind::Motion(motion), flags)
        };
        self.bind(MapMode::SELECT, &["<Left>"], select("motion.left.arrow", M::Left { wrap: '<' }, F::EXCLUSIVE));
        self.bind(MapMode::SELECT, &["<Right>"], select("motion.right.arrow", M::Right { wrap: '>' }, F::EXCLUSIVE));
        self.bind(MapMode::SELECT, &["<Up>"], select("motion.up", M::Up, F::LINEWISE | F::KEEP_COLUMN));
        self.bind(MapMode::SELECT, &["<Down>"], select("motion.down", M::Down, F::LINEWISE | F::KEEP_COLUMN));
        self.bind(MapMode::SELECT, &["<Home>"], select("motion.line.start", M::LineStart, F::EXCLUSIVE));
        self.bind(MapMode::SELECT, &["<End>"], select("motion.line.end", M::LineEnd, F::INCLUSIVE | F::COLUMN_END));

        use TextObject as T;
        for (big, suffix) in [(false, "w"), (true, "W")] {
            let name = if big { "bigword" } else { "word" };
            self.object(&[&format!("i{suffix}")], &format!("object.{name}.inner"), T::Word { big, around: false });
            self.object(&[&format!("a{suffix}")], &format!("object.{name}.around"), T::Word { big, around: true });
        }
        self.object(&["is"], "object.sentence.inner", T::Sentence { around: false });
        self.object(&["as"], "object.sentence.around", T::Sentence { around: true });
        self.object(&["ip"], "object.paragraph.inner", T::Paragraph { around: false });
        self.object(&["ap"], "object.paragraph.around", T::Paragraph { around: true });
        for (open, close, keys, name) in [
            ('(', ')', ["(", ")", "b"], "paren"),
            ('[', ']', ["[", "]", ""], "bracket"),
            ('{', '}', ["{", "}", "B"], "brace"),
            ('<', '>', ["<lt>", ">", ""], "angle"),
        ] {
            for around in [false, true] {
                let prefix = if around { "a" } else { "i" };
                let bound: Vec<String> = keys
                    .iter()
                    .filter(|k| !k.is_empty())
                    .map(|k| format!("{prefix}{k}"))
                    .collect();
                let bound: Vec<&str> = bound.iter().map(String::as_str).collect();
                let id = format!("object.{name}.{}", if around { "around" } else { "inner" });
                self.object(&bound, &id, T::Block { open, close, around });
            }
        }
        for (quote, key, name) in [('"', "\"", "double"), ('\'', "'", "single"), ('`', "`", "backtick")] {
            self.object(&[&format!("i{key}")], &format!("object.quote.{name}.inner"), T::Quote { quote, around: false });
            self.object(&[&format!("a{key}")], &format!("object.quote.{name}.around"), T::Quote { quote, around: true });
        }

        use Operator as O;
        self.operator(NX, &["d"], "operator.delete", O::Delete, F::empty());
        self.operator(NX, &["c"], "operator.change", O::Change, F::empty());
        self.operator(NX, &["y"], "operator.yank", O::Yank, F::empty());
        self.operator(NX, &[">"], "operator.indent.right", O::IndentRight, F::empty());
        self.operator(NX, &["<lt>"], "operator.indent.left", O::IndentLeft, F::empty());
        self.operator(NX, &["gu"], "operator.lowercase", O::Lowercase, F::empty());
        self.operator(NX, &["gU"], "operator.uppercase", O::Uppercase, F::empty());
        self.operator(NX, &["g~"], "operator.toggle-case", O::ToggleCase, F::empty());
        self.operator(NX, &["g?"], "operator.rot13", O::Rot13, F::empty());
        self.operator(X, &["x", "<Del>"], "visual.delete", O::Delete, F::empty());
        self.operator(X, &["X", "D"], "visual.delete.lines", O::Delete, F::LINEWISE);
        self.operator(X, &["Y"], "visual.yank.lines", O::Yank, F::LINEWISE);
        self.operator(X, &["s"], "visual.change", O::Change, F::empty());
        self.operator(X, &["C", "S", "R"], "visual.change.lines", O::Change, F::LINEWISE);
        self.operator(X, &["u"], "visual.lowercase", O::Lowercase, F::empty());
        self.operator(X, &["U"], "visual.uppercase", O::Uppercase, F::empty());
        self.operator(X, &["~"], "visual.toggle-case", O::ToggleCase, F::empty());

        use Action as A;
        let save = F::SAVE_STROKE;
        self.action(N, &["i", "<Insert>"], "insert.before", A::Insert(InsertKind::Before), save);
        self.action(N, &["a"], "insert.after", A::Insert(InsertKind::After), save);
        self.action(N, &["I"], "insert.line.start", A::Insert(InsertKind::LineStart), save);
        self.action(N, &["A"], "insert.line.end", A::Insert(InsertKind::LineEnd), save);
        self.action(N, &["gI"], "insert.column0", A::Insert(InsertKind::Column0), save);
        self.action(N, &["o"], "insert.open.below", A::Insert(InsertKind::OpenBelow), save);
        self.action(N, &["O"], "insert.open.above", A::Insert(InsertKind::OpenAbove), save);
        self.action(N, &["gi"], "insert.last", A::Insert(InsertKind::LastInsert), save);
        self.action(N, &["R"], "mode.replace", A::ReplaceMode, save);
        self.action(N, &["~"], "edit.toggle-case", A::ToggleCaseChar, save);
        self.action(NX, &["J"], "edit.join", A::JoinLines { spaces: true }, save);
        self.action(NX, &["gJ"], "edit.join.raw", A::JoinLines { spaces: false }, save);
        self.action(NX, &["p"], "put.after", A::Put { before: false, cursor_after: false }, save);
        self.action(NX, &["P"], "put.before", A::Put { before: true, cursor_after: false }, save);
        self.action(N, &["gp"], "put.after.cursor-after", A::Put { before: false, cursor_after: true }, save);
        self.action(N, &["gP"], "put.before.cursor-after", A::Put { before: true, cursor_after: true }, save);
        self.action(N, &["."], "repeat", A::Repeat, F::empty());
        self.action(N, &["u"], "undo", A::Undo, F::empty());
        self.action(N, &["<C-r>"], "redo", A::Redo, F::empty());
        self.action(X, &["I"], "visual.insert.before", A::BlockInsert { append: false }, F::empty());
        self.action(X, &["A"], "visual.insert.after", A::BlockInsert { append: true }, F::empty());
        self.action(NX, &["v"], "visual.characterwise", A::Visual(SelectionType::CharWise), F::empty());
        self.action(NX, &["V"], "visual.linewise", A::Visual(SelectionType::LineWise), F::empty());
        self.action(NX, &["<C-v>", "<C-q>"], "visual.blockwise", A::Visual(SelectionType::BlockWise), F::empty());
        self.action(NX, &["gv"], "visual.reselect", A::ReselectVisual, F::empty());
        self.action(X, &["o"], "visual.swap-ends", A::SwapVisualEnds { block_column: false }, F::empty());
        self.action(X, &["O"], "visual.swap-ends.block", A::SwapVisualEnds { block_column: true }, F::empty());
        self.action(N, &["gh"], "select.characterwise", A::SelectMode(SelectionType::CharWise), F::empty());
        self.action(N, &["gH"], "select.linewise", A::SelectMode(SelectionType::LineWise), F::empty());
        self.action(N, &["g<C-h>"], "select.blockwise", A::SelectMode(SelectionType::BlockWise), F::empty());
        self.action(XS, &["<C-g>"], "visual.toggle-select", A::ToggleVisualSelect, F::empty());
        let op_pending = MapMode::OP_PENDING;
        self.action(op_pending, &["v"], "force.characterwise", A::ForceMotionType(SelectionType::CharWise), F::empty());
        self.action(op_pending, &["V"], "force.linewise", A::ForceMotionType(SelectionType::LineWise), F::empty());
        self.action(op_pending, &["<C-v>"], "force.blockwise", A::ForceMotionType(SelectionType::BlockWise), F::empty());

        let with_char = |id: &str, action: Action, flags: F| {
            CommandSpec::new(id, CommandKind::Action(action), flags).with_argument(ArgumentType::Character)
        };
        self.bind(NX, &["r"], with_char("edit.replace-char", A::ReplaceChar, save));
        self.bind(N, &["m"], with_char("mark.set", A::SetMark, F::empty()));
        let cmdline = CommandSpec::new("cmdline", CommandKind::Action(A::CommandLine), F::empty())
            .with_argument(ArgumentType::ExString);
        self.bind(NX, &[":"], cmdline);

        self.alias("x", "edit.delete-char", "dl");
        self.alias("<Del>", "edit.delete-char.del", "dl");
        self.alias("X", "edit.delete-char.backward", "dh");
        self.alias("D", "edit.delete-to-end", "d$");
        self.alias("C", "edit.change-to-end", "c$");
        self.alias("s", "edit.substitute-char", "cl");
        self.alias("S", "edit.substitute-line", "cc");
        self.alias("Y", "yank.line", "yy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::traits::Buffer;
    use crate::motion::MotionContext;

    fn keys(s: &str) -> Vec<KeyEvent> {
        parse_keys(s).unwrap()
    }

    fn five_right(_buf: &dyn Buffer, ctx: &MotionContext<'_>) -> Result<usize> {
        Ok(ctx.caret + 5)
    }

    #[test]
    fn lookup_prefixes() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(registry.lookup(MapMode::NORMAL, &keys("g")), CommandLookup::Prefix);
        assert!(matches!(
            registry.lookup(MapMode::NORMAL, &keys("gg")),
            CommandLookup::Found(spec) if spec.id == "motion.goto.first"
        ));
        assert_eq!(registry.lookup(MapMode::NORMAL, &keys("Q")), CommandLookup::None);
        assert_eq!(registry.lookup(MapMode::NORMAL, &keys("iw")), CommandLookup::None);
        assert!(matches!(registry.lookup(MapMode::OP_PENDING, &keys("iw")), CommandLookup::Found(_)));
        assert!(matches!(registry.lookup(MapMode::VISUAL, &keys("a<lt>")), CommandLookup::Found(_)));
    }

    #[test]
    fn custom_motion_by_id() {
        let mut registry = CommandRegistry::with_defaults();
        registry
            .register_motion("test.five-right", "I", F::EXCLUSIVE, five_right)
            .unwrap();
        assert!(matches!(
            registry.lookup(MapMode::OP_PENDING, &keys("I")),
            CommandLookup::Found(spec) if spec.id == "test.five-right"
        ));
        // Normal-mode `I` is now the motion too.
        assert!(registry.get("test.five-right").is_some());
        assert!(registry.unregister("test.five-right"));
        assert_eq!(registry.lookup(MapMode::OP_PENDING, &keys("I")), CommandLookup::None);
        assert!(!registry.unregister("test.five-right"));
    }

    #[test]
    fn empty_keys_are_rejected() {
        let mut registry = CommandRegistry::new();
        let spec = CommandSpec::new("x", CommandKind::Action(Action::Undo), F::empty());
        assert!(registry.register(MapMode::NORMAL, "", spec).is_err());
    }
}

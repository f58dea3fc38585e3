//! The modal key-input engine.
//!
//! An [`Engine`] owns what a session shares between editors (mappings,
//! registers, options, the command registry and an optional expression
//! evaluator) plus one [`EditorState`] per open editor, kept in a slotmap
//! and addressed by [`EditorId`]. Each event is processed to completion
//! against the caller's [`Buffer`]; the only deferred work is an ambiguous
//! mapping prefix, which waits for more keys or for [`Engine::handle_timeout`].

mod insert;
mod normal;
mod selection;
mod typeahead;

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::command::{Command, InsertKind};
use crate::error::{Error, Result};
use crate::ex::{self, ExOutcome};
use crate::key::{InputEvent, KeyEvent};
use crate::mapping::{MappingTable, SharedMappings};
use crate::marks::Marks;
use crate::motion::LastFind;
use crate::notation::{keys_to_string, parse_keys_with_leader};
use crate::options::{Options, SharedOptions};
use crate::register::{RegisterSet, SharedRegisters};
use crate::registry::{CommandRegistry, SharedCommands};
use crate::search::SearchDirection;
use crate::traits::{Buffer, Evaluator};
use crate::types::{Mode, ReturnMode};
use crate::visual::{VisualChange, VisualRange};

slotmap::new_key_type! {
    /// Handle of an editor opened with [`Engine::open_editor`].
    pub struct EditorId;
}

/// Something the host should know about after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ModeChanged(Mode),
    /// Keys are buffered until more input (or a timeout) completes them.
    Pending,
    Bell,
    Error(Error),
    /// A command line the engine does not handle itself.
    HostCommand(String),
    Message(String),
}

/// State shared by every editor of a session.
pub struct EngineContext {
    pub mappings: SharedMappings,
    pub registers: SharedRegisters,
    pub options: SharedOptions,
    pub commands: SharedCommands,
    evaluator: Mutex<Option<Box<dyn Evaluator + Send>>>,
}

impl EngineContext {
    /// Installs the evaluator used by `<expr>` mappings.
    pub fn set_evaluator(&self, evaluator: Box<dyn Evaluator + Send>) {
        *self.evaluator.lock() = Some(evaluator);
    }

    /// Runs a command line that needs no editor (`:map`, `:set`, ...).
    pub fn execute_ex(&self, line: &str) -> Result<ExOutcome> {
        ex::execute(line, &self.mappings, &self.options)
    }

    fn options(&self) -> Options {
        self.options.read().clone()
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("options", &*self.options.read())
            .field("evaluator", &self.evaluator.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
struct Counts {
    current: Option<u32>,
}

impl Counts {
    fn push_digit(&mut self, d: u32) {
        let next = self
            .current
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(d);
        self.current = Some(next);
    }

    /// The typed count, 0 when none was typed.
    fn take(&mut self) -> usize {
        self.current.take().map_or(0, |n| n as usize)
    }
}

/// A key waiting in the typeahead queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedKey {
    key: KeyEvent,
    /// Whether mappings may apply to it.
    remap: bool,
    /// Number of mapping expansions that produced it.
    depth: usize,
}

impl QueuedKey {
    fn typed(key: KeyEvent) -> Self {
        Self {
            key,
            remap: true,
            depth: 0,
        }
    }

    fn literal(key: KeyEvent) -> Self {
        Self {
            key,
            remap: false,
            depth: 0,
        }
    }
}

/// Records the keys of the last change for `.`.
#[derive(Debug, Default)]
struct DotRecorder {
    keys: Vec<KeyEvent>,
    recording: bool,
    last: Vec<KeyEvent>,
    replaying: bool,
}

impl DotRecorder {
    fn start(&mut self) {
        if !self.replaying {
            self.keys.clear();
            self.recording = true;
        }
    }

    fn push(&mut self, key: KeyEvent) {
        if self.recording && !self.replaying {
            self.keys.push(key);
        }
    }

    fn stop(&mut self) {
        self.recording = false;
        self.keys.clear();
    }

    fn commit(&mut self) {
        if self.recording && !self.replaying && !self.keys.is_empty() {
            debug!(keys = %keys_to_string(&self.keys), "change recorded for repeat");
            self.last = std::mem::take(&mut self.keys);
        }
        self.stop();
    }
}

/// One caret's visual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VisualCaret {
    anchor: usize,
    head: usize,
}

/// An Insert or Replace mode session.
#[derive(Debug)]
struct InsertSession {
    kind: InsertKind,
    count: usize,
    /// Where each caret started typing.
    starts: Vec<usize>,
    typed: String,
    /// Replace mode: the chars each keystroke overwrote, per caret.
    replaced: Vec<Vec<Option<char>>>,
    /// Return to a single caret on exit (visual block inserts).
    collapse: bool,
    register_pending: bool,
}

/// The command line being typed after `:`, `/` or `?`.
#[derive(Debug)]
struct CmdLine {
    prompt: char,
    text: String,
    /// The mode to go back to once the line is done.
    resume: Mode,
    /// The `:`, `/` or `?` command the line completes.
    command: Command,
    register_pending: bool,
}

/// Per-editor engine state.
#[derive(Debug, Default)]
pub struct EditorState {
    mode: Mode,
    counts: Counts,
    register: Option<char>,
    awaiting_register: bool,
    /// Command keys typed so far.
    keys: Vec<KeyEvent>,
    /// The operator waiting for its motion.
    operator: Option<Command>,
    /// A command waiting for its character or command-line argument.
    awaiting: Option<Command>,
    /// `<C-k>` state: `Some(None)` before the first char.
    digraph: Option<Option<char>>,
    typeahead: VecDeque<QueuedKey>,
    /// Keys held while they may still grow into a longer mapping.
    pending: Vec<QueuedKey>,
    deadline: Option<Instant>,
    /// Preferred column of vertical motions, `usize::MAX` after `$`.
    column: Option<usize>,
    marks: Marks,
    last_find: Option<LastFind>,
    search_direction: SearchDirection,
    visual: Vec<VisualCaret>,
    visual_to_line_end: bool,
    last_visual: Option<VisualRange>,
    last_visual_change: Option<VisualChange>,
    last_insert: Option<usize>,
    dot: DotRecorder,
    insert: Option<InsertSession>,
    cmdline: Option<CmdLine>,
    /// An Insert session holds the host's change group open.
    change_open: bool,
}

impl EditorState {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Nothing is pending: the next key starts a new command.
    fn is_idle(&self) -> bool {
        self.keys.is_empty()
            && self.counts.current.is_none()
            && self.register.is_none()
            && !self.awaiting_register
            && self.operator.is_none()
            && self.awaiting.is_none()
            && self.digraph.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub mode: Mode,
    pub preferred_col: Option<usize>,
    pub pending_count: Option<u32>,
    /// Keys typed but not yet resolved, in key notation.
    pub pending_keys: String,
    pub register: Option<char>,
    /// The command line being typed, with its prompt.
    pub command_line: Option<String>,
}

pub struct EngineBuilder {
    mode: Mode,
    mappings: Option<SharedMappings>,
    registers: Option<SharedRegisters>,
    options: Option<SharedOptions>,
    commands: Option<SharedCommands>,
    evaluator: Option<Box<dyn Evaluator + Send>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            mappings: None,
            registers: None,
            options: None,
            commands: None,
            evaluator: None,
        }
    }
}

impl EngineBuilder {
    /// The mode new editors start in.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mappings(mut self, mappings: SharedMappings) -> Self {
        self.mappings = Some(mappings);
        self
    }

    pub fn registers(mut self, registers: SharedRegisters) -> Self {
        self.registers = Some(registers);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(std::sync::Arc::new(parking_lot::RwLock::new(options)));
        self
    }

    pub fn shared_options(mut self, options: SharedOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn commands(mut self, commands: SharedCommands) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn evaluator(mut self, evaluator: Box<dyn Evaluator + Send>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            ctx: EngineContext {
                mappings: self.mappings.unwrap_or_else(|| MappingTable::new().shared()),
                registers: self.registers.unwrap_or_else(|| RegisterSet::new().shared()),
                options: self
                    .options
                    .unwrap_or_else(|| std::sync::Arc::new(parking_lot::RwLock::new(Options::default()))),
                commands: self
                    .commands
                    .unwrap_or_else(|| CommandRegistry::with_defaults().shared()),
                evaluator: Mutex::new(self.evaluator),
            },
            editors: SlotMap::with_key(),
            initial_mode: self.mode,
        }
    }
}

pub struct Engine {
    ctx: EngineContext,
    editors: SlotMap<EditorId, EditorState>,
    initial_mode: Mode,
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::default().build()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ctx", &self.ctx)
            .field("editors", &self.editors.len())
            .finish()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn open_editor(&mut self) -> EditorId {
        let id = self.editors.insert(EditorState::new(self.initial_mode));
        debug!(?id, "editor opened");
        id
    }

    /// Drops the editor's state. Returns whether it existed.
    pub fn close_editor(&mut self, id: EditorId) -> bool {
        let closed = self.editors.remove(id).is_some();
        debug!(?id, closed, "editor closed");
        closed
    }

    pub fn mode(&self, id: EditorId) -> Option<Mode> {
        self.editors.get(id).map(|state| state.mode)
    }

    pub fn marks(&self, id: EditorId) -> Option<&Marks> {
        self.editors.get(id).map(|state| &state.marks)
    }

    pub fn snapshot(&self, id: EditorId) -> Option<EngineSnapshot> {
        let state = self.editors.get(id)?;
        let mut pending: Vec<KeyEvent> = state.pending.iter().map(|q| q.key).collect();
        pending.splice(0..0, state.keys.iter().copied());
        Some(EngineSnapshot {
            mode: state.mode,
            preferred_col: state.column,
            pending_count: state.counts.current,
            pending_keys: keys_to_string(&pending),
            register: state.register,
            command_line: state
                .cmdline
                .as_ref()
                .map(|line| format!("{}{}", line.prompt, line.text)),
        })
    }

    /// When the pending ambiguous mapping should be resolved, if any.
    pub fn deadline(&self, id: EditorId) -> Option<Instant> {
        self.editors.get(id).and_then(|state| state.deadline)
    }

    pub fn handle_event(&mut self, id: EditorId, buf: &mut dyn Buffer, event: InputEvent) -> Vec<Effect> {
        self.handle_event_at(id, buf, event, Instant::now())
    }

    /// [`handle_event`](Self::handle_event) with an explicit clock.
    pub fn handle_event_at(
        &mut self,
        id: EditorId,
        buf: &mut dyn Buffer,
        event: InputEvent,
        now: Instant,
    ) -> Vec<Effect> {
        let Some(state) = self.editors.get_mut(id) else {
            warn!(?id, "event for unknown editor");
            return Vec::new();
        };
        let mut session = Session::new(&self.ctx, state, buf, now);
        session.expire();
        match event {
            InputEvent::Key(key) => session.state.typeahead.push_back(QueuedKey::typed(key.normalized())),
            InputEvent::ReceivedChar(c) => session
                .state
                .typeahead
                .push_back(QueuedKey::literal(KeyEvent::char(c))),
        }
        session.run();
        session.finish()
    }

    pub fn handle_key(&mut self, id: EditorId, buf: &mut dyn Buffer, key: KeyEvent) -> Vec<Effect> {
        self.handle_event(id, buf, InputEvent::Key(key))
    }

    /// Feeds every key of `notation` (e.g. `"d2w"`, `"<C-v>jjI"`).
    pub fn handle_keys(&mut self, id: EditorId, buf: &mut dyn Buffer, notation: &str) -> Result<Vec<Effect>> {
        self.handle_keys_at(id, buf, notation, Instant::now())
    }

    pub fn handle_keys_at(
        &mut self,
        id: EditorId,
        buf: &mut dyn Buffer,
        notation: &str,
        now: Instant,
    ) -> Result<Vec<Effect>> {
        let leader = self.ctx.options.read().mapleader.clone();
        let keys = parse_keys_with_leader(notation, &leader)?;
        let mut effects = Vec::new();
        for key in keys {
            effects.extend(self.handle_event_at(id, buf, InputEvent::Key(key), now));
        }
        Ok(effects)
    }

    /// Resolves a pending ambiguous mapping whose deadline has passed.
    pub fn handle_timeout(&mut self, id: EditorId, buf: &mut dyn Buffer, now: Instant) -> Vec<Effect> {
        let Some(state) = self.editors.get_mut(id) else {
            return Vec::new();
        };
        let mut session = Session::new(&self.ctx, state, buf, now);
        session.expire();
        session.run();
        session.finish()
    }

    /// Runs a command line for `id` as if typed after `:`.
    pub fn execute_ex(&mut self, id: EditorId, buf: &mut dyn Buffer, line: &str) -> Vec<Effect> {
        let Some(state) = self.editors.get_mut(id) else {
            return Vec::new();
        };
        let mut session = Session::new(&self.ctx, state, buf, Instant::now());
        session.ex_command(line);
        session.finish()
    }
}

/// One event being processed for one editor.
struct Session<'a> {
    ctx: &'a EngineContext,
    state: &'a mut EditorState,
    buf: &'a mut dyn Buffer,
    effects: Vec<Effect>,
    now: Instant,
}

impl<'a> Session<'a> {
    fn new(ctx: &'a EngineContext, state: &'a mut EditorState, buf: &'a mut dyn Buffer, now: Instant) -> Self {
        Self {
            ctx,
            state,
            buf,
            effects: Vec::new(),
            now,
        }
    }

    fn finish(mut self) -> Vec<Effect> {
        if !self.state.pending.is_empty() || !self.state.is_idle() {
            self.effects.push(Effect::Pending);
        }
        self.effects
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.state.mode != mode {
            debug!(from = self.state.mode.name(), to = mode.name(), "mode change");
            self.state.mode = mode;
            self.effects.push(Effect::ModeChanged(mode));
        }
    }

    fn bell(&mut self) {
        self.effects.push(Effect::Bell);
    }

    fn reset_pending(&mut self) {
        let state = &mut *self.state;
        state.counts = Counts::default();
        state.register = None;
        state.awaiting_register = false;
        state.keys.clear();
        state.operator = None;
        state.awaiting = None;
        state.digraph = None;
    }

    /// Drops the command being built after a failure.
    fn abort(&mut self, err: Error) {
        debug!(%err, keys = %keys_to_string(&self.state.keys), "command aborted");
        if err == Error::InvalidMotion {
            self.bell();
        } else {
            self.effects.push(Effect::Error(err));
        }
        self.reset_pending();
        self.state.dot.stop();
        if let Mode::OpPending { return_mode, .. } = self.state.mode {
            self.set_mode(return_mode.into());
        }
    }

    /// Ends a successfully executed command.
    fn complete(&mut self, save: bool) {
        self.reset_pending();
        match self.state.mode {
            Mode::Insert | Mode::Replace if save => {}
            Mode::Normal if save => self.state.dot.commit(),
            _ => self.state.dot.stop(),
        }
    }

    /// Normal mode never rests on a line terminator (unless `virtualedit`
    /// says otherwise).
    fn clamp_normal(&self, offset: usize, onemore: bool) -> usize {
        let buf = &*self.buf;
        let offset = offset.min(buf.len_chars());
        let line = buf.line_of(offset);
        let start = buf.line_start(line);
        let end = buf.line_end(line);
        if offset >= end && end > start && !onemore {
            end - 1
        } else {
            offset.min(end)
        }
    }

    fn set_normal_carets(&mut self, carets: &[usize]) {
        let onemore = self.ctx.options.read().allows_onemore();
        let clamped: Vec<usize> = carets.iter().map(|&c| self.clamp_normal(c, onemore)).collect();
        self.buf.set_carets(&clamped);
        self.buf.scroll_to_caret();
    }

    fn primary_caret(&self) -> usize {
        self.buf.carets().first().copied().unwrap_or(0)
    }

    fn return_mode(mode: Mode) -> ReturnMode {
        match mode {
            Mode::Visual(kind) => ReturnMode::Visual(kind),
            Mode::Select(kind) => ReturnMode::Select(kind),
            Mode::Insert | Mode::Replace => ReturnMode::Insert,
            Mode::OpPending { return_mode, .. } | Mode::CmdLine(return_mode) => return_mode,
            Mode::Normal => ReturnMode::Normal,
        }
    }

    /// `:` commands: mappings and options here, line jumps on the buffer,
    /// everything else to the host.
    fn ex_command(&mut self, line: &str) {
        let ctx = self.ctx;
        ctx.registers.write().set_last_command(line);
        match ctx.execute_ex(line) {
            Ok(ExOutcome::Done) => {}
            Ok(ExOutcome::Message(text)) => self.effects.push(Effect::Message(text)),
            Ok(ExOutcome::GotoLine(n)) => {
                let caret = self.primary_caret();
                self.state.marks.set_special('\'', caret);
                let line = n.saturating_sub(1).min(self.buf.last_line());
                let target = self.buf.first_non_blank(line);
                self.set_normal_carets(&[target]);
            }
            Ok(ExOutcome::Host(command)) => self.effects.push(Effect::HostCommand(command)),
            Err(err) => self.effects.push(Effect::Error(err)),
        }
    }
}

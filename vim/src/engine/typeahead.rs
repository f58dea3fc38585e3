//! The typeahead queue: mapping resolution, ambiguous-prefix waits and
//! dispatch of resolved keys to the mode handlers.

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{Effect, QueuedKey, Session};
use crate::command::{Argument, ArgumentType};
use crate::digraph;
use crate::error::{Error, Result};
use crate::key::{KeyCode, KeyEvent};
use crate::mapping::{MapMode, MappingInfo, MappingTarget, Resolution};
use crate::notation::{keys_to_string, parse_keys_with_leader};
use crate::types::Mode;

impl Session<'_> {
    /// Drains the typeahead queue.
    pub(super) fn run(&mut self) {
        while let Some(queued) = self.state.typeahead.pop_front() {
            if queued.remap && self.mapping_allowed() {
                self.state.pending.push(queued);
                self.resolve_pending();
            } else if !self.state.pending.is_empty() {
                // A literal key ends the wait; what was held resolves first.
                self.state.typeahead.push_front(queued);
                self.flush_pending();
            } else {
                self.dispatch(queued.key);
            }
        }
    }

    /// Resolves held keys whose mapping timeout has passed.
    pub(super) fn expire(&mut self) {
        if self.state.deadline.is_some_and(|deadline| self.now >= deadline) {
            debug!(keys = self.state.pending.len(), "mapping timeout");
            self.flush_pending();
        }
    }

    fn mapping_allowed(&self) -> bool {
        let state = &*self.state;
        let awaits_char = matches!(
            state.awaiting.as_ref().map(|cmd| cmd.argument_type()),
            Some(ArgumentType::Character | ArgumentType::Digraph)
        );
        let register_pending = state.insert.as_ref().is_some_and(|i| i.register_pending)
            || state.cmdline.as_ref().is_some_and(|c| c.register_pending);
        !(awaits_char || register_pending || state.awaiting_register || state.digraph.is_some())
    }

    fn resolve_pending(&mut self) {
        let keys: Vec<KeyEvent> = self.state.pending.iter().map(|q| q.key).collect();
        let class = MapMode::for_mode(self.state.mode);
        let resolution = self.ctx.mappings.read().resolve(class, &keys);
        match resolution {
            Resolution::Mapped(info) => {
                let consumed = std::mem::take(&mut self.state.pending);
                self.state.deadline = None;
                self.expand(&info, consumed);
            }
            Resolution::AmbiguousPrefix { .. } => {
                let options = self.ctx.options.read();
                self.state.deadline = options
                    .timeout
                    .then(|| self.now + Duration::from_millis(options.timeoutlen));
                debug!(keys = %keys_to_string(&keys), timeout = options.timeout, "ambiguous mapping prefix");
            }
            Resolution::NoMapping => self.flush_pending(),
        }
    }

    /// Commits the held keys: the longest mapping among them expands and
    /// the rest are looked at again; with no mapping the first key runs as
    /// typed.
    pub(super) fn flush_pending(&mut self) {
        let mut queued = std::mem::take(&mut self.state.pending);
        self.state.deadline = None;
        if queued.is_empty() {
            return;
        }
        let keys: Vec<KeyEvent> = queued.iter().map(|q| q.key).collect();
        let class = MapMode::for_mode(self.state.mode);
        let longest = self.ctx.mappings.read().longest_match(class, &keys);
        match longest {
            Some(info) => {
                let rest = queued.split_off(info.from_keys.len().min(queued.len()));
                self.push_front(rest);
                self.expand(&info, queued);
            }
            None => {
                let rest = queued.split_off(1);
                self.push_front(rest);
                let first = queued[0];
                self.dispatch(first.key);
            }
        }
    }

    pub(super) fn push_front(&mut self, keys: Vec<QueuedKey>) {
        for key in keys.into_iter().rev() {
            self.state.typeahead.push_front(key);
        }
    }

    fn expand(&mut self, info: &MappingInfo, consumed: Vec<QueuedKey>) {
        let depth = consumed.iter().map(|q| q.depth).max().unwrap_or(0) + 1;
        let max_depth = self.ctx.options.read().maxmapdepth;
        if depth > max_depth {
            warn!(lhs = %keys_to_string(&info.from_keys), depth, "recursive mapping overflow");
            self.effects.push(Effect::Error(Error::RecursiveMappingOverflow { depth: max_depth }));
            let literal = consumed.into_iter().map(|q| QueuedKey { remap: false, ..q }).collect();
            self.push_front(literal);
            return;
        }
        let rhs = match &info.target {
            MappingTarget::Keys(keys) => keys.clone(),
            MappingTarget::Expression(expr) => match self.evaluate(expr) {
                Ok(keys) => keys,
                Err(err) => {
                    self.effects.push(Effect::Error(err));
                    return;
                }
            },
        };
        debug!(
            lhs = %keys_to_string(&info.from_keys),
            rhs = %keys_to_string(&rhs),
            depth,
            recursive = info.recursive,
            "mapping expanded"
        );
        // A recursive rhs that starts with its own lhs does not remap that part.
        let literal_prefix = if info.recursive && rhs.starts_with(&info.from_keys) {
            info.from_keys.len()
        } else {
            0
        };
        let queued = rhs
            .into_iter()
            .enumerate()
            .map(|(i, key)| QueuedKey {
                key,
                remap: info.recursive && i >= literal_prefix,
                depth,
            })
            .collect();
        self.push_front(queued);
    }

    /// Evaluates an `<expr>` rhs into keys. The result is never evaluated again.
    fn evaluate(&mut self, expr: &str) -> Result<Vec<KeyEvent>> {
        let result = {
            let mut evaluator = self.ctx.evaluator.lock();
            let evaluator = evaluator
                .as_mut()
                .ok_or_else(|| Error::Expression(format!("no evaluator for {expr}")))?;
            evaluator.evaluate(expr).map_err(Error::Expression)?
        };
        trace!(expr, result = %result, "expression mapping evaluated");
        let leader = self.ctx.options.read().mapleader.clone();
        parse_keys_with_leader(&result, &leader)
    }

    /// Runs one resolved key in the current mode.
    pub(super) fn dispatch(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Nop {
            return;
        }
        if self.state.mode == Mode::Normal && self.state.is_idle() {
            self.state.dot.start();
        }
        self.state.dot.push(key);
        if self.state.digraph.is_some() {
            return self.digraph_key(key);
        }
        match self.state.mode {
            Mode::Insert | Mode::Replace => self.insert_key(key),
            Mode::CmdLine(_) => self.cmdline_key(key),
            Mode::Select(_) if Self::replaces_selection(key) => self.select_key(key),
            _ => self.command_key(key),
        }
    }

    /// Collects the two chars after `<C-k>`.
    fn digraph_key(&mut self, key: KeyEvent) {
        if key.is_escape() {
            self.state.digraph = None;
            if self.state.awaiting.is_some() {
                self.reset_pending();
            }
            return;
        }
        let Some(c) = key.typed_char() else {
            self.state.digraph = None;
            return self.bell();
        };
        match self.state.digraph {
            Some(None) => self.state.digraph = Some(Some(c)),
            Some(Some(first)) => {
                self.state.digraph = None;
                let ch = digraph::resolve(first, c);
                self.deliver_char(ch);
            }
            None => {}
        }
    }

    /// Hands a digraph result to whoever asked for it.
    fn deliver_char(&mut self, ch: char) {
        match self.state.mode {
            Mode::Insert | Mode::Replace => self.insert_typed(ch),
            Mode::CmdLine(_) => {
                if let Some(line) = self.state.cmdline.as_mut() {
                    line.text.push(ch);
                }
            }
            _ => {
                if let Some(mut cmd) = self.state.awaiting.take() {
                    cmd.argument = Some(Argument::Digraph(ch));
                    self.run_command(cmd);
                }
            }
        }
    }
}

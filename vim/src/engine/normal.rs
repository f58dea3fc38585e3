//! Command keys: counts, registers, operators and their motions, and the
//! Normal mode actions.

use std::cmp::Reverse;

use tracing::debug;

use super::{QueuedKey, Session};
use crate::command::{
    Action, Argument, ArgumentType, Command, CommandFlags, CommandKind, InsertKind, Operator,
};
use crate::error::{Error, Result};
use crate::key::{KeyCode, KeyEvent};
use crate::mapping::MapMode;
use crate::marks::Marks;
use crate::motion::{LastFind, Motion, MotionContext};
use crate::notation::keys_to_string;
use crate::operator::{self, OperatorRequest, apply_operator};
use crate::options::Options;
use crate::range::{ResolvedRange, combine_counts, resolve_range};
use crate::register::is_valid_register;
use crate::registry::CommandLookup;
use crate::search::{self, SearchDirection};
use crate::traits::Buffer;
use crate::types::{Mode, ReturnMode, SelectionType};

const CURRENT_LINE: &str = "motion.line.current";

impl Session<'_> {
    /// A key in Normal, Visual, Select or Operator-pending mode.
    pub(super) fn command_key(&mut self, key: KeyEvent) {
        if let Some(cmd) = self.state.awaiting.take() {
            return self.argument_key(cmd, key);
        }
        if self.state.awaiting_register {
            self.state.awaiting_register = false;
            return match key.typed_char() {
                Some(name) if is_valid_register(name) => self.state.register = Some(name),
                Some(name) => self.abort(Error::InvalidRegister(name)),
                None => self.cancel(),
            };
        }
        if key.is_escape() || key == KeyEvent::ctrl('c') {
            return self.escape();
        }
        if self.state.keys.is_empty() {
            if key == KeyEvent::char('"') {
                self.state.awaiting_register = true;
                return;
            }
            if let Some(d) = key.as_digit()
                && (d != 0 || self.state.counts.current.is_some())
            {
                self.state.counts.push_digit(d);
                return;
            }
        }
        self.state.keys.push(key);
        if let Some(line) = self.doubled_operator() {
            return self.run_command(line);
        }

        let class = MapMode::for_mode(self.state.mode);
        let lookup = self.ctx.commands.read().lookup(class, &self.state.keys);
        match lookup {
            CommandLookup::Prefix => {}
            CommandLookup::None => {
                debug!(keys = %keys_to_string(&self.state.keys), mode = self.state.mode.name(), "no such command");
                self.abort(Error::InvalidMotion);
            }
            CommandLookup::Found(spec) => {
                let raw = self.state.counts.take();
                let register = self.state.register.take();
                let keys = std::mem::take(&mut self.state.keys);
                let cmd = Command::new(spec, raw, register, keys);
                match cmd.argument_type() {
                    ArgumentType::Character | ArgumentType::Digraph => self.state.awaiting = Some(cmd),
                    ArgumentType::ExString => self.start_cmdline(cmd),
                    ArgumentType::None | ArgumentType::Motion => self.run_command(cmd),
                }
            }
        }
    }

    /// The character after `f`, `r`, `m`, ...
    fn argument_key(&mut self, mut cmd: Command, key: KeyEvent) {
        if key.is_escape() {
            return self.cancel();
        }
        if key == KeyEvent::ctrl('k') {
            self.state.awaiting = Some(cmd);
            self.state.digraph = Some(None);
            return;
        }
        let ch = match key.code {
            KeyCode::Enter => Some('\n'),
            KeyCode::Tab => Some('\t'),
            _ if key == KeyEvent::ctrl('m') => Some('\n'),
            _ => key.typed_char(),
        };
        let Some(ch) = ch else {
            return self.abort(Error::InvalidMotion);
        };
        cmd.argument = Some(Argument::Character(ch));
        self.run_command(cmd);
    }

    /// `dd`, `>>`, `gUU`, `gUgU`: the operator applied to whole lines.
    fn doubled_operator(&mut self) -> Option<Command> {
        let op = self.state.operator.as_ref()?;
        let keys = &self.state.keys;
        let doubled = *keys == op.keys
            || (op.keys.len() > 1 && keys.len() == 1 && op.keys.last() == keys.first());
        if !doubled {
            return None;
        }
        let spec = self.ctx.commands.read().get(CURRENT_LINE)?;
        let raw = self.state.counts.take();
        let keys = std::mem::take(&mut self.state.keys);
        Some(Command::new(spec, raw, None, keys))
    }

    fn escape(&mut self) {
        match self.state.mode {
            Mode::Visual(_) | Mode::Select(_) => {
                self.reset_pending();
                self.exit_visual();
            }
            Mode::OpPending { return_mode, .. } => {
                self.reset_pending();
                self.set_mode(return_mode.into());
            }
            _ => {
                if self.state.is_idle() {
                    self.bell();
                }
                self.reset_pending();
            }
        }
        self.state.dot.stop();
    }

    /// Drops the command being built without complaint.
    pub(super) fn cancel(&mut self) {
        self.reset_pending();
        self.state.dot.stop();
        if let Mode::OpPending { return_mode, .. } = self.state.mode {
            self.set_mode(return_mode.into());
        }
    }

    /// Executes a complete command as one change for the host.
    pub(super) fn run_command(&mut self, cmd: Command) {
        debug!(id = %cmd.spec.id, count = cmd.raw_count, register = ?cmd.register, "command");
        self.buf.begin_change();
        self.route(cmd);
        self.buf.end_change();
    }

    fn route(&mut self, cmd: Command) {
        let spec = cmd.spec.clone();
        match &spec.kind {
            CommandKind::Alias(keys) => self.expand_alias(&cmd, keys),
            CommandKind::Motion(_) | CommandKind::TextObject(_) => {
                if let Some(op) = self.state.operator.take() {
                    self.apply_with_motion(op, cmd);
                } else if self.state.mode.selection_type().is_some() {
                    self.extend_selection(cmd);
                } else if matches!(cmd.kind(), CommandKind::Motion(_)) {
                    self.move_carets(cmd);
                } else {
                    self.abort(Error::InvalidMotion);
                }
            }
            CommandKind::Operator(_) => {
                if self.state.mode.selection_type().is_some() {
                    self.apply_to_selection(cmd);
                } else if self.state.operator.is_some() {
                    self.abort(Error::InvalidMotion);
                } else {
                    self.state.operator = Some(cmd);
                    self.set_mode(Mode::OpPending {
                        return_mode: ReturnMode::Normal,
                        forced: None,
                    });
                }
            }
            CommandKind::Action(action) => self.execute_action(*action, cmd),
        }
    }

    /// Replays an alias's keys with the same register and count, unmapped.
    fn expand_alias(&mut self, cmd: &Command, keys: &[KeyEvent]) {
        let mut replay = Vec::with_capacity(keys.len() + 4);
        if let Some(name) = cmd.register {
            replay.push(KeyEvent::char('"'));
            replay.push(KeyEvent::char(name));
        }
        if cmd.raw_count > 0 {
            replay.extend(cmd.raw_count.to_string().chars().map(KeyEvent::char));
        }
        replay.extend_from_slice(keys);
        debug!(alias = %cmd.spec.id, keys = %keys_to_string(&replay), "alias");
        self.reset_pending();
        // The expansion records itself.
        self.state.dot.stop();
        self.push_front(replay.into_iter().map(QueuedKey::literal).collect());
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn motion_context<'c>(
        &'c self,
        caret: usize,
        count: usize,
        raw_count: usize,
        argument: Option<&'c Argument>,
        operator: Option<Operator>,
        options: &'c Options,
        search: Option<&'c (String, SearchDirection)>,
    ) -> MotionContext<'c> {
        MotionContext {
            caret,
            count,
            raw_count,
            argument,
            mode: self.state.mode,
            operator,
            options,
            column: self.state.column,
            marks: &self.state.marks,
            last_find: self.state.last_find,
            last_search: search.map(|(pattern, dir)| (pattern.as_str(), *dir)),
        }
    }

    /// Updates `;`/`,` and `n`/`N` state before a find or search runs.
    pub(super) fn remember_motion(&mut self, cmd: &Command, caret: usize) {
        let CommandKind::Motion(motion) = cmd.kind() else {
            return;
        };
        let direction = |forward: bool| {
            if forward {
                SearchDirection::Forward
            } else {
                SearchDirection::Backward
            }
        };
        match *motion {
            Motion::FindChar { forward, till } => {
                if let Some(ch) = cmd.argument.as_ref().and_then(Argument::as_char) {
                    self.state.last_find = Some(LastFind { ch, forward, till });
                }
            }
            Motion::Search { forward } => {
                self.state.search_direction = direction(forward);
                if let Some(Argument::ExString(pattern)) = &cmd.argument
                    && !pattern.is_empty()
                {
                    self.ctx.registers.write().set_last_search(pattern.as_str());
                }
            }
            Motion::SearchWord { forward } => {
                if let Some(pattern) = search::word_pattern(&*self.buf, caret) {
                    self.ctx.registers.write().set_last_search(pattern);
                    self.state.search_direction = direction(forward);
                }
            }
            _ => {}
        }
    }

    pub(super) fn last_search(&self) -> Option<(String, SearchDirection)> {
        self.ctx
            .registers
            .read()
            .last_search()
            .map(|pattern| (pattern.to_string(), self.state.search_direction))
    }

    /// Keeps, resets or pins the preferred column after a motion from `from`.
    pub(super) fn update_column(&mut self, flags: CommandFlags, from: usize) {
        self.state.column = if flags.contains(CommandFlags::COLUMN_END) {
            Some(usize::MAX)
        } else if flags.contains(CommandFlags::KEEP_COLUMN) {
            Some(self.state.column.unwrap_or_else(|| self.buf.position(from).col))
        } else {
            None
        };
    }

    /// Offsets of `motion` for every caret. A failing primary caret fails
    /// the motion; secondary carets that cannot move stay put.
    pub(super) fn motion_targets(&mut self, cmd: &Command, carets: &[usize]) -> Result<Vec<usize>> {
        let CommandKind::Motion(motion) = *cmd.kind() else {
            return Err(Error::InvalidMotion);
        };
        let primary = carets.first().copied().unwrap_or(0);
        self.remember_motion(cmd, primary);
        let options = self.ctx.options();
        let search = self.last_search();
        let mut targets = Vec::with_capacity(carets.len());
        for (i, &caret) in carets.iter().enumerate() {
            let ctx = self.motion_context(
                caret,
                cmd.count,
                cmd.raw_count,
                cmd.argument.as_ref(),
                None,
                &options,
                search.as_ref(),
            );
            match motion.offset(&*self.buf, &ctx) {
                Ok(target) => targets.push(target),
                Err(err) if i == 0 => return Err(err),
                Err(_) => targets.push(caret),
            }
        }
        Ok(targets)
    }

    fn move_carets(&mut self, cmd: Command) {
        let carets = self.buf.carets();
        let primary = carets.first().copied().unwrap_or(0);
        let targets = match self.motion_targets(&cmd, &carets) {
            Ok(targets) => targets,
            Err(err) => return self.abort(err),
        };
        let flags = cmd.flags();
        if flags.contains(CommandFlags::JUMP) {
            self.state.marks.set_special('\'', primary);
        }
        self.update_column(flags, primary);
        self.set_normal_carets(&targets);
        self.complete(false);
    }

    /// `{operator}{motion}` over every caret.
    fn apply_with_motion(&mut self, op_cmd: Command, motion: Command) {
        let (return_mode, forced) = match self.state.mode {
            Mode::OpPending { return_mode, forced } => (return_mode, forced),
            _ => (ReturnMode::Normal, None),
        };
        let CommandKind::Operator(op) = *op_cmd.kind() else {
            return self.abort(Error::InvalidMotion);
        };
        let (count, raw) = combine_counts(&op_cmd, &motion);
        let carets = self.buf.carets();
        let primary = carets.first().copied().unwrap_or(0);
        self.remember_motion(&motion, primary);
        let options = self.ctx.options();
        let search = self.last_search();

        let mut targets: Vec<ResolvedRange> = Vec::with_capacity(carets.len());
        for &caret in &carets {
            let ctx = self.motion_context(
                caret,
                count,
                raw,
                motion.argument.as_ref(),
                Some(op),
                &options,
                search.as_ref(),
            );
            match resolve_range(&*self.buf, &motion, &ctx, forced) {
                Ok(target) => targets.push(target),
                Err(err) => {
                    debug!(id = %motion.spec.id, caret, "operator motion failed");
                    return self.abort(err);
                }
            }
        }
        if motion.flags().contains(CommandFlags::JUMP) {
            self.state.marks.set_special('\'', primary);
        }

        let request = OperatorRequest {
            operator: op,
            targets: &targets,
            carets: &carets,
            register: op_cmd.register,
            indent: options.indent(),
            shifts: 1,
        };
        let ctx = self.ctx;
        let outcome = {
            let mut registers = ctx.registers.write();
            apply_operator(&mut *self.buf, &mut self.state.marks, &mut registers, request)
        };
        match outcome {
            Ok(outcome) => {
                self.state.column = None;
                if outcome.insert {
                    self.start_insert(InsertKind::Before, 1, outcome.carets, false, false);
                } else {
                    self.set_mode(return_mode.into());
                    self.set_normal_carets(&outcome.carets);
                }
                self.complete(op_cmd.flags().contains(CommandFlags::SAVE_STROKE) || op.is_change());
            }
            Err(err) => self.abort(err),
        }
    }

    fn execute_action(&mut self, action: Action, cmd: Command) {
        let save = cmd.flags().contains(CommandFlags::SAVE_STROKE);
        let visual = self.state.mode.selection_type();
        let result = match action {
            Action::Insert(kind) => self.begin_insert(kind, &cmd),
            Action::ReplaceMode => {
                let carets = self.buf.carets();
                self.start_insert(InsertKind::Before, cmd.count, carets, true, false);
                Ok(())
            }
            Action::Put { before, cursor_after } => match visual {
                Some(kind) => self.put_over_selection(&cmd, kind),
                None => self.put(&cmd, before, cursor_after),
            },
            Action::ReplaceChar => match visual {
                Some(kind) => self.replace_selection(&cmd, kind),
                None => self.replace_chars(&cmd),
            },
            Action::ToggleCaseChar => self.toggle_case(&cmd),
            Action::JoinLines { spaces } => match visual {
                Some(_) => self.join_selection(spaces),
                None => self.join(&cmd, spaces),
            },
            Action::Repeat => return self.repeat(&cmd),
            Action::Undo => self.undo(&cmd, false),
            Action::Redo => self.undo(&cmd, true),
            Action::SetMark => {
                let caret = self.primary_caret();
                match cmd.argument.as_ref().and_then(Argument::as_char) {
                    Some(name) => self.state.marks.set(name, caret),
                    None => Err(Error::InvalidMotion),
                }
            }
            Action::Visual(kind) => self.toggle_visual(kind, &cmd),
            Action::ReselectVisual => self.reselect_visual(&cmd),
            Action::SwapVisualEnds { block_column } => self.swap_visual_ends(block_column),
            Action::SelectMode(kind) => self.enter_select(kind),
            Action::ToggleVisualSelect => self.toggle_visual_select(),
            Action::ForceMotionType(kind) => return self.force_motion_type(kind),
            Action::CommandLine => {
                if let Some(Argument::ExString(line)) = &cmd.argument
                    && !line.trim().is_empty()
                {
                    self.ex_command(line);
                }
                Ok(())
            }
            Action::BlockInsert { append } => self.block_insert(append),
            Action::Custom(f) => f(&mut *self.buf, &cmd),
        };
        match result {
            Ok(()) => self.complete(save),
            Err(err) => self.abort(err),
        }
    }

    fn begin_insert(&mut self, kind: InsertKind, cmd: &Command) -> Result<()> {
        let carets = self.buf.carets();
        let buf = &*self.buf;
        let starts: Vec<usize> = match kind {
            InsertKind::Before => carets,
            InsertKind::After => carets
                .iter()
                .map(|&c| (c + 1).min(buf.line_end(buf.line_of(c))))
                .collect(),
            InsertKind::LineStart => carets
                .iter()
                .map(|&c| buf.first_non_blank(buf.line_of(c)))
                .collect(),
            InsertKind::LineEnd => carets.iter().map(|&c| buf.line_end(buf.line_of(c))).collect(),
            InsertKind::Column0 => carets.iter().map(|&c| buf.line_start(buf.line_of(c))).collect(),
            InsertKind::LastInsert => {
                let primary = carets.first().copied().unwrap_or(0);
                vec![self.state.last_insert.unwrap_or(primary).min(buf.len_chars())]
            }
            InsertKind::OpenBelow => {
                let ranges: Vec<(usize, usize)> = carets
                    .iter()
                    .map(|&c| {
                        let end = buf.line_end(buf.line_of(c));
                        (end, end)
                    })
                    .collect();
                self.edit_at_carets(&ranges, "\n")
            }
            InsertKind::OpenAbove => {
                let ranges: Vec<(usize, usize)> = carets
                    .iter()
                    .map(|&c| {
                        let start = buf.line_start(buf.line_of(c));
                        (start, start)
                    })
                    .collect();
                self.edit_at_carets(&ranges, "\n")
                    .into_iter()
                    .map(|c| c.saturating_sub(1))
                    .collect()
            }
        };
        self.start_insert(kind, cmd.count, starts, false, false);
        Ok(())
    }

    /// Puts the register at every caret, bottom-up.
    fn put(&mut self, cmd: &Command, before: bool, cursor_after: bool) -> Result<()> {
        let name = cmd.register.unwrap_or('"');
        let file_name = self.buf.file_name();
        let content = self.ctx.registers.read().get(name, file_name.as_deref())?;
        let carets = self.buf.carets();
        let mut order: Vec<usize> = (0..carets.len()).collect();
        order.sort_by_key(|&i| Reverse(carets[i]));
        let mut results = vec![0usize; carets.len()];
        let mut done: Vec<usize> = Vec::with_capacity(carets.len());
        for i in order {
            let before_len = self.buf.len_chars();
            let caret = operator::put(
                &mut *self.buf,
                &mut self.state.marks,
                &content,
                carets[i],
                before,
                cursor_after,
                cmd.count,
            );
            let delta = self.buf.len_chars() - before_len;
            for &j in &done {
                results[j] += delta;
            }
            results[i] = caret;
            done.push(i);
        }
        self.state.column = None;
        if cursor_after {
            self.buf.set_carets(&results);
        } else {
            self.set_normal_carets(&results);
        }
        Ok(())
    }

    /// `r{char}`: every caret must have room, or nothing changes.
    fn replace_chars(&mut self, cmd: &Command) -> Result<()> {
        let ch = cmd
            .argument
            .as_ref()
            .and_then(Argument::as_char)
            .ok_or(Error::InvalidMotion)?;
        let carets = self.buf.carets();
        let count = cmd.count;
        let fits = carets
            .iter()
            .all(|&c| c + count <= self.buf.line_end(self.buf.line_of(c)));
        if !fits {
            return Err(Error::InvalidMotion);
        }
        self.edit_each_caret(&carets, |buf, marks, caret| {
            operator::replace_chars(buf, marks, caret, count, ch)
        })
    }

    fn toggle_case(&mut self, cmd: &Command) -> Result<()> {
        let carets = self.buf.carets();
        if carets.iter().any(|&c| c >= self.buf.line_end(self.buf.line_of(c))) {
            return Err(Error::InvalidMotion);
        }
        let count = cmd.count;
        self.edit_each_caret(&carets, |buf, marks, caret| {
            operator::toggle_case_chars(buf, marks, caret, count)
        })
    }

    fn join(&mut self, cmd: &Command, spaces: bool) -> Result<()> {
        let carets = self.buf.carets();
        let last = self.buf.last_line();
        if carets.iter().any(|&c| self.buf.line_of(c) >= last) {
            return Err(Error::InvalidMotion);
        }
        let count = cmd.count;
        self.edit_each_caret(&carets, |buf, marks, caret| {
            let line = buf.line_of(caret);
            operator::join_lines(buf, marks, line, count, spaces)
        })
    }

    /// Runs `edit` at each caret from the bottom up, shifting the carets
    /// already done by the length change. Callers check every caret first,
    /// so no edit runs unless all of them can.
    fn edit_each_caret(
        &mut self,
        carets: &[usize],
        mut edit: impl FnMut(&mut dyn Buffer, &mut Marks, usize) -> Result<usize>,
    ) -> Result<()> {
        let mut order: Vec<usize> = (0..carets.len()).collect();
        order.sort_by_key(|&i| Reverse(carets[i]));
        let mut results = carets.to_vec();
        let mut done: Vec<usize> = Vec::with_capacity(carets.len());
        for i in order {
            let before_len = self.buf.len_chars() as isize;
            results[i] = edit(&mut *self.buf, &mut self.state.marks, carets[i])?;
            let delta = self.buf.len_chars() as isize - before_len;
            for &j in &done {
                results[j] = results[j].saturating_add_signed(delta);
            }
            done.push(i);
        }
        self.state.column = None;
        self.set_normal_carets(&results);
        Ok(())
    }

    fn undo(&mut self, cmd: &Command, redo: bool) -> Result<()> {
        for _ in 0..cmd.count {
            let changed = if redo { self.buf.redo() } else { self.buf.undo() };
            if !changed {
                self.bell();
                break;
            }
        }
        let carets = self.buf.carets();
        self.set_normal_carets(&carets);
        Ok(())
    }

    /// `.`: replays the last change, with a new count when one is given.
    fn repeat(&mut self, cmd: &Command) {
        if self.state.dot.replaying {
            return;
        }
        let mut keys = self.state.dot.last.clone();
        if keys.is_empty() {
            self.bell();
            return self.complete(false);
        }
        if cmd.raw_count > 0 {
            keys = with_count(&keys, cmd.raw_count);
        }
        debug!(keys = %keys_to_string(&keys), "repeat");
        self.reset_pending();
        self.state.dot.stop();
        self.state.dot.replaying = true;
        for key in keys {
            self.dispatch(key);
        }
        self.state.dot.replaying = false;
    }

    /// `v`, `V` and `<C-v>` after an operator.
    fn force_motion_type(&mut self, kind: SelectionType) {
        match self.state.mode {
            Mode::OpPending { return_mode, .. } => {
                self.state.keys.clear();
                self.set_mode(Mode::OpPending {
                    return_mode,
                    forced: Some(kind),
                });
            }
            _ => self.abort(Error::InvalidMotion),
        }
    }
}

/// `keys` with its leading count replaced by `count`, after any `"x` prefix.
fn with_count(keys: &[KeyEvent], count: usize) -> Vec<KeyEvent> {
    let register = if keys.first() == Some(&KeyEvent::char('"')) {
        keys.len().min(2)
    } else {
        0
    };
    let digits = keys[register..]
        .iter()
        .take_while(|k| k.as_digit().is_some())
        .count();
    let mut out = keys[..register].to_vec();
    out.extend(count.to_string().chars().map(KeyEvent::char));
    out.extend_from_slice(&keys[register + digits..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_keys;

    #[test]
    fn repeat_count_replaces_recorded_count() {
        let keys = parse_keys("3dw").unwrap();
        assert_eq!(keys_to_string(&with_count(&keys, 5)), "5dw");
        let keys = parse_keys("\"add").unwrap();
        assert_eq!(keys_to_string(&with_count(&keys, 2)), "\"a2dd");
    }
}

//! Visual and Select mode: the per-caret selections, what motions and
//! operators do to them, and the `gv` memory.

use super::{Session, VisualCaret};
use crate::command::{Argument, Command, CommandFlags, CommandKind, InsertKind, Operator};
use crate::error::{Error, Result};
use crate::key::{KeyCode, KeyEvent};
use crate::operator::{
    self, OperatorRequest, apply_operator, delete_text, insert_text, register_content,
};
use crate::range::ResolvedRange;
use crate::types::{Mode, Position, Selection, SelectionType};
use crate::visual::{
    VisualRange, calculate_visual_range, selection_marks, selection_range, visual_change,
};

impl Session<'_> {
    pub(super) fn enter_visual(&mut self, kind: SelectionType, select: bool, spans: Vec<VisualCaret>) {
        self.state.dot.stop();
        self.state.visual = spans;
        self.set_mode(if select { Mode::Select(kind) } else { Mode::Visual(kind) });
        self.refresh_selection();
    }

    /// Pushes the selections to the host and keeps `'<`/`'>` current.
    pub(super) fn refresh_selection(&mut self) {
        let Some(kind) = self.state.mode.selection_type() else {
            return;
        };
        let selections: Vec<Selection> = self
            .state
            .visual
            .iter()
            .map(|v| Selection {
                anchor: v.anchor,
                head: v.head,
                kind,
            })
            .collect();
        self.buf.set_selections(&selections);
        let heads: Vec<usize> = self.state.visual.iter().map(|v| v.head).collect();
        self.buf.set_carets(&heads);
        self.buf.scroll_to_caret();
        if let Some(primary) = self.state.visual.first().copied() {
            let (start, end) = selection_marks(&*self.buf, primary.anchor, primary.head, kind);
            self.state.marks.set_special('<', start);
            self.state.marks.set_special('>', end);
        }
    }

    /// Leaves Visual or Select mode, remembering the selection for `gv`.
    pub(super) fn exit_visual(&mut self) {
        let Some(kind) = self.state.mode.selection_type() else {
            return;
        };
        if let Some(primary) = self.state.visual.first().copied() {
            self.state.last_visual = Some(VisualRange {
                anchor: primary.anchor,
                head: primary.head,
                kind,
                to_line_end: self.state.visual_to_line_end,
            });
            self.state.last_visual_change =
                Some(visual_change(&*self.buf, primary.anchor, primary.head, kind));
        }
        let heads: Vec<usize> = self.state.visual.drain(..).map(|v| v.head).collect();
        self.state.visual_to_line_end = false;
        self.buf.set_selections(&[]);
        self.set_mode(Mode::Normal);
        if !heads.is_empty() {
            self.set_normal_carets(&heads);
        }
    }

    /// A motion or text object typed while a selection is active.
    pub(super) fn extend_selection(&mut self, cmd: Command) {
        match *cmd.kind() {
            CommandKind::Motion(_) => {
                let heads: Vec<usize> = self.state.visual.iter().map(|v| v.head).collect();
                let primary = heads.first().copied().unwrap_or(0);
                let targets = match self.motion_targets(&cmd, &heads) {
                    Ok(targets) => targets,
                    Err(err) => return self.abort(err),
                };
                let flags = cmd.flags();
                if flags.contains(CommandFlags::JUMP) {
                    self.state.marks.set_special('\'', primary);
                }
                self.update_column(flags, primary);
                self.state.visual_to_line_end = self.state.column == Some(usize::MAX);
                let len = self.buf.len_chars();
                for (span, target) in self.state.visual.iter_mut().zip(targets) {
                    span.head = target.min(len);
                }
            }
            CommandKind::TextObject(object) => {
                let mut spans = self.state.visual.clone();
                for span in &mut spans {
                    let fresh = span.anchor == span.head;
                    let from = if fresh {
                        span.head
                    } else {
                        (span.head + 1).min(self.buf.len_chars())
                    };
                    let range = match object.range(&*self.buf, from, cmd.count) {
                        Ok(range) => range,
                        Err(err) => return self.abort(err),
                    };
                    if fresh || range.start() < span.anchor {
                        span.anchor = range.start().min(span.anchor);
                    }
                    span.head = range.end().saturating_sub(1).max(range.start());
                }
                self.state.visual = spans;
                if object.selection_type() == SelectionType::LineWise
                    && let Mode::Visual(SelectionType::CharWise) = self.state.mode
                {
                    self.set_mode(Mode::Visual(SelectionType::LineWise));
                }
            }
            _ => return self.abort(Error::InvalidMotion),
        }
        self.refresh_selection();
        self.complete(false);
    }

    /// The operator ranges of the current selections.
    fn selection_targets(&self, kind: SelectionType, to_line_end: bool) -> Vec<ResolvedRange> {
        let selection = self.ctx.options.read().selection;
        self.state
            .visual
            .iter()
            .map(|v| ResolvedRange {
                range: selection_range(&*self.buf, v.anchor, v.head, kind, selection, to_line_end),
                kind,
            })
            .collect()
    }

    /// An operator typed in Visual mode acts on the selection.
    pub(super) fn apply_to_selection(&mut self, cmd: Command) {
        let Some(current) = self.state.mode.selection_type() else {
            return self.abort(Error::InvalidMotion);
        };
        let CommandKind::Operator(op) = *cmd.kind() else {
            return self.abort(Error::InvalidMotion);
        };
        // `X`, `D`, `Y`, `C`... work on whole lines, or to the line ends in
        // block mode.
        let (kind, to_line_end) = if cmd.flags().contains(CommandFlags::LINEWISE) {
            if current == SelectionType::BlockWise && op != Operator::Yank {
                (SelectionType::BlockWise, true)
            } else {
                (SelectionType::LineWise, false)
            }
        } else {
            (current, self.state.visual_to_line_end)
        };
        let targets = self.selection_targets(kind, to_line_end);
        let carets: Vec<usize> = targets.iter().map(|t| t.range.start()).collect();
        self.exit_visual();

        let options = self.ctx.options();
        let request = OperatorRequest {
            operator: op,
            targets: &targets,
            carets: &carets,
            register: cmd.register,
            indent: options.indent(),
            shifts: cmd.count,
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
                    let block = kind == SelectionType::BlockWise;
                    self.start_insert(InsertKind::Before, 1, outcome.carets, false, block);
                } else {
                    self.set_normal_carets(&outcome.carets);
                }
                self.complete(false);
            }
            Err(err) => self.abort(err),
        }
    }

    /// `v`, `V`, `<C-v>`: enter, switch or leave Visual mode.
    pub(super) fn toggle_visual(&mut self, kind: SelectionType, cmd: &Command) -> Result<()> {
        match self.state.mode {
            Mode::Visual(current) if current == kind => self.exit_visual(),
            Mode::Visual(_) => {
                self.set_mode(Mode::Visual(kind));
                self.refresh_selection();
            }
            Mode::Normal => {
                let carets = self.buf.carets();
                // `{count}v` reuses the shape of the last visual operation.
                let (kind, spans) = match self.state.last_visual_change {
                    Some(change) if cmd.raw_count > 0 => {
                        let spans = carets
                            .iter()
                            .map(|&c| VisualCaret {
                                anchor: c,
                                head: calculate_visual_range(&*self.buf, change, cmd.count, c),
                            })
                            .collect();
                        (change.kind, spans)
                    }
                    _ => (
                        kind,
                        carets.iter().map(|&c| VisualCaret { anchor: c, head: c }).collect(),
                    ),
                };
                self.enter_visual(kind, false, spans);
            }
            _ => return Err(Error::InvalidMotion),
        }
        Ok(())
    }

    /// `gv`: the previous selection, or in Visual mode, swap with it.
    pub(super) fn reselect_visual(&mut self, cmd: &Command) -> Result<()> {
        let last = self.state.last_visual.ok_or(Error::InvalidMotion)?;
        self.exit_visual();
        let len = self.buf.len_chars();
        let (mut anchor, mut head) = (last.anchor.min(len), last.head.min(len));
        if cmd.raw_count > 0 {
            let change = visual_change(&*self.buf, anchor, head, last.kind);
            anchor = anchor.min(head);
            head = calculate_visual_range(&*self.buf, change, cmd.count, anchor);
        }
        self.state.visual_to_line_end = last.to_line_end;
        self.enter_visual(last.kind, false, vec![VisualCaret { anchor, head }]);
        Ok(())
    }

    /// `o` and `O`.
    pub(super) fn swap_visual_ends(&mut self, block_column: bool) -> Result<()> {
        let kind = self.state.mode.selection_type().ok_or(Error::InvalidMotion)?;
        let buf = &*self.buf;
        for span in &mut self.state.visual {
            if block_column && kind == SelectionType::BlockWise {
                // Other corner on the same line.
                let (a, h) = (buf.position(span.anchor), buf.position(span.head));
                span.anchor = buf.offset_at(Position::new(a.line, h.col));
                span.head = buf.offset_at(Position::new(h.line, a.col));
            } else {
                std::mem::swap(&mut span.anchor, &mut span.head);
            }
        }
        self.state.column = None;
        self.refresh_selection();
        Ok(())
    }

    /// `gh`, `gH`, `g<C-h>`.
    pub(super) fn enter_select(&mut self, kind: SelectionType) -> Result<()> {
        let spans = self
            .buf
            .carets()
            .into_iter()
            .map(|c| VisualCaret { anchor: c, head: c })
            .collect();
        self.enter_visual(kind, true, spans);
        Ok(())
    }

    /// `<C-g>`
    pub(super) fn toggle_visual_select(&mut self) -> Result<()> {
        let next = match self.state.mode {
            Mode::Visual(kind) => Mode::Select(kind),
            Mode::Select(kind) => Mode::Visual(kind),
            _ => return Err(Error::InvalidMotion),
        };
        self.set_mode(next);
        self.refresh_selection();
        Ok(())
    }

    /// `I` and `A` in Visual mode. Blocks get one caret per line: `I`
    /// skips lines too short to reach the block, `A` pads them.
    pub(super) fn block_insert(&mut self, append: bool) -> Result<()> {
        let kind = self.state.mode.selection_type().ok_or(Error::InvalidMotion)?;
        let span = self.state.visual.first().copied().ok_or(Error::InvalidMotion)?;
        let to_line_end = self.state.visual_to_line_end;
        let (start, end) = (span.anchor.min(span.head), span.anchor.max(span.head));
        let starts = match kind {
            SelectionType::BlockWise => {
                let (a, h) = (self.buf.position(span.anchor), self.buf.position(span.head));
                let (top, bottom) = (a.line.min(h.line), a.line.max(h.line));
                let (left, right) = (a.col.min(h.col), a.col.max(h.col) + 1);
                let mut starts = Vec::with_capacity(bottom - top + 1);
                for line in top..=bottom {
                    let len = self.buf.line_len(line);
                    if append {
                        let col = if to_line_end { len } else { right };
                        if len < col {
                            let at = self.buf.line_end(line);
                            insert_text(&mut *self.buf, &mut self.state.marks, at, &" ".repeat(col - len));
                        }
                        starts.push(self.buf.line_start(line) + col);
                    } else if len >= left {
                        starts.push(self.buf.line_start(line) + left);
                    }
                }
                if starts.is_empty() {
                    starts.push(self.buf.line_start(top) + left.min(self.buf.line_len(top)));
                }
                starts
            }
            SelectionType::LineWise if append => vec![self.buf.line_end(self.buf.line_of(end))],
            SelectionType::LineWise => vec![self.buf.line_start(self.buf.line_of(start))],
            SelectionType::CharWise if append => {
                vec![(end + 1).min(self.buf.line_end(self.buf.line_of(end)))]
            }
            SelectionType::CharWise => vec![start],
        };
        self.exit_visual();
        let insert = if append { InsertKind::After } else { InsertKind::Before };
        self.start_insert(insert, 1, starts, false, kind == SelectionType::BlockWise);
        Ok(())
    }

    /// `p`/`P` over a selection: the selection goes to the unnamed
    /// register and the register's old content takes its place.
    pub(super) fn put_over_selection(&mut self, cmd: &Command, kind: SelectionType) -> Result<()> {
        let name = cmd.register.unwrap_or('"');
        let file_name = self.buf.file_name();
        let content = self.ctx.registers.read().get(name, file_name.as_deref())?;
        let to_line_end = self.state.visual_to_line_end;
        let target = self
            .selection_targets(kind, to_line_end)
            .into_iter()
            .next()
            .ok_or(Error::InvalidMotion)?;
        self.exit_visual();
        self.ctx
            .registers
            .write()
            .store_delete(None, register_content(&*self.buf, &target))?;

        let (start, end) = (target.range.start(), target.range.end());
        let marks = &mut self.state.marks;
        let caret = match (kind, content.kind) {
            (SelectionType::LineWise, _) => {
                let first = self.buf.line_of(start);
                let mut text = match content.kind {
                    SelectionType::LineWise => content.text.clone(),
                    _ => content.lines().join("\n") + "\n",
                };
                text = text.repeat(cmd.count);
                if self.buf.char_at(end.saturating_sub(1)) != Some('\n') {
                    text.pop();
                }
                delete_text(&mut *self.buf, marks, start, end);
                insert_text(&mut *self.buf, marks, start, &text);
                self.buf.first_non_blank(first)
            }
            (_, SelectionType::LineWise) => {
                for (s, e) in target.range.pairs().rev() {
                    delete_text(&mut *self.buf, marks, s, e);
                }
                let text = format!("\n{}", content.text.repeat(cmd.count));
                insert_text(&mut *self.buf, marks, start, &text);
                self.buf.first_non_blank(self.buf.line_of(start) + 1)
            }
            _ => {
                for (s, e) in target.range.pairs().rev() {
                    delete_text(&mut *self.buf, marks, s, e);
                }
                operator::put(&mut *self.buf, marks, &content, start, true, false, cmd.count)
            }
        };
        self.state.column = None;
        self.set_normal_carets(&[caret]);
        Ok(())
    }

    /// `r{char}` over the selection.
    pub(super) fn replace_selection(&mut self, cmd: &Command, kind: SelectionType) -> Result<()> {
        let ch = cmd
            .argument
            .as_ref()
            .and_then(Argument::as_char)
            .ok_or(Error::InvalidMotion)?;
        let mut targets = self.selection_targets(kind, self.state.visual_to_line_end);
        let caret = targets.first().map_or(0, |t| t.range.start());
        self.exit_visual();
        targets.sort_by_key(|t| std::cmp::Reverse(t.range.start()));
        for target in &targets {
            operator::replace_range(&mut *self.buf, &mut self.state.marks, target, ch);
        }
        self.set_normal_carets(&[caret]);
        Ok(())
    }

    /// `J`/`gJ` joins the selected lines, at least two.
    pub(super) fn join_selection(&mut self, spaces: bool) -> Result<()> {
        let span = self.state.visual.first().copied().ok_or(Error::InvalidMotion)?;
        let first = self.buf.line_of(span.anchor.min(span.head));
        let last = self.buf.line_of(span.anchor.max(span.head));
        self.exit_visual();
        let caret = operator::join_lines(&mut *self.buf, &mut self.state.marks, first, last - first + 1, spaces)?;
        self.set_normal_carets(&[caret]);
        Ok(())
    }

    /// Keys that replace the selection in Select mode.
    pub(super) fn replaces_selection(key: KeyEvent) -> bool {
        key.typed_char().is_some()
            || (key.mods.is_empty()
                && matches!(
                    key.code,
                    KeyCode::Enter | KeyCode::Backspace | KeyCode::Delete | KeyCode::Tab
                ))
    }

    /// Select mode: the selection is deleted and typing continues in
    /// Insert mode.
    pub(super) fn select_key(&mut self, key: KeyEvent) {
        let Some(kind) = self.state.mode.selection_type() else {
            return;
        };
        let targets = self.selection_targets(kind, self.state.visual_to_line_end);
        let carets: Vec<usize> = targets.iter().map(|t| t.range.start()).collect();
        self.exit_visual();
        let options = self.ctx.options();
        let request = OperatorRequest {
            operator: Operator::Change,
            targets: &targets,
            carets: &carets,
            register: Some('_'),
            indent: options.indent(),
            shifts: 1,
        };
        let ctx = self.ctx;
        self.buf.begin_change();
        let outcome = {
            let mut registers = ctx.registers.write();
            apply_operator(&mut *self.buf, &mut self.state.marks, &mut registers, request)
        };
        self.buf.end_change();
        match outcome {
            Ok(outcome) => {
                self.start_insert(InsertKind::Before, 1, outcome.carets, false, false);
                self.complete(false);
                let typed = match key.code {
                    KeyCode::Enter => Some('\n'),
                    KeyCode::Tab => Some('\t'),
                    _ => key.typed_char(),
                };
                if let Some(ch) = typed {
                    self.insert_typed(ch);
                }
            }
            Err(err) => self.abort(err),
        }
    }
}

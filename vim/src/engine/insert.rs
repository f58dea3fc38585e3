//! Insert, Replace and Command-line mode input.

use std::cmp::Reverse;

use tracing::{debug, trace};

use super::{CmdLine, Effect, InsertSession, Session};
use crate::command::{Argument, Command, InsertKind};
use crate::key::{KeyCode, KeyEvent};
use crate::motion::{CharClass, char_class};
use crate::operator::{delete_text, insert_text};
use crate::types::Mode;

/// One replacement of `start..end` by `text`, leaving the caret `caret`
/// chars after `start`.
struct Edit {
    start: usize,
    end: usize,
    text: String,
    caret: usize,
}

impl Edit {
    fn insert(at: usize, text: &str) -> Self {
        Self {
            start: at,
            end: at,
            text: text.to_string(),
            caret: text.chars().count(),
        }
    }

    fn delete(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: String::new(),
            caret: 0,
        }
    }
}

fn is_key(key: KeyEvent, code: KeyCode) -> bool {
    key == KeyEvent::plain(code)
}

impl Session<'_> {
    /// Enters Insert (or Replace) mode with a caret at each of `starts`.
    /// The host's change group stays open until the session ends.
    pub(super) fn start_insert(
        &mut self,
        kind: InsertKind,
        count: usize,
        starts: Vec<usize>,
        replace: bool,
        collapse: bool,
    ) {
        if !self.state.change_open {
            self.buf.begin_change();
            self.state.change_open = true;
        }
        let len = self.buf.len_chars();
        let starts: Vec<usize> = starts.into_iter().map(|s| s.min(len)).collect();
        self.buf.set_carets(&starts);
        self.buf.scroll_to_caret();
        self.state.insert = Some(InsertSession {
            kind,
            count: count.max(1),
            replaced: vec![Vec::new(); starts.len()],
            starts,
            typed: String::new(),
            collapse,
            register_pending: false,
        });
        self.set_mode(if replace { Mode::Replace } else { Mode::Insert });
    }

    /// Editors created in Insert mode have no session yet.
    fn ensure_insert_session(&mut self) {
        if self.state.insert.is_none() {
            let carets = self.buf.carets();
            self.state.insert = Some(InsertSession {
                kind: InsertKind::Before,
                count: 1,
                replaced: vec![Vec::new(); carets.len()],
                starts: carets,
                typed: String::new(),
                collapse: false,
                register_pending: false,
            });
        }
    }

    /// Applies one edit per caret (in caret order) from the bottom up and
    /// moves the carets after them.
    fn apply_edits(&mut self, edits: Vec<Edit>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..edits.len()).collect();
        order.sort_by_key(|&i| Reverse(edits[i].start));
        let mut results = vec![0usize; edits.len()];
        let mut done: Vec<usize> = Vec::with_capacity(edits.len());
        for i in order {
            let edit = &edits[i];
            delete_text(&mut *self.buf, &mut self.state.marks, edit.start, edit.end);
            insert_text(&mut *self.buf, &mut self.state.marks, edit.start, &edit.text);
            let delta = edit.text.chars().count() as isize - (edit.end - edit.start) as isize;
            for &j in &done {
                results[j] = results[j].saturating_add_signed(delta);
            }
            results[i] = edit.start + edit.caret;
            done.push(i);
        }
        self.buf.set_carets(&results);
        self.buf.scroll_to_caret();
        results
    }

    /// Replaces each `(start, end)` with `text`; returns the new carets.
    pub(super) fn edit_at_carets(&mut self, ranges: &[(usize, usize)], text: &str) -> Vec<usize> {
        let edits = ranges
            .iter()
            .map(|&(start, end)| Edit {
                start,
                end,
                text: text.to_string(),
                caret: text.chars().count(),
            })
            .collect();
        self.apply_edits(edits)
    }

    fn insert_at_carets(&mut self, text: &str) {
        let edits = self
            .buf
            .carets()
            .into_iter()
            .map(|c| Edit::insert(c, text))
            .collect();
        self.apply_edits(edits);
        if let Some(session) = self.state.insert.as_mut() {
            session.typed.push_str(text);
        }
    }

    /// A typed character. In Replace mode it overwrites, except at the
    /// end of a line or for a line break.
    pub(super) fn insert_typed(&mut self, ch: char) {
        self.ensure_insert_session();
        let mut utf8 = [0u8; 4];
        let text: &str = ch.encode_utf8(&mut utf8);
        if self.state.mode != Mode::Replace {
            return self.insert_at_carets(text);
        }
        let carets = self.buf.carets();
        let mut overwritten = Vec::with_capacity(carets.len());
        let edits = carets
            .iter()
            .map(|&c| {
                let end = self.buf.line_end(self.buf.line_of(c));
                if ch != '\n' && c < end {
                    overwritten.push(self.buf.char_at(c));
                    Edit {
                        start: c,
                        end: c + 1,
                        text: text.to_string(),
                        caret: 1,
                    }
                } else {
                    overwritten.push(None);
                    Edit::insert(c, text)
                }
            })
            .collect();
        self.apply_edits(edits);
        if let Some(session) = self.state.insert.as_mut() {
            session.typed.push(ch);
            session.replaced.resize(overwritten.len(), Vec::new());
            for (stack, old) in session.replaced.iter_mut().zip(overwritten) {
                stack.push(old);
            }
        }
    }

    pub(super) fn insert_key(&mut self, key: KeyEvent) {
        self.ensure_insert_session();
        if self.state.insert.as_ref().is_some_and(|s| s.register_pending) {
            return self.insert_register(key);
        }
        if key.is_escape() || key == KeyEvent::ctrl('c') {
            return self.finish_insert();
        }
        if key == KeyEvent::ctrl('k') {
            self.state.digraph = Some(None);
        } else if key == KeyEvent::ctrl('r') {
            if let Some(session) = self.state.insert.as_mut() {
                session.register_pending = true;
            }
        } else if is_key(key, KeyCode::Enter) || key == KeyEvent::ctrl('m') || key == KeyEvent::ctrl('j') {
            self.insert_typed('\n');
        } else if is_key(key, KeyCode::Tab) || key == KeyEvent::ctrl('i') {
            self.insert_tab();
        } else if is_key(key, KeyCode::Backspace) || key == KeyEvent::ctrl('h') {
            self.insert_backspace();
        } else if is_key(key, KeyCode::Delete) {
            self.insert_delete();
        } else if key == KeyEvent::ctrl('w') {
            self.delete_before_carets(true);
        } else if key == KeyEvent::ctrl('u') {
            self.delete_before_carets(false);
        } else if key.mods.is_empty()
            && matches!(
                key.code,
                KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End
            )
        {
            self.insert_move(key.code);
        } else if let Some(c) = key.typed_char() {
            self.insert_typed(c);
        } else {
            trace!(key = %key, "key ignored in insert mode");
        }
    }

    /// Spaces to the next tab stop with `expandtab`, a tab otherwise.
    fn insert_tab(&mut self) {
        let options = self.ctx.options();
        if !options.expandtab {
            return self.insert_typed('\t');
        }
        let caret = self.primary_caret();
        let line = self.buf.line_of(caret);
        let tabstop = options.tabstop.max(1);
        let width = self
            .buf
            .slice(self.buf.line_start(line), caret)
            .chars()
            .fold(0, |w, c| if c == '\t' { w + tabstop - w % tabstop } else { w + 1 });
        let spaces = tabstop - width % tabstop;
        self.insert_at_carets(&" ".repeat(spaces));
    }

    fn insert_backspace(&mut self) {
        let carets = self.buf.carets();
        let replace = self.state.mode == Mode::Replace;
        let mut restored = Vec::with_capacity(carets.len());
        if replace && let Some(session) = self.state.insert.as_mut() {
            for i in 0..carets.len() {
                restored.push(session.replaced.get_mut(i).and_then(Vec::pop));
            }
        }
        let edits = carets
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if c == 0 {
                    return Edit::insert(c, "");
                }
                match restored.get(i) {
                    // Replace mode puts back what was overwritten.
                    Some(Some(Some(old))) => Edit {
                        start: c - 1,
                        end: c,
                        text: old.to_string(),
                        caret: 0,
                    },
                    Some(Some(None)) | None => Edit::delete(c - 1, c),
                    // Before the replaced text only the caret moves.
                    Some(None) => Edit {
                        start: c - 1,
                        end: c - 1,
                        text: String::new(),
                        caret: 0,
                    },
                }
            })
            .collect();
        self.apply_edits(edits);
        if let Some(session) = self.state.insert.as_mut() {
            session.typed.pop();
        }
    }

    fn insert_delete(&mut self) {
        let len = self.buf.len_chars();
        let edits = self
            .buf
            .carets()
            .into_iter()
            .map(|c| Edit::delete(c, (c + 1).min(len)))
            .collect();
        self.apply_edits(edits);
    }

    /// `<C-w>` deletes the word before each caret, `<C-u>` everything typed
    /// on the line (or the whole line before the caret).
    fn delete_before_carets(&mut self, word: bool) {
        let carets = self.buf.carets();
        let starts = self
            .state
            .insert
            .as_ref()
            .map(|s| s.starts.clone())
            .unwrap_or_default();
        let buf = &*self.buf;
        let edits: Vec<Edit> = carets
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let line_start = buf.line_start(buf.line_of(c));
                if c == line_start {
                    return Edit::delete(c.saturating_sub(1), c);
                }
                let from = if word {
                    let mut from = c;
                    while from > line_start && buf.char_at(from - 1).is_some_and(char::is_whitespace) {
                        from -= 1;
                    }
                    let class = buf.char_at(from.saturating_sub(1)).map(|ch| char_class(ch, false));
                    while from > line_start
                        && class.is_some_and(|k| k != CharClass::Blank)
                        && buf.char_at(from - 1).map(|ch| char_class(ch, false)) == class
                    {
                        from -= 1;
                    }
                    from
                } else {
                    match starts.get(i) {
                        Some(&s) if s > line_start && s < c => s,
                        _ => line_start,
                    }
                };
                Edit::delete(from, c)
            })
            .collect();
        let removed = edits.first().map_or(0, |e| e.end - e.start);
        self.apply_edits(edits);
        if let Some(session) = self.state.insert.as_mut() {
            let keep = session.typed.chars().count().saturating_sub(removed);
            session.typed = session.typed.chars().take(keep).collect();
        }
    }

    /// Cursor keys move the carets and start a fresh insert there.
    fn insert_move(&mut self, code: KeyCode) {
        let buf = &*self.buf;
        let moved: Vec<usize> = buf
            .carets()
            .into_iter()
            .map(|c| {
                let pos = buf.position(c);
                let (start, end) = (buf.line_start(pos.line), buf.line_end(pos.line));
                match code {
                    KeyCode::Left if c > start => c - 1,
                    KeyCode::Right if c < end => c + 1,
                    KeyCode::Up if pos.line > 0 => {
                        let line = pos.line - 1;
                        buf.line_start(line) + pos.col.min(buf.line_len(line))
                    }
                    KeyCode::Down if pos.line < buf.last_line() => {
                        let line = pos.line + 1;
                        buf.line_start(line) + pos.col.min(buf.line_len(line))
                    }
                    KeyCode::Home => start,
                    KeyCode::End => end,
                    _ => c,
                }
            })
            .collect();
        self.buf.set_carets(&moved);
        self.buf.scroll_to_caret();
        if let Some(session) = self.state.insert.as_mut() {
            session.replaced = vec![Vec::new(); moved.len()];
            session.starts = moved;
            session.typed.clear();
            session.count = 1;
        }
    }

    /// `<C-r>{register}`
    fn insert_register(&mut self, key: KeyEvent) {
        if let Some(session) = self.state.insert.as_mut() {
            session.register_pending = false;
        }
        let Some(name) = key.typed_char() else {
            return;
        };
        let file_name = self.buf.file_name();
        let content = self.ctx.registers.read().get(name, file_name.as_deref());
        match content {
            Ok(content) => self.insert_at_carets(&content.text),
            Err(err) => self.effects.push(Effect::Error(err)),
        }
    }

    /// `<Esc>`: repeats the text for a count, records it, steps the caret
    /// back and returns to Normal mode.
    fn finish_insert(&mut self) {
        let Some(session) = self.state.insert.take() else {
            return self.set_mode(Mode::Normal);
        };
        let mut carets = self.buf.carets();
        if session.count > 1 && !session.typed.is_empty() && self.state.mode == Mode::Insert {
            let chunk = match session.kind {
                InsertKind::OpenBelow | InsertKind::OpenAbove => format!("\n{}", session.typed),
                _ => session.typed.clone(),
            };
            let extra = chunk.repeat(session.count - 1);
            let ranges: Vec<(usize, usize)> = carets.iter().map(|&c| (c, c)).collect();
            carets = self.edit_at_carets(&ranges, &extra);
        }
        debug!(typed = %session.typed, count = session.count, "insert finished");
        self.ctx.registers.write().set_last_inserted(session.typed.as_str());

        let primary = carets.first().copied().unwrap_or(0);
        let start = session.starts.first().copied().unwrap_or(primary).min(primary);
        self.state.last_insert = Some(primary);
        self.state.marks.set_special('[', start);
        self.state.marks.set_special(']', primary.saturating_sub(1).max(start));
        if !session.typed.is_empty() {
            self.state.marks.set_special('.', primary.saturating_sub(1).max(start));
        }

        let buf = &*self.buf;
        let stepped: Vec<usize> = if session.collapse {
            vec![session.starts.iter().copied().min().unwrap_or(primary)]
        } else {
            carets
                .iter()
                .map(|&c| {
                    if c > buf.line_start(buf.line_of(c)) {
                        c - 1
                    } else {
                        c
                    }
                })
                .collect()
        };
        if self.state.change_open {
            self.buf.end_change();
            self.state.change_open = false;
        }
        self.state.column = None;
        self.set_mode(Mode::Normal);
        self.set_normal_carets(&stepped);
        self.state.dot.commit();
    }

    /// Opens the command line for `:`, `/` or `?`.
    pub(super) fn start_cmdline(&mut self, command: Command) {
        let prompt = command.keys.last().and_then(KeyEvent::typed_char).unwrap_or(':');
        let mut text = String::new();
        if prompt == ':' {
            if self.state.mode.selection_type().is_some() {
                self.exit_visual();
                text.push_str("'<,'>");
            } else if command.raw_count > 1 {
                text = format!(".,.+{}", command.raw_count - 1);
            } else if command.raw_count == 1 {
                text.push('.');
            }
        }
        let resume = self.state.mode;
        self.state.cmdline = Some(CmdLine {
            prompt,
            text,
            resume,
            command,
            register_pending: false,
        });
        self.set_mode(Mode::CmdLine(Self::return_mode(resume)));
    }

    pub(super) fn cmdline_key(&mut self, key: KeyEvent) {
        let ctx = self.ctx;
        let Some(line) = self.state.cmdline.as_mut() else {
            return self.set_mode(Mode::Normal);
        };
        if line.register_pending {
            line.register_pending = false;
            if let Some(name) = key.typed_char() {
                let file_name = self.buf.file_name();
                match ctx.registers.read().get(name, file_name.as_deref()) {
                    Ok(content) => line.text.push_str(content.text.trim_end_matches('\n')),
                    Err(err) => self.effects.push(Effect::Error(err)),
                }
            }
            return;
        }
        if key.is_escape() || key == KeyEvent::ctrl('c') {
            return self.close_cmdline(false);
        }
        if is_key(key, KeyCode::Enter) || key == KeyEvent::ctrl('m') || key == KeyEvent::ctrl('j') {
            return self.close_cmdline(true);
        }
        if is_key(key, KeyCode::Backspace) || key == KeyEvent::ctrl('h') {
            if line.text.pop().is_none() {
                self.close_cmdline(false);
            }
        } else if key == KeyEvent::ctrl('u') {
            line.text.clear();
        } else if key == KeyEvent::ctrl('w') {
            let trimmed = line.text.trim_end().len();
            line.text.truncate(trimmed);
            let class = line.text.chars().last().map(|c| char_class(c, false));
            while line.text.chars().last().map(|c| char_class(c, false)) == class && class.is_some() {
                line.text.pop();
            }
        } else if key == KeyEvent::ctrl('r') {
            line.register_pending = true;
        } else if key == KeyEvent::ctrl('k') {
            self.state.digraph = Some(None);
        } else if is_key(key, KeyCode::Tab) {
            line.text.push('\t');
        } else if let Some(c) = key.typed_char() {
            line.text.push(c);
        }
    }

    /// Leaves the command line, running its command when `submit`.
    fn close_cmdline(&mut self, submit: bool) {
        let Some(line) = self.state.cmdline.take() else {
            return;
        };
        self.set_mode(line.resume);
        if !submit {
            debug!(prompt = %line.prompt, "command line cancelled");
            return self.cancel();
        }
        let mut command = line.command;
        command.argument = Some(Argument::ExString(line.text));
        self.run_command(command);
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Effect, Engine};
    use crate::rope_buffer::RopeBuffer;
    use crate::traits::Buffer;
    use crate::types::Mode;

    #[test]
    fn insert_with_count_repeats_text() {
        let mut engine = Engine::new();
        let id = engine.open_editor();
        let mut buf = RopeBuffer::new("x\n");
        engine.handle_keys(id, &mut buf, "3ia<Esc>").unwrap();
        assert_eq!(buf.text(), "aaax\n");
        assert_eq!(buf.carets(), vec![2]);
        assert_eq!(engine.mode(id), Some(Mode::Normal));
    }

    #[test]
    fn replace_mode_backspace_restores() {
        let mut engine = Engine::new();
        let id = engine.open_editor();
        let mut buf = RopeBuffer::new("abcd");
        engine.handle_keys(id, &mut buf, "Rxyz<BS><BS><Esc>").unwrap();
        assert_eq!(buf.text(), "xbcd");
    }

    #[test]
    fn ctrl_w_deletes_word_before_caret() {
        let mut engine = Engine::new();
        let id = engine.open_editor();
        let mut buf = RopeBuffer::new("");
        engine.handle_keys(id, &mut buf, "ione two<C-w><Esc>").unwrap();
        assert_eq!(buf.text(), "one ");
    }

    #[test]
    fn cmdline_backspace_on_empty_cancels() {
        let mut engine = Engine::new();
        let id = engine.open_editor();
        let mut buf = RopeBuffer::new("abc");
        let effects = engine.handle_keys(id, &mut buf, ":<BS>").unwrap();
        assert!(effects.contains(&Effect::ModeChanged(Mode::Normal)));
        assert_eq!(engine.mode(id), Some(Mode::Normal));
    }

    #[test]
    fn digraph_in_insert_mode() {
        let mut engine = Engine::new();
        let id = engine.open_editor();
        let mut buf = RopeBuffer::new("");
        engine.handle_keys(id, &mut buf, "i<C-k>a:<C-k>Eu<Esc>").unwrap();
        assert_eq!(buf.text(), "ä€");
    }
}

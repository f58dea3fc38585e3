//! Terminal UI example using crossterm and ratatui.
//!
//! A minimal host: a `RopeBuffer` edited through the engine, with the
//! selection highlighted and `:q` / `:w` handled as host commands.
//! Run with: cargo run --example tui_crossterm
//! Set `VIM_ENGINE_LOG=<file>` to write the engine's debug log there.

use crossterm::{
    event::{self, Event, KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::io;
use std::time::{Duration, Instant};
use vim_engine::{
    Buffer, EditorId, Effect, Engine, InputEvent, KeyCode, KeyEvent, Modifiers, Mode, RopeBuffer,
    visual::selection_range,
};

const WELCOME: &str = "Welcome to vim_engine!\n\nPress 'i' to enter insert mode.\nPress 'Esc' to return to normal mode.\nPress ':q<Enter>' to quit.\n\nTry vim commands like:\n- hjkl, w, b, } for movement\n- dd to delete a line, . to repeat it\n- yy to yank a line, p to paste\n- v, V, <C-v> for visual selections\n- / to search, n to repeat\n- jk in insert mode is mapped to <Esc>\n";

struct App {
    engine: Engine,
    id: EditorId,
    buffer: RopeBuffer,
    message: String,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        let mut engine = Engine::new();
        if let Err(err) = engine.context().execute_ex("inoremap jk <Esc>") {
            eprintln!("mapping failed: {err}");
        }
        let id = engine.open_editor();
        Self {
            engine,
            id,
            buffer: RopeBuffer::new(WELCOME).with_file_name("welcome.txt"),
            message: String::new(),
            should_quit: false,
        }
    }

    fn handle_crossterm_event(&mut self, event: CKeyEvent) {
        let Some(key) = convert_crossterm_event(event) else {
            return;
        };
        let effects = self.engine.handle_event(self.id, &mut self.buffer, InputEvent::Key(key));
        self.apply_effects(effects);
    }

    fn handle_timeout(&mut self) {
        let effects = self.engine.handle_timeout(self.id, &mut self.buffer, Instant::now());
        self.apply_effects(effects);
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::HostCommand(command) => self.host_command(&command),
                Effect::Error(err) => self.message = format!("E: {err}"),
                Effect::Message(text) => self.message = text,
                Effect::ModeChanged(_) => self.message.clear(),
                Effect::Bell | Effect::Pending => {}
            }
        }
    }

    fn host_command(&mut self, command: &str) {
        match command.trim() {
            "q" | "q!" | "quit" | "wq" | "x" => self.should_quit = true,
            "w" | "write" => self.message = "\"welcome.txt\" written (not really)".to_string(),
            other => self.message = format!("Not an editor command: {other}"),
        }
    }

    /// How long to wait for input before an ambiguous mapping resolves.
    fn poll_timeout(&self) -> Duration {
        match self.engine.deadline(self.id) {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::from_secs(60),
        }
    }

    fn status(&self) -> String {
        let Some(snapshot) = self.engine.snapshot(self.id) else {
            return String::new();
        };
        if let Some(line) = snapshot.command_line {
            return line;
        }
        let mode = match snapshot.mode {
            Mode::Normal | Mode::OpPending { .. } | Mode::CmdLine(_) => String::new(),
            mode => format!("-- {} --", mode.name()),
        };
        let count = snapshot.pending_count.map(|n| n.to_string()).unwrap_or_default();
        format!("{mode:<16}{:<24}{count}{}", self.message, snapshot.pending_keys)
    }
}

fn convert_crossterm_event(event: CKeyEvent) -> Option<KeyEvent> {
    let mut mods = Modifiers::empty();
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        mods |= Modifiers::SHIFT;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        mods |= Modifiers::CTRL;
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        mods |= Modifiers::ALT;
    }
    let code = match event.code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::Insert => KeyCode::Insert,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::F(n) => KeyCode::F(n),
        _ => return None,
    };
    Some(KeyEvent::new(code, mods))
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(f.size());

    let buf = &app.buffer;
    let selection = app.engine.context().options.read().selection;
    let ranges: Vec<(usize, usize)> = buf
        .selections()
        .iter()
        .flat_map(|sel| {
            selection_range(buf, sel.anchor, sel.head, sel.kind, selection, false)
                .pairs()
                .collect::<Vec<_>>()
        })
        .collect();
    let selected = |offset: usize| ranges.iter().any(|&(s, e)| offset >= s && offset < e);

    let mut lines = Vec::with_capacity(buf.line_count());
    for line in 0..buf.line_count() {
        let start = buf.line_start(line);
        let spans: Vec<Span> = buf
            .line_text(line)
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if selected(start + i) {
                    Span::styled(c.to_string(), Style::default().bg(Color::Blue))
                } else {
                    Span::raw(c.to_string())
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let text = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("vim_engine demo"),
    );
    f.render_widget(text, chunks[0]);

    let status = Paragraph::new(app.status())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[1]);

    let pos = buf.position(buf.caret());
    f.set_cursor(
        chunks[0].x + 1 + pos.col as u16,
        chunks[0].y + 1 + pos.line as u16,
    );
}

fn init_logging() {
    let Ok(path) = std::env::var("VIM_ENGINE_LOG") else {
        return;
    };
    match std::fs::File::create(&path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .init(),
        Err(err) => eprintln!("cannot open {path}: {err}"),
    }
}

fn main() -> Result<(), io::Error> {
    init_logging();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if !event::poll(app.poll_timeout())? {
            app.handle_timeout();
            continue;
        }
        if let Event::Key(key) = event::read()? {
            app.handle_crossterm_event(key);
            if app.should_quit {
                break;
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

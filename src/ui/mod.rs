//! Terminal keyboard for keysynth
//!
//! Shows:
//! - Oscilloscope of recent output
//! - Piano strip with held notes lit
//! - Octave and voice counts
//!
//! and turns key presses into notes.

mod piano;
mod scope;

pub use piano::Piano;
pub use scope::Scope;

use std::io::Stdout;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use log::{debug, warn};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use crate::config::KeyboardConfig;
use crate::engine::Engine;
use crate::input::{KeyTracker, Keymap, NoteEvent};
use crate::synth::{note_name, NoteId};

/// Ring buffer of recent output samples for the scope
pub struct ScopeBuffer {
    samples: Vec<f32>,
    write_pos: usize,
}

impl ScopeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Push a new sample, overwriting the oldest
    pub fn push(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.samples.len();
    }

    /// The most recent `count` samples, oldest first
    pub fn recent(&self, count: usize) -> Vec<f32> {
        let count = count.min(self.samples.len());
        let (newer, older) = self.samples.split_at(self.write_pos);
        older.iter().chain(newer).skip(self.samples.len() - count).copied().collect()
    }
}

/// What a key press asks the UI loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Note(NoteEvent),
    AllNotesOff,
    Quit,
}

/// Keyboard state: which keys map to which notes and which are held
pub struct Controls {
    keymap: Keymap,
    tracker: KeyTracker,
    amplitude: f64,
}

impl Controls {
    pub fn new(config: &KeyboardConfig) -> Self {
        Self {
            keymap: Keymap::new(config.base_note),
            tracker: KeyTracker::new(Duration::from_secs_f64(config.hold_timeout)),
            amplitude: config.amplitude,
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Key releases are reported by the terminal
    pub fn set_reports_release(&mut self, reports: bool) {
        self.tracker.set_reports_release(reports);
    }

    pub fn reports_release(&self) -> bool {
        self.tracker.reports_release()
    }

    /// Translate one terminal key event
    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Command> {
        if key.kind == KeyEventKind::Release {
            return match key.code {
                KeyCode::Char(c) => self.tracker.release(c).map(Command::Note).into_iter().collect(),
                _ => Vec::new(),
            };
        }

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => vec![Command::Quit],
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => vec![Command::Quit],
            (KeyCode::Char(' '), _) if key.kind == KeyEventKind::Press => {
                self.tracker.release_all();
                vec![Command::AllNotesOff]
            }
            (KeyCode::Char('['), _) if key.kind == KeyEventKind::Press => {
                self.keymap.octave_down();
                Vec::new()
            }
            (KeyCode::Char(']'), _) if key.kind == KeyEventKind::Press => {
                self.keymap.octave_up();
                Vec::new()
            }
            (KeyCode::Char(c), _) => match self.keymap.note_for(c) {
                Some(note) => self.tracker.press(c, note, now).map(Command::Note).into_iter().collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Note-offs for keys whose auto-repeat stopped
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        self.tracker.expire(now).into_iter().map(Command::Note).collect()
    }
}

/// Snapshot of engine state for one frame
struct Status {
    held: Vec<NoteId>,
    releasing: usize,
}

/// Restores the terminal however the UI loop exits
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    enhanced: bool,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        let terminal = execute!(stdout, EnterAlternateScreen)
            .and_then(|_| Terminal::new(CrosstermBackend::new(stdout)));
        let mut guard = match terminal {
            Ok(terminal) => Self {
                terminal,
                enhanced: false,
            },
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
                return Err(err.into());
            }
        };

        if matches!(supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                guard.terminal.backend_mut(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
            guard.enhanced = true;
        }

        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn lock(engine: &Mutex<Engine>) -> Result<MutexGuard<'_, Engine>> {
    engine.lock().map_err(|_| anyhow!("engine lock poisoned"))
}

fn apply(engine: &Mutex<Engine>, command: Command, amplitude: f64) -> Result<()> {
    let mut engine = lock(engine)?;
    let result = match command {
        Command::Note(NoteEvent::On(note)) => engine.note_on(note, amplitude),
        Command::Note(NoteEvent::Off(note)) => engine.note_off(note),
        Command::AllNotesOff => engine.all_notes_off(),
        Command::Quit => Ok(()),
    };
    if let Err(err) = result {
        warn!("{:?} failed: {}", command, err);
    }
    Ok(())
}

/// Run the keyboard UI until the user quits
pub fn run(
    engine: Arc<Mutex<Engine>>,
    scope: Arc<Mutex<ScopeBuffer>>,
    keyboard: &KeyboardConfig,
) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let mut controls = Controls::new(keyboard);
    controls.set_reports_release(guard.enhanced);
    debug!("key release events: {}", guard.enhanced);

    loop {
        let status = {
            let engine = lock(&engine)?;
            Status {
                held: engine.held_notes(),
                releasing: engine.releasing_count(),
            }
        };
        let samples = scope
            .lock()
            .map(|buf| buf.recent(buf.capacity()))
            .unwrap_or_default();

        guard
            .terminal
            .draw(|f| draw_ui(f, &controls, &status, &samples))?;

        let mut commands = Vec::new();
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                commands.extend(controls.on_key(key, Instant::now()));
            }
        }
        commands.extend(controls.tick(Instant::now()));

        for command in commands {
            if command == Command::Quit {
                lock(&engine)?.all_notes_off().ok();
                return Ok(());
            }
            apply(&engine, command, controls.amplitude())?;
        }
    }
}

fn draw_ui(f: &mut Frame, controls: &Controls, status: &Status, samples: &[f32]) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Scope
            Constraint::Length(5), // Piano
            Constraint::Length(3), // Status
        ])
        .split(area);

    let scope = Scope::new(samples)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Output "));
    f.render_widget(scope, chunks[0]);

    let (low, high) = controls.keymap().range();
    let piano = Piano::new(low, high, &status.held)
        .block(Block::default().borders(Borders::ALL).title(" Keys "));
    f.render_widget(piano, chunks[1]);

    draw_status(f, chunks[2], controls, status);
}

fn draw_status(f: &mut Frame, area: Rect, controls: &Controls, status: &Status) {
    let keymap = controls.keymap();
    let held: Vec<String> = status.held.iter().map(|&n| note_name(n)).collect();
    let held = if held.is_empty() { "-".to_string() } else { held.join(" ") };

    let text = Line::from(vec![
        Span::raw("  Octave: "),
        Span::styled(
            format!("{:+} ({})", keymap.octave(), note_name(keymap.root())),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  |  Held: "),
        Span::styled(held, Style::default().fg(Color::Yellow)),
        Span::raw(format!("  |  Releasing: {}", status.releasing)),
        Span::raw("  |  [ ]: octave  Space: all off  Esc: quit"),
    ]);

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn release(c: char) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn test_scope_buffer_recent() {
        let mut buffer = ScopeBuffer::new(10);
        for i in 0..10 {
            buffer.push(i as f32);
        }

        assert_eq!(buffer.recent(3), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_scope_buffer_wrap() {
        let mut buffer = ScopeBuffer::new(3);
        for s in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(s);
        }

        assert_eq!(buffer.recent(3), vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.recent(10).len(), 3);
    }

    #[test]
    fn test_scope_buffer_starts_silent() {
        let buffer = ScopeBuffer::new(4);
        assert_eq!(buffer.recent(4), vec![0.0; 4]);
    }

    #[test]
    fn test_controls_note_keys() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        let now = Instant::now();

        assert_eq!(controls.on_key(press('z'), now), vec![Command::Note(NoteEvent::On(60))]);
        // Auto-repeat from the terminal
        assert!(controls.on_key(press('z'), now).is_empty());
        assert!(controls.on_key(press('a'), now).is_empty());
    }

    #[test]
    fn test_controls_release_events() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        controls.set_reports_release(true);
        let now = Instant::now();

        controls.on_key(press('x'), now);
        assert_eq!(controls.on_key(release('x'), now), vec![Command::Note(NoteEvent::Off(62))]);
    }

    #[test]
    fn test_controls_shifted_release() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        controls.set_reports_release(true);
        let now = Instant::now();

        controls.on_key(press('z'), now);
        assert_eq!(controls.on_key(release('Z'), now), vec![Command::Note(NoteEvent::Off(60))]);
    }

    #[test]
    fn test_controls_hold_timeout() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        let now = Instant::now();

        controls.on_key(press('z'), now);
        assert!(controls.tick(now + Duration::from_millis(100)).is_empty());
        assert_eq!(
            controls.tick(now + Duration::from_secs(1)),
            vec![Command::Note(NoteEvent::Off(60))]
        );
    }

    #[test]
    fn test_controls_octave_keeps_held_note() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        controls.set_reports_release(true);
        let now = Instant::now();

        controls.on_key(press('z'), now);
        controls.on_key(press(']'), now);
        assert_eq!(controls.keymap().root(), 72);
        // Release ends the note that was started, not the shifted one
        assert_eq!(controls.on_key(release('z'), now), vec![Command::Note(NoteEvent::Off(60))]);
        assert_eq!(controls.on_key(press('z'), now), vec![Command::Note(NoteEvent::On(72))]);
    }

    #[test]
    fn test_controls_space_and_quit() {
        let mut controls = Controls::new(&KeyboardConfig::default());
        let now = Instant::now();

        controls.on_key(press('z'), now);
        assert_eq!(controls.on_key(press(' '), now), vec![Command::AllNotesOff]);
        assert!(controls.tick(now + Duration::from_secs(5)).is_empty());

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(controls.on_key(esc, now), vec![Command::Quit]);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controls.on_key(ctrl_c, now), vec![Command::Quit]);
    }

    #[test]
    fn test_apply_commands_to_engine() {
        let mut config = crate::config::SynthConfig::default();
        config.audio.sample_rate = 8000;
        let engine = Mutex::new(Engine::new(&config));

        apply(&engine, Command::Note(NoteEvent::On(64)), 0.8).unwrap();
        assert_eq!(engine.lock().unwrap().held_notes(), vec![64]);

        apply(&engine, Command::AllNotesOff, 0.8).unwrap();
        assert!(engine.lock().unwrap().held_notes().is_empty());
    }
}

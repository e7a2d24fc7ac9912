//! Live keyboard control for the tone source.
//!
//! Keys are polled without blocking right before each fill, on the engine's
//! own thread, so the generator is never shared.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::sample_source::{FillOutcome, SampleSource};
use super::tone::ToneGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCommand {
    Increase,
    Decrease,
    Stop,
}

impl ToneCommand {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match key.code {
            KeyCode::Up => Some(Self::Increase),
            KeyCode::Down => Some(Self::Decrease),
            KeyCode::Esc | KeyCode::Char('q') => Some(Self::Stop),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Self::Stop)
            }
            _ => None,
        }
    }
}

/// Non-blocking source of control commands.
pub trait ControlInput {
    /// Commands that arrived since the previous poll. Must not block.
    fn poll(&mut self) -> Vec<ToneCommand>;

    /// Called after a command moved the tone to `frequency`.
    fn frequency_changed(&mut self, frequency: f64) {
        info!("Frequency: {} Hz", frequency);
    }
}

/// `text` terminated for a terminal in raw mode, where `\n` alone does not
/// return to column 0.
pub fn raw_line(text: &str) -> String {
    format!("{text}\r\n")
}

pub const TONE_HELP: &str =
    "Simple sine wave generator. UP/DOWN arrows to change frequency, ESC to quit";

/// Reads arrow keys and Esc from the terminal.
pub struct TerminalControl {
    _raw_mode: RawModeGuard,
}

impl TerminalControl {
    pub fn new() -> Result<Self> {
        Ok(Self {
            _raw_mode: RawModeGuard::enable()?,
        })
    }

    /// Print a full line to stdout while raw mode is active.
    pub fn print_line(&self, text: &str) {
        let mut stdout = io::stdout();
        if let Err(e) = stdout
            .write_all(raw_line(text).as_bytes())
            .and_then(|_| stdout.flush())
        {
            debug!("Failed to write to terminal: {}", e);
        }
    }
}

impl ControlInput for TerminalControl {
    fn poll(&mut self) -> Vec<ToneCommand> {
        let mut commands = Vec::new();
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("Terminal poll failed: {}", e);
                    break;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) => commands.extend(ToneCommand::from_key(&key)),
                Ok(_) => {}
                Err(e) => {
                    warn!("Terminal read failed: {}", e);
                    break;
                }
            }
        }
        commands
    }

    fn frequency_changed(&mut self, frequency: f64) {
        debug!("Frequency changed to {} Hz", frequency);
        self.print_line(&format!("Frequency: {frequency} Hz"));
    }
}

/// Terminal raw mode for as long as the guard lives.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable terminal raw mode")?;
        debug!("Terminal raw mode enabled");
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Tone generator steered by a [`ControlInput`].
pub struct KeyboardTone<C: ControlInput> {
    tone: ToneGenerator,
    control: C,
}

impl<C: ControlInput> KeyboardTone<C> {
    pub fn new(tone: ToneGenerator, control: C) -> Self {
        Self { tone, control }
    }

    pub fn tone(&self) -> &ToneGenerator {
        &self.tone
    }

    fn apply_pending(&mut self) {
        for command in self.control.poll() {
            match command {
                ToneCommand::Increase => self.tone.increase_frequency(),
                ToneCommand::Decrease => self.tone.decrease_frequency(),
                ToneCommand::Stop => self.tone.request_stop(),
            }
            if command != ToneCommand::Stop {
                self.control.frequency_changed(self.tone.frequency());
            }
        }
    }
}

impl<C: ControlInput> SampleSource for KeyboardTone<C> {
    fn fill(
        &mut self,
        dest: &mut [f32],
        frames: usize,
        channels: u16,
        sample_rate: u32,
    ) -> FillOutcome {
        self.apply_pending();
        self.tone.fill(dest, frames, channels, sample_rate)
    }

    fn name(&self) -> &'static str {
        "keyboard tone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out one scripted batch per poll.
    struct ScriptedInput {
        batches: VecDeque<Vec<ToneCommand>>,
        announced: Vec<f64>,
    }

    impl ScriptedInput {
        fn new(batches: Vec<Vec<ToneCommand>>) -> Self {
            Self {
                batches: batches.into(),
                announced: Vec::new(),
            }
        }
    }

    impl ControlInput for ScriptedInput {
        fn poll(&mut self) -> Vec<ToneCommand> {
            self.batches.pop_front().unwrap_or_default()
        }

        fn frequency_changed(&mut self, frequency: f64) {
            self.announced.push(frequency);
        }
    }

    #[test]
    fn test_key_mapping() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(ToneCommand::from_key(&key(KeyCode::Up)), Some(ToneCommand::Increase));
        assert_eq!(ToneCommand::from_key(&key(KeyCode::Down)), Some(ToneCommand::Decrease));
        assert_eq!(ToneCommand::from_key(&key(KeyCode::Esc)), Some(ToneCommand::Stop));
        assert_eq!(ToneCommand::from_key(&key(KeyCode::Char('c'))), None);
        assert_eq!(
            ToneCommand::from_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(ToneCommand::Stop)
        );
    }

    #[test]
    fn test_commands_applied_before_fill() {
        let input = ScriptedInput::new(vec![
            vec![ToneCommand::Increase, ToneCommand::Increase],
            vec![ToneCommand::Decrease],
            vec![ToneCommand::Stop],
        ]);
        let mut source = KeyboardTone::new(ToneGenerator::new(1000.0), input);
        let mut buf = vec![0.0f32; 20];

        assert!(!source.fill(&mut buf, 10, 2, 48000).exhausted);
        assert_eq!(source.tone().frequency(), 1200.0);

        assert!(!source.fill(&mut buf, 10, 2, 48000).exhausted);
        assert_eq!(source.tone().frequency(), 1100.0);

        assert!(source.fill(&mut buf, 10, 2, 48000).is_silent());
        assert!(source.fill(&mut buf, 10, 2, 48000).is_silent());
        assert_eq!(source.control.announced, vec![1100.0, 1200.0, 1100.0]);
    }

    #[test]
    fn test_raw_lines_return_to_first_column() {
        assert_eq!(raw_line("Frequency: 4100 Hz"), "Frequency: 4100 Hz\r\n");
        assert!(raw_line(TONE_HELP).ends_with("ESC to quit\r\n"));
    }
}

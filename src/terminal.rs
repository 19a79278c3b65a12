//! Host adapters that run a console in a terminal.
//!
//! Two flavours are provided: raw-mode key events from crossterm, where the
//! console does its own line editing and history recall, and a line mode backed
//! by rustyline for pipes and dumb terminals. Both read the device on the current
//! thread; nothing else runs while the console waits for input.

use crate::io_adapters::{Key, KeySource, OutputSink};
use async_trait::async_trait;
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{self, ClearType};
use crossterm::{execute, queue};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

/// Keeps the terminal in raw mode while alive.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("could not leave raw mode: {e}");
        }
    }
}

/// Key presses read from a raw-mode terminal. Ctrl-C and Ctrl-D end the session.
#[derive(Debug, Default)]
pub struct CrosstermKeys;

fn decode(event: KeyEvent) -> Option<Option<Key>> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(None),
            _ => None,
        };
    }
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        _ => return None,
    };
    Some(Some(key))
}

#[async_trait(?Send)]
impl KeySource for CrosstermKeys {
    async fn next_key(&mut self) -> Option<Key> {
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(decoded) = decode(key) {
                        return decoded;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("terminal read failed: {e}");
                    return None;
                }
            }
        }
    }
}

/// Scrollback drawn on a raw-mode terminal.
#[derive(Debug, Default)]
pub struct TerminalOutput;

impl TerminalOutput {
    fn emit(&mut self, f: impl FnOnce(&mut io::Stdout) -> io::Result<()>) {
        let mut stdout = io::stdout();
        if let Err(e) = f(&mut stdout).and_then(|_| stdout.flush()) {
            log::warn!("terminal write failed: {e}");
        }
    }
}

impl OutputSink for TerminalOutput {
    fn write(&mut self, text: &str) {
        // Raw mode does not translate line feeds.
        let text = text.replace('\n', "\r\n");
        self.emit(|out| out.write_all(text.as_bytes()));
    }

    fn write_error(&mut self, text: &str) {
        let text = format!("{}\r\n", text.red());
        self.emit(|out| out.write_all(text.as_bytes()));
    }

    fn clear(&mut self) {
        self.emit(|out| execute!(out, terminal::Clear(ClearType::All), MoveTo(0, 0)));
    }

    fn render_input(&mut self, prompt: &str, content: &str) {
        self.emit(|out| {
            queue!(out, terminal::Clear(ClearType::CurrentLine))?;
            write!(out, "\r{prompt}{content}")
        });
    }

    fn commit_input(&mut self, prompt: &str, content: &str) {
        self.render_input(prompt, content);
        self.emit(|out| out.write_all(b"\r\n"));
    }
}

/// Prompt shared between [`LineKeys`] and [`LineOutput`]: rustyline prints the
/// prompt itself when it reads the line.
type SharedPrompt = Rc<RefCell<String>>;

/// Whole lines read with rustyline and replayed as key presses.
///
/// rustyline keeps no history here; recall belongs to the console. Secret
/// requests are echoed in this mode. Whatever is left of a line when the next
/// request starts is discarded, so answering a key request with a whole word
/// does not leak into the next prompt.
pub struct LineKeys {
    editor: DefaultEditor,
    prompt: SharedPrompt,
    pending: VecDeque<Key>,
}

#[async_trait(?Send)]
impl KeySource for LineKeys {
    async fn next_key(&mut self) -> Option<Key> {
        if self.pending.is_empty() {
            let prompt = self.prompt.borrow().clone();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    self.pending.extend(line.chars().map(Key::Char));
                    self.pending.push_back(Key::Enter);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return None,
                Err(err) => {
                    log::error!("readline failed: {err:?}");
                    return None;
                }
            }
        }
        self.pending.pop_front()
    }

    fn discard_typeahead(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("discarding {} keys of the previous line", self.pending.len());
            self.pending.clear();
        }
    }
}

/// Plain scrollback on stdout for line mode.
pub struct LineOutput {
    prompt: SharedPrompt,
}

impl OutputSink for LineOutput {
    fn write(&mut self, text: &str) {
        print!("{text}");
        if let Err(e) = io::stdout().flush() {
            log::warn!("stdout flush failed: {e}");
        }
    }

    fn clear(&mut self) {
        if let Err(e) = execute!(io::stdout(), terminal::Clear(ClearType::All), MoveTo(0, 0)) {
            log::warn!("terminal clear failed: {e}");
        }
    }

    fn render_input(&mut self, prompt: &str, _content: &str) {
        *self.prompt.borrow_mut() = prompt.to_string();
    }

    fn commit_input(&mut self, _prompt: &str, _content: &str) {}
}

/// Create the rustyline-backed key source and its matching output sink.
pub fn line_mode() -> rustyline::Result<(LineKeys, LineOutput)> {
    let prompt = SharedPrompt::default();
    let keys = LineKeys {
        editor: DefaultEditor::new()?,
        prompt: prompt.clone(),
        pending: VecDeque::new(),
    };
    Ok((keys, LineOutput { prompt }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_decode_editing_keys() {
        assert_eq!(
            decode(press(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(Some(Key::Char('a')))
        );
        assert_eq!(
            decode(press(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(Some(Key::Char('A')))
        );
        assert_eq!(decode(press(KeyCode::Up, KeyModifiers::NONE)), Some(Some(Key::Up)));
        assert_eq!(decode(press(KeyCode::Esc, KeyModifiers::NONE)), Some(Some(Key::Escape)));
    }

    #[test]
    fn test_decode_ctrl_d_ends_session_and_other_keys_are_skipped() {
        assert_eq!(decode(press(KeyCode::Char('d'), KeyModifiers::CONTROL)), Some(None));
        assert_eq!(decode(press(KeyCode::Char('x'), KeyModifiers::CONTROL)), None);
        assert_eq!(decode(press(KeyCode::F(1), KeyModifiers::NONE)), None);
    }
}

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One key press delivered by the host, already decoded from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    Backspace,
    /// Recall the previous history entry.
    Up,
    /// Recall the next history entry.
    Down,
    /// Commit the current line.
    Enter,
    /// Discard the current, uncommitted line.
    Escape,
}

/// Source of key presses, implemented by the host.
///
/// `None` means the host has gone away and no more input will arrive.
#[async_trait(?Send)]
pub trait KeySource {
    async fn next_key(&mut self) -> Option<Key>;

    /// Drop keys that were delivered ahead of the current request, such as the
    /// rest of a line read in one go. Called whenever a new input request starts.
    fn discard_typeahead(&mut self) {}
}

/// Scrollback the console writes to, implemented by the host.
///
/// Text may carry inline style markers; the core never interprets them.
pub trait OutputSink {
    /// Append text to the scrollback.
    fn write(&mut self, text: &str);

    fn write_ln(&mut self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    /// Append a line on the error style channel.
    fn write_error(&mut self, text: &str) {
        self.write_ln(text);
    }

    /// Empty the scrollback.
    fn clear(&mut self);

    /// Redraw the line currently being edited.
    fn render_input(&mut self, _prompt: &str, _content: &str) {}

    /// Freeze the edited line into the scrollback as plain output.
    fn commit_input(&mut self, prompt: &str, content: &str) {
        self.write_ln(&format!("{prompt}{content}"));
    }
}

/// What a [`BufferOutput`] has received, kept for inspection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Everything written to the scrollback since the last clear.
    pub text: String,
    /// Lines written on the error channel, in order.
    pub errors: Vec<String>,
    /// The last `(prompt, content)` shown for the line being edited.
    pub input: (String, String),
    /// How many times the scrollback was cleared.
    pub clears: usize,
}

impl Transcript {
    /// The scrollback split into lines.
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }
}

/// Memory-backed sink, used by tests and headless embedders.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    buf: Rc<RefCell<Transcript>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: create a sink and return `(sink, handle)`; the handle stays
    /// readable after the sink is moved into a session.
    pub fn with_handle() -> (Self, Rc<RefCell<Transcript>>) {
        let out = BufferOutput::new();
        let rc = out.buf.clone();
        (out, rc)
    }
}

impl OutputSink for BufferOutput {
    fn write(&mut self, text: &str) {
        self.buf.borrow_mut().text.push_str(text);
    }

    fn write_error(&mut self, text: &str) {
        let mut buf = self.buf.borrow_mut();
        buf.text.push_str(text);
        buf.text.push('\n');
        buf.errors.push(text.to_string());
    }

    fn clear(&mut self) {
        let mut buf = self.buf.borrow_mut();
        buf.text.clear();
        buf.clears += 1;
    }

    fn render_input(&mut self, prompt: &str, content: &str) {
        self.buf.borrow_mut().input = (prompt.to_string(), content.to_string());
    }

    fn commit_input(&mut self, prompt: &str, content: &str) {
        let mut buf = self.buf.borrow_mut();
        buf.input = (String::new(), String::new());
        buf.text.push_str(prompt);
        buf.text.push_str(content);
        buf.text.push('\n');
    }
}

/// Key source replaying a fixed script of key presses.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeys {
    keys: VecDeque<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Keys that type each of `lines`, pressing Enter after every one.
    pub fn lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut keys = VecDeque::new();
        for line in lines {
            keys.extend(line.chars().map(Key::Char));
            keys.push_back(Key::Enter);
        }
        Self { keys }
    }

    /// Queue more key presses after the current script.
    pub fn push(&mut self, keys: impl IntoIterator<Item = Key>) {
        self.keys.extend(keys);
    }
}

#[async_trait(?Send)]
impl KeySource for ScriptedKeys {
    async fn next_key(&mut self) -> Option<Key> {
        self.keys.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_output_collects_text_and_errors() {
        let (mut out, handle) = BufferOutput::with_handle();
        out.write("a");
        out.write_ln("b");
        out.write_error("boom");

        let t = handle.borrow();
        assert_eq!(t.lines(), vec!["ab", "boom"]);
        assert_eq!(t.errors, vec!["boom"]);
    }

    #[test]
    fn test_buffer_output_clear() {
        let (mut out, handle) = BufferOutput::with_handle();
        out.write_ln("old");
        out.clear();
        assert!(handle.borrow().text.is_empty());
        assert_eq!(handle.borrow().clears, 1);
    }

    #[tokio::test]
    async fn test_scripted_lines() {
        let mut keys = ScriptedKeys::lines(["ab"]);
        assert_eq!(keys.next_key().await, Some(Key::Char('a')));
        assert_eq!(keys.next_key().await, Some(Key::Char('b')));
        assert_eq!(keys.next_key().await, Some(Key::Enter));
        assert_eq!(keys.next_key().await, None);
    }
}

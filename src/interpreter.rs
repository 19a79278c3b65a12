use crate::builtin;
use crate::env::Variables;
use crate::error::{ConsoleError, ConsoleResult};
use crate::history::History;
use crate::io_adapters::{Key, KeySource, OutputSink};
use crate::lexer;
use crate::registry::CommandRegistry;
use crate::storage::{HISTORY_KEY, HISTORY_LIMIT_KEY, Storage, VARIABLES_KEY};
use serde_json::{Map, Value};

/// The collaborators a session talks to, all provided by the hosting environment.
pub struct Host {
    pub output: Box<dyn OutputSink>,
    pub keys: Box<dyn KeySource>,
    pub storage: Box<dyn Storage>,
}

impl Host {
    pub fn new(
        output: impl OutputSink + 'static,
        keys: impl KeySource + 'static,
        storage: impl Storage + 'static,
    ) -> Self {
        Self {
            output: Box::new(output),
            keys: Box::new(keys),
            storage: Box::new(storage),
        }
    }
}

/// How typed characters are shown while a line is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Echo {
    Visible,
    Hidden,
}

/// One console session: its variables, history and commands, and the evaluator
/// that runs expressions against them.
///
/// Every statement of an expression runs to completion, including any
/// asynchronous work of its command, before the next one starts. A failing
/// statement is reported on the output and never stops the ones after it.
///
/// Example
/// ```
/// use webconsole::{BufferOutput, CommandRegistry, Host, Interpreter, MemoryStorage, ScriptedKeys};
///
/// let (out, transcript) = BufferOutput::with_handle();
/// let host = Host::new(out, ScriptedKeys::default(), MemoryStorage::new());
/// let mut sh = Interpreter::new("demo", host, CommandRegistry::new());
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(sh.evaluate("who=world; printvars"));
/// assert_eq!(transcript.borrow().lines(), vec!["who=world"]);
/// ```
pub struct Interpreter {
    id: String,
    vars: Variables,
    history: History,
    commands: CommandRegistry,
    output: Box<dyn OutputSink>,
    keys: Box<dyn KeySource>,
    storage: Box<dyn Storage>,
}

impl Interpreter {
    /// Create session `id`, restoring its persisted state from the host's storage.
    ///
    /// `commands` are layered over the built-in commands.
    pub fn new(id: impl Into<String>, host: Host, commands: CommandRegistry) -> Self {
        let id = id.into();
        let state = host.storage.load(&id).unwrap_or_else(|e| {
            log::warn!("could not restore session {id}: {e}");
            Default::default()
        });

        let mut registry = builtin::builtins();
        registry.layer(commands);

        log::info!(
            "session {id} started with {} history entries and {} commands",
            state.history.len(),
            registry.len()
        );

        Self {
            id,
            vars: Variables::from_map(state.variables),
            history: History::from_entries(state.history, state.history_limit),
            commands: registry,
            output: host.output,
            keys: host.keys,
            storage: host.storage,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn output(&mut self) -> &mut dyn OutputSink {
        self.output.as_mut()
    }

    /// Set or remove a variable and persist the variables.
    pub fn set_var(&mut self, name: &str, value: &str) -> ConsoleResult<()> {
        self.vars.set(name, value)?;
        let vars: Map<String, Value> = self
            .vars
            .list()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        self.persist(VARIABLES_KEY, Value::Object(vars));
        Ok(())
    }

    /// Add a committed line to the history and persist it.
    pub fn record_history(&mut self, line: &str) {
        self.history.record(line);
        self.persist_history();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist_history();
    }

    /// Deduplicate the history and keep only lines led by a caller-supplied command.
    pub fn clean_history(&mut self) {
        let valid = self.commands.custom_names();
        self.history.clean(&valid);
        self.persist_history();
    }

    /// Change the maximum history size; `None` removes the limit.
    pub fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history.set_limit(limit);
        self.persist(HISTORY_LIMIT_KEY, Value::from(self.history.limit()));
        self.persist_history();
    }

    fn persist_history(&mut self) {
        let entries = Value::from(self.history.entries().to_vec());
        self.persist(HISTORY_KEY, entries);
    }

    fn persist(&mut self, key: &str, value: Value) {
        if let Err(e) = self.storage.save(&self.id, key, value) {
            log::warn!("could not persist {key} of session {}: {e}", self.id);
        }
    }

    /// Evaluate an expression of one or more statements separated by `;` or line
    /// breaks, strictly in order.
    pub async fn evaluate(&mut self, expr: &str) {
        for statement in split_statements(expr) {
            self.run_statement(statement).await;
        }
    }

    async fn run_statement(&mut self, statement: &str) {
        if let Some((name, value)) = parse_assignment(statement) {
            log::debug!("assign {name}");
            if let Err(e) = self.set_var(name, value) {
                self.output.write_error(&e.to_string());
            }
            return;
        }

        let Some((name, rest)) = lexer::split_command(statement) else {
            return;
        };
        if !self.commands.contains(name) {
            self.output
                .write_ln(&ConsoleError::UnknownCommand(name.to_string()).to_string());
            return;
        }

        let args: Vec<String> = lexer::split_into_args(rest)
            .iter()
            .map(|arg| self.vars.substitute(arg))
            .collect();
        log::debug!("dispatch {name} {args:?}");

        if let Err(err) = self.run(name, args).await {
            log::error!("command {name} failed: {err:#}");
            self.output.write_error(&format!("{name}: {err:#}"));
        }
    }

    /// Run a single command by name with already substituted arguments and wait
    /// for it to finish.
    pub async fn run(&mut self, name: &str, args: Vec<String>) -> anyhow::Result<()> {
        let handler = self
            .commands
            .resolve(name)
            .ok_or_else(|| ConsoleError::UnknownCommand(name.to_string()))?;
        handler.invoke(self, args).settle().await
    }

    /// Ask for a line of text. Typed characters are echoed.
    pub async fn request_line(&mut self, prompt: &str) -> ConsoleResult<String> {
        self.read_input(prompt, Echo::Visible, false).await
    }

    /// Ask for a line of text without echoing what is typed.
    pub async fn request_secret(&mut self, prompt: &str) -> ConsoleResult<String> {
        self.read_input(prompt, Echo::Hidden, false).await
    }

    /// Wait for one of the `accepted` keys and return it upper-cased. Other keys
    /// are ignored.
    pub async fn request_key(&mut self, accepted: &[&str], prompt: &str) -> ConsoleResult<String> {
        let accepted: Vec<String> = accepted.iter().map(|k| k.to_uppercase()).collect();
        self.keys.discard_typeahead();
        self.output.render_input(prompt, "");
        loop {
            let key = self.keys.next_key().await.ok_or(ConsoleError::InputClosed)?;
            if let Key::Char(c) = key {
                let pressed = c.to_uppercase().to_string();
                if accepted.contains(&pressed) {
                    self.output.commit_input(prompt, &pressed);
                    return Ok(pressed);
                }
            }
        }
    }

    /// Edit a line until Enter is pressed. With `recall`, Up and Down walk the
    /// history.
    pub(crate) async fn read_input(
        &mut self,
        prompt: &str,
        echo: Echo,
        recall: bool,
    ) -> ConsoleResult<String> {
        let mut line = String::new();
        if recall {
            self.history.reset_position();
        }
        self.keys.discard_typeahead();
        self.output.render_input(prompt, "");
        loop {
            let key = self.keys.next_key().await.ok_or(ConsoleError::InputClosed)?;
            match key {
                Key::Char(c) => line.push(c),
                Key::Backspace => {
                    line.pop();
                }
                Key::Escape => line.clear(),
                Key::Up if recall => {
                    if let Some(entry) = self.history.recall_previous() {
                        line = entry;
                    }
                }
                Key::Down if recall => {
                    if let Some(entry) = self.history.recall_next() {
                        line = entry;
                    }
                }
                Key::Up | Key::Down => continue,
                Key::Enter => {
                    let shown = if echo == Echo::Visible { line.as_str() } else { "" };
                    self.output.commit_input(prompt, shown);
                    return Ok(line);
                }
            }
            let shown = if echo == Echo::Visible { line.as_str() } else { "" };
            self.output.render_input(prompt, shown);
        }
    }
}

/// Split an expression on runs of `;` and line breaks, dropping blank statements.
fn split_statements(expr: &str) -> impl Iterator<Item = &str> {
    expr.split([';', '\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Recognize `name=value`, where `name` is a single token before the first `=`.
fn parse_assignment(statement: &str) -> Option<(&str, &str)> {
    let (name, value) = statement.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Outcome;
    use crate::io_adapters::{BufferOutput, ScriptedKeys, Transcript};
    use crate::storage::MemoryStorage;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn echo<'a>(interp: &'a mut Interpreter, args: Vec<String>) -> Outcome<'a> {
        interp.output().write_ln(&args.join(" "));
        Outcome::done()
    }

    fn bad<'a>(_: &'a mut Interpreter, _: Vec<String>) -> Outcome<'a> {
        Outcome::Ready(Err(anyhow!("boom")))
    }

    fn later<'a>(interp: &'a mut Interpreter, args: Vec<String>) -> Outcome<'a> {
        Outcome::pending(async move {
            tokio::task::yield_now().await;
            interp.output().write_ln(&format!("later {}", args.join(" ")));
            Ok(())
        })
    }

    fn later_bad<'a>(_: &'a mut Interpreter, _: Vec<String>) -> Outcome<'a> {
        Outcome::pending(async move {
            tokio::task::yield_now().await;
            Err(anyhow!("rejected"))
        })
    }

    fn interpreter(keys: ScriptedKeys) -> (Interpreter, Rc<RefCell<Transcript>>) {
        let mut commands = CommandRegistry::new();
        commands.register_fn("echo", echo);
        commands.register_fn("bad", bad);
        commands.register_fn("later", later);
        commands.register_fn("later_bad", later_bad);
        let (out, transcript) = BufferOutput::with_handle();
        let host = Host::new(out, keys, MemoryStorage::new());
        (Interpreter::new("test", host, commands), transcript)
    }

    #[test]
    fn test_split_statements() {
        let stmts: Vec<_> = split_statements(" a 1 ;; b\n\n c ; ").collect();
        assert_eq!(stmts, vec!["a 1", "b", "c"]);
        assert_eq!(split_statements("  ;\n").count(), 0);
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("x=5"), Some(("x", "5")));
        assert_eq!(parse_assignment("  x = 5 "), Some(("x", " 5 ")));
        assert_eq!(parse_assignment("x="), Some(("x", "")));
        assert_eq!(parse_assignment("echo a=b"), None);
        assert_eq!(parse_assignment("=5"), None);
    }

    #[tokio::test]
    async fn test_assignment_sets_and_removes_var() {
        let (mut sh, _) = interpreter(ScriptedKeys::default());
        sh.evaluate("x=5").await;
        assert_eq!(sh.variables().get("x"), Some("5"));
        sh.evaluate("x=").await;
        assert_eq!(sh.variables().get("x"), None);
    }

    #[tokio::test]
    async fn test_invalid_variable_name_does_not_stop_evaluation() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::default());
        sh.evaluate("a-b=1; echo next").await;
        let t = transcript.borrow();
        assert_eq!(t.errors, vec![r#"Invalid token '-' in variable name "a-b""#]);
        assert_eq!(t.lines().last(), Some(&"next"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::default());
        sh.evaluate("frobnicate x").await;
        assert_eq!(transcript.borrow().lines(), vec!["Unknown command: frobnicate"]);
        assert!(sh.variables().is_empty());
        assert!(sh.history().is_empty());
    }

    #[tokio::test]
    async fn test_substitution_skips_flags() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::default());
        sh.evaluate("foo=bar; echo $foo -$foo $foobaz \"$foo x\"").await;
        assert_eq!(transcript.borrow().lines(), vec!["bar -$foo $foobaz bar x"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::default());
        sh.evaluate("bad; echo ok").await;
        let t = transcript.borrow();
        assert_eq!(t.lines(), vec!["bad: boom", "ok"]);
        assert_eq!(t.errors, vec!["bad: boom"]);
    }

    #[tokio::test]
    async fn test_async_statements_run_in_order() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::default());
        sh.evaluate("later 1; echo 2\nlater 3; later_bad; echo 4").await;
        assert_eq!(
            transcript.borrow().lines(),
            vec!["later 1", "2", "later 3", "later_bad: rejected", "4"]
        );
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let (mut sh, _) = interpreter(ScriptedKeys::default());
        sh.evaluate("x=5").await;
        sh.record_history("x=5");
        sh.set_history_limit(Some(3));

        let state = sh.storage.load("test").unwrap();
        assert_eq!(state.variables.get("x").map(String::as_str), Some("5"));
        assert_eq!(state.history, vec!["x=5"]);
        assert_eq!(state.history_limit, Some(3));
    }

    #[tokio::test]
    async fn test_state_is_restored_from_storage() {
        let mut storage = MemoryStorage::new();
        storage.save("s1", HISTORY_KEY, serde_json::json!(["a", "b"])).unwrap();
        storage.save("s1", VARIABLES_KEY, serde_json::json!({"x": "1"})).unwrap();
        let host = Host::new(BufferOutput::new(), ScriptedKeys::default(), storage);

        let sh = Interpreter::new("s1", host, CommandRegistry::new());
        assert_eq!(sh.history().entries(), &["a", "b"]);
        assert_eq!(sh.history().position(), 2);
        assert_eq!(sh.variables().get("x"), Some("1"));
    }

    #[tokio::test]
    async fn test_request_line_and_secret() {
        let (mut sh, transcript) = interpreter(ScriptedKeys::lines(["bob", "hunter2"]));
        assert_eq!(sh.request_line("user: ").await.unwrap(), "bob");
        assert_eq!(sh.request_secret("pass: ").await.unwrap(), "hunter2");
        assert_eq!(transcript.borrow().lines(), vec!["user: bob", "pass: "]);
    }

    #[tokio::test]
    async fn test_request_key_ignores_other_keys() {
        let keys = ScriptedKeys::new([Key::Char('x'), Key::Enter, Key::Char('y')]);
        let (mut sh, _) = interpreter(keys);
        assert_eq!(sh.request_key(&["y", "n"], "sure? ").await.unwrap(), "Y");
    }

    #[tokio::test]
    async fn test_request_fails_when_input_closes() {
        let (mut sh, _) = interpreter(ScriptedKeys::new([Key::Char('a')]));
        assert!(matches!(
            sh.request_line("> ").await,
            Err(ConsoleError::InputClosed)
        ));
    }

    #[tokio::test]
    async fn test_line_editing_keys() {
        let keys = ScriptedKeys::new([
            Key::Char('a'),
            Key::Char('b'),
            Key::Backspace,
            Key::Up,
            Key::Char('c'),
            Key::Escape,
            Key::Char('d'),
            Key::Enter,
        ]);
        let (mut sh, _) = interpreter(keys);
        assert_eq!(sh.request_line("> ").await.unwrap(), "d");
    }
}

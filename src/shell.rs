use crate::interpreter::{Echo, Host, Interpreter};
use crate::registry::CommandRegistry;

/// Options a console is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Session id; selects the persisted state blob.
    pub id: String,
    /// Banner printed once at startup.
    pub motd: Option<String>,
    pub prompt: String,
    /// Expression evaluated once before the first prompt.
    pub startup: Option<String>,
    /// History size limit, used when the persisted state does not carry one.
    pub history_limit: Option<usize>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            motd: None,
            prompt: "> ".to_string(),
            startup: None,
            history_limit: None,
        }
    }
}

/// The interactive loop: prompt, read a line, evaluate it, prompt again.
///
/// There is no exit command; the loop ends only when the host stops delivering
/// keys.
pub struct Shell {
    interp: Interpreter,
    prompt: String,
    motd: Option<String>,
    startup: Option<String>,
}

impl Shell {
    pub fn new(config: ConsoleConfig, host: Host, commands: CommandRegistry) -> Self {
        let mut interp = Interpreter::new(config.id, host, commands);
        if interp.history().limit().is_none() && config.history_limit.is_some() {
            interp.set_history_limit(config.history_limit);
        }
        Self {
            interp,
            prompt: config.prompt,
            motd: config.motd,
            startup: config.startup,
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Print the banner and evaluate the startup expression, if configured.
    pub async fn start(&mut self) {
        if let Some(motd) = &self.motd {
            self.interp.output().write_ln(motd);
        }
        if let Some(startup) = self.startup.take() {
            log::info!("evaluating startup expression");
            self.interp.evaluate(&startup).await;
        }
    }

    /// Prompt for one line and evaluate it.
    ///
    /// Returns `false` once the host has gone away.
    pub async fn step(&mut self) -> bool {
        let line = match self.interp.read_input(&self.prompt, Echo::Visible, true).await {
            Ok(line) => line,
            Err(e) => {
                log::info!("input ended: {e}");
                return false;
            }
        };
        let line = line.trim();
        if line.contains(|c: char| c.is_alphanumeric() || c == '_') {
            self.interp.record_history(line);
        }
        self.interp.evaluate(line).await;
        true
    }

    /// Run the console until the host goes away.
    pub async fn run(&mut self) {
        self.start().await;
        while self.step().await {}
    }
}

use crate::command::{Outcome, ParsedCommand, USAGE_FLAG};
use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use anyhow::anyhow;
use argh::FromArgs;

/// The commands every session starts with.
pub(crate) fn builtins() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register_builtin::<Clear>();
    registry.register_builtin::<Help>();
    registry.register_builtin::<HistoryCommand>();
    registry.register_builtin::<PrintVars>();
    registry
}

/// Write each line of `lines` to the session output.
fn write_lines(interp: &mut Interpreter, lines: Vec<String>) {
    for line in lines {
        interp.output().write_ln(&line);
    }
}

#[derive(FromArgs)]
/// Clear the console output.
pub struct Clear {}

impl ParsedCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        interp.output().clear();
        Outcome::done()
    }
}

#[derive(FromArgs)]
/// List all available commands.
pub struct Help {}

impl ParsedCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        let mut lines: Vec<String> = interp.commands().names().map(str::to_string).collect();
        lines.push(format!("Type `<command> {USAGE_FLAG}` for usage."));
        write_lines(interp, lines);
        Outcome::done()
    }
}

#[derive(FromArgs)]
/// Show the command history, or clear, clean or limit it.
pub struct HistoryCommand {
    #[argh(switch)]
    /// remove every entry.
    pub clear: bool,

    #[argh(switch)]
    /// remove duplicates and entries that do not start with a user command.
    pub clean: bool,

    #[argh(switch)]
    /// show the maximum number of entries, or set it to N (0 removes the limit).
    pub limit: bool,

    #[argh(positional, arg_name = "n")]
    /// new maximum number of entries, used with --limit.
    pub size: Option<usize>,
}

impl ParsedCommand for HistoryCommand {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        if self.size.is_some() && !self.limit {
            return Outcome::Ready(Err(anyhow!("a size is only accepted with --limit")));
        }
        if self.clear {
            interp.clear_history();
        } else if self.clean {
            interp.clean_history();
        } else if self.limit {
            match self.size {
                Some(n) => interp.set_history_limit(Some(n).filter(|n| *n > 0)),
                None => {
                    let line = match interp.history().limit() {
                        Some(n) => format!("History limit: {n}"),
                        None => "History limit: none".to_string(),
                    };
                    interp.output().write_ln(&line);
                }
            }
        } else {
            let lines = interp
                .history()
                .entries()
                .iter()
                .enumerate()
                .map(|(i, entry)| format!("{:>4}  {}", i + 1, entry))
                .collect();
            write_lines(interp, lines);
        }
        Outcome::done()
    }
}

#[derive(FromArgs)]
/// Print all variables as name=value, sorted by name.
pub struct PrintVars {}

impl ParsedCommand for PrintVars {
    fn name() -> &'static str {
        "printvars"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        let lines = interp
            .variables()
            .list()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write_lines(interp, lines);
        Outcome::done()
    }
}

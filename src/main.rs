use anyhow::anyhow;
use argh::FromArgs;
use std::path::PathBuf;
use std::time::Duration;
use webconsole::terminal::{self, CrosstermKeys, RawModeGuard, TerminalOutput};
use webconsole::{
    CommandRegistry, ConsoleConfig, Host, Interpreter, JsonFileStorage, Outcome, ParsedCommand,
    Shell,
};

#[derive(FromArgs)]
/// An interactive command console with variables and persistent history.
struct Args {
    #[argh(option, default = "String::from(\"default\")")]
    /// session id; selects the saved state file.
    id: String,

    #[argh(option)]
    /// banner printed once at startup.
    motd: Option<String>,

    #[argh(option, default = "String::from(\"> \")")]
    /// prompt shown before each line.
    prompt: String,

    #[argh(option)]
    /// expression evaluated once before the first prompt.
    startup: Option<String>,

    #[argh(option)]
    /// maximum number of history entries for a new session.
    history_limit: Option<usize>,

    #[argh(option, default = "PathBuf::from(\".webconsole\")")]
    /// directory holding saved session state.
    state_dir: PathBuf,

    #[argh(switch)]
    /// read whole lines with rustyline instead of raw key presses.
    line_mode: bool,
}

#[derive(FromArgs)]
/// Write the arguments to the output, separated by spaces.
struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    args: Vec<String>,
}

impl ParsedCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        let s = self.args.join(" ");
        if self.no_newline {
            interp.output().write(&s);
        } else {
            interp.output().write_ln(&s);
        }
        Outcome::done()
    }
}

#[derive(FromArgs)]
/// Wait for a number of milliseconds before the next statement runs.
struct Sleep {
    #[argh(positional)]
    /// how long to wait, in milliseconds.
    ms: u64,
}

impl ParsedCommand for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        Outcome::pending(async move {
            tokio::time::sleep(Duration::from_millis(self.ms)).await;
            interp.output().write_ln(&format!("slept {} ms", self.ms));
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Ask a yes/no question and wait for Y or N.
struct Confirm {
    #[argh(positional, greedy)]
    /// the question to ask.
    question: Vec<String>,
}

impl ParsedCommand for Confirm {
    fn name() -> &'static str {
        "confirm"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        let question = if self.question.is_empty() {
            "Are you sure?".to_string()
        } else {
            self.question.join(" ")
        };
        Outcome::pending(async move {
            let answer = interp
                .request_key(&["y", "n"], &format!("{question} [Y/N] "))
                .await?;
            let reply = if answer == "Y" { "Confirmed." } else { "Cancelled." };
            interp.output().write_ln(reply);
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Ask for a user name and a password.
struct Login {}

impl ParsedCommand for Login {
    fn name() -> &'static str {
        "login"
    }

    fn execute(self, interp: &mut Interpreter) -> Outcome<'_> {
        Outcome::pending(async move {
            let user = interp.request_line("login: ").await?;
            let password = interp.request_secret("password: ").await?;
            if password.is_empty() {
                return Err(anyhow!("empty password"));
            }
            interp.output().write_ln(&format!("Welcome, {}.", user.trim()));
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Fail on purpose; the statements after it still run.
struct Fail {
    #[argh(positional, greedy)]
    /// the error message.
    message: Vec<String>,
}

impl ParsedCommand for Fail {
    fn name() -> &'static str {
        "fail"
    }

    fn execute(self, _interp: &mut Interpreter) -> Outcome<'_> {
        let message = if self.message.is_empty() {
            "failed on purpose".to_string()
        } else {
            self.message.join(" ")
        };
        Outcome::Ready(Err(anyhow!(message)))
    }
}

fn demo_commands() -> CommandRegistry {
    let mut commands = CommandRegistry::new();
    commands.register_parsed::<Echo>();
    commands.register_parsed::<Sleep>();
    commands.register_parsed::<Confirm>();
    commands.register_parsed::<Login>();
    commands.register_parsed::<Fail>();
    commands
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = ConsoleConfig {
        id: args.id,
        motd: args.motd,
        prompt: args.prompt,
        startup: args.startup,
        history_limit: args.history_limit,
    };
    let storage = JsonFileStorage::new(args.state_dir);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    if args.line_mode {
        let (keys, output) = terminal::line_mode()?;
        let mut shell = Shell::new(config, Host::new(output, keys, storage), demo_commands());
        runtime.block_on(shell.run());
    } else {
        let _raw = RawModeGuard::enable()?;
        let host = Host::new(TerminalOutput, CrosstermKeys, storage);
        let mut shell = Shell::new(config, host, demo_commands());
        runtime.block_on(shell.run());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use webconsole::io_adapters::Transcript;
    use webconsole::{BufferOutput, Key, MemoryStorage, ScriptedKeys};

    fn session(keys: ScriptedKeys) -> (Interpreter, Rc<RefCell<Transcript>>) {
        let (out, transcript) = BufferOutput::with_handle();
        let host = Host::new(out, keys, MemoryStorage::new());
        (Interpreter::new("demo", host, demo_commands()), transcript)
    }

    #[tokio::test]
    async fn test_echo_with_and_without_newline() {
        let (mut sh, transcript) = session(ScriptedKeys::default());
        sh.evaluate("echo -n foo; echo bar baz").await;
        assert_eq!(transcript.borrow().text, "foobar baz\n");
    }

    #[tokio::test]
    async fn test_sleep_finishes_before_next_statement() {
        let (mut sh, transcript) = session(ScriptedKeys::default());
        sh.evaluate("sleep 5; echo after").await;
        assert_eq!(transcript.borrow().lines(), vec!["slept 5 ms", "after"]);
    }

    #[tokio::test]
    async fn test_confirm_and_login_use_input_requests() {
        let mut keys = ScriptedKeys::new([Key::Char('q'), Key::Char('n')]);
        for line in ["ann", "pw"] {
            keys.push(line.chars().map(Key::Char));
            keys.push([Key::Enter]);
        }
        let (mut sh, transcript) = session(keys);
        sh.evaluate("confirm deploy?; login").await;
        assert_eq!(
            transcript.borrow().lines(),
            vec!["deploy? [Y/N] N", "Cancelled.", "login: ann", "password: ", "Welcome, ann."]
        );
    }

    #[tokio::test]
    async fn test_fail_does_not_stop_later_statements() {
        let (mut sh, transcript) = session(ScriptedKeys::default());
        sh.evaluate("fail oops; echo still here").await;
        assert_eq!(transcript.borrow().lines(), vec!["fail: oops", "still here"]);
    }
}

use crate::interpreter::Interpreter;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// First argument that asks any command for its usage text instead of running it.
pub const USAGE_FLAG: &str = "--?";

/// A command body that finishes later.
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

/// What invoking a command produced: either its final result, or work that is
/// still pending and must be awaited before the next statement runs.
pub enum Outcome<'a> {
    Ready(Result<()>),
    Pending(CommandFuture<'a>),
}

impl<'a> Outcome<'a> {
    /// A command that completed successfully right away.
    pub fn done() -> Self {
        Outcome::Ready(Ok(()))
    }

    /// Wrap asynchronous work.
    pub fn pending(work: impl Future<Output = Result<()>> + 'a) -> Self {
        Outcome::Pending(Box::pin(work))
    }

    /// Wait until the command has finished, successfully or not.
    pub async fn settle(self) -> Result<()> {
        match self {
            Outcome::Ready(result) => result,
            Outcome::Pending(work) => work.await,
        }
    }
}

impl From<Result<()>> for Outcome<'_> {
    fn from(result: Result<()>) -> Self {
        Outcome::Ready(result)
    }
}

/// Object-safe trait for anything that can be bound to a command name.
///
/// A handler receives the session it runs in and the already substituted
/// arguments. By convention a handler given [`USAGE_FLAG`] as its first argument
/// prints its usage and does nothing else.
pub trait CommandHandler {
    fn invoke<'a>(&'a self, interp: &'a mut Interpreter, args: Vec<String>) -> Outcome<'a>;
}

/// Adapter turning a closure into a [`CommandHandler`].
pub struct FnCommand<F>(pub F);

impl<F> CommandHandler for FnCommand<F>
where
    F: for<'a> Fn(&'a mut Interpreter, Vec<String>) -> Outcome<'a>,
{
    fn invoke<'a>(&'a self, interp: &'a mut Interpreter, args: Vec<String>) -> Outcome<'a> {
        (self.0)(interp, args)
    }
}

/// True when `args` ask for usage text.
pub fn wants_usage(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some(USAGE_FLAG)
}

/// Commands whose arguments are parsed with [`argh`].
///
/// The usage text printed for `--?` is the one argh generates from the struct's
/// doc comments.
pub trait ParsedCommand: Sized + FromArgs + 'static {
    /// Canonical name of the command, e.g. "history".
    fn name() -> &'static str;

    /// Runs the command against the session.
    fn execute(self, interp: &mut Interpreter) -> Outcome<'_>;
}

/// Handler for a [`ParsedCommand`] type.
pub struct Parsed<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

/// The argh-generated usage text of `T`.
pub fn usage<T: ParsedCommand>() -> String {
    match T::from_args(&[T::name()], &["--help"]) {
        Err(EarlyExit { output, .. }) => output,
        Ok(_) => format!("Usage: {}", T::name()),
    }
}

impl<T: ParsedCommand> CommandHandler for Parsed<T> {
    fn invoke<'a>(&'a self, interp: &'a mut Interpreter, args: Vec<String>) -> Outcome<'a> {
        if wants_usage(&args) {
            interp.output().write(&usage::<T>());
            return Outcome::done();
        }
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &args_ref) {
            Ok(cmd) => cmd.execute(interp),
            Err(EarlyExit { output, status }) => match status {
                Ok(()) => {
                    interp.output().write(&output);
                    Outcome::done()
                }
                Err(()) => Outcome::Ready(Err(anyhow!("{}", output.trim_end()))),
            },
        }
    }
}

//! An embeddable command console: a small interpreter with variables, history and
//! pluggable commands, driven by whatever host renders it.
//!
//! The host supplies three collaborators, bundled in a [`Host`]: an
//! [`OutputSink`] for the scrollback, a [`KeySource`] delivering key presses, and
//! a [`Storage`] keeping per-session state. [`Interpreter`] evaluates expressions
//! such as `name=world; greet $name` statement by statement, and [`Shell`] runs
//! the prompt loop on top of it.
//!
//! Commands are [`CommandHandler`]s registered by name in a [`CommandRegistry`].
//! A handler may finish right away or return pending work; either way the next
//! statement starts only after it has finished.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod registry;
mod shell;
pub mod storage;
pub mod terminal;

pub use command::{CommandHandler, Outcome, ParsedCommand, USAGE_FLAG};
pub use error::ConsoleError;
pub use interpreter::{Host, Interpreter};
pub use io_adapters::{BufferOutput, Key, KeySource, OutputSink, ScriptedKeys};
pub use registry::CommandRegistry;
pub use shell::{ConsoleConfig, Shell};
pub use storage::{JsonFileStorage, MemoryStorage, PersistedState, Storage};

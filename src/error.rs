use thiserror::Error;

/// Errors produced by the console core.
///
/// Per-statement failures (`InvalidToken`, `UnknownCommand`, handler failures) are
/// reported inline by the evaluator and never terminate a session.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// An assignment target contains a non-word character.
    #[error("Invalid token '{ch}' in variable name \"{name}\"")]
    InvalidToken { name: String, ch: char },

    /// The command name is not registered.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The host stopped delivering input while a request was pending.
    #[error("input closed")]
    InputClosed,

    /// The persisted blob could not be read or written.
    #[error("storage: {0}")]
    Storage(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

use nc_core::StoreError;
use thiserror::Error;

/// Failure surfaced by the history engine.
///
/// An empty undo or redo stack is not an error: those calls return
/// `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// The forward mutation failed; nothing was recorded.
    #[error("failed to execute '{description}': {source}")]
    Execution {
        description: String,
        source: StoreError,
    },

    /// Undo failed; the command is still on the undo stack.
    #[error("failed to undo '{description}': {source}")]
    Undo {
        description: String,
        source: StoreError,
    },

    /// Redo failed; the command is still on the redo stack.
    #[error("failed to redo '{description}': {source}")]
    Redo {
        description: String,
        source: StoreError,
    },

    /// Another history operation is still in flight.
    #[error("history is busy with another operation")]
    Busy,
}

pub type Result<T> = std::result::Result<T, HistoryError>;

//! Command-based undo/redo history for NoteCanvas.
//!
//! Build a [`Command`] when a gesture completes, hand it to
//! [`HistoryEngine::execute_command`] (or [`HistoryEngine::record_command`]
//! if the mutation already happened), and drive the toolbar from
//! [`HistoryEngine::subscribe`].

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod shared;
pub mod stack;
pub mod time;

pub use command::{Command, CommandKind, CommandType};
pub use config::HistoryConfig;
pub use engine::{HistoryEngine, HistoryEntry, HistoryFlags};
pub use error::HistoryError;
pub use shared::SharedHistory;
pub use stack::BoundedStack;
pub use time::Timestamp;

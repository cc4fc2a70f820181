//! A history engine shared across tasks.
//!
//! Only one history operation may be in flight at a time. A second call
//! made while the first is still awaiting its store fails fast with
//! [`HistoryError::Busy`] instead of queueing behind it.

use crate::command::Command;
use crate::engine::{HistoryEngine, HistoryEntry, HistoryFlags};
use crate::error::{HistoryError, Result};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, watch};

#[derive(Clone)]
pub struct SharedHistory {
    engine: Arc<Mutex<HistoryEngine>>,
    flags: watch::Receiver<HistoryFlags>,
}

impl SharedHistory {
    pub fn new(engine: HistoryEngine) -> Self {
        let flags = engine.subscribe();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            flags,
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, HistoryEngine>> {
        self.engine.try_lock().map_err(|_| {
            log::warn!("history operation rejected: another one is in flight");
            HistoryError::Busy
        })
    }

    pub async fn execute_command(&self, command: Command) -> Result<()> {
        let mut engine = self.acquire()?;
        engine.execute_command(command).await
    }

    pub fn record_command(&self, command: Command) -> Result<()> {
        self.acquire()?.record_command(command);
        Ok(())
    }

    pub async fn undo(&self) -> Result<Option<String>> {
        let mut engine = self.acquire()?;
        engine.undo().await
    }

    pub async fn redo(&self) -> Result<Option<String>> {
        let mut engine = self.acquire()?;
        engine.redo().await
    }

    pub fn clear(&self) -> Result<()> {
        self.acquire()?.clear();
        Ok(())
    }

    pub fn set_max_history_size(&self, max: NonZeroUsize) -> Result<()> {
        self.acquire()?.set_max_history_size(max);
        Ok(())
    }

    pub fn undo_list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.acquire()?.undo_list())
    }

    pub fn redo_list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.acquire()?.redo_list())
    }

    /// Latest published flags. Readable even while an operation is in
    /// flight.
    pub fn flags(&self) -> HistoryFlags {
        *self.flags.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryFlags> {
        self.flags.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_core::{CanvasStore, MemoryStore, Stores};
    use std::sync::Arc;

    #[tokio::test]
    async fn sequential_calls_share_one_history() {
        let store = Arc::new(MemoryStore::new());
        let canvas = store.create_canvas("Shared").await.unwrap();
        let history = SharedHistory::new(HistoryEngine::with_stores(Stores::shared(store.clone())));
        let other = history.clone();

        history
            .execute_command(Command::zoom(canvas, 1.0, 3.0))
            .await
            .unwrap();
        assert!(other.flags().can_undo);

        other.undo().await.unwrap();
        assert_eq!(store.canvas(canvas).unwrap().scale, 1.0);
        assert!(history.flags().can_redo);
        assert_eq!(history.redo_list().unwrap().len(), 1);
    }
}

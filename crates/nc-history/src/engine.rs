//! Undo/redo history engine.
//!
//! Owns a bounded undo stack and a redo stack of [`Command`]s. New commands
//! either merge into the top entry (same target, inside the merge window) or
//! are pushed, evicting the oldest entry past the bound. Any new command
//! discards the redo branch.
//!
//! Undo and redo await the command's store calls before touching either
//! stack, so a failed (or dropped) traversal leaves the history exactly as
//! it was and the entry stays retryable.

use crate::command::{Command, CommandType};
use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::stack::BoundedStack;
use crate::time::{Timestamp, within_window};
use nc_core::Stores;
use serde::Serialize;
use std::num::NonZeroUsize;
use tokio::sync::watch;

/// Toolbar state, derived from stack emptiness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryFlags {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// One row of a history panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub description: String,
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub command_type: CommandType,
}

impl From<&Command> for HistoryEntry {
    fn from(command: &Command) -> Self {
        Self {
            description: command.description().to_string(),
            timestamp: command.timestamp(),
            command_type: command.command_type(),
        }
    }
}

pub struct HistoryEngine {
    stores: Stores,
    config: HistoryConfig,
    undo_stack: BoundedStack<Command>,
    redo_stack: Vec<Command>,
    flags: watch::Sender<HistoryFlags>,
}

impl HistoryEngine {
    pub fn new(stores: Stores, config: HistoryConfig) -> Self {
        let (flags, _) = watch::channel(HistoryFlags::default());
        Self {
            undo_stack: BoundedStack::new(config.max_history_size),
            redo_stack: Vec::new(),
            stores,
            config,
            flags,
        }
    }

    pub fn with_stores(stores: Stores) -> Self {
        Self::new(stores, HistoryConfig::default())
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Apply `command` and record it. If the mutation fails, nothing is
    /// recorded; undoing any partial effect is up to the caller.
    pub async fn execute_command(&mut self, command: Command) -> Result<()> {
        if let Err(source) = command.execute(&self.stores).await {
            log::debug!("execute {:?} failed: {source}", command.description());
            return Err(HistoryError::Execution {
                description: command.description().to_string(),
                source,
            });
        }
        self.record_command(command);
        Ok(())
    }

    /// Record a command whose mutation the caller already applied.
    pub fn record_command(&mut self, command: Command) {
        match self.merge_into_top(&command) {
            Some(merged) => {
                log::debug!("merged {:?} into top entry", command.description());
                self.undo_stack.replace_top(merged);
            }
            None => {
                let evicted = self.undo_stack.push(command);
                if evicted > 0 {
                    log::debug!("evicted {evicted} oldest history entries");
                }
            }
        }

        if !self.redo_stack.is_empty() {
            log::debug!("discarding {} redo entries", self.redo_stack.len());
            self.redo_stack.clear();
        }
        self.refresh_flags();
    }

    fn merge_into_top(&self, command: &Command) -> Option<Command> {
        let top = self.undo_stack.last()?;
        if !top.is_mergeable() || !command.can_merge_with(top) {
            return None;
        }
        if !within_window(top.timestamp(), command.timestamp(), self.config.merge_window()) {
            return None;
        }
        command.merge_with(top)
    }

    /// Undo the most recent entry, returning its description. Returns
    /// `Ok(None)` when there is nothing to undo.
    pub async fn undo(&mut self) -> Result<Option<String>> {
        let Some(command) = self.undo_stack.last() else {
            log::warn!("undo requested with an empty undo stack");
            return Ok(None);
        };
        if let Err(source) = command.undo(&self.stores).await {
            log::debug!("undo {:?} failed: {source}", command.description());
            return Err(HistoryError::Undo {
                description: command.description().to_string(),
                source,
            });
        }

        let Some(command) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let description = command.description().to_string();
        self.redo_stack.push(command);
        self.refresh_flags();
        Ok(Some(description))
    }

    /// Re-apply the most recently undone entry, returning its description.
    /// Returns `Ok(None)` when there is nothing to redo.
    pub async fn redo(&mut self) -> Result<Option<String>> {
        let Some(command) = self.redo_stack.last() else {
            log::warn!("redo requested with an empty redo stack");
            return Ok(None);
        };
        if let Err(source) = command.execute(&self.stores).await {
            log::debug!("redo {:?} failed: {source}", command.description());
            return Err(HistoryError::Redo {
                description: command.description().to_string(),
                source,
            });
        }

        let Some(command) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let description = command.description().to_string();
        let evicted = self.undo_stack.push(command);
        if evicted > 0 {
            log::debug!("evicted {evicted} oldest history entries on redo");
        }
        self.refresh_flags();
        Ok(Some(description))
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.refresh_flags();
    }

    /// Change the undo bound, evicting the oldest entries right away if the
    /// stack is already taller.
    pub fn set_max_history_size(&mut self, max: NonZeroUsize) {
        log::debug!(
            "history bound {} -> {max}",
            self.undo_stack.capacity()
        );
        self.config.max_history_size = max;
        let evicted = self.undo_stack.set_capacity(max);
        if evicted > 0 {
            log::debug!("evicted {evicted} history entries after shrinking to {max}");
        }
        self.refresh_flags();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn flags(&self) -> HistoryFlags {
        HistoryFlags {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Receiver that observes every change of `can_undo` / `can_redo`.
    pub fn subscribe(&self) -> watch::Receiver<HistoryFlags> {
        self.flags.subscribe()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undo entries, oldest first. The last one is undone next.
    pub fn undo_list(&self) -> Vec<HistoryEntry> {
        self.undo_stack.iter().map(HistoryEntry::from).collect()
    }

    /// Redo entries, oldest undo first. The last one is redone next.
    pub fn redo_list(&self) -> Vec<HistoryEntry> {
        self.redo_stack.iter().map(HistoryEntry::from).collect()
    }

    fn refresh_flags(&self) {
        let next = self.flags();
        self.flags.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl std::fmt::Debug for HistoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("config", &self.config)
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_core::{CanvasId, CanvasStore, MemoryStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn setup(max: usize) -> (HistoryEngine, Arc<MemoryStore>, CanvasId) {
        let store = Arc::new(MemoryStore::new());
        let canvas = store.create_canvas("Board").await.unwrap();
        let config = HistoryConfig::default()
            .with_max_history_size(NonZeroUsize::new(max).unwrap());
        let engine = HistoryEngine::new(Stores::shared(store.clone()), config);
        (engine, store, canvas)
    }

    #[tokio::test]
    async fn undo_redo_zoom() {
        let (mut engine, store, canvas) = setup(100).await;

        engine
            .execute_command(Command::zoom(canvas, 1.0, 2.0))
            .await
            .unwrap();
        assert_eq!(store.canvas(canvas).unwrap().scale, 2.0);

        let desc = engine.undo().await.unwrap();
        assert_eq!(desc.as_deref(), Some("Zoom to 200%"));
        assert_eq!(store.canvas(canvas).unwrap().scale, 1.0);

        let desc = engine.redo().await.unwrap();
        assert_eq!(desc.as_deref(), Some("Zoom to 200%"));
        assert_eq!(store.canvas(canvas).unwrap().scale, 2.0);
    }

    #[tokio::test]
    async fn empty_stacks_are_noops() {
        let (mut engine, _store, _canvas) = setup(10).await;
        assert_eq!(engine.undo().await, Ok(None));
        assert_eq!(engine.redo().await, Ok(None));
        assert_eq!(engine.flags(), HistoryFlags::default());
    }

    #[tokio::test]
    async fn max_depth_trims_oldest() {
        let (mut engine, _store, canvas) = setup(3).await;

        for i in 0..5 {
            let t = Timestamp::from_millis(i * 1_000);
            let scale = 1.0 + (i + 1) as f64 * 0.1;
            let prev = 1.0 + i as f64 * 0.1;
            engine
                .execute_command(Command::zoom(canvas, prev, scale).at(t))
                .await
                .unwrap();
        }

        let mut undo_count = 0;
        while engine.undo().await.unwrap().is_some() {
            undo_count += 1;
        }
        assert_eq!(undo_count, 3);
    }

    #[tokio::test]
    async fn flags_follow_stacks() {
        let (mut engine, _store, canvas) = setup(10).await;
        let rx = engine.subscribe();

        engine
            .execute_command(Command::zoom(canvas, 1.0, 1.5))
            .await
            .unwrap();
        assert_eq!(
            *rx.borrow(),
            HistoryFlags {
                can_undo: true,
                can_redo: false
            }
        );

        engine.undo().await.unwrap();
        assert_eq!(
            *rx.borrow(),
            HistoryFlags {
                can_undo: false,
                can_redo: true
            }
        );

        engine.clear();
        assert_eq!(*rx.borrow(), HistoryFlags::default());
    }

    #[tokio::test]
    async fn merge_window_expiry_starts_new_entry() {
        let (mut engine, _store, canvas) = setup(10).await;

        engine.record_command(Command::zoom(canvas, 1.0, 1.1).at(Timestamp::from_millis(0)));
        engine.record_command(Command::zoom(canvas, 1.1, 1.2).at(Timestamp::from_millis(400)));
        assert_eq!(engine.undo_len(), 1);

        // The gap is measured from the merged entry's (latest) timestamp.
        engine.record_command(Command::zoom(canvas, 1.2, 1.3).at(Timestamp::from_millis(800)));
        assert_eq!(engine.undo_len(), 1);

        engine.record_command(Command::zoom(canvas, 1.3, 1.4).at(Timestamp::from_millis(1_400)));
        assert_eq!(engine.undo_len(), 2);
    }

    #[tokio::test]
    async fn lists_are_bottom_first() {
        let (mut engine, _store, canvas) = setup(10).await;
        engine.record_command(
            Command::zoom(canvas, 1.0, 1.5)
                .with_description("first")
                .at(Timestamp::from_millis(0)),
        );
        engine.record_command(
            Command::pan(canvas, nc_core::Vec2::ZERO, nc_core::Vec2::new(3.0, 4.0))
                .with_description("second")
                .at(Timestamp::from_millis(10)),
        );

        let undo: Vec<_> = engine.undo_list().into_iter().map(|e| e.description).collect();
        assert_eq!(undo, vec!["first", "second"]);

        engine.undo().await.unwrap();
        engine.undo().await.unwrap();
        let redo: Vec<_> = engine.redo_list().into_iter().map(|e| e.command_type).collect();
        assert_eq!(redo, vec![CommandType::Pan, CommandType::Zoom]);
    }

    #[tokio::test]
    async fn shrinking_bound_evicts_now() {
        let (mut engine, _store, canvas) = setup(10).await;
        for i in 0..6 {
            engine.record_command(
                Command::zoom(canvas, 1.0, 1.0).at(Timestamp::from_millis(i * 1_000)),
            );
        }
        assert_eq!(engine.undo_len(), 6);

        engine.set_max_history_size(NonZeroUsize::new(2).unwrap());
        assert_eq!(engine.undo_len(), 2);
        assert_eq!(engine.config().max_history_size.get(), 2);
    }

    #[tokio::test]
    async fn history_rows_serialize_with_type_key() {
        let (mut engine, _store, canvas) = setup(10).await;
        engine.record_command(Command::zoom(canvas, 1.0, 1.5).at(Timestamp::from_millis(40)));

        let rows = serde_json::to_value(engine.undo_list()).unwrap();
        assert_eq!(
            rows,
            serde_json::json!([
                { "description": "Zoom to 150%", "timestamp": 40, "type": "zoom" }
            ])
        );
    }
}

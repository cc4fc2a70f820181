//! Integration tests: failing and slow stores.
//!
//! Wraps the in-memory store so mutations can be made to fail or to block,
//! then checks that the engine keeps its stacks consistent and rejects
//! overlapping operations.

use async_trait::async_trait;
use nc_core::store::Result as StoreResult;
use nc_core::*;
use nc_history::{Command, HistoryEngine, HistoryError, SharedHistory, Timestamp};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Delegates to a `MemoryStore`, optionally failing or pausing mutations.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    /// Fails only `delete_canvas`, after any note deletes have gone through.
    failing_canvas_delete: AtomicBool,
    /// When set, `set_scale` signals `entered` and waits on `release`.
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl FaultyStore {
    fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Storage("disk unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CanvasStore for FaultyStore {
    async fn create_canvas(&self, name: &str) -> StoreResult<CanvasId> {
        self.check()?;
        self.inner.create_canvas(name).await
    }

    async fn restore_canvas(&self, canvas: &Canvas) -> StoreResult<()> {
        self.check()?;
        self.inner.restore_canvas(canvas).await
    }

    async fn delete_canvas(&self, id: CanvasId) -> StoreResult<()> {
        self.check()?;
        if self.failing_canvas_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("canvas table locked".to_string()));
        }
        self.inner.delete_canvas(id).await
    }

    async fn set_active_canvas(&self, id: Option<CanvasId>) -> StoreResult<()> {
        self.check()?;
        self.inner.set_active_canvas(id).await
    }

    async fn set_scale(&self, id: CanvasId, scale: f64) -> StoreResult<()> {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.check()?;
        self.inner.set_scale(id, scale).await
    }

    async fn set_offset(&self, id: CanvasId, offset: Vec2) -> StoreResult<()> {
        self.check()?;
        self.inner.set_offset(id, offset).await
    }

    fn canvas(&self, id: CanvasId) -> Option<Canvas> {
        self.inner.canvas(id)
    }

    fn active_canvas(&self) -> Option<CanvasId> {
        self.inner.active_canvas()
    }
}

#[async_trait]
impl NoteStore for FaultyStore {
    async fn create_note(&self, canvas: CanvasId, position: Point, color: Color) -> StoreResult<NoteId> {
        self.check()?;
        self.inner.create_note(canvas, position, color).await
    }

    async fn restore_notes(&self, notes: &[Note]) -> StoreResult<()> {
        self.check()?;
        self.inner.restore_notes(notes).await
    }

    async fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_note(id).await
    }

    async fn delete_notes(&self, ids: &[NoteId]) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_notes(ids).await
    }

    async fn move_note(&self, id: NoteId, position: Point) -> StoreResult<()> {
        self.check()?;
        self.inner.move_note(id, position).await
    }

    fn note(&self, id: NoteId) -> Option<Note> {
        self.inner.note(id)
    }

    fn notes_on(&self, canvas: CanvasId) -> Vec<Note> {
        self.inner.notes_on(canvas)
    }
}

async fn setup() -> (HistoryEngine, Arc<FaultyStore>, CanvasId) {
    let store = Arc::new(FaultyStore::default());
    let canvas = store.create_canvas("Flaky").await.unwrap();
    let engine = HistoryEngine::with_stores(Stores::shared(store.clone()));
    (engine, store, canvas)
}

fn zoom(canvas: CanvasId, step: u64, old: f64, new: f64) -> Command {
    Command::zoom(canvas, old, new).at(Timestamp::from_millis(step * 10_000))
}

#[tokio::test]
async fn failed_execute_records_nothing() {
    let (mut engine, store, canvas) = setup().await;
    engine.execute_command(zoom(canvas, 0, 1.0, 2.0)).await.unwrap();
    engine.undo().await.unwrap();
    assert!(engine.can_redo());

    store.fail(true);
    let err = engine
        .execute_command(zoom(canvas, 1, 1.0, 3.0))
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::Execution { .. }));
    assert_eq!(engine.undo_len(), 0);
    // Nothing was recorded, so the redo branch survives.
    assert_eq!(engine.redo_len(), 1);
}

#[tokio::test]
async fn invalid_mutation_surfaces_store_error() {
    let (mut engine, _store, canvas) = setup().await;
    let err = engine
        .execute_command(Command::zoom(canvas, 1.0, -4.0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HistoryError::Execution {
            description: "Zoom to -400%".to_string(),
            source: StoreError::InvalidScale(-4.0),
        }
    );
    assert!(!engine.can_undo());
}

#[tokio::test]
async fn failed_undo_leaves_stacks_untouched_and_retryable() {
    let (mut engine, store, canvas) = setup().await;
    engine.execute_command(zoom(canvas, 0, 1.0, 2.0)).await.unwrap();
    engine.execute_command(zoom(canvas, 1, 2.0, 4.0)).await.unwrap();
    let before = (engine.undo_list(), engine.redo_list());

    store.fail(true);
    let err = engine.undo().await.unwrap_err();
    assert!(matches!(err, HistoryError::Undo { .. }));
    assert_eq!((engine.undo_list(), engine.redo_list()), before);
    assert_eq!(store.canvas(canvas).unwrap().scale, 4.0);

    store.fail(false);
    assert!(engine.undo().await.unwrap().is_some());
    assert_eq!(store.canvas(canvas).unwrap().scale, 2.0);
}

#[tokio::test]
async fn failed_redo_leaves_stacks_untouched_and_retryable() {
    let (mut engine, store, canvas) = setup().await;
    engine.execute_command(zoom(canvas, 0, 1.0, 2.0)).await.unwrap();
    engine.undo().await.unwrap();
    let before = (engine.undo_list(), engine.redo_list());

    store.fail(true);
    let err = engine.redo().await.unwrap_err();
    assert!(matches!(err, HistoryError::Redo { .. }));
    assert_eq!((engine.undo_list(), engine.redo_list()), before);
    assert!(engine.can_redo());

    store.fail(false);
    engine.redo().await.unwrap();
    assert_eq!(store.canvas(canvas).unwrap().scale, 2.0);
}

#[tokio::test]
async fn overlapping_operation_is_rejected_as_busy() {
    let (engine, store, canvas) = setup().await;
    let history = SharedHistory::new(engine);

    store.gated.store(true, Ordering::SeqCst);
    let in_flight = {
        let history = history.clone();
        tokio::spawn(async move { history.execute_command(zoom(canvas, 0, 1.0, 2.0)).await })
    };
    store.entered.notified().await;

    assert_eq!(history.undo().await, Err(HistoryError::Busy));
    assert_eq!(
        history.record_command(zoom(canvas, 1, 2.0, 3.0)),
        Err(HistoryError::Busy)
    );
    // Flags stay readable while the operation is in flight.
    assert!(!history.flags().can_undo);

    store.gated.store(false, Ordering::SeqCst);
    store.release.notify_one();
    in_flight.await.unwrap().unwrap();

    assert!(history.flags().can_undo);
    assert_eq!(history.undo_list().unwrap().len(), 1);
}

#[tokio::test]
async fn redo_of_canvas_delete_is_retryable_after_partial_failure() {
    let (mut engine, store, canvas) = setup().await;
    let note = store
        .create_note(canvas, Point::new(1.0, 2.0), Color::default())
        .await
        .unwrap();
    let snapshot = engine.stores().snapshot_canvas(canvas).unwrap();
    engine
        .execute_command(Command::delete_canvas(snapshot))
        .await
        .unwrap();
    engine.undo().await.unwrap();
    assert!(store.note(note).is_some());

    // Notes go first, then the canvas delete fails.
    store.failing_canvas_delete.store(true, Ordering::SeqCst);
    let err = engine.redo().await.unwrap_err();
    assert_eq!(
        err,
        HistoryError::Redo {
            description: "Delete canvas \"Flaky\"".to_string(),
            source: StoreError::Storage("canvas table locked".to_string()),
        }
    );
    assert_eq!(engine.redo_len(), 1);
    assert!(store.note(note).is_none());
    assert!(store.canvas(canvas).is_some());

    store.failing_canvas_delete.store(false, Ordering::SeqCst);
    engine.redo().await.unwrap();
    assert!(store.canvas(canvas).is_none());
    assert_eq!(engine.undo_len(), 1);
    assert_eq!(engine.redo_len(), 0);

    // The full snapshot still comes back.
    engine.undo().await.unwrap();
    assert_eq!(store.note(note).unwrap().position, Point::new(1.0, 2.0));
}

#[tokio::test]
async fn dropped_undo_leaves_stacks_untouched() {
    let (mut engine, store, canvas) = setup().await;
    engine.execute_command(zoom(canvas, 0, 1.0, 2.0)).await.unwrap();
    let before = (engine.undo_list(), engine.redo_list());

    store.gated.store(true, Ordering::SeqCst);
    tokio::select! {
        _ = engine.undo() => panic!("undo finished while the store was blocked"),
        _ = store.entered.notified() => {}
    }
    store.gated.store(false, Ordering::SeqCst);

    assert_eq!((engine.undo_list(), engine.redo_list()), before);
    assert_eq!(store.canvas(canvas).unwrap().scale, 2.0);

    assert_eq!(engine.undo().await.unwrap().as_deref(), Some("Zoom to 200%"));
    assert_eq!(store.canvas(canvas).unwrap().scale, 1.0);
    assert!(engine.can_redo());
}

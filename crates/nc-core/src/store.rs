//! Store interfaces consumed by history commands.
//!
//! The stores own and persist canvases and notes. Every mutation is async
//! because real implementations round-trip to persistent storage. History
//! commands reach the stores only through these traits, bundled in a
//! [`Stores`] handle.

use crate::id::{CanvasId, NoteId};
use crate::model::{Canvas, Color, Note};
use async_trait::async_trait;
use kurbo::{Point, Vec2};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a store operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    CanvasNotFound(CanvasId),

    #[error("{0} not found")]
    NoteNotFound(NoteId),

    #[error("invalid scale {0}")]
    InvalidScale(f64),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Owner of canvases, their viewport transforms, and the active selection.
#[async_trait]
pub trait CanvasStore: Send + Sync {
    /// Create an empty canvas and return its freshly minted id.
    async fn create_canvas(&self, name: &str) -> Result<CanvasId>;

    /// Re-create a canvas exactly as captured, keeping its id.
    async fn restore_canvas(&self, canvas: &Canvas) -> Result<()>;

    async fn delete_canvas(&self, id: CanvasId) -> Result<()>;

    /// Set the active canvas; `None` leaves no canvas active.
    async fn set_active_canvas(&self, id: Option<CanvasId>) -> Result<()>;

    async fn set_scale(&self, id: CanvasId, scale: f64) -> Result<()>;

    async fn set_offset(&self, id: CanvasId, offset: Vec2) -> Result<()>;

    fn canvas(&self, id: CanvasId) -> Option<Canvas>;

    fn active_canvas(&self) -> Option<CanvasId>;
}

/// Owner of notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create a note and return its freshly minted id.
    async fn create_note(&self, canvas: CanvasId, position: Point, color: Color) -> Result<NoteId>;

    /// Re-create notes exactly as captured, keeping their ids.
    async fn restore_notes(&self, notes: &[Note]) -> Result<()>;

    async fn delete_note(&self, id: NoteId) -> Result<()>;

    async fn delete_notes(&self, ids: &[NoteId]) -> Result<()>;

    async fn move_note(&self, id: NoteId, position: Point) -> Result<()>;

    fn note(&self, id: NoteId) -> Option<Note>;

    /// All notes on `canvas`, in creation order.
    fn notes_on(&self, canvas: CanvasId) -> Vec<Note>;
}

/// Handles to the stores a history engine mutates through its commands.
#[derive(Clone)]
pub struct Stores {
    pub canvases: Arc<dyn CanvasStore>,
    pub notes: Arc<dyn NoteStore>,
}

/// A canvas together with the notes that live on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSnapshot {
    pub canvas: Canvas,
    pub notes: Vec<Note>,
    pub was_active: bool,
}

impl Stores {
    pub fn new(canvases: Arc<dyn CanvasStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self { canvases, notes }
    }

    /// Use one object for both stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CanvasStore + NoteStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    /// Capture a canvas and its dependents, for a cascade delete.
    pub fn snapshot_canvas(&self, id: CanvasId) -> Option<CanvasSnapshot> {
        let canvas = self.canvases.canvas(id)?;
        Some(CanvasSnapshot {
            notes: self.notes.notes_on(id),
            was_active: self.canvases.active_canvas() == Some(id),
            canvas,
        })
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

//! In-memory reference implementation of both stores.
//!
//! Used by the replay tool and by tests. Mutations validate their inputs
//! before touching state, so a failed call leaves the store unchanged.

use crate::id::{CanvasId, NoteId};
use crate::model::{Canvas, Color, Note, is_valid_scale};
use crate::store::{CanvasStore, NoteStore, Result, StoreError};
use async_trait::async_trait;
use kurbo::{Point, Vec2};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default, Clone, PartialEq)]
struct State {
    canvases: Vec<Canvas>,
    notes: Vec<Note>,
    active: Option<CanvasId>,
}

impl State {
    fn canvas_mut(&mut self, id: CanvasId) -> Result<&mut Canvas> {
        self.canvases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::CanvasNotFound(id))
    }

    fn has_canvas(&self, id: CanvasId) -> bool {
        self.canvases.iter().any(|c| c.id == id)
    }

    fn has_note(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }
}

/// Thread-safe in-memory canvas + note store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All canvases, in creation order.
    pub fn canvases(&self) -> Vec<Canvas> {
        self.state().canvases.clone()
    }

    /// All notes across every canvas, in creation order.
    pub fn notes(&self) -> Vec<Note> {
        self.state().notes.clone()
    }

    /// Find a canvas by display name.
    pub fn canvas_named(&self, name: &str) -> Option<Canvas> {
        self.state().canvases.iter().find(|c| c.name == name).cloned()
    }
}

#[async_trait]
impl CanvasStore for MemoryStore {
    async fn create_canvas(&self, name: &str) -> Result<CanvasId> {
        let id = CanvasId::fresh();
        log::trace!("create {id} ({name:?})");
        self.state().canvases.push(Canvas::new(id, name));
        Ok(id)
    }

    async fn restore_canvas(&self, canvas: &Canvas) -> Result<()> {
        log::trace!("restore {}", canvas.id);
        let mut state = self.state();
        match state.canvases.iter_mut().find(|c| c.id == canvas.id) {
            Some(existing) => *existing = canvas.clone(),
            None => state.canvases.push(canvas.clone()),
        }
        Ok(())
    }

    async fn delete_canvas(&self, id: CanvasId) -> Result<()> {
        log::trace!("delete {id}");
        let mut state = self.state();
        if !state.has_canvas(id) {
            return Err(StoreError::CanvasNotFound(id));
        }
        state.canvases.retain(|c| c.id != id);
        state.notes.retain(|n| n.canvas != id);
        if state.active == Some(id) {
            state.active = None;
        }
        Ok(())
    }

    async fn set_active_canvas(&self, id: Option<CanvasId>) -> Result<()> {
        let mut state = self.state();
        if let Some(id) = id {
            if !state.has_canvas(id) {
                return Err(StoreError::CanvasNotFound(id));
            }
        }
        state.active = id;
        Ok(())
    }

    async fn set_scale(&self, id: CanvasId, scale: f64) -> Result<()> {
        if !is_valid_scale(scale) {
            return Err(StoreError::InvalidScale(scale));
        }
        self.state().canvas_mut(id)?.scale = scale;
        Ok(())
    }

    async fn set_offset(&self, id: CanvasId, offset: Vec2) -> Result<()> {
        if !offset.is_finite() {
            return Err(StoreError::Storage(format!("non-finite offset {offset:?}")));
        }
        self.state().canvas_mut(id)?.offset = offset;
        Ok(())
    }

    fn canvas(&self, id: CanvasId) -> Option<Canvas> {
        self.state().canvases.iter().find(|c| c.id == id).cloned()
    }

    fn active_canvas(&self) -> Option<CanvasId> {
        self.state().active
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create_note(&self, canvas: CanvasId, position: Point, color: Color) -> Result<NoteId> {
        let mut state = self.state();
        if !state.has_canvas(canvas) {
            return Err(StoreError::CanvasNotFound(canvas));
        }
        let id = NoteId::fresh();
        log::trace!("create {id} on {canvas}");
        state.notes.push(Note::new(id, canvas, position, color));
        Ok(id)
    }

    async fn restore_notes(&self, notes: &[Note]) -> Result<()> {
        let mut state = self.state();
        if let Some(orphan) = notes.iter().find(|n| !state.has_canvas(n.canvas)) {
            return Err(StoreError::CanvasNotFound(orphan.canvas));
        }
        for note in notes {
            log::trace!("restore {}", note.id);
            match state.notes.iter_mut().find(|n| n.id == note.id) {
                Some(existing) => *existing = note.clone(),
                None => state.notes.push(note.clone()),
            }
        }
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> Result<()> {
        self.delete_notes(&[id]).await
    }

    async fn delete_notes(&self, ids: &[NoteId]) -> Result<()> {
        let mut state = self.state();
        if let Some(missing) = ids.iter().find(|id| !state.has_note(**id)) {
            return Err(StoreError::NoteNotFound(*missing));
        }
        log::trace!("delete {} note(s)", ids.len());
        state.notes.retain(|n| !ids.contains(&n.id));
        Ok(())
    }

    async fn move_note(&self, id: NoteId, position: Point) -> Result<()> {
        let mut state = self.state();
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NoteNotFound(id))?;
        note.position = position;
        Ok(())
    }

    fn note(&self, id: NoteId) -> Option<Note> {
        self.state().notes.iter().find(|n| n.id == id).cloned()
    }

    fn notes_on(&self, canvas: CanvasId) -> Vec<Note> {
        self.state()
            .notes
            .iter()
            .filter(|n| n.canvas == canvas)
            .cloned()
            .collect()
    }
}

//! Reversible commands.
//!
//! A `Command` is an immutable value describing one user-visible mutation.
//! It carries the "before" values captured when the gesture completed, so
//! `undo` never has to read whatever the stores currently hold. Commands
//! reach the stores only through the [`Stores`] handle passed in by the
//! engine.
//!
//! Continuous gestures (wheel zoom, pinch, drag-pan, note drag) produce a
//! command per event. Consecutive commands on the same target merge into one:
//! the merged command keeps the earliest "before" and the latest "after".

use crate::time::Timestamp;
use nc_core::{Canvas, CanvasId, CanvasSnapshot, Note, NoteId, Point, StoreError, Stores, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Operation tag of a command, for history panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    CreateCanvas,
    DeleteCanvas,
    SwitchCanvas,
    Zoom,
    Pan,
    CreateNote,
    DeleteNotes,
    MoveNote,
}

impl CommandType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::CreateCanvas => "create_canvas",
            CommandType::DeleteCanvas => "delete_canvas",
            CommandType::SwitchCanvas => "switch_canvas",
            CommandType::Zoom => "zoom",
            CommandType::Pan => "pan",
            CommandType::CreateNote => "create_note",
            CommandType::DeleteNotes => "delete_notes",
            CommandType::MoveNote => "move_note",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutation a command performs, with its captured before/after values.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// The canvas was already created by the caller; undo deletes it.
    CreateCanvas { canvas: Canvas },
    /// Cascade delete: the canvas and every note on it.
    DeleteCanvas {
        canvas: Canvas,
        notes: Vec<Note>,
        was_active: bool,
    },
    SwitchCanvas {
        from: Option<CanvasId>,
        to: CanvasId,
    },
    Zoom {
        canvas: CanvasId,
        old: f64,
        new: f64,
    },
    Pan {
        canvas: CanvasId,
        old: Vec2,
        new: Vec2,
    },
    /// The note was already created by the caller; undo deletes it.
    CreateNote { note: Note },
    DeleteNotes { notes: SmallVec<[Note; 4]> },
    MoveNote { note: NoteId, old: Point, new: Point },
}

/// Identity of the thing a mergeable command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeKey {
    Zoom(CanvasId),
    Pan(CanvasId),
    MoveNote(NoteId),
}

impl CommandKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandKind::CreateCanvas { .. } => CommandType::CreateCanvas,
            CommandKind::DeleteCanvas { .. } => CommandType::DeleteCanvas,
            CommandKind::SwitchCanvas { .. } => CommandType::SwitchCanvas,
            CommandKind::Zoom { .. } => CommandType::Zoom,
            CommandKind::Pan { .. } => CommandType::Pan,
            CommandKind::CreateNote { .. } => CommandType::CreateNote,
            CommandKind::DeleteNotes { .. } => CommandType::DeleteNotes,
            CommandKind::MoveNote { .. } => CommandType::MoveNote,
        }
    }

    /// Default human-readable label.
    pub fn describe(&self) -> String {
        match self {
            CommandKind::CreateCanvas { canvas } => format!("Create canvas \"{}\"", canvas.name),
            CommandKind::DeleteCanvas { canvas, .. } => format!("Delete canvas \"{}\"", canvas.name),
            CommandKind::SwitchCanvas { to, .. } => format!("Switch to {to}"),
            CommandKind::Zoom { new, .. } => format!("Zoom to {:.0}%", new * 100.0),
            CommandKind::Pan { .. } => "Pan canvas".to_string(),
            CommandKind::CreateNote { .. } => "Add note".to_string(),
            CommandKind::DeleteNotes { notes } if notes.len() == 1 => "Delete note".to_string(),
            CommandKind::DeleteNotes { notes } => format!("Delete {} notes", notes.len()),
            CommandKind::MoveNote { .. } => "Move note".to_string(),
        }
    }

    fn merge_key(&self) -> Option<MergeKey> {
        match self {
            CommandKind::Zoom { canvas, .. } => Some(MergeKey::Zoom(*canvas)),
            CommandKind::Pan { canvas, .. } => Some(MergeKey::Pan(*canvas)),
            CommandKind::MoveNote { note, .. } => Some(MergeKey::MoveNote(*note)),
            _ => None,
        }
    }
}

/// One reversible entry in the history.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: CommandKind,
    description: String,
    timestamp: Timestamp,
}

impl Command {
    /// Wrap `kind`, stamping it with the current time and its default label.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            description: kind.describe(),
            timestamp: Timestamp::now(),
            kind,
        }
    }

    pub fn create_canvas(canvas: Canvas) -> Self {
        Self::new(CommandKind::CreateCanvas { canvas })
    }

    pub fn delete_canvas(snapshot: CanvasSnapshot) -> Self {
        Self::new(CommandKind::DeleteCanvas {
            canvas: snapshot.canvas,
            notes: snapshot.notes,
            was_active: snapshot.was_active,
        })
    }

    pub fn switch_canvas(from: Option<CanvasId>, to: CanvasId) -> Self {
        Self::new(CommandKind::SwitchCanvas { from, to })
    }

    pub fn zoom(canvas: CanvasId, old: f64, new: f64) -> Self {
        Self::new(CommandKind::Zoom { canvas, old, new })
    }

    pub fn pan(canvas: CanvasId, old: Vec2, new: Vec2) -> Self {
        Self::new(CommandKind::Pan { canvas, old, new })
    }

    pub fn create_note(note: Note) -> Self {
        Self::new(CommandKind::CreateNote { note })
    }

    pub fn delete_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Self::new(CommandKind::DeleteNotes {
            notes: notes.into_iter().collect(),
        })
    }

    pub fn move_note(note: NoteId, old: Point, new: Point) -> Self {
        Self::new(CommandKind::MoveNote { note, old, new })
    }

    /// Replace the default label.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override the creation time.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn command_type(&self) -> CommandType {
        self.kind.command_type()
    }

    /// Apply the forward mutation. Replaying after an undo reproduces the
    /// state the first application produced.
    pub async fn execute(&self, stores: &Stores) -> Result<(), StoreError> {
        log::trace!("execute {:?}", self.description);
        match &self.kind {
            CommandKind::CreateCanvas { canvas } => {
                if stores.canvases.canvas(canvas.id).is_none() {
                    stores.canvases.restore_canvas(canvas).await?;
                }
            }
            CommandKind::DeleteCanvas { canvas, notes, .. } => {
                // A retry after a failed canvas delete finds these already gone.
                let ids: Vec<NoteId> = notes
                    .iter()
                    .map(|n| n.id)
                    .filter(|id| stores.notes.note(*id).is_some())
                    .collect();
                if !ids.is_empty() {
                    stores.notes.delete_notes(&ids).await?;
                }
                stores.canvases.delete_canvas(canvas.id).await?;
            }
            CommandKind::SwitchCanvas { to, .. } => {
                stores.canvases.set_active_canvas(Some(*to)).await?;
            }
            CommandKind::Zoom { canvas, new, .. } => {
                stores.canvases.set_scale(*canvas, *new).await?;
            }
            CommandKind::Pan { canvas, new, .. } => {
                stores.canvases.set_offset(*canvas, *new).await?;
            }
            CommandKind::CreateNote { note } => {
                if stores.notes.note(note.id).is_none() {
                    stores.notes.restore_notes(std::slice::from_ref(note)).await?;
                }
            }
            CommandKind::DeleteNotes { notes } => {
                let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
                stores.notes.delete_notes(&ids).await?;
            }
            CommandKind::MoveNote { note, new, .. } => {
                stores.notes.move_note(*note, *new).await?;
            }
        }
        Ok(())
    }

    /// Restore the state from before `execute`, using only captured values.
    pub async fn undo(&self, stores: &Stores) -> Result<(), StoreError> {
        log::trace!("undo {:?}", self.description);
        match &self.kind {
            CommandKind::CreateCanvas { canvas } => {
                stores.canvases.delete_canvas(canvas.id).await?;
            }
            CommandKind::DeleteCanvas {
                canvas,
                notes,
                was_active,
            } => {
                stores.canvases.restore_canvas(canvas).await?;
                if !notes.is_empty() {
                    stores.notes.restore_notes(notes).await?;
                }
                if *was_active {
                    stores.canvases.set_active_canvas(Some(canvas.id)).await?;
                }
            }
            CommandKind::SwitchCanvas { from, .. } => {
                stores.canvases.set_active_canvas(*from).await?;
            }
            CommandKind::Zoom { canvas, old, .. } => {
                stores.canvases.set_scale(*canvas, *old).await?;
            }
            CommandKind::Pan { canvas, old, .. } => {
                stores.canvases.set_offset(*canvas, *old).await?;
            }
            CommandKind::CreateNote { note } => {
                stores.notes.delete_note(note.id).await?;
            }
            CommandKind::DeleteNotes { notes } => {
                stores.notes.restore_notes(notes).await?;
            }
            CommandKind::MoveNote { note, old, .. } => {
                stores.notes.move_note(*note, *old).await?;
            }
        }
        Ok(())
    }

    /// Whether this kind of command ever merges.
    pub fn is_mergeable(&self) -> bool {
        self.kind.merge_key().is_some()
    }

    /// Same mergeable operation on the same target as `other`.
    /// Time is not considered here; the engine applies the merge window.
    pub fn can_merge_with(&self, other: &Command) -> bool {
        match self.kind.merge_key() {
            Some(key) => other.kind.merge_key() == Some(key),
            None => false,
        }
    }

    /// Combine `earlier` (already on the stack) with `self` into a new
    /// command spanning both: `earlier`'s before-value, `self`'s
    /// after-value, `self`'s timestamp. Returns `None` if they don't merge.
    pub fn merge_with(&self, earlier: &Command) -> Option<Command> {
        let kind = match (&earlier.kind, &self.kind) {
            (
                CommandKind::Zoom { canvas, old, .. },
                CommandKind::Zoom {
                    canvas: target,
                    new,
                    ..
                },
            ) if canvas == target => CommandKind::Zoom {
                canvas: *canvas,
                old: *old,
                new: *new,
            },
            (
                CommandKind::Pan { canvas, old, .. },
                CommandKind::Pan {
                    canvas: target,
                    new,
                    ..
                },
            ) if canvas == target => CommandKind::Pan {
                canvas: *canvas,
                old: *old,
                new: *new,
            },
            (
                CommandKind::MoveNote { note, old, .. },
                CommandKind::MoveNote {
                    note: target, new, ..
                },
            ) if note == target => CommandKind::MoveNote {
                note: *note,
                old: *old,
                new: *new,
            },
            _ => return None,
        };
        Some(Command {
            description: kind.describe(),
            timestamp: self.timestamp,
            kind,
        })
    }
}

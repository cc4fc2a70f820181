//! Replays parsed script steps against an in-memory store through a
//! history engine.
//!
//! Each step advances a virtual clock by one frame (16 ms); `wait` advances
//! it further. Commands are stamped from this clock, so whether consecutive
//! gestures merge depends only on the script.

use crate::script::Step;
use nc_core::*;
use nc_history::{Command, HistoryConfig, HistoryEngine, Timestamp};
use std::sync::Arc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

pub struct Runner {
    store: Arc<MemoryStore>,
    engine: HistoryEngine,
    clock: Timestamp,
    /// Notes placed by `note` steps, addressed 1-based by later steps.
    notes: Vec<NoteId>,
}

impl Runner {
    pub fn new(config: HistoryConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = HistoryEngine::new(Stores::shared(store.clone()), config);
        Self {
            store,
            engine,
            clock: Timestamp::default(),
            notes: Vec::new(),
        }
    }

    pub fn engine(&self) -> &HistoryEngine {
        &self.engine
    }

    #[cfg(test)]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Run one step, returning the lines it wants printed.
    pub async fn run(&mut self, step: &Step) -> Result<Vec<String>, String> {
        self.clock = self.clock.advanced_by(FRAME);
        match step {
            Step::Canvas(name) => {
                let id = self
                    .store
                    .create_canvas(name)
                    .await
                    .map_err(|e| e.to_string())?;
                let canvas = self
                    .store
                    .canvas(id)
                    .ok_or_else(|| format!("{id} not found"))?;
                self.engine
                    .record_command(Command::create_canvas(canvas).at(self.clock));
                let from = self.store.active_canvas();
                self.execute(Command::switch_canvas(from, id)).await?;
                Ok(vec![format!("created {id} ({name:?})")])
            }
            Step::Switch(name) => {
                let to = self.canvas_named(name)?.id;
                let from = self.store.active_canvas();
                self.execute(Command::switch_canvas(from, to)).await?;
                Ok(vec![format!("switched to {to}")])
            }
            Step::DeleteCanvas(name) => {
                let id = self.canvas_named(name)?.id;
                let snapshot = self
                    .engine
                    .stores()
                    .snapshot_canvas(id)
                    .ok_or_else(|| format!("{id} not found"))?;
                let note_count = snapshot.notes.len();
                self.execute(Command::delete_canvas(snapshot)).await?;
                Ok(vec![format!("deleted {id} and {note_count} note(s)")])
            }
            Step::Zoom(scale) => {
                let canvas = self.active()?;
                self.execute(Command::zoom(canvas.id, canvas.scale, *scale))
                    .await?;
                Ok(Vec::new())
            }
            Step::Pan(x, y) => {
                let canvas = self.active()?;
                let offset = Vec2::new(*x, *y);
                self.execute(Command::pan(canvas.id, canvas.offset, offset))
                    .await?;
                Ok(Vec::new())
            }
            Step::Note { x, y, color } => {
                let canvas = self.active()?;
                let id = self
                    .store
                    .create_note(canvas.id, Point::new(*x, *y), color.unwrap_or_default())
                    .await
                    .map_err(|e| e.to_string())?;
                let note = self.note(id)?;
                self.engine
                    .record_command(Command::create_note(note).at(self.clock));
                self.notes.push(id);
                Ok(vec![format!("placed #{} as {id}", self.notes.len())])
            }
            Step::Move { index, x, y } => {
                let note = self.note(self.note_id(*index)?)?;
                let target = Point::new(*x, *y);
                self.execute(Command::move_note(note.id, note.position, target))
                    .await?;
                Ok(Vec::new())
            }
            Step::DeleteNote(index) => {
                let note = self.note(self.note_id(*index)?)?;
                self.execute(Command::delete_notes([note])).await?;
                Ok(Vec::new())
            }
            Step::Wait(ms) => {
                self.clock = self.clock.advanced_by(Duration::from_millis(*ms));
                Ok(Vec::new())
            }
            Step::Undo => {
                let undone = self.engine.undo().await.map_err(|e| e.to_string())?;
                Ok(vec![match undone {
                    Some(description) => format!("undo: {description}"),
                    None => "undo: nothing to undo".to_string(),
                }])
            }
            Step::Redo => {
                let redone = self.engine.redo().await.map_err(|e| e.to_string())?;
                Ok(vec![match redone {
                    Some(description) => format!("redo: {description}"),
                    None => "redo: nothing to redo".to_string(),
                }])
            }
            Step::Clear => {
                self.engine.clear();
                Ok(vec!["history cleared".to_string()])
            }
            Step::History => Ok(self.history_report()),
        }
    }

    async fn execute(&mut self, command: Command) -> Result<(), String> {
        self.engine
            .execute_command(command.at(self.clock))
            .await
            .map_err(|e| e.to_string())
    }

    fn active(&self) -> Result<Canvas, String> {
        self.store
            .active_canvas()
            .and_then(|id| self.store.canvas(id))
            .ok_or_else(|| "no active canvas".to_string())
    }

    fn canvas_named(&self, name: &str) -> Result<Canvas, String> {
        self.store
            .canvas_named(name)
            .ok_or_else(|| format!("no canvas named {name:?}"))
    }

    fn note_id(&self, index: usize) -> Result<NoteId, String> {
        index
            .checked_sub(1)
            .and_then(|i| self.notes.get(i))
            .copied()
            .ok_or_else(|| format!("no note #{index}"))
    }

    fn note(&self, id: NoteId) -> Result<Note, String> {
        self.store.note(id).ok_or_else(|| format!("{id} not found"))
    }

    /// Undo/redo lists plus the current store state.
    pub fn history_report(&self) -> Vec<String> {
        let mut out = Vec::new();
        let flags = self.engine.flags();
        out.push(format!(
            "history: {} undo / {} redo (can_undo={}, can_redo={})",
            self.engine.undo_len(),
            self.engine.redo_len(),
            flags.can_undo,
            flags.can_redo
        ));
        for (i, entry) in self.engine.undo_list().iter().enumerate() {
            out.push(format!(
                "  undo[{i}] {:<14} {:>8}  {}",
                entry.command_type.as_str(),
                entry.timestamp.to_string(),
                entry.description
            ));
        }
        for (i, entry) in self.engine.redo_list().iter().enumerate() {
            out.push(format!(
                "  redo[{i}] {:<14} {:>8}  {}",
                entry.command_type.as_str(),
                entry.timestamp.to_string(),
                entry.description
            ));
        }
        let active = self.store.active_canvas();
        for canvas in self.store.canvases() {
            let marker = if Some(canvas.id) == active { "*" } else { " " };
            let notes = self.store.notes_on(canvas.id);
            out.push(format!(
                "  {marker}{} {:?} scale={:.2} offset=({:.1}, {:.1}) notes={}",
                canvas.id,
                canvas.name,
                canvas.scale,
                canvas.offset.x,
                canvas.offset.y,
                notes.len()
            ));
            for note in notes {
                out.push(format!(
                    "      {} ({:.1}, {:.1}) {}",
                    note.id,
                    note.position.x,
                    note.position.y,
                    note.color.to_hex()
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;
    use pretty_assertions::assert_eq;

    async fn replay(script: &str) -> Runner {
        let mut runner = Runner::new(HistoryConfig::default());
        for line in parse_script(script).unwrap() {
            runner.run(&line.step).await.unwrap();
        }
        runner
    }

    #[tokio::test]
    async fn consecutive_zoom_frames_merge() {
        let runner = replay("canvas \"A\"\nzoom 1.2\nzoom 1.5\nzoom 2\n").await;
        // create + switch + one merged zoom
        assert_eq!(runner.engine().undo_len(), 3);
        let top = runner.engine().undo_list().pop().unwrap();
        assert_eq!(top.description, "Zoom to 200%");
    }

    #[tokio::test]
    async fn wait_splits_gestures() {
        let runner = replay("canvas \"A\"\nzoom 1.2\nwait 600\nzoom 1.5\n").await;
        assert_eq!(runner.engine().undo_len(), 4);
    }

    #[tokio::test]
    async fn undo_restores_canvas_state() {
        let runner = replay(
            "canvas \"A\"\npan 10 20\nwait 1000\nnote 5 5\nmove 1 50 60\nmove 1 70 80\nundo\nundo\nundo\n",
        )
        .await;
        let canvas = runner.store().canvas_named("A").unwrap();
        assert_eq!(canvas.offset, Vec2::ZERO);
        assert!(runner.store().notes().is_empty());
        assert_eq!(runner.engine().redo_len(), 3);
    }

    #[tokio::test]
    async fn delete_canvas_undo_brings_notes_back() {
        let runner = replay(
            "canvas \"A\"\nnote 1 1\nnote 2 2\ndelete-canvas \"A\"\nundo\n",
        )
        .await;
        let canvas = runner.store().canvas_named("A").unwrap();
        assert_eq!(runner.store().notes_on(canvas.id).len(), 2);
        assert_eq!(runner.store().active_canvas(), Some(canvas.id));
    }

    #[tokio::test]
    async fn missing_targets_are_reported() {
        let mut runner = Runner::new(HistoryConfig::default());
        let err = runner.run(&Step::Zoom(2.0)).await.unwrap_err();
        assert_eq!(err, "no active canvas");
        let err = runner.run(&Step::DeleteNote(3)).await.unwrap_err();
        assert_eq!(err, "no note #3");
    }

    #[tokio::test]
    async fn history_report_lists_entries() {
        let runner = replay("canvas \"Board\"\nzoom 1.5\nundo\n").await;
        let report = runner.history_report();
        assert!(report[0].starts_with("history: 2 undo / 1 redo"));
        assert!(report.iter().any(|l| l.contains("redo[0] zoom")));
        assert!(report.iter().any(|l| l.contains("\"Board\" scale=1.00")));
    }

    #[tokio::test]
    async fn history_report_shows_note_colors() {
        let runner = replay("canvas \"Board\"\nnote 3 4 #F00\nnote 5 6\n").await;
        let report = runner.history_report();
        assert!(report.iter().any(|l| l.ends_with("(3.0, 4.0) #FF0000")));
        assert!(report.iter().any(|l| l.ends_with("(5.0, 6.0) #FFEB3B")));
    }

    #[tokio::test]
    async fn canvas_names_may_contain_hash() {
        let runner = replay("canvas \"Q3 # plan\"  # quarterly\nzoom 2\n").await;
        let canvas = runner.store().canvas_named("Q3 # plan").unwrap();
        assert_eq!(canvas.scale, 2.0);
    }
}

pub mod id;
pub mod memory;
pub mod model;
pub mod store;

pub use id::{CanvasId, NoteId};
pub use memory::MemoryStore;
pub use model::*;
pub use store::{CanvasSnapshot, CanvasStore, NoteStore, StoreError, Stores};

// Re-export kurbo geometry so downstream crates don't need a direct dependency
pub use kurbo::{Point, Vec2};

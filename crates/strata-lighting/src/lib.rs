//! Sky and block light propagation across chunk boundaries, with incremental
//! updates after block edits.

pub mod cross_chunk;
pub mod cursor;
mod engine;
pub mod propagation;

pub use cross_chunk::{BorderLayer, face_coords, pull_in};
pub use cursor::{ChunkCursor, LightNode};
pub use engine::{LightingConfig, LightingEngine, LightingReport};
pub use propagation::{FloodBudget, FloodOutcome, Removal, flood, remove, transfer};

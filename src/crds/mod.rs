pub mod game;

// Re-export types
pub use game::{Game, GameSpec, GameStatus, Readiness};

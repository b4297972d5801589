//! Per-slot query backend: serves similarity search plus answer generation
//! against one index version, lazily picking up on-disk updates.

pub mod server;
pub mod state;

pub use state::BackendState;

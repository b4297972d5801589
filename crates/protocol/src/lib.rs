//! Shared wire types and the version-slot vocabulary used by the builder,
//! router, and backend.

pub mod slot;
pub mod wire;

pub use slot::{SlotParseError, VersionSlot};
pub use wire::{
    ActivateRequest, ActivateResponse, ChatRequest, ChatResponse, ErrorResponse, HealthResponse,
    RouteErrorResponse,
};

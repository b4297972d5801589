//! Stateless request router: forwards each chat request to the backend of
//! the currently active index version and owns the activation endpoint.

pub mod server;

pub use server::{RouterState, build_router_app, start_router};

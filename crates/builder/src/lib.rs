//! Index builder: watches the knowledge directory, rebuilds the retrieval
//! index into a staging area, promotes it with an atomic directory rename,
//! and tells the router to switch traffic.

pub mod pipeline;
pub mod scan;
pub mod service;
pub mod watcher;

pub use service::BuilderService;

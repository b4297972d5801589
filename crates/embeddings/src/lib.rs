//! Embedding generation: provider trait, HTTP provider, and the degraded-mode
//! random fallback that keeps the build pipeline moving through outages.

pub mod fallback;
pub mod http;
pub mod provider;

pub use fallback::FallbackEmbeddings;
pub use http::HttpEmbeddingProvider;
pub use provider::EmbeddingProvider;

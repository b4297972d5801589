//! Chat-completion provider: the external LLM call that turns a query plus
//! retrieved context into a natural-language answer.

pub mod chat;

pub use chat::{ChatProvider, HttpChatProvider};

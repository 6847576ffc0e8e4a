//! OpenAI chat-completions adapter
//!
//! Also serves DeepSeek, xAI and any OpenAI-compatible proxy, which share
//! the same wire format.

mod client;
mod models;

pub use client::OpenAIProvider;

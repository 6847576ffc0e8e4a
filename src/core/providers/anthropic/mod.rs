//! Anthropic Messages API adapter

mod client;
mod models;

pub use client::AnthropicProvider;

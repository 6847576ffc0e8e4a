//! Google Gemini `generateContent` adapter

mod client;
mod models;

pub use client::GeminiProvider;

//! speaklet: voice-driven web applet generator.
//!
//! A user records an audio request, the audio is transcribed, the
//! transcription is templated into a prompt, and an LLM returns an HTML
//! document (plus optional localStorage seed data). The result is persisted
//! under a generated UUID and served back as a standalone applet. Further
//! recordings against the same UUID regenerate the HTML using the prior
//! HTML and storage as context.

pub mod ai;
pub mod config;
pub mod prompts;
pub mod server;
pub mod store;

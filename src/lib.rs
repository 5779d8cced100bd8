//! # Tomecast
//!
//! A terminal client for book and document summaries with audio narration.
//!
//! ## Features
//!
//! - **Catalog search**: top ten Open Library matches, normalised into [`SearchResult`]s
//! - **Summaries**: by catalog key or by uploading a PDF/text file, in one of five languages
//! - **Narration**: base64 MP3 payloads decoded into scoped, playable [`AudioHandle`]s
//! - **Reducer state**: a single [`Store`] with stale-response protection and retry

pub mod backend;
pub mod catalog;
pub mod client;
pub mod config;
pub mod export;
pub mod http;
pub mod language;
pub mod media;
pub mod state;
pub mod ui;

pub use catalog::SearchResult;
pub use client::SummarizerClient;
pub use config::Config;
pub use language::Language;
pub use media::{AudioClip, AudioHandle, AudioLease};
pub use state::Store;

//! The infinite library: an encyclopedia where every page exists.
//!
//! Any title a reader asks for resolves to an article. Stored articles are served
//! as they are; a missing one is written on the spot by a language model, grounded
//! on the most relevant articles already in the library, then stored for good.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with an FTS5 index over title, body and summary
//! - **Generation**: any OpenAI-compatible Chat Completions endpoint
//! - **Web**: axum, server-rendered HTML
//!
//! Request flow: normalize the title → look it up → on a miss, search the
//! library for context → generate → store (the title's primary key settles
//! races) → render.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`article`]: Titles, link/citation markers, the article store and search
//! - [`generation`]: Prompting the model and parsing what it writes
//! - [`render`]: Markup to escaped HTML, page templates
//! - [`service`]: Lookup-or-generate page logic
//! - [`server`]: HTTP routes

pub mod article;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod render;
pub mod server;
pub mod service;

pub use error::{WikiError, WikiResult};

#![doc = "zendocs: LLM-generated documentation for uploaded codebases."]

//! An uploaded zip is unpacked, its source files are summarized one by one by
//! a text generation service, and the summaries are stored as one markdown
//! document that can later be rendered to PDF and published.
//!
//! Entry points: [`workflow::Workflow`] for the pipeline, [`server::router`]
//! for the HTTP surface, [`cli::run`] for the binary.

pub mod aggregate;
pub mod cli;
pub mod contract;
pub mod discover;
pub mod error;
pub mod extract;
pub mod generate;
pub mod load_config;
pub mod object_store;
pub mod openrouter;
pub mod publish;
pub mod render;
pub mod server;
pub mod store;
pub mod workflow;

pub use error::{Result, ZenError};

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! readmegen - README generation for GitHub repositories and profiles
//!
//! The library reads repository metadata and a bounded sample of files from
//! GitHub, asks a generative language model to write a README from them,
//! validates the output, and stores the result so it can be edited and
//! committed back.
//!
//! ## Usage
//! ```rust,ignore
//! use readmegen::{AppContext, Config, GenerationRequest, RepositoryReference};
//!
//! async fn example() -> readmegen::Result<()> {
//!     let context = AppContext::build(Config::load(None)?).await?;
//!     let reference = RepositoryReference::parse("https://github.com/octo/repo")?;
//!     let outcome = context.readmes.generate(&GenerationRequest::new(reference)).await?;
//!     println!("{}", outcome.content);
//!     Ok(())
//! }
//! ```

/// Web interface: form pages and JSON endpoints
pub mod api;
/// Process-start wiring of clients, pipeline and store
pub mod app;
/// In-memory TTL cache for generated documents
pub mod cache;
/// Configuration module for the application
pub mod config;
/// Error handling types and utilities
pub mod error;
/// Generative language model client
pub mod gemini;
/// GitHub access: URL parsing, REST client, metadata and publishing
pub mod github;
/// Bounded repository walk producing file previews
pub mod ingest;
/// Logging configuration and utilities
pub mod logging;
/// Markdown rendering and the content-quality gate
pub mod markdown;
/// The generation pipeline
pub mod orchestrator;
/// Prompt assembly
pub mod prompts;
/// SQLite document store
pub mod store;
/// HTML views
pub mod templates;

// Re-export common types
pub use app::AppContext;
pub use config::Config;
pub use error::{GeneratorError, Result, Stage};
pub use gemini::{GeminiClient, TextGenerator};
pub use github::{GitHubClient, RepositoryReference, RepositorySource};
pub use orchestrator::{GenerationOutcome, GenerationRequest, ReadmeGenerator};
pub use store::{DocumentStore, GeneratedDocument};

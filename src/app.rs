//! Process-wide collaborators
//!
//! Clients are built once at startup from [`Config`] and handed to the
//! pipeline, the web handlers and the CLI.

use std::sync::Arc;

use tracing::info;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::Result;
use crate::gemini::{GeminiClient, TextGenerator};
use crate::github::{GitHubClient, RepositorySource};
use crate::orchestrator::ReadmeGenerator;
use crate::store::DocumentStore;

/// Everything a request handler needs
#[derive(Clone)]
pub struct AppContext {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// GitHub client used for publishing
    pub github: GitHubClient,
    /// Generation pipeline
    pub readmes: ReadmeGenerator,
    /// Document store
    pub store: DocumentStore,
}

impl AppContext {
    /// Builds the production collaborators and opens the document store
    pub async fn build(config: Config) -> Result<Self> {
        let github = GitHubClient::new(&config.github)?;
        let generator = GeminiClient::new(&config.generator)?;
        let store = DocumentStore::connect(&config.storage.database_path).await?;

        info!(
            "Using model {} with {} GitHub access",
            config.generator.model,
            if github.has_token() { "authenticated" } else { "anonymous" }
        );

        let source: Arc<dyn RepositorySource> = Arc::new(github.clone());
        Ok(Self::from_parts(config, github, source, Arc::new(generator), store))
    }

    /// Assembles a context from already built collaborators
    pub fn from_parts(
        config: Config,
        github: GitHubClient,
        source: Arc<dyn RepositorySource>,
        generator: Arc<dyn TextGenerator>,
        store: DocumentStore,
    ) -> Self {
        let cache = Cache::new(config.cache_ttl());
        let readmes = ReadmeGenerator::new(source, generator, cache, &config);
        Self {
            config: Arc::new(config),
            github,
            readmes,
            store,
        }
    }
}

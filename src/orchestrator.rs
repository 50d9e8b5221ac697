//! Document generation pipeline
//!
//! `cache check -> fetch metadata -> summarize -> build prompt -> generate ->
//! validate -> cache store`. Failures are tagged with the stage they came
//! from. A license lookup miss gets exactly one retry with the license
//! skipped; nothing else is retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{document_key, Cache};
use crate::config::{Config, IngestionSettings};
use crate::error::{GeneratorError, Result, Stage};
use crate::gemini::TextGenerator;
use crate::github::metadata::LicenseMode;
use crate::github::{fetch_metadata, fetch_profile, RepositoryReference, RepositorySource};
use crate::ingest;
use crate::markdown::validate_markdown;
use crate::prompts::{PromptBuilder, MAX_INSTRUCTION_CHARS};

/// One generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Repository or profile to document
    pub reference: RepositoryReference,
    /// Optional free-text instructions from the user
    pub instructions: Option<String>,
}

impl GenerationRequest {
    /// Request without user instructions
    pub fn new(reference: RepositoryReference) -> Self {
        Self { reference, instructions: None }
    }

    /// Attaches user instructions; blank text counts as none
    pub fn with_instructions(mut self, instructions: Option<&str>) -> Self {
        self.instructions = instructions
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        self
    }

    fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }
}

/// A generated document and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Validated Markdown
    pub content: String,
    /// Served from the cache without calling the generator
    pub from_cache: bool,
}

/// Runs the generation pipeline against injected collaborators
#[derive(Clone)]
pub struct ReadmeGenerator {
    source: Arc<dyn RepositorySource>,
    generator: Arc<dyn TextGenerator>,
    cache: Cache<String>,
    prompts: PromptBuilder,
    ingestion: IngestionSettings,
}

impl ReadmeGenerator {
    /// Builds a pipeline from collaborators and configuration
    pub fn new(
        source: Arc<dyn RepositorySource>,
        generator: Arc<dyn TextGenerator>,
        cache: Cache<String>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            generator,
            cache,
            prompts: PromptBuilder::new(config.prompt.clone()),
            ingestion: config.ingestion.clone(),
        }
    }

    /// The shared document cache
    pub fn cache(&self) -> &Cache<String> {
        &self.cache
    }

    /// Generates (or serves from cache) the README for `request`
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        check_instructions(request)?;

        let key = document_key(&request.reference, request.instructions());
        if let Some(content) = self.cache.get(&key).await {
            info!("Serving cached README for {}", request.reference);
            return Ok(GenerationOutcome { content, from_cache: true });
        }

        let content = match self.attempt(request, LicenseMode::Lookup).await {
            Ok(content) => content,
            Err(e) if e.is_license_not_found() => {
                warn!("License lookup for {} failed ({}), retrying without license", request.reference, e);
                self.attempt(request, LicenseMode::Skip)
                    .await
                    .map_err(|e| GeneratorError::at(Stage::FallbackRetry, e))?
            }
            Err(e) => return Err(e),
        };

        self.cache.set(&key, content.clone()).await;
        info!("Generated README for {} ({} chars)", request.reference, content.chars().count());
        Ok(GenerationOutcome { content, from_cache: false })
    }

    /// Drops the cached document for `request`, forcing the next call to regenerate
    pub async fn invalidate(&self, request: &GenerationRequest) -> bool {
        self.cache
            .remove(&document_key(&request.reference, request.instructions()))
            .await
    }

    async fn attempt(&self, request: &GenerationRequest, license: LicenseMode) -> Result<String> {
        let prompt = if request.reference.is_profile {
            self.profile_prompt(request).await?
        } else {
            self.repository_prompt(request, license).await?
        };
        debug!("Prompt for {} is {} chars", request.reference, prompt.chars().count());

        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| GeneratorError::at(Stage::Generate, e))?;

        let content = validate_markdown(&text).map_err(|e| GeneratorError::at(Stage::Validate, e))?;
        Ok(content.to_string())
    }

    async fn repository_prompt(&self, request: &GenerationRequest, license: LicenseMode) -> Result<String> {
        let reference = &request.reference;
        let metadata = fetch_metadata(self.source.as_ref(), reference, license)
            .await
            .map_err(|e| GeneratorError::at(Stage::FetchMetadata, e))?;

        let summary = ingest::summarize(self.source.as_ref(), reference, &metadata.default_branch, &self.ingestion).await;

        Ok(self.prompts.repository(&metadata, &summary, request.instructions()))
    }

    async fn profile_prompt(&self, request: &GenerationRequest) -> Result<String> {
        let profile = fetch_profile(self.source.as_ref(), &request.reference.owner, self.ingestion.profile_repo_limit)
            .await
            .map_err(|e| GeneratorError::at(Stage::FetchMetadata, e))?;

        Ok(self.prompts.profile(&profile, request.instructions()))
    }
}

/// Rejects overlong instructions before any collaborator is called
fn check_instructions(request: &GenerationRequest) -> Result<()> {
    let length = request.instructions().map(|text| text.chars().count()).unwrap_or(0);
    if length > MAX_INSTRUCTION_CHARS {
        return Err(GeneratorError::at(
            Stage::BuildPrompt,
            GeneratorError::Validation(format!(
                "instructions are {} characters long, the limit is {}",
                length, MAX_INSTRUCTION_CHARS
            )),
        ));
    }
    Ok(())
}

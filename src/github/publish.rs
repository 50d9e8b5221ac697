use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{GitHubClient, RepositoryReference, RepositorySource};
use crate::error::{GeneratorError, Result};

const COMMIT_MESSAGE: &str = "Update README via readmegen";
const DEFAULT_README_PATH: &str = "README.md";

/// Result of a publish attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Whether the commit went through
    pub success: bool,
    /// Human-readable description of what happened
    pub message: String,
}

impl PublishOutcome {
    fn succeeded(message: String) -> Self {
        Self { success: true, message }
    }

    fn failed(message: String) -> Self {
        Self { success: false, message }
    }
}

/// Commits `content` as the README of the repository behind `url`
///
/// Profile URLs publish to the `<owner>/<owner>` profile repository. Every
/// failure is reported through the outcome, never as an error.
pub async fn publish_readme(client: &GitHubClient, url: &str, content: &str) -> PublishOutcome {
    if !client.has_token() {
        return PublishOutcome::failed("Publishing requires a GitHub token (GITHUB_TOKEN)".to_string());
    }

    let reference = match RepositoryReference::parse(url) {
        Ok(reference) => reference,
        Err(e) => return PublishOutcome::failed(e.to_string()),
    };

    match commit_readme(client, &reference, content).await {
        Ok(message) => {
            info!("{}", message);
            PublishOutcome::succeeded(message)
        }
        Err(e) => {
            warn!("Publishing README to {} failed: {}", reference, e);
            PublishOutcome::failed(format!("Failed to push README: {}", e))
        }
    }
}

async fn commit_readme(client: &GitHubClient, reference: &RepositoryReference, content: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(GeneratorError::Validation("refusing to publish an empty README".into()));
    }

    // A profile README lives in the repository named after the account.
    let owner = reference.owner.as_str();
    let repo = if reference.is_profile { owner } else { reference.name.as_str() };

    let info = client.repository(owner, repo).await?;
    let existing = client.readme_file(owner, repo).await?;

    let (path, sha, verb) = match &existing {
        Some(file) => (file.path.as_str(), Some(file.sha.as_str()), "Updated"),
        None => (DEFAULT_README_PATH, None, "Created"),
    };

    client
        .put_file(owner, repo, path, &info.default_branch, content, COMMIT_MESSAGE, sha)
        .await?;

    Ok(format!("{} {} in {}/{} on {}", verb, path, owner, repo, info.default_branch))
}

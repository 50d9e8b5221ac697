//! Source-host collaborator
//!
//! Everything the pipeline needs from GitHub goes through the
//! [`RepositorySource`] trait, so the metadata fetcher, the ingestion walk and
//! the orchestrator can be exercised against mocks.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// REST client for api.github.com
pub mod client;
#[cfg(test)]
pub(crate) mod fixtures;
/// Repository and profile metadata with explicit partial-failure handling
pub mod metadata;
/// Committing edited READMEs back to GitHub
pub mod publish;
/// GitHub URL parsing
pub mod url;

pub use client::GitHubClient;
pub use metadata::{fetch_metadata, fetch_profile, Lookup, ProfileMetadata, RepositoryMetadata};
pub use publish::{publish_readme, PublishOutcome};
pub use url::RepositoryReference;

/// Kind of an entry in a repository tree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file
    Blob,
    /// A directory
    Tree,
    /// Anything else (submodules, symlinks)
    Other,
}

/// One entry of a tree or directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Entry kind
    pub kind: EntryKind,
}

impl TreeEntry {
    /// A file entry
    pub fn blob(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Blob }
    }

    /// A directory entry
    pub fn tree(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Tree }
    }
}

/// A recursive tree listing
#[derive(Debug, Clone, Default)]
pub struct RepoTree {
    /// Entries in listing order
    pub entries: Vec<TreeEntry>,
    /// GitHub cut the listing short
    pub truncated: bool,
}

/// Descriptive fields of a repository as returned by the repository endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository name
    pub name: String,
    /// Repository description
    pub description: Option<String>,
    /// Topics, in the order GitHub reports them
    pub topics: Vec<String>,
    /// Stargazer count
    pub stars: u64,
    /// Fork count
    pub forks: u64,
    /// Watcher count
    pub watchers: u64,
    /// Default branch name
    pub default_branch: String,
}

/// Public profile fields of a user or organization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// Login
    pub login: String,
    /// Display name
    pub name: Option<String>,
    /// Profile bio
    pub bio: Option<String>,
    /// Location
    pub location: Option<String>,
    /// Website
    pub blog: Option<String>,
    /// Follower count
    pub followers: u64,
    /// Number of public repositories
    pub public_repos: u64,
}

/// Top-level metadata of one repository in a profile listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSummary {
    /// Repository name
    pub name: String,
    /// Repository description
    pub description: Option<String>,
    /// Primary language
    pub language: Option<String>,
    /// Stargazer count
    pub stars: u64,
    /// Fork count
    pub forks: u64,
    /// Topics
    pub topics: Vec<String>,
    /// Whether the repository is a fork
    pub fork: bool,
}

/// Read access to a source host
///
/// Missing optional resources (no license, no README) are `Ok(None)`; a
/// missing repository or user is `Err(GeneratorError::NotFound)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Repository metadata
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo>;

    /// Language name to byte count
    async fn languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>>;

    /// License key
    async fn license(&self, owner: &str, repo: &str) -> Result<Option<String>>;

    /// Decoded README of the default branch
    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>>;

    /// Full recursive tree of `branch`
    async fn tree(&self, owner: &str, repo: &str, branch: &str) -> Result<RepoTree>;

    /// Immediate children of a directory (`""` for the root)
    async fn list_directory(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Result<Vec<TreeEntry>>;

    /// Raw bytes of a file
    async fn file_content(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Result<Vec<u8>>;

    /// Public profile of a user
    async fn user(&self, login: &str) -> Result<UserInfo>;

    /// Public repositories of a user, most recently updated first
    async fn user_repositories(&self, login: &str, limit: usize) -> Result<Vec<RepoSummary>>;
}

/// Decodes bytes as UTF-8, dropping invalid sequences instead of failing
pub fn decode_permissive(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

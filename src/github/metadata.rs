use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{RepoSummary, RepositoryReference, RepositorySource};
use crate::error::{GeneratorError, Result};

const NO_DESCRIPTION: &str = "No description provided";

/// Outcome of an optional lookup
///
/// Keeps "the resource does not exist" apart from "the lookup broke", so the
/// callers can log the second while treating both as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists
    Found(T),
    /// The resource does not exist
    Absent,
    /// The lookup failed for another reason
    Failed(String),
}

impl<T> Lookup<T> {
    /// Classifies the result of an optional lookup
    pub fn from_result(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::Absent,
            Err(GeneratorError::NotFound(_)) | Err(GeneratorError::LicenseNotFound(_)) => Self::Absent,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Collapses to an `Option`, logging failures under `what`
    pub fn into_option(self, what: &str) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => {
                debug!("No {} present", what);
                None
            }
            Self::Failed(reason) => {
                warn!("Could not fetch {}, continuing without it: {}", what, reason);
                None
            }
        }
    }
}

/// Whether the license endpoint is consulted at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseMode {
    /// Look the license up, treating any failure as "none"
    Lookup,
    /// Skip the lookup and report no license
    Skip,
}

/// Descriptive metadata of one repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// Repository name
    pub name: String,
    /// Description, or a placeholder when the repository has none
    pub description: String,
    /// Language name to byte count
    pub languages: HashMap<String, u64>,
    /// Topics, in the order GitHub reports them
    pub topics: Vec<String>,
    /// License key; `None` is a valid state
    pub license: Option<String>,
    /// Stargazer count
    pub stars: u64,
    /// Fork count
    pub forks: u64,
    /// Watcher count
    pub watchers: u64,
    /// Default branch
    pub default_branch: String,
    /// Current README, empty when there is none
    pub existing_readme: String,
}

impl RepositoryMetadata {
    /// Language names ordered by byte count, largest first
    pub fn languages_by_size(&self) -> Vec<&str> {
        let mut languages: Vec<(&String, &u64)> = self.languages.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        languages.into_iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Public profile metadata and the repositories it spans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileMetadata {
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
    /// Public repository count
    pub public_repos: u64,
    /// Most recently updated repositories, forks excluded
    pub repositories: Vec<RepoSummary>,
    /// Current profile README (from `<login>/<login>`), empty when absent
    pub existing_readme: String,
}

/// Fetches repository metadata
///
/// A missing repository fails with `NotFound`. License, README and language
/// lookups never abort the fetch; they fall back to none/empty.
pub async fn fetch_metadata(
    source: &dyn RepositorySource,
    reference: &RepositoryReference,
    license_mode: LicenseMode,
) -> Result<RepositoryMetadata> {
    let owner = reference.owner.as_str();
    let repo = reference.name.as_str();

    let info = source.repository(owner, repo).await?;

    let languages = match source.languages(owner, repo).await {
        Ok(languages) => languages,
        Err(e) => {
            warn!("Could not fetch languages of {}, continuing without them: {}", reference, e);
            HashMap::new()
        }
    };

    let license = match license_mode {
        LicenseMode::Lookup => Lookup::from_result(source.license(owner, repo).await).into_option("license"),
        LicenseMode::Skip => None,
    };

    let existing_readme = Lookup::from_result(source.readme(owner, repo).await)
        .into_option("README")
        .unwrap_or_default();

    Ok(RepositoryMetadata {
        name: info.name,
        description: info
            .description
            .filter(|description| !description.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        languages,
        topics: info.topics,
        license,
        stars: info.stars,
        forks: info.forks,
        watchers: info.watchers,
        default_branch: info.default_branch,
        existing_readme,
    })
}

/// Fetches a user's profile and top-level metadata of their repositories
pub async fn fetch_profile(
    source: &dyn RepositorySource,
    login: &str,
    repo_limit: usize,
) -> Result<ProfileMetadata> {
    let user = source.user(login).await?;

    let repositories = match source.user_repositories(login, repo_limit).await {
        Ok(repos) => repos.into_iter().filter(|repo| !repo.fork).collect(),
        Err(e) => {
            warn!("Could not list repositories of {}: {}", login, e);
            Vec::new()
        }
    };

    let existing_readme = Lookup::from_result(source.readme(login, login).await)
        .into_option("profile README")
        .unwrap_or_default();

    Ok(ProfileMetadata {
        login: user.login,
        name: user.name,
        bio: user.bio,
        location: user.location,
        blog: user.blog,
        followers: user.followers,
        public_repos: user.public_repos,
        repositories,
        existing_readme,
    })
}

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

const GITHUB_BASE: &str = "https://github.com";

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)(?:/([A-Za-z0-9._-]+))?/?$")
        .expect("GitHub URL pattern is valid")
});

/// A GitHub repository or user profile named by a URL
///
/// Profiles are stored with `name == owner`, since a profile README lives in
/// the `<owner>/<owner>` repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryReference {
    /// User or organization login
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Whether the URL named a profile rather than a repository
    pub is_profile: bool,
}

impl RepositoryReference {
    /// Parses `https://github.com/<owner>[/<repo>]`
    ///
    /// Zero path segments, more than two, query strings and non-GitHub hosts
    /// are rejected. A trailing `.git` on the repository name is dropped.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let captures = GITHUB_URL
            .captures(url)
            .ok_or_else(|| GeneratorError::InvalidUrl(url.to_string()))?;

        let owner = captures[1].to_string();
        match captures.get(2) {
            Some(name) => {
                let name = name.as_str().trim_end_matches(".git");
                if name.is_empty() || name == "." || name == ".." {
                    return Err(GeneratorError::InvalidUrl(url.to_string()));
                }
                Ok(Self::repository(owner, name))
            }
            None => Ok(Self::profile(owner)),
        }
    }

    /// Parses a URL and checks it against the requested mode
    pub fn parse_with_mode(url: &str, profile: bool) -> Result<Self> {
        let reference = Self::parse(url)?;
        if profile && !reference.is_profile {
            return Err(GeneratorError::InvalidUrl(format!(
                "{} names a repository; profile mode expects https://github.com/<user>",
                url.trim()
            )));
        }
        Ok(reference)
    }

    /// Reference to a single repository
    pub fn repository(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            is_profile: false,
        }
    }

    /// Reference to a user profile
    pub fn profile(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        Self {
            name: owner.clone(),
            owner,
            is_profile: true,
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// The canonical URL this reference was parsed from
    ///
    /// Lowercased, since GitHub resolves logins and repository names without
    /// regard to case. Cache and store keys are derived from it.
    pub fn canonical_url(&self) -> String {
        let url = if self.is_profile {
            format!("{}/{}", GITHUB_BASE, self.owner)
        } else {
            format!("{}/{}/{}", GITHUB_BASE, self.owner, self.name)
        };
        url.to_lowercase()
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_profile {
            write!(f, "{}", self.owner)
        } else {
            write!(f, "{}/{}", self.owner, self.name)
        }
    }
}

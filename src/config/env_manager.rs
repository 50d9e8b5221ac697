use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stores API keys for the GitHub and Gemini services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// GitHub API token for authenticated requests and publishing
    pub github_token: Option<String>,
    /// Gemini API key for the generative language API
    pub gemini_api_key: Option<String>,
}

impl ApiKeys {
    /// Loads API keys from the process environment, honoring a `.env` file
    pub fn from_env() -> Self {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment from .env file");
        }

        Self {
            github_token: get_env_value("GITHUB_TOKEN"),
            gemini_api_key: get_env_value("GEMINI_API_KEY"),
        }
    }

    /// Fills keys that are not set yet from `other`
    pub fn merge_missing(&mut self, other: ApiKeys) {
        if self.github_token.is_none() {
            self.github_token = other.github_token;
        }
        if self.gemini_api_key.is_none() {
            self.gemini_api_key = other.gemini_api_key;
        }
    }
}

/// Reads an environment variable, treating empty values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut keys = ApiKeys {
            github_token: Some("from-file".into()),
            gemini_api_key: None,
        };
        keys.merge_missing(ApiKeys {
            github_token: Some("from-env".into()),
            gemini_api_key: Some("gem".into()),
        });

        assert_eq!(keys.github_token.as_deref(), Some("from-file"));
        assert_eq!(keys.gemini_api_key.as_deref(), Some("gem"));
    }

    #[test]
    fn test_empty_env_value_is_unset() {
        std::env::set_var("READMEGEN_TEST_EMPTY_KEY", "   ");
        assert_eq!(get_env_value("READMEGEN_TEST_EMPTY_KEY"), None);
    }
}

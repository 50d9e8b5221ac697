use std::fmt;
use std::io;
use thiserror::Error;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Pipeline stages a generation failure can be attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Repository or profile metadata lookup
    FetchMetadata,
    /// Prompt assembly
    BuildPrompt,
    /// External generator call
    Generate,
    /// Content-quality gate
    Validate,
    /// The single retry after a license lookup miss
    FallbackRetry,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchMetadata => "metadata fetch",
            Stage::BuildPrompt => "prompt assembly",
            Stage::Generate => "generation",
            Stage::Validate => "validation",
            Stage::FallbackRetry => "fallback attempt",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while generating, storing or publishing documents
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The submitted URL is not a GitHub repository or profile URL
    #[error("Invalid GitHub URL: {0}")]
    InvalidUrl(String),

    /// Repository or profile does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The license endpoint answered 404
    #[error("license not found (404) for {0}")]
    LicenseNotFound(String),

    /// GitHub answered with an unexpected status
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// API rate limit exceeded errors
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The generator returned no text
    #[error("The generator did not return any content")]
    GenerationEmpty,

    /// Generated output failed the content-quality gate
    #[error("Markdown validation failed: {0}")]
    Validation(String),

    /// Language model API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A failure tagged with the pipeline stage it came from
    #[error("Failed to generate README during {stage}: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// Underlying failure
        #[source]
        source: Box<GeneratorError>,
    },
}

impl GeneratorError {
    /// Wraps an error with the stage it occurred in
    pub fn at(stage: Stage, source: GeneratorError) -> Self {
        Self::Stage { stage, source: Box::new(source) }
    }

    /// Returns the innermost error, skipping stage wrappers
    pub fn root(&self) -> &GeneratorError {
        let mut current = self;
        while let Self::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// The stage this error was attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Checks if the repository or profile is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    /// Checks if this is a license lookup miss
    pub fn is_license_not_found(&self) -> bool {
        matches!(self.root(), Self::LicenseNotFound(_))
    }

    /// Short message suitable for showing to the person who submitted the form
    pub fn user_message(&self) -> String {
        match self.root() {
            Self::NotFound(what) => format!("Repository or profile not found: {}", what),
            Self::GenerationEmpty => "The language model did not return any content. Please try again.".to_string(),
            Self::Validation(_) => "The generated README was too short to be useful. Please try again.".to_string(),
            Self::RateLimitExceeded(_) => "GitHub rate limit exceeded. Please try again later.".to_string(),
            Self::InvalidUrl(_) => "Please enter a valid GitHub repository or profile URL".to_string(),
            _ => format!("Error: {}", self),
        }
    }
}

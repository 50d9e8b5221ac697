//! Generative language API client
//!
//! The orchestrator only sees the [`TextGenerator`] trait; [`GeminiClient`]
//! is the production implementation talking to the Gemini REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::GeneratorSettings;
use crate::error::{GeneratorError, Result};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Prompt in, text out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt`; empty output is `GenerationEmpty`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Builds a client from the generator settings
    pub fn new(settings: &GeneratorSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| GeneratorError::Config("GEMINI_API_KEY not configured".into()))?;

        let method = format!("{}:generateContent", settings.model);
        let mut endpoint = Url::parse(&settings.api_base)
            .map_err(|e| GeneratorError::Config(format!("Invalid generator API base {}: {}", settings.api_base, e)))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| GeneratorError::Config(format!("Generator API base cannot be a base: {}", settings.api_base)))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting { category, threshold: "BLOCK_NONE" })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        info!("Requesting generation ({} prompt chars)", prompt.chars().count());

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(GeneratorError::Llm(format!("HTTP {}: {}", status, message)));
        }

        let response: GenerateResponse = response.json().await?;
        if let Some(reason) = response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            debug!("Prompt blocked: {}", reason);
            return Err(GeneratorError::GenerationEmpty);
        }

        let candidate = response.candidates.into_iter().next();
        if let Some(reason) = candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            debug!("Generation finished with reason {}", reason);
        }
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        let text = strip_enclosing_fence(&text);
        if text.trim().is_empty() {
            return Err(GeneratorError::GenerationEmpty);
        }
        Ok(text.to_string())
    }
}

/// Removes a ```` ```markdown ```` fence wrapped around the whole response
pub fn strip_enclosing_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return text;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    match inner.split_once('\n') {
        // The opening line may carry a language tag.
        Some((tag, body)) if !tag.contains(char::is_whitespace) && wraps_whole_body(tag, body) => {
            body.trim_end_matches('\n')
        }
        _ => text,
    }
}

/// A body with fences of its own usually means the response opens and closes
/// with two separate code blocks. A `markdown` wrapper may still nest blocks,
/// as long as the first inner fence opens one (carries a language tag).
fn wraps_whole_body(tag: &str, body: &str) -> bool {
    let first_inner_fence = body
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with("```"));
    match first_inner_fence {
        None => true,
        Some(fence) => {
            matches!(tag.to_lowercase().as_str(), "markdown" | "md") && !fence.trim_start_matches('`').trim().is_empty()
        }
    }
}

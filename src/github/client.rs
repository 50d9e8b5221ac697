use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{
    decode_permissive, EntryKind, RepoSummary, RepoTree, RepositoryInfo, RepositorySource,
    TreeEntry, UserInfo,
};
use crate::config::GitHubSettings;
use crate::error::{GeneratorError, Result};

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// GitHub REST client
///
/// One instance is built at process start and shared; cloning is cheap.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: Url,
    token: Option<String>,
}

/// README file as stored in a repository
#[derive(Debug, Clone)]
pub struct ReadmeFile {
    /// Path of the README inside the repository
    pub path: String,
    /// Blob sha, required to update the file
    pub sha: String,
    /// Decoded content
    pub content: String,
}

#[derive(Deserialize)]
struct RepoResponse {
    name: String,
    description: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    watchers_count: u64,
    default_branch: String,
}

#[derive(Deserialize)]
struct LicenseResponse {
    license: Option<LicenseInfo>,
}

#[derive(Deserialize)]
struct LicenseInfo {
    key: String,
}

#[derive(Deserialize)]
struct ContentFile {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct DirectoryItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    blog: Option<String>,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    public_repos: u64,
}

#[derive(Deserialize)]
struct UserRepoResponse {
    name: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    fork: bool,
}

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubClient {
    /// Builds a client from the GitHub settings
    pub fn new(settings: &GitHubSettings) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| GeneratorError::Config(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert("X-GitHub-Api-Version", header::HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()?;

        let api_base = Url::parse(&settings.api_base)
            .map_err(|e| GeneratorError::Config(format!("Invalid GitHub API base {}: {}", settings.api_base, e)))?;

        Ok(Self {
            client,
            api_base,
            token: settings.token.clone(),
        })
    }

    /// Whether requests are authenticated
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| GeneratorError::Config(format!("GitHub API base cannot be a base: {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url> {
        let segments = ["repos", owner, repo].into_iter().chain(rest.iter().copied());
        self.endpoint(segments)
    }

    fn contents_endpoint(&self, owner: &str, repo: &str, path: &str) -> Result<Url> {
        let segments = ["repos", owner, repo, "contents"]
            .into_iter()
            .chain(path.split('/').filter(|segment| !segment.is_empty()));
        self.endpoint(segments)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get(&self, url: Url, accept: &str) -> Result<Response> {
        debug!("GET {}", url);
        let request = self.client.get(url).header(header::ACCEPT, accept);
        Ok(self.authorize(request).send().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        let response = check_status(self.get(url, JSON_MEDIA_TYPE).await?, what).await?;
        Ok(response.json::<T>().await?)
    }

    /// README of the default branch with its path and sha
    pub async fn readme_file(&self, owner: &str, repo: &str) -> Result<Option<ReadmeFile>> {
        let url = self.repo_endpoint(owner, repo, &["readme"])?;
        match self.get_json::<ContentFile>(url, &format!("README of {}/{}", owner, repo)).await {
            Ok(file) => {
                let content = decode_base64_content(&file.content)?;
                Ok(Some(ReadmeFile {
                    path: file.path,
                    sha: file.sha,
                    content,
                }))
            }
            Err(GeneratorError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates or updates a file through the contents API
    pub async fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<()> {
        let url = self.contents_endpoint(owner, repo, path)?;
        let body = PutContentRequest {
            message,
            content: BASE64.encode(content.as_bytes()),
            branch,
            sha,
        };

        debug!("PUT {}", url);
        let request = self
            .client
            .put(url)
            .header(header::ACCEPT, JSON_MEDIA_TYPE)
            .json(&body);
        check_status(self.authorize(request).send().await?, &format!("commit of {} to {}/{}", path, owner, repo))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo> {
        let url = self.repo_endpoint(owner, repo, &[])?;
        let info: RepoResponse = self.get_json(url, &format!("repository {}/{}", owner, repo)).await?;
        Ok(RepositoryInfo {
            name: info.name,
            description: info.description,
            topics: info.topics,
            stars: info.stargazers_count,
            forks: info.forks_count,
            watchers: info.watchers_count,
            default_branch: info.default_branch,
        })
    }

    async fn languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
        let url = self.repo_endpoint(owner, repo, &["languages"])?;
        self.get_json(url, &format!("languages of {}/{}", owner, repo)).await
    }

    async fn license(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        let url = self.repo_endpoint(owner, repo, &["license"])?;
        match self.get_json::<LicenseResponse>(url, "license").await {
            Ok(response) => Ok(response.license.map(|license| license.key)),
            Err(GeneratorError::NotFound(_)) => {
                Err(GeneratorError::LicenseNotFound(format!("{}/{}", owner, repo)))
            }
            Err(e) => Err(e),
        }
    }

    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        Ok(self.readme_file(owner, repo).await?.map(|file| file.content))
    }

    async fn tree(&self, owner: &str, repo: &str, branch: &str) -> Result<RepoTree> {
        let mut url = self.repo_endpoint(owner, repo, &["git", "trees", branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let response: TreeResponse = self.get_json(url, &format!("tree of {}/{}@{}", owner, repo, branch)).await?;
        let entries = response
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                kind: match item.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    _ => EntryKind::Other,
                },
                path: item.path,
            })
            .collect();

        Ok(RepoTree {
            entries,
            truncated: response.truncated,
        })
    }

    async fn list_directory(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let mut url = self.contents_endpoint(owner, repo, path)?;
        url.query_pairs_mut().append_pair("ref", branch);

        let items: Vec<DirectoryItem> = self
            .get_json(url, &format!("directory /{} of {}/{}", path, owner, repo))
            .await?;
        Ok(items
            .into_iter()
            .map(|item| TreeEntry {
                kind: match item.kind.as_str() {
                    "file" => EntryKind::Blob,
                    "dir" => EntryKind::Tree,
                    _ => EntryKind::Other,
                },
                path: item.path,
            })
            .collect())
    }

    async fn file_content(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Result<Vec<u8>> {
        let mut url = self.contents_endpoint(owner, repo, path)?;
        url.query_pairs_mut().append_pair("ref", branch);

        let response = check_status(self.get(url, RAW_MEDIA_TYPE).await?, &format!("file {}", path)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn user(&self, login: &str) -> Result<UserInfo> {
        let url = self.endpoint(["users", login])?;
        let user: UserResponse = self.get_json(url, &format!("user {}", login)).await?;
        Ok(UserInfo {
            login: user.login,
            name: user.name,
            bio: user.bio,
            location: user.location,
            blog: user.blog.filter(|blog| !blog.is_empty()),
            followers: user.followers,
            public_repos: user.public_repos,
        })
    }

    async fn user_repositories(&self, login: &str, limit: usize) -> Result<Vec<RepoSummary>> {
        let mut url = self.endpoint(["users", login, "repos"])?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &limit.clamp(1, 100).to_string());

        let repos: Vec<UserRepoResponse> = self.get_json(url, &format!("repositories of {}", login)).await?;
        Ok(repos
            .into_iter()
            .take(limit)
            .map(|repo| RepoSummary {
                name: repo.name,
                description: repo.description,
                language: repo.language,
                stars: repo.stargazers_count,
                forks: repo.forks_count,
                topics: repo.topics,
                fork: repo.fork,
            })
            .collect())
    }
}

/// Maps a non-success response onto the error taxonomy
async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    Err(match status {
        StatusCode::NOT_FOUND => GeneratorError::NotFound(what.to_string()),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if message.to_lowercase().contains("rate limit") =>
        {
            GeneratorError::RateLimitExceeded(message)
        }
        _ => GeneratorError::GitHubApi(format!("{} failed: HTTP {}: {}", what, status, message)),
    })
}

/// Decodes the base64 `content` field of the contents API, which is wrapped
/// with newlines
fn decode_base64_content(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| GeneratorError::GitHubApi(format!("Invalid base64 content: {}", e)))?;
    Ok(decode_permissive(&bytes))
}

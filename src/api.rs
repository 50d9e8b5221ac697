//! Web interface
//!
//! HTML form endpoints re-render the form with a flash banner on failure;
//! JSON endpoints always answer with a `{success, message?, error?}` envelope.

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::app::AppContext;
use crate::error::{GeneratorError, Result};
use crate::github::{publish_readme, RepositoryReference};
use crate::orchestrator::GenerationRequest;
use crate::prompts::MAX_INSTRUCTION_CHARS;
use crate::store::GeneratedDocument;
use crate::templates::{self, Flash, FormValues};

/// Submitted generation form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateForm {
    /// Repository or profile URL
    #[serde(default)]
    pub url: String,
    /// Optional instructions
    #[serde(default)]
    pub instructions: Option<String>,
    /// Checkbox value, present when ticked
    #[serde(default)]
    pub profile: Option<String>,
}

impl GenerateForm {
    fn profile_mode(&self) -> bool {
        matches!(self.profile.as_deref(), Some("true" | "on" | "1"))
    }
}

/// Body of the save and push endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPayload {
    /// Source URL the document belongs to
    #[serde(default)]
    pub url: String,
    /// Markdown content
    #[serde(default)]
    pub content: String,
}

/// `?url=` query parameter
#[derive(Debug, Clone, Deserialize)]
pub struct UrlQuery {
    /// Source URL
    pub url: Option<String>,
}

/// JSON response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the operation succeeded
    pub success: bool,
    /// Informational message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Document payload for retrieval endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<GeneratedDocument>,
}

impl Envelope {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Builds the application router
pub fn router(context: AppContext) -> Router {
    let cors = cors_layer(&context.config.server.allowed_origins);
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate))
        .route("/about", get(about))
        .route("/edit", get(edit))
        .route("/edit/save", post(save_edit))
        .route("/push", post(push))
        .route("/api/documents", get(get_document))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(context)
}

/// Cross-origin access is limited to the configured origins; none by default
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Binds `addr` and serves the router until Ctrl-C
pub async fn serve(context: AppContext, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Stored documents are keyed by canonical URL; anything unparseable is used as given
fn document_key(url: &str) -> String {
    RepositoryReference::parse(url)
        .map(|reference| reference.canonical_url())
        .unwrap_or_else(|_| url.trim().to_string())
}

fn status_for(error: &GeneratorError) -> StatusCode {
    match error.root() {
        GeneratorError::InvalidUrl(_) | GeneratorError::Validation(_) => StatusCode::BAD_REQUEST,
        GeneratorError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn recent_documents(context: &AppContext) -> Vec<GeneratedDocument> {
    match context.store.recent(context.config.server.recent_limit).await {
        Ok(documents) => documents,
        Err(e) => {
            error!("Could not load recent documents: {}", e);
            Vec::new()
        }
    }
}

async fn form_page(
    context: &AppContext,
    status: StatusCode,
    form: &GenerateForm,
    flash: Option<Flash>,
) -> Response {
    let recent = recent_documents(context).await;
    let values = FormValues {
        url: &form.url,
        instructions: form.instructions.as_deref().unwrap_or_default(),
        profile: form.profile_mode(),
    };
    (status, Html(templates::home_page(&values, flash.as_ref(), &recent))).into_response()
}

async fn index(State(context): State<AppContext>) -> Response {
    form_page(&context, StatusCode::OK, &GenerateForm::default(), None).await
}

async fn about() -> Html<String> {
    Html(templates::about_page())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn generate(State(context): State<AppContext>, Form(form): Form<GenerateForm>) -> Response {
    let reference = match RepositoryReference::parse_with_mode(&form.url, form.profile_mode()) {
        Ok(reference) => reference,
        Err(e) => {
            let flash = match &e {
                GeneratorError::InvalidUrl(detail) if detail.contains("profile mode") => Flash::error(detail.clone()),
                _ => Flash::error(e.user_message()),
            };
            return form_page(&context, StatusCode::BAD_REQUEST, &form, Some(flash)).await;
        }
    };

    let instructions = form.instructions.as_deref();
    if instructions.map(|text| text.chars().count()).unwrap_or(0) > MAX_INSTRUCTION_CHARS {
        let flash = Flash::error(format!("Instructions must be at most {} characters", MAX_INSTRUCTION_CHARS));
        return form_page(&context, StatusCode::BAD_REQUEST, &form, Some(flash)).await;
    }

    let request = GenerationRequest::new(reference).with_instructions(instructions);
    let outcome = match context.readmes.generate(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Generation for {} failed: {}", request.reference, e);
            let flash = if e.is_license_not_found() {
                Flash::warning(format!("Could not retrieve license information: {}", e))
            } else {
                Flash::error(e.user_message())
            };
            return form_page(&context, status_for(&e), &form, Some(flash)).await;
        }
    };

    let source_url = request.reference.canonical_url();
    let flash = match context
        .store
        .upsert(&source_url, &outcome.content, request.instructions.as_deref())
        .await
    {
        Ok(_) => None,
        Err(e) => {
            error!("Could not store README for {}: {}", source_url, e);
            Some(Flash::warning(format!("The README was generated but could not be saved: {}", e)))
        }
    };

    info!("Rendered README for {} (cached: {})", source_url, outcome.from_cache);
    Html(templates::result_page(&source_url, &outcome.content, flash.as_ref())).into_response()
}

async fn edit(State(context): State<AppContext>, Query(query): Query<UrlQuery>) -> Response {
    let Some(url) = query.url.filter(|url| !url.trim().is_empty()) else {
        let flash = Flash::error("No document URL given");
        return form_page(&context, StatusCode::BAD_REQUEST, &GenerateForm::default(), Some(flash)).await;
    };

    match context.store.get(&document_key(&url)).await {
        Ok(Some(document)) => Html(templates::edit_page(&document)).into_response(),
        Ok(None) => {
            let form = GenerateForm { url, ..GenerateForm::default() };
            let flash = Flash::error("No README has been generated for this URL yet");
            form_page(&context, StatusCode::NOT_FOUND, &form, Some(flash)).await
        }
        Err(e) => {
            error!("Could not load document {}: {}", url, e);
            let flash = Flash::error(e.user_message());
            form_page(&context, StatusCode::INTERNAL_SERVER_ERROR, &GenerateForm::default(), Some(flash)).await
        }
    }
}

async fn save_edit(State(context): State<AppContext>, Json(payload): Json<DocumentPayload>) -> (StatusCode, Json<Envelope>) {
    if payload.url.trim().is_empty() || payload.content.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Envelope::failure("Both url and content are required")));
    }

    match context.store.save_edit(&document_key(&payload.url), &payload.content).await {
        Ok(document) => {
            info!("Saved edit of {}", document.source_url);
            (StatusCode::OK, Json(Envelope::ok("README saved")))
        }
        Err(e) => {
            if !e.is_not_found() {
                error!("Could not save edit of {}: {}", payload.url, e);
            }
            (status_for(&e), Json(Envelope::failure(e.to_string())))
        }
    }
}

async fn push(State(context): State<AppContext>, Json(payload): Json<DocumentPayload>) -> (StatusCode, Json<Envelope>) {
    if payload.url.trim().is_empty() || payload.content.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Envelope::failure("Both url and content are required")));
    }

    let outcome = publish_readme(&context.github, &payload.url, &payload.content).await;
    if outcome.success {
        (StatusCode::OK, Json(Envelope::ok(outcome.message)))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(Envelope::failure(outcome.message)))
    }
}

async fn get_document(State(context): State<AppContext>, Query(query): Query<UrlQuery>) -> (StatusCode, Json<Envelope>) {
    let Some(url) = query.url.filter(|url| !url.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(Envelope::failure("Missing url parameter")));
    };

    match context.store.get(&document_key(&url)).await {
        Ok(Some(document)) => (
            StatusCode::OK,
            Json(Envelope {
                success: true,
                document: Some(document),
                ..Envelope::default()
            }),
        ),
        Ok(None) => (StatusCode::NOT_FOUND, Json(Envelope::failure(format!("No document stored for {}", url)))),
        Err(e) => {
            error!("Could not load document {}: {}", url, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Envelope::failure(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::github::GitHubClient;
    use crate::gemini::MockTextGenerator;
    use crate::github::fixtures::sample_source;
    use crate::store::DocumentStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const README: &str = "# repo\n\nA tiny Flask service that answers HTTP requests and renders a page.\n";

    fn replying(text: &'static str) -> MockTextGenerator {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(move |_| Ok(text.to_string()));
        generator
    }

    async fn context_from(config: Config, generator: MockTextGenerator) -> AppContext {
        let github = GitHubClient::new(&config.github).unwrap();
        let store = DocumentStore::in_memory().await.unwrap();
        AppContext::from_parts(config, github, Arc::new(sample_source()), Arc::new(generator), store)
    }

    async fn context_with(generator: MockTextGenerator) -> AppContext {
        context_from(Config::default(), generator).await
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::options("/push")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    async fn send(context: &AppContext, request: Request<Body>) -> (StatusCode, String) {
        let response = router(context.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn form(body: &str) -> Request<Body> {
        Request::post("/generate")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_post(path: &str, value: Value) -> Request<Body> {
        Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let context = context_with(replying(README)).await;
        let (status, body) = send(&context, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_generate_renders_and_stores() {
        let context = context_with(replying(README)).await;
        let (status, body) = send(&context, form("url=https%3A%2F%2Fgithub.com%2Focto%2Frepo&instructions=")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>repo</h1>"));
        assert!(body.contains("# repo"));
        let stored = context.store.get("https://github.com/octo/repo").await.unwrap().unwrap();
        assert_eq!(stored.content, README);
    }

    #[tokio::test]
    async fn test_invalid_url_rerenders_form() {
        let context = context_with(replying(README)).await;
        let (status, body) = send(&context, form("url=https%3A%2F%2Fgitlab.com%2Focto%2Frepo")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("flash error"));
        assert!(body.contains("valid GitHub"));
        assert!(body.contains("value=\"https://gitlab.com/octo/repo\""));
    }

    #[tokio::test]
    async fn test_profile_flag_requires_profile_url() {
        let context = context_with(replying(README)).await;
        let (status, body) = send(&context, form("url=https%3A%2F%2Fgithub.com%2Focto%2Frepo&profile=true")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("profile mode"));
    }

    #[tokio::test]
    async fn test_empty_generation_stores_nothing() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(GeneratorError::GenerationEmpty));
        let context = context_with(generator).await;
        let (status, body) = send(&context, form("url=https%3A%2F%2Fgithub.com%2Focto%2Frepo")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("did not return any content"));
        assert_eq!(context.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_edit_envelopes() {
        let context = context_with(replying(README)).await;
        let payload = json!({"url": "https://github.com/octo/repo", "content": "# Edited\n"});

        let (status, body) = send(&context, json_post("/edit/save", payload.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["success"], json!(false));
        assert!(envelope["error"].is_string());

        context.store.upsert("https://github.com/octo/repo", README, None).await.unwrap();
        let (status, body) = send(&context, json_post("/edit/save", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["success"], json!(true));
        assert_eq!(
            context.store.get("https://github.com/octo/repo").await.unwrap().unwrap().content,
            "# Edited\n"
        );
    }

    #[tokio::test]
    async fn test_document_lookup_uses_canonical_url() {
        let context = context_with(replying(README)).await;
        context.store.upsert("https://github.com/octo/repo", README, None).await.unwrap();

        let request = Request::get("/api/documents?url=https%3A%2F%2Fgithub.com%2Focto%2Frepo.git%2F")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&context, request).await;

        assert_eq!(status, StatusCode::OK);
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["document"]["content"], json!(README));
    }

    #[tokio::test]
    async fn test_edit_page_for_unknown_document_is_not_found() {
        let context = context_with(replying(README)).await;
        let request = Request::get("/edit?url=https%3A%2F%2Fgithub.com%2Focto%2Fother")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&context, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("No README has been generated"));
    }

    #[tokio::test]
    async fn test_push_without_token_reports_failure() {
        let context = context_with(replying(README)).await;
        let payload = json!({"url": "https://github.com/octo/repo", "content": "# New\n"});
        let (status, body) = send(&context, json_post("/push", payload)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["success"], json!(false));
        assert!(envelope["error"].as_str().unwrap().contains("token"));
    }

    #[tokio::test]
    async fn test_generated_markup_is_not_executed() {
        let context = context_with(replying(
            "# repo\n\n<script>fetch('/push', {method: 'POST'})</script>\n\nA tiny Flask service that answers HTTP requests.\n",
        ))
        .await;
        let (status, body) = send(&context, form("url=https%3A%2F%2Fgithub.com%2Focto%2Frepo")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("<script>fetch"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_cross_origin_requests_are_refused_by_default() {
        let context = context_with(MockTextGenerator::new()).await;
        let response = router(context).oneshot(preflight("https://evil.example")).await.unwrap();

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_configured_origin_is_allowed() {
        let mut config = Config::default();
        config.server.allowed_origins = vec!["https://docs.example.com".to_string()];
        let context = context_from(config, MockTextGenerator::new()).await;

        let response = router(context.clone()).oneshot(preflight("https://docs.example.com")).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://docs.example.com"
        );

        let response = router(context).oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_url_case_does_not_split_documents() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok(README.to_string()));
        let context = context_with(generator).await;

        let (status, _) = send(&context, form("url=https%3A%2F%2Fgithub.com%2Focto%2Frepo")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&context, form("url=https%3A%2F%2Fgithub.com%2FOcto%2FRepo")).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(context.store.count().await.unwrap(), 1);
        assert!(context.store.get("https://github.com/octo/repo").await.unwrap().is_some());
    }
}

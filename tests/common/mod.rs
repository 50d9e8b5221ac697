use std::path::PathBuf;
use std::sync::Arc;

use mockito::{Matcher, Mock, Server, ServerGuard};
use readmegen::{AppContext, Config, DocumentStore, GeminiClient, GitHubClient};

pub mod test_helpers {
    use super::*;

    pub const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    pub fn get_test_data_path(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data").join(file)
    }

    pub fn read_test_json(file: &str) -> String {
        std::fs::read_to_string(get_test_data_path(file)).expect("Failed to read test data")
    }

    /// Config pointing both collaborators at mock servers
    pub fn create_test_config(github: &ServerGuard, gemini: &ServerGuard) -> Config {
        let mut config = Config::default();
        config.github.api_base = github.url();
        config.github.token = Some("test-token".to_string());
        config.generator.api_base = gemini.url();
        config.generator.api_key = Some("test-key".to_string());
        config
    }

    /// Production collaborators wired to mock servers and an in-memory store
    pub async fn create_test_context(config: Config) -> AppContext {
        let github = GitHubClient::new(&config.github).unwrap();
        let generator = GeminiClient::new(&config.generator).unwrap();
        let store = DocumentStore::in_memory().await.unwrap();
        AppContext::from_parts(config, github.clone(), Arc::new(github), Arc::new(generator), store)
    }

    pub fn setup_test_logger() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("readmegen=debug")
            .with_test_writer()
            .try_init();
    }

    pub async fn setup_test_servers() -> (ServerGuard, ServerGuard) {
        (Server::new_async().await, Server::new_async().await)
    }

    /// Mocks every GitHub endpoint the pipeline reads for `octo/repo`
    ///
    /// The repository has no license and no README.
    pub async fn mock_repository(server: &mut ServerGuard) -> Vec<Mock> {
        let mut mocks = Vec::new();
        mocks.push(
            server
                .mock("GET", "/repos/octo/repo")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(read_test_json("repository.json"))
                .create_async()
                .await,
        );
        mocks.push(
            server
                .mock("GET", "/repos/octo/repo/languages")
                .with_status(200)
                .with_body(r#"{"Python": 4200, "HTML": 800}"#)
                .create_async()
                .await,
        );
        for missing in ["/repos/octo/repo/license", "/repos/octo/repo/readme"] {
            mocks.push(
                server
                    .mock("GET", missing)
                    .with_status(404)
                    .with_body(r#"{"message": "Not Found"}"#)
                    .create_async()
                    .await,
            );
        }
        mocks.push(
            server
                .mock("GET", "/repos/octo/repo/git/trees/main")
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(read_test_json("tree.json"))
                .create_async()
                .await,
        );
        for (path, body) in [
            ("README.md", "# repo\n"),
            ("app/main.py", "from flask import Flask\napp = Flask(__name__)\n"),
            ("requirements.txt", "flask==3.0\n"),
        ] {
            mocks.push(
                server
                    .mock("GET", format!("/repos/octo/repo/contents/{}", path).as_str())
                    .match_query(Matcher::Any)
                    .with_status(200)
                    .with_body(body)
                    .create_async()
                    .await,
            );
        }
        mocks
    }
}

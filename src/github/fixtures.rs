//! Sample project and mock setups shared by unit tests
//!
//! Each `expect_*` helper adds open-ended expectations. Expectations added
//! before them win, so a test scripts its failures first and lets the sample
//! answer everything else.

use std::collections::HashMap;

use super::{EntryKind, MockRepositorySource, RepoSummary, RepoTree, RepositoryInfo, TreeEntry, UserInfo};
use crate::error::GeneratorError;

/// The sample repository `octo/repo`
pub fn repository_info() -> RepositoryInfo {
    RepositoryInfo {
        name: "repo".into(),
        description: Some("A tiny Flask service".into()),
        topics: vec!["flask".into(), "demo".into()],
        stars: 12,
        forks: 3,
        watchers: 12,
        default_branch: "main".into(),
    }
}

/// Listing of the sample repository
pub fn sample_tree() -> Vec<TreeEntry> {
    vec![
        TreeEntry::blob("README.md"),
        TreeEntry::blob("requirements.txt"),
        TreeEntry::tree("app"),
        TreeEntry::blob("app/main.py"),
        TreeEntry::blob("app/logo.png"),
    ]
}

fn sample_files() -> HashMap<String, Vec<u8>> {
    HashMap::from([
        ("requirements.txt".to_string(), b"flask==3.0\n".to_vec()),
        ("app/main.py".to_string(), b"from flask import Flask\napp = Flask(__name__)\n".to_vec()),
    ])
}

/// Profile of `octo`
pub fn user_info() -> UserInfo {
    UserInfo {
        login: "octo".into(),
        name: Some("Octo Cat".into()),
        bio: Some("Builds small tools".into()),
        followers: 42,
        public_repos: 2,
        ..UserInfo::default()
    }
}

/// Repositories of `octo`, one of them a fork
pub fn user_repositories() -> Vec<RepoSummary> {
    vec![
        RepoSummary {
            name: "repo".into(),
            description: Some("A tiny Flask service".into()),
            language: Some("Python".into()),
            stars: 12,
            forks: 3,
            topics: vec!["flask".into()],
            fork: false,
        },
        RepoSummary {
            name: "forked-lib".into(),
            language: Some("C".into()),
            fork: true,
            ..RepoSummary::default()
        },
    ]
}

/// A mock answering every call with the sample project
pub fn sample_source() -> MockRepositorySource {
    let mut source = MockRepositorySource::new();
    expect_sample(&mut source);
    source
}

/// Adds sample answers for every operation
pub fn expect_sample(source: &mut MockRepositorySource) {
    expect_repository(source);
    expect_repository_details(source);
    expect_profile(source);
}

/// Repository endpoint
pub fn expect_repository(source: &mut MockRepositorySource) {
    source.expect_repository().returning(|_, _| Ok(repository_info()));
}

/// Everything a repository fetch reads after the repository endpoint
pub fn expect_repository_details(source: &mut MockRepositorySource) {
    expect_languages(source);
    expect_license(source, Some("mit"));
    expect_readme(source, Some("# repo\n\nOld readme."));
    expect_listing(source, sample_tree(), false);
}

/// Languages endpoint
pub fn expect_languages(source: &mut MockRepositorySource) {
    source
        .expect_languages()
        .returning(|_, _| Ok(HashMap::from([("Python".to_string(), 4200), ("HTML".to_string(), 800)])));
}

/// License endpoint
pub fn expect_license(source: &mut MockRepositorySource, key: Option<&str>) {
    let key = key.map(str::to_string);
    source.expect_license().returning(move |_, _| Ok(key.clone()));
}

/// README endpoint
pub fn expect_readme(source: &mut MockRepositorySource, readme: Option<&str>) {
    let readme = readme.map(str::to_string);
    source.expect_readme().returning(move |_, _| Ok(readme.clone()));
}

/// Tree, directory and file endpoints serving `entries`
///
/// Directory listings are derived from the entries; unknown files get a
/// one-line body.
pub fn expect_listing(source: &mut MockRepositorySource, entries: Vec<TreeEntry>, truncated: bool) {
    let tree = entries.clone();
    source
        .expect_tree()
        .returning(move |_, _, _| Ok(RepoTree { entries: tree.clone(), truncated }));
    expect_directories(source, entries);
    expect_files(source);
}

/// Directory endpoint serving `entries`
pub fn expect_directories(source: &mut MockRepositorySource, entries: Vec<TreeEntry>) {
    source.expect_list_directory().returning(move |_, _, path, _| {
        let children: Vec<TreeEntry> = entries
            .iter()
            .filter(|entry| parent_of(&entry.path) == path)
            .cloned()
            .collect();
        let known = path.is_empty()
            || entries
                .iter()
                .any(|entry| entry.path == path && entry.kind == EntryKind::Tree);
        if known {
            Ok(children)
        } else {
            Err(GeneratorError::NotFound(format!("directory {}", path)))
        }
    });
}

/// File endpoint
pub fn expect_files(source: &mut MockRepositorySource) {
    let files = sample_files();
    source.expect_file_content().returning(move |_, _, path, _| {
        Ok(files
            .get(path)
            .cloned()
            .unwrap_or_else(|| format!("# {}\n", path).into_bytes()))
    });
}

/// User and user repository endpoints
pub fn expect_profile(source: &mut MockRepositorySource) {
    source.expect_user().returning(|_| Ok(user_info()));
    source
        .expect_user_repositories()
        .returning(|_, limit| Ok(user_repositories().into_iter().take(limit).collect()));
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

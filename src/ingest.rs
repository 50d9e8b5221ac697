//! Repository ingestion
//!
//! Walks a repository's file listing and collects short previews of the files
//! most likely to explain what the project is: sources, manifests, build
//! files. The walk is capped at `max_files` accepted previews and never fails
//! the caller; problems end up as notes embedded in the rendered summary.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::IngestionSettings;
use crate::github::{decode_permissive, EntryKind, RepositoryReference, RepositorySource, TreeEntry};

/// A truncated view of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreview {
    /// Path relative to the repository root
    pub path: String,
    /// At most `max_chars_per_file` characters of the file
    pub content: String,
    /// File extension without the dot, empty when there is none
    pub extension: String,
}

/// Result of an ingestion walk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionSummary {
    /// Parent directories of every file seen
    pub folders: BTreeSet<String>,
    /// Previews in traversal order
    pub previews: Vec<FilePreview>,
    /// Problems hit during the walk
    pub notes: Vec<String>,
}

impl IngestionSummary {
    /// Renders the folder list followed by the file previews
    pub fn render(&self) -> String {
        let mut out = String::from("Folder structure:\n");
        if self.folders.is_empty() {
            out.push_str("- (repository root only)\n");
        }
        for folder in &self.folders {
            let _ = writeln!(out, "- {}/", folder);
        }

        out.push_str("\nFile previews:\n");
        if self.previews.is_empty() {
            out.push_str("(no matching files)\n");
        }
        for preview in &self.previews {
            if preview.extension.is_empty() {
                let _ = writeln!(out, "\n--- {} ---", preview.path);
            } else {
                let _ = writeln!(out, "\n--- {} ({}) ---", preview.path, preview.extension);
            }
            out.push_str(&preview.content);
            if !preview.content.ends_with('\n') {
                out.push('\n');
            }
        }

        for note in &self.notes {
            let _ = write!(out, "\n[ingestion note: {}]\n", note);
        }
        out
    }
}

/// File names and extensions worth previewing
#[derive(Debug, Clone)]
pub struct Allowlist {
    entries: HashSet<String>,
}

impl Allowlist {
    /// Builds an allowlist; entries match either an extension or a whole file name
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| entry.as_ref().trim_start_matches("*.").to_lowercase())
                .collect(),
        }
    }

    /// Whether the file at `path` is allowlisted
    pub fn matches(&self, path: &str) -> bool {
        let name = file_name(path).to_lowercase();
        let extension = extension(&name);
        self.entries.contains(&name) || (!extension.is_empty() && self.entries.contains(extension))
    }
}

/// Collects previews from a repository, never failing
pub async fn summarize(
    source: &dyn RepositorySource,
    reference: &RepositoryReference,
    branch: &str,
    settings: &IngestionSettings,
) -> IngestionSummary {
    let mut walk = Walk {
        source,
        owner: &reference.owner,
        repo: &reference.name,
        branch,
        allowlist: Allowlist::new(&settings.allowlist),
        max_files: settings.max_files,
        max_chars: settings.max_chars_per_file,
        summary: IngestionSummary::default(),
    };

    match source.tree(&reference.owner, &reference.name, branch).await {
        Ok(tree) if !tree.truncated => {
            for entry in &tree.entries {
                if walk.is_full() {
                    break;
                }
                walk.visit(entry).await;
            }
        }
        Ok(_) => {
            debug!("Tree listing of {} is truncated, walking directories instead", reference);
            walk.walk_directories().await;
        }
        Err(e) => {
            warn!("Could not read tree of {}: {}; walking directories instead", reference, e);
            walk.walk_directories().await;
        }
    }

    info!(
        "Ingested {}: {} previews, {} folders, {} notes",
        reference,
        walk.summary.previews.len(),
        walk.summary.folders.len(),
        walk.summary.notes.len()
    );
    walk.summary
}

struct Walk<'a> {
    source: &'a dyn RepositorySource,
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
    allowlist: Allowlist,
    max_files: usize,
    max_chars: usize,
    summary: IngestionSummary,
}

impl Walk<'_> {
    fn is_full(&self) -> bool {
        self.summary.previews.len() >= self.max_files
    }

    /// Breadth-first walk through the directory listing API
    async fn walk_directories(&mut self) {
        let mut queue = VecDeque::from([String::new()]);

        while let Some(dir) = queue.pop_front() {
            if self.is_full() {
                break;
            }
            let entries = match self.source.list_directory(self.owner, self.repo, &dir, self.branch).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Directory walk of {}/{} stopped at /{}: {}", self.owner, self.repo, dir, e);
                    self.summary
                        .notes
                        .push(format!("traversal stopped at /{} after {} files: {}", dir, self.summary.previews.len(), e));
                    break;
                }
            };

            for entry in &entries {
                if self.is_full() {
                    break;
                }
                match entry.kind {
                    EntryKind::Tree => queue.push_back(entry.path.clone()),
                    _ => self.visit(entry).await,
                }
            }
        }
    }

    async fn visit(&mut self, entry: &TreeEntry) {
        if entry.kind != EntryKind::Blob {
            return;
        }
        if let Some((folder, _)) = entry.path.rsplit_once('/') {
            self.summary.folders.insert(folder.to_string());
        }
        if self.is_full() || !self.allowlist.matches(&entry.path) {
            return;
        }

        match self.source.file_content(self.owner, self.repo, &entry.path, self.branch).await {
            Ok(bytes) => {
                let content: String = decode_permissive(&bytes).chars().take(self.max_chars).collect();
                self.summary.previews.push(FilePreview {
                    extension: extension(file_name(&entry.path)).to_string(),
                    path: entry.path.clone(),
                    content,
                });
            }
            Err(e) => debug!("Skipping {}: {}", entry.path, e),
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(index) => &name[index + 1..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::github::{fixtures, MockRepositorySource, RepoTree};
    use pretty_assertions::assert_eq;

    fn settings(max_files: usize, max_chars: usize) -> IngestionSettings {
        IngestionSettings {
            max_files,
            max_chars_per_file: max_chars,
            ..IngestionSettings::default()
        }
    }

    fn reference() -> RepositoryReference {
        RepositoryReference::repository("octo", "repo")
    }

    fn source_listing(entries: Vec<TreeEntry>) -> MockRepositorySource {
        let mut source = MockRepositorySource::new();
        fixtures::expect_listing(&mut source, entries, false);
        source
    }

    fn broken_tree() -> GeneratorError {
        GeneratorError::GitHubApi("HTTP 502".into())
    }

    #[test]
    fn test_allowlist_matches_extensions_and_names() {
        let allowlist = Allowlist::new(&IngestionSettings::default().allowlist);

        assert!(allowlist.matches("src/app.py"));
        assert!(allowlist.matches("web/index.HTML"));
        assert!(allowlist.matches("Dockerfile"));
        assert!(allowlist.matches("deploy/makefile"));
        assert!(allowlist.matches(".env.example"));
        assert!(allowlist.matches("requirements.txt"));
        assert!(!allowlist.matches("src/main.rs"));
        assert!(!allowlist.matches("assets/logo.png"));
        assert!(!allowlist.matches(".gitignore"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("app.py"), "py");
        assert_eq!(extension("archive.tar.gz"), "gz");
        assert_eq!(extension("Dockerfile"), "");
        assert_eq!(extension(".gitignore"), "");
    }

    #[tokio::test]
    async fn test_never_exceeds_max_files() {
        let entries: Vec<TreeEntry> = (0..40).map(|i| TreeEntry::blob(format!("pkg/mod_{i}.py"))).collect();
        let mut source = MockRepositorySource::new();
        source
            .expect_tree()
            .returning(move |_, _, _| Ok(RepoTree { entries: entries.clone(), truncated: false }));
        // Traversal halts once the cap is reached.
        source
            .expect_file_content()
            .times(25)
            .returning(|_, _, path, _| Ok(format!("# {}\n", path).into_bytes()));

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        assert_eq!(summary.previews.len(), 25);
        assert_eq!(summary.previews[0].path, "pkg/mod_0.py");
        assert_eq!(summary.previews[24].path, "pkg/mod_24.py");
    }

    #[tokio::test]
    async fn test_truncates_to_char_limit() {
        let mut source = MockRepositorySource::new();
        source
            .expect_file_content()
            .returning(|_, _, _, _| Ok("é".repeat(3000).into_bytes()));
        fixtures::expect_listing(&mut source, vec![TreeEntry::blob("notes.md")], false);

        let summary = summarize(&source, &reference(), "main", &settings(25, 1000)).await;
        assert_eq!(summary.previews[0].content.chars().count(), 1000);
        assert_eq!(summary.previews[0].extension, "md");
    }

    #[tokio::test]
    async fn test_file_errors_are_skipped() {
        let mut source = MockRepositorySource::new();
        source
            .expect_file_content()
            .withf(|_, _, path, _| path == "b.py")
            .returning(|_, _, _, _| Err(GeneratorError::GitHubApi("HTTP 500".into())));
        fixtures::expect_listing(
            &mut source,
            vec![TreeEntry::blob("a.py"), TreeEntry::blob("b.py"), TreeEntry::blob("c.py")],
            false,
        );

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        let paths: Vec<&str> = summary.previews.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "c.py"]);
        assert!(summary.notes.is_empty());
    }

    #[tokio::test]
    async fn test_folders_come_from_all_blobs_and_render_sorted() {
        let source = source_listing(vec![
            TreeEntry::tree("src"),
            TreeEntry::blob("src/z/app.py"),
            TreeEntry::blob("docs/logo.png"),
            TreeEntry::blob("README.md"),
        ]);

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        assert_eq!(
            summary.folders.iter().cloned().collect::<Vec<_>>(),
            vec!["docs".to_string(), "src/z".to_string()]
        );

        let rendered = summary.render();
        let docs = rendered.find("- docs/").unwrap();
        let src = rendered.find("- src/z/").unwrap();
        assert!(docs < src);
        assert!(rendered.contains("--- src/z/app.py (py) ---"));
    }

    #[tokio::test]
    async fn test_truncated_tree_falls_back_to_directory_walk() {
        let entries = vec![TreeEntry::tree("src"), TreeEntry::blob("setup.py"), TreeEntry::blob("src/app.py")];
        let mut source = MockRepositorySource::new();
        source
            .expect_list_directory()
            .withf(|_, _, path, _| path.is_empty())
            .times(1)
            .returning(|_, _, _, _| Ok(vec![TreeEntry::tree("src"), TreeEntry::blob("setup.py")]));
        source
            .expect_list_directory()
            .withf(|_, _, path, _| path == "src")
            .times(1)
            .returning(|_, _, _, _| Ok(vec![TreeEntry::blob("src/app.py")]));
        fixtures::expect_listing(&mut source, entries, true);

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        let paths: Vec<&str> = summary.previews.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["setup.py", "src/app.py"]);
    }

    #[tokio::test]
    async fn test_walk_failure_midway_keeps_collected_previews() {
        let mut entries: Vec<TreeEntry> = (0..10).map(|i| TreeEntry::blob(format!("f{i}.py"))).collect();
        entries.push(TreeEntry::tree("lib"));
        entries.extend((0..30).map(|i| TreeEntry::blob(format!("lib/g{i}.py"))));
        let mut source = MockRepositorySource::new();
        source.expect_tree().returning(|_, _, _| Err(broken_tree()));
        source
            .expect_list_directory()
            .withf(|_, _, path, _| path == "lib")
            .returning(|_, _, _, _| Err(broken_tree()));
        fixtures::expect_directories(&mut source, entries);
        fixtures::expect_files(&mut source);

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        assert_eq!(summary.previews.len(), 10);
        assert_eq!(summary.notes.len(), 1);
        assert!(summary.render().contains("[ingestion note: traversal stopped at /lib after 10 files"));
    }

    #[tokio::test]
    async fn test_total_failure_yields_empty_summary_with_note() {
        let mut source = MockRepositorySource::new();
        source
            .expect_tree()
            .returning(|_, _, _| Err(GeneratorError::GitHubApi("Git Repository is empty".into())));
        source
            .expect_list_directory()
            .returning(|_, _, _, _| Err(GeneratorError::NotFound("contents".into())));

        let summary = summarize(&source, &reference(), "main", &settings(25, 1500)).await;
        assert!(summary.previews.is_empty());
        let rendered = summary.render();
        assert!(rendered.contains("(no matching files)"));
        assert!(rendered.contains("[ingestion note:"));
    }
}

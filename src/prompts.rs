//! Prompt assembly
//!
//! Pure functions from fetched data to the instruction text sent to the
//! generator. Section lists come from [`PromptSettings`] so wording policy
//! lives in configuration rather than in code.

use std::fmt::Write as _;

use crate::config::PromptSettings;
use crate::github::{ProfileMetadata, RepositoryMetadata};
use crate::ingest::IngestionSummary;

/// Label used when a repository has no license
pub const LICENSE_NOT_SPECIFIED: &str = "not specified";

/// Longest user instruction text accepted, in characters
pub const MAX_INSTRUCTION_CHARS: usize = 2000;

const USER_BLOCK_START: &str = "<<<USER INSTRUCTIONS>>>";
const USER_BLOCK_END: &str = "<<<END USER INSTRUCTIONS>>>";

/// Builds generator prompts according to the configured section policy
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    settings: PromptSettings,
}

impl PromptBuilder {
    /// Creates a builder for the given section policy
    pub fn new(settings: PromptSettings) -> Self {
        Self { settings }
    }

    /// Prompt for a repository README
    pub fn repository(
        &self,
        metadata: &RepositoryMetadata,
        summary: &IngestionSummary,
        instructions: Option<&str>,
    ) -> String {
        let mut prompt = String::new();
        let languages = metadata.languages_by_size();

        prompt.push_str(
            "You are writing the README.md of a GitHub repository. Base every statement on the \
             details and file previews below; do not invent features that are not supported by them.\n\n",
        );

        prompt.push_str("## Repository details\n");
        let _ = writeln!(prompt, "- Repository name: {}", metadata.name);
        let _ = writeln!(prompt, "- Description: {}", metadata.description);
        let _ = writeln!(prompt, "- Languages: {}", join_or(&languages, "not reported"));
        let _ = writeln!(prompt, "- Topics: {}", join_or(&metadata.topics, "none"));
        let _ = writeln!(
            prompt,
            "- License: {}",
            metadata.license.as_deref().unwrap_or(LICENSE_NOT_SPECIFIED)
        );
        let _ = writeln!(prompt, "- Stars: {}", metadata.stars);
        let _ = writeln!(prompt, "- Forks: {}", metadata.forks);
        let _ = writeln!(prompt, "- Watchers: {}", metadata.watchers);
        let _ = writeln!(prompt, "- Default branch: {}", metadata.default_branch);

        prompt.push_str("\n## Current README\n");
        if metadata.existing_readme.trim().is_empty() {
            prompt.push_str("(none)\n");
        } else {
            prompt.push_str(&metadata.existing_readme);
            prompt.push('\n');
        }

        prompt.push_str("\n## Repository contents\n");
        prompt.push_str(&summary.render());

        self.push_section_policy(&mut prompt, &self.settings.required_sections);
        push_user_block(&mut prompt, instructions);
        prompt
    }

    /// Prompt for a profile README spanning the user's repositories
    pub fn profile(&self, profile: &ProfileMetadata, instructions: Option<&str>) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "You are writing the profile README.md shown on a GitHub user's page. Base every statement \
             on the profile and repository details below.\n\n",
        );

        prompt.push_str("## Profile details\n");
        let _ = writeln!(prompt, "- Login: {}", profile.login);
        let _ = writeln!(prompt, "- Name: {}", profile.name.as_deref().unwrap_or(&profile.login));
        let _ = writeln!(prompt, "- Bio: {}", profile.bio.as_deref().unwrap_or("none"));
        let _ = writeln!(prompt, "- Location: {}", profile.location.as_deref().unwrap_or("not specified"));
        let _ = writeln!(prompt, "- Website: {}", profile.blog.as_deref().unwrap_or("none"));
        let _ = writeln!(prompt, "- Followers: {}", profile.followers);
        let _ = writeln!(prompt, "- Public repositories: {}", profile.public_repos);

        prompt.push_str("\n## Repositories\n");
        if profile.repositories.is_empty() {
            prompt.push_str("(no public repositories)\n");
        }
        for repo in &profile.repositories {
            let _ = writeln!(
                prompt,
                "- {} | {} | language: {} | stars: {} | forks: {} | topics: {}",
                repo.name,
                repo.description.as_deref().unwrap_or("no description"),
                repo.language.as_deref().unwrap_or("unknown"),
                repo.stars,
                repo.forks,
                join_or(&repo.topics, "none"),
            );
        }

        prompt.push_str("\n## Current profile README\n");
        if profile.existing_readme.trim().is_empty() {
            prompt.push_str("(none)\n");
        } else {
            prompt.push_str(&profile.existing_readme);
            prompt.push('\n');
        }

        self.push_section_policy(&mut prompt, &self.settings.profile_sections);
        push_user_block(&mut prompt, instructions);
        prompt
    }

    fn push_section_policy(&self, prompt: &mut String, required: &[String]) {
        prompt.push_str("\n## Required sections\nThe README must contain these sections, in this order:\n");
        for (index, section) in required.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", index + 1, section);
        }

        if !self.settings.excluded_sections.is_empty() {
            prompt.push_str("\n## Excluded sections\nDo not include any of the following:\n");
            for section in &self.settings.excluded_sections {
                let _ = writeln!(prompt, "- {}", section);
            }
        }

        prompt.push_str(
            "\nUse proper Markdown formatting. Output only the raw README.md content, without any \
             commentary and without wrapping it in a code fence.\n",
        );
    }
}

fn push_user_block(prompt: &mut String, instructions: Option<&str>) {
    let Some(instructions) = instructions.map(str::trim).filter(|text| !text.is_empty()) else {
        return;
    };
    prompt.push_str(
        "\nThe user supplied additional instructions. Follow them where they do not conflict with the \
         rules above.\n",
    );
    let _ = write!(prompt, "{}\n{}\n{}\n", USER_BLOCK_START, instructions, USER_BLOCK_END);
}

fn join_or<S: AsRef<str>>(items: &[S], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ")
    }
}

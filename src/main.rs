use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use readmegen::{
    api,
    github::publish_readme,
    logging, AppContext, Config, DocumentStore, GenerationRequest, GitHubClient, RepositoryReference,
};

#[derive(Parser)]
#[command(author, version, about = "Generate README files for GitHub repositories and profiles", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a README and print it
    Generate(GenerateArgs),
    /// Commit a Markdown file as the README of a repository
    Push {
        /// Repository or profile URL
        url: String,
        /// Markdown file to publish
        file: PathBuf,
    },
    /// List recently generated documents
    Recent {
        /// Number of documents to show
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: u32,
    },
    /// Run the web interface
    Serve {
        /// Address to bind, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Repository or profile URL
    url: String,

    /// Additional instructions for the model
    #[arg(short, long)]
    instructions: Option<String>,

    /// Treat the URL as a user profile
    #[arg(short, long)]
    profile: bool,

    /// Do not store the generated document
    #[arg(long)]
    no_store: bool,

    /// Write the document to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Generate(args) => generate(config, args).await,
        Command::Push { url, file } => push(config, &url, &file).await,
        Command::Recent { limit } => recent(config, limit).await,
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let context = AppContext::build(config).await?;
            println!("{} http://{}", "Serving on".bright_green().bold(), bind);
            api::serve(context, &bind).await?;
            Ok(())
        }
    }
}

async fn generate(config: Config, args: GenerateArgs) -> anyhow::Result<()> {
    let reference = RepositoryReference::parse_with_mode(&args.url, args.profile)?;
    let context = AppContext::build(config).await?;
    let request = GenerationRequest::new(reference).with_instructions(args.instructions.as_deref());

    let spinner = spinner(&format!("Generating README for {}", request.reference));
    let result = context.readmes.generate(&request).await;
    spinner.finish_and_clear();

    let outcome = result.map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    if outcome.from_cache {
        eprintln!("{}", "Served from cache".bright_blue());
    }

    if !args.no_store {
        let source_url = request.reference.canonical_url();
        context
            .store
            .upsert(&source_url, &outcome.content, request.instructions.as_deref())
            .await
            .with_context(|| format!("Failed to store README for {}", source_url))?;
        eprintln!("{} {}", "Stored".bright_green(), source_url);
    }

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &outcome.content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".bright_green(), path.display());
        }
        None => println!("{}", outcome.content),
    }
    Ok(())
}

async fn push(config: Config, url: &str, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let github = GitHubClient::new(&config.github)?;

    let spinner = spinner(&format!("Publishing README to {}", url));
    let outcome = publish_readme(&github, url, &content).await;
    spinner.finish_and_clear();

    if !outcome.success {
        anyhow::bail!(outcome.message);
    }
    println!("{} {}", "✓".bright_green().bold(), outcome.message);
    Ok(())
}

async fn recent(config: Config, limit: u32) -> anyhow::Result<()> {
    let store = DocumentStore::connect(&config.storage.database_path).await?;
    let documents = store.recent(limit).await?;

    if documents.is_empty() {
        println!("{}", "No documents generated yet".yellow());
        return Ok(());
    }
    for document in documents {
        println!(
            "{}  {}  {} chars",
            document.updated_at.format("%Y-%m-%d %H:%M").to_string().bright_black(),
            document.source_url.bright_white().bold(),
            document.content.chars().count()
        );
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

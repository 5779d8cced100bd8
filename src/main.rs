//! Tomecast CLI - book and document summaries with narration
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::bail;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tomecast::state::{ErrorDomain, SummaryPhase};
use tomecast::{export, ui, Config, Language, Store, SummarizerClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tomecast")]
#[command(author, version, about = "Summaries and audio narration for books and documents", long_about = None)]
struct Cli {
    /// Use this config file instead of tomecast.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the book catalog
    Search {
        /// Search query
        query: String,
    },
    /// Summarise a book by catalog key, e.g. /works/OL45804W
    Book {
        key: String,
        /// Summary language: en, fr, es, af or zu
        #[arg(short, long)]
        language: Option<Language>,
        /// Save summary.txt and summary.mp3 into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarise a local PDF or text file
    File {
        path: PathBuf,
        /// Summary language: en, fr, es, af or zu
        #[arg(short, long)]
        language: Option<Language>,
        /// Save summary.txt and summary.mp3 into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so logs stay off unless RUST_LOG asks for them.
    init_tracing(if cli.command.is_none() { "off" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Search { query }) => {
            let mut client = SummarizerClient::from_config(&config)?;
            if !client.search(&query).await {
                bail!("search query is empty");
            }
            print_results(client.store(), &config)?;
        }
        Some(Commands::Book {
            key,
            language,
            output,
        }) => {
            let mut client = SummarizerClient::from_config(&config)?;
            if let Some(language) = language {
                client.set_language(language);
            }
            println!("Summarising {} ({})...\n", key, client.store().language());
            client.summarize_book(&key).await;
            report(client.store(), output.as_deref())?;
        }
        Some(Commands::File {
            path,
            language,
            output,
        }) => {
            let mut client = SummarizerClient::from_config(&config)?;
            if let Some(language) = language {
                client.set_language(language);
            }
            println!(
                "Summarising {} ({})...\n",
                path.display(),
                client.store().language()
            );
            client.summarize_upload(path).await;
            report(client.store(), output.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "tomecast", &mut std::io::stdout());
        }
        None => {
            // Default: Launch the TUI
            ui::run(config).await?;
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(store: &Store, config: &Config) -> anyhow::Result<()> {
    let search = store.search();
    if let Some(error) = store.visible_error() {
        if error.domain == ErrorDomain::Search {
            bail!("{}", error.message);
        }
    }
    if search.results.is_empty() {
        println!("No books found for \"{}\".", search.query);
        return Ok(());
    }
    for (idx, result) in search.results.iter().enumerate() {
        println!("{:>2}. {}", idx + 1, result.title.bold());
        println!("    by {}", result.author);
        println!("    key: {}", result.key.cyan());
        match result.cover_url(&config.catalog.cover_url) {
            Some(url) => println!("    cover: {}", url.dimmed()),
            None => println!("    {}", "No Cover".dimmed()),
        }
    }
    Ok(())
}

fn report(store: &Store, output: Option<&Path>) -> anyhow::Result<()> {
    if let Some(text) = store.summary_text() {
        println!("{}\n", "Summary".bold());
        println!("{}\n", text);
    }
    for error in store.errors() {
        eprintln!("{}", error.message.yellow());
    }
    if let Some(handle) = store.audio() {
        println!("🔊 Audio: {} bytes ({})", handle.clip().len(), handle.clip().mime());
    }

    if let SummaryPhase::Failed { .. } = store.phase() {
        bail!("summarisation failed");
    }

    if let Some(dir) = output {
        if let Some(text) = store.summary_text() {
            let path = export::save_summary(dir, text)?;
            println!("Saved {}", path.display().to_string().green());
        }
        if let Some(handle) = store.audio() {
            let path = export::save_audio(dir, handle.clip())?;
            println!("Saved {}", path.display().to_string().green());
        }
    }
    Ok(())
}

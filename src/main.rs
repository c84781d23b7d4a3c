mod client;
mod error;
mod extract;
mod generator;
mod prompt;
mod record;
mod settings;
mod slug;
mod store;
mod topics;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use client::ChatClient;
use generator::Generator;
use settings::Settings;
use store::ArticleStore;

#[derive(Parser)]
#[command(name = "article_gen", about = "Generate articles with a chat-completion API")]
struct Cli {
    /// Collection file (overrides settings)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Model identifier (overrides settings)
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one article per topic and append it to the collection
    Generate {
        /// Topics given on the command line
        topics: Vec<String>,
        /// Read additional topics from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Requests in flight at once (1 = strictly sequential)
        #[arg(short, long, default_value = "1")]
        concurrency: usize,
    },
    /// Overview table of the collection
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show collection statistics
    Stats,
    /// Print the page slug the renderer derives from a title
    Slug { title: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let _ = dotenv::dotenv();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            topics,
            file,
            concurrency,
        } => {
            let mut all = topics;
            if let Some(path) = file {
                all.extend(topics::read_topics_file(&path)?);
            }
            if all.is_empty() {
                bail!("No topics given. Pass topics as arguments or use --file.");
            }
            let settings = Settings::load()?;
            let store = open_store(cli.store.as_deref(), &settings);

            let api_key = settings.resolve_api_key(std::env::var("OPENAI_API_KEY").ok())?;
            let model = cli.model.as_deref().unwrap_or(&settings.model);
            let client = ChatClient::new(&settings.api_url, &api_key, settings.request_timeout())
                .context("Failed to build HTTP client")?;
            info!(model, store = %store.path().display(), topics = all.len(), "starting generation");

            let generator = Generator::new(client, store, model).with_progress(true);
            let stats = if concurrency > 1 {
                generator.run_concurrent(&all, concurrency).await
            } else {
                generator.run(&all).await
            };
            println!(
                "Done: {} topics ({} saved, {} failed) -> {}",
                stats.total,
                stats.persisted,
                stats.failed,
                generator.store().path().display()
            );
            Ok(())
        }
        Commands::List { limit } => {
            let store = open_store(cli.store.as_deref(), &Settings::load()?);
            let records = store.load_strict()?;
            if records.is_empty() {
                println!("No articles found.");
                return Ok(());
            }

            println!("{:>3} | {:<40} | {:<32} | {:>6}", "#", "Title", "Slug", "Words");
            println!("{}", "-".repeat(90));
            for (i, r) in records.iter().take(limit).enumerate() {
                let slug = slug::slugify(&r.title).unwrap_or_else(|| "(timestamp)".into());
                println!(
                    "{:>3} | {:<40} | {:<32} | {:>6}",
                    i + 1,
                    truncate(&r.title, 40),
                    truncate(&slug, 32),
                    r.body.split_whitespace().count()
                );
            }
            println!("\n{} articles in {}", records.len(), store.path().display());
            Ok(())
        }
        Commands::Stats => {
            let store = open_store(cli.store.as_deref(), &Settings::load()?);
            let records = store.load_strict()?;
            let with_desc = records.iter().filter(|r| !r.short_description.is_empty()).count();
            let with_author = records.iter().filter(|r| r.author.is_some()).count();
            let with_date = records.iter().filter(|r| r.published_date.is_some()).count();
            let no_slug = records.iter().filter(|r| slug::slugify(&r.title).is_none()).count();
            println!("Articles:     {}", records.len());
            println!("Description:  {}", with_desc);
            println!("Author:       {}", with_author);
            println!("Date:         {}", with_date);
            println!("No slug:      {}", no_slug);
            Ok(())
        }
        Commands::Slug { title } => {
            println!("{}", slug::slug_or_fallback(&title));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `--store` wins over the configured path.
fn open_store(flag: Option<&Path>, settings: &Settings) -> ArticleStore {
    let path = flag.map_or_else(|| PathBuf::from(&settings.store_path), Path::to_path_buf);
    ArticleStore::new(path)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(store_path: &str) -> Settings {
        Settings {
            api_url: client::DEFAULT_API_URL.into(),
            api_key: None,
            model: prompt::DEFAULT_MODEL.into(),
            store_path: store_path.into(),
            request_timeout_secs: None,
        }
    }

    #[test]
    fn store_flag_overrides_settings() {
        let s = settings("configured.json");
        assert_eq!(
            open_store(Some(Path::new("flag.json")), &s).path(),
            Path::new("flag.json")
        );
        assert_eq!(open_store(None, &s).path(), Path::new("configured.json"));
    }

    #[test]
    fn slug_command_parses_without_store_options() {
        let cli = Cli::try_parse_from(["article_gen", "slug", "Hello World"]).unwrap();
        assert!(cli.store.is_none());
        assert!(matches!(cli.command, Commands::Slug { ref title } if title == "Hello World"));
    }
}

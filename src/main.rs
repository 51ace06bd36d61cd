//! wiki-store - command-line access to a git-backed page store
//!
//! # Usage
//! ```bash
//! wiki-store get MainPage                        # Print page content
//! echo "# Hi" | wiki-store put Hello -a alice    # Commit stdin as a page
//! wiki-store history Hello --limit 20            # Page history as JSON
//! wiki-store changes                             # Recent changes as JSON
//! wiki-store search hello                        # Full-text search
//! ```

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wiki_store::config::{DEFAULT_MAIN_PAGE, DEFAULT_WORKDIR};
use wiki_store::{ContentStore, StoreConfig};

/// Versioned page store on top of a git working tree
#[derive(Parser)]
#[command(name = "wiki-store")]
#[command(about = "A git-backed versioned page store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working tree holding the pages
    #[arg(short, long, env = "WIKI_WORKDIR", default_value = DEFAULT_WORKDIR)]
    workdir: PathBuf,

    /// Title of the main page, created on first use
    #[arg(long, env = "WIKI_MAIN_PAGE", default_value = DEFAULT_MAIN_PAGE)]
    main_page: String,

    /// Do not create the main page in a fresh store
    #[arg(long)]
    no_main_page: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a page's content (optionally at a revision)
    Get {
        name: String,
        #[arg(short, long)]
        revision: Option<String>,
        /// Print the commit metadata as JSON instead of the content
        #[arg(long)]
        meta: bool,
    },
    /// Commit stdin as the new content of a page
    Put {
        name: String,
        #[arg(short, long, default_value = "anonymous")]
        author: String,
        #[arg(short, long, default_value = "Update page")]
        message: String,
    },
    /// Delete a page
    Delete {
        name: String,
        #[arg(short, long, default_value = "anonymous")]
        author: String,
        #[arg(short, long, default_value = "Delete page")]
        message: String,
    },
    /// Rename a page
    Rename {
        old_name: String,
        new_name: String,
        #[arg(short, long, default_value = "anonymous")]
        author: String,
        #[arg(short, long, default_value = "Rename page")]
        message: String,
    },
    /// Restore a page to the content it had at a revision
    Revert {
        name: String,
        revision: String,
        #[arg(short, long, default_value = "anonymous")]
        author: String,
        #[arg(short, long, default_value = "Revert page")]
        message: String,
    },
    /// Page history, newest first
    History {
        name: String,
        /// Cursor returned as `next` by the previous page
        #[arg(long)]
        after: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Recent changes across the whole store
    Changes {
        #[arg(long)]
        after: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Diff a page between two revisions
    Diff {
        name: String,
        from: String,
        #[arg(default_value = "HEAD")]
        to: String,
    },
    /// List page titles
    List,
    /// List non-page files with sizes
    Files,
    /// Search page contents
    Search { pattern: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut content = Vec::new();
    std::io::stdin().read_to_end(&mut content)?;
    Ok(content)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StoreConfig {
        workdir: cli.workdir,
        main_page: cli.main_page,
        create_main_page: !cli.no_main_page,
    };
    let store = ContentStore::open(&config)?;

    match cli.command {
        Commands::Get { name, revision, meta } => {
            let document = match revision {
                Some(rev) => store.get_at(&name, &rev)?,
                None => store.get(&name)?,
            };
            if meta {
                print_json(&document.last_modified)?;
            } else {
                std::io::stdout().write_all(&document.content)?;
            }
        }
        Commands::Put { name, author, message } => {
            let content = read_stdin()?;
            store.put(&name, &content, &author, &message)?;
        }
        Commands::Delete { name, author, message } => {
            store.delete(&name, &message, &author)?;
        }
        Commands::Rename { old_name, new_name, author, message } => {
            store.rename(&old_name, &new_name, &message, &author)?;
        }
        Commands::Revert { name, revision, author, message } => {
            store.revert(&name, &revision, &author, &message)?;
        }
        Commands::History { name, after, limit } => {
            print_json(&store.history_page(&name, after.as_deref(), limit)?)?;
        }
        Commands::Changes { after, limit } => {
            print_json(&store.changes_page(after.as_deref(), limit)?)?;
        }
        Commands::Diff { name, from, to } => {
            print_json(&store.diff(&name, &from, &to)?)?;
        }
        Commands::List => print_json(&store.list_documents()?)?,
        Commands::Files => print_json(&store.list_files()?)?,
        Commands::Search { pattern } => print_json(&store.search(&pattern)?)?,
    }

    Ok(())
}

//! # Agent Knowledge CLI (`akb`)
//!
//! Operator front-end for the knowledge base: initialize the database,
//! (re)index documents, manage global assignments, and run retrieval
//! queries the way an agent would.
//!
//! ## Usage
//!
//! ```bash
//! akb --config ./config/akb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `akb init` | Create the SQLite database and apply the schema |
//! | `akb index agent` | Index a document private to one agent |
//! | `akb index global` | Index a shared document |
//! | `akb delete <agent\|global> <source-id>` | Drop a document's chunks |
//! | `akb assign <agent> <source>` | Make a global document visible to an agent |
//! | `akb unassign <agent> <source>` | Revoke that visibility |
//! | `akb retrieve <agent> "<query>"` | Show the top-K context fragments |
//! | `akb chunk` | Print the fragments a text would produce (no database) |
//!
//! Logs go to stderr; set `RUST_LOG=agent_knowledge=debug` for detail.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agent_knowledge::config::{self, Config};
use agent_knowledge::{chunk_text, migrate, ChunkerConfig, IndexReport, KnowledgeBase, SourceType};

/// Agent Knowledge CLI: per-agent and shared knowledge retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/akb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "akb",
    about = "Agent Knowledge: per-agent and shared knowledge retrieval",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/akb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Chunk, embed, and store a document, replacing any previous version.
    Index {
        #[command(subcommand)]
        target: IndexTarget,
    },

    /// Delete every chunk of a document.
    Delete {
        /// `agent` or `global`.
        source_type: SourceType,
        source_id: String,
    },

    /// Assign a global document to an agent.
    Assign { agent_id: String, source_id: String },

    /// Remove a global document assignment.
    Unassign { agent_id: String, source_id: String },

    /// Retrieve the fragments most relevant to a query for one agent.
    Retrieve {
        agent_id: String,
        query: String,

        /// Maximum number of fragments; defaults to `[retrieval].top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the fragments a text would be split into, as JSON.
    ///
    /// Uses `[chunking]` from the config file when it exists, otherwise
    /// the defaults. Never touches the database.
    Chunk {
        #[command(flatten)]
        input: ContentArgs,

        #[arg(long, default_value = "")]
        title: String,
    },
}

#[derive(Subcommand)]
enum IndexTarget {
    /// A document owned by one agent.
    Agent {
        /// Owning agent id.
        #[arg(long)]
        owner: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        input: ContentArgs,
    },
    /// A shared document, visible to agents it is assigned to.
    Global {
        #[arg(long)]
        source: String,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        input: ContentArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ContentArgs {
    /// Read the document body from a file.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Pass the document body inline.
    #[arg(long)]
    text: Option<String>,
}

impl ContentArgs {
    fn read(&self) -> Result<String> {
        match (&self.file, &self.text) {
            (Some(path), _) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("one of --file or --text is required"),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(label: &str, report: &IndexReport) {
    println!("index {}", label);
    println!("  fragments: {}", report.fragments);
    println!("  embedded: {}", report.embedded);
    println!("  skipped: {}", report.skipped);
    println!("ok");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Chunking needs no database; fall back to defaults without a config file.
    if let Commands::Chunk { input, title } = &cli.command {
        let chunking = if cli.config.exists() {
            config::load_config(&cli.config)?.chunking
        } else {
            ChunkerConfig::default()
        };
        let drafts = chunk_text(&input.read()?, title, &chunking);
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    let cfg: Config = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let kb = KnowledgeBase::open(&cfg).await?;

    match cli.command {
        Commands::Init | Commands::Chunk { .. } => {}
        Commands::Index { target } => match target {
            IndexTarget::Agent {
                owner,
                source,
                title,
                input,
            } => {
                let content = input.read()?;
                let Some(report) = kb
                    .agent_document_saved(&owner, &source, &title, &content)
                    .await
                else {
                    bail!("indexing agent:{} failed; see log", source);
                };
                print_report(&format!("agent:{} (owner {})", source, owner), &report);
            }
            IndexTarget::Global {
                source,
                title,
                input,
            } => {
                let content = input.read()?;
                let Some(report) = kb.global_document_saved(&source, &title, &content).await
                else {
                    bail!("indexing global:{} failed; see log", source);
                };
                print_report(&format!("global:{}", source), &report);
            }
        },
        Commands::Delete {
            source_type,
            source_id,
        } => {
            let removed = kb.document_deleted(source_type, &source_id).await?;
            println!("delete {}:{}", source_type, source_id);
            println!("  chunks removed: {}", removed);
            println!("ok");
        }
        Commands::Assign {
            agent_id,
            source_id,
        } => {
            kb.assign_global(&agent_id, &source_id).await?;
            println!("assign global:{} -> {}", source_id, agent_id);
            println!("ok");
        }
        Commands::Unassign {
            agent_id,
            source_id,
        } => {
            kb.unassign_global(&agent_id, &source_id).await?;
            println!("unassign global:{} -> {}", source_id, agent_id);
            println!("ok");
        }
        Commands::Retrieve {
            agent_id,
            query,
            top_k,
            json,
        } => {
            let results = kb.retrieve(&agent_id, &query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, r) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, r.title);
                    for line in r.content.lines() {
                        println!("    {}", line);
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

//! gmod CLI - runs one ghc-mod query against a project and prints the result.
//!
//! ```text
//! main() -> BackendManager -> queue_cmd() -> interactive session | batch run
//!                                   |
//!                                   v
//!                         QueryOutput -> text | JSON
//! ```
//!
//! Warnings and error reports raised while the query ran are printed to
//! stderr once it completes.

mod logging;
mod output;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::Receiver;

use gmod_backend::{BackendEvent, BackendManager, RecentLog};
use gmod_config::{FileSettingsProvider, GmodConfig};
use gmod_types::{Position, QueryOutput, SourceFile};

#[derive(Debug, Parser)]
#[command(name = "gmod", about = "Query ghc-mod through a supervised backend", version, long_about = None)]
struct Cli {
    /// Global configuration file (default: ~/.gmod/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Project root for project-wide commands.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Read the unsaved contents of FILE from stdin.
    #[arg(long, global = true)]
    stdin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detected ghc-mod version and capabilities.
    Version,
    /// Modules visible from the project.
    List,
    /// Supported language extensions.
    Lang,
    /// Supported compiler flags.
    Flag,
    /// Exported symbols of modules.
    Browse {
        #[arg(required = true)]
        modules: Vec<String>,
    },
    /// Type at a one-based position.
    Type { file: PathBuf, row: u32, col: u32 },
    /// Information about a symbol.
    Info { file: PathBuf, symbol: String },
    /// Modules that define a symbol.
    Find { file: PathBuf, symbol: String },
    /// Case-split the variable at a one-based position.
    Split { file: PathBuf, row: u32, col: u32 },
    /// Initial definition for the signature at a one-based position.
    Sig { file: PathBuf, row: u32, col: u32 },
    /// Compiler diagnostics.
    Check {
        file: PathBuf,
        /// Use the interactive process.
        #[arg(long)]
        fast: bool,
    },
    /// hlint suggestions.
    Lint { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let recent_log = RecentLog::default();
    logging::init_tracing(&recent_log);

    let config = load_config(cli.config.as_deref())?;
    let settings = Arc::new(FileSettingsProvider::new(config.settings));
    let manager = BackendManager::with_recent_log(config.tool, settings, recent_log);
    let mut events = manager.subscribe();

    let result = run(&manager, &cli).await;
    manager.destroy().await;
    report_events(&mut events);

    let output = result?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to encode result")?
        );
    } else {
        print!("{}", output::render(&output));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GmodConfig> {
    let loaded = match path {
        Some(path) => GmodConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GmodConfig::load().context("failed to load config")?,
    };
    Ok(loaded.unwrap_or_default())
}

async fn run(manager: &BackendManager, cli: &Cli) -> Result<QueryOutput> {
    let source = |file: &Path| -> Result<SourceFile> {
        let source = SourceFile::new(file);
        if !cli.stdin {
            return Ok(source);
        }
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read buffer from stdin")?;
        Ok(source.with_text(text))
    };
    let root = cli.root.as_path();

    let output = match &cli.command {
        Command::Version => QueryOutput::Capabilities(
            manager
                .capabilities(root)
                .await
                .map(|caps| (*caps).clone())?,
        ),
        Command::List => QueryOutput::Lines(manager.list(root).await?),
        Command::Lang => QueryOutput::Lines(manager.lang(root).await?),
        Command::Flag => QueryOutput::Lines(manager.flag(root).await?),
        Command::Browse { modules } => QueryOutput::Browse(manager.browse(root, modules).await?),
        Command::Type { file, row, col } => QueryOutput::Type(
            manager
                .type_at(&source(file)?, Position::from_one_based(*row, *col))
                .await?,
        ),
        Command::Info { file, symbol } => {
            QueryOutput::Info(manager.info(&source(file)?, symbol).await?)
        }
        Command::Find { file, symbol } => {
            QueryOutput::Lines(manager.find(&source(file)?, symbol).await?)
        }
        Command::Split { file, row, col } => QueryOutput::CaseSplit(
            manager
                .case_split(&source(file)?, Position::from_one_based(*row, *col))
                .await?,
        ),
        Command::Sig { file, row, col } => QueryOutput::SigFill(
            manager
                .sig_fill(&source(file)?, Position::from_one_based(*row, *col))
                .await?,
        ),
        Command::Check { file, fast } => {
            QueryOutput::Messages(manager.check(&source(file)?, *fast).await?)
        }
        Command::Lint { file } => QueryOutput::Messages(manager.lint(&source(file)?).await?),
    };
    Ok(output)
}

/// Print warnings and reports that arrived while the command ran.
fn report_events(events: &mut Receiver<BackendEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            BackendEvent::Warning { message, .. } => eprintln!("warning: {message}"),
            BackendEvent::Error(report) => eprintln!("{report}"),
            BackendEvent::SpawnFailed(report) => eprintln!("{report}"),
            _ => {}
        }
    }
}

#![forbid(unsafe_code)]

mod config;
mod constants;
mod drag;
mod layout;
mod overrides;
mod persistence;
mod registry;
mod session;
mod store;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use config::Settings;
use layout::resolve_all;
use persistence::{FileGateway, load_payload, to_tab_json};
use registry::CardRegistry;
use session::{Command, EditSession, LayoutSnapshot, Reply};
use store::OverrideStore;
use types::Point;

#[derive(Debug, Parser)]
#[command(name = "card-layout", version, about = "Inspect and edit dashboard card layouts")]
struct Cli {
    /// Settings file (defaults to <config_dir>/card-layout/settings.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Layout override file to read and save
    #[arg(long, value_name = "PATH")]
    layout: Option<PathBuf>,

    /// Center anchor as X,Y
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true)]
    center: Option<Point>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Print every card's resolved layout
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Print the persisted override payload as saved
    Payload,
    /// Edit the layout with commands read from stdin
    Edit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.trace_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(layout) = cli.layout {
        settings.layout_path = Some(layout);
    }
    if let Some(center) = cli.center {
        settings.center = center;
    }
    settings.validate_and_clamp();
    let settings_path = cli.config.unwrap_or_else(Settings::config_path);
    config::log_loaded(&settings, &settings_path);

    let registry = match &settings.registry_path {
        Some(path) => CardRegistry::load(path)?,
        None => CardRegistry::builtin(),
    };
    let layout_path = settings.layout_path();
    let payload = load_payload(&layout_path)?;
    let store = OverrideStore::new(registry, &payload.overrides);

    match cli.command {
        CliCommand::Show { json } => {
            let layouts = resolve_all(store.registry(), store.overrides(), settings.center);
            let snapshot = LayoutSnapshot::from_layouts(layouts);
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot).context("Failed to serialize layout")?);
            } else {
                println!("{}", snapshot.render_text());
            }
        }
        CliCommand::Payload => {
            print!("{}", to_tab_json(&store.get_payload())?);
        }
        CliCommand::Edit => {
            let gateway = FileGateway::new(layout_path);
            info!(path = %gateway.path().display(), "Starting edit session");
            let session = EditSession::new(store, settings.center, gateway);
            run_session(session).await?;
        }
    }

    Ok(())
}

async fn run_session(mut session: EditSession<FileGateway>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                error!(line = %line, error = %e, "Invalid command");
                continue;
            }
        };

        match session.handle(command).await {
            Ok(Reply::Output(text)) => {
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            Ok(Reply::Silent) => {}
            Ok(Reply::Quit) => break,
            Err(e) => error!("Command failed: {e:#}"),
        }
    }

    info!(changes = session.changes_seen(), unsaved = session.store().has_changes(), "Edit session ended");
    Ok(())
}

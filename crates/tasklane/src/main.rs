//! CLI entry point for tasklane.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tasklane_app::AppConfig;
use tasklane_core::Tier;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// To-do lists synced with a REST backend, with an offline cache.
#[derive(Parser, Debug)]
#[command(
    name = "tasklane",
    version,
    about = "tasklane: grouped to-do lists synced with a REST backend"
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tasks, newest first.
    Ls {
        /// Only tasks in this group.
        #[arg(long)]
        group: Option<u64>,
        /// Case-insensitive search over title, description and tags.
        #[arg(long)]
        search: Option<String>,
        /// Only completed tasks.
        #[arg(long, conflicts_with = "open")]
        done: bool,
        /// Only open tasks.
        #[arg(long)]
        open: bool,
        /// Only tasks with this priority (repeatable).
        #[arg(short = 'p', long = "priority", value_parser = parse_tier)]
        priorities: Vec<Tier>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Create a task.
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(short = 'p', long, value_parser = parse_tier)]
        priority: Option<Tier>,
        /// Target group (defaults to the selected group).
        #[arg(long)]
        group: Option<u64>,
    },

    /// Change fields of a task.
    Edit {
        #[arg(long)]
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(short = 'p', long, value_parser = parse_tier)]
        priority: Option<Tier>,
        #[arg(long)]
        group: Option<u64>,
    },

    /// Mark a task as completed.
    Done {
        #[arg(long)]
        task: String,
        /// Mark the task as open again.
        #[arg(long)]
        undo: bool,
    },

    /// Delete a task.
    Rm {
        #[arg(long)]
        task: String,
    },

    /// Manage task groups.
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// List groups; the selected one is marked with `*`.
    Ls,
    /// Create a group and select it.
    Add {
        #[arg(long)]
        name: String,
        /// Hex colour (defaults to the first palette colour).
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename or recolour a group.
    Edit {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: String,
    },
    /// Delete a group.
    Rm {
        #[arg(long)]
        id: u64,
    },
    /// Select the group new tasks go to.
    Select {
        #[arg(long)]
        id: u64,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    #[default]
    Table,
    Json,
}

fn parse_tier(raw: &str) -> Result<Tier, String> {
    Tier::ALL
        .into_iter()
        .find(|tier| tier.as_str().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| format!("unknown priority '{raw}' (expected low, medium or high)"))
}

fn main() -> Result<()> {
    let Cli { config, cmd } = Cli::parse();
    install_tracing();

    let config = AppConfig::load(config.as_deref())?;
    tokio::runtime::Runtime::new()?.block_on(async move {
        let mut app = commands::App::open(&config).await?;
        let mut stdout = std::io::stdout().lock();
        commands::run(cmd, &app.service, &mut app.groups, &mut stdout).await
    })
}

fn install_tracing() {
    // RUST_LOG overrides the default INFO level.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

mod commands;
mod notify;
mod render;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use legend_core::cache::FileCache;
use legend_core::connectivity::Fixed;
use legend_core::remote::DirRemote;
use legend_core::{
    Connectivity, ConnectivityMonitor, ConnectivityProbe, DayOfWeek, LegendConfig, Scheduler,
    Session,
};
use tracing_subscriber::EnvFilter;

use crate::notify::ConsoleNotifier;

#[derive(Parser)]
#[command(name = "legend")]
#[command(about = "Plan a shared weekly schedule, online or offline")]
struct Cli {
    /// Work offline even if the shared table is reachable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one day, with overlapping events side by side
    Day { day: DayOfWeek },
    /// Show the whole week
    Week,
    Add {
        title: String,

        /// Day of the week (e.g. "mon", "tuesday" or 0-6 from Sunday)
        #[arg(short, long)]
        day: DayOfWeek,

        /// Start time (HH:MM)
        #[arg(short, long, value_parser = parse_time)]
        start: NaiveTime,

        /// End time (HH:MM)
        #[arg(short, long, value_parser = parse_time)]
        end: NaiveTime,

        #[arg(long)]
        description: Option<String>,

        /// Add to the general schedule instead of your own
        #[arg(long)]
        general: bool,
    },
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        day: Option<DayOfWeek>,

        #[arg(short, long, value_parser = parse_time)]
        start: Option<NaiveTime>,

        #[arg(short, long, value_parser = parse_time)]
        end: Option<NaiveTime>,

        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,
    },
    Delete {
        id: String,
    },
    /// Join or leave an event
    Engage {
        id: String,
    },
    /// Copy every event of one day onto other days
    Copy {
        from: DayOfWeek,

        #[arg(required = true)]
        to: Vec<DayOfWeek>,
    },
    /// Remove your events (or the general ones) for a day or the whole week
    Clear {
        #[arg(short, long)]
        day: Option<DayOfWeek>,

        #[arg(long)]
        general: bool,
    },
    /// Set your identity; existing events are restamped with it
    Profile {
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },
    /// Push offline changes and refresh
    Sync,
    /// Show connectivity and pending offline changes
    Status,
    /// Stay connected and follow changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LegendConfig::load()?;
    config.ensure_remote_dir()?;

    let (mut session, monitor, probe) = open_session(&config, cli.offline).await?;

    match cli.command {
        Commands::Day { day } => commands::day::run(&session, day),
        Commands::Week => commands::week::run(&session),
        Commands::Add {
            title,
            day,
            start,
            end,
            description,
            general,
        } => {
            commands::add::run(&mut session, title, day, start, end, description, general).await
        }
        Commands::Edit {
            id,
            title,
            day,
            start,
            end,
            description,
            clear_description,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            commands::edit::run(&mut session, &id, title, day, start, end, description).await
        }
        Commands::Delete { id } => commands::delete::run(&mut session, &id).await,
        Commands::Engage { id } => commands::engage::run(&mut session, &id).await,
        Commands::Copy { from, to } => commands::copy::run(&mut session, from, &to).await,
        Commands::Clear { day, general } => commands::clear::run(&mut session, day, general).await,
        Commands::Profile { id, name, color } => {
            commands::profile::run(&mut session, config, id, name, color).await
        }
        Commands::Sync => commands::sync::run(&mut session).await,
        Commands::Status => commands::status::run(&session),
        Commands::Watch => {
            let interval = config.poll_interval()?;
            commands::watch::run(session, monitor, probe, interval).await
        }
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| format!("'{s}' is not a time (HH:MM)"))
}

/// Connectivity follows whether the shared table's directory is reachable,
/// unless forced offline.
fn probe_for(config: &LegendConfig, offline: bool) -> Arc<dyn ConnectivityProbe> {
    if offline {
        return Arc::new(Fixed(Connectivity::Offline));
    }
    let remote = DirRemote::new(config.remote_path());
    Arc::new(move || {
        if remote.is_reachable() {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    })
}

async fn open_session(
    config: &LegendConfig,
    offline: bool,
) -> Result<(Session, Arc<ConnectivityMonitor>, Arc<dyn ConnectivityProbe>)> {
    let probe = probe_for(config, offline);
    let monitor = Arc::new(ConnectivityMonitor::new(probe.as_ref()));

    let scheduler = Scheduler::open(
        config.profile.clone(),
        monitor.current(),
        Arc::new(DirRemote::new(config.remote_path())),
        Arc::new(FileCache::new(config.data_path())),
        Arc::new(ConsoleNotifier),
    );

    let spinner = utils::tui::create_spinner("Syncing".into());
    let session = Session::start(scheduler, monitor.subscribe()).await;
    spinner.finish_and_clear();

    Ok((session, monitor, probe))
}

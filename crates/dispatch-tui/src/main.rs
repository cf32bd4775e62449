//! `dispatch-board`: terminal dispatch board.
//!
//! Officers are cards, slots are columns. Drag a card onto a column to
//! assign it; every connected board converges on the same assignments
//! through the store's change feed. `--touch` replays the mouse as a touch
//! screen so the long-press drag path can be driven from a terminal.
//!
//! Logs go to a file (see `log_file` in the config) so they never corrupt
//! the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod worker;

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_core::{AssignmentRecord, BoardConfig, MemoryBackend, Officer, OfficerStatus, Roster};

use crate::app::App;

/// Drag-and-drop dispatch board for assigning officers to slots.
#[derive(Parser, Debug)]
#[command(name = "dispatch-board", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Treat the mouse as a touch screen (long-press to drag)
    #[arg(short, long)]
    touch: bool,

    /// Roster JSON file, overrides the config
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Assignment rows JSON file to seed the in-memory store
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Log file path, overrides the config
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. Returns a guard that must live until exit so logs flush.
fn setup_tracing(log_file: &Path, verbose: u8) -> WorkerGuard {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dispatch_core={log_level},dispatch_board={log_level}")));

    let log_dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let log_filename = log_file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("dispatch-board.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

fn demo_roster() -> Roster {
    let officer = |id: &str, name: &str, status: OfficerStatus| Officer {
        status,
        ..Officer::new(id, name)
    };
    Roster::new([
        officer("A-101", "Ada Reyes", OfficerStatus::Available),
        officer("A-102", "Ben Ochoa", OfficerStatus::Available),
        officer("A-107", "Cy Park", OfficerStatus::Busy),
        officer("B-203", "Dee Hart", OfficerStatus::Available),
        officer("B-211", "Eli Mott", OfficerStatus::OffDuty),
        officer("C-310", "Fay Lund", OfficerStatus::Available),
        officer("C-318", "Gus Varga", OfficerStatus::Available),
    ])
}

/// Every rostered officer except the off-duty ones starts in the first slot.
fn demo_backend(config: &BoardConfig, roster: &Roster) -> MemoryBackend {
    let Some(first) = config.slots.first() else {
        return MemoryBackend::new();
    };
    MemoryBackend::with_records(
        roster
            .iter()
            .filter(|o| o.status != OfficerStatus::OffDuty)
            .map(|o| AssignmentRecord::new(first.clone(), o.id.clone())),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;

    let cfg = dispatch_config::load_config(cli.config.as_deref())?;
    let log_file = cli.log_file.clone().unwrap_or_else(|| cfg.log_file.clone());
    let _log_guard = setup_tracing(&log_file, cli.verbose);

    let board = cfg.to_board_config()?;
    let roster = match cli.roster.as_ref().or(cfg.roster.as_ref()) {
        Some(path) => dispatch_config::load_roster(path)?,
        None => demo_roster(),
    };
    let backend = match cli.seed.as_ref().or(cfg.seed.as_ref()) {
        Some(path) => dispatch_config::load_seed(path)?,
        None => demo_backend(&board, &roster),
    };

    info!(
        slots = board.slots.len(),
        officers = roster.len(),
        touch = cli.touch,
        "starting dispatch-board"
    );

    let mut app = App::new(board, roster, backend, cli.touch);
    app.run().await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn demo_backend_skips_off_duty_officers() {
        let config = BoardConfig::default();
        let roster = demo_roster();
        let backend = demo_backend(&config, &roster);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let rows = rt.block_on(backend.rows());
        assert_eq!(rows.len(), roster.len() - 1);
        assert!(rows.iter().all(|r| r.slot_name == config.slots[0]));
    }

    #[test]
    fn cli_parses_touch_and_verbosity() {
        let cli = Cli::try_parse_from(["dispatch-board", "--touch", "-vv"]).unwrap();
        assert!(cli.touch);
        assert_eq!(cli.verbose, 2);
        assert!(cli.config.is_none());
    }
}

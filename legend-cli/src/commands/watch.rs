use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use legend_core::{ConnectivityMonitor, ConnectivityProbe, Session};
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(
    mut session: Session,
    monitor: Arc<ConnectivityMonitor>,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
) -> Result<()> {
    let polling = monitor.spawn_polling(probe, interval);
    println!(
        "{} {}",
        session.scheduler().connectivity().render(),
        "watching for changes (Ctrl-C to stop)".dimmed()
    );

    session
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("could not listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    polling.abort();
    let scheduler = session.end();
    let pending = scheduler.pending_actions().len();
    if pending > 0 {
        println!("{}", format!("{pending} offline change(s) left to sync").yellow());
    }
    Ok(())
}

use anyhow::Result;
use legend_core::Session;
use owo_colors::OwoColorize;

use super::create_spinner;
use crate::render::pluralize;

pub async fn run(session: &mut Session) -> Result<()> {
    if !session.scheduler().is_online() {
        anyhow::bail!("Offline: the shared schedule is not reachable");
    }

    let spinner = create_spinner("Syncing".into());
    let result = session.scheduler_mut().replay().await;
    spinner.finish_and_clear();

    let summary = result?;
    if summary.committed == 0 {
        println!("{}", "Up to date".dimmed());
    } else {
        println!(
            "Synced {} offline {}",
            summary.committed,
            pluralize("change", summary.committed)
        );
    }
    Ok(())
}

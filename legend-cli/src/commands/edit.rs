use anyhow::Result;
use chrono::NaiveTime;
use legend_core::{DayOfWeek, EventPatch, Session};

use super::{print_outcome, resolve_id};

pub async fn run(
    session: &mut Session,
    id: &str,
    title: Option<String>,
    day: Option<DayOfWeek>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    description: Option<Option<String>>,
) -> Result<()> {
    let id = resolve_id(session, id)?;
    let patch = EventPatch {
        title,
        day,
        start_time: start,
        end_time: end,
        description,
        ..Default::default()
    };
    if patch.is_empty() {
        anyhow::bail!("Nothing to change. Pass --title, --day, --start, --end or --description.");
    }

    let outcome = session.scheduler_mut().update_event(&id, patch).await?;
    print_outcome(outcome);
    Ok(())
}

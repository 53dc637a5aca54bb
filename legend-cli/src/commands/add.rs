use anyhow::Result;
use chrono::NaiveTime;
use legend_core::{DayOfWeek, EventDraft, Session};

use super::print_outcome;

pub async fn run(
    session: &mut Session,
    title: String,
    day: DayOfWeek,
    start: NaiveTime,
    end: NaiveTime,
    description: Option<String>,
    general: bool,
) -> Result<()> {
    let mut draft = match session.scheduler().user() {
        Some(profile) if !general => EventDraft::personal(profile, day, start, end, &title),
        _ => EventDraft::general(day, start, end, &title),
    };
    if let Some(description) = description {
        draft = draft.with_description(&description);
    }

    let outcome = session.scheduler_mut().add_event(draft).await?;
    print_outcome(outcome);
    Ok(())
}

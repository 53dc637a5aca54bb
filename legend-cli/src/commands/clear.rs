use anyhow::Result;
use legend_core::{ClearScope, DayOfWeek, Session};
use owo_colors::OwoColorize;

use crate::render::pluralize;

pub async fn run(session: &mut Session, day: Option<DayOfWeek>, general: bool) -> Result<()> {
    let scope = if general {
        ClearScope::General
    } else {
        ClearScope::Personal
    };

    let removed = session.scheduler_mut().clear_schedule(scope, day).await?;
    if removed == 0 {
        println!("{}", "Nothing to clear".dimmed());
    } else {
        println!("Removed {} {}", removed, pluralize("event", removed));
    }
    Ok(())
}

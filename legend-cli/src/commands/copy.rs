use anyhow::Result;
use legend_core::{DayOfWeek, Session};

use crate::render::pluralize;

pub async fn run(session: &mut Session, from: DayOfWeek, to: &[DayOfWeek]) -> Result<()> {
    let copied = session.scheduler_mut().copy_schedule(from, to).await?;
    println!("Copied {} {} from {}", copied, pluralize("event", copied), from);
    Ok(())
}

use anyhow::Result;
use legend_core::{DayOfWeek, Session};

use crate::render::render_day;

pub fn run(session: &Session, day: DayOfWeek) -> Result<()> {
    let placed = session.scheduler().layout_day(day);
    println!("{}", render_day(day, &placed));
    Ok(())
}

use anyhow::Result;
use legend_core::{DayOfWeek, Session};

use crate::render::render_day;

pub fn run(session: &Session) -> Result<()> {
    let days: Vec<DayOfWeek> = DayOfWeek::all().collect();

    for (i, day) in days.iter().enumerate() {
        let placed = session.scheduler().layout_day(*day);
        println!("{}", render_day(*day, &placed));

        // Add spacing between days (but not after the last one)
        if i < days.len() - 1 {
            println!();
        }
    }

    Ok(())
}

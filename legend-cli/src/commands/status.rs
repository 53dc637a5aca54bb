use anyhow::Result;
use legend_core::Session;
use owo_colors::OwoColorize;

use crate::render::{Render, pluralize};

pub fn run(session: &Session) -> Result<()> {
    let scheduler = session.scheduler();

    println!("{}", scheduler.connectivity().render());
    match scheduler.user() {
        Some(user) => println!("   Signed in as {} ({})", user.name, user.id.dimmed()),
        None => println!("   {}", "Guest".dimmed()),
    }

    let count = scheduler.events().len();
    println!("   {} {}", count, pluralize("event", count));

    let pending = scheduler.pending_actions();
    if pending.is_empty() {
        println!("   {}", "No offline changes".dimmed());
        return Ok(());
    }

    println!();
    println!(
        "   Offline changes (to sync): {}",
        pending.len().to_string().yellow()
    );
    for action in pending.iter() {
        println!("   {}", action.render());
    }

    Ok(())
}

pub mod add;
pub mod clear;
pub mod copy;
pub mod day;
pub mod delete;
pub mod edit;
pub mod engage;
pub mod profile;
pub mod status;
pub mod sync;
pub mod watch;
pub mod week;

use anyhow::Result;
use legend_core::{EventId, MutationOutcome, Session};
use owo_colors::OwoColorize;

pub use crate::utils::tui::create_spinner;

/// Resolve a full id or a unique prefix of one.
pub fn resolve_id(session: &Session, id: &str) -> Result<EventId> {
    let matches: Vec<&EventId> = session
        .scheduler()
        .events()
        .iter()
        .map(|e| &e.id)
        .filter(|candidate| candidate.as_str().starts_with(id))
        .collect();

    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => anyhow::bail!("No event with id '{id}'"),
        many => {
            let ids: Vec<&str> = many.iter().map(|m| m.as_str()).collect();
            anyhow::bail!("'{id}' is ambiguous: {}", ids.join(", "))
        }
    }
}

pub fn print_outcome(outcome: MutationOutcome) {
    if outcome == MutationOutcome::Queued {
        println!("{}", "Saved offline; run `legend sync` once reconnected.".dimmed());
    }
}

use anyhow::Result;
use legend_core::Session;

use super::{print_outcome, resolve_id};

pub async fn run(session: &mut Session, id: &str) -> Result<()> {
    let Some(user_id) = session.scheduler().user().map(|u| u.id.clone()) else {
        anyhow::bail!("Set up a profile first: legend profile --id <id> --name <name>");
    };
    let id = resolve_id(session, id)?;

    let outcome = session
        .scheduler_mut()
        .toggle_engagement(&id, &user_id)
        .await?;
    print_outcome(outcome);
    Ok(())
}

use anyhow::Result;
use legend_core::Session;

use super::{print_outcome, resolve_id};

pub async fn run(session: &mut Session, id: &str) -> Result<()> {
    let id = resolve_id(session, id)?;
    let outcome = session.scheduler_mut().delete_event(&id).await?;
    print_outcome(outcome);
    Ok(())
}

use anyhow::Result;
use legend_core::{LegendConfig, LegendError, Session, UserProfile};

use crate::render::pluralize;

pub async fn run(
    session: &mut Session,
    mut config: LegendConfig,
    id: Option<String>,
    name: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let current = config.profile.clone();
    let Some(id) = id.or_else(|| current.as_ref().map(|p| p.id.clone())) else {
        anyhow::bail!("A profile needs an id: legend profile --id <id> --name <name>");
    };
    let same_user = current.as_ref().filter(|p| p.id == id);

    let profile = UserProfile {
        name: name
            .or_else(|| same_user.map(|p| p.name.clone()))
            .unwrap_or_else(|| id.clone()),
        color: color.or_else(|| same_user.and_then(|p| p.color.clone())),
        id,
    };
    let restamp = same_user.is_some_and(|p| *p != profile);

    config.profile = Some(profile.clone());
    config.save()?;
    println!("Saved profile for {}", profile.name);

    if !restamp {
        return Ok(());
    }

    let result = session
        .scheduler_mut()
        .update_user_entries(&profile.id, &profile.name, profile.color.as_deref())
        .await;
    match result {
        Ok(count) => {
            println!("Updated {} {}", count, pluralize("event", count));
            Ok(())
        }
        // Already reported; the profile itself is saved
        Err(LegendError::RequiresConnection(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

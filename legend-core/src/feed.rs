//! Change feed subscriber.
//!
//! Holds the live [`Subscription`] while online and drops it while offline;
//! the scheduler's post-replay fetch covers anything missed in between.

use crate::error::LegendResult;
use crate::remote::{ChangeEvent, RemoteStore, Subscription};

#[derive(Default)]
pub struct ChangeFeed {
    subscription: Option<Subscription>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Drop any current subscription and open a fresh one.
    pub async fn resubscribe(&mut self, remote: &dyn RemoteStore) -> LegendResult<()> {
        self.pause();
        self.subscription = Some(remote.subscribe().await?);
        tracing::debug!("subscribed to change feed");
        Ok(())
    }

    pub fn pause(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("unsubscribed from change feed");
        }
    }

    /// Wait for the next change. Never resolves while paused; resolves to
    /// `None` once when the store closes the feed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };
        let change = subscription.recv().await;
        if change.is_none() {
            tracing::debug!("change feed closed by the remote store");
            self.subscription = None;
        }
        change
    }
}

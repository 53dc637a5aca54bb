//! Online/offline tracking.
//!
//! The runtime's network-status facility is abstracted as a
//! [`ConnectivityProbe`]. The monitor publishes transitions on a watch
//! channel; the session reacts to them by replaying queued actions and
//! (re)subscribing to the change feed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("online"),
            Connectivity::Offline => f.write_str("offline"),
        }
    }
}

pub trait ConnectivityProbe: Send + Sync {
    fn current(&self) -> Connectivity;
}

impl<F> ConnectivityProbe for F
where
    F: Fn() -> Connectivity + Send + Sync,
{
    fn current(&self) -> Connectivity {
        self()
    }
}

/// A probe that always answers the same, for forced modes.
pub struct Fixed(pub Connectivity);

impl ConnectivityProbe for Fixed {
    fn current(&self) -> Connectivity {
        self.0
    }
}

pub struct ConnectivityMonitor {
    tx: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    /// Start from the probe's current answer rather than assuming online.
    pub fn new(probe: &dyn ConnectivityProbe) -> Self {
        let (tx, _) = watch::channel(probe.current());
        ConnectivityMonitor { tx }
    }

    pub fn starting_as(status: Connectivity) -> Self {
        let (tx, _) = watch::channel(status);
        ConnectivityMonitor { tx }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }

    /// Feed in a status reported by the runtime. Only changes wake receivers.
    pub fn report(&self, status: Connectivity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::debug!(%status, "connectivity changed");
        }
        changed
    }

    /// Poll `probe` every `interval` and report what it says.
    pub fn spawn_polling(
        self: Arc<Self>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.report(probe.current());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_initial_state_comes_from_probe() {
        let monitor = ConnectivityMonitor::new(&Fixed(Connectivity::Offline));
        assert_eq!(monitor.current(), Connectivity::Offline);
    }

    #[tokio::test]
    async fn test_only_transitions_wake_receivers() {
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Online);
        let mut rx = monitor.subscribe();

        assert!(!monitor.report(Connectivity::Online));
        assert!(!rx.has_changed().unwrap());

        assert!(monitor.report(Connectivity::Offline));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connectivity::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_picks_up_probe_changes() {
        let up = Arc::new(AtomicBool::new(false));
        let probe_up = up.clone();
        let probe: Arc<dyn ConnectivityProbe> = Arc::new(move || {
            if probe_up.load(Ordering::SeqCst) {
                Connectivity::Online
            } else {
                Connectivity::Offline
            }
        });

        let monitor = Arc::new(ConnectivityMonitor::new(probe.as_ref()));
        let mut rx = monitor.subscribe();
        let handle = monitor.clone().spawn_polling(probe, Duration::from_secs(1));

        up.store(true, Ordering::SeqCst);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Connectivity::Online);
        handle.abort();
    }
}

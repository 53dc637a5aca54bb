//! Offline-first sync engine for a shared weekly schedule.
//!
//! The crate is organised around a [`Scheduler`] that owns the in-memory event
//! list for one user:
//! - [`layout`] assigns overlapping events of a day to side-by-side columns
//! - [`cache`] persists events and pending actions per user
//! - [`remote`] is the authoritative store and its change feed
//! - [`queue`] holds mutations made offline until they can be replayed
//! - [`connectivity`] reports online/offline transitions
//! - [`session`] ties the scheduler to connectivity and the change feed
//! - [`reminder`] announces events that are about to start

pub mod cache;
pub mod config;
pub mod connectivity;
mod engine;
pub mod error;
pub mod event;
pub mod feed;
pub mod layout;
pub mod notify;
pub mod queue;
pub mod reminder;
pub mod remote;
pub mod session;

pub use config::LegendConfig;
pub use connectivity::{Connectivity, ConnectivityMonitor, ConnectivityProbe};
pub use engine::{ClearScope, MutationOutcome, ReplaySummary, Scheduler};
pub use error::{LegendError, LegendResult};
pub use event::{DayOfWeek, Event, EventDraft, EventId, EventPatch, UserProfile};
pub use session::{Session, SessionInput};

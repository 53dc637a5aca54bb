//! User-facing notices (the toast surface).

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn info(title: &str, detail: &str) -> Self {
        Notice::new(NoticeLevel::Info, title, detail)
    }

    pub fn success(title: &str, detail: &str) -> Self {
        Notice::new(NoticeLevel::Success, title, detail)
    }

    pub fn error(title: &str, detail: impl fmt::Display) -> Self {
        Notice::new(NoticeLevel::Error, title, &detail.to_string())
    }

    fn new(level: NoticeLevel, title: &str, detail: &str) -> Self {
        Notice {
            level,
            title: title.to_string(),
            detail: Some(detail.to_string()).filter(|d| !d.is_empty()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.title, detail),
            None => f.write_str(&self.title),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices into the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!("{notice}"),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{notice}"),
        }
    }
}

/// Keeps every notice for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

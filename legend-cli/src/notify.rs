use legend_core::notify::{Notice, NoticeLevel, Notifier};
use owo_colors::OwoColorize;

/// Prints notices to stderr so they never mix with command output.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, "{notice}");

        let title = match notice.level {
            NoticeLevel::Success => notice.title.green().to_string(),
            NoticeLevel::Info => notice.title.blue().to_string(),
            NoticeLevel::Error => notice.title.red().to_string(),
        };
        match &notice.detail {
            Some(detail) => eprintln!("{} {}", title, detail.dimmed()),
            None => eprintln!("{title}"),
        }
    }
}

//! TUI rendering traits for legend types.
//!
//! Extension traits that add colored terminal rendering to legend-core types
//! using owo_colors.

use legend_core::layout::Placement;
use legend_core::queue::QueuedAction;
use legend_core::{Connectivity, DayOfWeek, Event};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Connectivity {
    fn render(&self) -> String {
        match self {
            Connectivity::Online => format!("{} online", "●".green()),
            Connectivity::Offline => format!("{} offline", "○".red()),
        }
    }
}

impl Render for DayOfWeek {
    fn render(&self) -> String {
        self.name().bold().to_string()
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let time = format!(
            "{}-{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        );
        let mut line = format!("{} {}", time.dimmed(), self.title);

        if let Some(owner) = render_owner(self) {
            line.push_str(&format!(" {owner}"));
        }
        if !self.engaging_user_ids.is_empty() {
            let joined = format!("+{}", self.engaging_user_ids.len());
            line.push_str(&format!(" {}", joined.cyan()));
        }
        if self.id.is_temporary() {
            line.push_str(&format!(" {}", "(unsynced)".yellow()));
        }
        line
    }
}

impl Render for QueuedAction {
    fn render(&self) -> String {
        let label = match self {
            QueuedAction::Add { .. } => "+".green().to_string(),
            QueuedAction::Update { .. } => "~".yellow().to_string(),
            QueuedAction::Delete { .. } => "-".red().to_string(),
            QueuedAction::ToggleEngagement { .. } => "*".cyan().to_string(),
        };
        match self {
            QueuedAction::Add { event } => format!("{} {} {}", label, event.day, event.render()),
            other => format!("{} {} {}", label, other.label(), other.event_id().dimmed()),
        }
    }
}

/// Owner name in the owner's color, or "general".
fn render_owner(event: &Event) -> Option<String> {
    if event.is_general() {
        return Some("general".dimmed().to_string());
    }
    let name = event.owner_name.as_deref()?;
    Some(match event.owner_color.as_deref().and_then(parse_hex) {
        Some((r, g, b)) => name.truecolor(r, g, b).to_string(),
        None => name.magenta().to_string(),
    })
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Render one day as lanes: overlapping events are indented by column so a
/// cluster reads side by side.
pub fn render_day(day: DayOfWeek, placed: &[(&Event, Placement)]) -> String {
    let mut lines = vec![day.render()];

    if placed.is_empty() {
        lines.push("   No events".dimmed().to_string());
        return lines.join("\n");
    }

    let mut order: Vec<&(&Event, Placement)> = placed.iter().collect();
    order.sort_by_key(|(event, placement)| (event.start_time, placement.column));

    for (event, placement) in order {
        let indent = "    ".repeat(placement.column);
        let lane = if placement.column_count > 1 {
            format!("[{}/{}]", placement.column + 1, placement.column_count)
                .dimmed()
                .to_string()
        } else {
            String::new()
        };
        lines.push(format!(
            "   {}{} {} {}",
            indent,
            event.render(),
            lane,
            event.id.as_str().dimmed()
        ));
    }

    lines.join("\n")
}

/// Simple pluralization helper
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#3b82f6"), Some((0x3b, 0x82, 0xf6)));
        assert_eq!(parse_hex("3b82f6"), None);
        assert_eq!(parse_hex("#fff"), None);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("event", 1), "event");
        assert_eq!(pluralize("event", 3), "events");
    }
}

//! Terminal rendering of sessions and transcripts

use crate::storage::{ChatMessage, ChatSession, Sender};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use prettytable::{format, Table};

const MAX_NAME_CHARS: usize = 40;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Sidebar-style date of last activity
///
/// Day counts are rounded up, so anything within the last 24 hours is
/// "Today" and the next 24 hours "Yesterday". Up to a week old shows
/// "N days ago"; older dates are shown as a calendar date.
///
/// # Examples
///
/// ```
/// use chatbook::commands::render::format_relative;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert_eq!(format_relative(now - Duration::hours(3), now), "Today");
/// assert_eq!(format_relative(now - Duration::hours(30), now), "Yesterday");
/// assert_eq!(format_relative(now - Duration::hours(80), now), "3 days ago");
/// ```
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - ts).num_milliseconds().abs();
    let diff_days = (diff_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;

    match diff_days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        d if d <= 7 => format!("{} days ago", d - 1),
        _ => ts.with_timezone(&Local).format("%Y-%m-%d").to_string(),
    }
}

fn truncate(name: &str) -> String {
    if name.chars().count() > MAX_NAME_CHARS {
        let head: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Short form of an id for listings
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Numbered session table; the active session is marked with `*`
pub fn sessions_table(sessions: &[ChatSession], active: Option<&str>, now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "#".bold(),
        "ID".bold(),
        "Name".bold(),
        "Last Active".bold()
    ]);

    for (idx, session) in sessions.iter().enumerate() {
        let marker = if active == Some(session.id.as_str()) {
            format!("*{}", idx + 1).green().bold()
        } else {
            format!(" {}", idx + 1).normal()
        };
        table.add_row(prettytable::row![
            marker,
            short_id(&session.id).cyan(),
            truncate(&session.name),
            format_relative(session.updated_at, now)
        ]);
    }

    table
}

/// Print the session list, or a hint when there is none
pub fn print_sessions(sessions: &[ChatSession], active: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No chat sessions yet.".yellow());
        return;
    }

    println!("\nChat Sessions:");
    sessions_table(sessions, active, Utc::now()).printstd();
    println!();
}

/// Print one message with a sender label
pub fn print_message(message: &ChatMessage) {
    let label = match message.sender {
        Sender::User => "You".cyan().bold(),
        Sender::Bot => "Assistant".magenta().bold(),
    };
    println!("{}: {}\n", label, message.message);
}

/// Print a whole transcript, or the empty-state hint
pub fn print_transcript(session: Option<&ChatSession>, messages: &[ChatMessage]) {
    match session {
        Some(session) => println!("{} {}\n", "Session:".bold(), session.name),
        None => println!("{}\n", "New chat".bold()),
    }

    if messages.is_empty() {
        println!(
            "{}\n",
            "Start a new conversation. Ask me anything and I'll help you out!".dimmed()
        );
        return;
    }
    for message in messages {
        print_message(message);
    }
}

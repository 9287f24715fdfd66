//! Audit-log classification: maps free-text action strings onto a fixed
//! taxonomy so every row gets a stable color, tag, and filter bucket.

use ratatui::style::Color;

use crate::types::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Error,
    Success,
    Connection,
    Disconnect,
    Reconnect,
    Auth,
    Dns,
    Billing,
    Security,
    Collection,
    Info,
}

/// Ordered rule table; earlier rows win. Failure signals outrank routine
/// operation signals, which is why `error` keywords sit first: an action
/// like "Meter collection failed: timeout" must triage red, not as routine
/// collection traffic.
const RULES: &[(LogCategory, &[&str])] = &[
    (LogCategory::Error, &["error", "failure", "timeout", "exhausted"]),
    (LogCategory::Disconnect, &["disconnect", "closed", "stopped"]),
    (LogCategory::Reconnect, &["reconnect", "restart", "port change"]),
    (
        LogCategory::Connection,
        &["connect", "started", "ready", "listener", "initialized"],
    ),
    (LogCategory::Auth, &["auth", "token", "login", "password", "key"]),
    (LogCategory::Dns, &["dns", "resolve", "cloud host"]),
    (LogCategory::Billing, &["billing", "invoice", "export", "backup"]),
    (LogCategory::Security, &["security", "login_failed", "login_success"]),
    (
        LogCategory::Collection,
        &["collection", "reading", "session", "meter"],
    ),
    (
        LogCategory::Success,
        &["success", "complete", "restored", "generated"],
    ),
];

/// Total and deterministic: first matching rule wins, anything unmatched is
/// `Info`. Matching is case-insensitive substring.
pub fn classify(action: &str) -> LogCategory {
    let needle = action.to_ascii_lowercase();
    for (category, keywords) in RULES {
        if keywords.iter().any(|k| needle.contains(k)) {
            return *category;
        }
    }
    LogCategory::Info
}

impl LogCategory {
    /// All categories in rule-priority order, `Info` last. Drives the
    /// filter key row in the log panel.
    pub const ALL: [LogCategory; 11] = [
        LogCategory::Error,
        LogCategory::Disconnect,
        LogCategory::Reconnect,
        LogCategory::Connection,
        LogCategory::Auth,
        LogCategory::Dns,
        LogCategory::Billing,
        LogCategory::Security,
        LogCategory::Collection,
        LogCategory::Success,
        LogCategory::Info,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            LogCategory::Error => "ERR",
            LogCategory::Success => "OK ",
            LogCategory::Connection => "CON",
            LogCategory::Disconnect => "DIS",
            LogCategory::Reconnect => "RCN",
            LogCategory::Auth => "AUT",
            LogCategory::Dns => "DNS",
            LogCategory::Billing => "BIL",
            LogCategory::Security => "SEC",
            LogCategory::Collection => "COL",
            LogCategory::Info => "INF",
        }
    }

    pub fn color(self) -> Color {
        match self {
            LogCategory::Error => Color::Red,
            LogCategory::Success => Color::Green,
            LogCategory::Connection => Color::Cyan,
            LogCategory::Disconnect => Color::Yellow,
            LogCategory::Reconnect => Color::LightYellow,
            LogCategory::Auth => Color::Magenta,
            LogCategory::Dns => Color::LightBlue,
            LogCategory::Billing => Color::LightGreen,
            LogCategory::Security => Color::LightRed,
            LogCategory::Collection => Color::Blue,
            LogCategory::Info => Color::Gray,
        }
    }
}

/// Per-category row counts for the filter header.
pub fn count_by_category(entries: &[LogEntry]) -> Vec<(LogCategory, usize)> {
    LogCategory::ALL
        .iter()
        .map(|&c| (c, entries.iter().filter(|e| classify(&e.action) == c).count()))
        .collect()
}

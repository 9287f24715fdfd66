//! Classifier totality and rule-priority behavior.

use chrono::Utc;
use gridtop::logs::{classify, count_by_category, LogCategory};
use gridtop::types::LogEntry;

#[test]
fn failure_signals_outrank_routine_collection() {
    assert_eq!(classify("Meter collection failed: timeout"), LogCategory::Error);
}

#[test]
fn error_keyword_beats_success_keyword() {
    assert_eq!(classify("Invoice export complete with error"), LogCategory::Error);
    assert_eq!(classify("session restore error"), LogCategory::Error);
}

#[test]
fn matching_is_case_insensitive() {
    assert_eq!(classify("DNS RESOLVE OK"), LogCategory::Dns);
    assert_eq!(classify("TIMEOUT waiting for meter"), LogCategory::Error);
}

#[test]
fn disconnect_and_reconnect_outrank_plain_connection() {
    // All three contain "connect"; order decides
    assert_eq!(classify("UDP listener disconnected"), LogCategory::Disconnect);
    assert_eq!(classify("Reconnect after port change"), LogCategory::Reconnect);
    assert_eq!(classify("Collector connected"), LogCategory::Connection);
}

#[test]
fn each_category_is_reachable() {
    assert_eq!(classify("charger exhausted retry budget"), LogCategory::Error);
    assert_eq!(classify("collector stopped"), LogCategory::Disconnect);
    assert_eq!(classify("service restart"), LogCategory::Reconnect);
    assert_eq!(classify("UDP listener ready"), LogCategory::Connection);
    assert_eq!(classify("api token rotated"), LogCategory::Auth);
    assert_eq!(classify("cloud host lookup via dns"), LogCategory::Dns);
    assert_eq!(classify("invoice generated for tenant"), LogCategory::Billing);
    assert_eq!(classify("security review entry"), LogCategory::Security);
    assert_eq!(classify("reading from meter 12"), LogCategory::Collection);
    assert_eq!(classify("wizard run complete"), LogCategory::Success);
    assert_eq!(classify("lorem ipsum dolor"), LogCategory::Info);
}

#[test]
fn unmatched_strings_fall_back_to_info_never_panic() {
    for s in ["", "   ", "🤷", "zzzz", "42", "-\n-"] {
        // Totality: some category always comes back
        let _ = classify(s);
    }
    assert_eq!(classify(""), LogCategory::Info);
}

#[test]
fn classification_is_deterministic() {
    for s in ["backup failure", "meter reading", "login ok", "noise"] {
        assert_eq!(classify(s), classify(s));
    }
}

#[test]
fn category_counts_cover_every_entry_exactly_once() {
    let actions = [
        "Meter collection failed: timeout",
        "Backup completed",
        "UDP listener started",
        "something unclassifiable",
        "dns resolve slow",
    ];
    let entries: Vec<LogEntry> = actions
        .iter()
        .enumerate()
        .map(|(i, a)| LogEntry {
            id: i as u64,
            created_at: Utc::now(),
            action: a.to_string(),
            details: None,
            ip_address: None,
        })
        .collect();
    let counts = count_by_category(&entries);
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    assert_eq!(total, entries.len());
}

//! Merge/trim invariants of the bounded health history.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gridtop::history::{
    FileHistoryRepository, HealthHistory, HistoryRepository, MemoryHistoryRepository, MAX_POINTS,
};
use gridtop::types::HealthSample;

// Divisible by 10 so bucket rounding is unambiguous in the tests below
const BASE_SECS: i64 = 1_760_000_000;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn sample(ts: DateTime<Utc>, cpu: f32) -> HealthSample {
    HealthSample {
        timestamp: ts,
        cpu_percent: cpu,
        memory_percent: 40.0,
        memory_used_bytes: 800,
        memory_total_bytes: 2000,
        disk_percent: 60.0,
        disk_used_bytes: 1200,
        disk_total_bytes: 2000,
        temperature_celsius: 45.0,
        uptime_label: "1d 2h".into(),
    }
}

fn assert_invariants(h: &HealthHistory, now: DateTime<Utc>) {
    let pts = h.points();
    assert!(pts.len() <= MAX_POINTS);
    for w in pts.windows(2) {
        assert!(w[0].timestamp < w[1].timestamp, "history must stay sorted");
    }
    let cutoff = now - Duration::hours(24);
    assert!(pts.iter().all(|p| p.timestamp >= cutoff));
}

#[test]
fn merging_identical_sample_twice_is_idempotent() {
    let now = at(BASE_SECS);
    let mut h = HealthHistory::default();
    let s = sample(now, 10.0);
    h.merge_live(&s, now);
    h.merge_live(&s, now);
    assert_eq!(h.len(), 1);
}

#[test]
fn near_duplicate_in_same_bucket_is_dropped_first_writer_wins() {
    let now = at(BASE_SECS + 3);
    let mut h = HealthHistory::default();
    h.merge_live(&sample(at(BASE_SECS), 10.0), now);
    // 3s later, same 10s bucket: dropped, first sample kept
    h.merge_live(&sample(at(BASE_SECS + 3), 99.0), now);
    assert_eq!(h.len(), 1);
    assert_eq!(h.points()[0].cpu_percent, 10.0);
    // Next bucket is accepted
    h.merge_live(&sample(at(BASE_SECS + 10), 20.0), now);
    assert_eq!(h.len(), 2);
}

#[test]
fn count_stays_bounded_under_long_merge_sequences() {
    let mut h = HealthHistory::default();
    let mut now = at(BASE_SECS);
    for i in 0..700 {
        now = at(BASE_SECS + i * 60);
        h.merge_live(&sample(now, 5.0), now);
        assert_invariants(&h, now);
    }
    assert_eq!(h.len(), MAX_POINTS);
    // Tail retention: the newest sample survives
    assert_eq!(h.last().unwrap().timestamp, now);
}

#[test]
fn points_older_than_the_window_are_trimmed() {
    let now = at(BASE_SECS);
    let mut h = HealthHistory::seed(
        &[
            sample(now - Duration::hours(25), 1.0),
            sample(now - Duration::hours(2), 2.0),
        ],
        now,
    );
    assert_eq!(h.len(), 1);
    h.merge_live(&sample(now, 3.0), now);
    assert_eq!(h.len(), 2);
    assert_invariants(&h, now);
}

#[test]
fn full_24h_span_is_inclusive() {
    // Seed at T-23h59m plus a live sample at T: both remain, in order
    let t = at(BASE_SECS);
    let old = t - Duration::hours(23) - Duration::minutes(59);
    let mut h = HealthHistory::seed(&[sample(old, 7.0)], t);
    h.merge_live(&sample(t, 8.0), t);
    let pts = h.points();
    assert_eq!(pts.len(), 2);
    assert_eq!(pts[0].timestamp, old);
    assert_eq!(pts[1].timestamp, t);
}

#[test]
fn seed_sorts_and_deduplicates_unordered_backfill() {
    let now = at(BASE_SECS);
    let h = HealthHistory::seed(
        &[
            sample(at(BASE_SECS - 100), 3.0),
            sample(at(BASE_SECS - 300), 1.0),
            sample(at(BASE_SECS - 200), 2.0),
            // same bucket as the -300 sample
            sample(at(BASE_SECS - 298), 9.0),
        ],
        now,
    );
    let cpus: Vec<f32> = h.points().iter().map(|p| p.cpu_percent).collect();
    assert_eq!(cpus, vec![1.0, 2.0, 3.0]);
    assert_invariants(&h, now);
}

#[test]
fn out_of_order_live_merge_keeps_history_sorted() {
    let now = at(BASE_SECS);
    let mut h = HealthHistory::default();
    h.merge_live(&sample(at(BASE_SECS - 60), 2.0), now);
    h.merge_live(&sample(at(BASE_SECS - 600), 1.0), now);
    h.merge_live(&sample(at(BASE_SECS), 3.0), now);
    let cpus: Vec<f32> = h.points().iter().map(|p| p.cpu_percent).collect();
    assert_eq!(cpus, vec![1.0, 2.0, 3.0]);
    assert_invariants(&h, now);
}

#[test]
fn memory_repository_round_trip() {
    let now = at(BASE_SECS);
    let mut h = HealthHistory::default();
    h.merge_live(&sample(now, 12.0), now);
    let repo = MemoryHistoryRepository::default();
    repo.save(&h).unwrap();
    assert_eq!(repo.load().len(), 1);
}

#[test]
fn corrupt_cache_file_loads_as_empty() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("history.json");
    std::fs::write(&path, "{not json").unwrap();
    let repo = FileHistoryRepository::new(path.clone());
    assert!(repo.load().is_empty());

    // And a valid save round-trips through the same path
    let now = at(BASE_SECS);
    let mut h = HealthHistory::default();
    h.merge_live(&sample(now, 12.0), now);
    repo.save(&h).unwrap();
    assert_eq!(repo.load().len(), 1);
}

#[test]
fn missing_cache_file_loads_as_empty() {
    let td = tempfile::tempdir().unwrap();
    let repo = FileHistoryRepository::new(td.path().join("nope.json"));
    assert!(repo.load().is_empty());
}

//! Benchmarks for merged-view reconciliation.
//!
//! Large properties carry a few thousand tenants. `reconcile` scans the
//! thread list once per roster tenant, so these groups track how that scan
//! grows with roster size and with the share of tenants that already have a
//! thread.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use parley_chat::store::{merge_after_refresh, reconcile};
use parley_chat::types::{normalize_threads, ConversationEntry, ThreadRecord};
use parley_core::{Tenant, TenantId, ThreadId};

/// Roster of `size` tenants, every other one with a display name.
fn generate_roster(size: usize) -> Vec<Tenant> {
    (0..size as i64)
        .map(|i| {
            let tenant = Tenant::new(i);
            if i % 2 == 0 {
                tenant.with_name(format!("Tenant Name {}", i))
            } else {
                tenant
            }
        })
        .collect()
}

/// Threads for `percent` of the roster, in reverse roster order, plus a
/// handful of orphans.
fn generate_threads(size: usize, percent: usize) -> Vec<ConversationEntry> {
    let with_thread = size * percent / 100;
    let mut records: Vec<ThreadRecord> = (0..with_thread as i64)
        .rev()
        .map(|i| ThreadRecord {
            id: Some(ThreadId(10_000 + i)),
            tenant_id: Some(TenantId(i)),
            ..ThreadRecord::default()
        })
        .collect();
    records.extend((0..10).map(|i| ThreadRecord {
        id: Some(ThreadId(90_000 + i)),
        tenant_id: Some(TenantId(1_000_000 + i)),
        ..ThreadRecord::default()
    }));
    normalize_threads(records, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
}

fn bench_reconcile(c: &mut Criterion) {
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    let mut group = c.benchmark_group("reconcile");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1_000, 5_000] {
        let roster = generate_roster(size);

        // Benchmark: half the tenants already have a thread
        let threads = generate_threads(size, 50);
        group.bench_with_input(BenchmarkId::new("half_bound", size), &size, |b, _| {
            b.iter(|| reconcile(black_box(&roster), black_box(&threads), now));
        });

        // Benchmark: every tenant has a thread
        let threads = generate_threads(size, 100);
        group.bench_with_input(BenchmarkId::new("all_bound", size), &size, |b, _| {
            b.iter(|| reconcile(black_box(&roster), black_box(&threads), now));
        });
    }

    group.finish();
}

fn bench_merge_after_refresh(c: &mut Criterion) {
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let roster = generate_roster(1_000);
    let previous = reconcile(&roster, &generate_threads(1_000, 50), now);
    let refreshed = generate_threads(1_000, 10);

    c.bench_function("merge_after_refresh_1000", |b| {
        b.iter(|| merge_after_refresh(black_box(&previous), black_box(&refreshed)));
    });
}

criterion_group!(benches, bench_reconcile, bench_merge_after_refresh);
criterion_main!(benches);

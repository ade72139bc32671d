//! Reconciliation pass over an in-memory store
//!
//! - `initial_load`: empty target, every record is a create
//! - `steady_state`: target already converged, every record is unchanged
//! - `partial_update`: one record in ten carries a changed price

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;

use poster_sync::application::Reconciler;
use poster_sync::domain::{normalize, SourceRecord, StoredProduct};
use poster_sync::infrastructure::{InMemoryProductStore, InMemorySource};

const CATEGORIES: [&str; 4] = ["movies", "Music", "anime", "SPORTS"];

fn records(count: usize) -> Vec<SourceRecord> {
    (0..count)
        .map(|i| {
            SourceRecord::new(
                format!("poster-{i:05}"),
                json!({
                    "name": format!("Poster #{i}"),
                    "description": "50x70 matte print",
                    "price": 9.99 + (i % 40) as f64,
                    "image": format!("https://cdn.example.com/{i}.jpg"),
                    "category": CATEGORIES[i % CATEGORIES.len()],
                }),
            )
        })
        .collect()
}

fn converged_rows(records: &[SourceRecord], stale_every: usize) -> Vec<StoredProduct> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            let mut product = normalize(&r.raw, &r.identifier).ok()?;
            if stale_every > 0 && i % stale_every == 0 {
                product.price += 1.0;
            }
            Some(StoredProduct::from_canonical(&product, Utc::now()))
        })
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let reconciler = Reconciler::default();
    let mut group = c.benchmark_group("reconcile");

    for size in [100usize, 1_000, 5_000] {
        let source = InMemorySource::new(records(size));
        let fresh = records(size);

        group.bench_with_input(BenchmarkId::new("initial_load", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let store = InMemoryProductStore::default();
                black_box(reconciler.run(&source, &store).await.unwrap())
            });
        });

        let converged = converged_rows(&fresh, 0);
        group.bench_with_input(BenchmarkId::new("steady_state", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let store = InMemoryProductStore::with_rows(converged.clone());
                black_box(reconciler.run(&source, &store).await.unwrap())
            });
        });

        let stale = converged_rows(&fresh, 10);
        group.bench_with_input(BenchmarkId::new("partial_update", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let store = InMemoryProductStore::with_rows(stale.clone());
                black_box(reconciler.run(&source, &store).await.unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);

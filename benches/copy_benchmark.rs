//! Performance benchmarks for Pathman
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pathman::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Store with `count` objects of `size` bytes under `data/`, spread over subdirectories
fn populated_store(count: usize, size: usize, get_delay: Option<Duration>) -> Arc<MemoryObjectStore> {
    let mut store = MemoryObjectStore::new().with_page_size(100);
    if let Some(delay) = get_delay {
        store = store.with_get_delay(delay);
    }
    let payload: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    for i in 0..count {
        store.insert("bench", &format!("data/d{}/file_{}.bin", i % 10, i), payload.clone());
    }
    Arc::new(store)
}

fn bench_recursive_download(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("recursive_download");
    group.sample_size(10);

    for count in [100usize, 1000].iter() {
        let store = populated_store(*count, 1024, None);
        let storage = Storage::new(store);
        group.throughput(Throughput::Bytes((*count * 1024) as u64));

        group.bench_with_input(BenchmarkId::new("objects", count), count, |b, _| {
            b.to_async(&runtime).iter(|| async {
                let dest = TempDir::new().unwrap();
                let dest_path = PathHandle::new(dest.path().to_string_lossy().into_owned());
                let report = copy(&storage, &"s3://bench/data".into(), &dest_path, CopyOptions::default())
                    .await
                    .unwrap();
                black_box(report)
            });
        });
    }

    group.finish();
}

fn bench_concurrency(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("download_concurrency");
    group.sample_size(10);

    // latency-bound gets, where the worker count matters
    let storage = Storage::new(populated_store(200, 64, Some(Duration::from_millis(2))));

    for workers in [1usize, 8, 32].iter() {
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
            b.to_async(&runtime).iter(|| async {
                let dest = TempDir::new().unwrap();
                let dest_path = PathHandle::new(dest.path().to_string_lossy().into_owned());
                let options = CopyOptions::default().with_max_concurrency(workers);
                black_box(copy(&storage, &"s3://bench/data".into(), &dest_path, options).await.unwrap())
            });
        });
    }

    group.finish();
}

fn bench_path_classification(c: &mut Criterion) {
    let paths: Vec<PathHandle> = (0..1000)
        .map(|i| match i % 3 {
            0 => PathHandle::new(format!("s3://bucket/logs/2024/part-{}.parquet", i)),
            1 => PathHandle::new(format!("s3://bucket/logs/2024/dir{}", i)),
            _ => PathHandle::new(format!("/data/run{}/out.csv", i)),
        })
        .collect();

    c.bench_function("classify_1000_paths", |b| {
        b.iter(|| {
            let files = paths.iter().filter(|p| p.is_file_shaped()).count();
            let remote = paths.iter().filter(|p| p.is_object_store()).count();
            black_box((files, remote))
        });
    });

    c.bench_function("join_and_split_1000_paths", |b| {
        b.iter(|| {
            for path in &paths {
                let joined = path.join(["sub", "leaf.txt"]);
                black_box(joined.parts().len());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_recursive_download,
    bench_concurrency,
    bench_path_classification,
);
criterion_main!(benches);

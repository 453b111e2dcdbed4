//! Benchmark suite for csvliner read throughput
//!
//! Measures:
//! - Bounded read throughput (MB/s) for plain and quoted data
//! - The effect of projection on decode cost
//! - DataFrame building on top of row decoding
//!
//! # Configuration
//!
//! Benchmark behavior can be configured via environment variables:
//!
//! - `BENCH_SAMPLE_SIZE`: Number of samples to collect (default: 100)
//! - `BENCH_MEASUREMENT_TIME`: Measurement time in seconds (default: 5)
//! - `BENCH_WARM_UP_TIME`: Warm-up time in seconds (default: 3)
//! - `BENCH_ROWS`: Rows in the generated input (default: 100000)
//!
//! ```bash
//! BENCH_SAMPLE_SIZE=20 BENCH_ROWS=10000 cargo bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use csvliner::{
    CsvSource, FieldType, FormatConfig, MemorySource, ReadOptions, SharedSource,
};

/// Helper to run async code in benchmarks
fn run_async<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("Warning: Invalid {} value: {}", name, raw);
            None
        }
    }
}

/// Configure Criterion based on environment variables
fn configure_criterion() -> Criterion {
    let mut criterion = Criterion::default();
    if let Some(size) = env_parse::<usize>("BENCH_SAMPLE_SIZE") {
        criterion = criterion.sample_size(size);
    }
    if let Some(secs) = env_parse::<u64>("BENCH_MEASUREMENT_TIME") {
        criterion = criterion.measurement_time(Duration::from_secs(secs));
    }
    if let Some(secs) = env_parse::<u64>("BENCH_WARM_UP_TIME") {
        criterion = criterion.warm_up_time(Duration::from_secs(secs));
    }
    criterion
}

fn bench_rows() -> usize {
    env_parse("BENCH_ROWS").unwrap_or(100_000)
}

/// Generate `rows` records of an event log: id, user, amount, day, note.
fn generate(rows: usize, quoted: bool) -> Vec<u8> {
    let mut data = String::from("id,user,amount,day,note\n");
    for i in 0..rows {
        let note = if quoted {
            format!("\"item {}, \"\"batch\"\" {}\"", i, i % 17)
        } else {
            format!("item-{}", i)
        };
        data.push_str(&format!(
            "{},user{},{}.{:02},2024-{:02}-{:02},{}\n",
            i,
            i % 1000,
            i % 5000,
            i % 100,
            i % 12 + 1,
            i % 28 + 1,
            note
        ));
    }
    data.into_bytes()
}

fn make_source(data: &[u8], target_partitions: usize) -> CsvSource {
    let bytes: SharedSource = Arc::new(MemorySource::new(data));
    CsvSource::with_fields(
        bytes,
        ["id", "user", "amount", "day", "note"],
        vec![
            FieldType::Int64,
            FieldType::String,
            FieldType::Float64,
            FieldType::Date,
            FieldType::String,
        ],
        FormatConfig::new()
            .with_quote('"')
            .with_skip_first_line(true),
    )
    .unwrap()
    .with_options(ReadOptions::new().with_target_partitions(target_partitions))
    .unwrap()
}

async fn count_rows(source: &CsvSource) -> u64 {
    let mut reader = source.open_bounded().await.unwrap();
    while let Some(row) = reader.next_row().await.unwrap() {
        black_box(&row);
    }
    reader.stats().rows
}

/// Plain vs quoted input, with the file split into partitions or not.
fn bench_bounded_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_read");
    let rows = bench_rows();

    for (label, quoted) in [("plain", false), ("quoted", true)] {
        let data = generate(rows, quoted);
        group.throughput(Throughput::Bytes(data.len() as u64));

        for partitions in [1, 4] {
            let source = make_source(&data, partitions);
            assert_eq!(run_async(count_rows(&source)), rows as u64);

            group.bench_with_input(
                BenchmarkId::new(label, format!("{}_partitions", partitions)),
                &source,
                |b, source| b.iter(|| run_async(count_rows(source))),
            );
        }
    }

    group.finish();
}

/// Decoding fewer columns skips their coercion.
fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let data = generate(bench_rows(), true);
    group.throughput(Throughput::Bytes(data.len() as u64));

    let full = make_source(&data, 1);
    let projections: [(&str, &[usize]); 3] =
        [("all", &[0, 1, 2, 3, 4]), ("id_only", &[0]), ("reordered", &[3, 0])];

    for (label, indices) in projections {
        let source = full.with_projection(indices).unwrap();
        group.bench_with_input(BenchmarkId::new("read", label), &source, |b, source| {
            b.iter(|| run_async(count_rows(source)))
        });
    }

    group.finish();
}

/// Rows gathered into DataFrames of varying batch size.
fn bench_dataframes(c: &mut Criterion) {
    let mut group = c.benchmark_group("dataframes");
    let data = generate(bench_rows(), false);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for batch_size in [1_000, 10_000, 100_000] {
        let source = make_source(&data, 1)
            .with_options(ReadOptions::new().with_batch_size(batch_size))
            .unwrap();
        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &source,
            |b, source| {
                b.iter(|| {
                    run_async(async {
                        let mut reader = source.open_bounded().await.unwrap();
                        let mut height = 0;
                        while let Some(df) = reader.next_dataframe().await.unwrap() {
                            height += df.height();
                            black_box(&df);
                        }
                        height
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_bounded_read, bench_projection, bench_dataframes
}
criterion_main!(benches);

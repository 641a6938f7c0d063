//! Benchmark projecting strings columns into string views.
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use strand::device::{Stream, current_device_resource};
use strand::strings::{StringsColumn, create_string_vector_from_column, get_offset_value};

fn words(rows: usize) -> Vec<Option<String>> {
    (0..rows)
        .map(|row| (row % 13 != 0).then(|| "x".repeat(row % 32)))
        .collect()
}

fn string_views_project(c: &mut Criterion) {
    let stream = Stream::new();
    let mr = current_device_resource();
    let mut group = c.benchmark_group("string_views_project");
    for rows in [1_000usize, 100_000, 1_000_000] {
        let words = words(rows);
        let column =
            StringsColumn::from_strs(words.iter().map(Option::as_deref), &stream, &mr).unwrap();
        group.throughput(Throughput::Elements(u64::try_from(rows).unwrap()));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &column, |b, column| {
            b.iter(|| create_string_vector_from_column(&column.view(), &stream, &mr).unwrap());
        });
    }
    group.finish();
}

fn offset_value_read(c: &mut Criterion) {
    let stream = Stream::new();
    let mr = current_device_resource();
    let words = words(1_000);
    let column =
        StringsColumn::from_strs(words.iter().map(Option::as_deref), &stream, &mr).unwrap();
    c.bench_function("offset_value_read", |b| {
        b.iter(|| get_offset_value(&column.offsets().view(), 500, &stream).unwrap());
    });
}

criterion_group!(benches, string_views_project, offset_value_read);
criterion_main!(benches);

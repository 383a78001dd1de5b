//! Benchmarks for the diff engine
//!
//! Measures multiset comparison of wide column lists and whole-snapshot
//! comparison with many objects.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbdrift_core::{AttributeValue, CompareConfig, ObjectRecord, ObjectType, Snapshot};
use dbdrift_engine::DiffEngine;

fn column(i: usize) -> AttributeValue {
    AttributeValue::mapping([
        ("column", AttributeValue::from(format!("col_{}", i))),
        ("data_type", AttributeValue::from(if i % 3 == 0 { "int" } else { "varchar" })),
        ("nullable", AttributeValue::from(i % 2 == 0)),
    ])
}

/// Table with `width` columns; `reversed` lists them back to front
fn wide_table(width: usize, reversed: bool) -> ObjectRecord {
    let mut columns: Vec<AttributeValue> = (0..width).map(column).collect();
    if reversed {
        columns.reverse();
    }
    let mut record = ObjectRecord::new();
    record.insert("columns".to_string(), AttributeValue::Sequence(columns));
    record
}

fn snapshot_with_tables(tables: usize, width: usize, reversed: bool) -> Snapshot {
    let mut snapshot = Snapshot::with_capabilities([ObjectType::Table]);
    for t in 0..tables {
        snapshot.insert(
            ObjectType::Table,
            format!("public.table_{}", t),
            wide_table(width, reversed),
        );
    }
    snapshot
}

fn bench_wide_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiset_columns");
    let engine = DiffEngine::new(CompareConfig::default()).unwrap();

    for width in [100, 1_000, 10_000] {
        let source = snapshot_with_tables(1, width, false);
        let destination = snapshot_with_tables(1, width, true);

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| engine.compare(black_box(&source), black_box(&destination)).unwrap())
        });
    }

    group.finish();
}

fn bench_many_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_tables");
    let engine = DiffEngine::new(CompareConfig::default()).unwrap();

    for tables in [100, 1_000] {
        let source = snapshot_with_tables(tables, 20, false);
        let destination = snapshot_with_tables(tables, 20, true);

        group.bench_with_input(BenchmarkId::from_parameter(tables), &tables, |b, _| {
            b.iter(|| engine.compare(black_box(&source), black_box(&destination)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_wide_tables, bench_many_objects);
criterion_main!(benches);

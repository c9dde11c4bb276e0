use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use csv2db::hint::resolve;
use csv2db::schema::TableDefinition;

const HINTS: &[&str] = &[
    "INT",
    "VARCHAR(10)VARCHAR(20)VARCHAR(40)",
    "DATE(%Y-%m-%d)TIME(%Y-%m-%d)",
    "double float int decimal(10,2)",
    "garbage text here int",
    "DATETIME(%Y%m%d)",
];

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("hint_resolution");

    group.bench_function("resolve_mixed_hints", |b| {
        b.iter(|| {
            for hint in HINTS {
                let _ = black_box(resolve(black_box(hint)));
            }
        });
    });

    let columns = (0..64).map(|i| format!("col_{i}")).collect::<Vec<_>>();
    let hints = (0..64)
        .map(|i| HINTS[i % HINTS.len()].to_string())
        .collect::<Vec<_>>();
    group.bench_function("plan_wide_table", |b| {
        b.iter(|| black_box(TableDefinition::from_hints("wide", &columns, &hints)));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);

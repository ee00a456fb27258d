//! Benchmarks for result assembly.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use stagechain::pipeline::{OutcomeLog, ResultAssembler, StageOutcome};

fn sample_log(transactions: usize) -> OutcomeLog {
    let now = Utc::now();
    let rows: Vec<_> = (0..transactions)
        .map(|i| json!({"source": format!("Merchant {i}"), "amount": i * 10, "type": "debit", "date": "2024-01-05"}))
        .collect();

    vec![
        StageOutcome::succeeded("cleaner".into(), 1, json!({"cleaned_transactions": rows}), now, 1.0),
        StageOutcome::failed("preprocessor".into(), 3, "stage 'preprocessor' returned HTTP 503: unavailable", now, 2.0),
        StageOutcome::succeeded("normalizer".into(), 1, json!({"analysis": {"insights": []}}), now, 1.0),
    ]
    .into_iter()
    .collect()
}

fn assembler_benchmark(c: &mut Criterion) {
    let small = sample_log(10);
    let large = sample_log(1_000);

    c.bench_function("assemble_10_transactions", |b| {
        b.iter(|| ResultAssembler::assemble(black_box(&small)))
    });
    c.bench_function("assemble_1000_transactions", |b| {
        b.iter(|| ResultAssembler::assemble(black_box(&large)))
    });
    c.bench_function("assemble_structured_1000_transactions", |b| {
        b.iter(|| ResultAssembler::assemble_structured(black_box(&large)))
    });
}

criterion_group!(benches, assembler_benchmark);
criterion_main!(benches);

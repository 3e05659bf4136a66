//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridtrend_core::traits::{Indicator, PriceSeries};
use gridtrend_indicators::{Atr, Ema};

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn benchmark_ema(c: &mut Criterion) {
    let mut group = c.benchmark_group("EMA");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("trend_200", size), &data, |b, data| {
            let ema = Ema::new(200).unwrap();
            b.iter(|| ema.compute(black_box(PriceSeries::new(data, data, data))))
        });
    }

    group.finish();
}

fn benchmark_atr(c: &mut Criterion) {
    let mut group = c.benchmark_group("ATR");

    for size in [1000, 10000, 100000].iter() {
        let close = generate_test_data(*size);
        let high: Vec<f64> = close.iter().map(|c| c + 1.5).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.5).collect();

        group.bench_with_input(BenchmarkId::new("wilder_14", size), &close, |b, close| {
            let atr = Atr::new(14).unwrap();
            b.iter(|| atr.compute(black_box(PriceSeries::new(&high, &low, close))))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_ema, benchmark_atr);
criterion_main!(benches);

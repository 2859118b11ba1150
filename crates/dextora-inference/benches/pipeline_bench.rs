//! DEXTORA Hot-Path Benchmarks
//!
//! - Encoding (local hashing encoder) by batch size
//! - Decoding a latent vector against a batch
//! - Grounding a decoded profile back into the vector

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dextora_common::{Intensity, LatentVector, TelemetryBatch, TelemetryEvent};
use dextora_inference::{decode, ground, HashingEncoder};

fn batch(size: usize) -> TelemetryBatch {
    let events = (0..size)
        .map(|i| {
            TelemetryEvent::new((i % 1000) as i64, (i % 20) as i64)
                .with_intensity(Intensity::Scalar((i % 10) as f64 / 10.0))
                .with_duration_ms(1500.0)
                .with_tab_switches((i % 3) as u32)
        })
        .collect();
    TelemetryBatch::new(events)
}

fn sample_vector() -> LatentVector {
    let values: Vec<f32> = (0..128).map(|i| ((i as f32) * 0.37).sin()).collect();
    LatentVector::try_from(values).unwrap_or_default()
}

// ============ ENCODER BENCHMARKS ============

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let encoder = HashingEncoder::new();

    for size in [1usize, 8, 64].iter() {
        let (contexts, behaviors) = batch(*size).sequences();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("events", size), size, |b, _| {
            b.iter(|| encoder.encode_sync(black_box(&contexts), black_box(&behaviors)))
        });
    }

    group.finish();
}

// ============ DECODE / GROUND BENCHMARKS ============

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let vector = sample_vector();

    for size in [1usize, 8, 64].iter() {
        let batch = batch(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("events", size), size, |b, _| {
            b.iter(|| decode(black_box(&vector), black_box(&batch)))
        });
    }

    group.finish();
}

fn bench_ground(c: &mut Criterion) {
    let vector = sample_vector();
    let profile = decode(&vector, &batch(8));

    c.bench_function("ground", |b| b.iter(|| ground(black_box(&profile), black_box(&vector))));
}

criterion_group!(encoding, bench_encode);
criterion_group!(decoding, bench_decode, bench_ground);

criterion_main!(encoding, decoding);

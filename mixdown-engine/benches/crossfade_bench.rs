//! Crossfade Performance Benchmark
//!
//! Measures curve evaluation and full blend assembly throughput. A render
//! job is offline, but blends dominate its CPU time, so assembly should
//! stay comfortably above realtime.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mixdown_common::FadeCurve;
use mixdown_engine::audio::buffer::CHANNELS;
use mixdown_engine::audio::{AudioBuffer, TARGET_SAMPLE_RATE};
use mixdown_engine::render::mixer::{assemble, MixSegment};

fn constant(value: f32, seconds: f64) -> AudioBuffer {
    let frames = (seconds * TARGET_SAMPLE_RATE as f64) as usize;
    AudioBuffer::new(vec![value; frames * CHANNELS], TARGET_SAMPLE_RATE)
}

fn segment(seconds: f64) -> MixSegment {
    MixSegment {
        start_seconds: 0.0,
        length_seconds: seconds,
        audio: constant(0.5, seconds),
    }
}

fn bench_curve_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fade_curves");

    for curve in [
        FadeCurve::Linear,
        FadeCurve::Exponential,
        FadeCurve::Logarithmic,
        FadeCurve::SCurve,
        FadeCurve::EqualPower,
    ] {
        group.bench_function(format!("fade_in_{}", curve.as_str()), |b| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..44_100 {
                    let t = i as f32 / 44_100.0;
                    acc += curve.fade_in(black_box(t));
                }
                black_box(acc);
            });
        });
    }
    group.finish();
}

fn bench_blend_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_assembly");
    group.sample_size(20);

    // Two 30s tracks, 8s equal-power overlap: one typical transition
    group.bench_function("two_track_8s_overlap", |b| {
        b.iter(|| {
            let segments = [segment(30.0), segment(30.0)];
            let out = assemble(black_box(&segments), &[8.0], FadeCurve::EqualPower);
            black_box(out.frames());
        });
    });

    // Five-track set with smooth 16s overlaps
    group.bench_function("five_track_set", |b| {
        b.iter(|| {
            let segments = [
                segment(30.0),
                segment(30.0),
                segment(30.0),
                segment(30.0),
                segment(30.0),
            ];
            let overlaps = [16.0, 16.0, 16.0, 16.0];
            let out = assemble(black_box(&segments), &overlaps, FadeCurve::EqualPower);
            black_box(out.frames());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_curve_evaluation, bench_blend_assembly);
criterion_main!(benches);

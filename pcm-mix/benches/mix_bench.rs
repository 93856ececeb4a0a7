//! Benchmarks for pcm-mix
//!
//! Measures the cost of one audio callback and of producer pushes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pcm_mix::{accumulate_saturating, accumulate_saturating_scalar, Mixer};

fn stereo_block(frames: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let s = ((i as f32 * 0.05).sin() * 12000.0) as i16;
            [s, -s]
        })
        .collect()
}

fn bench_mix_callback(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_callback");

    for frames in [256usize, 512, 1024].iter() {
        let mixer = Mixer::new(48000);
        let dma = stereo_block(*frames);
        let streaming = stereo_block(*frames);
        // 32 kHz DMA consumes two input frames per three output frames
        let dma_frames = frames * 2 / 3;
        let mut out = vec![0i16; frames * 2];

        group.bench_with_input(BenchmarkId::from_parameter(frames), frames, |b, &frames| {
            b.iter(|| {
                mixer.push_samples(&dma[..dma_frames * 2]);
                mixer.push_streaming_samples(&streaming);
                black_box(mixer.mix(&mut out, frames, true));
            });
        });
    }

    group.finish();
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");
    let block = stereo_block(512);

    group.bench_function("push_and_drain", |b| {
        let mixer = Mixer::new(32000);
        let mut out = vec![0i16; 512 * 2];

        b.iter(|| {
            mixer.push_samples(black_box(&block));
            mixer.mix(&mut out, 512, false);
        });
    });

    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate_saturating");
    let src = stereo_block(1024);

    group.bench_function("dispatch", |b| {
        let mut dst = stereo_block(1024);
        b.iter(|| accumulate_saturating(black_box(&mut dst), black_box(&src)));
    });

    group.bench_function("scalar", |b| {
        let mut dst = stereo_block(1024);
        b.iter(|| accumulate_saturating_scalar(black_box(&mut dst), black_box(&src)));
    });

    group.finish();
}

criterion_group!(benches, bench_mix_callback, bench_push, bench_accumulate);
criterion_main!(benches);

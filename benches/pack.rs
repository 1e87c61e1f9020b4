//! Benchmarks the per-frame repack, the one unavoidable linear copy
//! between the simulation's memory and the instance buffer.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use plume::pack_instances;

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_instances");

    // Stride 7 mirrors a position/velocity/color layout the renderer
    // truncates to its own four fields.
    let stride = 7;

    for &count in &[1_000usize, 10_000, 100_000] {
        let raw: Vec<f32> = (0..count * stride).map(|i| i as f32).collect();
        let mut out = Vec::new();

        group.bench_with_input(BenchmarkId::from_parameter(count), &raw, |b, raw| {
            b.iter(|| {
                pack_instances(black_box(raw), stride, &mut out);
                black_box(out.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pack);
criterion_main!(benches);

//! Benchmarks for the interpolation estimators

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scatterfill_core::Extent;
use scatterfill_interpolation::{
    interpolate, EstimatorConfig, GlobalKrigingParams, InterpolationParams, KrigingSystem,
    PointSet, SamplePoint, SearchParams, SplineParams, TargetGrid,
};

/// Pseudo-random points over a 1000 × 1000 square with a smooth surface
fn create_points(n: usize) -> PointSet {
    (0..n)
        .map(|i| {
            let x = ((i * 7919 + 13) % 1000) as f64 + ((i * 31) % 7) as f64 * 0.1;
            let y = ((i * 104_729 + 37) % 1000) as f64 + ((i * 17) % 5) as f64 * 0.1;
            let z = 500.0 + 0.2 * x - 0.1 * y + 30.0 * (x / 150.0).sin() * (y / 200.0).cos();
            SamplePoint::new(x, y, z)
        })
        .collect()
}

fn target(cells_per_side: usize) -> TargetGrid {
    TargetGrid::Bounds {
        extent: Extent::new(0.0, 0.0, 1000.0, 1000.0),
        cell_size: 1000.0 / (cells_per_side - 1) as f64,
    }
}

fn bench_kriging_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation/kriging_initialize");
    for n in [100, 250, 500] {
        let points = create_points(n);
        let params = GlobalKrigingParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| KrigingSystem::initialize(black_box(&points), &[], &params).unwrap())
        });
    }
    group.finish();
}

fn bench_global_kriging(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation/global_kriging");
    let points = create_points(200);
    for size in [64, 128, 256] {
        let params = InterpolationParams {
            target: target(size),
            compute_variance: true,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| interpolate(black_box(&points), &[], &params).unwrap())
        });
    }
    group.finish();
}

fn bench_local_spline(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation/local_spline");
    let points = create_points(2000);
    for size in [64, 128, 256] {
        let params = InterpolationParams {
            target: target(size),
            estimator: EstimatorConfig::Spline(SplineParams {
                regularization: 0.01,
                use_all_points: false,
                search: SearchParams {
                    radius: Some(150.0),
                    max_points: Some(16),
                    min_points: 3,
                },
            }),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| interpolate(black_box(&points), &[], &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_kriging_initialize,
    bench_global_kriging,
    bench_local_spline
);
criterion_main!(benches);

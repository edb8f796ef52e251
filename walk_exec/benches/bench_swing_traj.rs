//! # Swing Trajectory Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::{DVector, Matrix3x4, Vector3};
use walk_lib::{
    curve::{BezierCurve, CurveKind, StartState, SwingCurve},
    filter::{self, PeriodicFilter},
    gait::{Gait, GaitType},
    swing_traj::{BasePose, Params, Surface, SwingTrajPlanner, NUM_FEET},
};

fn swing_traj_benchmark(c: &mut Criterion) {
    // ---- Curves ----

    let start = StartState {
        position_m: Vector3::new(0.19, 0.15, 0.0),
        velocity_ms: Vector3::new(0.3, 0.0, 0.1),
        acceleration_mss: Vector3::new(0.0, 0.0, -1.0),
    };
    let touchdown = Vector3::new(0.25, 0.15, 0.0);

    c.bench_function("BezierCurve::swing", |b| {
        b.iter(|| {
            BezierCurve::swing(black_box(&start), &touchdown, 0.16, Some(0.06), 6).unwrap()
        })
    });

    let curve = BezierCurve::swing(&start, &touchdown, 0.16, Some(0.06), 6).unwrap();
    c.bench_function("BezierCurve::sample", |b| {
        b.iter(|| curve.sample(black_box(0.37)))
    });

    let poly = CurveKind::Polynomial
        .build(&start, &touchdown, 0.16, Some(0.06), 0)
        .unwrap();
    c.bench_function("PolynomialCurve::sample", |b| {
        b.iter(|| poly.sample(black_box(0.37)))
    });

    // ---- Planner ----

    // One full trot cycle of 1 ms ticks, the gait rolled every 20 ms
    let params = Params::default();
    let gait = Gait::from_type(GaitType::Trot, 17, 16, 0.02).unwrap();
    let surfaces: [Surface; NUM_FEET] = Default::default();
    let mut targets = Matrix3x4::zeros();
    for foot in 0..NUM_FEET {
        targets.set_column(foot, &Vector3::from(params.footsteps_init_m[foot]));
    }
    targets[(0, 0)] += 0.05;
    targets[(0, 3)] += 0.05;

    c.bench_function("SwingTrajPlanner::update::trot_cycle", |b| {
        b.iter(|| {
            let mut planner = SwingTrajPlanner::new();
            let mut g = gait.clone();
            planner.initialize(params.clone(), g.clone()).unwrap();

            for k in 0..320 {
                if k % 20 == 0 && k > 0 {
                    g.roll();
                    planner.set_gait(g.clone()).unwrap();
                }
                planner
                    .update(k, &targets, &surfaces, &BasePose::default())
                    .unwrap();
            }

            planner.get_foot_position().unwrap()
        })
    });

    // ---- Filter ----

    let mut pose_filter = PeriodicFilter::new();
    pose_filter.initialize(&filter::Params::default()).unwrap();
    let sample = DVector::from_vec(vec![0.0, 0.0, 0.24, 0.01, -0.02, 3.13]);

    c.bench_function("PeriodicFilter::filter", |b| {
        b.iter(|| pose_filter.filter(black_box(&sample), true).unwrap())
    });
}

criterion_group!(benches, swing_traj_benchmark);
criterion_main!(benches);

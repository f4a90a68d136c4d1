//! Benchmarks for tracker attenuation and retirement

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use face_tracker::{
    backend::scripted::ScriptedTracker,
    frame::Frame,
    pool::{TrackerFactory, TrackerPool},
    rect::{common_area, Rect},
    retirement::{attenuate, decay_pass, suppression_pass},
    tracker::{inline_tracker, TrackerState},
};
use rand::Rng;

fn random_rect(rng: &mut impl Rng) -> Rect {
    let x = rng.gen_range(0..1100);
    let y = rng.gen_range(0..560);
    let w = rng.gen_range(40..180);
    let h = rng.gen_range(40..160);
    Rect::new(x, y, x + w, y + h, rng.gen_range(0.1..1.0))
}

/// Pool of `n` available trackers at random positions
fn pool_with(n: usize, rng: &mut impl Rng) -> TrackerPool {
    let factory: TrackerFactory = Box::new(|| Ok(inline_tracker(Box::new(ScriptedTracker::new(1.0)))));
    let mut pool = TrackerPool::new(factory);
    let frame = Frame::blank(16, 16);
    let crop = Rect::full_frame(1280, 720);
    for tick in 0..n {
        if pool.acquire(tick as u64, frame.clone(), crop).is_err() {
            break;
        }
    }
    for t in pool.active_mut() {
        t.rect = random_rect(rng);
        t.state = TrackerState::Available;
    }
    pool
}

fn benchmark_overlap(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Rect, Rect)> = (0..1000).map(|_| (random_rect(&mut rng), random_rect(&mut rng))).collect();

    c.bench_function("common_area_1000", |b| {
        b.iter(|| {
            for (a, r) in &pairs {
                black_box(common_area(black_box(a), black_box(r)));
            }
        });
    });
}

fn benchmark_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("attenuation");
    let mut rng = rand::thread_rng();

    for trackers in [4, 16, 64] {
        let detections: Vec<Rect> = (0..8).map(|_| random_rect(&mut rng)).collect();

        let pool = pool_with(trackers, &mut rng);
        group.bench_with_input(BenchmarkId::new("suppression", trackers), &detections, |b, d| {
            b.iter(|| black_box(suppression_pass(pool.active(), black_box(d))));
        });

        let mut pool = pool_with(trackers, &mut rng);
        group.bench_with_input(BenchmarkId::new("decay", trackers), &detections, |b, d| {
            b.iter(|| {
                for t in pool.active_mut() {
                    t.attenuation = 1.0;
                }
                decay_pass(pool.active_mut(), black_box(d));
            });
        });

        group.bench_with_input(BenchmarkId::new("full_pass", trackers), &detections, |b, d| {
            b.iter_batched(
                || pool_with(trackers, &mut rand::thread_rng()),
                |mut pool| black_box(attenuate(&mut pool, d)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_overlap, benchmark_passes);
criterion_main!(benches);

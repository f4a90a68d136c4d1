//! Benchmarks for crop control and the per-tick filter path

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use face_tracker::{
    backend::scripted::{BlankSource, ScriptedDetector, ScriptedTracker},
    control::{desired_crop, CropController, Gains, Geometry},
    detector::inline_detector,
    pool::TrackerFactory,
    rect::{Rect, F4},
    tracker::inline_tracker,
    Config, FaceTrackerFilter,
};
use rand::Rng;

fn benchmark_controller(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller");
    let mut rng = rand::thread_rng();

    // Noisy error around a fixed target
    let errors: Vec<F4> = (0..300)
        .map(|_| F4::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
        .collect();

    group.bench_function("update_300", |b| {
        let mut controller = CropController::new(Gains::default());
        b.iter(|| {
            controller.reset(1280, 720);
            for e in &errors {
                black_box(controller.update(black_box(*e), 1.0 / 30.0, 1280, 720, 10.0));
            }
        });
    });

    let faces: Vec<Rect> = (0..300)
        .map(|_| {
            let x = rng.gen_range(0..1000);
            let y = rng.gen_range(0..400);
            Rect::new(x, y, x + rng.gen_range(20..280), y + rng.gen_range(20..320), 1.0)
        })
        .collect();
    let geometry = Geometry::default();

    group.bench_function("desired_crop_300", |b| {
        b.iter(|| {
            for face in &faces {
                black_box(desired_crop(black_box(face), 1280, 720, &geometry));
            }
        });
    });

    group.finish();
}

fn benchmark_filter_tick(c: &mut Criterion) {
    let face = Rect::new(100, 40, 180, 140, 1.0);
    let mut config = Config::default();
    config.detection.interval = 0.5;

    c.bench_function("filter_tick_inline", |b| {
        let detector = inline_detector(Box::new(ScriptedDetector::repeating(vec![face])));
        let factory: TrackerFactory =
            Box::new(|| Ok(inline_tracker(Box::new(ScriptedTracker::new(1.0).with_velocity(1, 0)))));
        let Ok(mut filter) = FaceTrackerFilter::new(&config, detector, factory) else {
            return;
        };
        let mut source = BlankSource::new(320, 180);
        b.iter(|| filter.tick(black_box(1.0 / 30.0), &mut source));
    });
}

criterion_group!(benches, benchmark_controller, benchmark_filter_tick);
criterion_main!(benches);

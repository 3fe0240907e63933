use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kurbo::Rect;

use rectclip::{
    generators::{coastline, fragmented_coastline, spiral, square_grid},
    ClipEngine, ClipWindow, PathProducer, PolygonAssembler,
};

fn clip_coastline(c: &mut Criterion) {
    let island = coastline(10_000, 100.0, 0.3);
    // A window over part of the coast: lots of exits and entries.
    let window = Rect::new(60.0, -40.0, 200.0, 40.0);
    let mut engine = ClipEngine::default();

    c.bench_function("clip coastline", |b| {
        b.iter(|| black_box(engine.clip_rect(&island, true, window)))
    });
}

fn clip_spiral(c: &mut Criterion) {
    let line = spiral(200, 64, 1.0);
    let window = Rect::new(-20.0, -20.0, 20.0, 20.0);
    let mut engine = ClipEngine::default();

    c.bench_function("clip spiral", |b| {
        b.iter(|| black_box(engine.clip_rect(&line, false, window)))
    });
}

fn clip_grid_session(c: &mut Criterion) {
    let squares = square_grid((0.0, 0.0), 3.0, 4.0, 50);
    let window = ClipWindow::new(Rect::new(50.5, 50.5, 150.5, 150.5));
    let mut engine = ClipEngine::default();

    c.bench_function("clip grid, fresh", |b| {
        b.iter(|| {
            for sq in &squares {
                black_box(engine.clip(sq, true, &window).ok());
            }
        })
    });

    let mut session = engine.session(&window);
    c.bench_function("clip grid, cached", |b| {
        b.iter(|| {
            for sq in &squares {
                black_box(session.clip(sq, true).ok());
            }
        })
    });
}

fn assemble_and_draw(c: &mut Criterion) {
    let fragments = fragmented_coastline(10_000, 100.0, 64);

    c.bench_function("assemble coastline", |b| {
        b.iter(|| black_box(PolygonAssembler::default().assemble(fragments.clone())))
    });

    let island = coastline(10_000, 100.0, 0.3);
    c.bench_function("draw coastline", |b| {
        b.iter(|| black_box(PathProducer::single(&island, true).to_bez_path()))
    });
}

criterion_group!(
    benches,
    clip_coastline,
    clip_spiral,
    clip_grid_session,
    assemble_and_draw
);
criterion_main!(benches);

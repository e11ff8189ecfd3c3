use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ecs_world::{Component, Filter, World, WorldConfig};

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}
impl Component for Velocity {}

#[derive(Debug, Clone, Copy)]
struct Frozen;
impl Component for Frozen {}

const AGENTS: usize = 10_000;

fn populated(config: WorldConfig) -> World {
    let world = World::with_config(config);
    for i in 0..AGENTS {
        let pos = Position { x: i as f32, y: 0.0 };
        let vel = Velocity { x: 1.0, y: 0.5 };
        let created = match i % 4 {
            0 => world.create_entity((pos,)),
            1 => world.create_entity((pos, vel, Frozen)),
            _ => world.create_entity((pos, vel)),
        };
        created.expect("benchmark entity creation failed");
    }
    world
}

fn creation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");
    group.bench_function("10k_mixed_entities", |b| {
        b.iter_batched(
            World::new,
            |world| {
                for i in 0..AGENTS {
                    let pos = Position { x: i as f32, y: 0.0 };
                    if i % 2 == 0 {
                        black_box(world.create_entity((pos,)).ok());
                    } else {
                        black_box(world.create_entity((pos, Velocity { x: 0.0, y: 0.0 })).ok());
                    }
                }
                world
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn query_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let world = populated(WorldConfig::default());
    group.bench_function("typed_movement", |b| {
        b.iter(|| {
            for mut batch in world.query::<(Position, Velocity)>().without::<Frozen>() {
                batch.for_each(|_entity, (pos, vel)| {
                    pos.x += vel.x;
                    pos.y += vel.y;
                });
            }
        });
    });

    let position = world.component_id::<Position>().expect("registered");
    let frozen = world.component_id::<Frozen>().expect("registered");
    group.bench_function("filter_rows", |b| {
        b.iter(|| {
            let mut seen = 0usize;
            Filter::new()
                .include(position)
                .exclude(frozen)
                .query(&world)
                .for_each_row(|row| seen += row.len());
            black_box(seen)
        });
    });

    group.finish();
}

fn matching_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("match");
    for (name, config) in [
        ("cached", WorldConfig::default()),
        ("uncached", WorldConfig::default().with_query_cache(false)),
    ] {
        let world = populated(config);
        let position = world.component_id::<Position>().expect("registered");
        let filter = Filter::new().include(position);
        group.bench_function(name, |b| b.iter(|| black_box(filter.count(&world))));
    }
    group.finish();
}

criterion_group!(benches, creation_benchmark, query_benchmark, matching_benchmark);
criterion_main!(benches);

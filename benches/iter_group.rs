use std::time::Duration;

use criterion::*;
use dynrec::{Context, Field, GroupFilter, Schema};
use rand::Rng;

struct World {
    ctx:      Context,
    position: Field<[f64; 3]>,
    velocity: Field<[f64; 3]>,
    filter:   GroupFilter,
}

fn setup(num_entities: u64) -> World {
    let mut schema = Schema::builder();
    let position = schema.component("Position").field::<[f64; 3]>("xyz");
    let velocity = schema.component("Velocity").field::<[f64; 3]>("xyz");
    let mut ctx = Context::new(schema.build());

    let mut rng = rand::thread_rng();
    let mut random = || {
        [
            rng.gen_range(-65536.0..=65536.0),
            rng.gen_range(-65536.0..=65536.0),
            rng.gen_range(-65536.0..=65536.0),
        ]
    };
    for _ in 0..num_entities {
        let entity = ctx.create_entity();
        position.set(&mut ctx, entity, random()).expect("entity is alive");
        velocity.set(&mut ctx, entity, random()).expect("entity is alive");
    }

    let filter = GroupFilter::new().include(&position.component()).include(&velocity.component());
    World { ctx, position, velocity, filter }
}

fn iter_group_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter group (a += b)");
    group.measurement_time(Duration::from_secs(10));

    for log_entities in (4..=16).step_by(4) {
        let num_entities = 1 << log_entities;
        group.throughput(Throughput::Elements(num_entities));
        group.bench_with_input(
            BenchmarkId::new("field update", format!("{num_entities} entities")),
            &num_entities,
            |b, &num_entities| {
                let World { mut ctx, position, velocity, filter } = setup(num_entities);
                let moving = ctx.group(&filter).expect("filter is valid");
                b.iter(|| {
                    for entity in &moving {
                        let v = velocity.get(&ctx, entity).expect("group member has velocity");
                        position
                            .update(&mut ctx, entity, |p| {
                                for i in 0..3 {
                                    p[i] += v[i];
                                }
                            })
                            .expect("group member has position");
                    }
                })
            },
        );
    }
}

fn iter_group_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter group (remove during iteration)");

    for log_entities in (4..=12).step_by(4) {
        let num_entities = 1 << log_entities;
        group.throughput(Throughput::Elements(num_entities));
        group.bench_with_input(
            BenchmarkId::new("remove component", format!("{num_entities} entities")),
            &num_entities,
            |b, &num_entities| {
                b.iter_batched(
                    || {
                        let mut world = setup(num_entities);
                        let moving = world.ctx.group(&world.filter).expect("filter is valid");
                        (world, moving)
                    },
                    |(mut world, moving)| {
                        for entity in &moving {
                            world
                                .velocity
                                .component()
                                .remove(&mut world.ctx, entity)
                                .expect("entity is alive");
                        }
                        world
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
}

criterion_group!(add, iter_group_add);
criterion_group!(remove, iter_group_remove);
criterion_main!(add, remove);

use criterion::*;
use dynrec::test_util;

fn delete_entity(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete entity");

    for num_comps in [0, 1, 2, 4, 8, 16] {
        for log_entities in (0..=8).step_by(4) {
            let entities = 1 << log_entities;
            group.throughput(Throughput::Elements(entities));
            group.bench_with_input(
                BenchmarkId::new(format!("{num_comps} components"), format!("{entities} entities")),
                &entities,
                |b, &entities| {
                    b.iter_batched(
                        || {
                            let (fields, mut ctx) = test_util::numbered_fields(num_comps);
                            let mut vec = Vec::with_capacity(entities as usize);
                            for i in 0..entities {
                                let entity = ctx.create_entity();
                                for field in &fields {
                                    field.set(&mut ctx, entity, i as u32).expect("entity is alive");
                                }
                                vec.push(entity);
                            }
                            (ctx, vec)
                        },
                        |(mut ctx, vec)| {
                            for entity in vec {
                                ctx.remove_entity(entity);
                            }
                            ctx
                        },
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }
}

criterion_group!(benches, delete_entity);
criterion_main!(benches);

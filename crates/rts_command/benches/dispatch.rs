//! Dispatch and tick benchmarks for rts_command.
//!
//! Run with: `cargo bench -p rts_command`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rts_command::entity::EntityId;
use rts_command::scenario::Scenario;
use rts_test_utils::fixtures::{order, skirmish_scenario, spawn, standard_executor, RED};

/// A larger red army facing the skirmish line.
fn army() -> (Scenario, Vec<EntityId>) {
    let (mut scenario, mut red, _) = skirmish_scenario();
    for i in 0..40 {
        red.push(spawn(&mut scenario, "Marine", RED, -(i % 8) * 2, 10 + (i / 8) * 2));
    }
    (scenario, red)
}

/// Benchmarks dispatching a group order and running the resulting battle.
pub fn dispatch_benchmark(c: &mut Criterion) {
    let executor = standard_executor();

    c.bench_function("availability_43_marines", |b| {
        let (scenario, red) = army();
        b.iter(|| executor.command_availability(&scenario, Some("Attack"), None, black_box(&red)));
    });

    c.bench_function("dispatch_attack_move", |b| {
        b.iter_batched(
            army,
            |(mut scenario, red)| {
                scenario.step(&executor, &[order(Some("Attack"), &red, 30, 2)]);
                scenario
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("battle_100_ticks", |b| {
        b.iter_batched(
            army,
            |(mut scenario, red)| {
                scenario.step(&executor, &[order(Some("Attack"), &red, 30, 2)]);
                for _ in 0..100 {
                    scenario.step(&executor, &[]);
                }
                scenario.state_hash()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, dispatch_benchmark);
criterion_main!(benches);

//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the command engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Lockstep multiplayer and replays need the engine to be 100% deterministic.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`rts_command::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities, players and executions live in `BTreeMap`s and are always
//!   visited in ascending id order.
//!
//! - **Hidden execution state**: every execution keeps its state in cells,
//!   and the scenario hash covers all of them.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual behaviors driven by the execution harness
//! 2. **Property tests**: Random command streams must still be reproducible
//! 3. **Integration tests**: Full scripted scenarios are reproducible
//! 4. **Parallel tests**: Running N scenarios on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::thread;

use rts_command::envelope::CommandEnvelope;
use rts_command::executor::CommandExecutor;
use rts_command::scenario::Scenario;
use rts_command::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Scenario is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Envelopes to feed a scenario, keyed by the tick they arrive on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandScript {
    by_tick: BTreeMap<u64, Vec<CommandEnvelope>>,
}

impl CommandScript {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an envelope arriving at `tick`.
    #[must_use]
    pub fn at(mut self, tick: u64, envelope: CommandEnvelope) -> Self {
        self.by_tick.entry(tick).or_default().push(envelope);
        self
    }

    /// Envelopes arriving at `tick`.
    #[must_use]
    pub fn commands_at(&self, tick: u64) -> &[CommandEnvelope] {
        self.by_tick.get(&tick).map_or(&[][..], Vec::as_slice)
    }

    /// Total number of envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_tick.values().map(Vec::len).sum()
    }

    /// Whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_tick.is_empty()
    }
}

/// Step a scenario through a script for `ticks` ticks.
pub fn run_script(
    scenario: &mut Scenario,
    executor: &CommandExecutor,
    script: &CommandScript,
    ticks: u64,
) {
    for _ in 0..ticks {
        let incoming = script.commands_at(scenario.tick());
        scenario.step(executor, incoming);
    }
}

/// Run a scripted scenario twice and compare the final state hashes.
pub fn verify_scenario_determinism<F>(setup_fn: F, script: &CommandScript, num_ticks: u64) -> bool
where
    F: Fn() -> (Scenario, CommandExecutor),
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |(scenario, executor)| {
            let incoming = script.commands_at(scenario.tick());
            scenario.step(executor, incoming);
        },
        |(scenario, _)| scenario.state_hash(),
    );
    result.is_deterministic
}

/// Result of parallel scenario runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks each run lasted.
    pub ticks: u64,
    /// Number of runs.
    pub runs: usize,
}

impl ParallelRunResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel scenarios diverged!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.runs,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N scripted scenarios on scoped threads and collect final hashes.
///
/// Each thread builds its own scenario and executor, so neither has to be
/// `Send`.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_scenarios<F>(
    setup_fn: F,
    script: &CommandScript,
    num_runs: usize,
    num_ticks: u64,
) -> ParallelRunResult
where
    F: Fn() -> (Scenario, CommandExecutor) + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let (mut scenario, executor) = setup_fn();
                    run_script(&mut scenario, &executor, script, num_ticks);
                    scenario.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelRunResult {
        hashes,
        ticks: num_ticks,
        runs: num_runs,
    }
}

/// Compare two scripted runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, script: &CommandScript, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> (Scenario, CommandExecutor),
{
    let (mut first, first_executor) = setup_fn();
    let (mut second, second_executor) = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.step(&first_executor, script.commands_at(first.tick()));
        second.step(&second_executor, script.commands_at(second.tick()));

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a world byte round-trip preserves the world exactly.
pub fn verify_serialization_determinism(scenario: &Scenario) -> bool {
    let hash_before = world_hash(scenario.world());

    let Ok(bytes) = scenario.world().to_bytes() else {
        return false;
    };
    let Ok(restored) = World::from_bytes(&bytes) else {
        return false;
    };

    hash_before == world_hash(&restored)
}

/// Hash of a world alone, without executions.
#[must_use]
pub fn world_hash(world: &World) -> u64 {
    let mut hasher = DefaultHasher::new();
    world.hash_into(&mut hasher);
    hasher.finish()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the engine.
pub mod strategies {
    use proptest::prelude::*;
    use rts_command::entity::EntityId;
    use rts_command::envelope::CommandEnvelope;
    use rts_command::formation::FormationMember;
    use rts_command::math::{Fixed, Vec2Fixed};

    /// Command types the standard executor knows, plus the smart command.
    pub const COMMAND_TYPES: [Option<&str>; 7] = [
        None,
        Some("Move"),
        Some("Attack"),
        Some("Stop"),
        Some("Hold"),
        Some("Patrol"),
        Some("Land"),
    ];

    /// Generate a fixed-point number in a reasonable range for positions.
    ///
    /// Range: -10000 to 10000 (typical map size)
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-10000i32..10000i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point number with arbitrary raw bits, fractions included.
    pub fn arb_fixed_bits() -> impl Strategy<Value = Fixed> {
        any::<i64>().prop_map(Fixed::from_bits)
    }

    /// Generate a position on the map.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a command type, the smart command included.
    pub fn arb_command_type() -> impl Strategy<Value = Option<&'static str>> {
        proptest::sample::select(COMMAND_TYPES.to_vec())
    }

    /// Generate a non-empty recipient list of wire-representable ids.
    pub fn arb_recipients(max_len: usize) -> impl Strategy<Value = Vec<EntityId>> {
        proptest::collection::vec(0u32..=i32::MAX as u32, 1..=max_len.max(1))
    }

    /// Generate an arbitrary envelope whose every field survives the wire.
    pub fn arb_envelope() -> impl Strategy<Value = CommandEnvelope> {
        (
            arb_command_type(),
            arb_recipients(12),
            arb_fixed_bits(),
            arb_fixed_bits(),
            proptest::option::of(0u32..=i32::MAX as u32),
            proptest::option::of("[A-Za-z]{1,12}"),
        )
            .prop_map(|(command, recipients, x, y, target, parameter)| {
                let mut envelope = CommandEnvelope::new(command, recipients)
                    .expect("strategy never yields empty recipients")
                    .with_target_position(Vec2Fixed::new(x, y));
                if let Some(target) = target {
                    envelope = envelope.with_target_entity(target);
                }
                if let Some(parameter) = parameter {
                    envelope = envelope.with_parameter(&parameter);
                }
                envelope
            })
    }

    /// Generate an order for entities `1..=max_id` aimed at a small map.
    pub fn arb_scripted_order(max_id: EntityId) -> impl Strategy<Value = CommandEnvelope> {
        (
            arb_command_type(),
            proptest::collection::vec(1..=max_id, 1..4),
            -40i32..40,
            -40i32..40,
        )
            .prop_map(|(command, recipients, x, y)| {
                CommandEnvelope::new(command, recipients)
                    .expect("strategy never yields empty recipients")
                    .with_target_position(Vec2Fixed::from_int(x, y))
            })
    }

    /// Generate a list of (tick, order) pairs.
    pub fn arb_order_stream(
        max_id: EntityId,
        max_tick: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, CommandEnvelope)>> {
        proptest::collection::vec((0..max_tick, arb_scripted_order(max_id)), 0..max_len)
    }

    /// Generate formation members with distinct ids, all on the ground.
    pub fn arb_ground_group(max_len: usize) -> impl Strategy<Value = Vec<FormationMember>> {
        proptest::collection::vec((-50i32..50, -50i32..50), 1..=max_len.max(1)).prop_map(
            |positions| {
                positions
                    .into_iter()
                    .zip(1u32..)
                    .map(|((x, y), id)| FormationMember {
                        id,
                        position: Vec2Fixed::from_int(x, y),
                        flying: false,
                    })
                    .collect()
            },
        )
    }
}

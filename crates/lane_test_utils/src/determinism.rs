//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, batch statistics and snapshot restore all assume a match is a
//! pure function of its configuration and inputs. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`lane_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order.
//!
//! - **System randomness**: Automatic spawners draw from a seeded generator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lane_core::math::Fixed;
use lane_core::simulation::Simulation;

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
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
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
    if !is_deterministic {
        tracing::warn!(runs, ticks, ?hashes, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

fn step(sim: &mut Simulation, dt: Fixed) {
    sim.tick(dt).expect("tick with non-negative dt");
}

/// Run a [`Simulation`] twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| step(sim, dt),
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different thread
/// scheduling or memory layout.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
    dt: Fixed,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        step(&mut sim, dt);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step(&mut sim1, dt);
        step(&mut sim2, dt);

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves simulation state exactly,
/// and that the restored copy keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        step(&mut sim, dt);
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if sim.state_hash() != restored.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        step(&mut sim, dt);
        step(&mut restored, dt);
    }
    sim.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
pub mod strategies {
    use lane_core::factions::Faction;
    use lane_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Tick lengths that are exact in binary: 1/16 s up to 1 s.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (1i32..=16i32).prop_map(|sixteenths| Fixed::from_num(sixteenths) / Fixed::from_num(16))
    }

    /// A positive health pool.
    pub fn arb_health() -> impl Strategy<Value = Fixed> {
        (1i32..200i32).prop_map(Fixed::from_num)
    }

    /// A non-negative damage amount with quarter-point precision.
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (0i32..400i32).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
    }

    /// A sequence of damage amounts.
    pub fn arb_damage_sequence(max_len: usize) -> impl Strategy<Value = Vec<Fixed>> {
        proptest::collection::vec(arb_damage(), 1..max_len)
    }

    /// Either faction.
    pub fn arb_faction() -> impl Strategy<Value = Faction> {
        prop_oneof![Just(Faction::Player), Just(Faction::Enemy)]
    }

    /// A point on a 20-unit lane.
    pub fn arb_lane_position() -> impl Strategy<Value = Vec2Fixed> {
        ((-40i32..=40i32), (-2i32..=2i32)).prop_map(|(x, y)| {
            Vec2Fixed::new(
                Fixed::from_num(x) / Fixed::from_num(4),
                Fixed::from_num(y) / Fixed::from_num(4),
            )
        })
    }

    /// A scripted spawn: which faction asks, for which template index,
    /// after how many ticks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScriptedSpawn {
        /// Requesting faction.
        pub faction: Faction,
        /// Template index into the match's template list.
        pub template: u32,
        /// Ticks to run before the request.
        pub delay_ticks: u32,
    }

    /// A list of spawn requests against a match with `templates` templates.
    pub fn arb_spawn_script(
        templates: u32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<ScriptedSpawn>> {
        let spawn = (arb_faction(), 0..templates.max(1), 0u32..20u32).prop_map(
            |(faction, template, delay_ticks)| ScriptedSpawn {
                faction,
                template,
                delay_ticks,
            },
        );
        proptest::collection::vec(spawn, 0..max_len)
    }
}

use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::context::{EngineState, TickContext};
use super::system::{SimSystem, TickFrequency};
use crate::flush::save_to_jsonl;
use crate::model::timestamp::{DAYS_PER_WEEK, DAYS_PER_YEAR, HOURS_PER_DAY};
use crate::model::{SimTimestamp, World};

/// Configuration for a simulation run.
pub struct SimConfig {
    pub start_year: u32,
    pub num_days: u32,
    pub seed: u64,
    /// If set, flush world state every N days.
    pub flush_interval: Option<u32>,
    /// Directory to write flush checkpoints into.
    pub output_dir: Option<PathBuf>,
}

impl SimConfig {
    pub fn new(start_year: u32, num_days: u32, seed: u64) -> Self {
        Self {
            start_year,
            num_days,
            seed,
            flush_interval: None,
            output_dir: None,
        }
    }
}

/// Returns true if a system with the given frequency should fire at this timestamp.
pub fn should_fire(freq: TickFrequency, time: SimTimestamp) -> bool {
    match freq {
        TickFrequency::Hourly => true,
        TickFrequency::Daily => time.hour() == 0,
        TickFrequency::Weekly => time.hour() == 0 && time.day() % DAYS_PER_WEEK == 0,
    }
}

/// Set `world.current_time` and call each system whose frequency matches.
///
/// Signal delivery is **single-pass, non-cascading**:
///
/// 1. **Phase 1 (tick):** Each system's `tick()` runs in registration order.
///    All signals emitted during this phase are collected into a shared
///    buffer, appended to any host-injected signals in `inbox_seed`.
/// 2. **Phase 2 (react):** If any signals exist, each system's
///    `handle_signals()` is called with the full buffer as `ctx.inbox`.
///    Systems may mutate the world and push new signals during this phase,
///    but those new signals are **not** delivered — they are discarded at
///    the end of the dispatch cycle.
///
/// This means a signal emitted in Phase 2 never triggers further reactions
/// within the same tick, which keeps each tick's side-effects bounded. If a
/// reaction needs to propagate, it should mutate world state that a later
/// tick's Phase 1 will observe.
pub fn dispatch_systems(
    world: &mut World,
    state: &mut EngineState,
    systems: &mut [Box<dyn SimSystem>],
    rng: &mut dyn RngCore,
    time: SimTimestamp,
    inbox_seed: Vec<super::signal::Signal>,
) {
    world.current_time = time;

    // Phase 1: tick systems, collecting signals on top of host-injected ones.
    let mut signals = inbox_seed;
    for system in systems.iter_mut() {
        if should_fire(system.frequency(), time) {
            let EngineState {
                settings,
                budget,
                population,
            } = state;
            let mut ctx = TickContext {
                world,
                settings,
                budget,
                population,
                rng,
                signals: &mut signals,
                inbox: &[],
            };
            system.tick(&mut ctx);
        }
    }

    // Phase 2: deliver signals for reaction (only if any were emitted).
    if !signals.is_empty() {
        for system in systems.iter_mut() {
            if should_fire(system.frequency(), time) {
                let mut new_signals = Vec::new();
                let EngineState {
                    settings,
                    budget,
                    population,
                } = state;
                let mut ctx = TickContext {
                    world,
                    settings,
                    budget,
                    population,
                    rng,
                    signals: &mut new_signals,
                    inbox: &signals,
                };
                system.handle_signals(&mut ctx);
            }
        }
    }
}

/// Run the simulation for the configured number of days.
///
/// Creates a deterministic RNG from `config.seed`, so the same seed always
/// produces the same simulation. The loop iterates hourly only when some
/// registered system needs it.
pub fn run(
    world: &mut World,
    state: &mut EngineState,
    systems: &mut [Box<dyn SimSystem>],
    config: SimConfig,
) {
    if systems.is_empty() || config.num_days == 0 {
        return;
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let finest = systems.iter().map(|s| s.frequency()).max().unwrap();

    for day_offset in 0..config.num_days {
        let year = config.start_year + day_offset / DAYS_PER_YEAR;
        let day = day_offset % DAYS_PER_YEAR + 1;
        match finest {
            TickFrequency::Hourly => {
                for hour in 0..HOURS_PER_DAY {
                    dispatch_systems(
                        world,
                        state,
                        systems,
                        &mut rng,
                        SimTimestamp::new(year, day, hour),
                        Vec::new(),
                    );
                }
            }
            TickFrequency::Daily | TickFrequency::Weekly => {
                dispatch_systems(
                    world,
                    state,
                    systems,
                    &mut rng,
                    SimTimestamp::new(year, day, 0),
                    Vec::new(),
                );
            }
        }

        // Flush checkpoint at configured interval.
        if let (Some(interval), Some(dir)) = (config.flush_interval, &config.output_dir) {
            let is_last_day = day_offset == config.num_days - 1;
            if is_last_day || (day_offset > 0 && (day_offset + 1) % interval == 0) {
                let checkpoint_dir = dir.join(format!("day_{day_offset:06}"));
                if let Err(err) = save_to_jsonl(world, &checkpoint_dir) {
                    tracing::warn!("failed to write flush checkpoint: {err}");
                }
            }
        }
    }
}

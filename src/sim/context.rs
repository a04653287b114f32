use rand::RngCore;

use super::population::PopulationCache;
use super::power::PowerBudget;
use super::signal::Signal;
use crate::config::Settings;
use crate::model::World;

/// Cross-tick engine state: the balance settings plus the two TTL caches.
/// Owned by whoever drives the tick loop (the runner, or a test harness) and
/// threaded through every dispatch; no ambient singletons.
#[derive(Debug, Default)]
pub struct EngineState {
    pub settings: Settings,
    pub budget: PowerBudget,
    pub population: PopulationCache,
}

impl EngineState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            budget: PowerBudget::default(),
            population: PopulationCache::default(),
        }
    }
}

/// Context passed to each system on every tick. The world is the source of
/// truth; `budget` and `population` are derived caches that systems refresh
/// or invalidate through their own APIs.
pub struct TickContext<'a> {
    pub world: &'a mut World,
    pub settings: &'a Settings,
    pub budget: &'a mut PowerBudget,
    pub population: &'a mut PopulationCache,
    pub rng: &'a mut dyn RngCore,
    /// Systems push signals here during tick/handle_signals.
    pub signals: &'a mut Vec<Signal>,
    /// Signals emitted by other systems in the previous pass (read-only).
    pub inbox: &'a [Signal],
}

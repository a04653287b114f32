use super::population::PopulationCache;
use crate::config::Settings;
use crate::model::World;

/// Snapshot lifetime in simulated hours.
const BUDGET_TTL_HOURS: u64 = 1;

/// Process-wide aggregate strength statistics, recomputed lazily from a
/// snapshot of the live party set.
///
/// Replaced atomically as one record: a reader never observes a snapshot
/// with fields from two different recomputations.
#[derive(Debug, Clone, Default)]
pub struct PowerBudget {
    /// Upper bound for a single managed party's size, derived from the median
    /// non-managed party and the player's party.
    pub calculated_max_party_size: f32,
    /// Total world military strength scaled by the variance factor; the
    /// ceiling the managed population is balanced against.
    pub calculated_global_power_limit: f32,
    /// Summed strength of all managed parties.
    pub global_managed_power: f32,
    /// `global_managed_power / calculated_global_power_limit × 100`.
    pub managed_power_percent: f32,
    /// Mean strength per managed party; 0 when there are none.
    pub average_party_power: f32,
    last_calculated: Option<u64>,
}

impl PowerBudget {
    /// Recompute the snapshot unless it is still fresh and `force` is unset.
    ///
    /// The world-side terms (max size, global limit) degrade to their
    /// last-known values when the non-managed snapshot is empty; the
    /// managed-side terms always reflect the current population.
    pub fn recompute(
        &mut self,
        world: &World,
        settings: &Settings,
        population: &mut PopulationCache,
        force: bool,
    ) {
        let now = world.current_time.to_hours();
        if !force
            && self
                .last_calculated
                .is_some_and(|at| now.saturating_sub(at) < BUDGET_TTL_HOURS)
        {
            return;
        }

        let mut next = self.clone();
        next.last_calculated = Some(now);

        let snapshot: Vec<&crate::model::Party> = world
            .parties
            .values()
            .filter(|p| p.is_active() && !p.is_managed() && p.leader.is_some() && p.total_men() > 0)
            .collect();

        if !snapshot.is_empty() {
            let mut sizes: Vec<u32> = snapshot.iter().map(|p| p.total_men()).collect();
            sizes.sort_unstable();
            let median = sizes[sizes.len() / 2] as f32;
            let player = world.player_party_size().max(1) as f32;
            next.calculated_max_party_size = median.max(player * settings.variance);

            let world_strength: f32 = snapshot
                .iter()
                .map(|p| world.party_strength(p.id).unwrap_or(0.0))
                .sum();
            next.calculated_global_power_limit = world_strength * settings.variance;
        }

        let managed = population.managed(world, true);
        next.global_managed_power = managed
            .iter()
            .map(|&id| world.party_strength(id).unwrap_or(0.0))
            .sum();
        next.managed_power_percent = if next.calculated_global_power_limit > 0.0 {
            next.global_managed_power / next.calculated_global_power_limit * 100.0
        } else {
            0.0
        };
        next.average_party_power = if managed.is_empty() {
            0.0
        } else {
            next.global_managed_power / managed.len() as f32
        };

        *self = next;
    }

    /// True when the managed population has reached or passed the configured
    /// share of world strength.
    pub fn is_over_budget(&self, settings: &Settings) -> bool {
        self.managed_power_percent > settings.global_power_percent
    }
}

//! Daily reinforcement and training: warbands below the power budget gain
//! troops drawn from their own stacks, convert looters into cultured
//! recruits, and upgrade eligible troops toward the training tier cap.

use rand::Rng;

use super::context::TickContext;
use super::helpers;
use super::system::{SimSystem, TickFrequency};
use crate::model::{PartyState, TroopRoster, World};

/// Growth per event is clamped to this range of added troops.
const GROWTH_MIN: f32 = 1.0;
const GROWTH_MAX: f32 = 50.0;

/// Bail-out bound for the cavalry rebalance loop.
const CAVALRY_REBALANCE_SAFETY: u32 = 200;

pub struct GrowthSystem;

impl SimSystem for GrowthSystem {
    fn name(&self) -> &str {
        "growth"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        ctx.budget
            .recompute(ctx.world, ctx.settings, ctx.population, false);
        let ids: Vec<u64> = ctx.population.managed(ctx.world, false).to_vec();
        for id in ids {
            try_grow(ctx, id);
            let training_roll: f64 = ctx.rng.random();
            if training_roll <= f64::from(ctx.settings.training_chance) / 100.0 {
                train(ctx, id);
            }
        }
    }
}

/// Grow one party if the budget allows and the daily roll passes.
pub fn try_grow(ctx: &mut TickContext, id: u64) {
    if ctx.settings.growth_percent == 0 || ctx.budget.is_over_budget(ctx.settings) {
        return;
    }
    let Some(party) = ctx.world.parties.get(&id) else {
        return;
    };
    if party.state != PartyState::Active || party.is_busy() || party.troops.stacks.is_empty() {
        return;
    }
    let growth_roll: f64 = ctx.rng.random();
    if growth_roll > f64::from(ctx.settings.growth_chance) / 100.0 {
        return;
    }

    let total = party.total_men();
    let eligible: Vec<u64> = eligible_stacks(ctx.world, id, ctx.settings.max_training_tier);
    if eligible.is_empty() {
        return;
    }

    // Base growth plus a headroom boost that warms the population up toward
    // the budget faster when it is far below it.
    let boost = if ctx.budget.global_managed_power > 0.0 {
        ctx.budget.calculated_global_power_limit / ctx.budget.global_managed_power
    } else {
        1.0
    };
    let mut growth = total as f32 * ctx.settings.growth_percent as f32 / 100.0;
    growth += ctx.settings.global_power_percent / 100.0 * boost;
    let growth = growth.clamp(GROWTH_MIN, GROWTH_MAX) as u32;

    let max_size = ctx.budget.calculated_max_party_size as u32;
    for _ in 0..growth {
        let Some(party) = ctx.world.parties.get(&id) else {
            return;
        };
        if party.total_men() + 1 >= max_size {
            break;
        }
        let troop = eligible[ctx.rng.random_range(0..eligible.len())];
        let troop_power = match ctx.world.troop_types.get(&troop) {
            Some(t) => t.power,
            None => continue,
        };
        if ctx.budget.global_managed_power + troop_power < ctx.budget.calculated_global_power_limit
            && let Some(party) = ctx.world.parties.get_mut(&id)
        {
            party.troops.add_to_counts(troop, 1);
        }
    }

    rebalance_cavalry(ctx, id);
    ctx.budget
        .recompute(ctx.world, ctx.settings, ctx.population, true);
}

/// One training pass: convert looters toward local culture, then upgrade a
/// bounded share of an eligible stack, difficulty-scaled.
pub fn train(ctx: &mut TickContext, id: u64) {
    if !ctx.settings.can_train || ctx.budget.is_over_budget(ctx.settings) {
        return;
    }

    convert_looters(ctx, id);

    for _ in 0..ctx.settings.xp_gift.iterations() {
        if ctx.budget.is_over_budget(ctx.settings) {
            break;
        }
        let upgradable: Vec<(u64, u64, u32)> = {
            let Some(party) = ctx.world.parties.get(&id) else {
                return;
            };
            party
                .troops
                .stacks
                .iter()
                .filter_map(|s| {
                    let troop = ctx.world.troop_types.get(&s.troop)?;
                    let next = troop.upgrade_to?;
                    (troop.tier < ctx.settings.max_training_tier).then_some((
                        s.troop,
                        next,
                        s.count,
                    ))
                })
                .collect()
        };
        if upgradable.is_empty() {
            return;
        }
        let (troop, next, count) = upgradable[ctx.rng.random_range(0..upgradable.len())];
        if count == 0 {
            continue;
        }
        let spread: f32 = ctx.rng.random();
        let min_upgrade =
            ((ctx.settings.upgrade_units_percent as f32 * 0.01 * count as f32 * spread) as u32)
                .max(1);
        let half = count.div_ceil(2);
        let to_upgrade = if half > min_upgrade {
            ctx.rng.random_range(min_upgrade..half)
        } else {
            min_upgrade
        }
        .min(count);

        if let Some(party) = ctx.world.parties.get_mut(&id) {
            party.troops.add_to_counts(troop, -i64::from(to_upgrade));
            party.troops.add_to_counts(next, i64::from(to_upgrade));
        }
    }
}

/// Convert a share of looters into recruits of the most common nearby
/// culture.
fn convert_looters(ctx: &mut TickContext, id: u64) {
    if ctx.settings.looter_upgrade_percent == 0 {
        return;
    }
    let Some(party) = ctx.world.parties.get(&id) else {
        return;
    };
    let position = party.position;
    let looters: Vec<(u64, u32)> = party
        .troops
        .stacks
        .iter()
        .filter(|s| {
            ctx.world
                .troop_types
                .get(&s.troop)
                .is_some_and(|t| t.is_looter)
        })
        .map(|s| (s.troop, s.count))
        .collect();
    if looters.is_empty() {
        return;
    }
    let Some(culture) = helpers::most_prevalent_culture(ctx.world, position) else {
        return;
    };
    let recruits = helpers::recruits_of_culture(ctx.world, culture);
    if recruits.is_empty() {
        return;
    }
    for (looter, count) in looters {
        let converted = count * ctx.settings.looter_upgrade_percent / 100;
        if converted == 0 {
            continue;
        }
        let recruit = recruits[ctx.rng.random_range(0..recruits.len())];
        if let Some(party) = ctx.world.parties.get_mut(&id) {
            party.troops.add_to_counts(looter, -i64::from(converted));
            party.troops.add_to_counts(recruit, i64::from(converted));
        }
    }
}

/// Shed mounted troops until they are at most half the roster. Bounded by a
/// safety counter; exhausting it is reported, not fatal.
pub fn rebalance_cavalry(ctx: &mut TickContext, id: u64) {
    for safety in 0..=CAVALRY_REBALANCE_SAFETY {
        let (delta, mounted_stacks) = {
            let Some(party) = ctx.world.parties.get(&id) else {
                return;
            };
            let mounted = helpers::mounted_count(ctx.world, &party.troops);
            let delta = mounted.saturating_sub(party.troops.total_men() / 2);
            let stacks: Vec<(u64, u32)> = party
                .troops
                .stacks
                .iter()
                .filter(|s| {
                    ctx.world
                        .troop_types
                        .get(&s.troop)
                        .is_some_and(|t| t.mounted)
                })
                .map(|s| (s.troop, s.count))
                .collect();
            (delta, stacks)
        };
        if delta == 0 || mounted_stacks.is_empty() {
            return;
        }
        if safety == CAVALRY_REBALANCE_SAFETY {
            tracing::warn!("cavalry rebalance for party {id} hit the safety limit");
            return;
        }
        let (troop, count) = mounted_stacks[ctx.rng.random_range(0..mounted_stacks.len())];
        let removed = ctx.rng.random_range(1..=delta).min(count);
        if let Some(party) = ctx.world.parties.get_mut(&id) {
            party.troops.add_to_counts(troop, -i64::from(removed));
        }
    }
}

fn eligible_stacks(world: &World, id: u64, max_tier: u32) -> Vec<u64> {
    world
        .parties
        .get(&id)
        .map(|p| eligible_from_roster(world, &p.troops, max_tier))
        .unwrap_or_default()
}

fn eligible_from_roster(world: &World, roster: &TroopRoster, max_tier: u32) -> Vec<u64> {
    roster
        .stacks
        .iter()
        .filter(|s| {
            world
                .troop_types
                .get(&s.troop)
                .is_some_and(|t| t.tier < max_tier)
        })
        .map(|s| s.troop)
        .collect()
}

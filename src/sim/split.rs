//! Random daily splitting: a managed warband that grew comfortable divides
//! into two new warbands, conserving troops, prisoners, and inventory
//! (modulo the documented floor-at-1 rounding).

use std::mem;

use rand::{Rng, RngCore};

use super::context::TickContext;
use super::lifecycle;
use super::roster_ops;
use super::system::{SimSystem, TickFrequency};
use crate::model::{PartyKind, PartySpec, PartyState, TroopRoster, WorldError};

/// Parties above this fraction of the max size are exempt from *random*
/// splitting; growth pressure splits them through other paths.
const REDUCTION_FACTOR: f32 = 0.8;

/// A split halves the party and costs one hero per side.
const SPLIT_DIVISOR: u32 = 2;
const REMOVED_HERO: u32 = 1;

pub struct SplitSystem;

impl SimSystem for SplitSystem {
    fn name(&self) -> &str {
        "split"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        ctx.budget
            .recompute(ctx.world, ctx.settings, ctx.population, false);
        let ids: Vec<u64> = ctx.population.managed(ctx.world, false).to_vec();
        for id in ids {
            try_split(ctx, id);
        }
    }
}

/// Attempt to split one managed party in two.
///
/// Preconditions that do not hold return false with no state change. A
/// missing home settlement is an invariant violation: the original is torn
/// down and no children are produced. Transient failures mid-operation tear
/// down the original and any half-built children.
pub fn try_split(ctx: &mut TickContext, id: u64) -> bool {
    let now = ctx.world.current_time;

    // Precondition phase: every bail-out here leaves the party untouched.
    {
        let Some(party) = ctx.world.parties.get(&id) else {
            return false;
        };
        if ctx.budget.is_over_budget(ctx.settings) {
            return false;
        }
        if party.total_men() / SPLIT_DIVISOR < ctx.settings.min_party_size + REMOVED_HERO {
            return false;
        }
        if !party.is_managed() || party.state != PartyState::Active || party.is_busy() {
            return false;
        }
        if lifecycle::on_cooldown(party, now, ctx.settings) {
            return false;
        }
        let roll: u32 = ctx.rng.random_range(0..=100);
        let size_ceiling = (ctx.budget.calculated_max_party_size * REDUCTION_FACTOR).max(1.0);
        if roll > ctx.settings.random_split_chance || party.total_men() as f32 > size_ceiling {
            return false;
        }
        // No heroes at all means nobody can command either child; abort
        // before any mutation.
        if party.leader.is_none() && party.troops.heroes.is_empty() {
            return false;
        }
        if party.home_settlement.is_none() {
            tracing::warn!(
                "split of {}({id}) refused: {}",
                party.name,
                WorldError::NoHomeSettlement(id)
            );
            lifecycle::trash(ctx, id);
            return false;
        }
    }

    match split_party(ctx, id) {
        Ok((child1, child2)) => {
            tracing::debug!("party {id} split into {child1} and {child2}");
            true
        }
        Err(err) => {
            tracing::warn!("split of party {id} failed: {err}");
            lifecycle::trash(ctx, id);
            false
        }
    }
}

/// The fallible core of a split: returns both children's ids, or the first
/// failure encountered. Callers other than `try_split` own the teardown of
/// the original on error.
pub fn split_party(ctx: &mut TickContext, id: u64) -> Result<(u64, u64), WorldError> {
    let now = ctx.world.current_time;
    let player_hero = ctx.world.player_hero;

    // Read phase: rank every hero on board by power before any mutation.
    let (clan, home, position, avoidance, hero_ids) = {
        let party = ctx.world.party(id)?;
        let mut hero_ids: Vec<u64> = party.leader.into_iter().collect();
        hero_ids.extend(&party.troops.heroes);
        (
            party.clan,
            party.home_settlement,
            party.position,
            party.avoidance.clone(),
            hero_ids,
        )
    };
    let mut ranked: Vec<(u64, f32)> = Vec::with_capacity(hero_ids.len());
    for hero in hero_ids {
        ranked.push((hero, ctx.world.hero(hero)?.power));
    }
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let heroes: Vec<u64> = ranked.into_iter().map(|(hero, _)| hero).collect();

    // Mutate phase.
    ctx.world.party_mut(id)?.state = PartyState::Splitting;

    let mut troops = mem::take(&mut ctx.world.party_mut(id)?.troops);
    troops.heroes.clear(); // extracted above
    let mut prisoners = mem::take(&mut ctx.world.party_mut(id)?.prisoners);
    // The player never gets halved; child 1 keeps them.
    let player_prisoner = player_hero.filter(|&h| prisoners.heroes.contains(&h));
    if let Some(player) = player_prisoner {
        prisoners.remove_hero(player);
    }
    let prisoner_heroes: Vec<u64> = prisoners.heroes.drain(..).collect();
    let mut inventory = mem::take(&mut ctx.world.party_mut(id)?.inventory);

    let (mut troops1, mut troops2) = roster_ops::split_roster(&mut troops, ctx.rng);
    let (mut prisoners1, mut prisoners2) = roster_ops::split_roster(&mut prisoners, ctx.rng);
    let (inventory1, inventory2) = roster_ops::split_inventory(&mut inventory);
    if let Some(player) = player_prisoner {
        prisoners1.add_hero(player);
    }
    // Hero prisoners coin-flip like any size-1 stack.
    for hero in prisoner_heroes {
        if ctx.rng.random_range(0..2) == 0 {
            prisoners1.add_hero(hero);
        } else {
            prisoners2.add_hero(hero);
        }
    }

    // Strongest hero anchors side 1, second-strongest side 2; the rest
    // alternate in descending power.
    let leader1 = heroes.first().copied();
    let leader2 = heroes.get(1).copied();
    for (index, &hero) in heroes.iter().enumerate().skip(2) {
        if index % 2 == 0 {
            troops1.add_hero(hero);
        } else {
            troops2.add_hero(hero);
        }
    }

    backfill(&mut troops1, leader1, ctx.settings.min_party_size, ctx.rng);
    backfill(&mut troops2, leader2, ctx.settings.min_party_size, ctx.rng);

    let child_spec = |troops, prisoners, inventory, leader| PartySpec {
        kind: PartyKind::Managed,
        clan,
        leader,
        home_settlement: home,
        position,
        troops,
        prisoners,
        inventory,
    };

    let child1 = ctx
        .world
        .register_party(child_spec(troops1, prisoners1, inventory1, leader1), now)?;
    let child2 = match ctx
        .world
        .register_party(child_spec(troops2, prisoners2, inventory2, leader2), now)
    {
        Ok(child2) => child2,
        Err(err) => {
            lifecycle::trash(ctx, child1);
            return Err(err);
        }
    };

    for &child in &[child1, child2] {
        // Children carry the original's memory as-is: split is 1→2, there is
        // nothing to re-average.
        ctx.world.party_mut(child)?.avoidance = avoidance.clone();
        if let Err(err) = lifecycle::init_party(ctx, child) {
            lifecycle::trash(ctx, child1);
            lifecycle::trash(ctx, child2);
            return Err(err);
        }
    }

    lifecycle::trash(ctx, id);
    ctx.budget
        .recompute(ctx.world, ctx.settings, ctx.population, true);
    Ok((child1, child2))
}

/// Top a side up to the minimum size by reinforcing random stacks it already
/// holds, one unit at a time. Bounded: gives up when the side has no stacks
/// to draw from.
fn backfill(troops: &mut TroopRoster, leader: Option<u64>, min_size: u32, rng: &mut dyn RngCore) {
    loop {
        let total = troops.total_men() + u32::from(leader.is_some());
        if total >= min_size || troops.stacks.is_empty() {
            return;
        }
        let index = rng.random_range(0..troops.stacks.len());
        troops.stacks[index].count += 1;
    }
}

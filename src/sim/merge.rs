//! Merge seeking and execution: bandit parties over the mergeable size hunt
//! for partners nearby; two parties in contact combine into a freshly created
//! managed warband and the sources are torn down.

use std::collections::BTreeMap;
use std::mem;

use super::context::TickContext;
use super::helpers;
use super::lifecycle;
use super::roster_ops;
use super::system::{SimSystem, TickFrequency};
use crate::model::party::Objective;
use crate::model::{PartyKind, PartySpec, PartyState, Position, World, WorldError};

/// Radius scanned for merge partners.
const FIND_RADIUS: f32 = 20.0;

/// Contact distance at which a sought merge actually executes.
const MERGE_DISTANCE: f32 = 2.0;

/// Managed warbands this close to a hideout sit merges out (they are
/// evacuating or restocking, not roaming).
const MIN_DISTANCE_FROM_HIDEOUT: f32 = 5.0;

pub struct MergeSystem;

impl SimSystem for MergeSystem {
    fn name(&self) -> &str {
        "merge"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Hourly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        ctx.budget
            .recompute(ctx.world, ctx.settings, ctx.population, false);
        let ids: Vec<u64> = ctx
            .world
            .parties
            .values()
            .filter(|p| p.state == PartyState::Active && p.is_bandit())
            .map(|p| p.id)
            .collect();
        for id in ids {
            seek_merge(ctx, id);
        }
    }
}

/// One party's hourly merge consideration. Preconditions that fail simply
/// skip the party; only the execution path can produce teardown.
fn seek_merge(ctx: &mut TickContext, id: u64) {
    let now = ctx.world.current_time;
    let (managed, leaderless, has_member_heroes, position, total, clan, busy, state) = {
        let Some(party) = ctx.world.parties.get(&id) else {
            return;
        };
        (
            party.is_managed(),
            party.is_leaderless(),
            !party.troops.heroes.is_empty(),
            party.position,
            party.total_men(),
            party.clan,
            party.is_busy(),
            party.state,
        )
    };
    // A party merged away earlier this same tick is no longer Active.
    if state != PartyState::Active || busy || total < ctx.settings.mergeable_size {
        return;
    }

    if managed {
        if leaderless && has_member_heroes {
            if let Err(err) = lifecycle::promote_leader(ctx.world, ctx.settings, id) {
                tracing::warn!("leader takeover failed for party {id}: {err}");
            }
            return;
        }
        if helpers::hideout_within(ctx.world, position, MIN_DISTANCE_FROM_HIDEOUT) {
            return;
        }
        if let Ok(party) = ctx.world.party(id)
            && lifecycle::on_cooldown(party, now, ctx.settings)
        {
            return;
        }
    }

    let Some(target) = choose_partner(ctx, id, position, total, clan) else {
        return;
    };
    let target_position = match ctx.world.parties.get(&target) {
        Some(p) => p.position,
        None => return,
    };
    if position.distance(target_position) <= MERGE_DISTANCE {
        try_merge(ctx, id, target);
    } else {
        // Close the distance first; the host AI moves them, a later tick
        // completes the merge on contact.
        if let Ok(party) = ctx.world.party_mut(id) {
            party.objective = Objective::Engage { party: target };
        }
        if let Ok(party) = ctx.world.party_mut(target) {
            party.objective = Objective::Engage { party: id };
        }
    }
}

/// Nearest acceptable partner within the search radius, or none.
fn choose_partner(
    ctx: &mut TickContext,
    id: u64,
    position: Position,
    total: u32,
    clan: u64,
) -> Option<u64> {
    let now = ctx.world.current_time;
    let max_size = ctx.budget.calculated_max_party_size;
    let own_mounted = {
        let party = ctx.world.parties.get(&id)?;
        helpers::mounted_count(ctx.world, &party.troops)
    };
    for cand_id in helpers::parties_within(ctx.world, position, FIND_RADIUS, id) {
        let Some(cand) = ctx.world.parties.get(&cand_id) else {
            continue;
        };
        if !cand.is_bandit()
            || cand.state != PartyState::Active
            || cand.is_busy()
            || cand.total_men() == 0
        {
            continue;
        }
        let combined = total + cand.total_men();
        if combined < ctx.settings.min_party_size || combined as f32 > max_size {
            continue;
        }
        if ctx.world.is_at_war(clan, cand.clan) {
            continue;
        }
        if cand.is_managed() && lifecycle::on_cooldown(cand, now, ctx.settings) {
            continue;
        }
        // A merged horde that is mostly cavalry breaks the host's movement
        // model; cap mounted troops at half the combined size.
        let cand_mounted = helpers::mounted_count(ctx.world, &cand.troops);
        if own_mounted + cand_mounted > combined / 2 {
            continue;
        }
        return Some(cand_id);
    }
    None
}

/// Merge two parties into a newly created managed warband.
///
/// Preconditions that do not hold skip the merge (returns false, no state
/// change). Any failure after that is contained: both sources and the
/// half-built child are torn down, the failure is logged, and the caller
/// sees `false`, never a propagated error.
pub fn try_merge(ctx: &mut TickContext, a: u64, b: u64) -> bool {
    if !can_merge_now(ctx, a) || !can_merge_now(ctx, b) {
        return false;
    }
    match merge_parties(ctx, a, b) {
        Ok(new_id) => {
            tracing::debug!("party {new_id} merged from {a} and {b}");
            true
        }
        Err(err) => {
            tracing::warn!("merge of {a} and {b} failed: {err}");
            lifecycle::trash(ctx, a);
            lifecycle::trash(ctx, b);
            false
        }
    }
}

fn can_merge_now(ctx: &TickContext, id: u64) -> bool {
    let now = ctx.world.current_time;
    ctx.world.parties.get(&id).is_some_and(|p| {
        p.state == PartyState::Active
            && !p.in_battle
            && !p.quest_locked
            && p.total_men() > 0
            && !(p.is_managed() && lifecycle::on_cooldown(p, now, ctx.settings))
    })
}

/// The fallible core of a merge: returns the new party's id, or the first
/// failure encountered. Callers other than `try_merge` own the teardown of
/// the sources on error.
pub fn merge_parties(ctx: &mut TickContext, a: u64, b: u64) -> Result<u64, WorldError> {
    let now = ctx.world.current_time;

    // Read phase: resolve everything fallible before mutating either source.
    let (leader_a, home_a, position_a, avoidance_a) = {
        let party = ctx.world.party(a)?;
        (
            party.leader,
            party.home_settlement,
            party.position,
            party.avoidance.clone(),
        )
    };
    let (leader_b, home_b, avoidance_b) = {
        let party = ctx.world.party(b)?;
        (party.leader, party.home_settlement, party.avoidance.clone())
    };

    let leader = match (leader_a, leader_b) {
        (Some(la), Some(lb)) => {
            if ctx.world.hero(la)?.power >= ctx.world.hero(lb)?.power {
                Some(la)
            } else {
                Some(lb)
            }
        }
        (Some(la), None) => Some(la),
        (None, Some(lb)) => Some(lb),
        (None, None) => None,
    };
    let a_is_stronger = ctx.world.party_strength(a)? > ctx.world.party_strength(b)?;
    let home = resolve_home(
        ctx.world,
        leader,
        home_a,
        home_b,
        a_is_stronger,
        position_a,
    )?;
    let clan = ctx.world.settlement(home)?.owner_clan;
    let avoidance = average_avoidance(&avoidance_a, &avoidance_b);

    // Mutate phase: claim both sources, then combine their rosters.
    ctx.world.party_mut(a)?.state = PartyState::Merging;
    ctx.world.party_mut(b)?.state = PartyState::Merging;

    let mut troops_a = mem::take(&mut ctx.world.party_mut(a)?.troops);
    let mut troops_b = mem::take(&mut ctx.world.party_mut(b)?.troops);
    let mut combined_troops = roster_ops::merge_rosters(&mut troops_a, &mut troops_b);
    let mut prisoners_a = mem::take(&mut ctx.world.party_mut(a)?.prisoners);
    let mut prisoners_b = mem::take(&mut ctx.world.party_mut(b)?.prisoners);
    let combined_prisoners = roster_ops::merge_rosters(&mut prisoners_a, &mut prisoners_b);
    let mut inventory_a = mem::take(&mut ctx.world.party_mut(a)?.inventory);
    let mut inventory_b = mem::take(&mut ctx.world.party_mut(b)?.inventory);
    let combined_inventory = roster_ops::merge_inventories(&mut inventory_a, &mut inventory_b);

    // The leader who lost the command keeps marching as a member.
    for lost in [leader_a, leader_b].into_iter().flatten() {
        if Some(lost) != leader {
            combined_troops.add_hero(lost);
        }
    }

    let spec = PartySpec {
        kind: PartyKind::Managed,
        clan,
        leader,
        home_settlement: Some(home),
        position: position_a,
        troops: combined_troops,
        prisoners: combined_prisoners,
        inventory: combined_inventory,
    };
    let new_id = ctx.world.register_party(spec, now)?;
    ctx.world.party_mut(new_id)?.avoidance = avoidance;
    if let Err(err) = lifecycle::init_party(ctx, new_id) {
        lifecycle::trash(ctx, new_id);
        return Err(err);
    }

    lifecycle::trash(ctx, a);
    lifecycle::trash(ctx, b);
    ctx.budget
        .recompute(ctx.world, ctx.settings, ctx.population, true);
    Ok(new_id)
}

/// Home-base preference chain: the chosen leader's home, then the stronger
/// source's hideout-type home, then the other's, then the nearest hideout to
/// the merge location.
fn resolve_home(
    world: &World,
    leader: Option<u64>,
    home_a: Option<u64>,
    home_b: Option<u64>,
    a_is_stronger: bool,
    position: Position,
) -> Result<u64, WorldError> {
    if let Some(hero) = leader
        && let Some(home) = world.hero(hero)?.home_settlement
        && world.settlements.contains_key(&home)
    {
        return Ok(home);
    }
    let hideout_home = |home: Option<u64>| {
        home.filter(|id| world.settlements.get(id).is_some_and(|s| s.is_hideout()))
    };
    let preferred = if a_is_stronger {
        hideout_home(home_a).or_else(|| hideout_home(home_b))
    } else {
        hideout_home(home_b).or_else(|| hideout_home(home_a))
    };
    if let Some(home) = preferred {
        return Ok(home);
    }
    helpers::nearest_hideout(world, position).ok_or(WorldError::NoHideouts)
}

/// Key-wise arithmetic mean of two avoidance maps. A key present on only one
/// side keeps its value; no weighting by troop count.
fn average_avoidance(
    a: &BTreeMap<u64, f32>,
    b: &BTreeMap<u64, f32>,
) -> BTreeMap<u64, f32> {
    let mut averaged = a.clone();
    for (&rival, &score) in b {
        averaged
            .entry(rival)
            .and_modify(|existing| *existing = (*existing + score) / 2.0)
            .or_insert(score);
    }
    averaged
}

//! Hourly macro-behavior for managed warbands: idle parties pick a patrol
//! haunt, patrolling parties consider raiding, and completed raids release
//! the party. Movement itself is the host's job; this system only sets
//! objectives.

use rand::Rng;

use super::avoidance;
use super::context::TickContext;
use super::helpers;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency};
use crate::model::party::Objective;
use crate::model::{PartyState, RaidState};

/// Idle parties pick a patrol target from settlements within this range.
const SETTLEMENT_FIND_RANGE: f32 = 200.0;

pub struct ThinkSystem;

impl SimSystem for ThinkSystem {
    fn name(&self) -> &str {
        "think"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Hourly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        ctx.budget
            .recompute(ctx.world, ctx.settings, ctx.population, false);
        let ids: Vec<u64> = ctx.population.managed(ctx.world, false).to_vec();
        for id in ids {
            think(ctx, id);
        }
    }

    fn handle_signals(&mut self, ctx: &mut TickContext) {
        for signal in ctx.inbox.to_vec() {
            if let SignalKind::RaidCompleted { party, settlement } = signal.kind {
                tracing::debug!("party {party} finished raiding settlement {settlement}");
                if let Ok(p) = ctx.world.party_mut(party) {
                    p.objective = Objective::Hold;
                }
            }
        }
    }
}

fn think(ctx: &mut TickContext, id: u64) {
    let Some(party) = ctx.world.parties.get(&id) else {
        return;
    };
    if party.state != PartyState::Active || party.is_busy() {
        return;
    }
    match party.objective {
        Objective::Hold => assign_patrol(ctx, id),
        Objective::Patrol { .. } => consider_raid(ctx, id),
        _ => {}
    }
}

/// Pick a random settlement within range to patrol around.
fn assign_patrol(ctx: &mut TickContext, id: u64) {
    let Some(position) = ctx.world.parties.get(&id).map(|p| p.position) else {
        return;
    };
    let nearby: Vec<u64> = ctx
        .world
        .settlements
        .values()
        .filter(|s| s.position.distance(position) < SETTLEMENT_FIND_RANGE)
        .map(|s| s.id)
        .collect();
    if nearby.is_empty() {
        return;
    }
    let settlement = nearby[ctx.rng.random_range(0..nearby.len())];
    if let Ok(party) = ctx.world.party_mut(id) {
        party.objective = Objective::Patrol { settlement };
    }
}

/// A patrolling warband with a leader and above-average strength may pick a
/// hostile village to raid, unless its memory of the owner says otherwise.
fn consider_raid(ctx: &mut TickContext, id: u64) {
    if !ctx.settings.allow_pillaging {
        return;
    }
    let (clan, position, has_leader) = {
        let Some(party) = ctx.world.parties.get(&id) else {
            return;
        };
        (party.clan, party.position, party.leader.is_some())
    };
    if !has_leader {
        return;
    }
    let strength = ctx.world.party_strength(id).unwrap_or(0.0);
    if strength <= ctx.budget.average_party_power {
        return;
    }
    let raid_roll: f32 = ctx.rng.random::<f32>() * 100.0;
    if raid_roll >= ctx.settings.pillaging_chance {
        return;
    }
    if helpers::active_raid_count(ctx.world) >= helpers::raid_cap(ctx.world) {
        return;
    }

    let target = ctx
        .world
        .settlements
        .values()
        .filter(|s| {
            s.is_village()
                && s.raid_state == RaidState::Quiet
                && helpers::are_hostile(ctx.world, clan, s.owner_clan)
        })
        .min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
        })
        .map(|s| (s.id, s.owner_clan, s.name.clone()));
    let Some((settlement, owner_clan, settlement_name)) = target else {
        return;
    };

    // Consult the scar tissue: a remembered beating by this owner's leader
    // stochastically calls the raid off.
    if let Some(owner_leader) = ctx.world.clans.get(&owner_clan).and_then(|c| c.leader)
        && let Some(party) = ctx.world.parties.get(&id)
        && avoidance::should_avoid(party, owner_leader, ctx.rng)
    {
        tracing::debug!("party {id} avoided raiding {settlement_name}");
        return;
    }

    let player_clan = ctx
        .world
        .player_party
        .and_then(|p| ctx.world.parties.get(&p))
        .map(|p| p.clan);
    let party_name = match ctx.world.party_mut(id) {
        Ok(party) => {
            party.objective = Objective::Raid { settlement };
            party.name.clone()
        }
        Err(_) => return,
    };
    tracing::debug!("{party_name}({id}) decided to raid {settlement_name}");
    if Some(owner_clan) == player_clan {
        ctx.signals.push(Signal {
            kind: SignalKind::Notice {
                text: format!("{party_name} is raiding your village {settlement_name}!"),
            },
        });
    }
}

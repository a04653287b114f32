//! Per-warband memory of past defeats: a decaying score per rival hero,
//! consulted as a percent chance to back off before raiding that rival's
//! assets. Written by combat-outcome signals, decayed weekly within a
//! spatial radius.

use rand::{Rng, RngCore};

use super::context::TickContext;
use super::signal::SignalKind;
use super::system::{SimSystem, TickFrequency};
use crate::model::timestamp::DAYS_PER_WEEK;
use crate::model::{Party, Position};

/// Bounds of the random score gained when a nearby warband is destroyed.
const GAIN_MIN: u32 = 15;
const GAIN_MAX: u32 = 35;

/// Weekly decay step, and the step a victory shaves off.
pub(crate) const DECAY_INCREMENT: f32 = 5.0;

/// Warbands within this radius of a destroyed party learn to fear its
/// destroyer.
const EFFECT_RADIUS: f32 = 100.0;

/// Warbands within this radius of each other decay together.
const ADJUST_RADIUS: f32 = 50.0;

fn random_gain(rng: &mut dyn RngCore) -> f32 {
    rng.random_range(GAIN_MIN..=GAIN_MAX) as f32
}

/// Raise a party's avoidance of `rival` by a random increment, inserting the
/// key if absent.
pub fn increase(party: &mut Party, rival: u64, rng: &mut dyn RngCore) {
    let gain = random_gain(rng);
    *party.avoidance.entry(rival).or_insert(0.0) += gain;
}

/// Subtract `amount` from every score, flooring at zero. Keys are never
/// removed; zero is a valid steady state.
pub fn decrease_all(party: &mut Party, amount: f32) {
    for score in party.avoidance.values_mut() {
        *score = (*score - amount).max(0.0);
    }
}

/// Roll against the stored score for `rival`, treated as a percent chance to
/// avoid. An absent key, or a score of exactly zero, never avoids.
pub fn should_avoid(party: &Party, rival: u64, rng: &mut dyn RngCore) -> bool {
    match party.avoidance.get(&rival) {
        Some(&score) => rng.random_range(0.0..100.0) < score,
        None => false,
    }
}

/// Hourly system: reacts to combat-outcome signals every tick and runs the
/// weekly spatial decay pass.
pub struct AvoidanceSystem;

impl SimSystem for AvoidanceSystem {
    fn name(&self) -> &str {
        "avoidance"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Hourly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let time = ctx.world.current_time;
        if time.hour() == 0 && time.day() % DAYS_PER_WEEK == 0 {
            decay_near_warbands(ctx);
        }
    }

    fn handle_signals(&mut self, ctx: &mut TickContext) {
        for signal in ctx.inbox.to_vec() {
            match signal.kind {
                SignalKind::PartyDestroyed {
                    party_leader,
                    destroyer_party,
                    destroyer_leader,
                    position,
                    ..
                } => on_party_destroyed(
                    ctx,
                    party_leader,
                    destroyer_party,
                    destroyer_leader,
                    position,
                ),
                SignalKind::VictoryOver {
                    party,
                    rival_leader,
                } => on_victory(ctx, party, rival_leader),
                _ => {}
            }
        }
    }
}

/// Weekly decay, spatial rather than global: every managed party drags the
/// scores of managed parties around it (itself included) down one step.
fn decay_near_warbands(ctx: &mut TickContext) {
    let triggers: Vec<(u64, Position)> = ctx
        .population
        .managed(ctx.world, true)
        .iter()
        .filter_map(|&id| ctx.world.parties.get(&id).map(|p| (id, p.position)))
        .collect();
    for &(_, position) in &triggers {
        for &(other, other_position) in &triggers {
            if position.distance(other_position) < ADJUST_RADIUS
                && let Some(party) = ctx.world.parties.get_mut(&other)
                && party.leader.is_some()
            {
                decrease_all(party, DECAY_INCREMENT);
            }
        }
    }
}

fn on_party_destroyed(
    ctx: &mut TickContext,
    party_leader: Option<u64>,
    destroyer_party: Option<u64>,
    destroyer_leader: Option<u64>,
    position: Position,
) {
    // The destroyer has nothing left to fear from the fallen leader.
    if let (Some(destroyer), Some(fallen)) = (destroyer_party, party_leader)
        && let Some(party) = ctx.world.parties.get_mut(&destroyer)
        && party.is_managed()
    {
        party.avoidance.remove(&fallen);
    }

    let Some(destroyer_leader) = destroyer_leader else {
        return;
    };
    let witnesses: Vec<u64> = ctx
        .population
        .managed(ctx.world, false)
        .iter()
        .copied()
        .filter(|&id| {
            ctx.world
                .parties
                .get(&id)
                .is_some_and(|p| p.position.distance(position) < EFFECT_RADIUS)
        })
        .collect();
    for id in witnesses {
        if let Some(party) = ctx.world.parties.get_mut(&id) {
            increase(party, destroyer_leader, ctx.rng);
        }
    }
}

fn on_victory(ctx: &mut TickContext, party: u64, rival_leader: u64) {
    let Some(party) = ctx.world.parties.get_mut(&party) else {
        return;
    };
    if !party.is_managed() {
        return;
    }
    match party.avoidance.entry(rival_leader) {
        std::collections::btree_map::Entry::Occupied(mut entry) => {
            let score = entry.get_mut();
            *score = (*score - DECAY_INCREMENT).max(0.0);
        }
        std::collections::btree_map::Entry::Vacant(entry) => {
            entry.insert(random_gain(ctx.rng));
        }
    }
}

//! Spontaneous warband formation out of hideouts, throttled by the remaining
//! power-budget headroom.

use rand::Rng;

use super::context::TickContext;
use super::helpers;
use super::lifecycle;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency};
use crate::model::{FormationClass, PartyKind, PartySpec, TroopRoster, WorldError};

/// Hard cap on spawn attempts per tick regardless of headroom.
const SPAWN_LOOP_SAFETY_LIMIT: u32 = 100;

/// Budget headroom (in percent points) consumed per allotted attempt.
const HEADROOM_PER_ITERATION: f32 = 24.0;

/// Hideouts closer than this to the player never spawn.
const MIN_DISTANCE_FROM_PLAYER: f32 = 100.0;

pub struct SpawnSystem;

impl SimSystem for SpawnSystem {
    fn name(&self) -> &str {
        "spawn"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Hourly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        spawn_tick(ctx);
    }
}

/// One spawn pass. Every per-iteration failure is contained: the half-built
/// warband is torn down and the loop moves on.
pub fn spawn_tick(ctx: &mut TickContext) {
    if !ctx.settings.spawn_enabled {
        return;
    }
    ctx.budget
        .recompute(ctx.world, ctx.settings, ctx.population, false);
    let headroom = ctx.settings.global_power_percent - ctx.budget.managed_power_percent;
    if headroom <= 0.0 {
        return;
    }

    let player_position = ctx.world.player_position();
    let hideouts: Vec<u64> = ctx
        .world
        .settlements
        .values()
        .filter(|s| s.is_hideout())
        .filter(|s| {
            player_position
                .is_none_or(|p| s.position.distance(p) > MIN_DISTANCE_FROM_PLAYER)
        })
        .map(|s| s.id)
        .collect();
    if hideouts.is_empty() {
        tracing::warn!("no hideout available for spawning a warband");
        return;
    }
    let origin = hideouts[ctx.rng.random_range(0..hideouts.len())];

    let max_iterations =
        ((headroom / HEADROOM_PER_ITERATION).ceil() as u32).min(SPAWN_LOOP_SAFETY_LIMIT);
    for _ in 0..max_iterations {
        if ctx.budget.managed_power_percent + 1.0 > ctx.settings.global_power_percent {
            break;
        }
        if ctx.rng.random_range(0..=100) > ctx.settings.spawn_chance {
            continue;
        }
        if let Err(err) = spawn_one(ctx, origin) {
            tracing::warn!("warband spawn at settlement {origin} failed: {err}");
        }
    }
}

fn spawn_one(ctx: &mut TickContext, origin: u64) -> Result<(), WorldError> {
    let now = ctx.world.current_time;
    let min = ctx.settings.min_party_size;
    let max = (ctx.budget.calculated_max_party_size as u32).max(min);
    let size = ctx.rng.random_range(min..=max);

    let roster = generate_roster(ctx, size);
    if roster.total_men() == 0 {
        // Invariant violation, not a transient failure: the caller logs it
        // and moves on to the next iteration.
        return Err(WorldError::EmptyRoster);
    }

    let (culture, owner_clan, position) = {
        let settlement = ctx.world.settlement(origin)?;
        (settlement.culture, settlement.owner_clan, settlement.position)
    };
    let clan = ctx
        .world
        .clans
        .values()
        .find(|c| c.is_outlaw() && c.culture == culture)
        .or_else(|| ctx.world.clans.values().find(|c| c.is_outlaw()))
        .map_or(owner_clan, |c| c.id);

    let leader = helpers::create_warband_hero(ctx.world, origin, clan, ctx.rng)?;
    let spec = PartySpec {
        kind: PartyKind::Managed,
        clan,
        leader: Some(leader),
        home_settlement: Some(origin),
        position,
        troops: roster,
        prisoners: TroopRoster::new(),
        inventory: Default::default(),
    };
    let id = ctx.world.register_party(spec, now)?;
    if let Err(err) = lifecycle::init_party(ctx, id) {
        lifecycle::trash(ctx, id);
        return Err(err);
    }

    // New warbands are enemies of the player from the first hour, whatever
    // diplomacy says. Checked before changing, so repeat spawns are no-ops.
    let player_clan = ctx
        .world
        .player_party
        .and_then(|p| ctx.world.parties.get(&p))
        .map(|p| p.clan);
    if let Some(player_clan) = player_clan
        && ctx.world.force_hostility(clan, player_clan)
    {
        tracing::debug!("forced hostility between clan {clan} and the player");
    }

    ctx.budget
        .recompute(ctx.world, ctx.settings, ctx.population, true);
    let name = ctx.world.party(id)?.name.clone();
    tracing::debug!("spawned {name}({id}) at settlement {origin}");
    ctx.signals.push(Signal {
        kind: SignalKind::Notice {
            text: format!("{name} has formed in the wilds"),
        },
    });
    Ok(())
}

/// Roll a three-way formation split and fill a roster from the outlaw troop
/// pools proportionally to the target size.
fn generate_roster(ctx: &mut TickContext, size: u32) -> TroopRoster {
    let mut foot: u32 = ctx.rng.random_range(40..=60);
    let spread = ctx.rng.random_range(35..(100 - foot));
    let mut ranged: u32 = ctx.rng.random_range(20..=spread);
    let mut horse: u32 = 100 - foot - ranged;

    // No cavalry-capable types? Fold the cavalry share into the others.
    if helpers::basic_troops(ctx.world, FormationClass::Cavalry).is_empty() {
        foot += horse.div_ceil(2);
        ranged += horse / 2;
        horse = 0;
    }

    let mut roster = TroopRoster::new();
    for (class, share) in [
        (FormationClass::Infantry, foot),
        (FormationClass::Ranged, ranged),
        (FormationClass::Cavalry, horse),
    ] {
        let pool = helpers::basic_troops(ctx.world, class);
        if pool.is_empty() {
            continue;
        }
        let quota = (share as f32 * size as f32 / 100.0).ceil() as u32;
        for _ in 0..quota {
            let troop = pool[ctx.rng.random_range(0..pool.len())];
            roster.add_to_counts(troop, 1);
        }
    }
    roster
}

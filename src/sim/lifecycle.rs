//! Lifecycle gating and crash-safe teardown shared by the merge, split, and
//! spawn engines: `Spawning → Active → {Merging|Splitting} → Trashed`, with
//! leaderless as a re-enterable sub-state of `Active`.

use rand::Rng;

use super::context::TickContext;
use super::helpers;
use super::system::{SimSystem, TickFrequency};
use crate::config::Settings;
use crate::model::{Party, PartyState, SimTimestamp, World, WorldError};

/// Per-day survival chance for a managed hero imprisoned by a non-player
/// clan before the cleanup reclaims them.
const IMPRISONED_REMOVAL_CHANCE: f64 = 0.5;

/// True while the party's last merge/split is inside the cooldown window.
pub fn on_cooldown(party: &Party, now: SimTimestamp, settings: &Settings) -> bool {
    now < party
        .last_merged_or_split
        .add_hours(u64::from(settings.cooldown_hours))
}

/// Tear a party down: mark it trashed, drop its objective, and invalidate the
/// population cache. Idempotent: trashing a trashed or missing party does
/// nothing and never fails, so a failed teardown can never cascade.
pub fn trash(ctx: &mut TickContext, id: u64) {
    match ctx.world.parties.get_mut(&id) {
        None => {
            tracing::debug!("trash: party {id} already gone");
        }
        Some(party) if party.state == PartyState::Trashed => {}
        Some(party) => {
            tracing::debug!("trashing {}({})", party.name, id);
            party.state = PartyState::Trashed;
            party.objective = Default::default();
            party.in_battle = false;
            ctx.population.invalidate();
        }
    }
}

/// Recompute a party's display name from its leader.
pub fn refresh_name(world: &mut World, settings: &Settings, id: u64) -> Result<(), WorldError> {
    let leader = world.party(id)?.leader;
    let name = match leader {
        Some(hero) => {
            let first = world.hero(hero)?.name.clone();
            format!("{first}'s {}", settings.warband_name)
        }
        None => settings.leaderless_name.clone(),
    };
    world.party_mut(id)?.name = name;
    Ok(())
}

/// Finish initializing a freshly registered party: assign its display name
/// and promote `Spawning → Active`.
pub fn init_party(ctx: &mut TickContext, id: u64) -> Result<(), WorldError> {
    refresh_name(ctx.world, ctx.settings, id)?;
    let party = ctx.world.party_mut(id)?;
    party.state = PartyState::Active;
    ctx.population.invalidate();
    Ok(())
}

/// Let the highest-power hero member take over a leaderless party.
/// Returns true when a takeover happened.
pub fn promote_leader(
    world: &mut World,
    settings: &Settings,
    id: u64,
) -> Result<bool, WorldError> {
    let party = world.party(id)?;
    if party.leader.is_some() || party.troops.heroes.is_empty() {
        return Ok(false);
    }
    let mut best: Option<(u64, f32)> = None;
    for &hero_id in &party.troops.heroes {
        let power = world.hero(hero_id)?.power;
        if best.is_none_or(|(_, p)| power > p) {
            best = Some((hero_id, power));
        }
    }
    let Some((new_leader, _)) = best else {
        return Ok(false);
    };
    let party = world.party_mut(id)?;
    party.leader = Some(new_leader);
    party.troops.remove_hero(new_leader);
    party.objective = Default::default();
    refresh_name(world, settings, id)?;
    tracing::debug!("hero {new_leader} took over party {id}");
    Ok(true)
}

/// Trash every managed party and remove every managed hero. Host-facing
/// maintenance hatch for corrupted saves; also the cleanest full-teardown
/// exercise the tests have.
pub fn nuke(ctx: &mut TickContext) -> bool {
    let managed: Vec<u64> = ctx.population.managed(ctx.world, true).to_vec();
    for id in managed {
        trash(ctx, id);
    }
    let heroes: Vec<u64> = ctx.world.managed_heroes.iter().copied().collect();
    for hero in heroes {
        remove_managed_hero(ctx.world, hero);
    }
    ctx.population.invalidate();
    let leftovers = ctx
        .population
        .managed(ctx.world, true)
        .len();
    tracing::debug!("managed parties after nuke: {leftovers}");
    leftovers == 0
}

fn remove_managed_hero(world: &mut World, hero: u64) {
    world.managed_heroes.remove(&hero);
    world.heroes.remove(&hero);
    // Scrub roster references so no active party points at a removed hero.
    for party in world.parties.values_mut() {
        party.troops.remove_hero(hero);
        party.prisoners.remove_hero(hero);
        if party.leader == Some(hero) {
            party.leader = None;
        }
        party.avoidance.remove(&hero);
    }
}

/// Daily housekeeping: reclaim stray and imprisoned managed heroes, disperse
/// defeated remnants, and report the population census.
pub struct CleanupSystem;

impl SimSystem for CleanupSystem {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        reclaim_stray_heroes(ctx);
        reclaim_imprisoned_heroes(ctx);
        disperse_remnants(ctx);
        census(ctx);
    }
}

fn reclaim_stray_heroes(ctx: &mut TickContext) {
    let strays: Vec<u64> = ctx
        .world
        .managed_heroes
        .iter()
        .copied()
        .filter(|&h| {
            helpers::hero_party(ctx.world, h).is_none()
                && helpers::hero_captor(ctx.world, h).is_none()
        })
        .collect();
    for hero in strays {
        tracing::debug!("removing stray managed hero {hero}");
        remove_managed_hero(ctx.world, hero);
    }
}

fn reclaim_imprisoned_heroes(ctx: &mut TickContext) {
    let player_clan = ctx
        .world
        .player_party
        .and_then(|id| ctx.world.parties.get(&id))
        .map(|p| p.clan);
    let imprisoned: Vec<u64> = ctx
        .world
        .managed_heroes
        .iter()
        .copied()
        .filter_map(|h| helpers::hero_captor(ctx.world, h).map(|captor| (h, captor)))
        .filter(|&(_, captor)| {
            let captor_clan = ctx.world.parties.get(&captor).map(|p| p.clan);
            captor_clan.is_some() && captor_clan != player_clan
        })
        .map(|(h, _)| h)
        .collect();
    for hero in imprisoned {
        if ctx.rng.random::<f64>() < IMPRISONED_REMOVAL_CHANCE {
            continue;
        }
        tracing::debug!("removing imprisoned managed hero {hero}");
        remove_managed_hero(ctx.world, hero);
    }
}

fn disperse_remnants(ctx: &mut TickContext) {
    let disperse_size = ctx.settings.disperse_size;
    let remnants: Vec<u64> = ctx
        .population
        .managed(ctx.world, true)
        .iter()
        .copied()
        .filter(|&id| {
            ctx.world
                .parties
                .get(&id)
                .is_some_and(|p| !p.is_busy() && p.total_men() < disperse_size)
        })
        .collect();
    for id in remnants {
        tracing::debug!("dispersing remnant party {id}");
        trash(ctx, id);
    }
}

fn census(ctx: &mut TickContext) {
    let free_bandits = ctx
        .world
        .parties
        .values()
        .filter(|p| p.is_active() && p.is_bandit() && !p.is_managed())
        .count();
    let managed: Vec<u64> = ctx.population.managed(ctx.world, false).to_vec();
    let leaderless = managed
        .iter()
        .filter(|&&id| {
            ctx.world
                .parties
                .get(&id)
                .is_some_and(Party::is_leaderless)
        })
        .count();
    tracing::debug!(
        "day {} report: {free_bandits} free bandits, {} warbands, {leaderless} leaderless",
        ctx.world.current_time.day(),
        managed.len()
    );
    for &id in &managed {
        if let Some(party) = ctx.world.parties.get(&id) {
            if !ctx.world.clans.contains_key(&party.clan) {
                tracing::warn!("{}({id}) does not have a clan", party.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_world, test_context};

    #[test]
    fn trash_is_idempotent() {
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(30);
        let (mut state, mut rng, mut signals) = test_context(&fixture);
        let mut ctx = crate::testutil::make_ctx(
            &mut fixture.world,
            &mut state,
            &mut rng,
            &mut signals,
        );

        trash(&mut ctx, id);
        assert_eq!(ctx.world.party(id).unwrap().state, PartyState::Trashed);
        trash(&mut ctx, id);
        assert_eq!(ctx.world.party(id).unwrap().state, PartyState::Trashed);
        // Unknown ids are fine too.
        trash(&mut ctx, 424_242);
    }

    #[test]
    fn cooldown_window_is_inclusive_of_the_last_hour() {
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(30);
        let settings = Settings::default();
        let party = fixture.world.party(id).unwrap();
        let anchor = party.last_merged_or_split;
        assert!(on_cooldown(party, anchor.add_hours(23), &settings));
        assert!(!on_cooldown(party, anchor.add_hours(24), &settings));
    }

    #[test]
    fn promote_leader_picks_highest_power_hero() {
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(30);
        let weak = fixture.add_hero(5.0);
        let strong = fixture.add_hero(50.0);
        let settings = Settings::default();
        {
            let party = fixture.world.parties.get_mut(&id).unwrap();
            party.leader = None;
            party.troops.add_hero(weak);
            party.troops.add_hero(strong);
        }
        let promoted = promote_leader(&mut fixture.world, &settings, id).unwrap();
        assert!(promoted);
        let party = fixture.world.party(id).unwrap();
        assert_eq!(party.leader, Some(strong));
        assert!(!party.troops.heroes.contains(&strong));
        assert!(party.troops.heroes.contains(&weak));
        assert!(party.name.contains('\''));
    }

    #[test]
    fn promote_leader_noop_with_existing_leader() {
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(30);
        let settings = Settings::default();
        let promoted = promote_leader(&mut fixture.world, &settings, id).unwrap();
        assert!(!promoted);
    }

    #[test]
    fn nuke_clears_the_managed_population() {
        let mut fixture = build_world();
        fixture.spawn_managed_party(30);
        fixture.spawn_managed_party(25);
        let (mut state, mut rng, mut signals) = test_context(&fixture);
        let mut ctx = crate::testutil::make_ctx(
            &mut fixture.world,
            &mut state,
            &mut rng,
            &mut signals,
        );
        assert!(nuke(&mut ctx));
        assert!(ctx.world.managed_heroes.is_empty());
        assert!(
            ctx.world
                .parties
                .values()
                .filter(|p| p.is_managed())
                .all(|p| p.state == PartyState::Trashed)
        );
    }
}

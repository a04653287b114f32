use rand::{Rng, RngCore};

use crate::model::party::Objective;
use crate::model::{
    FormationClass, Hero, Position, SettlementKind, TroopRoster, World, WorldError,
};

/// Radius scanned when deriving the most common culture around a point.
const PREVALENT_CULTURE_RADIUS: f32 = 100.0;

/// Villages per concurrently allowed raid.
const VILLAGES_PER_RAID_SLOT: usize = 10;

const WARBAND_HERO_NAMES: &[&str] = &[
    "Brakka", "Vael", "Ossian", "Mirga", "Thorne", "Jessa", "Kettil", "Ruva",
    "Dainn", "Sable", "Corvo", "Ysolt", "Garrick", "Nessa", "Ulfar", "Petra",
];

/// Find the hideout nearest to `position`, if any exist.
pub fn nearest_hideout(world: &World, position: Position) -> Option<u64> {
    world
        .settlements
        .values()
        .filter(|s| s.is_hideout())
        .min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
        })
        .map(|s| s.id)
}

/// True when any hideout lies within `radius` of `position`.
pub fn hideout_within(world: &World, position: Position, radius: f32) -> bool {
    world
        .settlements
        .values()
        .any(|s| s.is_hideout() && s.position.distance(position) < radius)
}

/// Active parties (other than `exclude`) within `radius` of `position`,
/// nearest first.
pub fn parties_within(world: &World, position: Position, radius: f32, exclude: u64) -> Vec<u64> {
    let mut found: Vec<(u64, f32)> = world
        .parties
        .values()
        .filter(|p| p.id != exclude && p.is_active())
        .map(|p| (p.id, p.position.distance(position)))
        .filter(|&(_, d)| d < radius)
        .collect();
    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found.into_iter().map(|(id, _)| id).collect()
}

/// Number of mounted regulars in a roster. Unknown troop types count as
/// unmounted rather than failing; this feeds precondition checks, not
/// accounting.
pub fn mounted_count(world: &World, roster: &TroopRoster) -> u32 {
    roster
        .stacks
        .iter()
        .filter(|s| {
            world
                .troop_types
                .get(&s.troop)
                .is_some_and(|t| t.mounted)
        })
        .map(|s| s.count)
        .sum()
}

/// The active party a hero currently marches with (as leader or member).
pub fn hero_party(world: &World, hero: u64) -> Option<u64> {
    world
        .parties
        .values()
        .find(|p| {
            p.is_active() && (p.leader == Some(hero) || p.troops.heroes.contains(&hero))
        })
        .map(|p| p.id)
}

/// The active party holding a hero prisoner, if any.
pub fn hero_captor(world: &World, hero: u64) -> Option<u64> {
    world
        .parties
        .values()
        .find(|p| p.is_active() && p.prisoners.heroes.contains(&hero))
        .map(|p| p.id)
}

/// Most common culture among non-hideout settlements near a point. Ties break
/// toward the lowest culture id; returns `None` in an empty neighborhood.
pub fn most_prevalent_culture(world: &World, position: Position) -> Option<u64> {
    let mut counts: std::collections::BTreeMap<u64, u32> = Default::default();
    for settlement in world.settlements.values() {
        if settlement.is_hideout() {
            continue;
        }
        if settlement.position.distance(position) < PREVALENT_CULTURE_RADIUS {
            *counts.entry(settlement.culture).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(culture, _)| culture)
}

/// Outlaw troop types of a formation class: the pool spawned warbands draw
/// from.
pub fn basic_troops(world: &World, class: FormationClass) -> Vec<u64> {
    world
        .troop_types
        .values()
        .filter(|t| t.is_outlaw && t.class == class && t.tier <= 2)
        .map(|t| t.id)
        .collect()
}

/// Non-outlaw recruit types of a culture: looter-conversion targets.
pub fn recruits_of_culture(world: &World, culture: u64) -> Vec<u64> {
    world
        .troop_types
        .values()
        .filter(|t| !t.is_outlaw && !t.is_looter && t.tier <= 2 && t.culture == Some(culture))
        .map(|t| t.id)
        .collect()
}

/// Concurrent raid ceiling: one slot per ten villages.
pub fn raid_cap(world: &World) -> usize {
    world
        .settlements
        .values()
        .filter(|s| s.kind == SettlementKind::Village)
        .count()
        / VILLAGES_PER_RAID_SLOT
}

/// Managed parties currently executing a raid objective.
pub fn active_raid_count(world: &World) -> usize {
    world
        .parties
        .values()
        .filter(|p| {
            p.is_active() && p.is_managed() && matches!(p.objective, Objective::Raid { .. })
        })
        .count()
}

/// Hostility check for raid targeting: a declared war, or the implicit
/// outlaw-versus-noble enmity.
pub fn are_hostile(world: &World, clan_a: u64, clan_b: u64) -> bool {
    if world.is_at_war(clan_a, clan_b) {
        return true;
    }
    match (world.clans.get(&clan_a), world.clans.get(&clan_b)) {
        (Some(a), Some(b)) => a.kind != b.kind,
        _ => false,
    }
}

/// Create a leader hero for a managed warband based at `settlement`,
/// registered in the managed-hero roster. Appearance and equipment are host
/// concerns; the engine only needs power, clan, and home.
pub fn create_warband_hero(
    world: &mut World,
    settlement: u64,
    clan: u64,
    rng: &mut dyn RngCore,
) -> Result<u64, WorldError> {
    world.settlement(settlement)?;
    world.clan(clan)?;
    let id = world.id_gen.next_id();
    let name = WARBAND_HERO_NAMES[rng.random_range(0..WARBAND_HERO_NAMES.len())];
    let power = 20.0 + rng.random::<f32>() * 20.0;
    world.add_hero(Hero {
        id,
        name: name.to_string(),
        power,
        clan: Some(clan),
        home_settlement: Some(settlement),
        alive: true,
    });
    world.managed_heroes.insert(id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::testutil::build_world;

    #[test]
    fn nearest_hideout_picks_closest() {
        let fixture = build_world();
        let near = fixture
            .world
            .settlement(fixture.hideout)
            .unwrap()
            .position;
        assert_eq!(
            nearest_hideout(&fixture.world, near),
            Some(fixture.hideout)
        );
    }

    #[test]
    fn parties_within_sorts_by_distance() {
        let mut fixture = build_world();
        let a = fixture.spawn_managed_party_at(25, Position::new(0.0, 0.0));
        let b = fixture.spawn_managed_party_at(25, Position::new(3.0, 0.0));
        let c = fixture.spawn_managed_party_at(25, Position::new(1.0, 0.0));
        let found = parties_within(&fixture.world, Position::new(0.0, 0.0), 5.0, b);
        assert_eq!(found[0], a);
        assert_eq!(found[1], c);
        assert!(!found.contains(&b));
    }

    #[test]
    fn hero_party_finds_leaders_and_members() {
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(25);
        let leader = fixture.world.party(id).unwrap().leader.unwrap();
        assert_eq!(hero_party(&fixture.world, leader), Some(id));
        assert_eq!(hero_party(&fixture.world, 999_999), None);
    }

    #[test]
    fn created_hero_joins_managed_roster() {
        let mut fixture = build_world();
        let mut rng = SmallRng::seed_from_u64(7);
        let hero = create_warband_hero(
            &mut fixture.world,
            fixture.hideout,
            fixture.outlaw_clan,
            &mut rng,
        )
        .unwrap();
        assert!(fixture.world.managed_heroes.contains(&hero));
        let hero = fixture.world.hero(hero).unwrap();
        assert!(hero.power >= 20.0 && hero.power < 40.0);
    }

    #[test]
    fn outlaws_and_nobles_are_implicitly_hostile() {
        let fixture = build_world();
        assert!(are_hostile(
            &fixture.world,
            fixture.outlaw_clan,
            fixture.noble_clan
        ));
        assert!(!are_hostile(
            &fixture.world,
            fixture.noble_clan,
            fixture.noble_clan
        ));
    }
}

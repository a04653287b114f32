mod common;

use common::{is_trashed, managed_active};
use warband_sim::config::Settings;
use warband_sim::model::Position;
use warband_sim::sim::merge::try_merge;
use warband_sim::sim::split::try_split;
use warband_sim::sim::{CleanupSystem, EngineState};
use warband_sim::testutil::{build_world, make_ctx, test_context, tick_system_at};
use warband_sim::SimTimestamp;
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[test]
fn cooldown_blocks_both_merge_and_split() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(42, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));

    let settings = Settings {
        random_split_chance: 100,
        // Two warbands on the map: keep the budget gate out of the way so
        // only the cooldown decides.
        global_power_percent: 30.0,
        ..Settings::default()
    };
    let mut state = EngineState::new(settings);
    state
        .budget
        .recompute(&fixture.world, &state.settings, &mut state.population, true);
    let mut rng = SmallRng::seed_from_u64(21);
    let mut signals = Vec::new();
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);

    // Freshly registered parties are inside the cooldown window.
    assert!(!try_split(&mut ctx, a));
    assert!(!try_merge(&mut ctx, a, b));
    assert_eq!(ctx.world.party(a).unwrap().total_men(), 42);
    assert_eq!(ctx.world.party(b).unwrap().total_men(), 20);

    // One cooldown later the same split goes through.
    ctx.world.current_time = SimTimestamp::new(1, 2, 0);
    assert!(try_split(&mut ctx, a));
}

#[test]
fn cleanup_reclaims_stray_managed_heroes() {
    let mut fixture = build_world();
    let stray = fixture.add_hero(22.0);
    fixture.world.managed_heroes.insert(stray);

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = CleanupSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        31,
    );

    assert!(!fixture.world.managed_heroes.contains(&stray));
    assert!(!fixture.world.heroes.contains_key(&stray));
}

#[test]
fn cleanup_keeps_heroes_still_leading_parties() {
    let mut fixture = build_world();
    let id = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let leader = fixture.world.party(id).unwrap().leader.unwrap();

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = CleanupSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        32,
    );

    assert!(fixture.world.managed_heroes.contains(&leader));
    assert!(fixture.world.heroes.contains_key(&leader));
}

#[test]
fn cleanup_disperses_undersized_warbands() {
    let mut fixture = build_world();
    let remnant = fixture.spawn_managed_party_at(8, Position::new(60.0, 60.0));
    let healthy = fixture.spawn_managed_party_at(30, Position::new(70.0, 60.0));

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = CleanupSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        33,
    );

    assert!(is_trashed(&fixture.world, remnant));
    assert!(!is_trashed(&fixture.world, healthy));
}

#[test]
fn imprisoned_managed_heroes_fade_over_repeated_days() {
    let mut outcomes = (0u32, 0u32);
    for seed in 0..12 {
        let mut fixture = build_world();
        let captive = fixture.add_hero(18.0);
        fixture.world.managed_heroes.insert(captive);
        // Any captor outside the player's clan qualifies.
        let captor = fixture.spawn_free_bandits_at(15, Position::new(100.0, 100.0));
        fixture
            .world
            .parties
            .get_mut(&captor)
            .unwrap()
            .prisoners
            .add_hero(captive);

        let (mut state, _rng, _signals) = test_context(&fixture);
        let mut system = CleanupSystem;
        tick_system_at(
            &mut fixture.world,
            &mut state,
            &mut system,
            SimTimestamp::new(1, 2, 0),
            seed,
        );
        if fixture.world.heroes.contains_key(&captive) {
            outcomes.0 += 1;
        } else {
            outcomes.1 += 1;
        }
    }
    // A 50% daily roll: across a dozen seeds both outcomes show up.
    assert!(outcomes.0 > 0, "captive never survived");
    assert!(outcomes.1 > 0, "captive never removed");
}

#[test]
fn trashed_parties_leave_every_working_set() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);

    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(try_merge(&mut ctx, a, b));

    let managed = managed_active(ctx.world);
    assert!(!managed.contains(&a));
    assert!(!managed.contains(&b));
    let cached = ctx.population.managed(ctx.world, false).to_vec();
    assert!(!cached.contains(&a));
    assert!(!cached.contains(&b));
}

mod common;

use common::{is_trashed, managed_active, newcomer};
use warband_sim::model::{PartyState, Position};
use warband_sim::sim::merge::try_merge;
use warband_sim::sim::MergeSystem;
use warband_sim::testutil::{build_world, make_ctx, test_context, tick_system_at};
use warband_sim::model::party::Objective;
use warband_sim::SimTimestamp;

#[test]
fn merging_30_and_20_yields_exactly_50() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    let now = fixture.world.current_time;

    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(try_merge(&mut ctx, a, b));

    let merged = newcomer(ctx.world, &[a, b]);
    let party = ctx.world.party(merged).unwrap();
    assert_eq!(party.total_men(), 50);
    assert_eq!(party.last_merged_or_split, now);
    assert_eq!(party.state, PartyState::Active);
    assert!(is_trashed(ctx.world, a));
    assert!(is_trashed(ctx.world, b));
}

#[test]
fn merge_conserves_prisoners_and_inventory() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(25, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    let looter = fixture.looter;
    {
        let party = fixture.world.parties.get_mut(&a).unwrap();
        party.prisoners.add_to_counts(looter, 7);
        party.inventory.add_to_counts(900, 0, 4);
    }
    {
        let party = fixture.world.parties.get_mut(&b).unwrap();
        party.prisoners.add_to_counts(looter, 5);
        party.inventory.add_to_counts(900, 0, 2);
        party.inventory.add_to_counts(901, 1, 1);
    }

    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(try_merge(&mut ctx, a, b));

    let merged = newcomer(ctx.world, &[a, b]);
    let party = ctx.world.party(merged).unwrap();
    assert_eq!(party.prisoners.total_men(), 12);
    assert_eq!(party.inventory.count_of(900, 0), 6);
    assert_eq!(party.inventory.count_of(901, 1), 1);
    // Sources hold nothing after the merge.
    assert!(ctx.world.party(a).unwrap().troops.is_empty());
    assert!(ctx.world.party(a).unwrap().prisoners.is_empty());
}

#[test]
fn merged_leader_is_the_stronger_and_the_other_rides_along() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    let leader_a = fixture.world.party(a).unwrap().leader.unwrap();
    let leader_b = fixture.world.party(b).unwrap().leader.unwrap();
    fixture.world.heroes.get_mut(&leader_b).unwrap().power = 99.0;

    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(try_merge(&mut ctx, a, b));

    let merged = newcomer(ctx.world, &[a, b]);
    let party = ctx.world.party(merged).unwrap();
    assert_eq!(party.leader, Some(leader_b));
    assert!(party.troops.heroes.contains(&leader_a));
}

#[test]
fn merge_averages_avoidance_keywise_unweighted() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    {
        let party = fixture.world.parties.get_mut(&a).unwrap();
        party.avoidance.insert(1000, 40.0);
        party.avoidance.insert(1001, 12.0);
    }
    fixture
        .world
        .parties
        .get_mut(&b)
        .unwrap()
        .avoidance
        .insert(1000, 20.0);

    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(try_merge(&mut ctx, a, b));

    let merged = newcomer(ctx.world, &[a, b]);
    let avoidance = &ctx.world.party(merged).unwrap().avoidance;
    assert_eq!(avoidance[&1000], 30.0);
    assert_eq!(avoidance[&1001], 12.0);
}

#[test]
fn failed_merge_tears_down_both_sources() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    // Simulate the host yanking a hero out from under the engine.
    fixture.world.parties.get_mut(&a).unwrap().leader = Some(987_654);

    let before = managed_active(&fixture.world).len();
    let (mut state, mut rng, mut signals) = test_context(&fixture);
    let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
    assert!(!try_merge(&mut ctx, a, b));

    assert!(is_trashed(ctx.world, a));
    assert!(is_trashed(ctx.world, b));
    // No partial merge survives.
    assert_eq!(managed_active(ctx.world).len(), before - 2);
}

#[test]
fn busy_or_cooled_down_parties_refuse_to_merge() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(30, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(61.0, 60.0));
    // Both were just registered: the cooldown window is still open.
    let (mut state, mut rng, mut signals) = test_context(&fixture);
    {
        let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
        assert!(!try_merge(&mut ctx, a, b));
        assert_eq!(ctx.world.party(a).unwrap().state, PartyState::Active);
        assert_eq!(ctx.world.party(a).unwrap().total_men(), 30);
    }

    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);
    fixture.world.parties.get_mut(&b).unwrap().in_battle = true;
    {
        let mut ctx = make_ctx(&mut fixture.world, &mut state, &mut rng, &mut signals);
        assert!(!try_merge(&mut ctx, a, b));
        assert_eq!(ctx.world.party(b).unwrap().total_men(), 20);
    }
}

#[test]
fn merge_system_engages_then_merges_on_contact() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(25, Position::new(60.0, 60.0));
    let b = fixture.spawn_managed_party_at(20, Position::new(60.0, 70.0));
    fixture.expire_cooldown(a);
    fixture.expire_cooldown(b);

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = MergeSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        7,
    );
    // Too far to merge outright: both turn toward each other.
    assert_eq!(
        fixture.world.party(a).unwrap().objective,
        Objective::Engage { party: b }
    );
    assert_eq!(
        fixture.world.party(b).unwrap().objective,
        Objective::Engage { party: a }
    );

    // The host closes the distance; the next tick completes the merge.
    fixture.world.parties.get_mut(&b).unwrap().position = Position::new(60.0, 61.0);
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 1),
        8,
    );
    assert!(is_trashed(&fixture.world, a));
    assert!(is_trashed(&fixture.world, b));
    let merged = newcomer(&fixture.world, &[a, b]);
    assert_eq!(fixture.world.party(merged).unwrap().total_men(), 45);
}

#[test]
fn managed_warband_absorbs_free_bandits() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(25, Position::new(60.0, 60.0));
    let b = fixture.spawn_free_bandits_at(15, Position::new(60.0, 61.0));
    fixture.expire_cooldown(a);

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = MergeSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        7,
    );
    assert!(is_trashed(&fixture.world, a));
    assert!(is_trashed(&fixture.world, b));
    let merged = newcomer(&fixture.world, &[a, b]);
    let party = fixture.world.party(merged).unwrap();
    assert_eq!(party.total_men(), 40);
    assert!(party.is_managed());
}

#[test]
fn leaderless_warband_promotes_instead_of_merging() {
    let mut fixture = build_world();
    let a = fixture.spawn_managed_party_at(25, Position::new(60.0, 60.0));
    fixture.expire_cooldown(a);
    let hero = fixture.add_hero(44.0);
    {
        let party = fixture.world.parties.get_mut(&a).unwrap();
        party.leader = None;
        party.troops.add_hero(hero);
    }

    let (mut state, _rng, _signals) = test_context(&fixture);
    let mut system = MergeSystem;
    tick_system_at(
        &mut fixture.world,
        &mut state,
        &mut system,
        SimTimestamp::new(1, 2, 0),
        7,
    );
    assert_eq!(fixture.world.party(a).unwrap().leader, Some(hero));
}

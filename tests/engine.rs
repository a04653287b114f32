//! Whole-engine runs: every system registered, the clock driven for weeks,
//! and the structural invariants checked afterwards.

mod common;

use common::managed_active;
use warband_sim::config::Settings;
use warband_sim::model::World;
use warband_sim::sim::{
    AvoidanceSystem, CleanupSystem, EngineState, GrowthSystem, MergeSystem, SimConfig, SimSystem,
    SpawnSystem, SplitSystem, ThinkSystem, run,
};
use warband_sim::testutil::build_world;

fn full_system_set() -> Vec<Box<dyn SimSystem>> {
    vec![
        Box::new(SpawnSystem),
        Box::new(MergeSystem),
        Box::new(SplitSystem),
        Box::new(GrowthSystem),
        Box::new(ThinkSystem),
        Box::new(AvoidanceSystem),
        Box::new(CleanupSystem),
    ]
}

fn run_campaign(seed: u64, days: u32) -> (World, EngineState) {
    let fixture = build_world();
    let mut world = fixture.world;
    let settings = Settings {
        spawn_chance: 50,
        ..Settings::default()
    };
    let mut state = EngineState::new(settings);
    let mut systems = full_system_set();
    run(
        &mut world,
        &mut state,
        &mut systems,
        SimConfig::new(1, days, seed),
    );
    (world, state)
}

#[test]
fn month_long_run_stays_structurally_consistent() {
    let (world, mut state) = run_campaign(42, 30);

    for party in world.parties.values() {
        // No phantom stacks anywhere, active or trashed.
        for stack in party.troops.stacks.iter().chain(party.prisoners.stacks.iter()) {
            assert!(stack.count > 0, "zero-count stack on party {}", party.id);
            assert!(stack.wounded <= stack.count);
        }
        if party.is_active() && party.is_managed() {
            assert!(party.total_men() > 0, "active empty party {}", party.id);
            assert!(
                world.clans.contains_key(&party.clan),
                "party {} has dangling clan",
                party.id
            );
        }
    }

    // Managed heroes all resolve, and the population cache only ever holds
    // live managed parties.
    for &hero in &world.managed_heroes {
        assert!(world.heroes.contains_key(&hero), "dangling managed hero");
    }
    for &id in state.population.managed(&world, true) {
        let party = world.parties.get(&id).expect("cached party exists");
        assert!(party.is_active() && party.is_managed());
    }
}

#[test]
fn population_tracks_the_power_budget() {
    let (world, mut state) = run_campaign(7, 60);
    state
        .budget
        .recompute(&world, &state.settings, &mut state.population, true);

    // The balancer spawned something and kept it loosely under the ceiling:
    // growth can overshoot within a day, but not run away.
    assert!(
        !managed_active(&world).is_empty(),
        "nothing ever spawned in 60 days"
    );
    assert!(
        state.budget.managed_power_percent
            <= state.settings.global_power_percent * 2.0 + 10.0,
        "managed power {}% ran away past the {}% budget",
        state.budget.managed_power_percent,
        state.settings.global_power_percent
    );
}

#[test]
fn runs_are_deterministic_per_seed() {
    let (world_a, _) = run_campaign(1234, 20);
    let (world_b, _) = run_campaign(1234, 20);
    assert_eq!(world_a.parties.len(), world_b.parties.len());
    assert_eq!(
        managed_active(&world_a).len(),
        managed_active(&world_b).len()
    );
    let men = |world: &World| -> u32 {
        managed_active(world)
            .iter()
            .map(|&id| world.parties[&id].total_men())
            .sum()
    };
    assert_eq!(men(&world_a), men(&world_b));
}

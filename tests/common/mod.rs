use warband_sim::model::{PartyState, World};

/// Active managed parties currently in the world.
pub fn managed_active(world: &World) -> Vec<u64> {
    world
        .parties
        .values()
        .filter(|p| p.is_active() && p.is_managed())
        .map(|p| p.id)
        .collect()
}

/// The single active managed party that is none of the given ids — the
/// freshly created product of a merge or spawn.
#[allow(dead_code)]
pub fn newcomer(world: &World, known: &[u64]) -> u64 {
    let fresh: Vec<u64> = managed_active(world)
        .into_iter()
        .filter(|id| !known.contains(id))
        .collect();
    assert_eq!(fresh.len(), 1, "expected exactly one new party");
    fresh[0]
}

#[allow(dead_code)]
pub fn is_trashed(world: &World, id: u64) -> bool {
    world
        .parties
        .get(&id)
        .is_some_and(|p| p.state == PartyState::Trashed)
}

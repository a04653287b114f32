use crate::model::World;

/// Cache lifetime in simulated hours. Matches the power budget TTL so the
/// two refresh in lockstep at worst.
const CACHE_TTL_HOURS: u64 = 1;

/// TTL-cached list of active managed party ids: the working set for every
/// balancing pass, so systems never rescan the full party map per tick.
///
/// A cache, never a source of truth: anything that trashes or registers a
/// managed party calls `invalidate()`.
#[derive(Debug, Default)]
pub struct PopulationCache {
    last_refreshed: Option<u64>,
    ids: Vec<u64>,
}

impl PopulationCache {
    /// The active managed parties, re-filtered from the world when the cache
    /// is stale (older than the TTL) or `force` is set. Always returns a
    /// list, possibly empty.
    pub fn managed(&mut self, world: &World, force: bool) -> &[u64] {
        let now = world.current_time.to_hours();
        let stale = self
            .last_refreshed
            .is_none_or(|at| now.saturating_sub(at) > CACHE_TTL_HOURS);
        if force || stale {
            self.last_refreshed = Some(now);
            self.ids = world
                .parties
                .values()
                .filter(|p| p.is_active() && p.is_managed())
                .map(|p| p.id)
                .collect();
        }
        &self.ids
    }

    pub fn invalidate(&mut self) {
        self.last_refreshed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartyState, World};
    use crate::testutil::build_world;

    #[test]
    fn empty_world_yields_empty_list() {
        let mut cache = PopulationCache::default();
        let world = World::new();
        assert!(cache.managed(&world, false).is_empty());
    }

    #[test]
    fn cached_list_survives_until_invalidated() {
        let mut cache = PopulationCache::default();
        let mut fixture = build_world();
        let id = fixture.spawn_managed_party(30);

        assert_eq!(cache.managed(&fixture.world, false), &[id]);

        // Trash the party without telling the cache: stale data persists...
        fixture.world.parties.get_mut(&id).unwrap().state = PartyState::Trashed;
        assert_eq!(cache.managed(&fixture.world, false), &[id]);

        // ...until invalidated or forced.
        cache.invalidate();
        assert!(cache.managed(&fixture.world, false).is_empty());
    }

    #[test]
    fn force_bypasses_ttl() {
        let mut cache = PopulationCache::default();
        let mut fixture = build_world();
        assert!(cache.managed(&fixture.world, false).is_empty());
        let id = fixture.spawn_managed_party(25);
        assert_eq!(cache.managed(&fixture.world, true), &[id]);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::clan::Clan;
use super::hero::Hero;
use super::items::ItemRoster;
use super::map::Position;
use super::party::{Party, PartyKind, PartyState};
use super::settlement::Settlement;
use super::timestamp::SimTimestamp;
use super::troop::{TroopRoster, TroopType};

/// Monotonic ID generator shared across parties, heroes, settlements, clans,
/// cultures, and troop types; no two objects of any kind share an ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A failure reading or mutating world state. The host can invalidate
/// references between ticks (a hero removed by an unrelated subsystem, a
/// settlement swallowed by another mod), so every engine operation that
/// dereferences an ID can fail and must contain the failure at its boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("party {0} not found")]
    MissingParty(u64),
    #[error("hero {0} not found")]
    MissingHero(u64),
    #[error("settlement {0} not found")]
    MissingSettlement(u64),
    #[error("clan {0} not found")]
    MissingClan(u64),
    #[error("troop type {0} not found")]
    MissingTroopType(u64),
    #[error("party {0} has no home settlement")]
    NoHomeSettlement(u64),
    #[error("generated roster is empty")]
    EmptyRoster,
    #[error("no hideout exists in the world")]
    NoHideouts,
}

/// Clan standing at or below this is already hostile enough.
const HOSTILE_RELATION_FLOOR: i32 = -10;
/// Standing assigned when hostility has to be forced.
const FORCED_RELATION: i32 = -50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    pub id: u64,
    pub name: String,
}

/// Everything a registered party needs. Assembled locally by the engines and
/// committed in one call, so a failure mid-operation leaves nothing half-
/// registered.
#[derive(Debug, Clone)]
pub struct PartySpec {
    pub kind: PartyKind,
    pub clan: u64,
    pub leader: Option<u64>,
    pub home_settlement: Option<u64>,
    pub position: Position,
    pub troops: TroopRoster,
    pub prisoners: TroopRoster,
    pub inventory: ItemRoster,
}

/// The live campaign world: the single source of truth every cache derives
/// from. All engine state that must survive a save/reload lives here; budgets
/// and population caches are recomputed from scratch on load. Serialization
/// goes through the flush module, which flattens the tuple-keyed maps.
#[derive(Debug)]
pub struct World {
    pub parties: BTreeMap<u64, Party>,
    pub heroes: BTreeMap<u64, Hero>,
    pub settlements: BTreeMap<u64, Settlement>,
    pub clans: BTreeMap<u64, Clan>,
    pub cultures: BTreeMap<u64, Culture>,
    pub troop_types: BTreeMap<u64, TroopType>,
    /// Normalized (low, high) clan pairs currently at war.
    pub wars: BTreeSet<(u64, u64)>,
    /// Pairwise clan standing; absent means neutral (0).
    pub clan_relations: BTreeMap<(u64, u64), i32>,
    /// Heroes created by the engine for managed parties. Survives reload so
    /// stray-hero cleanup keeps working across sessions.
    pub managed_heroes: BTreeSet<u64>,
    pub player_party: Option<u64>,
    pub player_hero: Option<u64>,
    pub id_gen: IdGenerator,
    pub current_time: SimTimestamp,
}

impl World {
    pub fn new() -> Self {
        Self {
            parties: BTreeMap::new(),
            heroes: BTreeMap::new(),
            settlements: BTreeMap::new(),
            clans: BTreeMap::new(),
            cultures: BTreeMap::new(),
            troop_types: BTreeMap::new(),
            wars: BTreeSet::new(),
            clan_relations: BTreeMap::new(),
            managed_heroes: BTreeSet::new(),
            player_party: None,
            player_hero: None,
            id_gen: IdGenerator::new(),
            current_time: SimTimestamp::from_year(0),
        }
    }

    // -- Checked accessors --

    pub fn party(&self, id: u64) -> Result<&Party, WorldError> {
        self.parties.get(&id).ok_or(WorldError::MissingParty(id))
    }

    pub fn party_mut(&mut self, id: u64) -> Result<&mut Party, WorldError> {
        self.parties
            .get_mut(&id)
            .ok_or(WorldError::MissingParty(id))
    }

    pub fn hero(&self, id: u64) -> Result<&Hero, WorldError> {
        self.heroes.get(&id).ok_or(WorldError::MissingHero(id))
    }

    pub fn hero_mut(&mut self, id: u64) -> Result<&mut Hero, WorldError> {
        self.heroes.get_mut(&id).ok_or(WorldError::MissingHero(id))
    }

    pub fn settlement(&self, id: u64) -> Result<&Settlement, WorldError> {
        self.settlements
            .get(&id)
            .ok_or(WorldError::MissingSettlement(id))
    }

    pub fn clan(&self, id: u64) -> Result<&Clan, WorldError> {
        self.clans.get(&id).ok_or(WorldError::MissingClan(id))
    }

    pub fn troop_type(&self, id: u64) -> Result<&TroopType, WorldError> {
        self.troop_types
            .get(&id)
            .ok_or(WorldError::MissingTroopType(id))
    }

    // -- Catalog registration (worldgen / host side) --

    pub fn add_culture(&mut self, name: &str) -> u64 {
        let id = self.id_gen.next_id();
        self.cultures.insert(
            id,
            Culture {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_clan(&mut self, clan: Clan) -> u64 {
        let id = clan.id;
        self.clans.insert(id, clan);
        id
    }

    pub fn add_settlement(&mut self, settlement: Settlement) -> u64 {
        let id = settlement.id;
        self.settlements.insert(id, settlement);
        id
    }

    pub fn add_troop_type(&mut self, troop: TroopType) -> u64 {
        let id = troop.id;
        self.troop_types.insert(id, troop);
        id
    }

    pub fn add_hero(&mut self, hero: Hero) -> u64 {
        let id = hero.id;
        self.heroes.insert(id, hero);
        id
    }

    // -- Party factory --

    /// Register a fully-assembled party. Validates every reference before
    /// touching the party map, so a bad spec registers nothing. The party
    /// starts in `Spawning`; initialization promotes it to `Active`.
    pub fn register_party(&mut self, spec: PartySpec, now: SimTimestamp) -> Result<u64, WorldError> {
        self.clan(spec.clan)?;
        if let Some(leader) = spec.leader {
            self.hero(leader)?;
        }
        if let Some(home) = spec.home_settlement {
            self.settlement(home)?;
        }
        for stack in spec.troops.stacks.iter().chain(spec.prisoners.stacks.iter()) {
            self.troop_type(stack.troop)?;
        }

        let id = self.id_gen.next_id();
        self.parties.insert(
            id,
            Party {
                id,
                name: String::new(),
                kind: spec.kind,
                state: PartyState::Spawning,
                clan: spec.clan,
                leader: spec.leader,
                home_settlement: spec.home_settlement,
                position: spec.position,
                troops: spec.troops,
                prisoners: spec.prisoners,
                inventory: spec.inventory,
                last_merged_or_split: now,
                avoidance: BTreeMap::new(),
                objective: Default::default(),
                in_battle: false,
                quest_locked: false,
            },
        );
        Ok(id)
    }

    // -- Strength --

    /// Total combat strength of a party: per-unit troop power (wounded count
    /// half) plus the power of every hero member and the leader.
    pub fn party_strength(&self, id: u64) -> Result<f32, WorldError> {
        let party = self.party(id)?;
        let mut strength = 0.0;
        for stack in &party.troops.stacks {
            let troop = self.troop_type(stack.troop)?;
            let healthy = stack.count - stack.wounded;
            strength += troop.power * (healthy as f32 + stack.wounded as f32 * 0.5);
        }
        for &hero_id in &party.troops.heroes {
            strength += self.hero(hero_id)?.power;
        }
        if let Some(leader) = party.leader {
            strength += self.hero(leader)?.power;
        }
        Ok(strength)
    }

    // -- Diplomacy --

    fn war_key(a: u64, b: u64) -> (u64, u64) {
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn is_at_war(&self, a: u64, b: u64) -> bool {
        self.wars.contains(&Self::war_key(a, b))
    }

    pub fn declare_war(&mut self, a: u64, b: u64) {
        if a != b {
            self.wars.insert(Self::war_key(a, b));
        }
    }

    pub fn clan_relation(&self, a: u64, b: u64) -> i32 {
        self.clan_relations
            .get(&Self::war_key(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_clan_relation(&mut self, a: u64, b: u64, value: i32) {
        if a != b {
            self.clan_relations.insert(Self::war_key(a, b), value);
        }
    }

    /// Ensure two clans are at war and their standing is firmly hostile.
    /// Checks current state before changing anything, so repeated calls are
    /// no-ops. Returns true when something actually changed.
    pub fn force_hostility(&mut self, a: u64, b: u64) -> bool {
        if a == b {
            return false;
        }
        let mut changed = false;
        if !self.is_at_war(a, b) {
            self.declare_war(a, b);
            changed = true;
        }
        if self.clan_relation(a, b) > HOSTILE_RELATION_FLOOR {
            self.set_clan_relation(a, b, FORCED_RELATION);
            changed = true;
        }
        changed
    }

    // -- Player --

    pub fn player_position(&self) -> Option<Position> {
        let id = self.player_party?;
        self.parties.get(&id).map(|p| p.position)
    }

    pub fn player_party_size(&self) -> u32 {
        self.player_party
            .and_then(|id| self.parties.get(&id))
            .map_or(0, Party::total_men)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

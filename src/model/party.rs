use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::items::ItemRoster;
use super::map::Position;
use super::timestamp::SimTimestamp;
use super::troop::TroopRoster;

/// What population the party belongs to. Only `Managed` parties are balanced
/// by the engine; `FreeBandit` parties can be absorbed by merges; `Lord`
/// parties (including the player's) only contribute to the world strength
/// snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Managed,
    FreeBandit,
    Lord,
}

/// Lifecycle state. `Spawning` covers the window between registration and
/// finished initialization; `Merging`/`Splitting` mark a party that is mid-
/// operation this tick; `Trashed` is terminal and idempotent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyState {
    Spawning,
    Active,
    Merging,
    Splitting,
    Trashed,
}

/// Host-executed movement order. The engine only decides; the host moves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Hold,
    Patrol {
        settlement: u64,
    },
    Engage {
        party: u64,
    },
    Raid {
        settlement: u64,
    },
}

/// A roaming group on the campaign map: troops, prisoners, inventory, an
/// optional leader, and the per-rival avoidance memory.
///
/// A party with `leader: None` is leaderless, a valid state that suspends
/// raiding until a member hero takes over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: u64,
    pub name: String,
    pub kind: PartyKind,
    pub state: PartyState,
    pub clan: u64,
    pub leader: Option<u64>,
    pub home_settlement: Option<u64>,
    pub position: Position,
    pub troops: TroopRoster,
    pub prisoners: TroopRoster,
    pub inventory: ItemRoster,
    /// Cooldown anchor: no merge or split until `cooldown_hours` have passed.
    pub last_merged_or_split: SimTimestamp,
    /// Rival hero id → avoidance score, read as a percent chance to back off.
    #[serde(default)]
    pub avoidance: BTreeMap<u64, f32>,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default)]
    pub in_battle: bool,
    #[serde(default)]
    pub quest_locked: bool,
}

impl Party {
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            PartyState::Active | PartyState::Merging | PartyState::Splitting
        )
    }

    pub fn is_managed(&self) -> bool {
        self.kind == PartyKind::Managed
    }

    pub fn is_bandit(&self) -> bool {
        matches!(self.kind, PartyKind::Managed | PartyKind::FreeBandit)
    }

    pub fn is_leaderless(&self) -> bool {
        self.leader.is_none()
    }

    /// Busy parties sit out merge/split consideration entirely.
    pub fn is_busy(&self) -> bool {
        self.in_battle || self.quest_locked
    }

    /// Everyone marching with the party: regulars, member heroes, and the
    /// leader. Merge/split conservation is stated in terms of this count.
    pub fn total_men(&self) -> u32 {
        self.troops.total_men() + u32::from(self.leader.is_some())
    }
}

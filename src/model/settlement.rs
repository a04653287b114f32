use serde::{Deserialize, Serialize};

use super::map::Position;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    Town,
    Village,
    Hideout,
}

/// Current raid status of a village. Raided/looted villages are skipped when
/// choosing raid targets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidState {
    #[default]
    Quiet,
    BeingRaided,
    Looted,
}

/// A fixed world location. Hideouts double as warband home bases and spawn
/// origins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: u64,
    pub name: String,
    pub kind: SettlementKind,
    pub position: Position,
    pub culture: u64,
    pub owner_clan: u64,
    #[serde(default)]
    pub raid_state: RaidState,
}

impl Settlement {
    pub fn is_hideout(&self) -> bool {
        self.kind == SettlementKind::Hideout
    }

    pub fn is_village(&self) -> bool {
        self.kind == SettlementKind::Village
    }
}

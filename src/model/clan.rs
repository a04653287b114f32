use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClanKind {
    /// Landed nobility; owns towns and villages.
    Noble,
    /// Outlaw clans own hideouts and supply spawned warbands.
    Outlaw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clan {
    pub id: u64,
    pub name: String,
    pub kind: ClanKind,
    pub culture: u64,
    /// Ruling hero; raid avoidance is tracked against this identity.
    pub leader: Option<u64>,
}

impl Clan {
    pub fn is_outlaw(&self) -> bool {
        self.kind == ClanKind::Outlaw
    }
}

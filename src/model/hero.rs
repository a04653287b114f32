use serde::{Deserialize, Serialize};

/// An individual character who can lead or march with a party. The engine
/// only relies on power, clan, and home settlement; appearance and equipment
/// are a host concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: u64,
    pub name: String,
    /// Scalar influence/combat weight; leader selection picks the highest.
    pub power: f32,
    pub clan: Option<u64>,
    pub home_settlement: Option<u64>,
    pub alive: bool,
}

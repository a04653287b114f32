use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

/// Balance knobs for the population engine. Loadable from JSON with any
/// subset of fields present; everything else falls back to the defaults
/// below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Spawning & formation
    /// Master switch for spontaneous (non-merge) warband spawning.
    pub spawn_enabled: bool,
    /// Percent chance per spawn-loop iteration that a warband actually forms.
    pub spawn_chance: u32,
    /// No warband smaller than this forms, and splits keep both children at
    /// or above it.
    pub min_party_size: u32,
    /// Parties below this size are ignored by merge seeking.
    pub mergeable_size: u32,
    /// Percent chance per day that an eligible warband splits.
    pub random_split_chance: u32,
    /// Hours a party must wait after a merge or split before the next one.
    pub cooldown_hours: u32,
    /// Managed parties that drop below this many troops are dispersed.
    pub disperse_size: u32,

    // Training & growth
    pub can_train: bool,
    /// Percent chance per day that a warband trains.
    pub training_chance: u32,
    pub xp_gift: XpGift,
    /// Percent of looters converted into cultured recruits per training pass.
    pub looter_upgrade_percent: u32,
    /// Upper bound (percent of a stack) upgraded in one training pass.
    pub upgrade_units_percent: u32,
    /// Troops at or above this tier are never trained further.
    pub max_training_tier: u32,
    /// Percent chance per day that a warband grows.
    pub growth_chance: u32,
    /// Percent of current size added per growth event.
    pub growth_percent: u32,

    // Power & balance
    /// Target managed-population strength as a percent of the world ceiling.
    pub global_power_percent: f32,
    /// Fixed scale factor applied to the player-size and world-strength terms
    /// of the power budget.
    pub variance: f32,

    // Behavior
    pub allow_pillaging: bool,
    /// Percent chance per hour that a patrolling warband considers a raid.
    pub pillaging_chance: f32,

    // Naming
    pub warband_name: String,
    pub leaderless_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpGift {
    Off,
    Normal,
    Hard,
    Hardest,
}

impl XpGift {
    /// Training passes granted per day.
    pub fn iterations(self) -> u32 {
        match self {
            XpGift::Off => 0,
            XpGift::Normal => 1,
            XpGift::Hard => 2,
            XpGift::Hardest => 4,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spawn_enabled: true,
            spawn_chance: 1,
            min_party_size: 20,
            mergeable_size: 10,
            random_split_chance: 5,
            cooldown_hours: 24,
            disperse_size: 20,
            can_train: true,
            training_chance: 10,
            xp_gift: XpGift::Normal,
            looter_upgrade_percent: 15,
            upgrade_units_percent: 25,
            max_training_tier: 4,
            growth_chance: 50,
            growth_percent: 1,
            global_power_percent: 15.0,
            variance: 1.25,
            allow_pillaging: true,
            pillaging_chance: 1.0,
            warband_name: "Warband".to_string(),
            leaderless_name: "Leaderless Warband".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(io::Error::other)
    }
}

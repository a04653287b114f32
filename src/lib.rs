//! Population lifecycle and balancing engine for autonomous roaming warbands
//! in an open-world campaign.
//!
//! Warbands merge, split, spawn, grow, train, and disband as the simulation
//! clock advances, keeping total warband strength near a configured fraction
//! of the world's military strength. The engine is single-threaded and
//! tick-driven: register the systems you want with the runner, or call the
//! operations (`try_merge`, `try_split`, `spawn_tick`) directly from host
//! callbacks. Every public operation contains its own failures: a bad
//! reference mid-merge tears down the half-built party and returns `false`,
//! it never unwinds through the tick loop.

pub mod config;
pub mod flush;
pub mod model;
pub mod sim;
pub mod testutil;

pub use config::{Settings, XpGift};
pub use model::{
    Clan, ClanKind, Hero, ItemRoster, Party, PartyKind, PartySpec, PartyState, Position,
    Settlement, SettlementKind, SimTimestamp, TroopRoster, TroopType, World, WorldError,
};
pub use sim::{
    AvoidanceSystem, CleanupSystem, EngineState, GrowthSystem, MergeSystem, PopulationCache,
    PowerBudget, SimConfig, SimSystem, SpawnSystem, SplitSystem, ThinkSystem, TickContext,
    TickFrequency, run,
};

pub mod avoidance;
mod context;
pub mod growth;
pub mod helpers;
pub mod lifecycle;
pub mod merge;
pub mod population;
pub mod power;
pub mod roster_ops;
mod runner;
mod signal;
pub mod spawn;
pub mod split;
mod system;
pub mod think;

pub use avoidance::AvoidanceSystem;
pub use context::{EngineState, TickContext};
pub use growth::GrowthSystem;
pub use lifecycle::CleanupSystem;
pub use merge::MergeSystem;
pub use population::PopulationCache;
pub use power::PowerBudget;
pub use runner::{SimConfig, dispatch_systems, run, should_fire};
pub use signal::{Signal, SignalKind};
pub use spawn::SpawnSystem;
pub use split::SplitSystem;
pub use system::{SimSystem, TickFrequency};
pub use think::ThinkSystem;

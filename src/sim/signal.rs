use crate::model::Position;

/// A cross-system notification emitted during a tick and delivered in the
/// same dispatch cycle (see `runner::dispatch_systems`). The host injects
/// battle outcomes through the same bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    /// A party was wiped out. Avoidance memory reacts: nearby managed parties
    /// learn to fear the destroyer's leader.
    PartyDestroyed {
        party: u64,
        party_leader: Option<u64>,
        destroyer_party: Option<u64>,
        destroyer_leader: Option<u64>,
        position: Position,
    },
    /// A managed party beat a rival without destroying it; its fear of that
    /// rival's leader fades.
    VictoryOver { party: u64, rival_leader: u64 },
    /// The host finished executing a raid objective.
    RaidCompleted { party: u64, settlement: u64 },
    /// One-line diagnostic surfaced to the observer. Never halts the clock.
    Notice { text: String },
}

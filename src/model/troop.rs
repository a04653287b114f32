use serde::{Deserialize, Serialize};

/// Battlefield role of a troop type. Drives spawn formation ratios and the
/// cavalry rebalance pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationClass {
    Infantry,
    Ranged,
    Cavalry,
}

/// A troop type in the world catalog. Parties hold counted stacks of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopType {
    pub id: u64,
    pub name: String,
    pub class: FormationClass,
    /// Quality tier; training upgrades move troops up one tier at a time.
    pub tier: u32,
    /// Per-unit contribution to party strength.
    pub power: f32,
    pub culture: Option<u64>,
    pub mounted: bool,
    /// Low-grade rabble eligible for conversion into cultured recruits.
    pub is_looter: bool,
    /// Outlaw troops are what spawned warbands are drawn from.
    pub is_outlaw: bool,
    pub upgrade_to: Option<u64>,
}

/// One counted stack of a single troop type. `wounded` is a sub-count of
/// `count`, never larger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopStack {
    pub troop: u64,
    pub count: u32,
    pub wounded: u32,
}

/// A counted collection of troop stacks plus the hero members attached to the
/// party. Stacks hold regulars only; heroes are tracked individually so that
/// split/merge accounting can pull them out before operating on stacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TroopRoster {
    pub stacks: Vec<TroopStack>,
    pub heroes: Vec<u64>,
}

impl TroopRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or remove, with a negative delta) units of a troop type.
    /// Removing more than the stack holds clamps to zero; empty stacks are
    /// dropped so iteration never sees phantom entries.
    pub fn add_to_counts(&mut self, troop: u64, delta: i64) {
        if let Some(stack) = self.stacks.iter_mut().find(|s| s.troop == troop) {
            let updated = i64::from(stack.count) + delta;
            stack.count = updated.max(0) as u32;
            stack.wounded = stack.wounded.min(stack.count);
            if stack.count == 0 {
                self.stacks.retain(|s| s.count > 0);
            }
        } else if delta > 0 {
            self.stacks.push(TroopStack {
                troop,
                count: delta as u32,
                wounded: 0,
            });
        }
    }

    pub fn count_of(&self, troop: u64) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.troop == troop)
            .map_or(0, |s| s.count)
    }

    pub fn add_hero(&mut self, hero: u64) {
        if !self.heroes.contains(&hero) {
            self.heroes.push(hero);
        }
    }

    pub fn remove_hero(&mut self, hero: u64) {
        self.heroes.retain(|&h| h != hero);
    }

    /// Regular troops only, heroes excluded.
    pub fn total_regulars(&self) -> u32 {
        self.stacks.iter().map(|s| s.count).sum()
    }

    /// Everyone: regulars plus hero members.
    pub fn total_men(&self) -> u32 {
        self.total_regulars() + self.heroes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty() && self.heroes.is_empty()
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
        self.heroes.clear();
    }
}

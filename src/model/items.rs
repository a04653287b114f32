use serde::{Deserialize, Serialize};

/// One stack of identical items. Two stacks are the same slot only when both
/// the item and its quality modifier match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: u64,
    /// Quality modifier tier (0 = plain); part of the stack key.
    pub modifier: i8,
    pub count: u32,
}

/// A party's item inventory: counted stacks keyed by (item, modifier).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRoster {
    pub stacks: Vec<ItemStack>,
}

impl ItemRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_counts(&mut self, item: u64, modifier: i8, delta: i64) {
        if let Some(stack) = self
            .stacks
            .iter_mut()
            .find(|s| s.item == item && s.modifier == modifier)
        {
            let updated = i64::from(stack.count) + delta;
            stack.count = updated.max(0) as u32;
            if stack.count == 0 {
                self.stacks.retain(|s| s.count > 0);
            }
        } else if delta > 0 {
            self.stacks.push(ItemStack {
                item,
                modifier,
                count: delta as u32,
            });
        }
    }

    pub fn count_of(&self, item: u64, modifier: i8) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item == item && s.modifier == modifier)
            .map_or(0, |s| s.count)
    }

    pub fn total_items(&self) -> u32 {
        self.stacks.iter().map(|s| s.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}

use tracing::warn;

use crate::model::{Category, Item};

/// Width of each category's key range. A category holding more items than
/// this spills into the next category's range.
pub const CATEGORY_STRIDE: u32 = 1000;

/// Give each (name, category) pair a sort key of `order * 1000 + n`, where `n`
/// counts earlier items of the same category, and return them sorted by key.
pub fn assign(pairs: Vec<(String, Category)>) -> Vec<Item> {
    let mut counters = [0u32; Category::ALL.len()];
    let mut items: Vec<Item> = pairs
        .into_iter()
        .map(|(name, category)| {
            let slot = &mut counters[category.order() as usize];
            if *slot == CATEGORY_STRIDE {
                warn!(category = %category, "category exceeds {} items, sort keys overlap", CATEGORY_STRIDE - 1);
            }
            let key = category.order() * CATEGORY_STRIDE + *slot;
            *slot += 1;
            Item::new(name, category, key)
        })
        .collect();
    items.sort_by_key(Item::sort_order);
    items
}

/// Sort keys for items appended to a list that already holds `existing_len`
/// items. The running index continues from the list length across all
/// categories instead of restarting per category.
pub fn append(existing_len: usize, pairs: Vec<(String, Category)>) -> Vec<Item> {
    let base = u32::try_from(existing_len).unwrap_or(u32::MAX);
    let mut items: Vec<Item> = pairs
        .into_iter()
        .enumerate()
        .map(|(idx, (name, category))| {
            let running = base.saturating_add(idx as u32);
            let key = (category.order() * CATEGORY_STRIDE).saturating_add(running);
            Item::new(name, category, key)
        })
        .collect();
    items.sort_by_key(Item::sort_order);
    items
}

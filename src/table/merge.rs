// src/table/merge.rs

use super::{GroupKey, Observation, PartitionKey};
use std::collections::{btree_map::Entry, BTreeMap};

/// Which row survives when both sides carry the same (key, year).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The first row seen (left side) wins.
    KeepLeft,
    /// The later row (right side) replaces the earlier one.
    KeepRight,
    /// Values are added together.
    Sum,
}

/// Merge two row sets on the explicit join key `on` plus `year`.
///
/// Rows are matched only on the declared fields; every other field of the
/// surviving row is carried through untouched. Collisions inside one side
/// are resolved with the same policy. Output is sorted by (key, year).
pub fn keyed_merge<R, L, Rt>(left: L, right: Rt, on: &GroupKey, policy: ConflictPolicy) -> Vec<R>
where
    R: Observation,
    L: IntoIterator<Item = R>,
    Rt: IntoIterator<Item = R>,
{
    let mut merged: BTreeMap<(PartitionKey, i32), R> = BTreeMap::new();
    for row in left.into_iter().chain(right) {
        match merged.entry((on.key_of(&row), row.year())) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => match policy {
                ConflictPolicy::KeepLeft => {}
                ConflictPolicy::KeepRight => {
                    slot.insert(row);
                }
                ConflictPolicy::Sum => {
                    let total = slot.get().value() + row.value();
                    let summed = slot.get().with_point(row.year(), total);
                    slot.insert(summed);
                }
            },
        }
    }
    merged.into_values().collect()
}

//! Tier partitioning and stable ordering of handles.
//!
//! # Invariants
//! - Tier precedence is strict: priority, then ordered, then unordered.
//! - Within a sorted tier, ascending order value; missing values sort as
//!   `LOWEST_PRECEDENCE`; ties keep discovery order.
//! - The unordered tier is never sorted.

use crate::model::definition::Tier;
use std::cmp::Ordering;

pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Anything that can be placed in a tier.
pub trait Prioritized {
    fn tier(&self) -> Tier;
    fn order(&self) -> Option<i32>;
}

/// External total-order override applied within a tier.
pub trait HandleComparator {
    fn compare(&self, left: &dyn Prioritized, right: &dyn Prioritized) -> Ordering;
}

/// Default comparator: tier rank, then order value.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderComparator;

impl HandleComparator for OrderComparator {
    fn compare(&self, left: &dyn Prioritized, right: &dyn Prioritized) -> Ordering {
        left.tier()
            .rank()
            .cmp(&right.tier().rank())
            .then_with(|| effective_order(left).cmp(&effective_order(right)))
    }
}

pub fn effective_order(item: &dyn Prioritized) -> i32 {
    item.order().unwrap_or(LOWEST_PRECEDENCE)
}

/// One set of items split by tier, each tier in discovery order.
#[derive(Debug)]
pub struct Tiered<T> {
    pub priority: Vec<T>,
    pub ordered: Vec<T>,
    pub unordered: Vec<T>,
}

impl<T: Prioritized> Tiered<T> {
    /// Flattens into invocation order: sorted priority, sorted ordered, unordered as found.
    pub fn into_sequence(mut self, comparator: Option<&dyn HandleComparator>) -> Vec<T> {
        sort_tier(&mut self.priority, comparator);
        sort_tier(&mut self.ordered, comparator);
        let mut sequence = self.priority;
        sequence.append(&mut self.ordered);
        sequence.append(&mut self.unordered);
        sequence
    }
}

pub fn partition<T: Prioritized>(items: impl IntoIterator<Item = T>) -> Tiered<T> {
    let mut tiered = Tiered {
        priority: Vec::new(),
        ordered: Vec::new(),
        unordered: Vec::new(),
    };
    for item in items {
        match item.tier() {
            Tier::Priority => tiered.priority.push(item),
            Tier::Ordered => tiered.ordered.push(item),
            Tier::Unordered => tiered.unordered.push(item),
        }
    }
    tiered
}

/// Stable sort with the supplied comparator, or `OrderComparator` when absent.
pub fn sort_tier<T: Prioritized>(items: &mut [T], comparator: Option<&dyn HandleComparator>) {
    let comparator = comparator.unwrap_or(&OrderComparator);
    items.sort_by(|left, right| comparator.compare(left, right));
}

/// Partitions and flattens in one call.
pub fn classify<T: Prioritized>(
    items: impl IntoIterator<Item = T>,
    comparator: Option<&dyn HandleComparator>,
) -> Vec<T> {
    partition(items).into_sequence(comparator)
}

/// Name-level entry used to classify definitions before instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub name: String,
    pub tier: Tier,
    pub order: Option<i32>,
}

impl Prioritized for NamedEntry {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn order(&self) -> Option<i32> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, partition, HandleComparator, NamedEntry, Prioritized};
    use crate::model::definition::Tier;
    use std::cmp::Ordering;

    fn entry(name: &str, tier: Tier, order: Option<i32>) -> NamedEntry {
        NamedEntry {
            name: name.to_string(),
            tier,
            order,
        }
    }

    fn names(entries: &[NamedEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn orders_tiers_then_values() {
        let sequence = classify(
            vec![
                entry("D", Tier::Unordered, None),
                entry("A", Tier::Priority, Some(10)),
                entry("C", Tier::Ordered, Some(1)),
                entry("B", Tier::Priority, Some(5)),
            ],
            None,
        );
        assert_eq!(names(&sequence), vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn ties_and_missing_orders_keep_discovery_order() {
        let sequence = classify(
            vec![
                entry("late", Tier::Ordered, None),
                entry("first", Tier::Ordered, Some(3)),
                entry("second", Tier::Ordered, Some(3)),
                entry("later", Tier::Ordered, None),
            ],
            None,
        );
        assert_eq!(names(&sequence), vec!["first", "second", "late", "later"]);
    }

    #[test]
    fn unordered_tier_is_not_sorted() {
        let sequence = classify(
            vec![
                entry("z", Tier::Unordered, Some(9)),
                entry("a", Tier::Unordered, Some(1)),
            ],
            None,
        );
        assert_eq!(names(&sequence), vec!["z", "a"]);
    }

    struct Descending;

    impl HandleComparator for Descending {
        fn compare(&self, left: &dyn Prioritized, right: &dyn Prioritized) -> Ordering {
            right.order().cmp(&left.order())
        }
    }

    #[test]
    fn external_comparator_applies_within_tiers_only() {
        let sequence = classify(
            vec![
                entry("o1", Tier::Ordered, Some(1)),
                entry("p1", Tier::Priority, Some(1)),
                entry("o2", Tier::Ordered, Some(2)),
                entry("p2", Tier::Priority, Some(2)),
            ],
            Some(&Descending),
        );
        assert_eq!(names(&sequence), vec!["p2", "p1", "o2", "o1"]);
    }

    #[test]
    fn partition_keeps_each_tier_in_discovery_order() {
        let tiered = partition(vec![
            entry("u1", Tier::Unordered, None),
            entry("p1", Tier::Priority, Some(4)),
            entry("u2", Tier::Unordered, None),
            entry("p2", Tier::Priority, Some(1)),
        ]);
        assert_eq!(names(&tiered.priority), vec!["p1", "p2"]);
        assert_eq!(names(&tiered.unordered), vec!["u1", "u2"]);
        assert!(tiered.ordered.is_empty());
    }
}

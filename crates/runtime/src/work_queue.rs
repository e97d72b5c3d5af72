/// Priority task queue for cooperative, batched execution.
///
/// Key properties:
/// - Total ordering on `(priority, id)`; smaller priorities run first.
/// - Equal priorities are processed in insertion order (FIFO lanes).
/// - Pops can be bounded by a [`BatchBudget`] so one pump never does more
///   than a fixed amount of work.
///
/// Backed by a `BTreeMap` so each pop is `O(log n)` even with thousands of
/// queued marker operations.
use std::collections::BTreeMap;

use crate::budget::BatchBudget;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Key {
    // Smaller values run earlier.
    priority: i32,
    id: TaskId,
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        // Total ordering: (priority, id)
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct TaskQueue<T> {
    next_id: u64,
    items: BTreeMap<Key, T>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            items: BTreeMap::new(),
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of queued items with exactly `priority`.
    pub fn len_at(&self, priority: i32) -> usize {
        self.items.keys().filter(|k| k.priority == priority).count()
    }

    pub fn push(&mut self, priority: i32, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.items.insert(Key { priority, id }, payload);
        id
    }

    /// Pops the next (highest priority, then oldest) item.
    pub fn pop_next(&mut self) -> Option<(TaskId, i32, T)> {
        let (key, payload) = self.items.pop_first()?;
        Some((key.id, key.priority, payload))
    }

    /// Pops the next item, charging one unit to `budget`.
    ///
    /// Returns `None` without charging when the queue is empty, and without
    /// popping when the budget is exhausted.
    pub fn pop_next_with_budget(&mut self, budget: &mut BatchBudget) -> Option<(TaskId, i32, T)> {
        if self.items.is_empty() || !budget.try_consume(1) {
            return None;
        }
        self.pop_next()
    }

    /// Drops every queued item, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::TaskQueue;
    use crate::budget::BatchBudget;

    #[test]
    fn same_priority_is_insertion_order() {
        let mut q = TaskQueue::new();
        q.push(0, "a");
        q.push(0, "b");
        q.push(0, "c");

        let (_, _, a) = q.pop_next().unwrap();
        let (_, _, b) = q.pop_next().unwrap();
        let (_, _, c) = q.pop_next().unwrap();
        assert_eq!((a, b, c), ("a", "b", "c"));
    }

    #[test]
    fn lower_priority_value_runs_first_even_if_newer() {
        let mut q = TaskQueue::new();
        q.push(4, "late");
        q.push(0, "early");
        q.push(2, "middle");
        let order: Vec<_> = std::iter::from_fn(|| q.pop_next().map(|(_, _, v)| v)).collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
    }

    #[test]
    fn budget_bounds_a_batch() {
        let mut q = TaskQueue::new();
        for i in 0..5 {
            q.push(0, i);
        }

        let mut budget = BatchBudget::new(3);
        let mut popped = Vec::new();
        while let Some((_, _, v)) = q.pop_next_with_budget(&mut budget) {
            popped.push(v);
        }
        assert_eq!(popped, vec![0, 1, 2]);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn empty_queue_does_not_charge_budget() {
        let mut q: TaskQueue<u8> = TaskQueue::new();
        let mut budget = BatchBudget::new(1);
        assert!(q.pop_next_with_budget(&mut budget).is_none());
        assert_eq!(budget.remaining_units(), 1);
    }

    #[test]
    fn len_at_counts_one_lane() {
        let mut q = TaskQueue::new();
        q.push(1, 'a');
        q.push(1, 'b');
        q.push(3, 'c');
        assert_eq!(q.len_at(1), 2);
        assert_eq!(q.len_at(3), 1);
        assert_eq!(q.len_at(0), 0);
        assert_eq!(q.clear(), 3);
        assert!(q.is_empty());
    }
}

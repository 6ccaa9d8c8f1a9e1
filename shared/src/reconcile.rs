use std::fmt::Debug;
use thiserror::Error;
use crate::edit::EditSink;
use crate::types::PathIdentity;

/// Raised when a pass cannot converge. Both input lists are dumped so the
/// failure can be analysed after the fact.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "no element at target position {position} found in working list\n\
         old list ({old_len} entries): {old_dump}\n\
         new list ({new_len} entries): {new_dump}"
    )]
    MissingMatch {
        position: usize,
        old_len: usize,
        old_dump: String,
        new_len: usize,
        new_dump: String,
    },

    #[error(
        "working list does not match new list after reconciliation\n\
         old list ({old_len} entries): {old_dump}\n\
         new list ({new_len} entries): {new_dump}"
    )]
    Diverged {
        old_len: usize,
        old_dump: String,
        new_len: usize,
        new_dump: String,
    },
}

/// Number of edits emitted by one pass, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub removed: usize,
    pub added: usize,
    pub updated: usize,
    pub moved: usize,
}

impl ReconcileSummary {
    pub fn total(&self) -> usize {
        self.removed + self.added + self.updated + self.moved
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Transforms `current` into `target`, reporting every step to `sink`.
///
/// Runs three phases: removals (back to front over `current`), additions and
/// in-place updates (front to back over `target`), then moves (back to front
/// over `target`). Each emitted position is valid against the list as left by
/// the edits before it.
///
/// On error `current` is left in an unspecified state and must be
/// resynchronised by the caller.
pub fn reconcile<T, S>(
    current: &mut Vec<T>,
    target: &[T],
    sink: &mut S,
) -> Result<ReconcileSummary, ReconcileError>
where
    T: PathIdentity + PartialEq + Clone + Debug,
    S: EditSink<T> + ?Sized,
{
    let original = current.clone();
    let mut summary = ReconcileSummary::default();

    // Removals
    for i in (0..current.len()).rev() {
        if !target.iter().any(|t| t.same_path(&current[i])) {
            current.remove(i);
            sink.on_remove_at(i);
            summary.removed += 1;
        }
    }

    // Additions and updates; order of `current` is untouched here
    for item in target {
        match current.iter().position(|c| c.same_path(item)) {
            None => {
                current.push(item.clone());
                let position = current.len() - 1;
                sink.on_add_at(position, &current[position]);
                summary.added += 1;
            }
            Some(position) => {
                if current[position] != *item {
                    current[position] = item.clone();
                    sink.on_update_at(position, &current[position]);
                    summary.updated += 1;
                }
            }
        }
    }

    // Moves
    for to in (0..target.len()).rev() {
        let from = match current.iter().position(|c| *c == target[to]) {
            Some(from) if to < current.len() => from,
            _ => return Err(missing_match(to, &original, target)),
        };
        if from != to {
            let item = current.remove(from);
            current.insert(to, item);
            sink.on_move_at(from, to);
            summary.moved += 1;
        }
    }

    if current.as_slice() != target {
        return Err(ReconcileError::Diverged {
            old_len: original.len(),
            old_dump: format!("{:?}", original),
            new_len: target.len(),
            new_dump: format!("{:?}", target),
        });
    }

    Ok(summary)
}

fn missing_match<T: Debug>(position: usize, original: &[T], target: &[T]) -> ReconcileError {
    ReconcileError::MissingMatch {
        position,
        old_len: original.len(),
        old_dump: format!("{:?}", original),
        new_len: target.len(),
        new_dump: format!("{:?}", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{EditOp, ListMirror};
    use crate::types::fixtures::{device, with_address};
    use crate::types::Device;

    /// Small stand-in element: `key` is the path, `rev` the content.
    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        key: u8,
        rev: u8,
    }

    impl PathIdentity for Row {
        fn same_path(&self, other: &Self) -> bool {
            self.key == other.key
        }
    }

    fn row(key: u8, rev: u8) -> Row {
        Row { key, rev }
    }

    fn run<T>(current: &[T], target: &[T]) -> (Vec<EditOp>, ReconcileSummary)
    where
        T: PathIdentity + PartialEq + Clone + Debug,
    {
        let mut working = current.to_vec();
        let mut ops = Vec::new();
        let summary = reconcile(&mut working, target, &mut ops).unwrap();
        assert_eq!(working, target, "working list must equal target");
        (ops, summary)
    }

    /// Deterministic xorshift so the generated corpus is stable between runs
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }

        /// A duplicate-free list drawn from keys 0..8 in shuffled order
        fn list(&mut self) -> Vec<Row> {
            let mut keys: Vec<u8> = (0..8).filter(|_| self.below(2) == 0).collect();
            for i in (1..keys.len()).rev() {
                let j = self.below(i as u64 + 1) as usize;
                keys.swap(i, j);
            }
            keys.into_iter().map(|k| row(k, self.below(2) as u8)).collect()
        }
    }

    #[test]
    fn test_identical_lists_emit_nothing() {
        let list = vec![row(1, 0), row(2, 0), row(3, 0)];
        let (ops, summary) = run(&list, &list);

        assert!(ops.is_empty());
        assert!(summary.is_empty());
    }

    #[test]
    fn test_empty_to_empty() {
        let (ops, _) = run::<Row>(&[], &[]);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_scenario_a_mixed_changes() {
        let d1 = device("D1", "eth0");
        let d1_changed = with_address(d1.clone(), "172.19.1.99");
        let d2 = device("D2", "eth0");
        let d3 = device("D3", "eth0");
        let d4 = device("D4", "eth0");
        let d5 = device("D5", "eth0");
        let d6 = device("D6", "eth0");

        let current = vec![d1, d2.clone(), d3, d4.clone(), d5.clone()];
        let target = vec![d1_changed, d2, d6, d5, d4];
        let (ops, summary) = run(&current, &target);

        assert_eq!(
            ops,
            vec![
                EditOp::Remove { position: 2 },
                EditOp::Update { position: 0 },
                EditOp::Add { position: 4 },
                EditOp::Move { from: 2, to: 4 },
                EditOp::Move { from: 2, to: 3 },
            ]
        );
        assert_eq!(summary, ReconcileSummary { removed: 1, added: 1, updated: 1, moved: 2 });
    }

    #[test]
    fn test_scenario_b_only_adds_in_order() {
        let target = vec![device("D1", "eth0"), device("D2", "eth0")];
        let (ops, _) = run(&[], &target);

        assert_eq!(ops, vec![EditOp::Add { position: 0 }, EditOp::Add { position: 1 }]);
    }

    #[test]
    fn test_scenario_c_only_removes_in_reverse() {
        let current = vec![device("D1", "eth0"), device("D2", "eth0")];
        let (ops, _) = run(&current, &[]);

        assert_eq!(ops, vec![EditOp::Remove { position: 1 }, EditOp::Remove { position: 0 }]);
    }

    #[test]
    fn test_scenario_d_rotation_only_moves() {
        let d1 = device("D1", "eth0");
        let d2 = device("D2", "eth0");
        let d3 = device("D3", "eth0");

        let current = vec![d1.clone(), d2.clone(), d3.clone()];
        let target = vec![d3, d1, d2];
        let (ops, summary) = run(&current, &target);

        assert_eq!(ops, vec![EditOp::Move { from: 1, to: 2 }, EditOp::Move { from: 0, to: 1 }]);
        assert_eq!(summary, ReconcileSummary { removed: 0, added: 0, updated: 0, moved: 2 });
    }

    #[test]
    fn test_interface_change_is_remove_and_add() {
        let on_eth0 = device("D1", "eth0");
        let on_eth1 = device("D1", "eth1");
        let (ops, _) = run(&[on_eth0], &[on_eth1]);

        assert_eq!(ops, vec![EditOp::Remove { position: 0 }, EditOp::Add { position: 0 }]);
    }

    #[test]
    fn test_single_moved_element() {
        // Back-to-front placement shifts the displaced rows rather than the moved one
        let current: Vec<Row> = (0..5).map(|k| row(k, 0)).collect();
        let target = vec![row(0, 0), row(1, 0), row(4, 0), row(2, 0), row(3, 0)];
        let (ops, _) = run(&current, &target);

        assert_eq!(ops, vec![EditOp::Move { from: 3, to: 4 }, EditOp::Move { from: 2, to: 3 }]);
    }

    #[test]
    fn test_disjoint_lists() {
        let current = vec![row(1, 0), row(2, 0)];
        let target = vec![row(3, 0), row(4, 0), row(5, 0)];
        let (_, summary) = run(&current, &target);

        assert_eq!(summary, ReconcileSummary { removed: 2, added: 3, updated: 0, moved: 0 });
    }

    #[test]
    fn test_convergence_and_replay_over_generated_pairs() {
        let mut rng = Rng(0x9E37_79B9_7F4A_7C15);

        for case in 0..2000 {
            let current = rng.list();
            let target = rng.list();

            let mut working = current.clone();
            let mut mirror = ListMirror::new(current.clone());
            reconcile(&mut working, &target, &mut mirror)
                .unwrap_or_else(|e| panic!("case {}: {}", case, e));

            assert_eq!(working, target, "case {}: working list diverged", case);
            assert_eq!(mirror.rejected(), 0, "case {}: replay hit a bad position", case);
            assert_eq!(mirror.rows(), target.as_slice(), "case {}: replay diverged", case);
        }
    }

    #[test]
    fn test_unchanged_prefix_is_never_referenced() {
        // Rows shared identically and in the same relative order produce no updates
        let mut rng = Rng(42);

        for _ in 0..500 {
            let current = rng.list();
            let mut target: Vec<Row> = current.iter().filter(|_| rng.below(3) != 0).cloned().collect();
            let stable = target.len();
            target.push(row(200, 0));

            let (ops, summary) = run(&current, &target);
            assert_eq!(summary.updated, 0);
            assert_eq!(summary.moved, 0, "stable rows must not move: {:?}", ops);
            assert_eq!(ops.last(), Some(&EditOp::Add { position: stable }));
        }
    }

    #[test]
    fn test_duplicate_target_paths_fail_with_dump() {
        let current = vec![row(1, 0)];
        let target = vec![row(1, 1), row(1, 2)];

        let mut working = current.clone();
        let mut ops: Vec<EditOp> = Vec::new();
        let err = reconcile(&mut working, &target, &mut ops).unwrap_err();

        match &err {
            ReconcileError::MissingMatch { old_len, new_len, old_dump, .. } => {
                assert_eq!(*old_len, 1);
                assert_eq!(*new_len, 2);
                assert!(old_dump.contains("key: 1, rev: 0"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("new list (2 entries)"));
    }

    #[test]
    fn test_leftover_duplicate_fails_as_diverged() {
        // Both copies share a path and content, so no phase drops the second one
        let current = vec![row(1, 0), row(1, 0)];
        let target = vec![row(1, 0)];

        let mut working = current.clone();
        let mut ops: Vec<EditOp> = Vec::new();
        let err = reconcile(&mut working, &target, &mut ops).unwrap_err();

        match &err {
            ReconcileError::Diverged { old_len, old_dump, new_len, new_dump } => {
                assert_eq!(*old_len, 2);
                assert_eq!(*new_len, 1);
                assert_eq!(old_dump, "[Row { key: 1, rev: 0 }, Row { key: 1, rev: 0 }]");
                assert_eq!(new_dump, "[Row { key: 1, rev: 0 }]");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(ops.is_empty());
        assert!(err.to_string().contains("old list (2 entries)"));
    }

    #[test]
    fn test_duplicate_stale_entries_are_all_removed() {
        let current = vec![row(1, 0), row(2, 0), row(1, 1)];
        let target = vec![row(2, 0)];
        let (ops, _) = run(&current, &target);

        assert_eq!(ops, vec![EditOp::Remove { position: 2 }, EditOp::Remove { position: 0 }]);
    }

    #[test]
    fn test_updates_report_new_item_to_sink() {
        let before = device("D1", "eth0");
        let after = with_address(before.clone(), "10.1.1.1");

        let mut working = vec![before.clone()];
        let mut mirror: ListMirror<Device> = ListMirror::new(vec![before]);
        reconcile(&mut working, &[after.clone()], &mut mirror).unwrap();

        assert_eq!(mirror.rows(), &[after]);
    }
}

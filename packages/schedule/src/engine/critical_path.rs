//! Critical Path Calculator
//!
//! Identifies the dependency chain whose cumulative business-day duration is
//! maximal; that chain bounds the minimum possible project duration.
//!
//! `path_duration(task) = task.duration + max(path_duration(p) for p in
//! predecessors, default 0)`, memoized per call. A node already on the
//! recursion stack contributes 0 instead of recursing, so a cyclic snapshot
//! (which validation rejects separately) can never hang the calculator.
//! Ties go to the task appearing first in declared tree order.
//!
//! Advisory and display-only: nothing here mutates dates.

use std::collections::{HashMap, HashSet};

use crate::engine::effective_duration;
use crate::engine::tree::WbsTree;
use crate::models::WbsItem;

/// Compute the critical path through the snapshot's leaf tasks.
///
/// Returns item ids in chronological order (earliest link first). Empty
/// when the snapshot has no leaves with any schedulable duration.
pub fn compute_critical_path(tree: &WbsTree) -> Vec<String> {
    let ordered: Vec<&WbsItem> = tree.flatten_all();
    let position: HashMap<&str, usize> = ordered
        .iter()
        .enumerate()
        .map(|(index, item)| (item.id.as_str(), index))
        .collect();
    let leaves: Vec<&WbsItem> = ordered
        .iter()
        .copied()
        .filter(|item| tree.is_leaf(&item.id))
        .collect();

    let mut memo: HashMap<String, i64> = HashMap::new();
    let mut best: Option<(&WbsItem, i64)> = None;
    for leaf in &leaves {
        let mut stack = HashSet::new();
        let total = path_duration(leaf, tree, &mut memo, &mut stack);
        // Strict comparison keeps the earliest leaf in declared order on ties
        if total > 0 && best.map_or(true, |(_, best_total)| total > best_total) {
            best = Some((leaf, total));
        }
    }

    let Some((end_task, _)) = best else {
        return Vec::new();
    };

    // Walk predecessor pointers backward from the maximal leaf
    let mut chain = vec![end_task.id.clone()];
    let mut current = end_task;
    let mut seen: HashSet<String> = chain.iter().cloned().collect();
    loop {
        let mut next: Option<&WbsItem> = None;
        let mut next_total = i64::MIN;
        for pred in &current.predecessors {
            let Some(target) = tree.get(&pred.target_id) else {
                continue;
            };
            if seen.contains(&target.id) {
                continue;
            }
            let total = memo.get(&target.id).copied().unwrap_or_else(|| {
                let mut stack = HashSet::new();
                path_duration(target, tree, &mut memo, &mut stack)
            });
            let better = match next {
                None => true,
                Some(candidate) => {
                    total > next_total
                        || (total == next_total
                            && position.get(target.id.as_str())
                                < position.get(candidate.id.as_str()))
                }
            };
            if better {
                next = Some(target);
                next_total = total;
            }
        }
        match next {
            Some(target) => {
                chain.push(target.id.clone());
                seen.insert(target.id.clone());
                current = target;
            }
            None => break,
        }
    }

    chain.reverse();
    chain
}

fn path_duration(
    item: &WbsItem,
    tree: &WbsTree,
    memo: &mut HashMap<String, i64>,
    stack: &mut HashSet<String>,
) -> i64 {
    if let Some(&cached) = memo.get(&item.id) {
        return cached;
    }
    if !stack.insert(item.id.clone()) {
        // Already on the recursion stack: cycle guard, contribute nothing
        return 0;
    }

    let own = effective_duration(item).unwrap_or(0).max(0);
    let upstream = item
        .predecessors
        .iter()
        .filter_map(|pred| tree.get(&pred.target_id))
        .map(|target| path_duration(target, tree, memo, stack))
        .max()
        .unwrap_or(0);

    stack.remove(&item.id);
    let total = own + upstream;
    memo.insert(item.id.clone(), total);
    total
}

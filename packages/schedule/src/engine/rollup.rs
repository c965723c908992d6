//! Rollup Aggregator
//!
//! Derives every non-leaf item's effective start, end, duration, and
//! progress from its descendant leaves. Derived values are returned to the
//! caller and never written back onto stored records; a parent's stored
//! date fields, if any, are display overrides owned by the UI layer.
//!
//! The memo cache lives only for one call. A single leaf date change can
//! move the effective range of every ancestor up to the root, so results
//! are always recomputed from scratch rather than patched incrementally.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::engine::calendar::business_days_between;
use crate::engine::effective_duration;
use crate::engine::tree::WbsTree;
use crate::models::WbsItem;

/// Derived schedule view of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollupValues {
    /// Earliest effective start among descendant leaves
    pub start_date: Option<NaiveDate>,
    /// Latest effective end among descendant leaves
    pub end_date: Option<NaiveDate>,
    /// Inclusive business-day span of the effective range
    pub duration: Option<i64>,
    /// Unweighted recursive mean of children's progress
    pub progress: u8,
}

/// Compute derived values for every item reachable from the snapshot's
/// roots (orphaned subtrees are included as independent starting points, so
/// a broken parent reference never blanks an item's display).
///
/// Leaves contribute their stored dates; an undated leaf contributes
/// nothing to any ancestor's range. A parent with no dated descendants gets
/// no effective dates (unset, never defaulted).
pub fn compute_rollup(tree: &WbsTree) -> HashMap<String, RollupValues> {
    let mut memo: HashMap<String, RollupValues> = HashMap::new();
    for root in tree.roots() {
        roll(root, tree, &mut memo);
    }
    for orphan_id in tree.orphans() {
        if let Some(orphan) = tree.get(orphan_id) {
            roll(orphan, tree, &mut memo);
        }
    }
    memo
}

fn roll(item: &WbsItem, tree: &WbsTree, memo: &mut HashMap<String, RollupValues>) -> RollupValues {
    if let Some(cached) = memo.get(&item.id) {
        return *cached;
    }

    let children = tree.children(&item.id);
    let values = if children.is_empty() {
        RollupValues {
            start_date: item.start_date,
            end_date: item.end_date,
            duration: effective_duration(item),
            progress: item.progress.min(100),
        }
    } else {
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;
        let mut progress_sum = 0u32;
        for child in &children {
            let child_values = roll(child, tree, memo);
            if let Some(child_start) = child_values.start_date {
                start = Some(start.map_or(child_start, |s| s.min(child_start)));
            }
            if let Some(child_end) = child_values.end_date {
                end = Some(end.map_or(child_end, |e| e.max(child_end)));
            }
            progress_sum += child_values.progress as u32;
        }

        let duration = match (start, end) {
            (Some(s), Some(e)) => business_days_between(s, e).ok(),
            _ => None,
        };
        let progress =
            (progress_sum as f64 / children.len() as f64).round() as u8;

        RollupValues {
            start_date: start,
            end_date: end,
            duration,
            progress,
        }
    };

    memo.insert(item.id.clone(), values);
    values
}

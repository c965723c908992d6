//! Dependency Resolver
//!
//! Computes schedule-consistent start/end dates for one task from its typed
//! predecessor links, guards the predecessor graph against cycles, and
//! validates a whole tree on demand.
//!
//! # Constraint rules
//!
//! For predecessor `P`, lag `L` (business days, signed), successor `S`:
//!
//! - `FS`: `S.start = P.end + 1 business day + L`
//! - `SS`: `S.start = P.start + L`
//! - `FF`: `S.end = P.end + L`
//! - `SF`: `S.end = P.start + L`
//!
//! With multiple predecessors the binding constraint is the one producing
//! the latest start and the latest end, applied independently per endpoint;
//! the unconstrained endpoint then derives from the item's own duration.
//! A constraint set that puts the end before the start is reported as a
//! violation, never clamped or swapped.

use chrono::NaiveDate;

use crate::engine::calendar::{add_business_days, business_days_between};
use crate::engine::error::{ScheduleError, ScheduleViolation, ViolationKind};
use crate::engine::tree::WbsTree;
use crate::models::{Predecessor, WbsItem};

/// Schedule-consistent endpoint pair for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDates {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// The predecessor-side start date used by SS/SF rules
fn anchor_start(item: &WbsItem) -> Option<NaiveDate> {
    item.start_date
}

/// The predecessor-side end date used by FS/FF rules, derived from start and
/// duration when not stored.
fn anchor_end(item: &WbsItem) -> Option<NaiveDate> {
    item.end_date.or_else(|| {
        let (start, duration) = (item.start_date?, item.duration?);
        Some(add_business_days(start, (duration - 1).max(0)))
    })
}

/// The item's own business-day span: stored duration first, else the
/// inclusive count between its stored dates.
fn own_duration(item: &WbsItem) -> Option<i64> {
    item.duration.or_else(|| {
        business_days_between(item.start_date?, item.end_date?).ok()
    })
}

/// Compute the schedule-consistent start/end for `item` given the current
/// resolved dates of every other task in the snapshot.
///
/// Missing predecessor targets are skipped here (the reference is treated as
/// absent; [`validate_schedule`] reports them). An item without applicable
/// constraints resolves to its own stored dates, with the end derived from
/// its duration when unset.
///
/// # Errors
///
/// Returns the violations that make the item unresolvable: a resolved end
/// preceding its start, or predecessor constraints that contradict the
/// item's duration. Stored dates are never touched by this function.
pub fn resolve_schedule(
    item: &WbsItem,
    tree: &WbsTree,
) -> Result<ResolvedDates, Vec<ScheduleViolation>> {
    let duration = own_duration(item);

    let mut latest_start: Option<NaiveDate> = None;
    let mut latest_end: Option<NaiveDate> = None;

    for pred in &item.predecessors {
        let Some(target) = tree.get(&pred.target_id) else {
            // Fail open: a stale reference constrains nothing
            continue;
        };

        let Some(candidate) = constraint_date(pred, target) else {
            continue;
        };
        if pred.dep_type.constrains_start() {
            latest_start = Some(latest_start.map_or(candidate, |s| s.max(candidate)));
        }
        if pred.dep_type.constrains_end() {
            latest_end = Some(latest_end.map_or(candidate, |e| e.max(candidate)));
        }
    }

    match (latest_start, latest_end) {
        (Some(start), Some(end)) => {
            if end < start {
                return Err(vec![ScheduleViolation::end_before_start(
                    &item.id, start, end,
                )]);
            }
            if let (Some(d), Ok(constrained)) = (duration, business_days_between(start, end)) {
                if constrained != d {
                    return Err(vec![ScheduleViolation::new(
                        &item.id,
                        ViolationKind::ConflictingConstraints,
                        format!(
                            "predecessors pin {} business days ({} to {}) but duration is {}",
                            constrained, start, end, d
                        ),
                    )]);
                }
            }
            Ok(ResolvedDates {
                start_date: Some(start),
                end_date: Some(end),
            })
        }
        (Some(start), None) => Ok(ResolvedDates {
            start_date: Some(start),
            end_date: duration.map(|d| add_business_days(start, (d - 1).max(0))),
        }),
        (None, Some(end)) => Ok(ResolvedDates {
            start_date: duration.map(|d| add_business_days(end, -((d - 1).max(0)))),
            end_date: Some(end),
        }),
        (None, None) => Ok(ResolvedDates {
            start_date: item.start_date,
            end_date: item.end_date.or_else(|| {
                let (start, d) = (item.start_date?, duration?);
                Some(add_business_days(start, (d - 1).max(0)))
            }),
        }),
    }
}

/// The date one predecessor link pins its successor's endpoint to; which
/// endpoint is given by [`DependencyType::constrains_start`] and
/// [`DependencyType::constrains_end`].
fn constraint_date(pred: &Predecessor, target: &WbsItem) -> Option<NaiveDate> {
    use crate::models::DependencyType::*;
    let anchor = match pred.dep_type {
        FS | FF => anchor_end(target),
        SS | SF => anchor_start(target),
    };
    // FS alone puts the successor on the next working day
    let offset = match pred.dep_type {
        FS => 1 + pred.lag,
        SS | FF | SF => pred.lag,
    };
    anchor.map(|date| add_business_days(date, offset))
}

/// Check whether adding `candidate` as a predecessor of `successor_id` would
/// close a loop in the predecessor graph.
///
/// Self-reference is rejected outright without traversal. Otherwise a
/// depth-first walk follows existing predecessor links from the candidate;
/// reaching the successor means the new edge would close a cycle, and the
/// error names the full path (`A -> B -> C -> A`). The check mutates
/// nothing, so a rejected edge leaves the graph exactly as it was.
pub fn check_new_predecessor(
    successor_id: &str,
    candidate: &Predecessor,
    tree: &WbsTree,
) -> Result<(), ScheduleError> {
    if candidate.target_id == successor_id {
        return Err(ScheduleError::SelfReference {
            id: successor_id.to_string(),
        });
    }
    if !tree.contains(&candidate.target_id) {
        // Nothing reachable through a dangling reference
        return Ok(());
    }

    let mut path = vec![candidate.target_id.clone()];
    let mut visited = std::collections::HashSet::new();
    if walk_predecessors(&candidate.target_id, successor_id, tree, &mut path, &mut visited) {
        let mut full = Vec::with_capacity(path.len() + 2);
        full.push(successor_id.to_string());
        full.extend(path);
        full.push(successor_id.to_string());
        return Err(ScheduleError::cycle(full));
    }
    Ok(())
}

/// DFS through predecessor links; returns true when `needle` is reachable,
/// leaving the offending chain in `path`.
fn walk_predecessors(
    from: &str,
    needle: &str,
    tree: &WbsTree,
    path: &mut Vec<String>,
    visited: &mut std::collections::HashSet<String>,
) -> bool {
    if !visited.insert(from.to_string()) {
        return false;
    }
    let Some(item) = tree.get(from) else {
        return false;
    };
    for pred in &item.predecessors {
        if pred.target_id == needle {
            return true;
        }
        path.push(pred.target_id.clone());
        if walk_predecessors(&pred.target_id, needle, tree, path, visited) {
            return true;
        }
        path.pop();
    }
    false
}

/// Whether the item lies on a predecessor cycle already present in the
/// snapshot (edge guards normally prevent this, but imported data can
/// carry it).
fn on_predecessor_cycle(item: &WbsItem, tree: &WbsTree) -> bool {
    let mut path = Vec::new();
    let mut visited = std::collections::HashSet::new();
    item.predecessors.iter().any(|pred| {
        tree.contains(&pred.target_id)
            && (pred.target_id == item.id
                || walk_predecessors(&pred.target_id, &item.id, tree, &mut path, &mut visited))
    })
}

/// Walk the whole snapshot and report every constraint violation, per item,
/// without mutating any state.
///
/// Reported findings: predecessor cycles, negative durations, conflicting
/// or backwards constraints, orphaned parent/predecessor references, and
/// predecessor links carried by non-leaf items. Advisory only; callers
/// decide what blocks persistence.
pub fn validate_schedule(tree: &WbsTree) -> Vec<ScheduleViolation> {
    let mut violations = Vec::new();

    // Deterministic report order: rooted forest first, then the orphaned
    // subtrees; a broken parent reference never hides an item's findings
    let items: Vec<&WbsItem> = tree.flatten_all();
    for orphan_id in tree.orphans() {
        if let Some(item) = tree.get(orphan_id) {
            violations.push(ScheduleViolation::orphan(
                &item.id,
                item.parent_id.as_deref().unwrap_or_default(),
            ));
        }
    }

    for item in items {
        if !tree.is_leaf(&item.id) && !item.predecessors.is_empty() {
            violations.push(ScheduleViolation::new(
                &item.id,
                ViolationKind::PredecessorOnParent,
                "only leaf items may carry predecessors; parents are rollup-derived",
            ));
        }

        if let Some(d) = item.duration {
            if d < 0 {
                violations.push(ScheduleViolation::new(
                    &item.id,
                    ViolationKind::NegativeDuration,
                    format!("stored duration is {}", d),
                ));
            }
        }

        for pred in &item.predecessors {
            if !tree.contains(&pred.target_id) {
                violations.push(ScheduleViolation::orphan(&item.id, &pred.target_id));
            }
        }

        if on_predecessor_cycle(item, tree) {
            violations.push(ScheduleViolation::new(
                &item.id,
                ViolationKind::CycleDetected,
                "item participates in a predecessor cycle",
            ));
            // Resolution under a cycle is meaningless; skip it for this item
            continue;
        }

        if let Err(mut item_violations) = resolve_schedule(item, tree) {
            violations.append(&mut item_violations);
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leaf(id: &str, wbs_id: &str, parent: Option<&str>, level: u8) -> WbsItem {
        let mut item = WbsItem::new_with_id(
            id.to_string(),
            format!("Item {}", id),
            parent.map(str::to_string),
            level,
        );
        item.wbs_id = wbs_id.to_string();
        item
    }

    #[test]
    fn test_simple_fs_chain() {
        // A starts Mon 2024-01-01 with duration 3; B depends FS lag 0 on A.
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 1));
        a.duration = Some(3);
        let mut b = leaf("b", "2", None, 0);
        b.duration = Some(2);
        b.predecessors.push(Predecessor::finish_to_start("a"));

        let tree = WbsTree::from_items(vec![a.clone(), b.clone()]);

        let resolved_a = resolve_schedule(&a, &tree).unwrap();
        assert_eq!(resolved_a.end_date, Some(date(2024, 1, 3)));

        let resolved_b = resolve_schedule(&b, &tree).unwrap();
        assert_eq!(resolved_b.start_date, Some(date(2024, 1, 4)));
        assert_eq!(resolved_b.end_date, Some(date(2024, 1, 5)));
    }

    #[test]
    fn test_fs_weekend_skip() {
        // A occupies Fri 2024-01-05 only; B starts the following Monday.
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 5));
        a.duration = Some(1);
        let mut b = leaf("b", "2", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("a"));

        let tree = WbsTree::from_items(vec![a.clone(), b.clone()]);

        let resolved_a = resolve_schedule(&a, &tree).unwrap();
        assert_eq!(resolved_a.end_date, Some(date(2024, 1, 5)));

        let resolved_b = resolve_schedule(&b, &tree).unwrap();
        assert_eq!(resolved_b.start_date, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_fs_round_trip_with_lag() {
        // B.start == add_business_days(A.end, 1 + lag)
        for lag in [-1i64, 0, 2, 5] {
            let mut a = leaf("a", "1", None, 0);
            a.start_date = Some(date(2024, 3, 4));
            a.end_date = Some(date(2024, 3, 6));
            let mut b = leaf("b", "2", None, 0);
            b.predecessors
                .push(Predecessor::new("a", DependencyType::FS, lag));

            let tree = WbsTree::from_items(vec![a, b.clone()]);
            let resolved = resolve_schedule(&b, &tree).unwrap();
            assert_eq!(
                resolved.start_date,
                Some(add_business_days(date(2024, 3, 6), 1 + lag)),
                "lag {}",
                lag
            );
        }
    }

    #[test]
    fn test_ss_ff_sf_rules() {
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 1));
        a.end_date = Some(date(2024, 1, 5));

        let mut ss = leaf("ss", "2", None, 0);
        ss.predecessors
            .push(Predecessor::new("a", DependencyType::SS, 1));
        let mut ff = leaf("ff", "3", None, 0);
        ff.predecessors
            .push(Predecessor::new("a", DependencyType::FF, 0));
        let mut sf = leaf("sf", "4", None, 0);
        sf.predecessors
            .push(Predecessor::new("a", DependencyType::SF, 2));

        let tree = WbsTree::from_items(vec![a, ss.clone(), ff.clone(), sf.clone()]);

        assert_eq!(
            resolve_schedule(&ss, &tree).unwrap().start_date,
            Some(date(2024, 1, 2))
        );
        assert_eq!(
            resolve_schedule(&ff, &tree).unwrap().end_date,
            Some(date(2024, 1, 5))
        );
        assert_eq!(
            resolve_schedule(&sf, &tree).unwrap().end_date,
            Some(date(2024, 1, 3))
        );
    }

    #[test]
    fn test_end_derived_backward_from_ff() {
        let mut a = leaf("a", "1", None, 0);
        a.end_date = Some(date(2024, 1, 10));
        a.start_date = Some(date(2024, 1, 8));

        let mut b = leaf("b", "2", None, 0);
        b.duration = Some(3);
        b.predecessors
            .push(Predecessor::new("a", DependencyType::FF, 0));

        let tree = WbsTree::from_items(vec![a, b.clone()]);
        let resolved = resolve_schedule(&b, &tree).unwrap();
        // End pinned to Wed 2024-01-10; 3 inclusive days back is Mon 01-08
        assert_eq!(resolved.end_date, Some(date(2024, 1, 10)));
        assert_eq!(resolved.start_date, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_multiple_predecessors_latest_wins() {
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 1));
        a.end_date = Some(date(2024, 1, 2));
        let mut b = leaf("b", "2", None, 0);
        b.start_date = Some(date(2024, 1, 1));
        b.end_date = Some(date(2024, 1, 8));

        let mut c = leaf("c", "3", None, 0);
        c.duration = Some(2);
        c.predecessors.push(Predecessor::finish_to_start("a")); // would allow 01-03
        c.predecessors.push(Predecessor::finish_to_start("b")); // binds: 01-09

        let tree = WbsTree::from_items(vec![a, b, c.clone()]);
        let resolved = resolve_schedule(&c, &tree).unwrap();
        assert_eq!(resolved.start_date, Some(date(2024, 1, 9)));
        assert_eq!(resolved.end_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn test_conflicting_constraints_reported_not_clamped() {
        // SS pins the start late, SF pins the end early: end < start.
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 10));
        a.end_date = Some(date(2024, 1, 12));

        let mut b = leaf("b", "2", None, 0);
        b.predecessors
            .push(Predecessor::new("a", DependencyType::SS, 0)); // start >= 01-10
        b.predecessors
            .push(Predecessor::new("a", DependencyType::SF, -3)); // end = 01-05

        let tree = WbsTree::from_items(vec![a, b.clone()]);
        let violations = resolve_schedule(&b, &tree).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::EndBeforeStart);
        assert_eq!(violations[0].item_id, "b");
    }

    #[test]
    fn test_duration_mismatch_is_conflicting() {
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 1, 1));
        a.end_date = Some(date(2024, 1, 5));

        // SS pins start to 01-01, FF pins end to 01-05 (5 business days),
        // but the item claims duration 2.
        let mut b = leaf("b", "2", None, 0);
        b.duration = Some(2);
        b.predecessors
            .push(Predecessor::new("a", DependencyType::SS, 0));
        b.predecessors
            .push(Predecessor::new("a", DependencyType::FF, 0));

        let tree = WbsTree::from_items(vec![a, b.clone()]);
        let violations = resolve_schedule(&b, &tree).unwrap_err();
        assert_eq!(violations[0].kind, ViolationKind::ConflictingConstraints);
    }

    #[test]
    fn test_unconstrained_item_keeps_own_dates() {
        let mut a = leaf("a", "1", None, 0);
        a.start_date = Some(date(2024, 2, 5));
        a.duration = Some(4);

        let tree = WbsTree::from_items(vec![a.clone()]);
        let resolved = resolve_schedule(&a, &tree).unwrap();
        assert_eq!(resolved.start_date, Some(date(2024, 2, 5)));
        assert_eq!(resolved.end_date, Some(date(2024, 2, 8)));
    }

    #[test]
    fn test_orphan_predecessor_fails_open() {
        let mut b = leaf("b", "1", None, 0);
        b.start_date = Some(date(2024, 1, 1));
        b.predecessors.push(Predecessor::finish_to_start("ghost"));

        let tree = WbsTree::from_items(vec![b.clone()]);
        // Resolution proceeds as if unconstrained
        let resolved = resolve_schedule(&b, &tree).unwrap();
        assert_eq!(resolved.start_date, Some(date(2024, 1, 1)));
        // Validation reports the dangling reference
        let violations = validate_schedule(&tree);
        assert!(violations
            .iter()
            .any(|v| v.item_id == "b" && v.kind == ViolationKind::OrphanReference));
    }

    #[test]
    fn test_self_reference_rejected_outright() {
        let tree = WbsTree::from_items(vec![leaf("a", "1", None, 0)]);
        let err = check_new_predecessor("a", &Predecessor::finish_to_start("a"), &tree);
        assert!(matches!(err, Err(ScheduleError::SelfReference { id }) if id == "a"));
    }

    #[test]
    fn test_cycle_rejected_with_full_path() {
        // Existing edges: b depends on c, c depends on a.
        // Adding "a depends on b" closes a -> b -> c -> a.
        let a = leaf("a", "1", None, 0);
        let mut b = leaf("b", "2", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("c"));
        let mut c = leaf("c", "3", None, 0);
        c.predecessors.push(Predecessor::finish_to_start("a"));

        let tree = WbsTree::from_items(vec![a, b, c]);
        let err = check_new_predecessor("a", &Predecessor::finish_to_start("b"), &tree)
            .unwrap_err();
        match err {
            ScheduleError::CycleDetected { path } => {
                assert_eq!(path, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        // The check mutates nothing: the snapshot still has the same edges
        assert!(tree.get("a").unwrap().predecessors.is_empty());
    }

    #[test]
    fn test_acyclic_edge_accepted() {
        let a = leaf("a", "1", None, 0);
        let mut b = leaf("b", "2", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let c = leaf("c", "3", None, 0);

        let tree = WbsTree::from_items(vec![a, b, c]);
        assert!(check_new_predecessor("c", &Predecessor::finish_to_start("b"), &tree).is_ok());
    }

    #[test]
    fn test_validate_reports_existing_cycle_without_hanging() {
        // Imported data with a pre-existing two-item cycle
        let mut a = leaf("a", "1", None, 0);
        a.predecessors.push(Predecessor::finish_to_start("b"));
        let mut b = leaf("b", "2", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("a"));

        let tree = WbsTree::from_items(vec![a, b]);
        let violations = validate_schedule(&tree);
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::CycleDetected));
    }

    #[test]
    fn test_validate_predecessor_on_parent() {
        let mut parent = leaf("p", "1", None, 0);
        parent.predecessors.push(Predecessor::finish_to_start("x"));
        let child = leaf("c", "1.1", Some("p"), 1);
        let x = leaf("x", "2", None, 0);

        let tree = WbsTree::from_items(vec![parent, child, x]);
        let violations = validate_schedule(&tree);
        assert!(violations
            .iter()
            .any(|v| v.item_id == "p" && v.kind == ViolationKind::PredecessorOnParent));
    }

    #[test]
    fn test_validate_covers_orphan_subtrees() {
        // The parent reference is broken, but findings inside the orphaned
        // subtree must still surface
        let lost = leaf("lost", "9.1", Some("missing"), 1);
        let mut bad = leaf("bad", "9.1.1", Some("lost"), 2);
        bad.duration = Some(-5);

        let tree = WbsTree::from_items(vec![leaf("p", "1.0", None, 0), lost, bad]);
        let violations = validate_schedule(&tree);
        assert!(violations
            .iter()
            .any(|v| v.item_id == "lost" && v.kind == ViolationKind::OrphanReference));
        assert!(violations
            .iter()
            .any(|v| v.item_id == "bad" && v.kind == ViolationKind::NegativeDuration));
    }

    #[test]
    fn test_validate_negative_duration() {
        let mut a = leaf("a", "1", None, 0);
        a.duration = Some(-3);

        let tree = WbsTree::from_items(vec![a]);
        let violations = validate_schedule(&tree);
        assert!(violations
            .iter()
            .any(|v| v.item_id == "a" && v.kind == ViolationKind::NegativeDuration));
    }
}

//! Schedule Operations
//!
//! `ScheduleOps` wraps an [`ItemStore`] and exposes every structural and
//! scheduling mutation as one high-level call: insert, duplicate, delete,
//! indent/outdent, date edits, dependency edits, and the full re-schedule
//! pass. Each operation follows the same shape:
//!
//! 1. Fetch a snapshot and build a [`WbsTree`]
//! 2. Run the pure engine against the snapshot
//! 3. Apply the planned writes through the store, ordered so that no
//!    intermediate state holds a duplicate `wbs_id`
//! 4. Finish with a renumbering pass when the structure changed
//!
//! The store sees plain single-row writes; nothing here assumes a
//! transaction spanning more than one call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::calendar::{add_business_days, business_days_between};
use crate::engine::dependency::{check_new_predecessor, resolve_schedule};
use crate::engine::renumber::{child_wbs_id, plan_sibling_shift, renumber, stage_wbs_id};
use crate::engine::{ScheduleError, ScheduleViolation, ViolationKind, WbsTree};
use crate::models::{Predecessor, WbsItem, WbsItemUpdate, MAX_LEVEL};
use crate::operations::store::{ItemStore, StoreError, UpdateOptions};

/// Operation-level failures
#[derive(Error, Debug)]
pub enum OperationError {
    /// The referenced item does not exist in the snapshot
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine-level rejection (cycles, corrupt hierarchy)
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// The operation is not valid for this item
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl OperationError {
    fn not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound { id: id.into() }
    }
}

/// High-level mutation surface over a store of WBS items
pub struct ScheduleOps<S: ItemStore> {
    store: Arc<S>,
}

impl<S: ItemStore> ScheduleOps<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch every item and build the hierarchy snapshot
    pub async fn snapshot(&self) -> Result<WbsTree, OperationError> {
        let items = self.store.fetch_all().await?;
        Ok(WbsTree::from_items(items))
    }

    /// Run a full renumbering pass and persist every changed identifier.
    ///
    /// Writes use deferred options so a reactive store does not cascade a
    /// re-schedule per row; identifiers carry no scheduling meaning.
    pub async fn apply_renumber(&self) -> Result<usize, OperationError> {
        let tree = self.snapshot().await?;
        let changes = renumber(&tree);
        debug!(changed = changes.len(), "applying renumber pass");
        for change in &changes {
            let update = WbsItemUpdate::new().with_wbs_id(change.new_wbs_id.clone());
            self.store
                .update_item(&change.id, update, UpdateOptions::deferred())
                .await?;
        }
        Ok(changes.len())
    }

    /// Insert a new root-level stage directly below `anchor_id`
    pub async fn insert_root_below(
        &self,
        anchor_id: &str,
        title: String,
    ) -> Result<WbsItem, OperationError> {
        let tree = self.snapshot().await?;
        let position = root_position(&tree, anchor_id)?;
        self.shift_and_place(&tree, None, position as u64 + 2, title)
            .await
    }

    /// Insert a new root-level stage directly above `anchor_id`
    pub async fn insert_root_above(
        &self,
        anchor_id: &str,
        title: String,
    ) -> Result<WbsItem, OperationError> {
        let tree = self.snapshot().await?;
        let position = root_position(&tree, anchor_id)?;
        self.shift_and_place(&tree, None, position as u64 + 1, title)
            .await
    }

    /// Append a new child under `parent_id`
    pub async fn insert_child(
        &self,
        parent_id: &str,
        title: String,
    ) -> Result<WbsItem, OperationError> {
        let tree = self.snapshot().await?;
        let parent = tree
            .get(parent_id)
            .ok_or_else(|| OperationError::not_found(parent_id))?;
        if parent.level >= MAX_LEVEL {
            return Err(OperationError::InvalidOperation(format!(
                "Cannot add a child below level {} (item {})",
                MAX_LEVEL, parent_id
            )));
        }
        let tail = tree.children(parent_id).len() as u64 + 1;
        self.shift_and_place(&tree, Some(parent_id), tail, title)
            .await
    }

    /// Duplicate one item (shallow: descendants are not copied) and place
    /// the copy directly after the source among its siblings.
    pub async fn duplicate_item(&self, id: &str) -> Result<WbsItem, OperationError> {
        let tree = self.snapshot().await?;
        let source = tree
            .get(id)
            .ok_or_else(|| OperationError::not_found(id))?
            .clone();

        let siblings = match source.parent_id.as_deref() {
            Some(parent_id) => tree.children(parent_id),
            None => tree.roots(),
        };
        let position = siblings
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| OperationError::not_found(id))?;

        let mut copy = WbsItem::new(source.title.clone(), source.parent_id.clone(), source.level);
        copy.description = source.description.clone();
        copy.status = source.status;
        copy.progress = source.progress;
        copy.start_date = source.start_date;
        copy.end_date = source.end_date;
        copy.duration = source.duration;
        copy.predecessors = source.predecessors.clone();
        copy.assigned_to = source.assigned_to.clone();

        self.place_existing(
            &tree,
            source.parent_id.as_deref(),
            position as u64 + 2,
            copy,
        )
        .await
    }

    /// Delete an item together with its whole subtree, then renumber.
    ///
    /// Descendants are removed deepest first so the store never holds a
    /// child whose parent row is already gone.
    pub async fn delete_cascade(&self, id: &str) -> Result<usize, OperationError> {
        let tree = self.snapshot().await?;
        if !tree.contains(id) {
            return Err(OperationError::not_found(id));
        }

        // Descendants come back parents-first; delete in reverse so leaves
        // go before their containers, the item itself last
        let mut doomed: Vec<String> = tree.descendants(id).iter().map(|d| d.id.clone()).collect();
        doomed.reverse();
        doomed.push(id.to_string());

        debug!(id, count = doomed.len(), "cascade delete");
        for victim in &doomed {
            self.store.delete_item(victim).await?;
        }
        self.apply_renumber().await?;
        Ok(doomed.len())
    }

    /// Make the item a child of its previous sibling (one level deeper).
    ///
    /// Rejected for a first sibling (nothing to indent under) and when any
    /// node in the subtree would end up deeper than [`MAX_LEVEL`].
    pub async fn indent(&self, id: &str) -> Result<(), OperationError> {
        let tree = self.snapshot().await?;
        let item = tree
            .get(id)
            .ok_or_else(|| OperationError::not_found(id))?;

        let siblings = match item.parent_id.as_deref() {
            Some(parent_id) => tree.children(parent_id),
            None => tree.roots(),
        };
        let position = siblings
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| OperationError::not_found(id))?;
        if position == 0 {
            return Err(OperationError::InvalidOperation(format!(
                "Cannot indent {}: it is the first of its siblings",
                id
            )));
        }
        let new_parent = siblings[position - 1];

        let subtree_max = tree
            .descendants(id)
            .iter()
            .map(|d| d.level)
            .max()
            .unwrap_or(item.level);
        if subtree_max + 1 > MAX_LEVEL {
            return Err(OperationError::InvalidOperation(format!(
                "Cannot indent {}: subtree would exceed level {}",
                id, MAX_LEVEL
            )));
        }

        debug!(id, new_parent = %new_parent.id, "indent");
        let tail = tree.children(&new_parent.id).len() as u64 + 1;
        let moved = WbsItemUpdate::new()
            .with_parent_id(Some(new_parent.id.clone()))
            .with_level(item.level + 1)
            .with_wbs_id(child_wbs_id(new_parent, tail));
        self.store
            .update_item(id, moved, UpdateOptions::deferred())
            .await?;
        self.shift_levels(&tree, id, 1).await?;
        self.apply_renumber().await?;
        Ok(())
    }

    /// Move the item up to its grandparent's level, placed directly after
    /// its former parent. Root-level items cannot be outdented.
    pub async fn outdent(&self, id: &str) -> Result<(), OperationError> {
        let tree = self.snapshot().await?;
        let item = tree
            .get(id)
            .ok_or_else(|| OperationError::not_found(id))?;
        let parent = match item.parent_id.as_deref().and_then(|p| tree.get(p)) {
            Some(parent) => parent,
            None => {
                return Err(OperationError::InvalidOperation(format!(
                    "Cannot outdent {}: already at the root level",
                    id
                )))
            }
        };

        let new_siblings = match parent.parent_id.as_deref() {
            Some(grandparent_id) => tree.children(grandparent_id),
            None => tree.roots(),
        };
        let parent_position = new_siblings
            .iter()
            .position(|s| s.id == parent.id)
            .ok_or_else(|| OperationError::not_found(&parent.id))?;
        let insert_index = parent_position as u64 + 2;

        debug!(id, new_parent = ?parent.parent_id, "outdent");
        // Vacate the slot after the former parent, highest index first
        for change in plan_sibling_shift(&tree, parent.parent_id.as_deref(), insert_index) {
            let update = WbsItemUpdate::new().with_wbs_id(change.new_wbs_id);
            self.store
                .update_item(&change.id, update, UpdateOptions::deferred())
                .await?;
        }

        let new_wbs_id = match parent.parent_id.as_deref().and_then(|p| tree.get(p)) {
            Some(grandparent) => child_wbs_id(grandparent, insert_index),
            None => stage_wbs_id(insert_index),
        };
        let moved = WbsItemUpdate::new()
            .with_parent_id(parent.parent_id.clone())
            .with_level(item.level.saturating_sub(1))
            .with_wbs_id(new_wbs_id);
        self.store
            .update_item(id, moved, UpdateOptions::deferred())
            .await?;
        self.shift_levels(&tree, id, -1).await?;
        self.apply_renumber().await?;
        Ok(())
    }

    /// Set an item's schedule dates and cascade the change to its
    /// successors.
    ///
    /// With only a start date and a known duration the end is derived; a
    /// pair where the end precedes the start is reported as a violation and
    /// nothing is written. Unless `options.skip_auto_schedule` is set, the
    /// write is followed by a full [`reschedule_all`](Self::reschedule_all)
    /// pass whose findings are appended to the result.
    pub async fn set_dates(
        &self,
        id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        options: UpdateOptions,
    ) -> Result<Vec<ScheduleViolation>, OperationError> {
        // A date edit needs only the item itself; the cascade pass takes
        // its own snapshot afterwards
        let item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| OperationError::not_found(id))?;

        let end = match (start, end) {
            (Some(start), None) => item
                .duration
                .map(|d| add_business_days(start, (d - 1).max(0))),
            (_, end) => end,
        };
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                warn!(id, %start, %end, "rejected backwards date range");
                return Ok(vec![ScheduleViolation::end_before_start(id, start, end)]);
            }
        }

        let duration = match (start, end) {
            (Some(start), Some(end)) => {
                // Guarded by the check above
                business_days_between(start, end).ok()
            }
            _ => item.duration,
        };

        debug!(id, ?start, ?end, "set dates");
        let update = WbsItemUpdate::new()
            .with_dates(start, end)
            .with_duration(duration);
        self.store
            .update_item(id, update, UpdateOptions::deferred())
            .await?;

        if options.skip_auto_schedule {
            return Ok(Vec::new());
        }
        self.reschedule_all().await
    }

    /// Add a dependency link to a leaf item and cascade the schedule.
    ///
    /// The edge is checked against the current graph before anything is
    /// written, so a rejected link leaves the store untouched.
    pub async fn add_predecessor(
        &self,
        successor_id: &str,
        predecessor: Predecessor,
        options: UpdateOptions,
    ) -> Result<Vec<ScheduleViolation>, OperationError> {
        let tree = self.snapshot().await?;
        let successor = tree
            .get(successor_id)
            .ok_or_else(|| OperationError::not_found(successor_id))?;
        if !tree.is_leaf(successor_id) {
            return Err(OperationError::InvalidOperation(format!(
                "Only leaf items carry dependencies; {} has children",
                successor_id
            )));
        }
        check_new_predecessor(successor_id, &predecessor, &tree)?;

        let mut predecessors = successor.predecessors.clone();
        predecessors.push(predecessor);
        debug!(successor_id, count = predecessors.len(), "add predecessor");
        let update = WbsItemUpdate::new().with_predecessors(predecessors);
        self.store
            .update_item(successor_id, update, UpdateOptions::deferred())
            .await?;

        if options.skip_auto_schedule {
            return Ok(Vec::new());
        }
        self.reschedule_all().await
    }

    /// Re-derive every constrained item's dates from its predecessors, in
    /// dependency order, and persist the ones that changed.
    ///
    /// Items whose constraints cannot be satisfied keep their stored dates
    /// and are reported as violations; items on a dependency cycle are
    /// skipped and reported likewise. Unconstrained items are never
    /// rewritten.
    pub async fn reschedule_all(&self) -> Result<Vec<ScheduleViolation>, OperationError> {
        let tree = self.snapshot().await?;
        let mut violations = Vec::new();
        let (order, cyclic) = dependency_order(&tree);
        for id in &cyclic {
            violations.push(ScheduleViolation::new(
                id,
                ViolationKind::CycleDetected,
                "item is part of a dependency cycle; dates left unchanged".to_string(),
            ));
        }

        let mut working: HashMap<String, WbsItem> =
            tree.items().map(|i| (i.id.clone(), i.clone())).collect();

        for id in order {
            if cyclic.contains(&id) {
                continue;
            }
            let Some(item) = working.get(&id) else { continue };
            if item.predecessors.is_empty() {
                continue;
            }

            let step_tree = WbsTree::from_items(working.values().cloned().collect());
            let item = step_tree.get(&id).cloned();
            let Some(item) = item else { continue };
            match resolve_schedule(&item, &step_tree) {
                Ok(resolved) => {
                    if resolved.start_date == item.start_date && resolved.end_date == item.end_date
                    {
                        continue;
                    }
                    let duration = match (resolved.start_date, resolved.end_date) {
                        (Some(start), Some(end)) => business_days_between(start, end).ok(),
                        _ => item.duration,
                    };
                    debug!(id = %id, ?resolved, "rescheduled");
                    let update = WbsItemUpdate::new()
                        .with_dates(resolved.start_date, resolved.end_date)
                        .with_duration(duration);
                    self.store
                        .update_item(&id, update.clone(), UpdateOptions::deferred())
                        .await?;
                    if let Some(entry) = working.get_mut(&id) {
                        entry.apply_update(&update);
                    }
                }
                Err(mut found) => {
                    warn!(id = %id, count = found.len(), "unresolvable constraints");
                    violations.append(&mut found);
                }
            }
        }
        Ok(violations)
    }

    /// Shift the slot, place a brand-new item into it, and renumber
    async fn shift_and_place(
        &self,
        tree: &WbsTree,
        parent: Option<&str>,
        insert_index: u64,
        title: String,
    ) -> Result<WbsItem, OperationError> {
        let level = match parent {
            Some(parent_id) => {
                tree.get(parent_id)
                    .ok_or_else(|| OperationError::not_found(parent_id))?
                    .level
                    + 1
            }
            None => 0,
        };
        let item = WbsItem::new(title, parent.map(str::to_string), level);
        self.place_existing(tree, parent, insert_index, item).await
    }

    /// Apply the sibling shift for `insert_index`, write the item into the
    /// vacated slot, then run the full renumbering pass.
    async fn place_existing(
        &self,
        tree: &WbsTree,
        parent: Option<&str>,
        insert_index: u64,
        mut item: WbsItem,
    ) -> Result<WbsItem, OperationError> {
        for change in plan_sibling_shift(tree, parent, insert_index) {
            let update = WbsItemUpdate::new().with_wbs_id(change.new_wbs_id);
            self.store
                .update_item(&change.id, update, UpdateOptions::deferred())
                .await?;
        }

        item.wbs_id = match parent.and_then(|p| tree.get(p)) {
            Some(parent_item) => child_wbs_id(parent_item, insert_index),
            None => stage_wbs_id(insert_index),
        };
        debug!(id = %item.id, wbs_id = %item.wbs_id, "placing item");
        self.store.insert_item(item.clone()).await?;
        self.apply_renumber().await?;
        Ok(item)
    }

    /// Adjust the stored level of every descendant of `id` by `delta`
    async fn shift_levels(
        &self,
        tree: &WbsTree,
        id: &str,
        delta: i8,
    ) -> Result<(), OperationError> {
        for descendant in tree.descendants(id) {
            let level = (descendant.level as i8 + delta).max(0) as u8;
            let update = WbsItemUpdate::new().with_level(level);
            self.store
                .update_item(&descendant.id, update, UpdateOptions::deferred())
                .await?;
        }
        Ok(())
    }
}

/// 1-based-friendly position of a root item
fn root_position(tree: &WbsTree, id: &str) -> Result<usize, OperationError> {
    tree.roots()
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| OperationError::InvalidOperation(format!("{} is not a root-level item", id)))
}

/// Order item ids so every predecessor comes before its successors.
///
/// Returns the order plus the set of ids found on a cycle; cyclic items are
/// excluded from the order entirely.
fn dependency_order(tree: &WbsTree) -> (Vec<String>, HashSet<String>) {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut stack = Vec::new();
    let mut cyclic = HashSet::new();

    fn visit(
        id: &str,
        tree: &WbsTree,
        order: &mut Vec<String>,
        done: &mut HashSet<String>,
        stack: &mut Vec<String>,
        cyclic: &mut HashSet<String>,
    ) {
        if done.contains(id) {
            return;
        }
        if let Some(entry) = stack.iter().position(|s| s == id) {
            // Back edge: only the loop itself is cyclic, not the callers
            // that merely depend on it
            cyclic.extend(stack[entry..].iter().cloned());
            return;
        }
        stack.push(id.to_string());
        if let Some(item) = tree.get(id) {
            for pred in &item.predecessors {
                if tree.contains(&pred.target_id) {
                    visit(&pred.target_id, tree, order, done, stack, cyclic);
                }
            }
        }
        stack.pop();
        done.insert(id.to_string());
        order.push(id.to_string());
    }

    for item in tree.items() {
        visit(
            &item.id,
            tree,
            &mut order,
            &mut done,
            &mut stack,
            &mut cyclic,
        );
    }
    order.retain(|id| !cyclic.contains(id));
    (order, cyclic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyType;
    use crate::operations::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(id: &str, wbs_id: &str, parent: Option<&str>, level: u8) -> WbsItem {
        let mut item = WbsItem::new_with_id(
            id.to_string(),
            format!("Item {}", id),
            parent.map(str::to_string),
            level,
        );
        item.wbs_id = wbs_id.to_string();
        item
    }

    fn ops(items: Vec<WbsItem>) -> (ScheduleOps<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(items));
        (ScheduleOps::new(Arc::clone(&store)), store)
    }

    fn wbs_of(store: &MemoryStore, id: &str) -> String {
        store
            .items()
            .into_iter()
            .find(|i| i.id == id)
            .unwrap()
            .wbs_id
    }

    #[tokio::test]
    async fn test_insert_root_below_shifts_without_collisions() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
            item("r3", "3.0", None, 0),
        ]);

        let new_item = ops
            .insert_root_below("r1", "Superstructure".to_string())
            .await
            .unwrap();

        assert_eq!(new_item.wbs_id, "2.0");
        assert_eq!(wbs_of(&store, "r1"), "1.0");
        assert_eq!(wbs_of(&store, "r2"), "3.0");
        assert_eq!(wbs_of(&store, "r3"), "4.0");
        // The shift runs highest index first against the non-transactional
        // store, so no intermediate state duplicated an identifier.
        assert!(!store.saw_duplicate_wbs_id());
    }

    #[tokio::test]
    async fn test_insert_root_above_first() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
        ]);

        let new_item = ops
            .insert_root_above("r1", "Enabling works".to_string())
            .await
            .unwrap();

        assert_eq!(new_item.wbs_id, "1.0");
        assert_eq!(wbs_of(&store, "r1"), "2.0");
        assert_eq!(wbs_of(&store, "r2"), "3.0");
        assert!(!store.saw_duplicate_wbs_id());
    }

    #[tokio::test]
    async fn test_insert_child_appended_at_tail() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("c1", "1.1", Some("r1"), 1),
        ]);

        let child = ops
            .insert_child("r1", "Drainage".to_string())
            .await
            .unwrap();

        assert_eq!(child.wbs_id, "1.2");
        assert_eq!(child.level, 1);
        assert_eq!(child.parent_id.as_deref(), Some("r1"));
        assert_eq!(wbs_of(&store, "c1"), "1.1");
    }

    #[tokio::test]
    async fn test_insert_child_rejected_below_max_level() {
        let (ops, _store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("c1", "1.1", Some("r1"), 1),
            item("g1", "1.1.1", Some("c1"), 2),
            item("t1", "1.1.1.1", Some("g1"), 3),
        ]);

        let result = ops.insert_child("t1", "Too deep".to_string()).await;
        assert!(matches!(result, Err(OperationError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_apply_renumber_writes_only_changed() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "3.0", None, 0),
        ]);

        let changed = ops.apply_renumber().await.unwrap();

        assert_eq!(changed, 1);
        assert_eq!(store.write_log(), vec!["update:r2".to_string()]);
        assert_eq!(wbs_of(&store, "r2"), "2.0");
    }

    #[tokio::test]
    async fn test_duplicate_placed_after_source() {
        let mut source = item("c1", "1.1", Some("r1"), 1);
        source.duration = Some(5);
        source.assigned_to = Some("site-team".to_string());
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            source,
            item("c2", "1.2", Some("r1"), 1),
        ]);

        let copy = ops.duplicate_item("c1").await.unwrap();

        assert_eq!(copy.wbs_id, "1.2");
        assert_eq!(copy.duration, Some(5));
        assert_eq!(copy.assigned_to.as_deref(), Some("site-team"));
        assert_ne!(copy.id, "c1");
        assert_eq!(wbs_of(&store, "c2"), "1.3");
        assert!(!store.saw_duplicate_wbs_id());
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_subtree_and_renumbers() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
            item("c1", "2.1", Some("r2"), 1),
            item("g1", "2.1.1", Some("c1"), 2),
            item("r3", "3.0", None, 0),
        ]);

        let removed = ops.delete_cascade("r2").await.unwrap();

        assert_eq!(removed, 3);
        let ids: Vec<String> = store.items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
        assert_eq!(wbs_of(&store, "r3"), "2.0");
    }

    #[tokio::test]
    async fn test_indent_under_previous_sibling() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
        ]);

        ops.indent("r2").await.unwrap();

        let moved = store.items().into_iter().find(|i| i.id == "r2").unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("r1"));
        assert_eq!(moved.level, 1);
        assert_eq!(moved.wbs_id, "1.1");
    }

    #[tokio::test]
    async fn test_indent_first_sibling_rejected() {
        let (ops, _store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
        ]);

        assert!(matches!(
            ops.indent("r1").await,
            Err(OperationError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_indent_rejected_when_subtree_too_deep() {
        let (ops, _store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("r2", "2.0", None, 0),
            item("c1", "2.1", Some("r2"), 1),
            item("g1", "2.1.1", Some("c1"), 2),
            item("t1", "2.1.1.1", Some("g1"), 3),
        ]);

        assert!(matches!(
            ops.indent("r2").await,
            Err(OperationError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_outdent_after_former_parent() {
        let (ops, store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("c1", "1.1", Some("r1"), 1),
            item("g1", "1.1.1", Some("c1"), 2),
            item("r2", "2.0", None, 0),
        ]);

        ops.outdent("c1").await.unwrap();

        let moved = store.items().into_iter().find(|i| i.id == "c1").unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.level, 0);
        assert_eq!(moved.wbs_id, "2.0");
        assert_eq!(wbs_of(&store, "r2"), "3.0");
        // The grandchild followed its parent one level up
        let grandchild = store.items().into_iter().find(|i| i.id == "g1").unwrap();
        assert_eq!(grandchild.level, 1);
        assert_eq!(grandchild.wbs_id, "2.1");
        assert!(!store.saw_duplicate_wbs_id());
    }

    #[tokio::test]
    async fn test_outdent_root_rejected() {
        let (ops, _store) = ops(vec![item("r1", "1.0", None, 0)]);

        assert!(matches!(
            ops.outdent("r1").await,
            Err(OperationError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_dates_cascades_to_successors() {
        let mut a = item("a", "1.0", None, 0);
        a.duration = Some(3);
        let mut b = item("b", "2.0", None, 0);
        b.duration = Some(2);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let (ops, store) = ops(vec![a, b]);

        // Monday start, 3 business days: ends Wednesday Jan 10
        let violations = ops
            .set_dates("a", Some(date(2024, 1, 8)), None, UpdateOptions::default())
            .await
            .unwrap();

        assert!(violations.is_empty());
        let a = store.items().into_iter().find(|i| i.id == "a").unwrap();
        assert_eq!(a.start_date, Some(date(2024, 1, 8)));
        assert_eq!(a.end_date, Some(date(2024, 1, 10)));

        let b = store.items().into_iter().find(|i| i.id == "b").unwrap();
        assert_eq!(b.start_date, Some(date(2024, 1, 11)));
        assert_eq!(b.end_date, Some(date(2024, 1, 12)));
    }

    #[tokio::test]
    async fn test_set_dates_skip_auto_schedule() {
        let mut a = item("a", "1.0", None, 0);
        a.duration = Some(3);
        let mut b = item("b", "2.0", None, 0);
        b.duration = Some(2);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let (ops, store) = ops(vec![a, b]);

        ops.set_dates(
            "a",
            Some(date(2024, 1, 8)),
            None,
            UpdateOptions::deferred(),
        )
        .await
        .unwrap();

        let b = store.items().into_iter().find(|i| i.id == "b").unwrap();
        assert_eq!(b.start_date, None);
    }

    #[tokio::test]
    async fn test_set_dates_backwards_range_rejected() {
        let (ops, store) = ops(vec![item("a", "1.0", None, 0)]);

        let violations = ops
            .set_dates(
                "a",
                Some(date(2024, 1, 10)),
                Some(date(2024, 1, 8)),
                UpdateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::EndBeforeStart);
        let a = store.items().into_iter().find(|i| i.id == "a").unwrap();
        assert_eq!(a.start_date, None);
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_add_predecessor_cycle_leaves_store_unchanged() {
        let mut a = item("a", "1.0", None, 0);
        a.predecessors.push(Predecessor::finish_to_start("b"));
        let b = item("b", "2.0", None, 0);
        let (ops, store) = ops(vec![a, b]);

        let result = ops
            .add_predecessor(
                "b",
                Predecessor::finish_to_start("a"),
                UpdateOptions::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(OperationError::Schedule(ScheduleError::CycleDetected { .. }))
        ));
        assert!(store.write_log().is_empty());
        let b = store.items().into_iter().find(|i| i.id == "b").unwrap();
        assert!(b.predecessors.is_empty());
    }

    #[tokio::test]
    async fn test_add_predecessor_rejected_on_parent() {
        let (ops, _store) = ops(vec![
            item("r1", "1.0", None, 0),
            item("c1", "1.1", Some("r1"), 1),
            item("r2", "2.0", None, 0),
        ]);

        assert!(matches!(
            ops.add_predecessor(
                "r1",
                Predecessor::finish_to_start("r2"),
                UpdateOptions::default()
            )
            .await,
            Err(OperationError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_add_predecessor_schedules_successor() {
        let mut a = item("a", "1.0", None, 0);
        a.start_date = Some(date(2024, 1, 8));
        a.end_date = Some(date(2024, 1, 10));
        a.duration = Some(3);
        let mut b = item("b", "2.0", None, 0);
        b.duration = Some(2);
        let (ops, store) = ops(vec![a, b]);

        let violations = ops
            .add_predecessor(
                "b",
                Predecessor::new("a", DependencyType::SS, 1),
                UpdateOptions::default(),
            )
            .await
            .unwrap();

        assert!(violations.is_empty());
        let b = store.items().into_iter().find(|i| i.id == "b").unwrap();
        // SS with one day of lag off a Monday start
        assert_eq!(b.start_date, Some(date(2024, 1, 9)));
        assert_eq!(b.end_date, Some(date(2024, 1, 10)));
    }

    #[tokio::test]
    async fn test_reschedule_all_chain_in_dependency_order() {
        let mut a = item("a", "1.0", None, 0);
        a.start_date = Some(date(2024, 1, 1));
        a.duration = Some(3);
        let mut b = item("b", "2.0", None, 0);
        b.duration = Some(2);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let mut c = item("c", "3.0", None, 0);
        c.duration = Some(1);
        c.predecessors.push(Predecessor::finish_to_start("b"));
        let (ops, store) = ops(vec![c, b, a]);

        let violations = ops.reschedule_all().await.unwrap();

        assert!(violations.is_empty());
        // A: Mon Jan 1 - Wed Jan 3; B: Thu Jan 4 - Fri Jan 5; C: Mon Jan 8
        let b = store.items().into_iter().find(|i| i.id == "b").unwrap();
        assert_eq!(b.start_date, Some(date(2024, 1, 4)));
        assert_eq!(b.end_date, Some(date(2024, 1, 5)));
        let c = store.items().into_iter().find(|i| i.id == "c").unwrap();
        assert_eq!(c.start_date, Some(date(2024, 1, 8)));
        assert_eq!(c.end_date, Some(date(2024, 1, 8)));
    }

    #[tokio::test]
    async fn test_reschedule_all_reports_cycle_without_writes() {
        let mut a = item("a", "1.0", None, 0);
        a.predecessors.push(Predecessor::finish_to_start("b"));
        let mut b = item("b", "2.0", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let (ops, store) = ops(vec![a, b]);

        let violations = ops.reschedule_all().await.unwrap();

        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|v| v.kind == ViolationKind::CycleDetected));
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_all_dependent_of_cycle_not_marked_cyclic() {
        // a <-> b form the loop; c merely depends on b
        let mut a = item("a", "1.0", None, 0);
        a.predecessors.push(Predecessor::finish_to_start("b"));
        let mut b = item("b", "2.0", None, 0);
        b.predecessors.push(Predecessor::finish_to_start("a"));
        let mut c = item("c", "3.0", None, 0);
        c.predecessors.push(Predecessor::finish_to_start("b"));
        let (ops, _store) = ops(vec![a, b, c]);

        let violations = ops.reschedule_all().await.unwrap();

        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|v| v.kind == ViolationKind::CycleDetected));
        assert!(violations.iter().all(|v| v.item_id != "c"));
    }
}

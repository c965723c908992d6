//! WBS Tree Snapshot
//!
//! An immutable index over one project's items: id lookup, parent/child
//! navigation in declared sibling order, depth-first flattening, and
//! structural consistency checks.
//!
//! Declared sibling order is reconstructed from the current `wbs_id` numeric
//! segments (the authoritative position record), with creation order as the
//! fallback for provisionally-numbered items awaiting a renumbering pass.
//!
//! Items whose `parent_id` points outside the snapshot are reported through
//! [`WbsTree::orphans`] and left out of rooted traversals; per-item
//! computations still see them, so a stale reference never aborts work on
//! the rest of the tree.

use std::collections::HashMap;

use crate::engine::error::ScheduleError;
use crate::models::WbsItem;

/// Numeric position of an item within its sibling group, parsed from its
/// `wbs_id`. Root-level stage ids ("3.0") carry their index in the first
/// segment; everything else carries it in the last.
pub(crate) fn sibling_order_key(item: &WbsItem) -> Option<u64> {
    let segment = if item.level == 0 {
        item.wbs_id.split('.').next()
    } else {
        item.wbs_id.rsplit('.').next()
    };
    segment.and_then(|s| s.parse::<u64>().ok())
}

/// Immutable snapshot index over a project's WBS items
#[derive(Debug, Clone)]
pub struct WbsTree {
    items: HashMap<String, WbsItem>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
    orphans: Vec<String>,
}

impl WbsTree {
    /// Build the index from a snapshot of items.
    ///
    /// Sibling groups are ordered by their `wbs_id` numeric segment, then by
    /// creation time, then by id for full determinism.
    pub fn from_items(items: Vec<WbsItem>) -> Self {
        let mut map: HashMap<String, WbsItem> = HashMap::with_capacity(items.len());
        for item in items {
            map.insert(item.id.clone(), item);
        }

        let mut roots: Vec<String> = Vec::new();
        let mut orphans: Vec<String> = Vec::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for item in map.values() {
            match &item.parent_id {
                None => roots.push(item.id.clone()),
                Some(parent_id) if map.contains_key(parent_id) => {
                    children.entry(parent_id.clone()).or_default().push(item.id.clone());
                }
                Some(_) => orphans.push(item.id.clone()),
            }
        }

        let order = |id: &String| {
            let item = &map[id];
            (
                sibling_order_key(item).unwrap_or(u64::MAX),
                item.created_at,
                item.id.clone(),
            )
        };
        roots.sort_by_key(order);
        orphans.sort_by_key(order);
        for group in children.values_mut() {
            group.sort_by_key(order);
        }

        Self {
            items: map,
            children,
            roots,
            orphans,
        }
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&WbsItem> {
        self.items.get(id)
    }

    /// Whether the snapshot contains the id
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Number of items in the snapshot
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items, in arbitrary order
    pub fn items(&self) -> impl Iterator<Item = &WbsItem> {
        self.items.values()
    }

    /// Root-level items in declared order
    pub fn roots(&self) -> Vec<&WbsItem> {
        self.roots.iter().map(|id| &self.items[id]).collect()
    }

    /// Direct children of an item, in declared sibling order
    pub fn children(&self, id: &str) -> Vec<&WbsItem> {
        self.children
            .get(id)
            .map(|ids| ids.iter().map(|id| &self.items[id]).collect())
            .unwrap_or_default()
    }

    /// The item's parent, if it has one and the reference resolves
    pub fn parent(&self, id: &str) -> Option<&WbsItem> {
        let parent_id = self.items.get(id)?.parent_id.as_deref()?;
        self.items.get(parent_id)
    }

    /// Whether the item has no children
    pub fn is_leaf(&self, id: &str) -> bool {
        self.children.get(id).map_or(true, |c| c.is_empty())
    }

    /// Ids of items whose `parent_id` does not resolve in this snapshot
    pub fn orphans(&self) -> &[String] {
        &self.orphans
    }

    /// Depth of the item (number of resolvable ancestors), or `None` when
    /// the parent chain is broken or cyclic.
    pub fn depth(&self, id: &str) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.items.get(id)?;
        // A chain longer than the snapshot means a parent cycle
        let mut budget = self.items.len();
        while let Some(parent_id) = &current.parent_id {
            current = self.items.get(parent_id)?;
            depth += 1;
            budget = budget.checked_sub(1)?;
        }
        Some(depth)
    }

    /// Depth-first flattening of the rooted forest in declared order
    pub fn flatten(&self) -> Vec<&WbsItem> {
        let mut out = Vec::with_capacity(self.items.len());
        for root_id in &self.roots {
            self.flatten_into(root_id, &mut out);
        }
        out
    }

    /// [`flatten`](Self::flatten) followed by each orphaned subtree in
    /// declared order, so fail-open computations still see every item.
    pub fn flatten_all(&self) -> Vec<&WbsItem> {
        let mut out = self.flatten();
        for orphan_id in &self.orphans {
            self.flatten_into(orphan_id, &mut out);
        }
        out
    }

    fn flatten_into<'a>(&'a self, id: &str, out: &mut Vec<&'a WbsItem>) {
        out.push(&self.items[id]);
        if let Some(child_ids) = self.children.get(id) {
            for child_id in child_ids {
                self.flatten_into(child_id, out);
            }
        }
    }

    /// All descendants of an item, depth-first in declared order
    pub fn descendants(&self, id: &str) -> Vec<&WbsItem> {
        let mut out = Vec::new();
        if let Some(child_ids) = self.children.get(id) {
            for child_id in child_ids {
                self.flatten_into(child_id, &mut out);
            }
        }
        out
    }

    /// Internal-consistency check over `level`, `parent_id`, and sibling
    /// `wbs_id` sequences.
    ///
    /// Findings here indicate a bug in a structural mutation (a skipped or
    /// broken renumbering pass), not bad user input; callers may escalate
    /// them to hard failures.
    pub fn check_hierarchy(&self) -> Vec<ScheduleError> {
        let mut findings = Vec::new();

        for item in self.items.values() {
            match self.depth(&item.id) {
                Some(depth) if depth == item.level as usize => {}
                Some(depth) => findings.push(ScheduleError::invalid_hierarchy(
                    &item.id,
                    format!("level {} does not match depth {}", item.level, depth),
                )),
                // Broken chains are reported as orphans, not here; a cyclic
                // chain is genuine corruption.
                None if item.parent_id.is_some() && !self.orphans.contains(&item.id) => {
                    findings.push(ScheduleError::invalid_hierarchy(
                        &item.id,
                        "parent chain does not terminate",
                    ));
                }
                None => {}
            }
        }

        let mut groups: Vec<&Vec<String>> = self.children.values().collect();
        let root_ids = self.roots.clone();
        groups.push(&root_ids);
        for group in groups {
            for (index, id) in group.iter().enumerate() {
                let item = &self.items[id];
                let expected = (index + 1) as u64;
                match sibling_order_key(item) {
                    Some(actual) if actual == expected => {}
                    Some(actual) => findings.push(ScheduleError::invalid_hierarchy(
                        id,
                        format!("sibling index {} where {} was expected", actual, expected),
                    )),
                    None => findings.push(ScheduleError::invalid_hierarchy(
                        id,
                        format!("malformed wbs_id '{}'", item.wbs_id),
                    )),
                }
            }
        }

        findings
    }
}

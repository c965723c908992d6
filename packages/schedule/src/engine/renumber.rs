//! Hierarchical Renumbering Engine
//!
//! Reassigns dotted `wbs_id` identifiers after structural changes (insert,
//! delete, indent, outdent, drag-reorder) so that, at every level, siblings
//! are numbered `1..=N` in declared order with no gaps. Root-level stage
//! nodes carry a literal `".0"` suffix (`"3.0"`); their descendants inherit
//! the bare numeric prefix (`"3.1"`, `"3.1.2"`).
//!
//! The full pass is a pure computation returning only the items whose id
//! actually changed; it is idempotent, so running it after the fast-path
//! shift below is a no-op on an already-consistent tree.
//!
//! The single-level fast path ([`plan_sibling_shift`]) exists because the
//! external store applies updates one row at a time: shifting siblings in
//! descending index order keeps every identifier unique at every
//! intermediate step, after which the caller places the new item into the
//! vacant slot.

use crate::engine::tree::WbsTree;
use crate::models::WbsItem;

/// One `wbs_id` reassignment produced by a renumbering pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbsIdChange {
    /// Item to rewrite
    pub id: String,
    /// Its new dotted identifier
    pub new_wbs_id: String,
}

/// Identifier for a root-level stage at the given 1-based index
pub fn stage_wbs_id(index: u64) -> String {
    format!("{}.0", index)
}

/// Identifier for the child at the given 1-based index under `parent`
pub fn child_wbs_id(parent: &WbsItem, index: u64) -> String {
    format!("{}.{}", numeric_prefix(parent), index)
}

/// The numeric prefix descendants inherit: a stage's bare index ("3" from
/// "3.0"), or the item's full `wbs_id` anywhere deeper.
fn numeric_prefix(item: &WbsItem) -> &str {
    if item.level == 0 {
        item.wbs_id.split('.').next().unwrap_or(&item.wbs_id)
    } else {
        &item.wbs_id
    }
}

/// Recompute every item's `wbs_id` from the declared sibling order.
///
/// Depth-first walk with a per-depth counter stack: entering a node
/// increments the counter at its depth and resets all deeper counters.
/// Returns only the items whose identifier changed.
pub fn renumber(tree: &WbsTree) -> Vec<WbsIdChange> {
    let mut changes = Vec::new();
    for (index, root) in tree.roots().into_iter().enumerate() {
        let root_index = (index + 1) as u64;
        let expected = stage_wbs_id(root_index);
        if root.wbs_id != expected {
            changes.push(WbsIdChange {
                id: root.id.clone(),
                new_wbs_id: expected,
            });
        }
        renumber_children(tree, &root.id, &root_index.to_string(), &mut changes);
    }
    changes
}

fn renumber_children(
    tree: &WbsTree,
    parent_id: &str,
    prefix: &str,
    changes: &mut Vec<WbsIdChange>,
) {
    for (index, child) in tree.children(parent_id).into_iter().enumerate() {
        let expected = format!("{}.{}", prefix, index + 1);
        if child.wbs_id != expected {
            changes.push(WbsIdChange {
                id: child.id.clone(),
                new_wbs_id: expected.clone(),
            });
        }
        renumber_children(tree, &child.id, &expected, changes);
    }
}

/// Plan the fast-path shift that vacates the 1-based slot `insert_index`
/// within one sibling group (`parent = None` targets the root level).
///
/// Every sibling at position `>= insert_index` moves up by one. Writes are
/// emitted highest index first: applied in order against a store without
/// multi-row transactions, no intermediate state ever holds a duplicate
/// `wbs_id`. The caller then places the new or moved item into the vacant
/// slot and runs the full [`renumber`] pass to catch any deeper drift.
pub fn plan_sibling_shift(
    tree: &WbsTree,
    parent: Option<&str>,
    insert_index: u64,
) -> Vec<WbsIdChange> {
    let siblings: Vec<&WbsItem> = match parent {
        Some(parent_id) => tree.children(parent_id),
        None => tree.roots(),
    };
    let parent_item = parent.and_then(|id| tree.get(id));

    let mut changes: Vec<WbsIdChange> = Vec::new();
    for (position, sibling) in siblings.iter().enumerate() {
        let current = (position + 1) as u64;
        if current < insert_index {
            continue;
        }
        let shifted = current + 1;
        let new_wbs_id = match parent_item {
            Some(parent_item) => child_wbs_id(parent_item, shifted),
            None => stage_wbs_id(shifted),
        };
        changes.push(WbsIdChange {
            id: sibling.id.clone(),
            new_wbs_id,
        });
    }

    // Highest index written first
    changes.reverse();
    changes
}

//! Engine Error Types
//!
//! Two distinct shapes, reflecting two distinct audiences:
//!
//! - [`ScheduleError`] - returned from operations that must be rejected
//!   outright (closing a dependency cycle, internal hierarchy corruption).
//! - [`ScheduleViolation`] - advisory findings collected during validation
//!   and resolution. Violations are data, never raised mid-computation; a
//!   single invalid item must not abort rollup or critical-path work for the
//!   rest of the tree.

use chrono::NaiveDate;
use thiserror::Error;

/// Business-day calendar errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The requested range runs backwards
    #[error("End date {end} precedes start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Hard scheduling errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// An item referencing itself as a predecessor, rejected without traversal
    #[error("Item cannot depend on itself: {id}")]
    SelfReference { id: String },

    /// A predecessor edge would close a loop; the path names every hop
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// `wbs_id`, `level`, or `parent_id` are mutually inconsistent. This
    /// indicates a renumbering bug, not bad user input, and may be escalated
    /// to a hard failure by the caller.
    #[error("Inconsistent hierarchy for item {id}: {reason}")]
    InvalidHierarchy { id: String, reason: String },

    /// Calendar arithmetic failed
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl ScheduleError {
    /// Create a cycle error from the traversal path
    pub fn cycle(path: Vec<String>) -> Self {
        Self::CycleDetected { path }
    }

    /// Create an internal-consistency error
    pub fn invalid_hierarchy(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHierarchy {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Category of an advisory validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A resolved end date precedes its start date
    EndBeforeStart,
    /// Predecessor constraints cannot be satisfied simultaneously
    ConflictingConstraints,
    /// Stored duration is negative
    NegativeDuration,
    /// The item participates in a predecessor cycle
    CycleDetected,
    /// A `parent_id` or predecessor target is absent from the snapshot;
    /// the reference is treated as absent for computation (fails open)
    OrphanReference,
    /// A non-leaf item carries predecessor links; parents are rollup-derived
    PredecessorOnParent,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EndBeforeStart => "end_before_start",
            Self::ConflictingConstraints => "conflicting_constraints",
            Self::NegativeDuration => "negative_duration",
            Self::CycleDetected => "cycle_detected",
            Self::OrphanReference => "orphan_reference",
            Self::PredecessorOnParent => "predecessor_on_parent",
        };
        write!(f, "{}", name)
    }
}

/// One advisory finding against one item.
///
/// Violations are reported to the (excluded) UI layer, which surfaces them
/// next to the affected row; the item's stored dates stay untouched until
/// the user corrects the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleViolation {
    /// Item the finding is attached to
    pub item_id: String,
    /// Finding category
    pub kind: ViolationKind,
    /// Human-readable detail
    pub message: String,
}

impl ScheduleViolation {
    pub fn new(item_id: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            kind,
            message: message.into(),
        }
    }

    /// End-before-start finding with both dates in the message
    pub fn end_before_start(item_id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            item_id,
            ViolationKind::EndBeforeStart,
            format!("resolved end {} precedes start {}", end, start),
        )
    }

    /// Orphaned reference finding
    pub fn orphan(item_id: impl Into<String>, missing_id: &str) -> Self {
        Self::new(
            item_id,
            ViolationKind::OrphanReference,
            format!("referenced item '{}' is not in the snapshot", missing_id),
        )
    }
}

impl std::fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.item_id, self.kind, self.message)
    }
}

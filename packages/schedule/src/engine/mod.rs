//! Scheduling Engine
//!
//! Pure, synchronous computations over an in-memory [`WbsTree`] snapshot:
//!
//! - [`calendar`] - business-day date arithmetic (weekends excluded)
//! - [`tree`] - snapshot index with declared sibling order
//! - [`dependency`] - FS/SS/FF/SF constraint resolution, cycle detection,
//!   whole-tree validation
//! - [`critical_path`] - longest cumulative-duration dependency chain
//! - [`rollup`] - derived parent dates, duration, and progress
//! - [`renumber`] - hierarchical `wbs_id` reassignment
//!
//! Nothing here mutates items or talks to a store; callers apply engine
//! output through [`crate::operations`].

pub mod calendar;
pub mod critical_path;
pub mod dependency;
pub mod error;
pub mod renumber;
pub mod rollup;
pub mod tree;

pub use error::{CalendarError, ScheduleError, ScheduleViolation, ViolationKind};
pub use tree::WbsTree;

use crate::models::WbsItem;

/// Business-day span an item occupies: the inclusive count between its dates
/// when both are set, otherwise its stored duration.
pub(crate) fn effective_duration(item: &WbsItem) -> Option<i64> {
    match (item.start_date, item.end_date) {
        (Some(start), Some(end)) => calendar::business_days_between(start, end).ok(),
        _ => item.duration,
    }
}

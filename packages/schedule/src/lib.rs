//! Sitebuild WBS Scheduling Engine
//!
//! This crate provides the scheduling core for Sitebuild's Work Breakdown
//! Structure: a hierarchical task tree with dependency-constrained date
//! computation, critical-path analysis, parent rollup, and hierarchical
//! `wbs_id` renumbering.
//!
//! # Architecture
//!
//! - **Pure engine**: every computation in [`engine`] is a deterministic,
//!   synchronous function over an in-memory tree snapshot ([`WbsTree`]).
//!   Validation problems are collected and returned as data
//!   ([`ScheduleViolation`] lists), never thrown mid-computation.
//! - **Store seam**: persistence lives behind the async [`ItemStore`] trait.
//!   [`ScheduleOps`] wraps a store and applies engine output as a sequence of
//!   individual writes, ordered so that every intermediate state keeps the
//!   tree invariants (the store is never assumed to batch atomically).
//! - **Derived views stay derived**: rollup and critical path are recomputed
//!   from scratch on demand and never written back onto stored records.
//!
//! # Modules
//!
//! - [`models`] - Data structures (WbsItem, updates, status/dependency enums)
//! - [`engine`] - Calendar, tree, dependency, critical-path, rollup, renumber
//! - [`operations`] - ItemStore trait and the ScheduleOps integration wrapper

pub mod engine;
pub mod models;
pub mod operations;

// Re-export commonly used types
pub use engine::calendar::{add_business_days, business_days_between};
pub use engine::critical_path::compute_critical_path;
pub use engine::dependency::{
    check_new_predecessor, resolve_schedule, validate_schedule, ResolvedDates,
};
pub use engine::error::{CalendarError, ScheduleError, ScheduleViolation, ViolationKind};
pub use engine::renumber::{plan_sibling_shift, renumber, WbsIdChange};
pub use engine::rollup::{compute_rollup, RollupValues};
pub use engine::tree::WbsTree;
pub use models::{
    DependencyType, Predecessor, ValidationError, WbsItem, WbsItemUpdate, WbsStatus, MAX_LEVEL,
};
pub use operations::{ItemStore, OperationError, ScheduleOps, StoreError, UpdateOptions};

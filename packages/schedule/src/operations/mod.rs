//! Store Integration Layer
//!
//! The engine computes; this module applies. [`ScheduleOps`] wraps an
//! [`ItemStore`] implementation (REST backend, local array, database) and
//! turns engine output into sequences of individual writes, ordered so the
//! tree invariants hold at every intermediate step. The store is never
//! assumed to commit multi-row batches atomically.
//!
//! Bulk structural passes write with `skip_auto_schedule = true` so a store
//! with its own reactive hooks does not cascade a re-schedule on every
//! intermediate row; the deferred [`ScheduleOps::reschedule_all`] pass runs
//! once at the end instead.

mod schedule_ops;
mod store;

pub use schedule_ops::{OperationError, ScheduleOps};
pub use store::{ItemStore, StoreError, UpdateOptions};

#[cfg(test)]
pub(crate) use store::MemoryStore;

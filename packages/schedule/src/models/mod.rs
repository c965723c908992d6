//! Data Models
//!
//! This module contains the core data structures for the WBS scheduling
//! engine:
//!
//! - `WbsItem` - one node of the project's work breakdown structure
//! - `WbsItemUpdate` - partial update applied through the store callback
//! - `Predecessor` / `DependencyType` - typed dependency links between leaves
//! - `WbsStatus` - item lifecycle status
//!
//! Items serialize with camelCase field names for the external UI and
//! persistence layers; the engine itself only ever works on deserialized
//! snapshots.

mod item;

pub use item::{
    DependencyType, Predecessor, ValidationError, WbsItem, WbsItemUpdate, WbsStatus, MAX_LEVEL,
};

//! WBS Item Data Structures
//!
//! This module defines the `WbsItem` struct and related types for the
//! hierarchical work breakdown structure.
//!
//! # Architecture
//!
//! - **Snapshot model**: items are plain data; the engine consumes a full
//!   snapshot and never holds references back into a store
//! - **Canonical predecessors**: dependencies are always the tagged
//!   `{targetId, type, lag}` form; row-number projections are a display
//!   concern owned by the UI layer
//! - **Dotted identifiers**: `wbs_id` encodes the item's position among its
//!   siblings at every ancestor level (`"2.3.1"`); root-level stage nodes
//!   carry a literal `".0"` suffix (`"3.0"`)
//!
//! # Examples
//!
//! ```rust
//! use sitebuild_schedule::models::{WbsItem, WbsStatus};
//!
//! let phase = WbsItem::new("Foundations".to_string(), None, 0);
//! assert!(phase.parent_id.is_none());
//! assert_eq!(phase.status, WbsStatus::NotStarted);
//!
//! let component = WbsItem::new("Excavation".to_string(), Some(phase.id.clone()), 1);
//! assert_eq!(component.level, 1);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Deepest level in the breakdown: 0 = phase, 1 = component, 2 = element,
/// 3 = task-equivalent leaf.
pub const MAX_LEVEL: u8 = 3;

/// Default for `is_expanded` during serde deserialization (expanded)
fn default_expanded() -> bool {
    true
}

/// Validation errors for WbsItem records
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Invalid predecessor reference: {0}")]
    InvalidPredecessor(String),

    #[error("Progress must be 0-100, got {0}")]
    InvalidProgress(u8),

    #[error("Duration must be non-negative, got {0}")]
    InvalidDuration(i64),

    #[error("Level must be 0-{MAX_LEVEL}, got {0}")]
    InvalidLevel(u8),
}

/// Item lifecycle status
///
/// Maps to snake_case string values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WbsStatus {
    /// Work not yet started (default)
    #[default]
    NotStarted,
    /// Work currently underway
    InProgress,
    /// Work finished
    Completed,
    /// Work paused pending an external decision
    OnHold,
}

impl FromStr for WbsStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" | "NOT_STARTED" => Ok(Self::NotStarted),
            "in_progress" | "IN_PROGRESS" => Ok(Self::InProgress),
            "completed" | "COMPLETED" => Ok(Self::Completed),
            "on_hold" | "ON_HOLD" => Ok(Self::OnHold),
            _ => Err(format!("Invalid WBS status: {}", s)),
        }
    }
}

impl std::fmt::Display for WbsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::OnHold => write!(f, "on_hold"),
        }
    }
}

/// Dependency link type between a predecessor and a successor
///
/// Determines which endpoint of the successor the link constrains:
///
/// - `FS` (finish-to-start): successor starts one business day after the
///   predecessor finishes
/// - `SS` (start-to-start): successor starts when the predecessor starts
/// - `FF` (finish-to-finish): successor finishes when the predecessor finishes
/// - `SF` (start-to-finish): successor finishes when the predecessor starts
///
/// A signed lag in business days is applied on top of each rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Finish-to-start
    FS,
    /// Start-to-start
    SS,
    /// Finish-to-finish
    FF,
    /// Start-to-finish
    SF,
}

impl DependencyType {
    /// Whether this link type constrains the successor's start date
    pub fn constrains_start(self) -> bool {
        matches!(self, Self::FS | Self::SS)
    }

    /// Whether this link type constrains the successor's end date
    pub fn constrains_end(self) -> bool {
        matches!(self, Self::FF | Self::SF)
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FS" | "fs" => Ok(Self::FS),
            "SS" | "ss" => Ok(Self::SS),
            "FF" | "ff" => Ok(Self::FF),
            "SF" | "sf" => Ok(Self::SF),
            _ => Err(format!("Invalid dependency type: {}", s)),
        }
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FS => write!(f, "FS"),
            Self::SS => write!(f, "SS"),
            Self::FF => write!(f, "FF"),
            Self::SF => write!(f, "SF"),
        }
    }
}

/// A typed dependency on another item
///
/// Only leaf-level items carry predecessors; parents are schedule-derived
/// through rollup, never independently constrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predecessor {
    /// Id of the item this one depends on
    pub target_id: String,

    /// Link type (FS/SS/FF/SF)
    #[serde(rename = "type")]
    pub dep_type: DependencyType,

    /// Signed lag in business days applied on top of the link rule
    #[serde(default)]
    pub lag: i64,
}

impl Predecessor {
    /// Create a finish-to-start link with zero lag (the common case)
    pub fn finish_to_start(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            dep_type: DependencyType::FS,
            lag: 0,
        }
    }

    /// Create a link with an explicit type and lag
    pub fn new(target_id: impl Into<String>, dep_type: DependencyType, lag: i64) -> Self {
        Self {
            target_id: target_id.into(),
            dep_type,
            lag,
        }
    }
}

/// One node of the work breakdown structure.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4 for new items), stable for the item's
///   lifetime
/// - `parent_id`: Containing item, or `None` for root-level phases
/// - `wbs_id`: Dotted position identifier (`"1"`, `"1.2"`, `"1.2.3"`); kept
///   consistent by the renumbering engine after every structural change
/// - `level`: Tree depth; must always equal the number of ancestors
/// - `duration`: Business-day count, inclusive of both endpoints; whenever
///   both dates are set, `duration == business_days_between(start, end)`
/// - `predecessors`: Canonical `{targetId, type, lag}` dependency links
/// - `is_expanded`: UI-persisted outline state, irrelevant to scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WbsItem {
    /// Unique identifier (UUID v4 for new items)
    pub id: String,

    /// Containing item, or None for a root-level phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Dotted hierarchical position identifier
    pub wbs_id: String,

    /// Tree depth (0 = phase .. 3 = task-equivalent leaf)
    pub level: u8,

    /// Item title
    pub title: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: WbsStatus,

    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,

    /// Scheduled start date (unset until scheduled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Scheduled end date (unset until scheduled, or derived from duration)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Business-day duration, inclusive of both endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// Typed dependency links (leaf-level items only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predecessors: Vec<Predecessor>,

    /// Assignee handle, consumed by the external task-conversion bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    /// UI-persisted outline state; not a scheduling input
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl WbsItem {
    /// Create a new item with an auto-generated UUID and a provisional
    /// (empty) `wbs_id`.
    ///
    /// The `wbs_id` is assigned by the renumbering pass that must follow
    /// every structural mutation; until then the item is not part of a
    /// consistent tree.
    pub fn new(title: String, parent_id: Option<String>, level: u8) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id,
            wbs_id: String::new(),
            level,
            title,
            description: String::new(),
            status: WbsStatus::NotStarted,
            progress: 0,
            start_date: None,
            end_date: None,
            duration: None,
            predecessors: Vec::new(),
            assigned_to: None,
            is_expanded: true,
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a new item with a caller-specified id (snapshot fixtures,
    /// import paths).
    pub fn new_with_id(
        id: String,
        title: String,
        parent_id: Option<String>,
        level: u8,
    ) -> Self {
        let mut item = Self::new(title, parent_id, level);
        item.id = id;
        item
    }

    /// Whether this is a root-level stage node (`"3.0"`-style identifier)
    pub fn is_stage(&self) -> bool {
        self.level == 0 && self.wbs_id.ends_with(".0")
    }

    /// Validate the record in isolation (structural cross-item checks live
    /// in the engine).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - the item references itself as parent or predecessor
    /// - `progress` exceeds 100
    /// - `duration` is negative
    /// - `level` exceeds [`MAX_LEVEL`]
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(ValidationError::InvalidParent(
                "Item cannot be its own parent".to_string(),
            ));
        }

        if self.predecessors.iter().any(|p| p.target_id == self.id) {
            return Err(ValidationError::InvalidPredecessor(
                "Item cannot depend on itself".to_string(),
            ));
        }

        if self.progress > 100 {
            return Err(ValidationError::InvalidProgress(self.progress));
        }

        if let Some(d) = self.duration {
            if d < 0 {
                return Err(ValidationError::InvalidDuration(d));
            }
        }

        if self.level > MAX_LEVEL {
            return Err(ValidationError::InvalidLevel(self.level));
        }

        Ok(())
    }

    /// Apply a partial update in place, bumping the modification timestamp.
    ///
    /// Mirrors what the persistence layer does to its stored record; the
    /// in-memory store used by tests relies on this.
    pub fn apply_update(&mut self, update: &WbsItemUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(wbs_id) = &update.wbs_id {
            self.wbs_id = wbs_id.clone();
        }
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(parent_id) = &update.parent_id {
            self.parent_id = parent_id.clone();
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(predecessors) = &update.predecessors {
            self.predecessors = predecessors.clone();
        }
        if let Some(assigned_to) = &update.assigned_to {
            self.assigned_to = assigned_to.clone();
        }
        if let Some(is_expanded) = update.is_expanded {
            self.is_expanded = is_expanded;
        }
        self.modified_at = Utc::now();
    }
}

/// Custom deserializer for optional fields that accepts both plain values and
/// nulls, mapping them to the double-Option pattern:
/// missing field → None (don't update), null → Some(None), value → Some(Some(v))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial item update applied through the store callback.
///
/// All fields are optional to support partial updates. Nullable fields use
/// the double-`Option` pattern:
///
/// - `None`: don't change this field
/// - `Some(None)`: set the field to NULL (clear it)
/// - `Some(Some(value))`: set the field to the value
///
/// # Examples
///
/// ```rust
/// use sitebuild_schedule::models::WbsItemUpdate;
///
/// // Renumbering pass: touch only the identifier
/// let update = WbsItemUpdate::new().with_wbs_id("2.3".to_string());
/// assert!(!update.is_empty());
///
/// // Clear both schedule dates
/// let update = WbsItemUpdate {
///     start_date: Some(None),
///     end_date: Some(None),
///     ..Default::default()
/// };
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WbsItemUpdate {
    /// Update the title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Update the description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Update the lifecycle status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WbsStatus>,

    /// Update percent complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    /// Update the dotted position identifier (renumbering passes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wbs_id: Option<String>,

    /// Update the tree depth (indent/outdent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    /// Update the parent reference (double-Option: `Some(None)` moves the
    /// item to the root level)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    /// Update the start date (double-Option: `Some(None)` unschedules)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub start_date: Option<Option<NaiveDate>>,

    /// Update the end date (double-Option: `Some(None)` unschedules)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub end_date: Option<Option<NaiveDate>>,

    /// Update the business-day duration
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub duration: Option<Option<i64>>,

    /// Replace the predecessor list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessors: Option<Vec<Predecessor>>,

    /// Update the assignee (double-Option)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub assigned_to: Option<Option<String>>,

    /// Update the persisted outline state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
}

impl WbsItemUpdate {
    /// Create a new empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a new `wbs_id`
    pub fn with_wbs_id(mut self, wbs_id: String) -> Self {
        self.wbs_id = Some(wbs_id);
        self
    }

    /// Set a new level
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Set a new parent reference
    pub fn with_parent_id(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set both schedule dates
    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Option<i64>) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Replace the predecessor list
    pub fn with_predecessors(mut self, predecessors: Vec<Predecessor>) -> Self {
        self.predecessors = Some(predecessors);
        self
    }

    /// Check whether the update contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.progress.is_none()
            && self.wbs_id.is_none()
            && self.level.is_none()
            && self.parent_id.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.duration.is_none()
            && self.predecessors.is_none()
            && self.assigned_to.is_none()
            && self.is_expanded.is_none()
    }
}

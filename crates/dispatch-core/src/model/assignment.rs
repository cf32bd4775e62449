// ── Persisted assignment rows and change notifications ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::ids::{OfficerId, SlotName};

/// One row of the persisted assignment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub slot_name: SlotName,
    pub officer_id: OfficerId,
}

impl AssignmentRecord {
    pub fn new(slot_name: impl Into<SlotName>, officer_id: impl Into<OfficerId>) -> Self {
        Self {
            slot_name: slot_name.into(),
            officer_id: officer_id.into(),
        }
    }
}

/// Kind of row mutation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification from the persistence layer's feed.
///
/// The reconciler never reads the row contents; any notification
/// triggers a full refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentChange {
    pub kind: ChangeKind,
    pub officer_id: OfficerId,
    pub slot_name: Option<SlotName>,
    pub at: DateTime<Utc>,
}

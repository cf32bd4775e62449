// ── Officer domain types ──
//
// Officers are owned by the roster (CRUD) collaborator. The engine only
// reads `id` and `name` for labels and the drag payload.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::OfficerId;
use crate::error::CoreError;

/// Duty status as reported by the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OfficerStatus {
    Available,
    Busy,
    OffDuty,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OfficerStatus {
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// An officer as listed by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub id: OfficerId,
    pub name: String,
    #[serde(default)]
    pub status: OfficerStatus,
}

impl Officer {
    pub fn new(id: impl Into<OfficerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: OfficerStatus::Available,
        }
    }

    /// Payload carried by a drag that starts on this officer.
    pub fn drag_payload(&self) -> DragPayload {
        DragPayload {
            officer_id: self.id.clone(),
            officer_name: self.name.clone(),
        }
    }
}

/// Cross-boundary data carried by a drag operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub officer_id: OfficerId,
    pub officer_name: String,
}

impl DragPayload {
    /// Encode as native drag data (JSON).
    pub fn to_drag_data(&self) -> String {
        // Two string fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode native drag data. Plain, non-JSON text is accepted as a bare
    /// officer identifier.
    pub fn from_drag_data(data: &str) -> Option<Self> {
        let data = data.trim();
        if data.is_empty() {
            return None;
        }
        serde_json::from_str(data).ok().or_else(|| {
            Some(Self {
                officer_id: OfficerId::new(data),
                officer_name: String::new(),
            })
        })
    }
}

/// Ordered officer list, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    officers: IndexMap<OfficerId, Arc<Officer>>,
}

impl Roster {
    pub fn new(officers: impl IntoIterator<Item = Officer>) -> Self {
        let officers = officers
            .into_iter()
            .map(|o| (o.id.clone(), Arc::new(o)))
            .collect();
        Self { officers }
    }

    /// Parse a roster from a JSON array of `{id, name, status}` objects.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let officers: Vec<Officer> =
            serde_json::from_str(json).map_err(|e| CoreError::Config {
                message: format!("invalid roster: {e}"),
            })?;
        Ok(Self::new(officers))
    }

    pub fn get(&self, id: &OfficerId) -> Option<&Arc<Officer>> {
        self.officers.get(id)
    }

    /// Look up an officer, failing with [`CoreError::UnknownOfficer`].
    pub fn require(&self, id: &OfficerId) -> Result<&Arc<Officer>, CoreError> {
        self.get(id).ok_or_else(|| CoreError::UnknownOfficer {
            officer: id.to_string(),
        })
    }

    /// Display label for an officer id, falling back to the raw id.
    pub fn label(&self, id: &OfficerId) -> String {
        self.get(id)
            .map_or_else(|| id.to_string(), |o| o.name.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Officer>> {
        self.officers.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &OfficerId> {
        self.officers.keys()
    }

    pub fn len(&self) -> usize {
        self.officers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.officers.is_empty()
    }
}

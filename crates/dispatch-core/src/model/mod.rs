// ── Domain model ──

pub mod assignment;
pub mod ids;
pub mod officer;

pub use assignment::{AssignmentChange, AssignmentRecord, ChangeKind};
pub use ids::{OfficerId, SlotName, ZoneId};
pub use officer::{DragPayload, Officer, OfficerStatus, Roster};

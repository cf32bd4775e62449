// ── Assignment store ──

mod assignment_store;
mod snapshot;

pub use assignment_store::{AssignmentStore, ListenerId};
pub use snapshot::AssignmentSnapshot;

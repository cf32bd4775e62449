// dispatch-core: Drag-and-assign interaction engine plus the reactive
// assignment store that sits between a persistence backend and the board UI.

pub mod bus;
pub mod config;
pub mod drag;
pub mod error;
pub mod model;
pub mod persistence;
pub mod reconciler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{DragSignal, EventBus, Subscription};
pub use config::BoardConfig;
pub use drag::{
    DragContext, DragGuard, DragOutcome, DragSession, DragSource, DragState, DropEvent, DropZone,
    GestureConfig, Haptics, InputModality, NoHaptics, Point, Rect, ZoneRegistry,
};
pub use error::CoreError;
pub use persistence::{
    AssignmentBackend, ChangeFeed, FeedEvent, MemoryBackend, PersistenceError,
};
pub use reconciler::{FeedStatus, Reconciler};
pub use store::{AssignmentSnapshot, AssignmentStore, ListenerId};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AssignmentChange, AssignmentRecord, ChangeKind, DragPayload, Officer, OfficerId,
    OfficerStatus, Roster, SlotName, ZoneId,
};

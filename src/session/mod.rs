// ABOUTME: Session execution state and its persistence
// ABOUTME: Exports the session model, state stores and lifecycle operations

pub mod error;
pub mod lifecycle;
pub mod state;
pub mod store;

pub use error::{SessionError, StoreError};
pub use lifecycle::{accept_plan, attach_plan, create_session, load_session, PLAN_ACCEPTED_MESSAGE};
pub use state::SessionState;
pub use store::{FileStateStore, MemoryStateStore, StateStore};

//! Versioned snapshot store for plat sites.
//!
//! A [`GeometryStore`] keeps one linear snapshot chain per editing session:
//! `current.json` holds the latest site, retired versions support one-step
//! undo, and a bounded retention window prunes the rest. Mutation
//! operations (add/update/recalculate/delete) are methods on the store and
//! all follow the load → mutate → commit cycle.

pub mod engine;
pub mod error;
pub mod ops;
pub mod session;
pub mod snapshot;

pub use engine::GeometryStore;
pub use error::{Result, SessionError, StoreError};
pub use ops::{
    NewPoint, NewSegment, ObjectKind, PointUpdate, Recalculation, SegmentUpdate, SitePayload,
};
pub use session::{LocalSessions, SessionId, SessionResolver};
pub use snapshot::RETAIN_LIMIT;

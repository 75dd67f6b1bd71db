//! Core business logic for the compliance portal.
//!
//! The heart of the crate is the [`lifecycle`] module: a pure state machine
//! that validates status transitions and computes the field patch each one
//! implies. Services wrap it with persistence, blob storage and a clock.

pub mod clock;
pub mod export;
pub mod filter;
pub mod lifecycle;
pub mod model;
pub mod services;
pub mod stats;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use export::{Export, ExportFormat};
pub use filter::{ViolationFilter, ViolationOrder};
pub use lifecycle::{
    FieldUpdate, Transition, TransitionError, TransitionEvent, TransitionPayload,
    ViolationPatch, request_transition,
};
pub use model::{Actor, Category, DEPARTMENTS, Priority, Role, Violation, ViolationStatus};
pub use services::*;
pub use stats::ViolationStats;
pub use store::{
    AccountStore, MemoryAccountStore, MemoryViolationStore, ViolationQuery, ViolationStore,
};

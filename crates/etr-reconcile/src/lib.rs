//! etr-reconcile
//!
//! Registry reconciliation engine.
//!
//! Architectural decisions:
//! - One aggregate per TIN; the store transaction spans read-modify-write
//! - No local company => create from the registry
//! - Every license renewal-confirmed => answer locally, no remote calls
//! - Otherwise => refresh from the registry, merging licenses in place
//! - A failed detail lookup degrades to basic registration info
//! - Licenses are never removed by a refresh
//!
//! No retries, no internal parallelism. Callers own timeouts.

pub mod dates;
mod engine;
mod error;
pub mod events;
mod mapping;
mod model;
pub mod store;
mod types;

pub use engine::{
    ReconcileEngine, MSG_CREATED, MSG_CREATED_DEGRADED, MSG_FAST_PATH, MSG_REFRESHED,
    MSG_REFRESHED_STALE,
};
pub use error::{FailureKind, ReconciliationError};
pub use events::{ReconcileEvent, ReconcileObserver, TracingObserver};
pub use mapping::{group_description, synthesize_guid, TRADE_NAME_PLACEHOLDER};
pub use model::{Address, Associate, Company, License, SubGroup, Tin};
pub use store::{AggregateStore, AggregateTxn, MemoryStore, StoreError};
pub use types::{
    Clock, DetailSource, FixedClock, ReconciliationSummary, SyncBranch, SystemClock,
};

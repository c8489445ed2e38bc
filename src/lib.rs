//! Debounced, storage-backed state cells
//!
//! This crate keeps a live in-memory value in sync with an external key-value
//! store without writing on every change. A [`StateCell`] reads its initial
//! value from the store at creation, exposes synchronous reads and writes,
//! notifies subscribers on every change, and persists the value once it has
//! been stable for a quiescence window (default: 500ms). Rapid bursts of
//! changes collapse into a single write of the final value.
//!
//! Store access is best-effort: read and write faults are logged and the cell
//! behaves as if storage were absent. The store itself is an injected
//! [`Storage`] implementation; [`SledStorage`] persists to an embedded sled
//! database and [`MemoryStorage`] backs tests and ephemeral state.
//!
//! The standalone [`Debouncer`] is also exported for callers that only need
//! the settling behavior without persistence.

pub mod cell;
pub mod debounce;
pub mod storage;

pub use cell::{StateCell, SubscriptionId, DEFAULT_DEBOUNCE_MS};
pub use debounce::Debouncer;
pub use storage::{MemoryStorage, SledStorage, Storage, StorageError};

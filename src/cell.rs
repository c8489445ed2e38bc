//! Storage-backed state cells with debounced write-back
//!
//! A [`StateCell`] holds a live value bound to a storage key. The stored
//! value is read once, at creation; after that the cell exposes synchronous
//! reads and writes, notifies subscribers on every change, and persists the
//! value with a configurable debounce window (default: 500ms) to minimize
//! store I/O.
//!
//! # Write-back strategy
//!
//! 1. `set`/`update` replace the live value synchronously and feed the new
//!    value into a [`Debouncer`].
//!
//! 2. Changes arriving inside the debounce window supersede each other
//!    (last-write-wins); only the final settled value of a burst reaches the
//!    store.
//!
//! 3. A single writer task serializes settled values to JSON and writes them
//!    through the store on a blocking thread, so writes for one cell are
//!    strictly ordered and never concurrent.
//!
//! This approach ensures:
//! - High-frequency updates don't cause excessive writes
//! - The most recent value is always the one persisted
//! - The caller is never blocked on, or coupled to, store I/O
//!
//! Store faults never reach the caller. A failed or malformed read at
//! creation falls back to the supplied initial value; a failed write is
//! logged and dropped while the live value stays put.
//!
//! # Example
//!
//! ```ignore
//! use statecell::{MemoryStorage, StateCell};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let theme = StateCell::new(storage, "theme", "light".to_string());
//!
//! theme.set("dark".to_string());          // visible immediately
//! assert_eq!(theme.get(), "dark");        // persisted after 500ms idle
//! ```

use crate::debounce::Debouncer;
use crate::storage::Storage;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Default write-back debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Handle identifying a registered change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerSet<T> {
    next_id: u64,
    listeners: HashMap<u64, Listener<T>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
        }
    }
}

/// Live value bound to a storage key, persisted after a quiescence window
///
/// Cheap to clone; clones share the same live value, listeners, and writer.
/// Dropping the last clone cancels any pending write and stops the
/// background tasks.
pub struct StateCell<T> {
    key: String,
    value: Arc<RwLock<T>>,
    listeners: Arc<RwLock<ListenerSet<T>>>,
    debounce: Debouncer<T>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            listeners: self.listeners.clone(),
            debounce: self.debounce.clone(),
        }
    }
}

impl<T> StateCell<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cell bound to `key` with the default 500ms debounce window.
    ///
    /// Reads the stored value for `key` from `storage`; if the entry is
    /// absent, unreadable, or malformed, `initial` is used instead. Store
    /// access is best-effort and this never fails.
    ///
    /// Must be called from within a Tokio runtime; the write-back tasks are
    /// spawned on the current runtime.
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>, initial: T) -> Self {
        Self::with_debounce(
            storage,
            key,
            initial,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        )
    }

    /// Create a cell with an explicit debounce window
    pub fn with_debounce(
        storage: Arc<dyn Storage>,
        key: impl Into<String>,
        initial: T,
        window: Duration,
    ) -> Self {
        let key = key.into();
        let value = load_initial(storage.as_ref(), &key, initial);

        let (debounce, settled_rx) = Debouncer::spawn(window);
        tokio::spawn(write_back(storage, key.clone(), settled_rx));

        // The loaded value takes the same path as any later change, so a
        // fresh key gets its default persisted after one quiet window.
        debounce.update(value.clone());

        Self {
            key,
            value: Arc::new(RwLock::new(value)),
            listeners: Arc::new(RwLock::new(ListenerSet::default())),
            debounce,
        }
    }

    /// Storage key this cell is bound to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Clone of the current live value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Replace the live value.
    ///
    /// The change is visible to [`get`](Self::get) immediately; the store
    /// write lands once the debounce window passes with no further changes.
    pub fn set(&self, value: T) {
        self.update(|_| value);
    }

    /// Replace the live value through a function of the previous value.
    ///
    /// The closure runs under the value lock, so it always observes the
    /// latest value even when updates are stacked back to back.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let mut guard = self.value.write();
            let next = f(&guard);
            *guard = next.clone();
            next
        };

        self.notify(&next);
        self.debounce.update(next);
    }

    /// Register a listener invoked with every new live value.
    ///
    /// Listeners run synchronously from `set`/`update`, after the value has
    /// been replaced. Returns an id for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut set = self.listeners.write();
        let id = set.next_id;
        set.next_id += 1;
        set.listeners.insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    /// Remove a previously registered listener
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().listeners.remove(&id.0);
    }

    fn notify(&self, value: &T) {
        // Listeners may re-enter subscribe/unsubscribe, so call them outside
        // the lock.
        let listeners: Vec<Listener<T>> = self.listeners.read().listeners.values().cloned().collect();
        for listener in listeners {
            listener(value);
        }
    }
}

/// Read and decode the stored value for `key`, falling back to `initial`
fn load_initial<T: DeserializeOwned>(storage: &dyn Storage, key: &str, initial: T) -> T {
    match storage.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Loaded stored value for '{}'", key);
                value
            }
            Err(e) => {
                warn!("Stored value for '{}' is malformed, using initial value: {}", key, e);
                initial
            }
        },
        Ok(None) => {
            debug!("No stored value for '{}', using initial value", key);
            initial
        }
        Err(e) => {
            error!("Failed to read '{}' from storage, using initial value: {}", key, e);
            initial
        }
    }
}

/// Writer loop: consume settled values and push them through the store
///
/// Runs until the settled channel closes (all cell handles dropped). Each
/// write goes through `spawn_blocking` so a slow store never stalls the
/// runtime, and writes stay strictly sequential per cell.
async fn write_back<T>(
    storage: Arc<dyn Storage>,
    key: String,
    mut settled_rx: mpsc::UnboundedReceiver<T>,
) where
    T: Serialize + Send + 'static,
{
    let mut write_count: u64 = 0;

    while let Some(value) = settled_rx.recv().await {
        let raw = match serde_json::to_string(&value) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to serialize value for '{}': {}", key, e);
                continue;
            }
        };

        let storage = storage.clone();
        let write_key = key.clone();
        let result = tokio::task::spawn_blocking(move || storage.set(&write_key, &raw)).await;

        match result {
            Ok(Ok(())) => {
                write_count += 1;
                trace!("Persisted '{}' (write #{})", key, write_count);
            }
            Ok(Err(e)) => {
                // The failed value is dropped; the next settle supplies
                // fresh data.
                error!("Failed to persist '{}': {}", key, e);
            }
            Err(e) => {
                error!("Storage write task panicked: {}", e);
            }
        }
    }

    trace!("Write-back for '{}' stopped ({} writes)", key, write_count);
}

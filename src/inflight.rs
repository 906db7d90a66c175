//! In-flight request registry.
//!
//! Collapses concurrent fetches for the same key into one. The first caller
//! becomes the leader and owns the fetch; later callers subscribe to the
//! leader's outcome through a `watch` channel.
//!
//! The registry entry is removed when the leader is dropped, whether it
//! published an outcome or not, so a failed or cancelled fetch never blocks
//! later callers.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

type Slot<T> = Option<T>;

/// Receiving side of a pending fetch.
pub type FlightReceiver<T> = watch::Receiver<Slot<T>>;

/// Outcome of `InFlightRegistry::join`.
pub enum Flight<T> {
    /// No fetch was pending; the caller must run it and complete the leader
    Leader(FlightLeader<T>),
    /// A fetch is already pending; wait on the receiver
    Follower(FlightReceiver<T>),
}

/// At most one pending fetch per key.
pub struct InFlightRegistry<T> {
    flights: Arc<DashMap<String, FlightReceiver<T>>>,
}

impl<T> Clone for InFlightRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<T> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Clone> InFlightRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the pending fetch for `key`, or registers a new one.
    ///
    /// Check-and-register is atomic per key.
    pub fn join(&self, key: &str) -> Flight<T> {
        match self.flights.entry(key.to_string()) {
            Entry::Occupied(entry) => Flight::Follower(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                entry.insert(receiver);
                debug!(key, "Registered in-flight request");
                Flight::Leader(FlightLeader {
                    key: key.to_string(),
                    sender,
                    flights: Arc::clone(&self.flights),
                })
            }
        }
    }

    /// Number of pending fetches.
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }

    /// Waits for the leader's outcome.
    ///
    /// Returns `None` if the leader went away without publishing one.
    pub async fn wait(mut receiver: FlightReceiver<T>) -> Option<T> {
        match receiver.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        }
    }
}

/// Owner of a pending fetch.
pub struct FlightLeader<T> {
    key: String,
    sender: watch::Sender<Slot<T>>,
    flights: Arc<DashMap<String, FlightReceiver<T>>>,
}

impl<T> FlightLeader<T> {
    pub fn subscribe(&self) -> FlightReceiver<T> {
        self.sender.subscribe()
    }

    /// Publishes the outcome to every waiter and unregisters the key.
    pub fn complete(self, outcome: T) {
        self.sender.send_replace(Some(outcome));
    }
}

impl<T> Drop for FlightLeader<T> {
    fn drop(&mut self) {
        self.flights.remove(&self.key);
        debug!(key = %self.key, "Cleared in-flight request");
    }
}

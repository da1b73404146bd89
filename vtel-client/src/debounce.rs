//! Per-key trailing-edge debouncing
//!
//! Coalesces bursts of identical calls into one invocation. Each key is
//! either idle or has exactly one scheduled invocation:
//!
//! ```text
//! IDLE --call--> SCHEDULED --delay elapses--> run thunk --> IDLE
//!                  |    ^
//!                  +----+  call with same key: replace thunk, restart timer
//! ```
//!
//! Only the most recent thunk for a key runs. Superseded thunks are dropped
//! without being called. Every caller coalesced into a window receives a
//! clone of the outcome of the thunk that finally ran.
//!
//! The registry is owned by a [`Debouncer`] value. Dropping it cancels every
//! scheduled invocation; pending callers then see [`DebounceError::Dropped`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default debounce window
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

type BoxFuture<O> = Pin<Box<dyn Future<Output = O> + Send>>;
type Thunk<O> = Box<dyn FnOnce() -> BoxFuture<O> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DebounceError {
    /// Scheduled invocation was cancelled before producing a result
    #[error("debounced invocation dropped before completion")]
    Dropped,
}

/// Scheduled invocation for one key
struct Entry<O> {
    generation: u64,
    thunk: Thunk<O>,
    waiters: Vec<oneshot::Sender<O>>,
    timer: JoinHandle<()>,
}

struct Registry<O> {
    entries: HashMap<String, Entry<O>>,
    next_generation: u64,
}

fn lock<O>(registry: &Mutex<Registry<O>>) -> MutexGuard<'_, Registry<O>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trailing-edge debouncer keyed by string
pub struct Debouncer<O> {
    delay: Duration,
    registry: Arc<Mutex<Registry<O>>>,
}

impl<O> Debouncer<O>
where
    O: Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            registry: Arc::new(Mutex::new(Registry {
                entries: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of keys with a scheduled invocation
    pub fn pending(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_scheduled(&self, key: &str) -> bool {
        lock(&self.registry).entries.contains_key(key)
    }

    /// Schedule `thunk` under `key` and wait for the window's outcome
    ///
    /// Replaces any thunk already scheduled under `key` and restarts its
    /// timer. Resolves once the delay has elapsed without a newer call for
    /// the same key and the latest thunk has completed.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn call<F, Fut>(&self, key: impl Into<String>, thunk: F) -> Result<O, DebounceError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let receiver = self.schedule(key.into(), thunk);
        receiver.await.map_err(|_| DebounceError::Dropped)
    }

    fn schedule<F, Fut>(&self, key: String, thunk: F) -> oneshot::Receiver<O>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let thunk: Thunk<O> = Box::new(move || Box::pin(thunk()));

        let mut registry = lock(&self.registry);
        registry.next_generation += 1;
        let generation = registry.next_generation;

        let timer = tokio::spawn(fire(
            Arc::clone(&self.registry),
            key.clone(),
            generation,
            self.delay,
        ));

        match registry.entries.get_mut(&key) {
            Some(entry) => {
                trace!(key = %key, "Debounce timer reset");
                entry.timer.abort();
                entry.generation = generation;
                entry.thunk = thunk;
                entry.waiters.push(sender);
                entry.timer = timer;
            }
            None => {
                trace!(key = %key, delay_ms = self.delay.as_millis() as u64, "Debounce scheduled");
                registry.entries.insert(
                    key,
                    Entry {
                        generation,
                        thunk,
                        waiters: vec![sender],
                        timer,
                    },
                );
            }
        }

        receiver
    }
}

impl<O> Default for Debouncer<O>
where
    O: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_DELAY)
    }
}

impl<O> Drop for Debouncer<O> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        for (_, entry) in registry.entries.drain() {
            entry.timer.abort();
        }
    }
}

/// Timer task: waits out the window, then runs the key's current thunk
///
/// A timer whose generation no longer matches the entry was superseded
/// and exits without doing anything.
async fn fire<O>(registry: Arc<Mutex<Registry<O>>>, key: String, generation: u64, delay: Duration)
where
    O: Clone + Send + 'static,
{
    tokio::time::sleep(delay).await;

    let entry = {
        let mut registry = lock(&registry);
        let is_current = registry
            .entries
            .get(&key)
            .is_some_and(|entry| entry.generation == generation);
        if !is_current {
            return;
        }
        match registry.entries.remove(&key) {
            Some(entry) => entry,
            None => return,
        }
    };

    trace!(key = %key, waiters = entry.waiters.len(), "Debounce fired");

    let output = (entry.thunk)().await;
    for waiter in entry.waiters {
        // Receiver gone means the caller stopped waiting
        let _ = waiter.send(output.clone());
    }
}

//! Per-key coalescing of in-flight computations.
//!
//! When several threads miss on the same key at once, only the first runs
//! the loader; the rest block until it finishes and observe the same
//! outcome. A call handle exists in the table strictly between the first
//! caller inserting it and the loader returning, so calls that arrive
//! after completion run the closure again. The coalescer itself caches
//! nothing and never retries.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;

/// One in-flight computation: a barrier plus its eventual outcome.
///
/// The leader publishes the outcome under `result` and wakes `ready`;
/// nothing mutates the slot afterwards, so waiters read it freely.
struct Call<T> {
    result: Mutex<Option<Result<T>>>,
    ready: Condvar,
}

/// Collapses concurrent calls for the same key into one closure run.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    /// Creates an empty coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` under `key`, or joins the in-flight run for `key`.
    ///
    /// The closure runs at most once per key per in-flight window, outside
    /// every lock this type holds. All callers of the same window return
    /// the same `Result`; errors are forwarded, not retried.
    pub fn run<F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(key) {
                let call = Arc::clone(call);
                drop(calls);
                return Self::wait(&call);
            }
            let call = Arc::new(Call {
                result: Mutex::new(None),
                ready: Condvar::new(),
            });
            calls.insert(key.to_string(), Arc::clone(&call));
            call
        };

        let outcome = f();
        {
            let mut slot = call.result.lock();
            *slot = Some(outcome.clone());
        }
        call.ready.notify_all();
        self.calls.lock().remove(key);
        outcome
    }

    /// Blocks until the leader publishes, then returns a copy of the
    /// outcome.
    fn wait(call: &Call<T>) -> Result<T> {
        let mut result = call.result.lock();
        loop {
            if let Some(outcome) = result.as_ref() {
                return outcome.clone();
            }
            call.ready.wait(&mut result);
        }
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

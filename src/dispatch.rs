//! Background task dispatcher.
//!
//! Runs closures on short-lived named threads with optional per-key mutual
//! exclusion. With `exclusive` set, at most one task per key runs at a
//! time; later calls wait their turn. `max_waiting` bounds how many calls
//! may queue behind a key:
//!
//! - `None`: unbounded queue
//! - `Some(0)`: drop the call if the key is running or already has a queued call
//! - `Some(n)`: drop the call if `n` calls are already queued
//!
//! Admission is decided on the caller's thread, so the answer is
//! immediate and deterministic. Task errors are logged and handed back
//! through the join handle; they never reach the caller otherwise.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

/// How calls for one key are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub exclusive: bool,
    pub max_waiting: Option<usize>,
}

impl DispatchOptions {
    /// No exclusion; every call gets its own thread immediately.
    #[must_use]
    pub const fn concurrent() -> Self {
        Self {
            exclusive: false,
            max_waiting: None,
        }
    }

    /// One at a time per key, unbounded queue.
    #[must_use]
    pub const fn exclusive() -> Self {
        Self {
            exclusive: true,
            max_waiting: None,
        }
    }

    /// One at a time per key, at most `max_waiting` queued.
    #[must_use]
    pub const fn bounded(max_waiting: usize) -> Self {
        Self {
            exclusive: true,
            max_waiting: Some(max_waiting),
        }
    }
}

/// Result of [`Dispatcher::spawn`].
#[derive(Debug)]
pub enum Dispatched<T, E> {
    /// The task was admitted and will run.
    Started(JoinHandle<Result<T, E>>),
    /// The task was dropped by the queue bound.
    Dropped,
}

impl<T, E> Dispatched<T, E> {
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }

    /// The join handle, if the task was admitted.
    #[must_use]
    pub fn into_handle(self) -> Option<JoinHandle<Result<T, E>>> {
        match self {
            Self::Started(handle) => Some(handle),
            Self::Dropped => None,
        }
    }
}

#[derive(Debug, Default)]
struct KeyState {
    running: bool,
    queued: usize,
}

#[derive(Debug)]
struct Inner<K> {
    keys: Mutex<HashMap<K, KeyState>>,
    idle: Condvar,
}

impl<K: Eq + Hash + Clone> Inner<K> {
    fn lock(&self) -> MutexGuard<'_, HashMap<K, KeyState>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `key` is idle, then mark it running.
    fn acquire(self: &Arc<Self>, key: K) -> KeyGuard<K> {
        let mut keys = self.lock();
        while keys.get(&key).is_some_and(|state| state.running) {
            keys = self.idle.wait(keys).unwrap_or_else(PoisonError::into_inner);
        }
        let state = keys.entry(key.clone()).or_default();
        state.running = true;
        state.queued = state.queued.saturating_sub(1);
        KeyGuard {
            inner: Arc::clone(self),
            key,
        }
    }

    /// Undo an admission whose thread never started.
    fn withdraw(&self, key: &K) {
        let mut keys = self.lock();
        if let Some(state) = keys.get_mut(key) {
            state.queued = state.queued.saturating_sub(1);
            if !state.running && state.queued == 0 {
                keys.remove(key);
            }
        }
    }
}

/// Releases a key when the task finishes, including by panic.
struct KeyGuard<K: Eq + Hash + Clone> {
    inner: Arc<Inner<K>>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        let mut keys = self.inner.lock();
        if let Some(state) = keys.get_mut(&self.key) {
            state.running = false;
            if state.queued == 0 {
                keys.remove(&self.key);
            }
        }
        drop(keys);
        self.inner.idle.notify_all();
    }
}

/// Spawns keyed background tasks.
#[derive(Debug)]
pub struct Dispatcher<K> {
    name: String,
    options: DispatchOptions,
    inner: Arc<Inner<K>>,
}

impl<K> Clone for Dispatcher<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            options: self.options,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Dispatcher<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    /// Create a dispatcher. `name` is used for worker thread names and logs.
    #[must_use]
    pub fn new(name: impl Into<String>, options: DispatchOptions) -> Self {
        Self {
            name: name.into(),
            options,
            inner: Arc::new(Inner {
                keys: Mutex::new(HashMap::new()),
                idle: Condvar::new(),
            }),
        }
    }

    #[must_use]
    pub const fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Whether a task for `key` is currently executing.
    #[must_use]
    pub fn is_running(&self, key: &K) -> bool {
        self.inner.lock().get(key).is_some_and(|state| state.running)
    }

    /// Number of admitted calls for `key` not yet executing.
    #[must_use]
    pub fn queued(&self, key: &K) -> usize {
        self.inner.lock().get(key).map_or(0, |state| state.queued)
    }

    /// Run `task` in the background under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned; the
    /// admission is rolled back in that case.
    pub fn spawn<T, E, F>(&self, key: K, task: F) -> io::Result<Dispatched<T, E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let name = self.name.clone();

        if !self.options.exclusive {
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || log_failure(&name, task()))?;
            return Ok(Dispatched::Started(handle));
        }

        if !self.admit(&key) {
            debug!(task = %self.name, ?key, "Dropping call, queue is full");
            return Ok(Dispatched::Dropped);
        }

        let inner = Arc::clone(&self.inner);
        let worker_key = key.clone();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let _guard = inner.acquire(worker_key);
            log_failure(&name, task())
        });

        match spawned {
            Ok(handle) => Ok(Dispatched::Started(handle)),
            Err(err) => {
                self.inner.withdraw(&key);
                Err(err)
            }
        }
    }

    fn admit(&self, key: &K) -> bool {
        let mut keys = self.inner.lock();
        let busy = keys
            .get(key)
            .is_some_and(|state| state.running || state.queued > 0);
        let queued = keys.get(key).map_or(0, |state| state.queued);

        let admitted = match self.options.max_waiting {
            None => true,
            Some(0) => !busy,
            Some(max) => queued < max,
        };
        if admitted {
            keys.entry(key.clone()).or_default().queued += 1;
        }
        admitted
    }
}

fn log_failure<T, E: Display>(name: &str, result: Result<T, E>) -> Result<T, E> {
    if let Err(err) = &result {
        error!(task = %name, error = %err, "Background task failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    type TaskResult = Result<(), String>;

    fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_exclusive_never_overlaps() {
        let dispatcher = Dispatcher::new("test-exclusive", DispatchOptions::exclusive());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                dispatcher
                    .spawn("key", move || -> TaskResult {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap()
                    .into_handle()
                    .unwrap()
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.is_running(&"key"));
    }

    #[test]
    fn test_max_waiting_zero_drops_while_busy() {
        let dispatcher = Dispatcher::new("test-debounce", DispatchOptions::bounded(0));
        let (release, gate) = mpsc::channel::<()>();

        let first = dispatcher
            .spawn("sync", move || -> TaskResult {
                gate.recv().map_err(|e| e.to_string())
            })
            .unwrap();
        assert!(!first.is_dropped());

        let second = dispatcher.spawn("sync", || -> TaskResult { Ok(()) }).unwrap();
        assert!(second.is_dropped());

        release.send(()).unwrap();
        first.into_handle().unwrap().join().unwrap().unwrap();

        let third = dispatcher.spawn("sync", || -> TaskResult { Ok(()) }).unwrap();
        assert!(!third.is_dropped());
        third.into_handle().unwrap().join().unwrap().unwrap();
    }

    #[test]
    fn test_bounded_queue() {
        let dispatcher = Dispatcher::new("test-bounded", DispatchOptions::bounded(1));
        let (release, gate) = mpsc::channel::<()>();

        let running = dispatcher
            .spawn("k", move || -> TaskResult { gate.recv().map_err(|e| e.to_string()) })
            .unwrap();
        wait_until(|| dispatcher.is_running(&"k"));

        let queued = dispatcher.spawn("k", || -> TaskResult { Ok(()) }).unwrap();
        assert!(!queued.is_dropped());
        assert_eq!(dispatcher.queued(&"k"), 1);

        let dropped = dispatcher.spawn("k", || -> TaskResult { Ok(()) }).unwrap();
        assert!(dropped.is_dropped());

        release.send(()).unwrap();
        running.into_handle().unwrap().join().unwrap().unwrap();
        queued.into_handle().unwrap().join().unwrap().unwrap();
    }

    #[test]
    fn test_keys_are_independent() {
        let dispatcher = Dispatcher::new("test-keys", DispatchOptions::bounded(0));
        let (release, gate) = mpsc::channel::<()>();

        let a = dispatcher
            .spawn("a", move || -> TaskResult { gate.recv().map_err(|e| e.to_string()) })
            .unwrap();
        let b = dispatcher.spawn("b", || -> TaskResult { Ok(()) }).unwrap();

        assert!(!b.is_dropped());
        b.into_handle().unwrap().join().unwrap().unwrap();
        release.send(()).unwrap();
        a.into_handle().unwrap().join().unwrap().unwrap();
    }

    #[test]
    fn test_error_returned_through_handle() {
        let dispatcher: Dispatcher<&str> = Dispatcher::new("test-error", DispatchOptions::exclusive());
        let handle = dispatcher
            .spawn("k", || -> Result<u8, String> { Err("boom".into()) })
            .unwrap()
            .into_handle()
            .unwrap();

        assert_eq!(handle.join().unwrap(), Err("boom".to_string()));
    }

    #[test]
    fn test_panic_releases_key() {
        let dispatcher = Dispatcher::new("test-panic", DispatchOptions::bounded(0));
        let handle = dispatcher
            .spawn("k", || -> TaskResult { panic!("task panicked") })
            .unwrap()
            .into_handle()
            .unwrap();
        assert!(handle.join().is_err());

        let next = dispatcher.spawn("k", || -> TaskResult { Ok(()) }).unwrap();
        assert!(!next.is_dropped());
        next.into_handle().unwrap().join().unwrap().unwrap();
    }

    #[test]
    fn test_concurrent_ignores_keys() {
        let dispatcher = Dispatcher::new("test-concurrent", DispatchOptions::concurrent());
        let (release, gate) = mpsc::channel::<()>();

        let blocked = dispatcher
            .spawn("k", move || -> TaskResult { gate.recv().map_err(|e| e.to_string()) })
            .unwrap();
        let free = dispatcher.spawn("k", || -> TaskResult { Ok(()) }).unwrap();

        free.into_handle().unwrap().join().unwrap().unwrap();
        release.send(()).unwrap();
        blocked.into_handle().unwrap().join().unwrap().unwrap();
    }
}

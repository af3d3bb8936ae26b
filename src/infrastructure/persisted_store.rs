use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Owns the debounced durable write for one key.
///
/// Every `schedule` replaces the pending payload and restarts the delay, so a
/// burst of updates collapses into a single write of the newest payload.
/// Dropping the worker cancels a write that has not started yet.
pub struct PersistenceWorker {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    delay: Duration,
    pending_payload: Arc<Mutex<Option<String>>>,
    pending_write: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>, delay: Duration) -> Self {
        Self {
            backend,
            key: key.into(),
            delay,
            pending_payload: Arc::new(Mutex::new(None)),
            pending_write: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schedule(&mut self, payload: String) {
        match self.pending_payload.lock() {
            Ok(mut slot) => *slot = Some(payload),
            Err(poisoned) => *poisoned.into_inner() = Some(payload),
        }

        if let Some(handle) = self.pending_write.take() {
            handle.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(key = %self.key, "no async runtime, writing without debounce");
            write_pending(self.backend.as_ref(), &self.key, &self.pending_payload);
            return;
        };

        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        let slot = Arc::clone(&self.pending_payload);
        let delay = self.delay;
        self.pending_write = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            write_pending(backend.as_ref(), &key, &slot);
        }));
    }

    pub fn flush_now(&mut self) {
        if let Some(handle) = self.pending_write.take() {
            handle.abort();
        }
        write_pending(self.backend.as_ref(), &self.key, &self.pending_payload);
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_write.take() {
            handle.abort();
        }
    }
}

// The slot lock is held across the write so two writers never interleave.
fn write_pending(backend: &dyn KeyValueStore, key: &str, slot: &Mutex<Option<String>>) {
    let mut guard = match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let Some(payload) = guard.take() else {
        return;
    };
    if let Err(error) = backend.set(key, &payload) {
        warn!(key, %error, "durable write failed, keeping in-memory state");
    }
}

/// In-memory value mirrored to a durable key.
pub struct PersistedStore<T> {
    value: T,
    worker: PersistenceWorker,
}

impl<T> PersistedStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Loads the value stored under `key` through `decode`. Any read or decode
    /// failure falls back to `initial`.
    pub fn open<F>(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        initial: T,
        delay: Duration,
        decode: F,
    ) -> Self
    where
        F: FnOnce(&str) -> Result<T, InfraError>,
    {
        let key = key.into();
        let value = match backend.get(&key) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(value) => value,
                Err(error) => {
                    warn!(key = %key, %error, "stored value is unreadable, using initial value");
                    initial
                }
            },
            Ok(None) => initial,
            Err(error) => {
                warn!(key = %key, %error, "durable read failed, using initial value");
                initial
            }
        };

        Self {
            value,
            worker: PersistenceWorker::new(backend, key, delay),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        match serde_json::to_string(&self.value) {
            Ok(payload) => self.worker.schedule(payload),
            Err(error) => {
                error!(key = %self.worker.key(), %error, "failed to serialize value for durable write");
            }
        }
    }

    pub fn flush_now(&mut self) {
        self.worker.flush_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kv_store::InMemoryKeyValueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "gwd-app-data";

    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryKeyValueStore,
        writes: AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

    }

    struct FailingStore {
        attempts: AtomicUsize,
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, InfraError> {
            Err(InfraError::InvalidConfig("storage unavailable".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), InfraError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(InfraError::InvalidConfig("quota exceeded".to_string()))
        }
    }

    fn delay() -> Duration {
        Duration::from_millis(300)
    }

    fn open_json<T>(backend: Arc<dyn KeyValueStore>, initial: T) -> PersistedStore<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        PersistedStore::open(backend, KEY, initial, delay(), |raw| {
            serde_json::from_str(raw).map_err(InfraError::from)
        })
    }

    #[test]
    fn open_falls_back_on_missing_entry() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        let store = open_json(backend, vec![1u32, 2]);
        assert_eq!(store.get(), &vec![1, 2]);
    }

    #[test]
    fn open_falls_back_on_corrupt_entry() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        backend.set(KEY, "{not json").expect("seed");
        let store = open_json(backend, vec![7u32]);
        assert_eq!(store.get(), &vec![7]);
    }

    #[test]
    fn open_falls_back_on_read_failure() {
        let backend = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });
        let store = open_json(backend, 5u32);
        assert_eq!(*store.get(), 5);
    }

    #[test]
    fn open_reads_existing_value() {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        backend.set(KEY, "[3,4]").expect("seed");
        let store = open_json(backend, Vec::<u32>::new());
        assert_eq!(store.get(), &vec![3, 4]);
    }

    #[test]
    fn set_without_runtime_writes_immediately() {
        let backend = Arc::new(CountingStore::default());
        let mut store = open_json(backend.clone(), 0u32);
        store.set(9);
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.get(KEY).expect("get"), Some("9".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_updates_collapses_into_one_write() {
        let backend = Arc::new(CountingStore::default());
        let mut store = open_json(backend.clone(), 0u32);

        store.set(1);
        store.set(2);
        store.set(3);
        assert_eq!(*store.get(), 3);
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.get(KEY).expect("get"), Some("3".to_string()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_update_restarts_the_delay() {
        let backend = Arc::new(CountingStore::default());
        let mut store = open_json(backend.clone(), 0u32);

        store.set(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        store.set(2);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.get(KEY).expect("get"), Some("2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_writes_pending_value_once() {
        let backend = Arc::new(CountingStore::default());
        let mut store = open_json(backend.clone(), 0u32);

        store.set(4);
        store.flush_now();
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_store_cancels_pending_write() {
        let backend = Arc::new(CountingStore::default());
        {
            let mut store = open_json(backend.clone(), 0u32);
            store.set(8);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_keeps_in_memory_value() {
        let backend = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });
        let mut store = open_json(backend.clone(), 0u32);

        store.set(11);
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(backend.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(*store.get(), 11);
    }
}

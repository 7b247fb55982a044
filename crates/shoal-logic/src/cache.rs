//! Keyed compute-once cache.
//!
//! Grid series are expensive to build and identical for every run that
//! shares a configuration. The first caller for a key builds the value;
//! concurrent callers for the same key wait on that build and then share
//! the published `Arc`. Failed builds are not cached.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::extent::MapExtent;
use crate::input::{read_records, GridRecord};
use crate::series::GridTimeSeries;

type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

/// A memo table from configuration keys to immutable shared values.
pub struct KeyedCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K: Eq + Hash + Clone, V> KeyedCache<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, building it with `build` if this
    /// is the first request.
    pub fn get_or_try_build<E, F>(&self, key: &K, build: F) -> Result<Arc<V>, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        // Only callers of this key wait here; the table lock is already released.
        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = value.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(build(key)?);
        *value = Some(Arc::clone(&built));
        Ok(built)
    }

    /// The cached value, if one has been built.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(key).map(Arc::clone)?
        };
        let value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        value.as_ref().map(Arc::clone)
    }

    /// Number of keys with a built value.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that determines a loaded grid series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridSeriesKey {
    pub source: PathBuf,
    pub extent: MapExtent,
    pub period: u32,
    pub normalize: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl GridSeriesKey {
    pub fn new(source: impl Into<PathBuf>, extent: MapExtent, period: u32, normalize: bool) -> Self {
        Self {
            source: source.into(),
            extent,
            period,
            normalize,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_window(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Read the source file and build the series it describes.
    pub fn load(&self) -> Result<GridTimeSeries, ConfigError> {
        let records: Vec<GridRecord> = read_records(&self.source)?;
        GridTimeSeries::from_records(
            &records,
            self.extent,
            self.period,
            self.normalize,
            self.start_date,
            self.end_date,
        )
    }
}

fn shared_cache() -> &'static KeyedCache<GridSeriesKey, GridTimeSeries> {
    static CACHE: OnceLock<KeyedCache<GridSeriesKey, GridTimeSeries>> = OnceLock::new();
    CACHE.get_or_init(KeyedCache::new)
}

/// Load a grid series through the process-wide cache.
pub fn shared_grid_series(key: &GridSeriesKey) -> Result<Arc<GridTimeSeries>, ConfigError> {
    shared_cache().get_or_try_build(key, GridSeriesKey::load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builds_once_per_key() {
        let cache: KeyedCache<u32, String> = KeyedCache::new();
        let calls = AtomicUsize::new(0);
        let build = |k: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(format!("value-{k}"))
        };
        let a = cache.get_or_try_build(&1, build).unwrap();
        let b = cache.get_or_try_build(&1, build).unwrap();
        let c = cache.get_or_try_build(&2, build).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*c, "value-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_build_not_cached() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new();
        assert!(cache.get_or_try_build(&"k", |_| Err("boom")).is_err());
        assert!(cache.get(&"k").is_none());
        assert_eq!(*cache.get_or_try_build(&"k", |_| Ok::<_, &str>(7)).unwrap(), 7);
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let cache: Arc<KeyedCache<u8, Vec<u8>>> = Arc::new(KeyedCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_build(&0, |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            Ok::<_, ()>(vec![1, 2, 3])
                        })
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_shared_series_missing_file() {
        let key = GridSeriesKey::new(
            "/nonexistent/grids.csv",
            MapExtent::new(0.0, 1.0, 0.0, 1.0, 1, 1),
            365,
            true,
        );
        assert!(matches!(
            shared_grid_series(&key),
            Err(ConfigError::Io { .. })
        ));
    }
}

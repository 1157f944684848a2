//! Bounded, populate-on-first-access cache of parsed parameter stores.
//!
//! One entry per location id. Loads happen outside the lock; when two tasks
//! race on the same cold entry the first insert wins and the loser's work is
//! discarded, so readers never observe a partially merged store.

use crate::locations::location_index::Location;
use crate::series::error::SeriesError;
use crate::series::point_dump::{ParameterStore, PointDump};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

struct LruEntry {
    last_used: u64,
    store: Arc<ParameterStore>,
}

struct LruState {
    tick: u64,
    entries: HashMap<String, LruEntry>,
}

/// LRU-bounded cache of merged per-location series.
pub struct SeriesCache {
    capacity: usize,
    state: Mutex<LruState>,
}

impl SeriesCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                tick: 0,
                entries: HashMap::new(),
            }),
        }
    }

    /// Returns the merged store for `location`, loading and caching it on
    /// first access. Repeated calls return the same `Arc` without touching
    /// disk until the entry is evicted or invalidated.
    pub async fn get_or_load(&self, location: &Location) -> Result<Arc<ParameterStore>, SeriesError> {
        {
            let mut state = self.state.lock().await;
            state.tick += 1;
            let tick = state.tick;
            if let Some(entry) = state.entries.get_mut(&location.id) {
                entry.last_used = tick;
                return Ok(Arc::clone(&entry.store));
            }
        }

        let store = Arc::new(load_store(location).await?);

        let mut state = self.state.lock().await;
        state.tick += 1;
        let tick = state.tick;
        if let Some(existing) = state.entries.get_mut(&location.id) {
            // A concurrent load beat us to the insert; keep the first winner.
            existing.last_used = tick;
            return Ok(Arc::clone(&existing.store));
        }
        state.entries.insert(
            location.id.clone(),
            LruEntry {
                last_used: tick,
                store: Arc::clone(&store),
            },
        );
        if state.entries.len() > self.capacity {
            if let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone())
            {
                log::debug!("evicting series cache entry '{}'", oldest);
                state.entries.remove(&oldest);
            }
        }
        Ok(store)
    }

    /// Drops the cached entry for one location, forcing a reload on next use.
    pub async fn invalidate(&self, location_id: &str) {
        self.state.lock().await.entries.remove(location_id);
    }

    /// Drops every cached entry.
    pub async fn clear(&self) {
        self.state.lock().await.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

/// Reads and merges every registered raw file of the location, in file order.
async fn load_store(location: &Location) -> Result<ParameterStore, SeriesError> {
    let files = location.files.clone();
    let id = location.id.clone();
    let store = tokio::task::spawn_blocking(move || {
        let mut store = ParameterStore::default();
        for path in &files {
            let bytes =
                std::fs::read(path).map_err(|e| SeriesError::FileRead(path.clone(), e))?;
            let dump = PointDump::from_slice(&bytes).map_err(|e| SeriesError::DataCorrupt {
                path: path.clone(),
                source: e,
            })?;
            store.merge_dump(&dump);
        }
        log::debug!(
            "loaded {} parameters for location '{}'",
            store.parameter_ids().count(),
            id
        );
        Ok::<_, SeriesError>(store)
    })
    .await??;
    Ok(store)
}

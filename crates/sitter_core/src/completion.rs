//! Per-tank, per-day record of which tasks a sitter has checked off.
//!
//! State lives in a device-local [`KeyValueStore`] under one key per tank and
//! local calendar day, so yesterday's checkmarks are simply never read again.
//! When the store fails, the tracker keeps working from its session cache
//! until it is dropped.

use crate::clock::format_iso_date;
use crate::error::AppError;
use crate::storage::KeyValueStore;
use std::collections::{BTreeSet, HashMap};
use time::Date;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "tanksitter_done";

pub fn storage_key(tank_id: &str, date: Date) -> String {
    format!("{KEY_PREFIX}_{tank_id}_{}", format_iso_date(date))
}

#[derive(Debug)]
pub struct CompletionTracker<K> {
    store: K,
    session: HashMap<String, BTreeSet<String>>,
    degraded: bool,
}

impl<K: KeyValueStore> CompletionTracker<K> {
    pub fn new(store: K) -> Self {
        Self {
            store,
            session: HashMap::new(),
            degraded: false,
        }
    }

    /// True once a store failure has switched the tracker to memory only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn load_completion_set(&mut self, tank_id: &str, date: Date) -> BTreeSet<String> {
        let key = storage_key(tank_id, date);
        self.read(&key)
    }

    pub fn is_complete(&mut self, tank_id: &str, task_id: &str, date: Date) -> bool {
        self.load_completion_set(tank_id, date).contains(task_id)
    }

    /// Flips `task_id` for the day and returns the new state.
    pub fn toggle_complete(&mut self, tank_id: &str, task_id: &str, date: Date) -> bool {
        let key = storage_key(tank_id, date);
        let mut done = self.read(&key);
        let now_done = if done.remove(task_id) {
            false
        } else {
            done.insert(task_id.to_string());
            true
        };
        self.write(&key, done);
        debug!(tank_id, task_id, done = now_done, "toggled task");
        now_done
    }

    fn read(&mut self, key: &str) -> BTreeSet<String> {
        if !self.degraded {
            match self.store.get(key) {
                Ok(Some(raw)) => {
                    let done = decode(key, &raw);
                    self.session.insert(key.to_string(), done.clone());
                    return done;
                }
                Ok(None) => return BTreeSet::new(),
                Err(err) => self.degrade(&err),
            }
        }

        self.session.get(key).cloned().unwrap_or_default()
    }

    fn write(&mut self, key: &str, done: BTreeSet<String>) {
        let encoded = serde_json::to_string(&done);
        self.session.insert(key.to_string(), done);
        if self.degraded {
            return;
        }

        let result = encoded
            .map_err(|err| AppError::invalid_data(err.to_string()))
            .and_then(|value| self.store.set(key, &value));
        if let Err(err) = result {
            self.degrade(&err);
        }
    }

    fn degrade(&mut self, err: &AppError) {
        warn!(error = %err, "completion storage unavailable, keeping progress in memory");
        self.degraded = true;
    }
}

fn decode(key: &str, raw: &str) -> BTreeSet<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(err) => {
            warn!(key, error = %err, "ignoring malformed completion entry");
            BTreeSet::new()
        }
    }
}

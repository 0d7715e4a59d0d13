//! Status store: PR id → `StatusRecord`, with a change feed.
//!
//! Every write is a single read-modify-write under one lock, so concurrent
//! fetch completions cannot interleave inside a merge. Each write that
//! touches a key is published as a `StoreChange` after it has been persisted.

pub mod backend;

pub use backend::{get_store_path, JsonFileBackend, MemoryBackend, StorageBackend};

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::status::StatusRecord;

/// Receiving end of the store's change feed. Unbounded, so a slow
/// subscriber sees every write.
pub type ChangeFeed = mpsc::UnboundedReceiver<StoreChange>;

/// One key's value before and after a write
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub id: u64,
    /// `None` when the write inserted a new key
    pub old: Option<StatusRecord>,
    /// `None` when the write removed the key
    pub new: Option<StatusRecord>,
}

pub struct StatusStore {
    records: Mutex<BTreeMap<u64, StatusRecord>>,
    backend: Box<dyn StorageBackend>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StoreChange>>>,
}

impl StatusStore {
    /// Open a store, loading whatever the backend already holds
    pub fn open(backend: impl StorageBackend + 'static) -> Result<Self> {
        let records = backend.load()?;
        Ok(Self {
            records: Mutex::new(records),
            backend: Box::new(backend),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            backend: Box::new(MemoryBackend),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to changes made after this call
    pub fn subscribe(&self) -> ChangeFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    pub fn get_all(&self) -> Result<BTreeMap<u64, StatusRecord>> {
        Ok(self.lock()?.clone())
    }

    pub fn get(&self, id: u64) -> Result<Option<StatusRecord>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    /// Insert or replace the record with `record.id`.
    ///
    /// The stored `last_modified` survives unless `record` carries its own.
    pub fn upsert(&self, record: StatusRecord) -> Result<StoreChange> {
        self.write(|records| Some(merge_into(records, record)))?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("upsert produced no change"))
    }

    /// Like `upsert`, but does nothing when the id is no longer stored.
    ///
    /// Results of a fetch that was in flight when its tab closed go through
    /// here so the deleted record is not re-created. The stored tab binding
    /// wins over the incoming one, since a navigation may have rebound the
    /// record while the fetch was running.
    pub fn merge_existing(&self, mut record: StatusRecord) -> Result<Option<StoreChange>> {
        let changes = self.write(|records| {
            let tab_id = records.get(&record.id)?.tab_id;
            record.tab_id = tab_id;
            Some(merge_into(records, record))
        })?;
        Ok(changes.into_iter().next())
    }

    /// Record a validator returned by a "not modified" response
    pub fn set_last_modified(&self, id: u64, last_modified: &str) -> Result<Option<StoreChange>> {
        let changes = self.write(|records| {
            let current = records.get_mut(&id)?;
            if current.last_modified.as_deref() == Some(last_modified) {
                return None;
            }
            let old = current.clone();
            current.last_modified = Some(last_modified.to_string());
            Some(StoreChange {
                id,
                old: Some(old),
                new: Some(current.clone()),
            })
        })?;
        Ok(changes.into_iter().next())
    }

    /// Delete every record matching `predicate`, returning the removed records
    pub fn remove_where<F>(&self, predicate: F) -> Result<Vec<StatusRecord>>
    where
        F: Fn(&StatusRecord) -> bool,
    {
        let changes = self.write_many(|records| {
            let doomed: Vec<u64> = records
                .values()
                .filter(|r| predicate(r))
                .map(|r| r.id)
                .collect();

            doomed
                .into_iter()
                .filter_map(|id| records.remove(&id))
                .map(|old| StoreChange {
                    id: old.id,
                    old: Some(old),
                    new: None,
                })
                .collect()
        })?;

        Ok(changes.into_iter().filter_map(|c| c.old).collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<u64, StatusRecord>>> {
        self.records
            .lock()
            .map_err(|_| anyhow!("status store lock poisoned"))
    }

    fn write<F>(&self, apply: F) -> Result<Vec<StoreChange>>
    where
        F: FnOnce(&mut BTreeMap<u64, StatusRecord>) -> Option<StoreChange>,
    {
        self.write_many(|records| apply(records).into_iter().collect())
    }

    /// Apply a mutation, persist, then publish. On a failed save the
    /// in-memory map is rolled back so memory and disk agree.
    fn write_many<F>(&self, apply: F) -> Result<Vec<StoreChange>>
    where
        F: FnOnce(&mut BTreeMap<u64, StatusRecord>) -> Vec<StoreChange>,
    {
        let mut records = self.lock()?;
        let snapshot = records.clone();
        let changes = apply(&mut records);

        if changes.is_empty() {
            return Ok(changes);
        }

        if let Err(e) = self.backend.save(&records) {
            *records = snapshot;
            return Err(e);
        }
        // Published under the records lock so subscribers see writes in order
        self.publish(&changes)?;
        drop(records);

        Ok(changes)
    }

    fn publish(&self, changes: &[StoreChange]) -> Result<()> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| anyhow!("status store subscriber list poisoned"))?;
        // Dropped receivers are pruned on the next write
        subscribers.retain(|tx| changes.iter().all(|change| tx.send(change.clone()).is_ok()));
        Ok(())
    }
}

fn merge_into(records: &mut BTreeMap<u64, StatusRecord>, mut record: StatusRecord) -> StoreChange {
    let old = records.get(&record.id).cloned();
    if record.last_modified.is_none() {
        record.last_modified = old.as_ref().and_then(|o| o.last_modified.clone());
    }
    records.insert(record.id, record.clone());
    StoreChange {
        id: record.id,
        old,
        new: Some(record),
    }
}

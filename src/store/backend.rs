use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;

use crate::status::StatusRecord;

const STORE_VERSION: u32 = 1;

/// Where the status store keeps its records between runs
pub trait StorageBackend: Send + Sync {
    fn load(&self) -> Result<BTreeMap<u64, StatusRecord>>;
    fn save(&self, records: &BTreeMap<u64, StatusRecord>) -> Result<()>;
}

/// Keeps nothing; the store's in-memory map is the only copy
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend;

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<BTreeMap<u64, StatusRecord>> {
        Ok(BTreeMap::new())
    }

    fn save(&self, _records: &BTreeMap<u64, StatusRecord>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecords {
    version: u32,
    #[serde(default)]
    records: BTreeMap<u64, StatusRecord>,
}

/// Persists records to a versioned JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Get the default store file path (~/.config/pr-pulse/status.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("status.json")
}

impl StorageBackend for JsonFileBackend {
    /// A missing file is an empty store. An unsupported version is an error.
    fn load(&self) -> Result<BTreeMap<u64, StatusRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open status store at {}", self.path.display()))?;

        let stored: StoredRecords =
            serde_json::from_reader(file).context("Failed to load status store")?;

        if stored.version != STORE_VERSION {
            anyhow::bail!("Unsupported status store version: {}", stored.version);
        }

        Ok(stored.records)
    }

    fn save(&self, records: &BTreeMap<u64, StatusRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = AtomicWriteFile::open(&self.path)
            .with_context(|| format!("Failed to open atomic write file at {}", self.path.display()))?;

        let stored = StoredRecordsRef {
            version: STORE_VERSION,
            records,
        };
        serde_json::to_writer_pretty(&mut file, &stored).context("Failed to serialize status store")?;

        file.commit().context("Failed to save status store")?;

        Ok(())
    }
}

#[derive(Serialize)]
struct StoredRecordsRef<'a> {
    version: u32,
    records: &'a BTreeMap<u64, StatusRecord>,
}

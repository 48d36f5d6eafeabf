//! Persistent cache for externally fetched facts
//!
//! Directory layout:
//! ```text
//! {base}/
//! ├── authors/
//! │   └── {signature-key}.json     # one record per cached lookup
//! ├── source_year/
//! ├── citations/
//! └── source_table/
//! ```
//!
//! Every record is committed by writing `{key}.json.tmp` and renaming, so a
//! crash mid-write never leaves a torn record visible and concurrent readers
//! see either the pre-write or the fully written state. One process writes
//! at a time (single-writer deployment); within the process a mutex
//! serializes writes so parallel lookup workers stay safe.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::signature::{QuerySignature, Relation};

/// Fatal storage failure.
///
/// There is no fallback to re-fetching everything: that could blow the
/// external API quota, so the pipeline stops here.
#[derive(Debug)]
pub enum StoreError {
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    Encode(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { path, source } => {
                write!(f, "storage unavailable at {}: {source}", path.display())
            }
            Self::Encode(e) => write!(f, "cannot encode cache record: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Either the storage layer failed (fatal) or the fetch itself did.
#[derive(Debug)]
pub enum FetchError<E> {
    Store(StoreError),
    Fetch(E),
}

impl<E: std::fmt::Display> std::fmt::Display for FetchError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Fetch(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for FetchError<E> {}

/// On-disk envelope around a cached payload.
///
/// The parameter JSON is stored alongside for auditability, mirroring how
/// the signature was built.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord<T> {
    params: serde_json::Value,
    fetched_at: chrono::DateTime<chrono::Utc>,
    payload: T,
}

/// Per-relation summary for store inspection.
#[derive(Debug, Serialize)]
pub struct RelationStatus {
    pub relation: Relation,
    pub records: usize,
    pub bytes: u64,
}

/// Signature-keyed persistent record store.
pub struct LocalStore {
    base: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `base`.
    pub fn open(base: &Path) -> Result<Self, StoreError> {
        for relation in Relation::all() {
            let dir = base.join(relation.dir_name());
            fs::create_dir_all(&dir).map_err(|source| StoreError::Unavailable {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self {
            base: base.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn record_path(&self, sig: &QuerySignature) -> PathBuf {
        self.base
            .join(sig.relation.dir_name())
            .join(format!("{}.json", sig.key()))
    }

    /// Read a cached record, if present and intact.
    ///
    /// A record that cannot be parsed is treated as a miss (it will be
    /// overwritten by the next put); missing files are ordinary misses;
    /// any other I/O failure is fatal.
    pub fn get<T: DeserializeOwned>(&self, sig: &QuerySignature) -> Result<Option<T>, StoreError> {
        let path = self.record_path(sig);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Unavailable { path, source }),
        };
        match serde_json::from_str::<CacheRecord<T>>(&raw) {
            Ok(record) => Ok(Some(record.payload)),
            Err(e) => {
                log::warn!("corrupt cache record {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    /// Persist a record under its signature, replacing any previous value.
    ///
    /// Records are replaced whole, never merged.
    pub fn put<T: Serialize>(&self, sig: &QuerySignature, payload: &T) -> Result<(), StoreError> {
        let record = CacheRecord {
            params: serde_json::from_str(&sig.params_json).unwrap_or(serde_json::Value::Null),
            fetched_at: chrono::Utc::now(),
            payload,
        };
        let json = serde_json::to_string(&record).map_err(StoreError::Encode)?;

        let path = self.record_path(sig);
        let tmp = path.with_extension("json.tmp");

        // A panicked writer never leaves partial records (tmp + rename), so
        // the guard of a poisoned lock is still safe to take.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::write(&tmp, json).map_err(|source| StoreError::Unavailable {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Unavailable { path, source })?;
        Ok(())
    }

    /// Cache-aside lookup: on a hit with `refresh == false` the stored
    /// result is returned and `fetch` is never invoked; on a miss or with
    /// `refresh == true`, `fetch` runs and its result is persisted before
    /// being returned.
    pub fn get_or_fetch<T, E>(
        &self,
        sig: &QuerySignature,
        refresh: bool,
        fetch: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, FetchError<E>>
    where
        T: Serialize + DeserializeOwned,
    {
        if !refresh {
            if let Some(hit) = self.get(sig).map_err(FetchError::Store)? {
                return Ok(hit);
            }
        }
        let value = fetch().map_err(FetchError::Fetch)?;
        self.put(sig, &value).map_err(FetchError::Store)?;
        Ok(value)
    }

    /// Per-relation record counts and sizes.
    pub fn status(&self) -> Result<Vec<RelationStatus>, StoreError> {
        let mut out = Vec::new();
        for relation in Relation::all() {
            let dir = self.base.join(relation.dir_name());
            let mut records = 0usize;
            let mut bytes = 0u64;
            for entry in Self::read_dir(&dir)? {
                let entry = entry.map_err(|source| StoreError::Unavailable {
                    path: dir.clone(),
                    source,
                })?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".json") {
                    records += 1;
                    bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
            out.push(RelationStatus {
                relation,
                records,
                bytes,
            });
        }
        Ok(out)
    }

    /// Remove every record of one relation. Returns the number removed.
    pub fn clear(&self, relation: Relation) -> Result<usize, StoreError> {
        let dir = self.base.join(relation.dir_name());
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0usize;
        for entry in Self::read_dir(&dir)? {
            let entry = entry.map_err(|source| StoreError::Unavailable {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .map_err(|source| StoreError::Unavailable { path, source })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Clean stale `.tmp` files left by a crashed writer.
    pub fn cleanup_tmp(&self) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for relation in Relation::all() {
            let dir = self.base.join(relation.dir_name());
            for entry in Self::read_dir(&dir)? {
                let entry = entry.map_err(|source| StoreError::Unavailable {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    log::info!("cleaning stale tmp: {}", path.display());
                    fs::remove_file(&path)
                        .map_err(|source| StoreError::Unavailable { path, source })?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn read_dir(dir: &Path) -> Result<fs::ReadDir, StoreError> {
        fs::read_dir(dir).map_err(|source| StoreError::Unavailable {
            path: dir.to_path_buf(),
            source,
        })
    }
}

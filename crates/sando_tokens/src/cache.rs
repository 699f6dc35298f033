//! Incremental build cache
//!
//! Each layer's source directory is fingerprinted with a SHA-256 hash per
//! `.json` file. A layer is rebuilt only when its fingerprint or outputs say
//! so. Stores are explicit values handed to the orchestrator; persistence
//! problems degrade to "no cache" with a warning.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::discovery::json_files;
use crate::error::{CacheError, Result, TokenError};

/// Fingerprint of one layer's sources at its last successful build
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub layer_name: String,
    pub timestamp_ms: u64,
    /// Absolute source path -> hex content hash
    pub file_hashes: BTreeMap<String, String>,
}

impl CacheEntry {
    /// Entry stamped with the current time
    pub fn new(layer_name: impl Into<String>, file_hashes: BTreeMap<String, String>) -> Self {
        Self {
            layer_name: layer_name.into(),
            timestamp_ms: now_ms(),
            file_hashes,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// On-disk shape: `{ "<layer>": { "timestamp": .., "files": { .. } } }`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct CacheDocument(BTreeMap<String, PersistedEntry>);

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    timestamp: u64,
    files: BTreeMap<String, String>,
}

/// Where cache entries live between builds
pub trait CacheStore {
    fn entry(&self, layer: &str) -> Option<&CacheEntry>;

    /// Replace (never merge) the entry for `entry.layer_name`
    fn replace(&mut self, entry: CacheEntry);

    /// Drop the entry for `layer`, if any
    fn remove(&mut self, layer: &str);

    /// Persist pending changes
    fn flush(&mut self) -> std::result::Result<(), CacheError>;
}

/// Store that never touches the filesystem
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheStore {
    entries: BTreeMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn entry(&self, layer: &str) -> Option<&CacheEntry> {
        self.entries.get(layer)
    }

    fn replace(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.layer_name.clone(), entry);
    }

    fn remove(&mut self, layer: &str) {
        self.entries.remove(layer);
    }

    fn flush(&mut self) -> std::result::Result<(), CacheError> {
        Ok(())
    }
}

/// Store backed by a single JSON file
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl FileCacheStore {
    /// Load `path`, falling back to an empty store when it is missing or
    /// unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Ignoring build cache: {}", e);
                Self {
                    path,
                    entries: BTreeMap::new(),
                }
            }
        }
    }

    /// Load `path`. A missing file is an empty store, not an error.
    pub fn try_load(path: &Path) -> std::result::Result<Self, CacheError> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let document: CacheDocument =
                serde_json::from_str(&content).map_err(|source| CacheError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            document
                .0
                .into_iter()
                .map(|(layer_name, persisted)| {
                    let entry = CacheEntry {
                        layer_name: layer_name.clone(),
                        timestamp_ms: persisted.timestamp,
                        file_hashes: persisted.files,
                    };
                    (layer_name, entry)
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Loaded {} cache entries from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileCacheStore {
    fn entry(&self, layer: &str) -> Option<&CacheEntry> {
        self.entries.get(layer)
    }

    fn replace(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.layer_name.clone(), entry);
    }

    fn remove(&mut self, layer: &str) {
        self.entries.remove(layer);
    }

    fn flush(&mut self) -> std::result::Result<(), CacheError> {
        let io_err = |source: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let document = CacheDocument(
            self.entries
                .iter()
                .map(|(layer, entry)| {
                    let persisted = PersistedEntry {
                        timestamp: entry.timestamp_ms,
                        files: entry.file_hashes.clone(),
                    };
                    (layer.clone(), persisted)
                })
                .collect(),
        );
        let json = serde_json::to_string_pretty(&document).map_err(|source| CacheError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, json).map_err(io_err)?;
        tracing::debug!("Wrote build cache {}", self.path.display());
        Ok(())
    }
}

/// Hex SHA-256 of a file's contents
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| TokenError::io(path, e))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn cache_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Hash every `.json` file below `source_dir`, keyed by absolute path
pub fn fingerprint(source_dir: &Path) -> Result<BTreeMap<String, String>> {
    json_files(source_dir)
        .iter()
        .map(|file| -> Result<(String, String)> { Ok((cache_key(file), hash_file(file)?)) })
        .collect()
}

/// Why a layer has to be rebuilt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebuildReason {
    Forced,
    /// An earlier layer was rebuilt in the same run
    DependencyRebuilt,
    NoCacheEntry,
    OutputMissing(PathBuf),
    SourceChanged(PathBuf),
    SourceAdded(PathBuf),
    SourceRemoved(PathBuf),
    SourceNewerThanOutput(PathBuf),
    Unreadable(String),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "rebuild forced"),
            Self::DependencyRebuilt => write!(f, "a dependency layer was rebuilt"),
            Self::NoCacheEntry => write!(f, "no cache entry"),
            Self::OutputMissing(path) => write!(f, "output missing: {}", path.display()),
            Self::SourceChanged(path) => write!(f, "source changed: {}", path.display()),
            Self::SourceAdded(path) => write!(f, "source added: {}", path.display()),
            Self::SourceRemoved(path) => write!(f, "source removed: {}", path.display()),
            Self::SourceNewerThanOutput(path) => {
                write!(f, "source newer than output: {}", path.display())
            }
            Self::Unreadable(message) => write!(f, "sources unreadable: {message}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebuildDecision {
    UpToDate,
    Rebuild(RebuildReason),
}

impl RebuildDecision {
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::Rebuild(_))
    }
}

/// Decide whether `layer` has to be rebuilt.
///
/// Checked in order: cache entry present, outputs present, every source hash
/// unchanged (no additions or removals), no source newer than the oldest
/// output file.
pub fn needs_rebuild(
    store: &dyn CacheStore,
    layer: &str,
    source_dir: &Path,
    output_dirs: &[PathBuf],
) -> RebuildDecision {
    let Some(entry) = store.entry(layer) else {
        return RebuildDecision::Rebuild(RebuildReason::NoCacheEntry);
    };

    let current = match fingerprint(source_dir) {
        Ok(current) => current,
        Err(e) => return RebuildDecision::Rebuild(RebuildReason::Unreadable(e.to_string())),
    };

    // Nothing to build then or now; there are no outputs to check.
    if current.is_empty() && entry.file_hashes.is_empty() {
        return RebuildDecision::UpToDate;
    }

    let oldest_output = match oldest_output(output_dirs) {
        Ok(oldest) => oldest,
        Err(missing) => return RebuildDecision::Rebuild(RebuildReason::OutputMissing(missing)),
    };

    for (file, hash) in &current {
        match entry.file_hashes.get(file) {
            None => {
                return RebuildDecision::Rebuild(RebuildReason::SourceAdded(PathBuf::from(file)))
            }
            Some(cached) if cached != hash => {
                return RebuildDecision::Rebuild(RebuildReason::SourceChanged(PathBuf::from(
                    file,
                )))
            }
            Some(_) => {}
        }
    }
    if let Some(removed) = entry.file_hashes.keys().find(|f| !current.contains_key(*f)) {
        return RebuildDecision::Rebuild(RebuildReason::SourceRemoved(PathBuf::from(removed)));
    }

    for file in current.keys() {
        let modified = fs::metadata(file).and_then(|m| m.modified());
        match modified {
            Ok(modified) if modified > oldest_output => {
                return RebuildDecision::Rebuild(RebuildReason::SourceNewerThanOutput(
                    PathBuf::from(file),
                ))
            }
            Ok(_) => {}
            Err(e) => {
                return RebuildDecision::Rebuild(RebuildReason::Unreadable(format!("{file}: {e}")))
            }
        }
    }

    RebuildDecision::UpToDate
}

/// Modification time of the oldest generated file, or the first output
/// directory found missing or empty
fn oldest_output(output_dirs: &[PathBuf]) -> std::result::Result<SystemTime, PathBuf> {
    let mut oldest: Option<SystemTime> = None;
    for dir in output_dirs {
        if !dir.is_dir() {
            return Err(dir.clone());
        }
        let mut found = false;
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let modified = entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|m| m.modified());
            let Ok(modified) = modified else {
                return Err(entry.into_path());
            };
            found = true;
            oldest = Some(oldest.map_or(modified, |o| o.min(modified)));
        }
        if !found {
            return Err(dir.clone());
        }
    }
    oldest.ok_or_else(|| output_dirs.first().cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source_dir: PathBuf,
        output_dir: PathBuf,
        file: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source_dir = dir.path().join("tokens/ingredients");
        let output_dir = dir.path().join("dist/css/ingredients");
        fs::create_dir_all(&source_dir).unwrap();
        let file = source_dir.join("color.json");
        fs::write(&file, r##"{"color":{"white":{"value":"#fff"}}}"##).unwrap();
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(output_dir.join("tokens.css"), ":root {}").unwrap();
        Fixture {
            source_dir,
            output_dir,
            file,
            _dir: dir,
        }
    }

    fn recorded(fx: &Fixture) -> MemoryCacheStore {
        let mut store = MemoryCacheStore::new();
        store.replace(CacheEntry::new(
            "ingredients",
            fingerprint(&fx.source_dir).unwrap(),
        ));
        store
    }

    #[test]
    fn hash_is_hex_sha256() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.json");
        fs::write(&file, "").unwrap();
        assert_eq!(
            hash_file(&file).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_entry_needs_rebuild() {
        let fx = fixture();
        let decision = needs_rebuild(
            &MemoryCacheStore::new(),
            "ingredients",
            &fx.source_dir,
            &[fx.output_dir.clone()],
        );
        assert_eq!(decision, RebuildDecision::Rebuild(RebuildReason::NoCacheEntry));
    }

    #[test]
    fn unchanged_sources_are_up_to_date() {
        let fx = fixture();
        let store = recorded(&fx);
        // Touch the output after recording so it is newer than every source.
        fs::write(fx.output_dir.join("tokens.css"), ":root { }").unwrap();
        let decision = needs_rebuild(&store, "ingredients", &fx.source_dir, &[fx.output_dir.clone()]);
        assert_eq!(decision, RebuildDecision::UpToDate);
    }

    #[test]
    fn one_byte_change_names_the_file() {
        let fx = fixture();
        let store = recorded(&fx);
        fs::write(&fx.file, r##"{"color":{"white":{"value":"#ffe"}}}"##).unwrap();

        let decision = needs_rebuild(&store, "ingredients", &fx.source_dir, &[fx.output_dir.clone()]);
        let RebuildDecision::Rebuild(reason) = decision else {
            panic!("expected a rebuild");
        };
        assert_eq!(
            reason,
            RebuildReason::SourceChanged(fs::canonicalize(&fx.file).unwrap())
        );
        assert!(reason.to_string().contains("color.json"));
    }

    #[test]
    fn added_and_removed_sources() {
        let fx = fixture();
        let store = recorded(&fx);
        let extra = fx.source_dir.join("space.json");
        fs::write(&extra, "{}").unwrap();
        let decision = needs_rebuild(&store, "ingredients", &fx.source_dir, &[fx.output_dir.clone()]);
        assert!(matches!(
            decision,
            RebuildDecision::Rebuild(RebuildReason::SourceAdded(ref p)) if p.ends_with("space.json")
        ));

        fs::remove_file(&extra).unwrap();
        fs::remove_file(&fx.file).unwrap();
        let decision = needs_rebuild(&store, "ingredients", &fx.source_dir, &[fx.output_dir.clone()]);
        assert!(matches!(
            decision,
            RebuildDecision::Rebuild(RebuildReason::SourceRemoved(ref p)) if p.ends_with("color.json")
        ));
    }

    #[test]
    fn missing_output_dir_needs_rebuild() {
        let fx = fixture();
        let store = recorded(&fx);
        fs::remove_dir_all(&fx.output_dir).unwrap();
        let decision = needs_rebuild(&store, "ingredients", &fx.source_dir, &[fx.output_dir.clone()]);
        assert_eq!(
            decision,
            RebuildDecision::Rebuild(RebuildReason::OutputMissing(fx.output_dir.clone()))
        );
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/.sando-cache.json");

        let mut store = FileCacheStore::load(&path);
        assert!(store.entry("ingredients").is_none());
        store.replace(CacheEntry {
            layer_name: "ingredients".to_string(),
            timestamp_ms: 42,
            file_hashes: BTreeMap::from([("/a.json".to_string(), "ab".to_string())]),
        });
        store.flush().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({ "ingredients": { "timestamp": 42, "files": { "/a.json": "ab" } } })
        );

        let reloaded = FileCacheStore::load(&path);
        assert_eq!(reloaded.entry("ingredients").unwrap().timestamp_ms, 42);
    }

    #[test]
    fn replace_does_not_merge() {
        let mut store = MemoryCacheStore::new();
        store.replace(CacheEntry::new(
            "recipes",
            BTreeMap::from([("/old.json".to_string(), "1".to_string())]),
        ));
        store.replace(CacheEntry::new(
            "recipes",
            BTreeMap::from([("/new.json".to_string(), "2".to_string())]),
        ));
        let keys: Vec<&String> = store.entry("recipes").unwrap().file_hashes.keys().collect();
        assert_eq!(keys, vec!["/new.json"]);
    }

    #[test]
    fn removed_entry_stays_gone_after_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sando-cache.json");

        let mut store = FileCacheStore::load(&path);
        store.replace(CacheEntry::new("flavors", BTreeMap::new()));
        store.replace(CacheEntry::new("recipes", BTreeMap::new()));
        store.flush().unwrap();

        store.remove("flavors");
        store.flush().unwrap();

        let reloaded = FileCacheStore::load(&path);
        assert!(reloaded.entry("flavors").is_none());
        assert!(reloaded.entry("recipes").is_some());
    }

    #[test]
    fn corrupt_cache_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sando-cache.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileCacheStore::try_load(&path),
            Err(CacheError::Json { .. })
        ));
        let store = FileCacheStore::load(&path);
        assert!(store.entry("ingredients").is_none());
    }

    #[test]
    fn unwritable_cache_reports_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the cache file should be cannot be written over.
        let path = dir.path().join("cache");
        fs::create_dir_all(&path).unwrap();
        let mut store = FileCacheStore {
            path: path.clone(),
            entries: BTreeMap::new(),
        };
        assert!(matches!(store.flush(), Err(CacheError::Io { .. })));
    }
}

//! Content-hash duplicate detection for the save directory.
//!
//! Two strategies are available. `Scan` re-hashes every file in the directory
//! on each check. `Index` keeps each file's hash, size and mtime in a TOML
//! sidecar next to the images, reconciled with the directory contents when
//! first opened.

use crate::filename::content_hash;
use clap::ValueEnum;
use log::{debug, info, trace, warn};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;

/// Sidecar file holding the hash index. Excluded from every directory scan.
pub const INDEX_FILE_NAME: &str = ".imgfetch-index.toml";

const INDEX_VERSION: u32 = 2;
const BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum DedupeStrategy {
    /// Persistent hash index stored alongside the images (default)
    #[default]
    Index,
    /// Re-hash every file in the directory on each check
    Scan,
}

/// Compute the MD5 of a file as lowercase hex, reading in chunks.
pub fn md5_path(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Regular files in `dir` that are candidates for duplicate comparison.
/// Unreadable entries are logged and skipped.
fn stored_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to read directory {:?}: {}", dir, e);
            }
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            trace!("Skipping non UTF-8 filename {:?}", path);
            continue;
        };
        if name == INDEX_FILE_NAME {
            continue;
        }
        files.push((name, path));
    }
    files
}

/// Linear scan: name of the first file in `dir` whose content hashes to `hash`.
pub fn find_duplicate_in_dir(hash: &str, dir: &Path) -> Option<String> {
    for (name, path) in stored_files(dir) {
        match md5_path(&path) {
            Ok(existing) if existing == hash => {
                debug!("Content matches existing file {:?}", path);
                return Some(name);
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable file {:?}: {}", path, e),
        }
    }
    None
}

/// Whether any regular file in `dir` has exactly the same content.
pub fn is_duplicate(content: &[u8], dir: &Path) -> bool {
    find_duplicate_in_dir(&content_hash(content), dir).is_some()
}

/// Size and modification time of a stored file, used to spot files that
/// changed since they were hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FileStamp {
    size: u64,
    mtime_secs: i64,
    mtime_nanos: u32,
}

impl FileStamp {
    fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let (mtime_secs, mtime_nanos) = match meta.modified()?.duration_since(UNIX_EPOCH) {
            Ok(d) => (i64::try_from(d.as_secs()).unwrap_or(i64::MAX), d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                (-i64::try_from(d.as_secs()).unwrap_or(i64::MAX), d.subsec_nanos())
            }
        };
        Ok(Self {
            size: meta.len(),
            mtime_secs,
            mtime_nanos,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    hash: String,
    stamp: FileStamp,
}

/// On-disk layout of the sidecar
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    #[serde(default)]
    files: BTreeMap<String, IndexEntry>,
}

/// Persistent content-hash index for one directory.
///
/// Entries are keyed by filename and carry the file's size and mtime at the
/// time it was hashed; a file whose stamp no longer matches is re-hashed.
#[derive(Debug)]
pub struct HashIndex {
    dir: PathBuf,
    files: BTreeMap<String, IndexEntry>,
    by_hash: HashMap<String, String>,
}

impl HashIndex {
    /// Load the sidecar for `dir` and bring it in line with the files
    /// actually present. Saves the sidecar if reconciliation changed anything.
    pub fn open(dir: &Path) -> io::Result<Self> {
        let path = dir.join(INDEX_FILE_NAME);
        let files = match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<IndexFile>(&content) {
                Ok(file) if file.version == INDEX_VERSION => {
                    debug!("Loaded {} index entries from {:?}", file.files.len(), path);
                    file.files
                }
                Ok(file) => {
                    warn!(
                        "Unsupported index version {} in {:?}, rebuilding",
                        file.version, path
                    );
                    BTreeMap::new()
                }
                Err(e) => {
                    warn!("Failed to parse index {:?}: {}, rebuilding", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("No index at {:?}", path);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        let mut index = Self {
            dir: dir.to_path_buf(),
            files,
            by_hash: HashMap::new(),
        };
        let changed = index.reconcile();
        index.rebuild_by_hash();
        if changed {
            index.save()?;
        }
        Ok(index)
    }

    /// Drop entries for vanished files, and hash files that are untracked or
    /// whose size/mtime changed since they were indexed.
    /// Returns true if the entries changed.
    fn reconcile(&mut self) -> bool {
        let files = stored_files(&self.dir);
        let present: HashSet<&str> = files.iter().map(|(name, _)| name.as_str()).collect();

        let before = self.files.len();
        self.files.retain(|name, _| present.contains(name.as_str()));
        let mut changed = self.files.len() != before;
        if changed {
            debug!("Dropped {} stale index entries", before - self.files.len());
        }

        let mut hashed = 0usize;
        for (name, path) in &files {
            let stamp = match FileStamp::of(path) {
                Ok(stamp) => stamp,
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", path, e);
                    changed |= self.files.remove(name).is_some();
                    continue;
                }
            };
            if self.files.get(name).is_some_and(|entry| entry.stamp == stamp) {
                continue;
            }
            match md5_path(path) {
                Ok(hash) => {
                    self.files.insert(name.clone(), IndexEntry { hash, stamp });
                    hashed += 1;
                    changed = true;
                }
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", path, e);
                    changed |= self.files.remove(name).is_some();
                }
            }
        }
        if hashed > 0 {
            info!("Hashed {} new or changed file(s) in {:?}", hashed, self.dir);
        }
        changed
    }

    fn rebuild_by_hash(&mut self) {
        self.by_hash.clear();
        for (name, entry) in &self.files {
            // Keep the first name if the directory already holds duplicates
            self.by_hash
                .entry(entry.hash.clone())
                .or_insert_with(|| name.clone());
        }
    }

    pub fn lookup(&self, hash: &str) -> Option<&str> {
        self.by_hash.get(hash).map(String::as_str)
    }

    /// Like `lookup`, but first checks that the matching file is still on
    /// disk with the stamp it was indexed under, re-hashing it otherwise.
    pub fn lookup_verified(&mut self, hash: &str) -> io::Result<Option<String>> {
        while let Some(name) = self.by_hash.get(hash).cloned() {
            let path = self.dir.join(&name);
            match FileStamp::of(&path) {
                Ok(stamp) if self.files.get(&name).is_some_and(|e| e.stamp == stamp) => {
                    return Ok(Some(name));
                }
                Ok(stamp) => {
                    debug!("Indexed file {:?} changed on disk, re-hashing", name);
                    match md5_path(&path) {
                        Ok(new_hash) => {
                            self.files.insert(
                                name,
                                IndexEntry {
                                    hash: new_hash,
                                    stamp,
                                },
                            );
                        }
                        Err(e) => {
                            warn!("Skipping unreadable file {:?}: {}", path, e);
                            self.files.remove(&name);
                        }
                    }
                }
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("Skipping unreadable file {:?}: {}", path, e);
                    }
                    debug!("Indexed file {:?} is gone, forgetting it", name);
                    self.files.remove(&name);
                }
            }
            self.rebuild_by_hash();
            self.save()?;
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Record that `filename` (already written) holds content with `hash` and persist.
    pub fn insert(&mut self, hash: &str, filename: &str) -> io::Result<()> {
        let stamp = FileStamp::of(&self.dir.join(filename))?;
        // Keyed by name, so a same-name overwrite replaces the old hash
        self.files.insert(
            filename.to_string(),
            IndexEntry {
                hash: hash.to_string(),
                stamp,
            },
        );
        self.rebuild_by_hash();
        self.save()
    }

    /// Write the sidecar atomically: temp file in the same directory, then rename.
    pub fn save(&self) -> io::Result<()> {
        let file = IndexFile {
            version: INDEX_VERSION,
            files: self.files.clone(),
        };
        let content = toml::to_string(&file).map_err(io::Error::other)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(self.dir.join(INDEX_FILE_NAME))
            .map_err(|e| e.error)?;
        trace!("Saved {} index entries", self.files.len());
        Ok(())
    }
}

/// Duplicate checker for one save directory, using the configured strategy.
/// The index is opened lazily so the directory only has to exist once a
/// check actually runs.
pub struct Deduper {
    dir: PathBuf,
    strategy: DedupeStrategy,
    index: Option<HashIndex>,
}

impl Deduper {
    pub fn new(dir: impl Into<PathBuf>, strategy: DedupeStrategy) -> Self {
        Self {
            dir: dir.into(),
            strategy,
            index: None,
        }
    }

    fn index(&mut self) -> io::Result<&mut HashIndex> {
        if self.index.is_none() {
            let index = HashIndex::open(&self.dir)?;
            debug!("Hash index for {:?} holds {} entries", self.dir, index.len());
            self.index = Some(index);
        }
        self.index
            .as_mut()
            .ok_or_else(|| io::Error::other("hash index unavailable"))
    }

    /// Name of an existing file with content `hash`, if any.
    pub fn find(&mut self, hash: &str) -> io::Result<Option<String>> {
        match self.strategy {
            DedupeStrategy::Scan => Ok(find_duplicate_in_dir(hash, &self.dir)),
            DedupeStrategy::Index => self.index()?.lookup_verified(hash),
        }
    }

    /// Note that `filename` was just written with content `hash`.
    pub fn record(&mut self, hash: &str, filename: &str) -> io::Result<()> {
        match self.strategy {
            DedupeStrategy::Scan => Ok(()),
            DedupeStrategy::Index => self.index()?.insert(hash, filename),
        }
    }
}

//! Per-user progress persistence.
//!
//! Progress is stored as one whole record per user behind the
//! [`ProgressStore`] key-value interface. The file-backed store keeps one
//! JSON file per user with file locking and atomic replacement so readers
//! never see a partial write.

use crate::{Error, Result, UserProgress};
use chrono::Utc;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Key-value storage of progress records keyed by user ID
pub trait ProgressStore {
    /// Load a user's progress; unknown users get an empty record
    fn get(&self, user_id: &str) -> Result<UserProgress>;

    /// Replace a user's progress
    fn put(&self, user_id: &str, progress: &UserProgress) -> Result<()>;

    /// Load, modify and save a user's progress as one step
    fn update<F>(&self, user_id: &str, f: F) -> Result<UserProgress>
    where
        F: FnOnce(&mut UserProgress) -> Result<()>,
        Self: Sized,
    {
        let mut progress = self.get(user_id)?;
        f(&mut progress)?;
        self.put(user_id, &progress)?;
        Ok(progress)
    }
}

/// Reject IDs that cannot safely become a file name
fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 128
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Storage(format!("invalid user ID '{}'", user_id)))
    }
}

/// One JSON file per user under a directory
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the progress file for a user
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    fn lock_path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{}.lock", user_id)))
    }

    /// Move an unreadable record aside so it is not overwritten
    ///
    /// Earlier backups are kept; a second one gets a timestamp suffix.
    fn quarantine(path: &Path) {
        let mut backup = path.with_extension("json.corrupt");
        if backup.exists() {
            let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
            backup = path.with_extension(format!("json.corrupt.{}", stamp));
        }
        match std::fs::rename(path, &backup) {
            Ok(()) => tracing::warn!("Moved unreadable progress file to {:?}", backup),
            Err(e) => tracing::warn!("Unable to move unreadable progress file {:?}: {}", path, e),
        }
    }

    fn read(path: &Path) -> Result<UserProgress> {
        if !path.exists() {
            tracing::debug!("No progress file at {:?}, starting empty", path);
            return Ok(UserProgress::default());
        }

        let file = File::open(path)?;

        // Acquire shared lock for reading
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<UserProgress>(&contents) {
            Ok(progress) => {
                tracing::debug!("Loaded progress from {:?}", path);
                Ok(progress)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse progress file {:?}: {}. Starting empty.",
                    path,
                    e
                );
                Self::quarantine(path);
                Ok(UserProgress::default())
            }
        }
    }

    /// Atomically writes progress by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn write(&self, path: &Path, progress: &UserProgress) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(progress)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved progress to {:?}", path);
        Ok(())
    }
}

impl ProgressStore for FileProgressStore {
    fn get(&self, user_id: &str) -> Result<UserProgress> {
        Self::read(&self.path_for(user_id)?)
    }

    fn put(&self, user_id: &str, progress: &UserProgress) -> Result<()> {
        let path = self.path_for(user_id)?;
        self.write(&path, progress)
    }

    /// Holds an exclusive per-user lock across the whole read-modify-write
    /// so concurrent processes cannot interleave their updates.
    fn update<F>(&self, user_id: &str, f: F) -> Result<UserProgress>
    where
        F: FnOnce(&mut UserProgress) -> Result<()>,
    {
        let path = self.path_for(user_id)?;
        std::fs::create_dir_all(&self.dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path_for(user_id)?)?;
        lock.lock_exclusive()
            .map_err(|e| Error::Storage(format!("unable to lock progress for '{}': {}", user_id, e)))?;

        let outcome = Self::read(&path).and_then(|mut progress| {
            f(&mut progress)?;
            self.write(&path, &progress)?;
            Ok(progress)
        });

        lock.unlock()?;
        outcome
    }
}

/// Process-local store, for tests and embedding
#[derive(Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<String, UserProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, UserProgress>>> {
        self.records
            .lock()
            .map_err(|_| Error::Storage("progress store lock poisoned".into()))
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, user_id: &str) -> Result<UserProgress> {
        Ok(self.records()?.get(user_id).cloned().unwrap_or_default())
    }

    fn put(&self, user_id: &str, progress: &UserProgress) -> Result<()> {
        self.records()?.insert(user_id.to_string(), progress.clone());
        Ok(())
    }

    fn update<F>(&self, user_id: &str, f: F) -> Result<UserProgress>
    where
        F: FnOnce(&mut UserProgress) -> Result<()>,
    {
        let mut records = self.records()?;
        let mut progress = records.get(user_id).cloned().unwrap_or_default();
        f(&mut progress)?;
        records.insert(user_id.to_string(), progress.clone());
        Ok(progress)
    }
}

//! Definition file backups
//!
//! Files that a release overwrites, or that a discard removes, are moved
//! into the repository backup directory with a timestamp suffix. Each move is
//! recorded in `backups.json` in the same directory.

use chrono::{DateTime, Utc};
use node_fs::{JsonStore, NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Index file name inside the backup directory
pub const INDEX_FILE: &str = "backups.json";

/// Metadata for one backed-up file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Where the file lived before the backup
    pub original: String,
    /// Where the file lives now
    pub backup: String,
    /// Why it was backed up, e.g. `release` or `discard`
    pub reason: String,
    /// When the backup was taken
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BackupIndex {
    #[serde(default)]
    backups: Vec<BackupRecord>,
}

/// Moves definition files into a backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: NormalizedPath,
    store: JsonStore,
}

impl BackupManager {
    pub fn new(backup_dir: NormalizedPath) -> Self {
        Self {
            backup_dir,
            store: JsonStore::new(),
        }
    }

    pub fn backup_dir(&self) -> &NormalizedPath {
        &self.backup_dir
    }

    fn index_path(&self) -> NormalizedPath {
        self.backup_dir.join(INDEX_FILE)
    }

    /// Name a backup of `file_name` taken at `created`.
    ///
    /// `Sop_box.1.0.hda` -> `Sop_box.1.0.20240309140507.hda`
    fn backup_name(file_name: &str, created: DateTime<Utc>) -> String {
        let stamp = created.format("%Y%m%d%H%M%S");
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}.{}.{}", stem, stamp, ext),
            _ => format!("{}.{}", file_name, stamp),
        }
    }

    /// Move `path` into the backup directory and record it.
    pub fn backup_file(&self, path: &NormalizedPath, reason: &str) -> Result<BackupRecord> {
        let file_name = path.file_name().ok_or_else(|| {
            Error::configuration(format!("cannot back up path without a file name: {}", path))
        })?;

        let created = Utc::now();
        let dest = self.backup_dir.join(&Self::backup_name(file_name, created));
        io::move_file(path.as_ref(), dest.as_ref())?;

        let record = BackupRecord {
            original: path.to_string(),
            backup: dest.to_string(),
            reason: reason.to_string(),
            created,
        };

        let mut index: BackupIndex = self.store.load_or_default(&self.index_path())?;
        index.backups.push(record.clone());
        self.store.save(&self.index_path(), &index)?;

        tracing::warn!(original = %path, backup = %dest, reason, "Backed up definition file");
        Ok(record)
    }

    /// Every recorded backup, oldest first.
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let index: BackupIndex = self.store.load_or_default(&self.index_path())?;
        Ok(index.backups)
    }

    /// Move a backup back to its original location.
    ///
    /// Fails if something already exists at the original location.
    pub fn restore(&self, record: &BackupRecord) -> Result<NormalizedPath> {
        let original = NormalizedPath::new(&record.original);
        if original.exists() {
            return Err(Error::configuration(format!(
                "refusing to restore over existing file {}",
                original
            )));
        }
        io::move_file(NormalizedPath::new(&record.backup).as_ref(), original.as_ref())?;
        tracing::info!(path = %original, "Restored definition file from backup");
        Ok(original)
    }
}

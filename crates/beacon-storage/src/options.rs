//! Where the database lives.

use std::path::{Path, PathBuf};

/// Default database file name inside the base directory.
pub const DEFAULT_DATABASE_FILE: &str = "beacon.sqlite";

/// Location of the SQLite database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOptions {
    /// A file `file_name` inside `base_dir`; the directory is created on open.
    OnDisk { base_dir: PathBuf, file_name: String },
    /// A private in-memory database, discarded when the store is dropped.
    InMemory,
}

impl StorageOptions {
    pub fn on_disk(base_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self::OnDisk {
            base_dir: base_dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Splits a full database path into directory and file name.
    ///
    /// A bare file name resolves against the current directory.
    pub fn from_path(path: &Path) -> Self {
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());
        Self::on_disk(base_dir, file_name)
    }

    /// Full path of the database file, `None` for in-memory stores.
    pub fn file_path(&self) -> Option<PathBuf> {
        match self {
            Self::OnDisk {
                base_dir,
                file_name,
            } => Some(base_dir.join(file_name)),
            Self::InMemory => None,
        }
    }
}

//! JSON cache artifacts on disk.

use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::inventory::{Hierarchy, HostVars};

/// Mode requested for cache artifacts, before the umask.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// File name of the host-variables artifact.
pub const HOSTVARS_FILE: &str = "dbinventory.cache";

/// File name of the hierarchy artifact.
pub const HIERARCHY_FILE: &str = "dbinventory.index";

/// Error type for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An artifact exists but does not hold the expected JSON.
    #[error("cache artifact {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An artifact could not be serialized.
    #[error("failed to serialize cache artifact {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading, writing or removing an artifact failed.
    #[error("I/O error for cache artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// The artifact path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Corrupt { path, .. } | Self::Serialize { path, .. } | Self::Io { path, .. } => {
                path
            }
        }
    }

    /// Whether the artifact exists but could not be parsed.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// The pair of cache artifacts under one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    hostvars_path: PathBuf,
    hierarchy_path: PathBuf,
}

impl CacheStore {
    /// Create a store for artifacts under `dir`. Nothing is touched on disk.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            hostvars_path: dir.join(HOSTVARS_FILE),
            hierarchy_path: dir.join(HIERARCHY_FILE),
            dir,
        }
    }

    /// Directory holding the artifacts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the host-variables artifact.
    #[must_use]
    pub fn hostvars_path(&self) -> &Path {
        &self.hostvars_path
    }

    /// Path of the hierarchy artifact.
    #[must_use]
    pub fn hierarchy_path(&self) -> &Path {
        &self.hierarchy_path
    }

    /// Whether both artifacts exist.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.hostvars_path.is_file() && self.hierarchy_path.is_file()
    }

    /// Whether the cache can be used instead of querying the database.
    ///
    /// See [`CacheStore::is_valid_at`].
    #[must_use]
    pub fn is_valid(&self, max_age: Duration) -> bool {
        self.is_valid_at(max_age, SystemTime::now())
    }

    /// Whether both artifacts exist and the hierarchy artifact was modified
    /// less than `max_age` before `now`.
    ///
    /// An artifact whose modification time cannot be read counts as stale.
    #[must_use]
    pub fn is_valid_at(&self, max_age: Duration, now: SystemTime) -> bool {
        if !self.exists() {
            log::debug!("Cache miss: artifacts not found in {}", self.dir.display());
            return false;
        }

        let modified = match self.modified() {
            Ok(modified) => modified,
            Err(e) => {
                log::debug!(
                    "Cache miss: cannot read mtime of {}: {}",
                    self.hierarchy_path.display(),
                    e
                );
                return false;
            }
        };

        let valid = modified
            .checked_add(max_age)
            .is_some_and(|expires| expires > now);

        log::debug!(
            "Cache {}: written {}, max age {}s",
            if valid { "hit" } else { "expired" },
            chrono::DateTime::<chrono::Local>::from(modified).format("%Y-%m-%d %H:%M:%S"),
            max_age.as_secs()
        );
        valid
    }

    /// Modification time of the hierarchy artifact.
    pub fn modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.hierarchy_path)?.modified()
    }

    /// Load both artifacts.
    ///
    /// # Errors
    ///
    /// [`CacheError::Io`] if an artifact cannot be read and
    /// [`CacheError::Corrupt`] if it does not hold the expected JSON.
    pub fn load(&self) -> CacheResult<(HostVars, Hierarchy)> {
        let hostvars = self.load_hostvars()?;
        let hierarchy = self.load_hierarchy()?;
        log::debug!(
            "Loaded {} groups and {} hosts from cache",
            hierarchy.len(),
            hostvars.len()
        );
        Ok((hostvars, hierarchy))
    }

    /// Load the host-variables artifact.
    pub fn load_hostvars(&self) -> CacheResult<HostVars> {
        read_json(&self.hostvars_path)
    }

    /// Load the hierarchy artifact.
    pub fn load_hierarchy(&self) -> CacheResult<Hierarchy> {
        read_json(&self.hierarchy_path)
    }

    /// Write both artifacts, host variables first.
    ///
    /// Each artifact is written to a temporary file next to it and renamed
    /// into place, so readers see either the old or the new content. The
    /// hierarchy artifact is written last because its mtime marks freshness.
    /// There is no lock between concurrent writers; the last rename wins.
    pub fn save(&self, hostvars: &HostVars, hierarchy: &Hierarchy) -> CacheResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        self.write_json(&self.hostvars_path, hostvars)?;
        self.write_json(&self.hierarchy_path, hierarchy)?;

        log::debug!(
            "Saved {} groups and {} hosts to {}",
            hierarchy.len(),
            hostvars.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Remove both artifacts. Missing artifacts are not an error.
    pub fn clear(&self) -> CacheResult<()> {
        for path in [&self.hostvars_path, &self.hierarchy_path] {
            match fs::remove_file(path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(CacheError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> CacheResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|source| CacheError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut builder = tempfile::Builder::new();
        // Readable by other users of the cache directory, subject to the umask.
        #[cfg(unix)]
        builder.permissions(fs::Permissions::from_mode(ARTIFACT_MODE));

        let mut file = builder.tempfile_in(&self.dir).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CacheResult<T> {
    let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

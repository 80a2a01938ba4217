use super::{bytes_to_gb, BinGateway};
use crate::error::{GatewayError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A freedesktop.org style trash directory.
///
/// Deleted items live under `files/`, their restore metadata under `info/`.
/// On macOS the user trash is a flat `~/.Trash` with no `info/` part.
#[derive(Debug, Clone)]
pub struct TrashBin {
    root: PathBuf,
}

impl TrashBin {
    /// Use an explicit trash root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the current user's home trash
    pub fn locate() -> Result<Self> {
        #[cfg(target_os = "macos")]
        let root = dirs::home_dir().map(|home| home.join(".Trash"));

        #[cfg(not(target_os = "macos"))]
        let root = dirs::data_dir().map(|data| data.join("Trash"));

        root.map(Self::new).ok_or_else(|| {
            GatewayError::NotSupported("no home trash directory for this user".to_string())
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn files_dir(&self) -> PathBuf {
        if self.is_flat() {
            self.root.clone()
        } else {
            self.root.join("files")
        }
    }

    fn is_flat(&self) -> bool {
        cfg!(target_os = "macos")
    }

    /// Total bytes held in the trash
    pub fn size_bytes(&self) -> Result<u64> {
        let files = self.files_dir();
        if !files.exists() {
            debug!("Trash directory does not exist: {}", files.display());
            return Ok(0);
        }
        Ok(get_dir_size(&files)?)
    }
}

impl BinGateway for TrashBin {
    fn current_size_gb(&self) -> Result<u64> {
        self.size_bytes().map(bytes_to_gb)
    }

    fn purge(&self) -> Result<()> {
        info!("Emptying trash at {}", self.root.display());

        let mut errors = Vec::new();
        let mut removed = 0u64;
        let mut targets = vec![self.files_dir()];
        if !self.is_flat() {
            targets.push(self.root.join("info"));
        }

        for dir in &targets {
            match clear_directory(dir) {
                Ok(count) => removed += count,
                Err(e) => errors.push(format!("{}: {}", dir.display(), e)),
            }
        }

        if !self.is_flat() {
            let cache = self.root.join("directorysizes");
            if cache.exists() {
                if let Err(e) = fs::remove_file(&cache) {
                    errors.push(format!("{}: {}", cache.display(), e));
                }
            }
        }

        if errors.is_empty() {
            info!("Trash emptied, {} entries removed", removed);
            Ok(())
        } else {
            for err in &errors {
                warn!("Failed to remove {}", err);
            }
            Err(GatewayError::PurgeFailed(errors.join("; ")))
        }
    }
}

/// Calculate the total size of a directory recursively
pub fn get_dir_size(path: &Path) -> io::Result<u64> {
    let mut size = 0u64;

    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            let metadata = match fs::symlink_metadata(&entry_path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            if metadata.is_dir() {
                size += get_dir_size(&entry_path).unwrap_or(0);
            } else {
                size += metadata.len();
            }
        }
    } else if let Ok(metadata) = fs::symlink_metadata(path) {
        size = metadata.len();
    }

    Ok(size)
}

/// Remove every entry inside `path`, keeping `path` itself.
/// Returns how many top-level entries were removed.
fn clear_directory(path: &Path) -> io::Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut removed = 0u64;
    let mut first_error = None;

    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        let result = match fs::symlink_metadata(&entry_path) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&entry_path),
            Ok(_) => fs::remove_file(&entry_path),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!("Deleted {}", entry_path.display());
                removed += 1;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", entry_path.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(removed),
    }
}

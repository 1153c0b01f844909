use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::error::WatchError;

/// Build a fresh capture path `<dir>/<local time>_<8 hex>.<ext>`, creating `dir`.
///
/// The random suffix keeps a photo and a preview taken in the same second apart.
pub fn new_capture_path(dir: &Path, extension: &str) -> Result<PathBuf, WatchError> {
    fs::create_dir_all(dir)
        .map_err(|e| WatchError::StorageError(format!("failed to create directory: {}", e)))?;

    let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let extension = extension.trim_start_matches('.');
    Ok(dir.join(format!("{}_{}.{}", stamp, &suffix[..8], extension)))
}

/// Delete a capture file. A file that is already gone is not an error.
pub fn discard(path: &Path) -> Result<(), WatchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WatchError::StorageError(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

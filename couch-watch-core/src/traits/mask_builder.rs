use std::path::Path;

use crate::models::error::WatchError;

/// Turns an operator drawing into a region-of-interest mask file.
pub trait MaskBuilder: Send + Sync {
    fn build(&self, drawing: &[u8], mask_path: &Path) -> Result<(), WatchError>;
}

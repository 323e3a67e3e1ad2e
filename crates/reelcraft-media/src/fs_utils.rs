//! Filesystem helpers for output placement.
//!
//! Finished media only ever appears at its final path through a rename, so
//! readers never observe a partially written file.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;

use crate::error::MediaResult;

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent_dir(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Reserve a hidden temp path next to `final_path`.
///
/// The file is removed when the returned handle drops, unless it is
/// persisted first.
pub fn sibling_temp_path(final_path: &Path, suffix: &str) -> MediaResult<TempPath> {
    let dir = final_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let file = tempfile::Builder::new()
        .prefix(".reelcraft-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[test]
    fn test_sibling_temp_path_is_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.mp4");

        let temp = sibling_temp_path(&target, ".mp4").unwrap();
        let temp_path = temp.to_path_buf();
        assert_eq!(temp_path.parent(), Some(dir.path()));
        assert!(temp_path.exists());

        drop(temp);
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_creates_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("b").join("out.mp4");

        assert_ok!(ensure_parent_dir(&target).await);
        assert!(target.parent().unwrap().is_dir());
        assert_ok!(ensure_parent_dir(Path::new("out.mp4")).await);
    }
}

//! Filesystem helpers for output replacement.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Atomically replace `dst` with `src`.
///
/// Callers must place `src` in the same directory as `dst` so the
/// rename cannot cross filesystems; there is then no window where a
/// partial file is visible at `dst`.
pub async fn replace_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    fs::rename(src, dst).await?;
    tracing::debug!("replaced {} with {}", dst.display(), src.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_replace_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.mp4");
        let dst = dir.path().join("out.mp4");

        fs::write(&src, b"second pass").await.unwrap();
        fs::write(&dst, b"first pass").await.unwrap();

        replace_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"second pass");
    }

    #[tokio::test]
    async fn test_replace_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = replace_file(dir.path().join("none"), dir.path().join("out")).await;
        assert!(result.is_err());
    }
}

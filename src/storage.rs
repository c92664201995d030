use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Write photo bytes under `base/subdir` and return the relative path that is
/// persisted on the owning row.
pub async fn store_photo(base: &Path, subdir: &str, bytes: &[u8]) -> io::Result<String> {
    let dir = base.join(subdir);
    fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.jpg", Uuid::new_v4());
    fs::write(dir.join(&file_name), bytes).await?;

    Ok(format!("{subdir}/{file_name}"))
}

/// Read a photo back by the relative path stored on the row.
pub async fn load_photo(base: &Path, relative: &str) -> io::Result<Vec<u8>> {
    let relative_path = PathBuf::from(relative);
    // Stored paths are always "<subdir>/<uuid>.jpg"; refuse anything that
    // could escape the upload directory.
    if relative_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid photo path",
        ));
    }

    fs::read(base.join(relative_path)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("carpool-storage-{}", Uuid::new_v4()));
        let relative = store_photo(&dir, "users", b"jpegdata").await.unwrap();
        assert!(relative.starts_with("users/"));

        let bytes = load_photo(&dir, &relative).await.unwrap();
        assert_eq!(bytes, b"jpegdata");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn load_rejects_parent_traversal() {
        let dir = std::env::temp_dir();
        let err = load_photo(&dir, "../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}

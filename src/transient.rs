use std::{
    io::{self, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Uploaded image bytes persisted to a uniquely named file for the duration
/// of one request. The file is removed when the guard is dropped.
pub struct TransientImage {
    file: Option<NamedTempFile>,
}

impl TransientImage {
    pub fn persist_in(dir: &Path, bytes: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".jpg")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!("Persisted {} bytes to {}", bytes.len(), file.path().display());
        Ok(Self { file: Some(file) })
    }

    pub fn path(&self) -> &Path {
        match &self.file {
            Some(file) => file.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for TransientImage {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!("Failed to remove transient file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_lives_until_drop() {
        let dir = tempfile::tempdir().unwrap();

        let image = TransientImage::persist_in(dir.path(), b"payload").unwrap();
        let path = image.path().to_path_buf();

        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");

        drop(image);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();

        let first = TransientImage::persist_in(dir.path(), b"a").unwrap();
        let second = TransientImage::persist_in(dir.path(), b"b").unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_removed_when_already_deleted() {
        let dir = tempfile::tempdir().unwrap();

        let image = TransientImage::persist_in(dir.path(), b"payload").unwrap();
        std::fs::remove_file(image.path()).unwrap();

        drop(image);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();

        let result = TransientImage::persist_in(&dir.path().join("nope"), b"payload");

        assert!(result.is_err());
    }
}

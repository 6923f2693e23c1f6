use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::processor::DocumentKind;

/// Raw uploaded documents, one file per job: `<root>/<job_id>.<ext>`.
///
/// The stored `input_ref` is the bare file name, so the documents directory
/// can move without rewriting job rows.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    root: PathBuf,
}

impl DocumentStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the document and returns its `input_ref`. Never overwrites:
    /// job ids are unique, so an existing file is an error.
    pub fn put(&self, job_id: &str, kind: DocumentKind, bytes: &[u8]) -> Result<String, StorageError> {
        let input_ref = format!("{}.{}", job_id, kind.extension());
        let path = self.resolve(&input_ref)?;
        self.ensure_directory()?;

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(path));
            }
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        };

        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        log::debug!("Stored document {} ({} bytes)", input_ref, bytes.len());
        Ok(input_ref)
    }

    pub fn read(&self, input_ref: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(input_ref)?;
        std::fs::read(&path).map_err(|e| StorageError::ReadFile { path, source: e })
    }

    /// Deletes a stored document. A missing file is not an error.
    pub fn remove(&self, input_ref: &str) -> Result<(), StorageError> {
        let path = self.resolve(input_ref)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }

    /// Maps an `input_ref` to a path inside the root, rejecting anything
    /// that could escape it.
    fn resolve(&self, input_ref: &str) -> Result<PathBuf, StorageError> {
        let invalid = input_ref.is_empty()
            || input_ref.contains('/')
            || input_ref.contains('\\')
            || input_ref.contains('\0')
            || input_ref.starts_with('.');
        if invalid {
            return Err(StorageError::InvalidReference(input_ref.to_string()));
        }
        Ok(self.root.join(input_ref))
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| StorageError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path().join("documents"));

        let input_ref = storage.put("job-1", DocumentKind::Pdf, b"%PDF-1.5").unwrap();

        assert_eq!(input_ref, "job-1.pdf");
        assert!(temp_dir.path().join("documents").join("job-1.pdf").exists());
        assert_eq!(storage.read(&input_ref).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn test_text_extension() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path());
        assert_eq!(
            storage.put("job-2", DocumentKind::Text, b"hi").unwrap(),
            "job-2.txt"
        );
    }

    #[test]
    fn test_put_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path());
        storage.put("job-1", DocumentKind::Text, b"first").unwrap();

        let result = storage.put("job-1", DocumentKind::Text, b"second");
        assert!(matches!(result, Err(StorageError::FileExists(_))));
        assert_eq!(storage.read("job-1.txt").unwrap(), b"first");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path());
        let input_ref = storage.put("job-1", DocumentKind::Text, b"x").unwrap();

        storage.remove(&input_ref).unwrap();
        assert!(!temp_dir.path().join(&input_ref).exists());
        storage.remove(&input_ref).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path());
        assert!(matches!(
            storage.read("nope.txt"),
            Err(StorageError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_rejects_escaping_references() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path());
        for bad in ["", "../etc/passwd", "a/b.txt", "..", ".hidden", "a\\b"] {
            assert!(
                matches!(storage.read(bad), Err(StorageError::InvalidReference(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}

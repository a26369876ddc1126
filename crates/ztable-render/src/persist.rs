//! Atomic file output
//!
//! Documents are written to a temporary file in the destination directory,
//! flushed to disk and then renamed over the target. A failed write leaves
//! neither a partial document nor a stray temporary behind.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use ztable_core::RenderError;

/// Write `bytes` to `path`, replacing any existing file in one step
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| RenderError::Io(e.error))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"old contents").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
        assert!(!path.exists());
    }
}

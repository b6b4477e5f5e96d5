use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::RemoveError;

/// Deletes a single file. Cached listings that include it are left as they
/// are.
pub fn remove_file(path: &Path) -> Result<(), RemoveError> {
    match path.try_exists() {
        Ok(true) => {}
        Ok(false) => return Err(RemoveError::NotFound(path.to_path_buf())),
        Err(source) => {
            return Err(RemoveError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    fs::remove_file(path).map_err(|source| RemoveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("removed {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::remove_file;
    use crate::error::RemoveError;

    #[test]
    fn removes_existing_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("old.log");
        fs::write(&path, b"stale").expect("write");

        remove_file(&path).expect("removed");
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let err = remove_file(&temp.path().join("never.log")).expect_err("missing");
        assert!(matches!(err, RemoveError::NotFound(_)));
    }

    #[test]
    fn directories_are_refused_with_an_os_error() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join("folder");
        fs::create_dir(&dir).expect("mkdir");

        let err = remove_file(&dir).expect_err("directory");
        assert!(matches!(err, RemoveError::Io { .. }));
        assert!(dir.exists());
    }
}

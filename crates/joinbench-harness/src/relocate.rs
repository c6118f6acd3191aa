//! Destructive directory recreation and file moves

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StepError;

/// Remove `dir` with everything under it, then create it empty.
pub fn recreate_dir(dir: &Path) -> Result<(), StepError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => log::debug!("removed {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StepError::io(dir, e)),
    }
    fs::create_dir_all(dir).map_err(|e| StepError::io(dir, e))
}

/// Move `src` into `dest_dir`, keeping its file name. Returns the new path.
///
/// `rename` cannot cross filesystems (home -> tmpfs is the usual layout), so a
/// failed rename falls back to copy + remove.
pub fn relocate(src: &Path, dest_dir: &Path) -> Result<PathBuf, StepError> {
    let name = src
        .file_name()
        .ok_or_else(|| StepError::io(src, std::io::Error::other("path has no file name")))?;
    let dest = dest_dir.join(name);

    if !src.try_exists().map_err(|e| StepError::io(src, e))? {
        return Err(StepError::MissingArtifact {
            path: src.to_path_buf(),
        });
    }

    if let Err(e) = fs::rename(src, &dest) {
        log::debug!(
            "rename {} -> {} failed ({e}), copying",
            src.display(),
            dest.display()
        );
        fs::copy(src, &dest).map_err(|e| StepError::io(&dest, e))?;
        fs::remove_file(src).map_err(|e| StepError::io(src, e))?;
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn recreate_clears_contents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("run");
        fs::create_dir_all(dir.join("10000")).unwrap();
        fs::write(dir.join("stale.csv"), "x").unwrap();

        recreate_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn recreate_creates_missing_parents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        recreate_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn relocate_moves_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("h_out_inner.csv");
        let dest_dir = tmp.path().join("100");
        fs::create_dir(&dest_dir).unwrap();
        fs::write(&src, "k,v\n1,2\n").unwrap();

        let dest = relocate(&src, &dest_dir).unwrap();

        assert_eq!(dest, dest_dir.join("h_out_inner.csv"));
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dest).unwrap(), "k,v\n1,2\n");
    }

    #[test]
    fn relocate_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = relocate(&tmp.path().join("s_out_left.csv"), tmp.path()).unwrap_err();
        assert!(err.is_missing_artifact());
    }
}

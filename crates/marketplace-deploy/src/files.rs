//! Whole-file replacement through a temporary file in the target directory.

use {
    anyhow::{Context, Result},
    std::{
        fs::Permissions,
        io::{self, Write},
        path::{Path, PathBuf},
    },
    tempfile::NamedTempFile,
};

/// A file written next to its target and not yet moved into place.
pub struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    /// Atomically replaces the target with the staged contents.
    pub fn persist(self) -> Result<()> {
        let Self { file, target } = self;
        file.persist(&target)
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(())
    }
}

/// Writes `contents` to a temporary file in the directory of `target`, so the
/// final rename stays on one file system.
///
/// Temporary files are created owner-only. The staged file takes over the
/// permissions of the file it replaces, or `0644` when there is none yet.
pub fn stage(target: &Path, contents: &[u8]) -> Result<Staged> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage {}", target.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to stage {}", target.display()))?;
    let permissions = match std::fs::metadata(target) {
        Ok(metadata) => metadata.permissions(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => new_file_permissions(&file)?,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", target.display()));
        }
    };
    file.as_file()
        .set_permissions(permissions)
        .with_context(|| format!("failed to stage {}", target.display()))?;
    Ok(Staged {
        file,
        target: target.to_path_buf(),
    })
}

/// Stages and persists in one go.
pub fn write(target: &Path, contents: &[u8]) -> Result<()> {
    stage(target, contents)?.persist()
}

#[cfg(unix)]
fn new_file_permissions(_: &NamedTempFile) -> io::Result<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(file: &NamedTempFile) -> io::Result<Permissions> {
    Ok(file.as_file().metadata()?.permissions())
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use {super::*, std::os::unix::fs::PermissionsExt};

    pub(crate) fn mode(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn new_files_are_world_readable() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("networkMapping.json");

        write(&target, b"{}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
        assert_eq!(mode(&target), 0o644);
    }

    #[test]
    fn replacing_keeps_the_mode() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("networkMapping.json");
        std::fs::write(&target, "{}").unwrap();
        std::fs::set_permissions(&target, Permissions::from_mode(0o640)).unwrap();

        write(&target, br#"{"5":[]}"#).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), r#"{"5":[]}"#);
        assert_eq!(mode(&target), 0o640);
    }

    #[test]
    fn staged_file_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("NftMarketplace.json");
        std::fs::write(&target, "[]").unwrap();

        let staged = stage(&target, b"[{}]").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "[]");
        drop(staged);

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "[]");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

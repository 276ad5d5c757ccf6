use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

// @module: Filesystem collaborators for the catalog store

/// Answers "does this path exist" for the prune pass.
///
/// The store never touches the filesystem directly, so tests and hosts with
/// remote storage can plug in their own notion of existence.
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

// @struct: File operations utility
#[derive(Debug, Default, Clone, Copy)]
pub struct FileManager;

impl FileManager {
    // @checks: Path existence, files and directories alike (DVD folders are videos too)
    pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }
}

impl PathProbe for FileManager {
    fn exists(&self, path: &Path) -> bool {
        Self::path_exists(path)
    }
}

impl<F> PathProbe for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

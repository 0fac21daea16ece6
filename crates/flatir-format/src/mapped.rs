//! Persisting buffers and mapping them back into memory

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;
use crate::reader::{ScopeView, scope_at};
use crate::writer::root_offset;

/// Write `bytes` to `path` through a sibling temporary file
///
/// The destination only ever holds a complete buffer: on failure the
/// temporary file is removed and `path` is left untouched. Concurrent
/// writers each get their own temporary file; the last rename wins.
pub fn persist(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;

    debug!(path = %path.display(), bytes = bytes.len(), "persisted scope buffer");
    Ok(())
}

/// A persisted scope buffer mapped read-only into memory
#[derive(Debug)]
pub struct MappedScope {
    map: Mmap,
    root: usize,
    path: PathBuf,
}

impl MappedScope {
    /// Map the file at `path` and validate its root scope
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and only ever read through
        // bounds-checked accessors; buffers are written via `persist`, which
        // renames a finished file into place instead of modifying it.
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file)? };

        let root = root_offset(&map)?;
        scope_at(&map, root)?;
        debug!(path = %path.display(), bytes = map.len(), root, "mapped scope buffer");

        Ok(Self {
            map,
            root,
            path: path.to_path_buf(),
        })
    }

    /// Mapped bytes
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    /// Position of the root scope table
    #[inline]
    pub fn root_offset(&self) -> usize {
        self.root
    }

    /// View of the root scope
    pub fn root(&self) -> Result<ScopeView<'_>> {
        scope_at(&self.map, self.root)
    }

    /// Path the buffer was mapped from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

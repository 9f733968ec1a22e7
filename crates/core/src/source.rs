//! File-backed sources, for formats that keep their header and payload in separate files.

use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::data::{DataCursorRef, DataError, Endian, IoSnafu};

/// An in-memory copy of a file on disk, along with where it came from so that companion files can be
/// found next to it.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    data: Box<[u8]>,
}

impl FileSource {
    /// Reads the whole file at `path` into memory.
    ///
    /// # Errors
    /// Returns [`Io`](DataError::Io) if the file does not exist or is unable to be read.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        fn inner(path: &Path) -> Result<FileSource, DataError> {
            let data = std::fs::read(path).context(IoSnafu)?;
            Ok(FileSource { path: path.to_path_buf(), data: data.into_boxed_slice() })
        }
        inner(path.as_ref())
    }

    /// Opens the file sharing this file's stem but with the given extension, if it exists.
    ///
    /// # Errors
    /// Returns [`Io`](DataError::Io) if the companion exists but is unable to be read.
    pub fn open_companion(&self, extension: &str) -> Result<Option<Self>, DataError> {
        let path = self.path.with_extension(extension);
        if !path.is_file() {
            log::debug!("No companion file at {}", path.display());
            return Ok(None);
        }
        log::info!("Loading companion file {}", path.display());
        Self::open(path).map(Some)
    }

    /// Returns the path this source was loaded from.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file contents.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a fresh cursor over the file contents.
    #[inline]
    #[must_use]
    pub fn cursor(&self, endian: Endian) -> DataCursorRef<'_> {
        DataCursorRef::new(&self.data, endian)
    }
}

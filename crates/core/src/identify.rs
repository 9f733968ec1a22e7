//! A small identification system, so that format modules can report whether they recognize a given
//! file without fully loading it.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

/// What a format module was able to tell about a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct FileInfo {
    /// Human-readable description, e.g. the format name and revision.
    pub info: String,
    /// Number of independently addressable streams, if the identifier went deep enough to count them.
    pub streams: Option<u32>,
}

impl FileInfo {
    #[inline]
    #[must_use]
    pub fn new(info: String, streams: Option<u32>) -> Self {
        FileInfo { info, streams }
    }
}

/// Implemented by formats that can cheaply sniff a byte buffer.
pub trait FileIdentifier {
    /// Checks only fixed header fields.
    fn identify(data: &[u8]) -> Option<FileInfo>;

    /// May parse further into the file to fill in more detail. Defaults to [`identify`](Self::identify).
    fn identify_deep(data: &[u8]) -> Option<FileInfo> {
        Self::identify(data)
    }
}

pub type IdentifyFn = fn(&[u8]) -> Option<FileInfo>;

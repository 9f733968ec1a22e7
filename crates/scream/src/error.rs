use snafu::prelude::*;
use soundbank_core::prelude::*;

/// Error conditions for when working with Scream Tool sound banks.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Thrown when a file is unable to be opened or read.
    #[cfg(feature = "std")]
    #[snafu(display("Filesystem error: {source}"))]
    FileError { source: std::io::Error },
    /// Thrown if the header doesn't look like a sound bank in either byte order.
    #[snafu(display("Unrecognized format! Reason: {reason}"))]
    UnrecognizedFormat { reason: &'static str },
    /// Thrown if the `SBlk` version is not one of the known revisions.
    #[snafu(display("Unsupported SBlk version {version:#X}!"))]
    UnsupportedVersion { version: u32 },
    /// Thrown when an offset or size points outside of the data it belongs to.
    #[snafu(display("Malformed offsets at {position:#X}! Reason: {reason}"))]
    MalformedOffsets { position: u64, reason: &'static str },
    /// Thrown when the requested subsong doesn't exist.
    #[snafu(display("Subsong {requested} is out of range, the bank has {total}!"))]
    SubsongOutOfRange { requested: u32, total: u32 },
    /// Thrown when the extradata block names a codec we don't know about.
    #[snafu(display("Unknown codec subtype {subtype:#X}!"))]
    UnknownCodecSubtype { subtype: u16 },
    /// Thrown when a wave header uses a pitch value with no known sample rate.
    #[snafu(display("Unknown pitch {pitch:#04X}!"))]
    UnknownPitch { pitch: u8 },
    /// Thrown when the hashed name chunk is inconsistent. Naming is optional, so this never
    /// escapes from [`ScreamBank::parse`](crate::bank::ScreamBank::parse).
    #[snafu(display("Name table corrupted in bucket {bucket}! Reason: {reason}"))]
    NameTableCorruption { bucket: u32, reason: &'static str },
    /// Thrown when a header-only bank has no usable payload file.
    #[snafu(display("Missing companion file! Reason: {reason}"))]
    MissingCompanionFile { reason: &'static str },
    /// Thrown when a prefetch entry doesn't point at a RIFF stream.
    #[snafu(display("Unsupported prefetch payload for {hash:08X}!"))]
    UnsupportedPrefetchPayload { hash: u32 },
}
pub(crate) type Result<T> = core::result::Result<T, Error>;

impl From<data::DataError> for Error {
    #[inline]
    fn from(error: data::DataError) -> Self {
        logged(match error {
            data::DataError::EndOfFile { position, .. } => Self::MalformedOffsets {
                position: position as u64,
                reason: "Read past the end of the data",
            },
            #[cfg(feature = "std")]
            data::DataError::Io { source } => Self::FileError { source },
            _ => Self::MalformedOffsets { position: 0, reason: "Unreadable data" },
        })
    }
}

/// Logs an error before handing it back, for the fatal paths that want a record of why parsing
/// stopped.
#[inline]
pub(crate) fn logged(error: Error) -> Error {
    log::error!("{error}");
    error
}

/// Shorthand for a [`MalformedOffsets`](Error::MalformedOffsets) error at `position`.
#[inline]
pub(crate) fn malformed(position: usize, reason: &'static str) -> Error {
    logged(Error::MalformedOffsets { position: position as u64, reason })
}

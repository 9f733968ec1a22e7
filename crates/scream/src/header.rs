//! Detects the byte order of a bank, reads the section directory and resolves the `SBlk` revision.
//!
//! # Format
//! Every bank starts with a small section directory, written in the byte order of the target
//! platform (big-endian for PS3, little-endian everywhere else):
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Marker         | u32 | Always 3, which is how the byte order is detected. |
//! | 0x04 | Section count  | u32 | 2, or 3 when a prefetch (`ZLSD`) section is present. |
//! | 0x08 | SBlk offset    | u32 | Start of the metadata block. |
//! | 0x0C | SBlk size      | u32 | |
//! | 0x10 | Data offset    | u32 | Start of the stream payload. May be past the end of header-only banks. |
//! | 0x14 | Data size      | u32 | |
//! | 0x18 | ZLSD offset    | u32 | Only present with 3 sections. |
//! | 0x1C | ZLSD size      | u32 | Only present with 3 sections. |
//!
//! The `SBlk` block itself starts with its magic number and a version, which decides the layout of
//! everything else.

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use snafu::prelude::*;
use soundbank_core::prelude::*;

use crate::error::*;
use crate::layout::NameStrategy;

/// Known `SBlk` versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Revision {
    V01 = 0x01,
    V03 = 0x03,
    V04 = 0x04,
    V05 = 0x05,
    V08 = 0x08,
    V09 = 0x09,
    V0D = 0x0D,
    V0E = 0x0E,
    V0F = 0x0F,
    V10 = 0x10,
    V1A = 0x1A,
    V1C = 0x1C,
    V23 = 0x23,
}

/// Groups of revisions that share a table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Grain and wave information share a single table, and streams have no explicit size.
    Combined,
    /// Separate cue, grain, wave and name tables.
    Split,
    /// Like [`Split`](Family::Split) with wider cue entries and floating point sample rates.
    Wide,
    /// A single wave table with fixed size entries, and a hashed name chunk.
    Compact,
}

impl Revision {
    /// Returns which table layout this revision uses.
    #[inline]
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::V01 => Family::Combined,
            Self::V03 | Self::V04 | Self::V05 | Self::V08 | Self::V09 => Family::Split,
            Self::V0D | Self::V0E | Self::V0F | Self::V10 => Family::Wide,
            Self::V1A | Self::V1C | Self::V23 => Family::Compact,
        }
    }

    /// Returns how stream names are stored for this revision.
    #[inline]
    #[must_use]
    pub const fn name_strategy(self) -> NameStrategy {
        match self {
            Self::V09 | Self::V0D | Self::V0E | Self::V0F | Self::V10 => NameStrategy::LinearScan,
            Self::V1A | Self::V1C | Self::V23 => NameStrategy::HashBuckets,
            _ => NameStrategy::None,
        }
    }

    /// Returns `true` if streams start with an extradata block describing the codec.
    #[inline]
    #[must_use]
    pub const fn has_extradata(self) -> bool {
        !matches!(self, Self::V01 | Self::V03 | Self::V04 | Self::V05)
    }

    /// Returns `true` if a zero stream size means the size has to be found by scanning for the end
    /// of the PS-ADPCM stream.
    #[inline]
    #[must_use]
    pub const fn scans_for_terminator(self) -> bool {
        matches!(self, Self::V01 | Self::V03)
    }
}

impl fmt::Display for Revision {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04X}", u32::from(*self))
    }
}

/// An offset and size pair from the section directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Section {
    pub offset: usize,
    pub size: usize,
}

impl Section {
    #[inline]
    fn read<T: ReadExt>(data: &mut T) -> Result<Self> {
        Ok(Self { offset: data.read_u32()? as usize, size: data.read_u32()? as usize })
    }

    /// Returns the end of the section, or [`None`] if it would overflow.
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.size)
    }
}

/// The section directory and `SBlk` header of a bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankHeader {
    pub endian: Endian,
    pub revision: Revision,
    pub sections: u32,
    pub sblk: Section,
    pub payload: Section,
    pub prefetch: Option<Section>,
}

impl BankHeader {
    /// Value of the first field, used to detect the byte order.
    pub const MARKER: u32 = 3;
    /// Identifier for the `SBlk` block, read in the bank's byte order.
    pub const SBLK_MAGIC: u32 = u32::from_be_bytes(*b"klBS");
    /// Size of the section directory with two sections.
    const DIRECTORY_SIZE: usize = 0x18;

    /// Reads the section directory and `SBlk` header from the start of `source`.
    ///
    /// # Errors
    /// Returns [`UnrecognizedFormat`](Error::UnrecognizedFormat) if the marker, section count or
    /// `SBlk` magic are wrong, [`UnsupportedVersion`](Error::UnsupportedVersion) if the version isn't
    /// known, or [`MalformedOffsets`](Error::MalformedOffsets) if the `SBlk` block is out of bounds.
    pub fn read(source: &[u8]) -> Result<Self> {
        let endian = Self::detect_endian(source)?;
        let mut data = DataCursorRef::new(source, endian);

        data.set_position(0x04)?;
        let sections = data.read_u32()?;
        if !matches!(sections, 2 | 3) {
            return Err(logged(Error::UnrecognizedFormat { reason: "Section count must be 2 or 3" }));
        }
        let sblk = Section::read(&mut data)?;
        let payload = Section::read(&mut data)?;
        let prefetch = match sections {
            3 => Some(Section::read(&mut data)?),
            _ => None,
        };

        if !(sblk.end().is_some_and(|end| end <= source.len()) && sblk.size >= 0x08) {
            return Err(malformed(sblk.offset, "SBlk block out of bounds"));
        }
        data.set_position(sblk.offset)?;
        if data.read_u32()? != Self::SBLK_MAGIC {
            return Err(logged(Error::UnrecognizedFormat { reason: "Missing SBlk block" }));
        }
        let version = data.read_u32()?;
        let revision = Revision::try_from(version)
            .map_err(|_| logged(Error::UnsupportedVersion { version }))?;

        log::info!("Scream bank revision {revision}, {endian}, {sections} sections");
        log::debug!("SBlk at {:#X}, payload at {:#X} ({:#X} bytes)", sblk.offset, payload.offset, payload.size);

        Ok(Self { endian, revision, sections, sblk, payload, prefetch })
    }

    /// Finds the byte order in which the first field reads as [`MARKER`](Self::MARKER).
    fn detect_endian(source: &[u8]) -> Result<Endian> {
        if source.len() < Self::DIRECTORY_SIZE {
            return Err(logged(UnrecognizedFormatSnafu { reason: "File too small for a section directory" }.build()));
        }
        for endian in [Endian::Big, Endian::Little] {
            if DataCursorRef::new(source, endian).read_u32()? == Self::MARKER {
                return Ok(endian);
            }
        }
        Err(logged(UnrecognizedFormatSnafu { reason: "Unknown marker in either byte order" }.build()))
    }

    /// Returns the family of the resolved revision.
    #[inline]
    #[must_use]
    pub const fn family(&self) -> Family {
        self.revision.family()
    }
}

//! Reads the optional third section, which lists streams that are stored as standalone RIFF files
//! rather than inside the bank's own payload.
//!
//! # Format
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Magic        | u32 | "ZLSD" in little-endian banks. |
//! | 0x04 | Version      | u32 | |
//! | 0x08 | Entry count  | u32 | |
//! | 0x0C | Table offset | u32 | Relative to the start of the section. |
//!
//! Each entry is 0x10 bytes: a u32 name hash, 4 reserved bytes, then the u32 offset (relative to the
//! start of the section) and u32 size of the RIFF stream.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use soundbank_core::prelude::*;

use crate::error::*;
use crate::header::Section;

/// Prefetch section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchTable {
    /// Start of the section, which every offset is relative to.
    pub base: usize,
    pub version: u32,
    pub count: u32,
    /// Absolute position of the first entry.
    pub entries: usize,
}

/// A single prefetched stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchEntry {
    pub hash: u32,
    /// Absolute position of the RIFF stream in the main file.
    pub offset: usize,
    pub size: u32,
}

/// Channel count and sample rate from a RIFF `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiffFormat {
    pub channels: u32,
    pub sample_rate: u32,
}

impl PrefetchTable {
    /// Identifier for the prefetch section, read in the bank's byte order.
    pub const MAGIC: u32 = u32::from_be_bytes(*b"DSLZ");
    /// Size of an entry.
    pub const ENTRY_SIZE: usize = 0x10;

    /// Reads the prefetch section described by `section`. Returns [`None`] if it has no entries.
    ///
    /// # Errors
    /// Returns [`UnrecognizedFormat`](Error::UnrecognizedFormat) if the magic is wrong, or
    /// [`MalformedOffsets`](Error::MalformedOffsets) if the table is out of bounds.
    pub fn read(data: &mut DataCursorRef<'_>, section: Section) -> Result<Option<Self>> {
        let base = section.offset;
        data.set_position(base)?;
        if data.read_u32()? != Self::MAGIC {
            return Err(logged(Error::UnrecognizedFormat { reason: "Missing ZLSD block" }));
        }
        let version = data.read_u32()?;
        let count = data.read_u32()?;
        if count == 0 {
            log::debug!("Prefetch section has no entries");
            return Ok(None);
        }
        let entries = base + data.read_u32()? as usize;
        let end = (count as usize)
            .checked_mul(Self::ENTRY_SIZE)
            .and_then(|size| entries.checked_add(size));
        if !end.is_some_and(|end| end <= data.len()) {
            return Err(malformed(entries, "Prefetch table out of bounds"));
        }
        log::info!("Found {count} prefetched streams (ZLSD version {version})");
        Ok(Some(Self { base, version, count, entries }))
    }

    /// Reads entry `index`.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the entry can't be read.
    pub fn entry(&self, data: &mut DataCursorRef<'_>, index: u32) -> Result<PrefetchEntry> {
        data.set_position(self.entries + index as usize * Self::ENTRY_SIZE)?;
        let hash = data.read_u32()?;
        data.set_position(self.entries + index as usize * Self::ENTRY_SIZE + 0x08)?;
        let offset = self.base + data.read_u32()? as usize;
        let size = data.read_u32()?;
        Ok(PrefetchEntry { hash, offset, size })
    }
}

impl PrefetchEntry {
    /// Returns the name prefetched streams are known by.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{:08X}", self.hash)
    }

    /// Checks that the entry holds a RIFF stream and reads its format.
    ///
    /// # Errors
    /// Returns [`UnsupportedPrefetchPayload`](Error::UnsupportedPrefetchPayload) if the stream isn't
    /// RIFF, or [`MalformedOffsets`](Error::MalformedOffsets) if it can't be read.
    pub fn riff_format(&self, source: &[u8]) -> Result<RiffFormat> {
        let mut data = DataCursorRef::new(source, Endian::Little);
        data.set_position(self.offset)?;
        if data.read_exact::<4>()? != *b"RIFF" {
            return Err(logged(Error::UnsupportedPrefetchPayload { hash: self.hash }));
        }
        let end = self.offset.saturating_add(self.size as usize).min(source.len());
        Ok(Self::find_format(&mut data, end).unwrap_or_else(|| {
            log::debug!("No fmt chunk in prefetched stream {:08X}", self.hash);
            RiffFormat::default()
        }))
    }

    /// Walks the RIFF chunks up to `end` looking for `fmt `.
    fn find_format(data: &mut DataCursorRef<'_>, end: usize) -> Option<RiffFormat> {
        // Skip the RIFF size and form type
        let mut position = data.position() + 0x08;
        while position + 0x08 <= end {
            data.set_position(position).ok()?;
            let id = data.read_exact::<4>().ok()?;
            let size = data.read_u32().ok()? as usize;
            if id == *b"fmt " {
                let _format = data.read_u16().ok()?;
                let channels = u32::from(data.read_u16().ok()?);
                let sample_rate = data.read_u32().ok()?;
                return Some(RiffFormat { channels, sample_rate });
            }
            position = position.checked_add(0x08 + size + (size & 1))?;
        }
        None
    }
}

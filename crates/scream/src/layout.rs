//! Resolves where each table of the `SBlk` block lives, given its revision.
//!
//! Every revision stores the same kinds of tables (cues, grains, waves, names) but at different
//! positions and with different entry widths. Once resolved into a [`SectionLayout`] the rest of
//! the parser no longer cares about the revision except where the entries themselves differ.

use soundbank_core::prelude::*;

use crate::error::*;
use crate::header::{BankHeader, Family, Revision};

/// Size of a grain entry in the split and wide families.
pub const GRAIN_ENTRY_SIZE: usize = 0x08;
/// Size of a combined grain/wave entry in the combined family.
pub const COMBINED_ENTRY_SIZE: usize = 0x28;
/// Size of a wave entry in the compact family.
pub const COMPACT_WAVE_SIZE: usize = 0x10;
/// Maximum length of the bank name in the compact family.
pub const BANK_NAME_LENGTH: usize = 0x100;

/// How stream names are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// No usable names.
    None,
    /// Names belong to cues, and a grain is named after the cue whose grain range contains it.
    LinearScan,
    /// Names are keyed by wave entry id in a 32-bucket hash chunk.
    HashBuckets,
}

/// A table of fixed size entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Table {
    /// Absolute position of the first entry.
    pub offset: usize,
    pub count: u16,
    pub entry_size: usize,
    /// Position of the field of interest inside each entry.
    pub suboffset: usize,
}

impl Table {
    /// Returns the absolute position of the field of interest in entry `index`.
    #[inline]
    #[must_use]
    pub const fn entry(&self, index: usize) -> usize {
        self.offset + index * self.entry_size + self.suboffset
    }

    /// Returns the position just past the last entry.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.count as usize * self.entry_size
    }
}

/// Absolute positions of every table in the `SBlk` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLayout {
    pub family: Family,
    /// Empty for the compact family.
    pub cues: Table,
    /// For the compact family these are the wave entries themselves.
    pub grains: Table,
    /// Wave headers are addressed relative to this table. Only the count is meaningful for the
    /// combined family.
    pub waves: Table,
    pub names: NameStrategy,
    /// Position of the name table (linear scan) or the name chunk (hash buckets).
    pub name_table: Option<usize>,
    /// Position of the bank name, for the compact family.
    pub bank_name: Option<usize>,
}

impl SectionLayout {
    /// Reads the table offsets from the `SBlk` header described by `header`.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if a table lies outside of `source`.
    pub fn read(source: &[u8], header: &BankHeader) -> Result<Self> {
        let mut data = DataCursorRef::new(source, header.endian);
        let base = header.sblk.offset;
        let names = header.revision.name_strategy();

        let layout = match header.family() {
            Family::Combined => {
                let (cues, grains, waves) = Self::read_counts(&mut data, base + 0x16)?;
                let cue_table = Self::relative(&mut data, base, base + 0x1C)?;
                let grain_table = Self::relative(&mut data, base, base + 0x20)?;
                Self {
                    family: Family::Combined,
                    cues: Table { offset: cue_table, count: cues, ..Default::default() },
                    grains: Table {
                        offset: grain_table,
                        count: grains,
                        entry_size: COMBINED_ENTRY_SIZE,
                        suboffset: 0,
                    },
                    waves: Table {
                        offset: grain_table,
                        count: waves,
                        entry_size: COMBINED_ENTRY_SIZE,
                        suboffset: 0x08,
                    },
                    names,
                    name_table: None,
                    bank_name: None,
                }
            }
            Family::Split | Family::Wide => {
                let wide = header.family() == Family::Wide;
                let (cues, grains, waves) =
                    Self::read_counts(&mut data, base + if wide { 0x38 } else { 0x16 })?;
                let (cue_field, grain_field, wave_field, name_field) = match wide {
                    true => (0x18, 0x1C, 0x2C, 0x30),
                    false => (0x1C, 0x20, 0x34, 0x38),
                };
                let cue_table = Self::relative(&mut data, base, base + cue_field)?;
                let grain_table = Self::relative(&mut data, base, base + grain_field)?;
                let wave_table = Self::relative(&mut data, base, base + wave_field)?;
                data.set_position(base + name_field)?;
                let name_table = match data.read_u32()? {
                    0 => None,
                    _ => Some(Self::relative(&mut data, base, base + name_field)?),
                };
                Self {
                    family: header.family(),
                    cues: Table {
                        offset: cue_table,
                        count: cues,
                        entry_size: if wide { 0x24 } else { 0x0C },
                        suboffset: if wide { 0x0C } else { 0x08 },
                    },
                    grains: Table {
                        offset: grain_table,
                        count: grains,
                        entry_size: GRAIN_ENTRY_SIZE,
                        suboffset: 0,
                    },
                    waves: Table { offset: wave_table, count: waves, ..Default::default() },
                    names,
                    name_table: match names {
                        NameStrategy::None => None,
                        _ => name_table,
                    },
                    bank_name: None,
                }
            }
            Family::Compact => {
                let name_field = base + if header.revision == Revision::V23 { 0x20 } else { 0x1C };
                let fields = name_field + BANK_NAME_LENGTH;
                let wave_table = Self::relative(&mut data, base, fields)?;
                data.set_position(fields + 0x04)?;
                let name_chunk = match data.read_u32()? {
                    0 => None,
                    _ => Some(Self::relative(&mut data, base, fields + 0x04)?),
                };
                data.set_position(fields + 0x08)?;
                let count = data.read_u16()?;
                let waves = Table {
                    offset: wave_table,
                    count,
                    entry_size: COMPACT_WAVE_SIZE,
                    suboffset: 0,
                };
                Self {
                    family: Family::Compact,
                    cues: Table::default(),
                    grains: waves,
                    waves,
                    names,
                    name_table: name_chunk,
                    bank_name: Some(name_field),
                }
            }
        };

        layout.validate(source.len())?;
        log::debug!(
            "{} cues at {:#X}, {} grains at {:#X}, {} waves at {:#X}",
            layout.cues.count,
            layout.cues.offset,
            layout.grains.count,
            layout.grains.offset,
            layout.waves.count,
            layout.waves.offset,
        );
        Ok(layout)
    }

    /// Reads the cue, grain and wave counts at `position`.
    fn read_counts(data: &mut DataCursorRef<'_>, position: usize) -> Result<(u16, u16, u16)> {
        data.set_position(position)?;
        Ok((data.read_u16()?, data.read_u16()?, data.read_u16()?))
    }

    /// Reads the u32 at `position` as an offset relative to `base`.
    fn relative(data: &mut DataCursorRef<'_>, base: usize, position: usize) -> Result<usize> {
        data.set_position(position)?;
        let offset = data.read_u32()? as usize;
        base.checked_add(offset).ok_or_else(|| malformed(position, "Table offset overflows"))
    }

    /// Checks that every table fits inside the source.
    fn validate(&self, length: usize) -> Result<()> {
        for (table, reason) in [
            (self.cues, "Cue table out of bounds"),
            (self.grains, "Grain table out of bounds"),
            (self.waves, "Wave table out of bounds"),
        ] {
            if table.count == 0 {
                continue;
            }
            if table.offset > length || table.end() > length {
                return Err(malformed(table.offset, reason));
            }
        }
        for position in [self.name_table, self.bank_name].into_iter().flatten() {
            if position >= length {
                return Err(malformed(position, "Name table out of bounds"));
            }
        }
        Ok(())
    }
}

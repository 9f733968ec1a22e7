//! Walks the grain table to find which entries are playable streams.
//!
//! A bank's grains are the individual actions a cue performs. Only waveform grains point at audio;
//! everything else (volume changes, random picks, markers) is skipped. Subsong indices count
//! waveform grains only, in table order.
//!
//! # Format
//! In the split and wide families each grain is 8 bytes, and its first u32 packs the grain kind in
//! the upper 16 bits and the offset of its wave entry (relative to the wave table) in the lower 16
//! bits. The combined family stores the kind in the lowest byte of a 0x28-byte entry that also holds
//! the wave header, and the compact family has no grains at all, so every wave entry is a stream.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use num_enum::FromPrimitive;
use soundbank_core::prelude::*;

use crate::error::*;
use crate::header::Family;
use crate::layout::SectionLayout;

/// What a grain does when its cue is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum GrainKind {
    /// Plays a stream from the payload.
    Waveform = 0x0100,
    /// Anything else, which has no audio of its own.
    #[num_enum(catch_all)]
    Action(u16),
}

/// A single grain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainEntry {
    /// Position of the entry in the grain table.
    pub index: usize,
    pub kind: GrainKind,
    /// Absolute position of the wave header this grain plays.
    pub wave: usize,
}

impl GrainEntry {
    /// Reads grain `index` from the tables described by `layout`.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the entry can't be read.
    pub fn read(data: &mut DataCursorRef<'_>, layout: &SectionLayout, index: usize) -> Result<Self> {
        let (kind, wave) = match layout.family {
            Family::Combined => {
                data.set_position(layout.grains.entry(index))?;
                let kind = match data.read_u32()? & 0xFF {
                    0x01 => GrainKind::Waveform,
                    other => GrainKind::Action(other as u16),
                };
                (kind, layout.waves.entry(index))
            }
            Family::Split | Family::Wide => {
                data.set_position(layout.grains.entry(index))?;
                let word = data.read_u32()?;
                let kind = GrainKind::from((word >> 16) as u16);
                (kind, layout.waves.offset + (word & 0xFFFF) as usize)
            }
            Family::Compact => (GrainKind::Waveform, layout.waves.entry(index)),
        };
        Ok(Self { index, kind, wave })
    }

    /// Returns the position of this grain relative to the start of the grain table, which is how
    /// cues refer to their grains.
    #[inline]
    #[must_use]
    pub const fn table_offset(&self, layout: &SectionLayout) -> usize {
        self.index * layout.grains.entry_size
    }
}

/// Every waveform grain of a bank, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub streams: Vec<GrainEntry>,
}

impl Enumeration {
    /// Folds over the whole grain table, keeping the waveform grains.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if a grain can't be read.
    pub fn read(data: &mut DataCursorRef<'_>, layout: &SectionLayout) -> Result<Self> {
        let enumeration = (0..usize::from(layout.grains.count)).try_fold(
            Self::default(),
            |mut state, index| {
                let grain = GrainEntry::read(data, layout, index)?;
                match grain.kind {
                    GrainKind::Waveform => state.streams.push(grain),
                    GrainKind::Action(kind) => log::trace!("Skipping grain {index} of kind {kind:#06X}"),
                }
                Ok::<_, Error>(state)
            },
        )?;

        if enumeration.count() != u32::from(layout.waves.count) {
            // Common in real banks, where one wave is referenced by multiple cues
            log::warn!(
                "Found {} streams but the bank declares {} waves, streams likely repeat under multiple cues",
                enumeration.count(),
                layout.waves.count
            );
        }
        log::debug!("Found {} streams in {} grains", enumeration.count(), layout.grains.count);
        Ok(enumeration)
    }

    /// Returns the number of waveform grains.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.streams.len() as u32
    }

    /// Returns the grain for the 1-based `subsong`, if it exists.
    #[inline]
    #[must_use]
    pub fn get(&self, subsong: u32) -> Option<&GrainEntry> {
        (subsong as usize).checked_sub(1).and_then(|index| self.streams.get(index))
    }
}

//! Resolves the codec of a stream, along with its channel layout and loop points.
//!
//! Older revisions only have a PCM flag on the wave header. Newer ones put a small extradata block
//! in front of every stream, which is stripped from the stream before it's handed out.
//!
//! # Format
//! Split family (0x08, 0x09):
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Type  | u16 | 0x01 MPEG (big-endian) or PCM16 (little-endian), 0x02/0x05 ATRAC9 mono/stereo. |
//! | 0x04 | Size  | u32 | Block size minus 0x08. |
//!
//! Wide family:
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Type    | u16 | 0x00 HEVAG, 0x01/0x04 PCM16, 0x02/0x05 ATRAC9. |
//! | 0x04 | Version | u32 | Always 1. |
//! | 0x08 | Size    | u32 | Block size minus 0x10. |
//!
//! Compact family:
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Type     | u16 | Same values as the wide family. |
//! | 0x02 | Channels | u16 | |
//! | 0x04 | Size     | u32 | Block size minus 0x10. |
//! | 0x08 | Padding  | u32 | Bytes of padding after the stream. |
//!
//! The rest of the block depends on the type, see [`ExtraData::read`].

use soundbank_core::prelude::*;

use crate::error::*;
use crate::header::{Family, Revision};
use crate::wave::WaveFlags;

/// Every codec a bank may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Codec {
    /// Sony PS-ADPCM.
    Psx,
    /// High-efficiency VAG, a PS-ADPCM variant used on the Vita.
    Hevag,
    Pcm16Le,
    Pcm16Be,
    Atrac9,
    Mpeg,
    /// ATRAC9 inside a RIFF container, used by prefetched streams.
    RiffAtrac9,
}

impl Codec {
    /// Returns the PCM16 codec in the byte order of the bank.
    #[inline]
    #[must_use]
    pub const fn pcm16(endian: Endian) -> Self {
        match endian {
            Endian::Big => Self::Pcm16Be,
            _ => Self::Pcm16Le,
        }
    }

    /// Returns the number of samples in `size` bytes, if it can be known without decoding.
    #[must_use]
    pub const fn sample_count(self, size: u32, channels: u32) -> Option<u32> {
        if channels == 0 {
            return None;
        }
        match self {
            Self::Psx | Self::Hevag => Some(size / channels / 0x10 * 28),
            Self::Pcm16Le | Self::Pcm16Be => Some(size / channels / 2),
            _ => None,
        }
    }
}

/// How a stream loops, before being checked against the sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopInfo {
    #[default]
    None,
    /// Loop points in samples found in the stream itself.
    Points { start: u32, end: u32 },
    /// Loop points in samples. A negative start means the stream doesn't loop.
    Range { start: i32, length: i32 },
}

impl LoopInfo {
    /// Resolves the loop flag and points, given the stream's sample count if known.
    ///
    /// Returns `(false, 0, 0)` if the stream doesn't loop.
    #[must_use]
    pub fn normalize(self, num_samples: Option<u32>) -> (bool, u32, u32) {
        match self {
            Self::None => (false, 0, 0),
            Self::Points { start, end } if end > 0 => (true, start, end),
            Self::Points { .. } => (false, 0, 0),
            Self::Range { start, length } => {
                let Ok(start) = u32::try_from(start) else {
                    return (false, 0, 0);
                };
                let end = i64::from(start) + i64::from(length);
                match u32::try_from(end) {
                    Ok(end) if end > 0 => (true, start, end),
                    _ => (false, 0, 0),
                }
            }
        }
    }
}

/// Codec information for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraData {
    pub codec: Codec,
    /// Size of the block in front of the stream.
    pub size: u32,
    /// Padding after the stream.
    pub trailing: u32,
    /// Channel count, if stored.
    pub channels: Option<u32>,
    pub looping: LoopInfo,
    /// Fixed interleave, if the codec has one.
    pub interleave: Option<u32>,
    /// Opaque codec configuration word (ATRAC9).
    pub config: Option<u32>,
}

impl ExtraData {
    /// Describes a stream from a revision without extradata, using its wave header flags.
    ///
    /// PS-ADPCM streams keep their loop points in the frames, see [`scan_loop_points`].
    ///
    /// [`scan_loop_points`]: crate::wave::scan_loop_points
    #[must_use]
    pub fn from_flags(flags: WaveFlags, endian: Endian) -> Self {
        Self {
            codec: match flags.contains(WaveFlags::Pcm) {
                true => Codec::pcm16(endian),
                false => Codec::Psx,
            },
            size: 0,
            trailing: 0,
            channels: None,
            looping: LoopInfo::None,
            interleave: None,
            config: None,
        }
    }

    /// Reads the extradata block at the start of the stream at `start`.
    ///
    /// # Errors
    /// Returns [`UnknownCodecSubtype`](Error::UnknownCodecSubtype) for an unknown type, or
    /// [`MalformedOffsets`](Error::MalformedOffsets) if the block is inconsistent or can't be read.
    pub fn read(data: &mut DataCursorRef<'_>, revision: Revision, start: usize) -> Result<Self> {
        data.set_position(start)?;
        let subtype = data.read_u16()?;
        let extradata = match revision.family() {
            Family::Split => Self::read_split(data, start, subtype)?,
            Family::Wide => Self::read_wide(data, start, subtype)?,
            Family::Compact => Self::read_compact(data, start, subtype)?,
            Family::Combined => return Err(malformed(start, "Revision has no extradata")),
        };
        log::debug!("Stream at {start:#X} is {:?}, {:#X} bytes of extradata", extradata.codec, extradata.size);
        Ok(extradata)
    }

    fn read_split(data: &mut DataCursorRef<'_>, start: usize, subtype: u16) -> Result<Self> {
        data.set_position(start + 0x04)?;
        let size = data.read_u32()?.checked_add(0x08).ok_or_else(|| malformed(start, "Extradata too large"))?;

        match subtype {
            0x02 | 0x05 => {
                if data.read_u32()?.checked_add(0x08) != Some(size) {
                    return Err(malformed(start, "Mismatched ATRAC9 extradata size"));
                }
                let config = data.read_u32_be()?;
                data.set_position(start + 0x14)?;
                let length = data.read_i32()?;
                let start = data.read_i32()?;
                Ok(Self::atrac9(subtype, size, 0, LoopInfo::Range { start, length }, config))
            }
            0x01 => {
                let channels = data.read_u32()?;
                let start = data.read_i32()?;
                let length = data.read_i32()?;
                let codec = match data.endian() {
                    Endian::Big => Codec::Mpeg,
                    _ => Codec::Pcm16Le,
                };
                Ok(Self {
                    codec,
                    size,
                    trailing: 0,
                    channels: Some(channels),
                    looping: LoopInfo::Range { start, length },
                    interleave: None,
                    config: None,
                })
            }
            subtype => Err(logged(Error::UnknownCodecSubtype { subtype })),
        }
    }

    fn read_wide(data: &mut DataCursorRef<'_>, start: usize, subtype: u16) -> Result<Self> {
        data.set_position(start + 0x04)?;
        if data.read_u32()? != 1 {
            return Err(malformed(start + 0x04, "Unexpected extradata version"));
        }
        let size = data.read_u32()?.checked_add(0x10).ok_or_else(|| malformed(start, "Extradata too large"))?;

        match subtype {
            0x02 | 0x05 => {
                data.set_position(start + 0x10)?;
                if data.read_u32()?.checked_add(0x10) != Some(size) {
                    return Err(malformed(start, "Mismatched ATRAC9 extradata size"));
                }
                let config = data.read_u32_be()?;
                data.set_position(start + 0x24)?;
                let length = data.read_i32()?;
                let start = data.read_i32()?;
                Ok(Self::atrac9(subtype, size, 0, LoopInfo::Range { start, length }, config))
            }
            0x00 | 0x01 | 0x04 => {
                data.set_position(start + 0x14)?;
                let channels = data.read_u32()?;
                let start = data.read_i32()?;
                let length = data.read_i32()?;
                Ok(Self {
                    codec: match subtype {
                        0x00 => Codec::Hevag,
                        _ => Codec::pcm16(data.endian()),
                    },
                    size,
                    trailing: 0,
                    channels: Some(channels),
                    looping: LoopInfo::Range { start, length },
                    interleave: Some(0x02),
                    config: None,
                })
            }
            subtype => Err(logged(Error::UnknownCodecSubtype { subtype })),
        }
    }

    fn read_compact(data: &mut DataCursorRef<'_>, start: usize, subtype: u16) -> Result<Self> {
        let channels = u32::from(data.read_u16()?);
        let size = data.read_u32()?.checked_add(0x10).ok_or_else(|| malformed(start, "Extradata too large"))?;
        let trailing = data.read_u32()?;

        data.set_position(start + 0x10)?;
        match subtype {
            0x02 | 0x05 => {
                let config = data.read_u32_be()?;
                let start = data.read_i32()?;
                let length = data.read_i32()?;
                let mut extradata =
                    Self::atrac9(subtype, size, trailing, LoopInfo::Range { start, length }, config);
                if channels != 0 {
                    extradata.channels = Some(channels);
                }
                Ok(extradata)
            }
            0x00 | 0x01 | 0x04 => {
                let start = data.read_i32()?;
                let length = data.read_i32()?;
                Ok(Self {
                    codec: match subtype {
                        0x00 => Codec::Hevag,
                        _ => Codec::pcm16(data.endian()),
                    },
                    size,
                    trailing,
                    channels: Some(channels),
                    looping: LoopInfo::Range { start, length },
                    interleave: Some(0x02),
                    config: None,
                })
            }
            subtype => Err(logged(Error::UnknownCodecSubtype { subtype })),
        }
    }

    #[inline]
    fn atrac9(subtype: u16, size: u32, trailing: u32, looping: LoopInfo, config: u32) -> Self {
        Self {
            codec: Codec::Atrac9,
            size,
            trailing,
            channels: Some(if subtype == 0x02 { 1 } else { 2 }),
            looping,
            interleave: None,
            config: Some(config),
        }
    }

    /// Strips the extradata block and any trailing padding from a stream.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the stream is smaller than its
    /// extradata.
    pub fn strip(&self, offset: u32, size: u32) -> Result<(u32, u32)> {
        let stripped = size
            .checked_sub(self.size)
            .and_then(|size| size.checked_sub(self.trailing))
            .ok_or_else(|| malformed(offset as usize, "Stream smaller than its extradata"))?;
        let offset = offset.checked_add(self.size).ok_or_else(|| malformed(offset as usize, "Stream offset overflows"))?;
        Ok((offset, stripped))
    }
}

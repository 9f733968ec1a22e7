//! Reads wave headers, which locate a stream inside the payload and describe how to play it.
//!
//! # Format
//! | Family | Pitch/rate | Flags | Offset | Size | Notes |
//! |--------|------------|-------|--------|------|-------|
//! | Combined | u8 @ 0x02 | u8 @ 0x0F | u32 @ 0x10 | - | Size is the distance to the next stream. |
//! | Split    | u8 @ 0x02 | u8 @ 0x0F | u32 @ 0x10 | u32 @ 0x14 | |
//! | Wide     | f32 @ 0x4C | u8 @ 0x12 | u32 @ 0x44 | u32 @ 0x48 | |
//! | Compact  | 48000 Hz  | - | u32 @ 0x04 | u32 @ 0x08 | u16 entry id @ 0x00, used for names. |
//!
//! Older revisions don't store a sample rate but a pitch value relative to middle C, which only
//! ever took a handful of values in practice.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use bitflags::bitflags;
use soundbank_core::prelude::*;

use crate::error::*;
use crate::header::Family;

bitflags! {
    /// Flag byte of the older wave headers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WaveFlags: u8 {
        /// The stream loops. The loop points themselves are marked in the PS-ADPCM frames.
        const Loop = 0x40;
        /// The stream is PCM16 instead of PS-ADPCM.
        const Pcm = 0x80;
    }
}

/// How a wave header stores its sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateEncoding {
    Pitch(u8),
    Float(f32),
    Fixed(u32),
}

impl RateEncoding {
    /// Sample rate of every stream in compact family banks.
    pub const COMPACT_RATE: u32 = 48000;

    /// Returns the sample rate in Hz.
    ///
    /// # Errors
    /// Returns [`UnknownPitch`](Error::UnknownPitch) if a pitch value has no known sample rate.
    #[inline]
    pub fn sample_rate(self) -> Result<u32> {
        match self {
            Self::Pitch(pitch) => {
                pitch_to_sample_rate(pitch).ok_or_else(|| logged(Error::UnknownPitch { pitch }))
            }
            Self::Float(rate) => Ok(rate as u32),
            Self::Fixed(rate) => Ok(rate),
        }
    }
}

/// Converts a pitch value from the older wave headers into a sample rate.
#[must_use]
pub const fn pitch_to_sample_rate(pitch: u8) -> Option<u32> {
    Some(match pitch {
        0xC6 => 50000,
        0xC4 => 48000,
        0xC3 => 46000,
        0xC2 => 44100,
        0xBC => 36000,
        0xBA => 32000,
        0xB9 => 30000,
        0xB8 => 28000,
        0xB6 => 22050,
        0xB4 => 18000,
        0xB2 => 16000,
        0xB0 => 15000,
        0xAF => 14000,
        0xAE => 13000,
        0xAD => 12500,
        0xAC => 12000,
        0xAB => 11050,
        0xAA => 11025,
        0xA9 => 10000,
        0xA8 => 9000,
        0xA7 => 8000,
        0xA6 => 7000,
        0xA5 => 6500,
        0xA4 => 6000,
        0xA3 => 5800,
        0xA2 => 5400,
        0xA1 => 5000,
        0x9D => 4000,
        0x9C => 3500,
        _ => return None,
    })
}

/// A wave header, pointing at one stream in the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveHeader {
    /// Offset of the stream relative to the start of the payload.
    pub stream_offset: u32,
    /// Explicit size of the stream, if the revision stores one.
    pub stream_size: Option<u32>,
    pub rate: RateEncoding,
    pub flags: WaveFlags,
    /// Key into the hashed name chunk.
    pub entry_id: Option<u16>,
}

impl WaveHeader {
    /// Reads the wave header at `position`.
    ///
    /// # Errors
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the header can't be read.
    pub fn read(data: &mut DataCursorRef<'_>, family: Family, position: usize) -> Result<Self> {
        match family {
            Family::Combined | Family::Split => {
                data.set_position(position + 0x02)?;
                let pitch = data.read_u8()?;
                data.set_position(position + 0x0F)?;
                let flags = WaveFlags::from_bits_retain(data.read_u8()?);
                let stream_offset = data.read_u32()?;
                let stream_size = match family {
                    Family::Split => Some(data.read_u32()?),
                    _ => None,
                };
                Ok(Self { stream_offset, stream_size, rate: RateEncoding::Pitch(pitch), flags, entry_id: None })
            }
            Family::Wide => {
                data.set_position(position + 0x12)?;
                let flags = WaveFlags::from_bits_retain(data.read_u8()?);
                data.set_position(position + 0x44)?;
                let stream_offset = data.read_u32()?;
                let stream_size = data.read_u32()?;
                let rate = data.read_f32()?;
                Ok(Self {
                    stream_offset,
                    stream_size: Some(stream_size),
                    rate: RateEncoding::Float(rate),
                    flags,
                    entry_id: None,
                })
            }
            Family::Compact => {
                data.set_position(position)?;
                let entry_id = data.read_u16()?;
                data.set_position(position + 0x04)?;
                let stream_offset = data.read_u32()?;
                let stream_size = data.read_u32()?;
                Ok(Self {
                    stream_offset,
                    stream_size: Some(stream_size),
                    rate: RateEncoding::Fixed(RateEncoding::COMPACT_RATE),
                    flags: WaveFlags::empty(),
                    entry_id: Some(entry_id),
                })
            }
        }
    }
}

/// Returns the size of every stream from the ordered stream offsets, using `end` as the offset
/// after the last one. Streams that don't start before the next one have no usable size.
#[must_use]
pub fn implicit_sizes(offsets: &[u32], end: u32) -> Vec<Option<u32>> {
    offsets
        .iter()
        .zip(offsets.iter().skip(1).chain(core::iter::once(&end)))
        .map(|(&start, &next)| next.checked_sub(start).filter(|&size| size > 0))
        .collect()
}

/// Size of one PS-ADPCM frame.
const FRAME_SIZE: usize = 0x10;
/// Frame header that marks the last frame of a PS-ADPCM stream.
const END_FRAME: [u8; 8] = [0x00, 0x07, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77];

/// Finds the size of the PS-ADPCM stream starting at `start` by walking its frames.
///
/// The first frame is always included. Scanning stops before a frame whose first 8 bytes are all
/// zero, since that's the start of the next stream, after the end marker frame, or at the end of
/// `payload`.
#[must_use]
pub fn scan_stream_size(payload: &[u8], start: usize) -> usize {
    let frames = start
        .checked_add(FRAME_SIZE)
        .and_then(|first| payload.get(first..))
        .unwrap_or_default();

    let mut size = FRAME_SIZE;
    for frame in frames.chunks_exact(FRAME_SIZE) {
        if frame[..8] == [0; 8] {
            break;
        }
        size += FRAME_SIZE;
        if frame[..8] == END_FRAME {
            break;
        }
    }
    size
}

/// Samples decoded from one PS-ADPCM frame.
const FRAME_SAMPLES: u32 = 28;
/// Frame flag set on the first frame of a loop.
const LOOP_START_FLAG: u8 = 0x06;
/// Frame flag set on the last frame of a loop.
const LOOP_END_FLAG: u8 = 0x03;

/// Finds the loop points of a PS-ADPCM `stream` from the flag byte of its frames, in samples.
///
/// Only the first channel is walked, skipping the other channels' blocks after every `interleave`
/// bytes. A stream only loops if it has both a start and an end flag.
#[must_use]
pub fn scan_loop_points(stream: &[u8], channels: u32, interleave: u32) -> Option<(u32, u32)> {
    let (channels, interleave) = (channels as usize, interleave as usize);
    if stream.is_empty() || channels == 0 || (channels > 1 && interleave == 0) {
        return None;
    }
    // Only the low nibble is the flag, HEVAG uses the high one
    let flag_at = |offset: usize| stream.get(offset..offset.checked_add(FRAME_SIZE)?).map(|frame| frame[1] & 0x0F);

    let (mut start, mut end) = (None, None);
    let (mut offset, mut consumed, mut samples) = (0usize, 0usize, 0u32);
    while let Some(flag) = flag_at(offset) {
        if flag == LOOP_START_FLAG && start.is_none() {
            start = Some(samples);
        }
        // An end flag directly followed by a start flag in a mono stream isn't a loop end
        if flag == LOOP_END_FLAG
            && end.is_none()
            && !(channels == 1 && flag_at(offset + FRAME_SIZE) == Some(LOOP_START_FLAG))
        {
            end = Some(samples.saturating_add(FRAME_SAMPLES));
            if start.is_some() {
                break;
            }
        }

        samples = samples.saturating_add(FRAME_SAMPLES);
        offset = offset.saturating_add(FRAME_SIZE);
        consumed += FRAME_SIZE;
        if consumed >= interleave {
            consumed = 0;
            offset = offset.saturating_add(interleave.saturating_mul(channels - 1));
        }
    }
    log::trace!("Frame flags mark loop start {start:?} and end {end:?}");
    start.zip(end)
}

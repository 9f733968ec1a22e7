//! Assembles everything the other modules resolve into a single [`Subsong`] description.
//!
//! Subsongs are numbered from 1, first every waveform grain of the `SBlk` block in table order, then
//! every prefetched stream. The payload either follows the header in the same file, or for
//! header-only banks lives in a companion file (`.bnkd`) with offsets relative to its start.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

#[cfg(feature = "std")]
use std::path::Path;

use soundbank_core::prelude::*;

use crate::codec::{Codec, ExtraData, LoopInfo};
use crate::error::*;
use crate::grain::{Enumeration, GrainEntry};
use crate::header::{BankHeader, Family, Revision, Section};
use crate::layout::SectionLayout;
use crate::names;
use crate::prefetch::PrefetchTable;
use crate::wave::{self, WaveFlags, WaveHeader};

/// Which file a stream's offset refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadSource {
    /// The bank file itself.
    Main,
    /// The companion payload file of a header-only bank.
    Companion,
}

/// Everything needed to locate and start decoding one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsong {
    /// 1-based index of this subsong.
    pub index: u32,
    /// Number of subsongs in the bank, including prefetched streams.
    pub total: u32,
    /// Absolute offset of the stream in its [`payload`](Self::payload) file.
    pub stream_offset: u64,
    pub stream_size: u64,
    pub codec: Codec,
    pub channels: u32,
    pub sample_rate: u32,
    /// Known without decoding only for PS-ADPCM, HEVAG and PCM16.
    pub num_samples: Option<u32>,
    pub loop_flag: bool,
    pub loop_start: u32,
    pub loop_end: u32,
    /// Bytes per channel per block, 0 if the codec doesn't interleave.
    pub interleave: u32,
    /// Opaque codec setup word, only used by ATRAC9.
    pub codec_config: Option<u32>,
    pub bank_name: Option<String>,
    pub stream_name: Option<String>,
    /// The stream is a standalone RIFF file from the prefetch section.
    pub is_external_reference: bool,
    pub payload: PayloadSource,
    pub revision: Revision,
}

/// The stream payload of a bank, once located.
#[derive(Debug, Clone, Copy)]
struct Payload<'a> {
    data: &'a [u8],
    source: PayloadSource,
    /// Position of `data` inside its file.
    base: usize,
}

impl<'a> Payload<'a> {
    /// Finds where the payload described by `section` lives.
    fn locate(source: &'a [u8], companion: Option<&'a [u8]>, section: Section) -> Result<Self> {
        match section.end() {
            Some(end) if end <= source.len() => {
                Ok(Self { data: &source[section.offset..end], source: PayloadSource::Main, base: section.offset })
            }
            _ if section.offset >= source.len() => {
                let Some(companion) = companion else {
                    return Err(logged(Error::MissingCompanionFile {
                        reason: "Header-only bank needs its payload file",
                    }));
                };
                let Some(data) = companion.get(..section.size) else {
                    return Err(logged(Error::MissingCompanionFile {
                        reason: "Companion is smaller than the declared payload",
                    }));
                };
                log::debug!("Payload is in the companion file ({:#X} bytes)", companion.len());
                Ok(Self { data, source: PayloadSource::Companion, base: 0 })
            }
            _ => Err(malformed(section.offset, "Payload overruns the file")),
        }
    }
}

/// Everything about a bank that doesn't depend on which subsong is requested.
#[derive(Debug)]
struct Survey<'a> {
    source: &'a [u8],
    header: BankHeader,
    layout: SectionLayout,
    streams: Enumeration,
    /// Sizes derived from adjacent offsets, for revisions without explicit sizes.
    implicit_sizes: Vec<Option<u32>>,
    /// Size of each half, when two mono streams are really one stereo stream.
    stereo: Option<u32>,
    prefetch: Option<PrefetchTable>,
}

impl<'a> Survey<'a> {
    fn read(source: &'a [u8]) -> Result<Self> {
        let header = BankHeader::read(source)?;
        let layout = SectionLayout::read(source, &header)?;
        let mut data = DataCursorRef::new(source, header.endian);
        let streams = Enumeration::read(&mut data, &layout)?;

        let (implicit_sizes, stereo) = match layout.family {
            Family::Combined => {
                let offsets = streams
                    .streams
                    .iter()
                    .map(|grain| WaveHeader::read(&mut data, layout.family, grain.wave).map(|wave| wave.stream_offset))
                    .collect::<Result<Vec<_>>>()?;
                let payload_size = header.payload.size as u32;
                let sizes = wave::implicit_sizes(&offsets, payload_size);
                let stereo = match sizes.as_slice() {
                    [Some(first), _] if u64::from(*first) * 2 == u64::from(payload_size) => {
                        log::info!("Treating both streams as one stereo stream");
                        Some(*first)
                    }
                    _ => None,
                };
                (sizes, stereo)
            }
            _ => (Vec::new(), None),
        };

        let prefetch = match header.prefetch {
            Some(section) => PrefetchTable::read(&mut data, section)?,
            None => None,
        };

        Ok(Self { source, header, layout, streams, implicit_sizes, stereo, prefetch })
    }

    /// Number of streams in the `SBlk` block.
    fn main_count(&self) -> u32 {
        match self.stereo {
            Some(_) => 1,
            None => self.streams.count(),
        }
    }

    fn total(&self) -> u32 {
        self.main_count().saturating_add(self.prefetch.map_or(0, |prefetch| prefetch.count))
    }

    /// Resolves a stream from the `SBlk` block.
    fn read_main(&self, companion: Option<&[u8]>, subsong: u32, total: u32) -> Result<Subsong> {
        let grain = self
            .streams
            .get(subsong)
            .copied()
            .ok_or_else(|| logged(Error::SubsongOutOfRange { requested: subsong, total }))?;
        let payload = Payload::locate(self.source, companion, self.header.payload)?;
        let revision = self.header.revision;

        let mut data = DataCursorRef::new(self.source, self.header.endian);
        let wave = WaveHeader::read(&mut data, self.layout.family, grain.wave)?;
        let sample_rate = wave.rate.sample_rate()?;

        let (channels, stream_size) = self.stream_size(&grain, &wave, subsong, payload.data);
        let extradata = match revision.has_extradata() {
            true => {
                let mut payload_data = DataCursorRef::new(payload.data, self.header.endian);
                ExtraData::read(&mut payload_data, revision, wave.stream_offset as usize)?
            }
            false => ExtraData::from_flags(wave.flags, self.header.endian),
        };
        let (stream_offset, stream_size) = extradata.strip(wave.stream_offset, stream_size)?;

        let channels = extradata.channels.unwrap_or(channels);
        let interleave = match extradata.interleave {
            Some(interleave) => interleave,
            None if !revision.has_extradata() => stream_size / channels.max(1),
            None => 0,
        };
        let num_samples = extradata.codec.sample_count(stream_size, channels);

        let stream = (stream_offset as usize)
            .checked_add(stream_size as usize)
            .and_then(|end| payload.data.get(stream_offset as usize..end))
            .ok_or_else(|| malformed(payload.base + stream_offset as usize, "Stream runs past the end of the payload"))?;
        let looping = match extradata.codec {
            Codec::Psx => wave::scan_loop_points(stream, channels, interleave)
                .map_or(LoopInfo::None, |(start, end)| LoopInfo::Points { start, end }),
            _ => extradata.looping,
        };
        let (loop_flag, loop_start, loop_end) = looping.normalize(num_samples);
        if loop_flag && (loop_start > loop_end || num_samples.is_some_and(|samples| loop_end > samples)) {
            return Err(malformed(payload.base + stream_offset as usize, "Loop points out of order"));
        }

        let stream_name = names::stream_name(&mut data, &self.layout, &grain, &wave).unwrap_or_else(|error| {
            log::warn!("Unable to read stream name: {error}");
            None
        });

        Ok(Subsong {
            index: subsong,
            total,
            stream_offset: payload.base as u64 + u64::from(stream_offset),
            stream_size: u64::from(stream_size),
            codec: extradata.codec,
            channels,
            sample_rate,
            num_samples,
            loop_flag,
            loop_start,
            loop_end,
            interleave,
            codec_config: extradata.config,
            bank_name: None,
            stream_name,
            is_external_reference: false,
            payload: payload.source,
            revision,
        })
    }

    /// Returns the channel count and size of a stream before any extradata is stripped.
    fn stream_size(&self, grain: &GrainEntry, wave: &WaveHeader, subsong: u32, payload: &[u8]) -> (u32, u32) {
        if let Some(mono) = self.stereo {
            return (2, mono * 2);
        }
        let revision = self.header.revision;
        let size = match self.layout.family {
            Family::Combined => self.implicit_sizes.get(subsong as usize - 1).copied().flatten(),
            _ => wave.stream_size,
        };
        let scan = match size {
            None => true,
            Some(0) => revision.scans_for_terminator() && !wave.flags.contains(WaveFlags::Pcm),
            Some(_) => false,
        };
        match (scan, size) {
            (true, _) => {
                let size = wave::scan_stream_size(payload, wave.stream_offset as usize) as u32;
                log::debug!("Grain {} has no size, scanned {size:#X} bytes of frames", grain.index);
                (1, size)
            }
            (false, size) => (1, size.unwrap_or(0)),
        }
    }

    /// Resolves a stream from the prefetch section.
    fn read_external(&self, index: u32, subsong: u32, total: u32) -> Result<Subsong> {
        let prefetch = self
            .prefetch
            .ok_or_else(|| logged(Error::SubsongOutOfRange { requested: subsong, total }))?;
        let mut data = DataCursorRef::new(self.source, self.header.endian);
        let entry = prefetch.entry(&mut data, index)?;
        log::debug!("Subsong {subsong} is prefetched stream {:08X}", entry.hash);

        let end = entry.offset as u64 + u64::from(entry.size);
        if end > self.source.len() as u64 {
            return Err(malformed(entry.offset, "Prefetched stream runs past the end of the file"));
        }
        let format = entry.riff_format(self.source)?;

        Ok(Subsong {
            index: subsong,
            total,
            stream_offset: entry.offset as u64,
            stream_size: u64::from(entry.size),
            codec: Codec::RiffAtrac9,
            channels: format.channels,
            sample_rate: format.sample_rate,
            num_samples: None,
            loop_flag: false,
            loop_start: 0,
            loop_end: 0,
            interleave: 0,
            codec_config: None,
            bank_name: None,
            stream_name: Some(entry.name()),
            is_external_reference: true,
            payload: PayloadSource::Main,
            revision: self.header.revision,
        })
    }
}

/// Reader for Scream Tool sound banks.
pub struct ScreamBank;

impl ScreamBank {
    /// Extension of the payload file that accompanies header-only banks.
    pub const COMPANION_EXTENSION: &'static str = "bnkd";

    /// Describes the 1-based `subsong` of the bank in `source`.
    ///
    /// `companion` is only needed for header-only banks, whose payload lives in a separate file.
    ///
    /// # Errors
    /// Returns [`SubsongOutOfRange`](Error::SubsongOutOfRange) if `subsong` is 0 or past the last
    /// subsong, [`MissingCompanionFile`](Error::MissingCompanionFile) if a header-only bank has no
    /// usable companion, or any error from reading the header, tables or codec information.
    pub fn parse(source: &[u8], companion: Option<&[u8]>, subsong: u32) -> Result<Subsong> {
        let survey = Survey::read(source)?;
        let total = survey.total();
        if subsong == 0 || subsong > total {
            return Err(logged(Error::SubsongOutOfRange { requested: subsong, total }));
        }

        let main_count = survey.main_count();
        log::info!("Reading subsong {subsong} of {total} ({main_count} in the bank)");
        let mut subsong = match subsong > main_count {
            true => survey.read_external(subsong - main_count - 1, subsong, total)?,
            false => survey.read_main(companion, subsong, total)?,
        };

        let mut data = DataCursorRef::new(source, survey.header.endian);
        subsong.bank_name = names::bank_name(&mut data, &survey.layout).unwrap_or_else(|error| {
            log::warn!("Unable to read bank name: {error}");
            None
        });
        Ok(subsong)
    }

    /// Returns the number of subsongs in the bank in `source`, including prefetched streams.
    ///
    /// # Errors
    /// Returns an error if the header or tables can't be read.
    pub fn count(source: &[u8]) -> Result<u32> {
        Survey::read(source).map(|survey| survey.total())
    }

    /// Loads the bank at `path` and describes its 1-based `subsong`. The companion file is only
    /// loaded for header-only banks.
    ///
    /// # Errors
    /// Returns [`FileError`](Error::FileError) if a file can't be read, otherwise the same errors
    /// as [`parse`](Self::parse).
    #[cfg(feature = "std")]
    pub fn open<P: AsRef<Path>>(path: P, subsong: u32) -> Result<Subsong> {
        let source = FileSource::open(path)?;
        log::info!("Loading Scream bank from {}", source.path().display());
        let header = BankHeader::read(source.data())?;
        let companion = match header.payload.offset >= source.data().len() {
            true => source.open_companion(Self::COMPANION_EXTENSION)?,
            false => None,
        };
        Self::parse(source.data(), companion.as_ref().map(FileSource::data), subsong)
    }
}

impl FileIdentifier for ScreamBank {
    fn identify(data: &[u8]) -> Option<FileInfo> {
        let header = BankHeader::read(data).ok()?;
        let info = format!("Scream Tool sound bank (SBlk {}, {})", header.revision, header.endian);
        Some(FileInfo::new(info, None))
    }

    fn identify_deep(data: &[u8]) -> Option<FileInfo> {
        let survey = Survey::read(data).ok()?;
        let info = format!(
            "Scream Tool sound bank (SBlk {}, {}, payload {})",
            survey.header.revision,
            survey.header.endian,
            util::format_size(survey.header.payload.size as u64)
        );
        Some(FileInfo::new(info, Some(survey.total())))
    }
}

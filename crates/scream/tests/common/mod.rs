//! Builders for small synthetic banks, so each test can describe only the tables it cares about.
#![allow(dead_code)]

use soundbank_core::prelude::*;

pub const SBLK_MAGIC: u32 = u32::from_be_bytes(*b"klBS");
pub const ZLSD_MAGIC: u32 = u32::from_be_bytes(*b"DSLZ");
/// Where every builder puts the `SBlk` block.
pub const SBLK_OFFSET: usize = 0x20;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Appends fields in a fixed byte order.
#[derive(Debug, Clone)]
pub struct Writer {
    pub bytes: Vec<u8>,
    pub endian: Endian,
}

impl Writer {
    pub fn new(endian: Endian) -> Self {
        Self { bytes: Vec::new(), endian }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        let bytes = match self.endian {
            Endian::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        };
        self.raw(&bytes)
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        let bytes = match self.endian {
            Endian::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        };
        self.raw(&bytes)
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.u32(value as u32)
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.u32(value.to_bits())
    }

    pub fn u32_be(&mut self, value: u32) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    pub fn pad_to(&mut self, length: usize) -> &mut Self {
        assert!(self.bytes.len() <= length, "writer already past {length:#X}");
        self.bytes.resize(length, 0);
        self
    }
}

fn align(value: usize) -> usize {
    (value + 0x0F) & !0x0F
}

/// Wraps an `SBlk` block, a payload and an optional prefetch section in a section directory.
pub fn assemble(endian: Endian, sblk: &[u8], payload: &[u8], prefetch: Option<&[u8]>) -> Vec<u8> {
    let data_offset = align(SBLK_OFFSET + sblk.len());
    let prefetch_offset = align(data_offset + payload.len());

    let mut w = Writer::new(endian);
    w.u32(3).u32(if prefetch.is_some() { 3 } else { 2 });
    w.u32(SBLK_OFFSET as u32).u32(sblk.len() as u32);
    w.u32(data_offset as u32).u32(payload.len() as u32);
    if let Some(prefetch) = prefetch {
        w.u32(prefetch_offset as u32).u32(prefetch.len() as u32);
    }
    w.pad_to(SBLK_OFFSET).raw(sblk).pad_to(data_offset).raw(payload);
    if let Some(prefetch) = prefetch {
        w.pad_to(prefetch_offset).raw(prefetch);
    }
    w.bytes
}

/// Like [`assemble`], but the payload is left out and expected in a companion file.
pub fn assemble_header_only(endian: Endian, sblk: &[u8], payload_size: usize) -> Vec<u8> {
    let data_offset = SBLK_OFFSET + sblk.len();
    let mut w = Writer::new(endian);
    w.u32(3).u32(2);
    w.u32(SBLK_OFFSET as u32).u32(sblk.len() as u32);
    w.u32(data_offset as u32).u32(payload_size as u32);
    w.pad_to(SBLK_OFFSET).raw(sblk);
    w.bytes
}

/// Returns where the payload starts in a bank built by [`assemble`].
pub fn payload_offset(sblk: &[u8]) -> u64 {
    align(SBLK_OFFSET + sblk.len()) as u64
}

/// Stream body filler, so that the terminator scan never sees an empty frame.
pub fn body(length: usize) -> Vec<u8> {
    vec![0x11; length]
}

/// Like [`body`], with the flag byte of some PS-ADPCM frames replaced, as `(frame, flag)`.
pub fn psx_frames(length: usize, flags: &[(usize, u8)]) -> Vec<u8> {
    let mut stream = body(length);
    for &(frame, flag) in flags {
        stream[frame * 0x10 + 1] = flag;
    }
    stream
}

/// A cue covering `grains` grain entries starting at byte offset `first` of the grain table.
#[derive(Debug, Clone)]
pub struct Cue {
    pub first: u16,
    pub grains: u8,
    pub name: &'static str,
}

fn write_name_table(w: &mut Writer, bank_name: &str, cues: &[Cue]) {
    let start = w.len();
    w.raw(bank_name.as_bytes()).pad_to(start + 0x08).u32(0x10).u32(0);
    let mut string = 0u32;
    for (index, cue) in cues.iter().enumerate() {
        w.u32(string).zeros(0x08).i32(index as i32);
        string += cue.name.len() as u32 + 1;
    }
    for cue in cues {
        w.raw(cue.name.as_bytes()).u8(0);
    }
}

/// Waveform grain kind.
pub const WAVEFORM: u16 = 0x0100;

// Split family (0x03 - 0x09)

pub const SPLIT_WAVE_SIZE: usize = 0x18;

#[derive(Debug, Clone)]
pub struct SplitWave {
    pub pitch: u8,
    pub flags: u8,
    /// Stored size, defaults to the stream length.
    pub size: Option<u32>,
    pub stream: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SplitBank {
    pub endian: Endian,
    pub version: u32,
    /// Grain kind and wave index.
    pub grains: Vec<(u16, u16)>,
    pub waves: Vec<SplitWave>,
    pub cues: Vec<Cue>,
    pub bank_name: &'static str,
}

impl SplitBank {
    pub fn sblk(&self) -> Vec<u8> {
        let cue_table = 0x40;
        let grain_table = cue_table + self.cues.len() * 0x0C;
        let wave_table = grain_table + self.grains.len() * 0x08;
        let name_table = wave_table + self.waves.len() * SPLIT_WAVE_SIZE;

        let mut w = Writer::new(self.endian);
        w.u32(SBLK_MAGIC).u32(self.version).pad_to(0x16);
        w.u16(self.cues.len() as u16).u16(self.grains.len() as u16).u16(self.waves.len() as u16);
        w.u32(cue_table as u32).u32(grain_table as u32).pad_to(0x34);
        w.u32(wave_table as u32).u32(if self.cues.is_empty() { 0 } else { name_table as u32 });
        w.pad_to(0x40);

        for cue in &self.cues {
            let start = w.len();
            w.pad_to(start + 0x08).u16(cue.first).u8(cue.grains).pad_to(start + 0x0C);
        }
        for &(kind, wave) in &self.grains {
            w.u32(u32::from(kind) << 16 | u32::from(wave) * SPLIT_WAVE_SIZE as u32).u32(0);
        }
        let mut offset = 0u32;
        for wave in &self.waves {
            let start = w.len();
            w.pad_to(start + 0x02).u8(wave.pitch).pad_to(start + 0x0F).u8(wave.flags);
            w.u32(offset).u32(wave.size.unwrap_or(wave.stream.len() as u32));
            offset += wave.stream.len() as u32;
        }
        if !self.cues.is_empty() {
            write_name_table(&mut w, self.bank_name, &self.cues);
        }
        w.bytes
    }

    pub fn payload(&self) -> Vec<u8> {
        self.waves.iter().flat_map(|wave| wave.stream.iter().copied()).collect()
    }

    pub fn build(&self) -> Vec<u8> {
        assemble(self.endian, &self.sblk(), &self.payload(), None)
    }
}

/// ATRAC9 extradata for split revisions, followed by `body` bytes.
pub fn split_atrac9(endian: Endian, stereo: bool, config: u32, loop_start: i32, loop_length: i32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(if stereo { 0x05 } else { 0x02 }).u16(0).u32(0x14);
    w.u32(0x14).u32_be(config).u32(0).i32(loop_length).i32(loop_start);
    w.raw(&self::body(body));
    w.bytes
}

/// Type 0x01 extradata for split revisions, MPEG in big-endian banks and PCM16 otherwise.
pub fn split_type_one(endian: Endian, channels: u32, loop_start: i32, loop_length: i32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(0x01).u16(0).u32(0x10).u32(channels).i32(loop_start).i32(loop_length).u32(0);
    w.raw(&self::body(body));
    w.bytes
}

// Wide family (0x0D - 0x10)

pub const WIDE_WAVE_SIZE: usize = 0x50;

#[derive(Debug, Clone)]
pub struct WideWave {
    pub rate: f32,
    pub flags: u8,
    pub stream: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct WideBank {
    pub endian: Endian,
    pub version: u32,
    /// Grain kind and wave index.
    pub grains: Vec<(u16, u16)>,
    pub waves: Vec<WideWave>,
    pub cues: Vec<Cue>,
    pub bank_name: &'static str,
}

impl WideBank {
    pub fn sblk(&self) -> Vec<u8> {
        let cue_table = 0x40;
        let grain_table = cue_table + self.cues.len() * 0x24;
        let wave_table = grain_table + self.grains.len() * 0x08;
        let name_table = wave_table + self.waves.len() * WIDE_WAVE_SIZE;

        let mut w = Writer::new(self.endian);
        w.u32(SBLK_MAGIC).u32(self.version).pad_to(0x18);
        w.u32(cue_table as u32).u32(grain_table as u32).pad_to(0x2C);
        w.u32(wave_table as u32).u32(if self.cues.is_empty() { 0 } else { name_table as u32 });
        w.pad_to(0x38);
        w.u16(self.cues.len() as u16).u16(self.grains.len() as u16).u16(self.waves.len() as u16);
        w.pad_to(0x40);

        for cue in &self.cues {
            let start = w.len();
            w.pad_to(start + 0x0C).u16(cue.first).u8(cue.grains).pad_to(start + 0x24);
        }
        for &(kind, wave) in &self.grains {
            w.u32(u32::from(kind) << 16 | u32::from(wave) * WIDE_WAVE_SIZE as u32).u32(0);
        }
        let mut offset = 0u32;
        for wave in &self.waves {
            let start = w.len();
            w.pad_to(start + 0x12).u8(wave.flags).pad_to(start + 0x44);
            w.u32(offset).u32(wave.stream.len() as u32).f32(wave.rate);
            offset += wave.stream.len() as u32;
        }
        if !self.cues.is_empty() {
            write_name_table(&mut w, self.bank_name, &self.cues);
        }
        w.bytes
    }

    pub fn payload(&self) -> Vec<u8> {
        self.waves.iter().flat_map(|wave| wave.stream.iter().copied()).collect()
    }

    pub fn build(&self) -> Vec<u8> {
        assemble(self.endian, &self.sblk(), &self.payload(), None)
    }
}

/// HEVAG (type 0x00) or PCM16 (type 0x01) extradata for wide revisions, followed by `body` bytes.
pub fn wide_pcm(endian: Endian, subtype: u16, channels: u32, loop_start: i32, loop_length: i32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(subtype).u16(0).u32(1).u32(0x10).u32(0);
    w.u32(0).u32(channels).i32(loop_start).i32(loop_length);
    w.raw(&self::body(body));
    w.bytes
}

/// ATRAC9 extradata for wide revisions, followed by `body` bytes.
pub fn wide_atrac9(endian: Endian, stereo: bool, config: u32, loop_start: i32, loop_length: i32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(if stereo { 0x05 } else { 0x02 }).u16(0).u32(1).u32(0x70).u32(0);
    w.u32(0x70).u32_be(config).pad_to(0x24).i32(loop_length).i32(loop_start).pad_to(0x80);
    w.raw(&self::body(body));
    w.bytes
}

// Combined family (0x01)

#[derive(Debug, Clone)]
pub struct CombinedEntry {
    pub kind: u8,
    pub pitch: u8,
    pub flags: u8,
    pub offset: u32,
}

pub fn combined_sblk(endian: Endian, entries: &[CombinedEntry], waves: u16) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u32(SBLK_MAGIC).u32(0x01).pad_to(0x16);
    w.u16(0).u16(entries.len() as u16).u16(waves);
    w.u32(0x40).u32(0x40).pad_to(0x40);
    for entry in entries {
        let start = w.len();
        w.u32(u32::from(entry.kind));
        w.pad_to(start + 0x08 + 0x02).u8(entry.pitch);
        w.pad_to(start + 0x08 + 0x0F).u8(entry.flags).u32(entry.offset);
        w.pad_to(start + 0x28);
    }
    w.bytes
}

// Compact family (0x1A - 0x23)

#[derive(Debug, Clone)]
pub struct CompactWave {
    pub entry_id: u16,
    pub stream: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CompactBank {
    pub endian: Endian,
    pub version: u32,
    pub bank_name: &'static str,
    pub waves: Vec<CompactWave>,
    /// Wave entry id and name.
    pub names: Vec<(u16, &'static str)>,
}

/// Bucket of a name in the hashed name chunk.
pub fn bucket_of(name: &str) -> usize {
    let bytes = name.as_bytes();
    let byte = |index: usize| usize::from(bytes.get(index).copied().unwrap_or(0));
    (byte(0) + byte(4) + byte(8) + byte(12)) % 32
}

impl CompactBank {
    pub fn name_field(&self) -> usize {
        if self.version == 0x23 { 0x20 } else { 0x1C }
    }

    pub fn sblk(&self) -> Vec<u8> {
        let fields = self.name_field() + 0x100;
        let wave_table = fields + 0x10;
        let name_chunk = wave_table + self.waves.len() * 0x10;

        let mut w = Writer::new(self.endian);
        w.u32(SBLK_MAGIC).u32(self.version).pad_to(self.name_field());
        w.raw(self.bank_name.as_bytes()).pad_to(fields);
        w.u32(wave_table as u32).u32(if self.names.is_empty() { 0 } else { name_chunk as u32 });
        w.u16(self.waves.len() as u16).pad_to(wave_table);

        let mut offset = 0u32;
        for wave in &self.waves {
            w.u16(wave.entry_id).u16(0).u32(offset).u32(wave.stream.len() as u32).u32(0);
            offset += wave.stream.len() as u32;
        }
        if !self.names.is_empty() {
            w.raw(&name_chunk_bytes(self.endian, &self.names));
        }
        w.bytes
    }

    pub fn payload(&self) -> Vec<u8> {
        self.waves.iter().flat_map(|wave| wave.stream.iter().copied()).collect()
    }

    pub fn build(&self) -> Vec<u8> {
        assemble(self.endian, &self.sblk(), &self.payload(), None)
    }

    pub fn build_with_prefetch(&self, prefetch: &[u8]) -> Vec<u8> {
        assemble(self.endian, &self.sblk(), &self.payload(), Some(prefetch))
    }

    pub fn build_header_only(&self) -> Vec<u8> {
        assemble_header_only(self.endian, &self.sblk(), self.payload().len())
    }
}

/// Builds a name chunk with every name chained into its own bucket, in order.
pub fn name_chunk_bytes(endian: Endian, names: &[(u16, &str)]) -> Vec<u8> {
    let mut order: Vec<(usize, u16, &str)> =
        names.iter().map(|&(entry_id, name)| (bucket_of(name), entry_id, name)).collect();
    order.sort_by_key(|&(bucket, ..)| bucket);

    let records = 0x10 + 32 * 2;
    let strings = records + order.len() * 0x08;
    let mut w = Writer::new(endian);
    w.u32(32).u32(order.len() as u32).u32(records as u32).u32(strings as u32);
    for bucket in 0..32 {
        let head = order.iter().position(|&(other, ..)| other == bucket);
        w.u16(head.map_or(0xFFFF, |head| head as u16));
    }
    let mut string = 0u32;
    for (index, &(bucket, entry_id, name)) in order.iter().enumerate() {
        let next = match order.get(index + 1) {
            Some(&(other, ..)) if other == bucket => (index + 1) as u16,
            _ => 0xFFFF,
        };
        w.u32(string).u16(next).u16(entry_id);
        string += name.len() as u32 + 1;
    }
    for &(_, _, name) in &order {
        w.raw(name.as_bytes()).u8(0);
    }
    w.bytes
}

/// ATRAC9 (type 0x02/0x05) extradata for compact revisions, followed by `body` and `trailing` bytes.
pub fn compact_atrac9(
    endian: Endian, channels: u16, config: u32, loop_start: i32, loop_length: i32, body: usize, trailing: usize,
) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(if channels == 1 { 0x02 } else { 0x05 }).u16(channels).u32(0x10).u32(trailing as u32).u32(0);
    w.u32_be(config).i32(loop_start).i32(loop_length).u32(0);
    w.raw(&self::body(body)).zeros(trailing);
    w.bytes
}

/// HEVAG (type 0x00) or PCM16 (type 0x01/0x04) extradata for compact revisions.
pub fn compact_pcm(endian: Endian, subtype: u16, channels: u16, loop_start: i32, loop_length: i32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(endian);
    w.u16(subtype).u16(channels).u32(0x10).u32(0).u32(0);
    w.i32(loop_start).i32(loop_length).zeros(0x08);
    w.raw(&self::body(body));
    w.bytes
}

// Prefetch section

/// A minimal RIFF/WAVE file with a `fmt ` chunk.
pub fn riff(channels: u16, sample_rate: u32, body: usize) -> Vec<u8> {
    let mut w = Writer::new(Endian::Little);
    w.raw(b"RIFF").u32((0x04 + 0x18 + 0x08 + body) as u32).raw(b"WAVE");
    w.raw(b"fmt ").u32(0x10).u16(0xFFFE).u16(channels).u32(sample_rate);
    w.u32(sample_rate * u32::from(channels)).u16(channels * 2).u16(16);
    w.raw(b"data").u32(body as u32).raw(&self::body(body));
    w.bytes
}

/// Builds a prefetch section holding each `(hash, stream)` pair.
pub fn zlsd(endian: Endian, entries: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let table = 0x10;
    let mut offset = table + entries.len() * 0x10;
    let mut w = Writer::new(endian);
    w.u32(ZLSD_MAGIC).u32(0).u32(entries.len() as u32).u32(table as u32);
    for (hash, stream) in entries {
        w.u32(*hash).u32(0).u32(offset as u32).u32(stream.len() as u32);
        offset += stream.len();
    }
    for (_, stream) in entries {
        w.raw(stream);
    }
    w.bytes
}

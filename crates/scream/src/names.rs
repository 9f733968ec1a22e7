//! Resolves bank and stream names.
//!
//! Names are a convenience, so nothing in here is allowed to fail a parse. The two public entry
//! points return errors so they can be tested, and the bank assembler logs them and moves on.
//!
//! # Linear scan
//! Split (0x09) and wide revisions name cues, not grains. Each cue lists a range of the grain table
//! (a u16 byte offset followed by a u8 grain count), and a stream takes the name of the first cue
//! whose range contains its grain. The name table has the layout:
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Bank name   | u8\[8\] | NUL-terminated unless it fills the field. |
//! | 0x08 | Header size | u32 | Offset of the first entry. |
//! | 0x0C | Table size  | u32 | |
//!
//! Followed by one 0x10-byte entry per cue, holding the string offset at 0x00 (relative to the end
//! of the entries) and the cue index at 0x0C.
//!
//! # Hash buckets
//! Compact revisions store names in a chunk of 32 hash buckets, each a singly linked list of
//! records keyed by wave entry id:
//!
//! | Offset | Field | Type | Notes |
//! |--------|-------|------|-------|
//! | 0x00 | Bucket count  | u32 | Always 32. |
//! | 0x04 | Record count  | u32 | |
//! | 0x08 | Records       | u32 | Offset relative to the chunk. |
//! | 0x0C | Strings       | u32 | Offset relative to the chunk. |
//! | 0x10 | Heads         | u16\[32\] | First record of each bucket, 0xFFFF if empty. |
//!
//! Records are 8 bytes: a u32 string offset, the u16 index of the next record (0xFFFF ends the
//! chain) and the u16 wave entry id. A name belongs in bucket `(n[0] + n[4] + n[8] + n[12]) % 32`,
//! with bytes past the end of the name counting as zero.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use smallvec::SmallVec;
use snafu::prelude::*;
use soundbank_core::prelude::*;

use crate::error::*;
use crate::grain::GrainEntry;
use crate::layout::{NameStrategy, SectionLayout, BANK_NAME_LENGTH, GRAIN_ENTRY_SIZE};
use crate::wave::WaveHeader;

/// Longest stream name we're willing to read.
pub const MAX_NAME_LENGTH: usize = 0x100;
/// Length of the bank name field in the linear name table.
const TABLE_BANK_NAME_LENGTH: usize = 0x08;
/// Size of an entry in the linear name table.
const NAME_ENTRY_SIZE: usize = 0x10;

/// Reads the name of the bank itself.
///
/// # Errors
/// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the name can't be read.
pub fn bank_name(data: &mut DataCursorRef<'_>, layout: &SectionLayout) -> Result<Option<String>> {
    let name = match (layout.bank_name, layout.names, layout.name_table) {
        (Some(position), ..) => {
            data.set_position(position)?;
            data.read_cstring(BANK_NAME_LENGTH)?
        }
        (None, NameStrategy::LinearScan, Some(table)) => {
            data.set_position(table)?;
            data.read_cstring(TABLE_BANK_NAME_LENGTH)?
        }
        _ => return Ok(None),
    };
    Ok(Some(name).filter(|name| !name.is_empty()))
}

/// Reads the name of the stream played by `grain`.
///
/// # Errors
/// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the name tables point out of bounds, or
/// [`NameTableCorruption`](Error::NameTableCorruption) if the hashed name chunk is inconsistent.
pub fn stream_name(
    data: &mut DataCursorRef<'_>, layout: &SectionLayout, grain: &GrainEntry, wave: &WaveHeader,
) -> Result<Option<String>> {
    let Some(table) = layout.name_table else {
        return Ok(None);
    };
    match layout.names {
        NameStrategy::None => Ok(None),
        NameStrategy::LinearScan => {
            let Some(cue) = owning_cue(data, layout, grain.table_offset(layout))? else {
                log::debug!("No cue owns grain {}", grain.index);
                return Ok(None);
            };
            cue_name(data, layout, table, cue)
        }
        NameStrategy::HashBuckets => {
            let Some(entry_id) = wave.entry_id else {
                return Ok(None);
            };
            let chunk = NameChunk::read(data, table)?;
            Ok(chunk.lookup(entry_id).map(ToString::to_string))
        }
    }
}

/// Finds the first cue whose grain range contains `grain_offset`.
fn owning_cue(
    data: &mut DataCursorRef<'_>, layout: &SectionLayout, grain_offset: usize,
) -> Result<Option<usize>> {
    for cue in 0..usize::from(layout.cues.count) {
        data.set_position(layout.cues.entry(cue))?;
        let first = usize::from(data.read_u16()?);
        let count = usize::from(data.read_u8()?);
        if (first..first + count * GRAIN_ENTRY_SIZE).contains(&grain_offset) {
            return Ok(Some(cue));
        }
    }
    Ok(None)
}

/// Looks up the name of `cue` in the linear name table at `table`.
fn cue_name(
    data: &mut DataCursorRef<'_>, layout: &SectionLayout, table: usize, cue: usize,
) -> Result<Option<String>> {
    data.set_position(table + TABLE_BANK_NAME_LENGTH)?;
    let entries = table + data.read_u32()? as usize;
    let strings = entries + usize::from(layout.cues.count) * NAME_ENTRY_SIZE;

    for index in 0..usize::from(layout.cues.count) {
        let entry = entries + index * NAME_ENTRY_SIZE;
        data.set_position(entry + 0x0C)?;
        if usize::try_from(data.read_i32()?) != Ok(cue) {
            continue;
        }
        data.set_position(entry)?;
        let string = strings + data.read_u32()? as usize;
        data.set_position(string)?;
        let name = data.read_cstring(MAX_NAME_LENGTH)?;
        return Ok(Some(name).filter(|name| !name.is_empty()));
    }
    Ok(None)
}

/// Number of buckets in a name chunk.
pub const BUCKET_COUNT: usize = 32;
/// Marks an empty bucket or the end of a chain.
const NO_RECORD: u16 = 0xFFFF;
/// Size of a record in the name chunk.
const RECORD_SIZE: usize = 0x08;

/// Returns the bucket a name is stored in.
#[inline]
#[must_use]
pub fn bucket_of(name: &[u8]) -> u32 {
    let byte = |index: usize| u32::from(name.get(index).copied().unwrap_or(0));
    (byte(0) + byte(4) + byte(8) + byte(12)) % BUCKET_COUNT as u32
}

/// One named wave entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub entry_id: u16,
    pub name: String,
}

/// A decoded hash-bucket name chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameChunk {
    buckets: [SmallVec<[NameRecord; 4]>; BUCKET_COUNT],
}

/// Shorthand for a logged [`NameTableCorruption`](Error::NameTableCorruption) error in `bucket`.
fn corrupted(bucket: u32, reason: &'static str) -> Error {
    logged(NameTableCorruptionSnafu { bucket, reason }.build())
}

impl NameChunk {
    /// Decodes the name chunk at `offset`, following every bucket's chain once.
    ///
    /// # Errors
    /// Returns [`NameTableCorruption`](Error::NameTableCorruption) if the bucket count is wrong, a
    /// chain points out of range or loops back on itself, or a name is stored in the wrong bucket.
    /// Returns [`MalformedOffsets`](Error::MalformedOffsets) if the chunk can't be read.
    pub fn read(data: &mut DataCursorRef<'_>, offset: usize) -> Result<Self> {
        data.set_position(offset)?;
        let bucket_count = data.read_u32()?;
        if bucket_count as usize != BUCKET_COUNT {
            return Err(corrupted(bucket_count, "Unexpected bucket count"));
        }
        let record_count = data.read_u32()? as usize;
        let records = offset + data.read_u32()? as usize;
        let strings = offset + data.read_u32()? as usize;
        let mut heads = [NO_RECORD; BUCKET_COUNT];
        for head in &mut heads {
            *head = data.read_u16()?;
        }
        let fits = record_count
            .checked_mul(RECORD_SIZE)
            .and_then(|size| records.checked_add(size))
            .is_some_and(|end| end <= data.len());
        if !fits {
            return Err(malformed(records, "Name records out of bounds"));
        }

        let mut chunk = Self::default();
        let mut visited = vec![false; record_count];
        for (bucket, &head) in (0u32..).zip(heads.iter()) {
            let mut next = head;
            while next != NO_RECORD {
                let index = usize::from(next);
                if index >= record_count {
                    return Err(corrupted(bucket, "Record index out of range"));
                }
                if visited[index] {
                    return Err(corrupted(bucket, "Record chain loops"));
                }
                visited[index] = true;

                data.set_position(records + index * RECORD_SIZE)?;
                let string = strings + data.read_u32()? as usize;
                next = data.read_u16()?;
                let entry_id = data.read_u16()?;

                data.set_position(string)?;
                let name = data.read_cstr(MAX_NAME_LENGTH)?;
                if name.is_empty() {
                    break;
                }
                if bucket_of(name) != bucket {
                    log::warn!(
                        "Name {:?} belongs in bucket {} but was found in bucket {bucket}",
                        String::from_utf8_lossy(name),
                        bucket_of(name)
                    );
                    return Err(corrupted(bucket, "Name stored in the wrong bucket"));
                }
                let name = String::from_utf8_lossy(name).into_owned();
                chunk.buckets[bucket as usize].push(NameRecord { entry_id, name });
            }
        }
        Ok(chunk)
    }

    /// Returns the records stored in `bucket`, in chain order.
    #[inline]
    #[must_use]
    pub fn bucket(&self, bucket: u32) -> &[NameRecord] {
        self.buckets.get(bucket as usize).map(SmallVec::as_slice).unwrap_or_default()
    }

    /// Returns the name of wave entry `entry_id`, searching every bucket.
    #[must_use]
    pub fn lookup(&self, entry_id: u16) -> Option<&str> {
        self.buckets
            .iter()
            .flatten()
            .find(|record| record.entry_id == entry_id)
            .map(|record| record.name.as_str())
    }

    /// Returns the total number of names.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(SmallVec::len).sum()
    }

    /// Returns `true` if there are no names.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

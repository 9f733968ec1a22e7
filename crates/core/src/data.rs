//! Endian-aware, bounds-checked reading over borrowed byte slices.
//!
//! Everything in a sound bank is addressed by absolute offsets, so the cursor here is built around
//! [`SeekExt::set_position`] followed by one or more typed reads. Reads never wrap or clamp: asking
//! for bytes past the end of the data returns [`EndOfFile`](DataError::EndOfFile) with the position
//! that was requested, which callers turn into their own "malformed offsets" errors.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

use snafu::prelude::*;

/// Error conditions for when reading data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum DataError {
    /// Thrown if reading tries to go out of bounds.
    #[snafu(display("Tried to read {length:#X} bytes out-of-bounds at {position:#X}"))]
    EndOfFile { position: usize, length: usize },
    /// Thrown when an I/O operation fails while loading a source.
    #[cfg(feature = "std")]
    #[snafu(display("I/O error: {}", source))]
    Io { source: std::io::Error },
}

/// Represents the endianness of the data being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Endian {
    Little,
    Big,
}

impl Default for Endian {
    #[inline]
    fn default() -> Self {
        #[cfg(target_endian = "little")]
        {
            Endian::Little
        }
        #[cfg(target_endian = "big")]
        {
            Endian::Big
        }
    }
}

impl core::fmt::Display for Endian {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Endian::Little => write!(f, "little-endian"),
            Endian::Big => write!(f, "big-endian"),
        }
    }
}

/// Trait for types that support endian-aware operations.
pub trait EndianExt {
    /// Returns the current endianness.
    fn endian(&self) -> Endian;

    /// Sets the endianness.
    fn set_endian(&mut self, endian: Endian);
}

/// Trait for types that support seeking operations.
pub trait SeekExt {
    /// Returns the current position.
    fn position(&self) -> usize;

    /// Sets the current position.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if the position is past the end of the data.
    fn set_position(&mut self, position: usize) -> Result<usize, DataError>;

    /// Returns the total length of the data.
    fn len(&self) -> usize;

    /// Returns `true` if there is no data left after the current position.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len().saturating_sub(self.position()) == 0
    }
}

/// Trait for types that support reading operations.
pub trait ReadExt: EndianExt {
    /// Reads exactly N bytes from the current position.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], DataError>;

    /// Reads the raw bytes of a NUL-terminated string of at most `max_length` bytes, excluding the
    /// terminator.
    ///
    /// The terminator is not required if the string fills the whole field.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if the data ends before a terminator and before
    /// `max_length` bytes have been read.
    fn read_cstr(&mut self, max_length: usize) -> Result<&[u8], DataError>;

    /// Reads a NUL-terminated string like [`read_cstr`](Self::read_cstr), invalid UTF-8 is replaced.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if the data ends before a terminator and before
    /// `max_length` bytes have been read.
    #[inline]
    fn read_cstring(&mut self, max_length: usize) -> Result<String, DataError> {
        let bytes = self.read_cstr(max_length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads an unsigned 8-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u8(&mut self) -> Result<u8, DataError> {
        Ok(self.read_exact::<1>()?[0])
    }

    /// Reads an unsigned 16-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u16(&mut self) -> Result<u16, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    /// Reads an unsigned 32-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u32(&mut self) -> Result<u32, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 32-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_i32(&mut self) -> Result<i32, DataError> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads an unsigned 32-bit integer in big-endian, regardless of the current endianness.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u32_be(&mut self) -> Result<u32, DataError> {
        Ok(u32::from_be_bytes(self.read_exact()?))
    }

    /// Reads a 32-bit floating point number.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_f32(&mut self) -> Result<f32, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => f32::from_le_bytes(bytes),
            Endian::Big => f32::from_be_bytes(bytes),
        })
    }
}

/// A borrowed, read-only view over in-memory data that allows endian-aware reads.
///
/// Creating one is free, so parsers typically build a fresh cursor per source and per byte order
/// instead of sharing one.
#[derive(Debug, Clone)]
pub struct DataCursorRef<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> DataCursorRef<'a> {
    /// Creates a new `DataCursorRef` with the given data and endianness.
    #[inline]
    #[must_use]
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, position: 0, endian }
    }

    /// Returns a slice of the underlying data, without moving the cursor.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if the range is out of bounds.
    #[inline]
    pub fn slice_at(&self, position: usize, length: usize) -> Result<&'a [u8], DataError> {
        position
            .checked_add(length)
            .and_then(|end| self.data.get(position..end))
            .context(EndOfFileSnafu { position, length })
    }
}

impl EndianExt for DataCursorRef<'_> {
    #[inline]
    fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }
}

impl SeekExt for DataCursorRef<'_> {
    #[inline]
    fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn set_position(&mut self, position: usize) -> Result<usize, DataError> {
        ensure!(position <= self.data.len(), EndOfFileSnafu { position, length: 0usize });
        self.position = position;
        Ok(self.position)
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }
}

impl ReadExt for DataCursorRef<'_> {
    #[inline]
    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], DataError> {
        let slice = self.slice_at(self.position, N)?;
        let mut result = [0u8; N];
        result.copy_from_slice(slice);
        self.position += N;
        Ok(result)
    }

    fn read_cstr(&mut self, max_length: usize) -> Result<&[u8], DataError> {
        let available = self.data.len().saturating_sub(self.position).min(max_length);
        let field = self.slice_at(self.position, available)?;
        let length = match field.iter().position(|&byte| byte == 0) {
            Some(length) => length,
            None => {
                // Ran out of data before the field ended without a terminator
                ensure!(
                    available == max_length,
                    EndOfFileSnafu { position: self.position, length: max_length }
                );
                available
            }
        };
        self.position += length;
        Ok(&field[..length])
    }
}

impl core::ops::Deref for DataCursorRef<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.data
    }
}

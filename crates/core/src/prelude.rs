//! Convenient re-exports of commonly used data types, designed to make crate usage painless.
//!
//! For example, you can work with [`DataCursorRef`] directly, but you have to explicitly refer to
//! [`data::DataError`].
//!
//! The contents of this module can be used by including the following in any module:
//! ```
//! use soundbank_core::prelude::*;
//! ```

#[doc(inline)]
pub use crate::data::{DataCursorRef, Endian, EndianExt, ReadExt, SeekExt};
#[doc(inline)]
pub use crate::identify::{FileIdentifier, FileInfo, IdentifyFn};
#[cfg(feature = "std")]
#[doc(inline)]
pub use crate::source::FileSource;

/// Includes [`data::DataError`], which is used in Results returned by [`DataCursorRef`].
pub mod data {
    #[doc(inline)]
    pub use crate::data::DataError;
}

/// Includes [`util::format_size`], which allows for pretty-print of various lengths.
pub mod util {
    #[doc(inline)]
    pub use crate::util::format_size;
}

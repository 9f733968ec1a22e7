//! Convenient re-exports of commonly used data types, designed to make crate usage painless.
//!
//! The contents of this module can be used by including the following in any module:
//! ```
//! use soundbank_scream::prelude::*;
//! ```

pub use crate::bank::{PayloadSource, ScreamBank, Subsong};
pub use crate::codec::Codec;
pub use crate::header::{Family, Revision};

pub mod scream {
    pub use crate::error::Error;
    pub use crate::header::BankHeader;
    pub use crate::names::NameChunk;
}

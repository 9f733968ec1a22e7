//! Metadata parsers for game audio sound banks.
//!
//! Each supported format lives in its own crate and is re-exported here under a short name, with
//! [`core`] holding the shared cursor and identification types they're built on.
//!
//! | Module | Formats |
//! |--------|---------|
//! | [`scream`] | Sony Scream Tool banks (`.bnk`, `SBlk` versions 0x01 through 0x23) |
//!
//! ```no_run
//! use soundbank::scream::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let count = ScreamBank::count(&std::fs::read("sfx.bnk")?)?;
//! for index in 1..=count {
//!     let subsong = ScreamBank::open("sfx.bnk", index)?;
//!     println!("{index}: {:?} at {:#X}", subsong.stream_name, subsong.stream_offset);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[doc(inline)]
pub use soundbank_core as core;
#[doc(inline)]
pub use soundbank_scream as scream;

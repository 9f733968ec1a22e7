//! This crate contains a module for [soundbank](https://crates.io/crates/soundbank) that adds
//! support for the sound banks written by Sony's Scream Tool (`.bnk`, an `SBlk` block behind a small
//! section directory), as used by first and third party titles from the PS2 through the PS5.
//!
//! The parser never decodes audio. Given a bank and a 1-based subsong index it produces a
//! [`Subsong`](bank::Subsong) describing where the compressed stream lives, which codec it uses and
//! how it loops, which is everything a decoder needs to start.
//!
//! # Revisions
//! The `SBlk` header went through many revisions which fall into four families:
//!
//! | Family | Versions | Notes |
//! |--------|----------|-------|
//! | [`Combined`](header::Family::Combined) | 0x01 | PS2. Grain entries carry their own wave header, stream sizes are implicit. |
//! | [`Split`](header::Family::Split) | 0x03, 0x04, 0x05, 0x08, 0x09 | PS2/PS3/PS4. Separate cue, grain, wave and name tables. |
//! | [`Wide`](header::Family::Wide) | 0x0D, 0x0E, 0x0F, 0x10 | Vita/PS4. Wider cue entries and floating point sample rates. |
//! | [`Compact`](header::Family::Compact) | 0x1A, 0x1C, 0x23 | PS4/PS5. A single wave table and hashed names. |
//!
//! # Usage
//! ```no_run
//! use soundbank_scream::prelude::*;
//!
//! # fn main() -> Result<(), soundbank_scream::error::Error> {
//! let subsong = ScreamBank::open("bgm.bnk", 1)?;
//! println!("{} of {}: {:?}", subsong.index, subsong.total, subsong.codec);
//! # Ok(())
//! # }
//! ```

// Here's all necessary no_std information as a nice prelude
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
mod no_std {
    extern crate alloc;
    pub use alloc::format;
    pub use alloc::string::{String, ToString};
    pub use alloc::vec;
    pub use alloc::vec::Vec;
}

pub mod bank;
pub mod codec;
pub mod error;
pub mod grain;
pub mod header;
pub mod layout;
pub mod names;
pub mod prefetch;
pub mod wave;

// Prelude, for convenience
pub mod prelude;

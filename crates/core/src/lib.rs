//! This crate is used as a utilities library for common functionality across
//! [soundbank](https://crates.io/crates/soundbank) format modules.
//!
//! The data module contains [`DataCursorRef`](data::DataCursorRef), a borrowed read-only cursor for
//! endian-specific data, which every format parser is built on. With the `std` feature there is also
//! [`FileSource`](source::FileSource), which loads files from disk and finds their companion files.
//!
//! Additionally, there is an identify module so format modules can sniff files cheaply, and a util
//! module with small formatting helpers.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
mod no_std {
    extern crate alloc;
    pub use alloc::format;
    pub use alloc::string::String;
}

pub mod data;
pub mod identify;
#[cfg(feature = "std")]
pub mod source;
pub mod util;

pub mod prelude;

//! Utility functions that can't be grouped into any other module.

#[cfg(not(feature = "std"))]
use crate::no_std::*;

/// Converts a size in bytes to a human-readable format.
///
/// This condenses the length until it can't be shrank any more and returns that with the relevant
/// unit (bytes, KB, MB, GB, etc).
#[must_use]
pub fn format_size(length: u64) -> String {
    const UNITS: [&str; 7] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB"];
    if length < 1024 {
        return format!("{length} bytes");
    }

    let mut size = length as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

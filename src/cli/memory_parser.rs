//! Memory size parsing utilities
//!
//! Parses allocator budgets such as `64K`, `1MB` or `0.5G` into bytes and
//! formats byte counts back for leak reports.

use thiserror::Error;

/// Memory parsing errors
#[derive(Debug, Error, PartialEq)]
pub enum MemoryParseError {
    #[error("Invalid memory size format: {input}. Expected format like '512', '64K', '1MB'")]
    InvalidFormat { input: String },

    #[error("Invalid memory unit: {unit}. Supported units: B, K, M, G (with optional 'B' or 'iB' suffix)")]
    InvalidUnit { unit: String },

    #[error("Invalid memory value: {value}. Must be a non-negative number")]
    InvalidValue { value: String },

    #[error("Memory size too large: {input} exceeds the addressable range")]
    SizeTooLarge { input: String },
}

/// Parse a memory size string into bytes
///
/// Units are binary multiples; decimal values are accepted:
///
/// ```
/// use textq::cli::memory_parser::parse_memory_size;
///
/// assert_eq!(parse_memory_size("4096").unwrap(), 4096);
/// assert_eq!(parse_memory_size("64K").unwrap(), 64 * 1024);
/// assert_eq!(parse_memory_size("1MB").unwrap(), 1024 * 1024);
/// assert_eq!(parse_memory_size("0.5K").unwrap(), 512);
/// ```
pub fn parse_memory_size(input: &str) -> Result<usize, MemoryParseError> {
    let normalized = input.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(MemoryParseError::InvalidFormat { input: input.to_string() });
    }

    let (number, unit) = split_number_and_unit(&normalized)
        .ok_or_else(|| MemoryParseError::InvalidFormat { input: input.to_string() })?;

    let value = number
        .parse::<f64>()
        .map_err(|_| MemoryParseError::InvalidValue { value: number.to_string() })?;
    let multiplier = unit_multiplier(unit.trim())?;

    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes >= usize::MAX as f64 {
        return Err(MemoryParseError::SizeTooLarge { input: input.to_string() });
    }

    Ok(bytes as usize)
}

/// Format bytes as human-readable string
pub fn format_memory_size(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else if size.fract() == 0.0 {
        format!("{:.0} {}", size, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Split at the end of the leading digits (and at most one decimal point)
fn split_number_and_unit(input: &str) -> Option<(&str, &str)> {
    let mut seen_point = false;
    let end = input
        .char_indices()
        .find(|&(_, ch)| match ch {
            '0'..='9' => false,
            '.' if !seen_point => {
                seen_point = true;
                false
            }
            _ => true,
        })
        .map_or(input.len(), |(index, _)| index);

    (end > 0).then(|| input.split_at(end))
}

fn unit_multiplier(unit: &str) -> Result<u64, MemoryParseError> {
    match unit {
        "" | "B" | "BYTES" => Ok(1),
        "K" | "KB" | "KIB" => Ok(1024),
        "M" | "MB" | "MIB" => Ok(1024 * 1024),
        "G" | "GB" | "GIB" => Ok(1024 * 1024 * 1024),
        _ => Err(MemoryParseError::InvalidUnit { unit: unit.to_string() }),
    }
}

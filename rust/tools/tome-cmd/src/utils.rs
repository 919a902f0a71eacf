//! Common utilities for tome-cmd

use anyhow::Result;
use std::{path::Path, time::Duration};

/// Checks that `path` names an existing regular file and returns its size.
pub fn validate_input_file(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Cannot access {}: {e}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }
    Ok(metadata.len())
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Formats a transfer rate, or `None` when the elapsed time is too short to measure.
pub fn format_throughput(bytes: u64, elapsed: Duration) -> Option<String> {
    if elapsed.as_millis() == 0 {
        return None;
    }
    let mb_per_sec = (bytes as f64) / (1024.0 * 1024.0) / elapsed.as_secs_f64();
    Some(format!("{mb_per_sec:.2} MB/s"))
}

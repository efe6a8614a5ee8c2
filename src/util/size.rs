//! Byte size helpers for arena configuration and log output.

/// Kilobytes to bytes.
#[inline]
pub const fn kb(n: u64) -> u64 {
    n << 10
}

/// Megabytes to bytes.
#[inline]
pub const fn mb(n: u64) -> u64 {
    n << 20
}

/// Render a byte count the way it shows up in heap and upload reports.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10)];

    for (unit, scale) in UNITS {
        if bytes >= scale {
            return format!("{:.2} {}", bytes as f64 / scale as f64, unit);
        }
    }
    format!("{} B", bytes)
}

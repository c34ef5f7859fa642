//! Helpers for rendering byte counts in snapshot reports.

/// Format a byte count into IEC units (KiB, MiB, GiB) with trimmed precision.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        return format!("{bytes} {}", UNITS[unit_index]);
    }

    let mut rendered = if value >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    };

    if rendered.contains('.') {
        while rendered.ends_with('0') {
            rendered.pop();
        }
        if rendered.ends_with('.') {
            rendered.pop();
        }
    }

    format!("{rendered} {}", UNITS[unit_index])
}

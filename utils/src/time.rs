//! Human-readable durations for API responses.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render `secs` as its two most significant units, e.g. `"2d 3h"` or `"42s"`.
pub fn format_duration(secs: u64) -> String {
    let Some(lead) = UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0s".to_string();
    };
    let (major, major_suffix) = UNITS[lead];
    let whole = secs / major;
    match UNITS.get(lead + 1) {
        Some(&(minor, minor_suffix)) => {
            format!("{whole}{major_suffix} {}{minor_suffix}", (secs % major) / minor)
        }
        None => format!("{whole}{major_suffix}"),
    }
}

// src/util.rs — Shared utility functions

/// Truncate a string for display/logging (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// Turn an arbitrary stream title into something safe to use in a file name.
///
/// Whitespace runs collapse to a single space; anything that is not
/// alphanumeric, `-`, `_`, `.` or a space is dropped.
pub fn valid_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_space = false;
    for c in title.trim().chars() {
        if c.is_whitespace() {
            if !last_space && !out.is_empty() {
                out.push(' ');
            }
            last_space = true;
        } else if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
            out.push(c);
            last_space = false;
        }
    }
    let out = out.trim_end().trim_matches('.').to_string();
    if out.is_empty() {
        "untitled".into()
    } else {
        truncate_str(&out, 120).to_string()
    }
}

/// Format whole seconds as `HH:MM:SS`, dropping any sub-second part.
pub fn format_hhmmss(micros: i64) -> String {
    let total_secs = micros.max(0) / 1_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Size of a file in GiB, rounded to two decimals, for notifications.
pub fn size_gib(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0 * 1024.0) * 100.0).round() / 100.0
}

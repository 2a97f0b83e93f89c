//! Small helpers shared by the outbound HTTP clients

/// Longest error body kept in error messages and logs
pub const MAX_ERROR_BODY_BYTES: usize = 512;

/// Truncate a string to at most `max_bytes` bytes, ensuring the cut lands on a
/// valid UTF-8 char boundary. Returns the longest prefix that fits.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Trimmed, length-capped copy of an upstream response body for error reporting
pub fn error_snippet(body: &str) -> String {
    let trimmed = body.trim();
    let cut = truncate_str(trimmed, MAX_ERROR_BODY_BYTES);
    if cut.len() < trimmed.len() {
        format!("{}…", cut)
    } else {
        cut.to_string()
    }
}

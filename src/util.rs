//! Small shared helpers.

/// Largest valid UTF-8 char boundary at or before `pos`.
///
/// Stand-in for the nightly-only `str::floor_char_boundary`; byte-position
/// truncation must not land inside a multi-byte character.
pub fn floor_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let mut i = pos;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Truncate a response body for inclusion in an error message.
///
/// Upstream error bodies can be arbitrarily large (HTML error pages,
/// echoed payloads); keep enough to diagnose without flooding a log line.
pub fn truncate_body(body: &str, max: usize) -> &str {
    &body[..floor_char_boundary(body, max)]
}

#[cfg(test)]
mod tests {
    use crate::util::{floor_char_boundary, truncate_body};

    // ── floor_char_boundary ──

    #[test]
    fn floor_char_boundary_at_valid_boundary() {
        assert_eq!(floor_char_boundary("hello", 3), 3);
    }

    #[test]
    fn floor_char_boundary_mid_multibyte_char() {
        // h = 1 byte, é = 2 bytes, total 3 bytes
        let s = "hé";
        assert_eq!(floor_char_boundary(s, 2), 1); // byte 2 is mid-é, back up to 1
    }

    #[test]
    fn floor_char_boundary_past_end() {
        assert_eq!(floor_char_boundary("hi", 100), 2);
    }

    #[test]
    fn floor_char_boundary_at_zero() {
        assert_eq!(floor_char_boundary("hello", 0), 0);
    }

    #[test]
    fn floor_char_boundary_empty_string() {
        assert_eq!(floor_char_boundary("", 5), 0);
    }

    // ── truncate_body ──

    #[test]
    fn truncate_body_short_input_untouched() {
        assert_eq!(truncate_body("oops", 200), "oops");
    }

    #[test]
    fn truncate_body_cuts_at_limit() {
        let body = "x".repeat(500);
        assert_eq!(truncate_body(&body, 200).len(), 200);
    }

    #[test]
    fn truncate_body_never_splits_a_char() {
        // Each é is 2 bytes; a 5-byte cut would land mid-char.
        let body = "ééééé";
        let cut = truncate_body(body, 5);
        assert_eq!(cut, "éé");
    }
}

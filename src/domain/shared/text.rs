//! Small text helpers for wire data

/// Maximum number of characters of untrusted input echoed into log lines
pub const LOG_EXCERPT_LEN: usize = 80;

/// Escape non-printable bytes so untrusted input is safe to log.
///
/// The result is truncated to [`LOG_EXCERPT_LEN`] characters.
pub fn sanitize(input: &[u8]) -> String {
    escape(input, Some(LOG_EXCERPT_LEN))
}

/// Escape non-printable bytes without truncating
pub fn escape_control(input: &[u8]) -> String {
    escape(input, None)
}

fn escape(input: &[u8], limit: Option<usize>) -> String {
    let capacity = limit.map_or(input.len(), |limit| input.len().min(limit));
    let mut out = String::with_capacity(capacity);
    for &byte in input.iter() {
        if limit.map_or(false, |limit| out.len() >= limit) {
            out.push_str("...");
            break;
        }
        match byte {
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out
}

/// Trim leading and trailing space characters (not tabs)
pub fn trim_spaces(input: &str) -> &str {
    input.trim_matches(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_escapes_control_bytes() {
        assert_eq!(sanitize(b"INVITE\r\n"), "INVITE\\r\\n");
        assert_eq!(sanitize(&[0x00, b'a', 0xff]), "\\x00a\\xff");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = vec![b'a'; 200];
        let out = sanitize(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), LOG_EXCERPT_LEN + 3);
    }

    #[test]
    fn test_escape_control_keeps_full_length() {
        let long = vec![b'a'; 200];
        assert_eq!(escape_control(&long).len(), 200);
        assert_eq!(escape_control(b"a\x1b[2Jb"), "a\\x1b[2Jb");
    }

    #[test]
    fn test_trim_spaces_keeps_tabs() {
        assert_eq!(trim_spaces("  value  "), "value");
        assert_eq!(trim_spaces("\tvalue "), "\tvalue");
        assert_eq!(trim_spaces("   "), "");
    }
}

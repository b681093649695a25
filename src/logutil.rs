//! One-line renderings of envelope payloads and channel text for log output.
use std::fmt::Write;

/// Characters kept before a rendering is cut off with `…`.
pub const LOG_PREVIEW_CHARS: usize = 300;

/// Bounded single-line buffer. Line breaks, tabs and backslashes get their
/// usual escapes; other control characters and stray bytes become `\xNN`.
struct Preview {
    out: String,
    left: usize,
    cut: bool,
}

impl Preview {
    fn new() -> Self {
        Self {
            out: String::with_capacity(64),
            left: LOG_PREVIEW_CHARS,
            cut: false,
        }
    }

    fn reserve_one(&mut self) -> bool {
        if self.left == 0 {
            self.cut = true;
            return false;
        }
        self.left -= 1;
        true
    }

    fn push_char(&mut self, ch: char) -> bool {
        if !self.reserve_one() {
            return false;
        }
        match ch {
            '\\' => self.out.push_str("\\\\"),
            '\n' => self.out.push_str("\\n"),
            '\r' => self.out.push_str("\\r"),
            '\t' => self.out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(self.out, "\\x{:02X}", c as u32);
            }
            c => self.out.push(c),
        }
        true
    }

    fn push_byte(&mut self, byte: u8) -> bool {
        if !self.reserve_one() {
            return false;
        }
        let _ = write!(self.out, "\\x{:02X}", byte);
        true
    }

    fn finish(mut self) -> String {
        if self.cut {
            self.out.push('…');
        }
        self.out
    }
}

/// Escape decrypted channel text (or any string) for a single log line.
pub fn escape_log(s: &str) -> String {
    let mut preview = Preview::new();
    for ch in s.chars() {
        if !preview.push_char(ch) {
            break;
        }
    }
    preview.finish()
}

/// Escape a raw feed payload. Invalid UTF-8 shows up byte by byte rather
/// than as replacement characters.
pub fn escape_payload(payload: &[u8]) -> String {
    let mut preview = Preview::new();
    'chunks: for chunk in payload.utf8_chunks() {
        for ch in chunk.valid().chars() {
            if !preview.push_char(ch) {
                break 'chunks;
            }
        }
        for &byte in chunk.invalid() {
            if !preview.push_byte(byte) {
                break 'chunks;
            }
        }
    }
    preview.finish()
}

/// Lowercase hex of at most `max` leading bytes, with `…` when cut.
pub fn hex_preview(data: &[u8], max: usize) -> String {
    let mut out = hex::encode(&data[..data.len().min(max)]);
    if data.len() > max {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newlines_and_control_chars() {
        assert_eq!(escape_log("Line1\nLine2\r\tEnd"), "Line1\\nLine2\\r\\tEnd");
        assert_eq!(escape_log("a\u{1}b\\c"), "a\\x01b\\\\c");
    }

    #[test]
    fn long_input_is_truncated() {
        let esc = escape_log(&"x".repeat(400));
        assert_eq!(esc.chars().count(), LOG_PREVIEW_CHARS + 1);
        assert!(esc.ends_with('…'));
        assert!(!escape_log(&"x".repeat(LOG_PREVIEW_CHARS)).ends_with('…'));
    }

    #[test]
    fn payload_keeps_invalid_bytes_visible() {
        assert_eq!(escape_payload(b"{\"a\":\n1}"), "{\"a\":\\n1}");
        assert_eq!(escape_payload(b"ok\xff\xfe!"), "ok\\xFF\\xFE!");
        let long = vec![0xffu8; 400];
        assert!(escape_payload(&long).ends_with("\\xFF…"));
    }

    #[test]
    fn hex_preview_caps_length() {
        assert_eq!(hex_preview(&[0xde, 0xad, 0xbe, 0xef], 2), "dead…");
        assert_eq!(hex_preview(&[0x01], 8), "01");
    }
}

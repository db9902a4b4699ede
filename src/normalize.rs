//! SMTP wire-format line-ending normalization
//!
//! SMTP requires messages to use CRLF line separators ([RFC 5321, section
//! 2.3.8](https://tools.ietf.org/html/rfc5321#section-2.3.8)), but messages
//! built on Unix systems commonly arrive with bare LF endings.

/// Replaces every line feed that is not already preceded by a carriage
/// return with a CRLF pair.
///
/// Operates on bytes, leaves existing CRLF pairs untouched, and is
/// idempotent: normalizing twice yields the same output as once.
pub fn normalize_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = 0u8;
    for &byte in data {
        if byte == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        prev = byte;
    }
    out
}

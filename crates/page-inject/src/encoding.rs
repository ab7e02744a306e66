//! String operands for the `Tj` operator
//!
//! Two codecs, picked from the run's [`Ordering`]:
//! - Latin runs become a literal string `( … )` for a single-byte font.
//! - CJK runs become a hex string `< … >` of 2-byte codes. Each code is the
//!   BMP codepoint itself, matching the `Uni*-UCS2-H` CMaps and the identity
//!   ToUnicode ranges built in [`crate::font`]. Codepoints above U+FFFF
//!   have no 2-byte code and are written as U+FFFD.

use crate::script::Ordering;

/// Code written for characters outside the Basic Multilingual Plane
pub const REPLACEMENT_CODE: u16 = 0xFFFD;

/// Encode a Latin run as an escaped literal string, delimiters included
///
/// Characters above U+00FF cannot be expressed in a single byte and are
/// written as `?`.
pub fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        let byte = u8::try_from(c as u32).unwrap_or(b'?');
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

/// 2-byte code for a character under the identity scheme
pub fn cid_code(c: char) -> u16 {
    u16::try_from(c as u32).unwrap_or(REPLACEMENT_CODE)
}

/// Encode a CJK run as a hex string of big-endian 2-byte codes
pub fn encode_cid_hex(text: &str) -> Vec<u8> {
    let mut out = String::with_capacity(text.len() * 4 + 2);
    out.push('<');
    for c in text.chars() {
        out.push_str(&format!("{:04X}", cid_code(c)));
    }
    out.push('>');
    out.into_bytes()
}

/// Encode a run for the font type its ordering selects
pub fn encode_run(text: &str, ordering: Ordering) -> Vec<u8> {
    if ordering.is_cjk() {
        encode_cid_hex(text)
    } else {
        encode_literal(text)
    }
}

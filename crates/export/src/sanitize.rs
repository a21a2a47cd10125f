//! Text sanitization shared by every emitter.
//!
//! Both the typesetter and the OOXML writer reject or mis-render control
//! characters and lone surrogates, so text is cleaned once in the walker
//! before any emitter sees it.

/// Strip characters no target format can carry.
///
/// Tab, LF and CR become a single space. Other control characters, U+FFFD
/// (what an unpaired surrogate turns into after lossy UTF-16 decoding) and
/// the noncharacters U+FFFE/U+FFFF are dropped.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{FFFD}' | '\u{FFFE}' | '\u{FFFF}' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Decode UTF-16 code units, dropping unpaired surrogates, then sanitize.
pub fn sanitize_utf16(units: &[u16]) -> String {
    let decoded: String = char::decode_utf16(units.iter().copied())
        .filter_map(|r| r.ok())
        .collect();
    sanitize_text(&decoded)
}

//! Fallback decoder for `complete` frames whose JSON does not parse.
//!
//! Backends occasionally emit a terminal frame that is truncated or carries
//! unescaped bytes elsewhere in the object. The diagram itself is usually
//! intact, so we locate `"diagram": "<string>"` in the raw text and decode
//! that one JSON string literal on its own.
//!
//! Grammar accepted for a field:
//!
//! ```text
//! "<name>" ws* ':' ws* '"' ( char | '\' escape )* '"'
//! escape := 'n' | 't' | 'r' | '"' | '\' | '/' | 'b' | 'f' | 'u' hex{4}
//! ```
//!
//! Unknown escapes are kept verbatim; lone or malformed `\u` surrogates
//! decode to U+FFFD. An unterminated literal does not match.

use std::str::Chars;

use super::frame::{Phase, StreamFrame};

const COMPLETE_MARKER: &str = "\"complete\"";

/// Builds a `complete` frame from raw text that failed strict decoding.
///
/// Returns `None` unless the text carries the completion marker and a
/// decodable `"diagram"` string field. `explanation` is picked up when it
/// is present and decodable.
#[must_use]
pub fn recover_complete_frame(raw: &str) -> Option<StreamFrame> {
    if !raw.contains(COMPLETE_MARKER) {
        return None;
    }
    let diagram = extract_string_field(raw, "diagram")?;
    let explanation = extract_string_field(raw, "explanation");
    Some(StreamFrame {
        status: Phase::Complete,
        diagram: Some(diagram),
        explanation,
        ..StreamFrame::default()
    })
}

/// Finds the first `"name": "<literal>"` in `raw` and decodes the literal.
///
/// Occurrences of `"name"` that are not followed by a colon and a string
/// (for instance `"status": "diagram"`) are skipped.
#[must_use]
pub fn extract_string_field(raw: &str, name: &str) -> Option<String> {
    let needle = format!("\"{name}\"");
    let mut from = 0;
    while let Some(pos) = raw.get(from..).and_then(|rest| rest.find(&needle)) {
        let after = from + pos + needle.len();
        if let Some(value) = raw.get(after..).and_then(value_after_key) {
            return Some(value);
        }
        from = after;
    }
    None
}

/// Parses `ws* ':' ws* <string literal>` at the start of `rest`.
fn value_after_key(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let body = rest.strip_prefix('"')?;
    decode_string_literal(body)
}

/// Decodes a JSON string body up to (not including) its closing quote.
fn decode_string_literal(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => decode_escape(&mut chars, &mut out)?,
            other => out.push(other),
        }
    }
    None
}

fn decode_escape(chars: &mut Chars<'_>, out: &mut String) -> Option<()> {
    match chars.next()? {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        '"' => out.push('"'),
        '\\' => out.push('\\'),
        '/' => out.push('/'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        'u' => out.push(decode_unicode_escape(chars)?),
        other => {
            out.push('\\');
            out.push(other);
        }
    }
    Some(())
}

/// Decodes the `XXXX` of `\uXXXX`, pairing a high surrogate with a
/// following `\uDC00..\uDFFF` escape when one is present.
fn decode_unicode_escape(chars: &mut Chars<'_>) -> Option<char> {
    let unit = read_hex4(chars)?;
    if !(0xD800..0xDC00).contains(&unit) {
        return Some(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    let mut lookahead = chars.clone();
    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
        if let Some(low) = read_hex4(&mut lookahead) {
            if (0xDC00..0xE000).contains(&low) {
                *chars = lookahead;
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                return Some(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }
    Some(char::REPLACEMENT_CHARACTER)
}

fn read_hex4(chars: &mut Chars<'_>) -> Option<u32> {
    let mut value = 0;
    for _ in 0..4 {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

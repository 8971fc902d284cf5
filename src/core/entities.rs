//! XML Entity Decoding
//!
//! Handles decoding of references in character data and attribute values:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Internal general entities, only when the caller allowed entity
//!   declarations and the document declared them
//!
//! Uses Cow for zero-copy when no references are present.

use super::dtd::EntityDeclarations;
use memchr::memchr;
use std::borrow::Cow;

/// Nesting limit for entities whose replacement text references other entities
const MAX_EXPANSION_DEPTH: usize = 16;

/// Why a reference could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// `&name;` with no declaration
    Undefined(String),
    /// `&` not followed by a well-formed reference
    Malformed,
    /// A character reference to a code point XML does not allow
    InvalidChar,
    /// A reference to an entity whose content lives outside the document
    External(String),
    /// Entities referencing each other without end
    Recursive(String),
}

/// Decode text content, handling entity references.
///
/// Returns Borrowed if no references are present (zero-copy),
/// returns Owned if references were decoded.
#[inline]
pub fn decode_text<'a>(
    input: &'a str,
    declared: Option<&EntityDeclarations>,
) -> Result<Cow<'a, str>, ReferenceError> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    let mut result = String::with_capacity(input.len());
    decode_into(input, declared, &mut result, 0)?;
    Ok(Cow::Owned(result))
}

fn decode_into(
    input: &str,
    declared: Option<&EntityDeclarations>,
    out: &mut String,
    depth: usize,
) -> Result<(), ReferenceError> {
    let bytes = input.as_bytes();
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &bytes[pos..]) {
        // Copy everything before the reference
        out.push_str(&input[pos..pos + amp]);
        pos += amp;

        let semi = memchr(b';', &bytes[pos..]).ok_or(ReferenceError::Malformed)?;
        let name = &input[pos + 1..pos + semi];
        pos += semi + 1;

        if let Some(number) = name.strip_prefix('#') {
            out.push(decode_char_ref(number)?);
        } else if let Some(c) = predefined(name) {
            out.push(c);
        } else {
            expand_declared(name, declared, out, depth)?;
        }
    }

    out.push_str(&input[pos..]);
    Ok(())
}

fn expand_declared(
    name: &str,
    declared: Option<&EntityDeclarations>,
    out: &mut String,
    depth: usize,
) -> Result<(), ReferenceError> {
    if !is_reference_name(name) {
        return Err(ReferenceError::Malformed);
    }
    let decl = declared
        .and_then(|d| d.get(name))
        .ok_or_else(|| ReferenceError::Undefined(name.to_string()))?;
    match &decl.value {
        Some(_) if depth >= MAX_EXPANSION_DEPTH => Err(ReferenceError::Recursive(name.to_string())),
        Some(value) => decode_into(value, declared, out, depth + 1),
        None => Err(ReferenceError::External(name.to_string())),
    }
}

/// The five entities every XML processor knows
fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference (without `&#` and `;`)
fn decode_char_ref(number: &str) -> Result<char, ReferenceError> {
    let codepoint = match number.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => number.parse::<u32>(),
    }
    .map_err(|_| ReferenceError::Malformed)?;

    if !is_valid_xml_char(codepoint) {
        return Err(ReferenceError::InvalidChar);
    }
    char::from_u32(codepoint).ok_or(ReferenceError::InvalidChar)
}

fn is_reference_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if super::scanner::is_name_start_char(first) => {
            bytes.all(super::scanner::is_name_char)
        }
        _ => false,
    }
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Normalize line endings: "\r\n" and a lone "\r" both become "\n"
pub fn normalize_line_endings(input: &str) -> Cow<'_, str> {
    if memchr(b'\r', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Attribute value normalization: literal whitespace characters become spaces.
/// Runs before reference decoding so `&#10;` survives as a newline.
pub fn normalize_attribute_whitespace(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'\t' | b'\n' | b'\r')) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .replace("\r\n", " ")
            .replace(['\t', '\n', '\r'], " "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dtd::EntityDecl;

    fn declarations(entries: &[(&str, Option<&str>)]) -> EntityDeclarations {
        let mut dtd = EntityDeclarations::new();
        for (name, value) in entries {
            dtd.add_entity(
                name.to_string(),
                EntityDecl {
                    value: value.map(str::to_string),
                    system_id: value.is_none().then(|| "file:///etc/passwd".to_string()),
                },
            );
        }
        dtd
    }

    #[test]
    fn test_decode_no_entities() {
        let result = decode_text("hello world", None).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_decode_predefined() {
        let result = decode_text("&lt;a&gt; &amp; &quot;b&quot; &apos;c&apos;", None).unwrap();
        assert_eq!(result, "<a> & \"b\" 'c'");
    }

    #[test]
    fn test_decode_numeric() {
        assert_eq!(decode_text("&#65;&#x42;&#x1F600;", None).unwrap(), "AB\u{1F600}");
    }

    #[test]
    fn test_invalid_char_ref() {
        assert_eq!(decode_text("&#0;", None), Err(ReferenceError::InvalidChar));
        assert_eq!(decode_text("&#xZZ;", None), Err(ReferenceError::Malformed));
    }

    #[test]
    fn test_bare_ampersand() {
        assert_eq!(decode_text("fish & chips", None), Err(ReferenceError::Malformed));
        assert_eq!(decode_text("a &b c", None), Err(ReferenceError::Malformed));
    }

    #[test]
    fn test_undefined_entity() {
        assert_eq!(
            decode_text("&nbsp;", None),
            Err(ReferenceError::Undefined("nbsp".to_string()))
        );
    }

    #[test]
    fn test_declared_entities() {
        let dtd = declarations(&[("who", Some("&greet; world")), ("greet", Some("hello"))]);
        assert_eq!(decode_text("[&who;]", Some(&dtd)).unwrap(), "[hello world]");
    }

    #[test]
    fn test_external_entity_refused() {
        let dtd = declarations(&[("ext", None)]);
        assert_eq!(
            decode_text("&ext;", Some(&dtd)),
            Err(ReferenceError::External("ext".to_string()))
        );
    }

    #[test]
    fn test_self_reference_stops() {
        let dtd = declarations(&[("loop", Some("&loop;"))]);
        assert_eq!(
            decode_text("&loop;", Some(&dtd)),
            Err(ReferenceError::Recursive("loop".to_string()))
        );
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_attribute_whitespace("a\tb\r\nc"), "a b c");
    }

    #[test]
    fn test_is_valid_xml_char() {
        assert!(is_valid_xml_char(0x9));
        assert!(is_valid_xml_char(0x20));
        assert!(!is_valid_xml_char(0x0));
        assert!(!is_valid_xml_char(0xFFFE));
    }
}

//! XML Attribute Parsing
//!
//! Parses the raw attributes of a start tag. Values come back undecoded:
//! reference expansion needs the encoding and the entity table, both owned by
//! the tokenizer.

use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;

/// A raw attribute, borrowed from the tag bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Attribute value between the quotes, references not decoded
    pub value: &'a [u8],
}

impl<'a> RawAttribute<'a> {
    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a [u8]> {
        split_name(self.name).0
    }

    /// Whether this attribute declares a namespace (`xmlns` or `xmlns:p`)
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == b"xmlns" || self.prefix() == Some(b"xmlns")
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if let Some(colon_pos) = memchr(b':', name) {
        (Some(&name[..colon_pos]), &name[colon_pos + 1..])
    } else {
        (None, name)
    }
}

/// Parse attributes from raw tag content (after the element name).
///
/// Input is the content between element name and '>' (or '/>'). Every
/// attribute needs a quoted value and whitespace before it.
pub fn parse_attributes(input: &[u8]) -> Result<Vec<RawAttribute<'_>>, &'static str> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() {
            return Ok(attrs);
        }

        if pos == ws_start {
            return Err("Not well-formed (invalid token)");
        }

        // Parse attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err("Not well-formed (invalid token)");
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        // Skip whitespace around '='
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] != b'=' {
            return Err("Not well-formed (invalid token)");
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        // Parse attribute value
        let quote = match input.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err("Not well-formed (invalid token)"),
        };
        pos += 1;
        let close = memchr(quote, &input[pos..]).ok_or("Unclosed token")?;
        let value = &input[pos..pos + close];
        if memchr(b'<', value).is_some() {
            return Err("Not well-formed (invalid token)");
        }
        pos += close + 1;

        attrs.push(RawAttribute { name, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let attrs = parse_attributes(b" a=\"1\" b='two'").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, b"a");
        assert_eq!(attrs[0].value, b"1");
        assert_eq!(attrs[1].name, b"b");
        assert_eq!(attrs[1].value, b"two");
    }

    #[test]
    fn test_parse_whitespace_around_equals() {
        let attrs = parse_attributes(b"\n  key = \"v a l\"  ").unwrap();
        assert_eq!(attrs[0].name, b"key");
        assert_eq!(attrs[0].value, b"v a l");
    }

    #[test]
    fn test_parse_prefixed() {
        let attrs = parse_attributes(b" xmlns:ex=\"urn:ex\" ex:id=\"3\" xmlns=\"urn:d\"").unwrap();
        assert!(attrs[0].is_namespace_declaration());
        assert_eq!(attrs[1].prefix(), Some(b"ex" as &[u8]));
        assert!(!attrs[1].is_namespace_declaration());
        assert!(attrs[2].is_namespace_declaration());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_attributes(b"").unwrap().is_empty());
        assert!(parse_attributes(b"   ").unwrap().is_empty());
    }

    #[test]
    fn test_unquoted_value_rejected() {
        assert!(parse_attributes(b" a=1").is_err());
    }

    #[test]
    fn test_missing_value_rejected() {
        assert!(parse_attributes(b" checked").is_err());
    }

    #[test]
    fn test_missing_separator_rejected() {
        assert!(parse_attributes(b" a=\"1\"b=\"2\"").is_err());
    }

    #[test]
    fn test_lt_in_value_rejected() {
        assert!(parse_attributes(b" a=\"<\"").is_err());
    }
}

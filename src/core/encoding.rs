//! XML Encoding Detection and Conversion
//!
//! Handles detection of UTF-16 and UTF-8 input based on BOM and byte patterns.
//! [`DecodingReader`] converts UTF-16 to UTF-8 on the fly so the tokenizer only
//! ever sees UTF-8 (or a single-byte encoding named by the XML declaration).

use std::io::{self, Read};

/// Detect the encoding of XML input based on BOM or byte patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            // UTF-16 LE BOM: 0xFF 0xFE
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            // UTF-16 BE BOM: 0xFE 0xFF
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Length of the byte order mark at the start of `input`, if any
    pub fn bom_len(self, input: &[u8]) -> usize {
        match self {
            XmlEncoding::Utf8 if input.starts_with(&[0xEF, 0xBB, 0xBF]) => 3,
            XmlEncoding::Utf16Le if input.starts_with(&[0xFF, 0xFE]) => 2,
            XmlEncoding::Utf16Be if input.starts_with(&[0xFE, 0xFF]) => 2,
            _ => 0,
        }
    }

    fn code_unit(self, pair: [u8; 2]) -> u16 {
        match self {
            XmlEncoding::Utf16Be => u16::from_be_bytes(pair),
            _ => u16::from_le_bytes(pair),
        }
    }
}

/// Bytes needed to tell the encodings apart
const DETECT_LEN: usize = 4;

/// Reader adapter that strips BOMs and converts UTF-16 input to UTF-8
pub struct DecodingReader<R: Read> {
    inner: R,
    encoding: Option<XmlEncoding>,
    /// Raw bytes not converted yet (detection prefix, odd byte, split surrogate)
    pending: Vec<u8>,
    /// Converted bytes not delivered yet
    out: Vec<u8>,
    out_pos: usize,
    eof: bool,
}

impl<R: Read> DecodingReader<R> {
    /// Wrap a raw byte reader
    pub fn new(inner: R) -> Self {
        DecodingReader {
            inner,
            encoding: None,
            pending: Vec::with_capacity(DETECT_LEN),
            out: Vec::new(),
            out_pos: 0,
            eof: false,
        }
    }

    /// The detected encoding, once the first bytes have been read
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    fn detect(&mut self) -> io::Result<XmlEncoding> {
        if let Some(encoding) = self.encoding {
            return Ok(encoding);
        }
        let mut head = [0u8; DETECT_LEN];
        while self.pending.len() < DETECT_LEN && !self.eof {
            let want = DETECT_LEN - self.pending.len();
            match self.inner.read(&mut head[..want]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&head[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        let encoding = XmlEncoding::detect(&self.pending);
        let bom = encoding.bom_len(&self.pending);
        self.pending.drain(..bom);
        tracing::trace!(?encoding, bom, "detected input encoding");
        self.encoding = Some(encoding);
        Ok(encoding)
    }

    /// Convert as many complete UTF-16 code units of `pending` as possible
    fn convert_utf16(&mut self, encoding: XmlEncoding) -> io::Result<()> {
        let whole = self.pending.len() - self.pending.len() % 2;
        let mut units: Vec<u16> = self.pending[..whole]
            .chunks_exact(2)
            .map(|pair| encoding.code_unit([pair[0], pair[1]]))
            .collect();

        // Keep a trailing high surrogate until its partner arrives
        let mut keep = self.pending.len() - whole;
        if let Some(&last) = units.last() {
            if (0xD800..0xDC00).contains(&last) && !self.eof {
                units.pop();
                keep += 2;
            }
        }

        self.out.clear();
        self.out_pos = 0;
        for decoded in char::decode_utf16(units.iter().copied()) {
            let c = decoded.map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-16: {}", e))
            })?;
            let mut utf8 = [0u8; 4];
            self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
        }

        let consumed = self.pending.len() - keep;
        self.pending.drain(..consumed);
        if self.eof && !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid UTF-16: odd number of bytes",
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let encoding = self.detect()?;
        loop {
            if self.out_pos < self.out.len() {
                let n = (self.out.len() - self.out_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(n);
            }

            if encoding == XmlEncoding::Utf8 {
                if !self.pending.is_empty() {
                    let n = self.pending.len().min(buf.len());
                    buf[..n].copy_from_slice(&self.pending[..n]);
                    self.pending.drain(..n);
                    return Ok(n);
                }
                if self.eof {
                    return Ok(0);
                }
                return self.inner.read(buf);
            }

            if self.eof && self.pending.is_empty() {
                return Ok(0);
            }
            if !self.eof {
                // UTF-16 needs up to twice as many raw bytes per output byte
                let mut raw = vec![0u8; buf.len().max(2)];
                match self.inner.read(&mut raw) {
                    Ok(0) => self.eof = true,
                    Ok(n) => self.pending.extend_from_slice(&raw[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            self.convert_utf16(encoding)?;
            if self.out.is_empty() && self.eof {
                return Ok(0);
            }
        }
    }
}

/// Lowercase canonical form of a declared encoding label
pub fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace('_', "-")
}

/// Declared encodings whose bytes map one-to-one onto Unicode scalar values
pub fn is_latin1_label(label: &str) -> bool {
    matches!(
        normalize_label(label).as_str(),
        "iso-8859-1" | "iso8859-1" | "latin-1" | "latin1" | "l1" | "iso-ir-100" | "cp819"
    )
}

/// Declared encodings compatible with the UTF-8 fast path
pub fn is_utf8_compatible_label(label: &str) -> bool {
    matches!(
        normalize_label(label).as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii"
    )
}

/// Declared encodings that only make sense for UTF-16 input
pub fn is_utf16_label(label: &str) -> bool {
    matches!(
        normalize_label(label).as_str(),
        "utf-16" | "utf16" | "utf-16le" | "utf-16be"
    )
}

/// Decode Latin-1 bytes: every byte is the code point of the same value
pub fn decode_latin1(input: &[u8]) -> String {
    input.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode_all(input: Vec<u8>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        DecodingReader::new(Cursor::new(input)).read_to_end(&mut out)?;
        Ok(out)
    }

    /// Serves one byte per read to exercise split code units
    struct Trickle(Vec<u8>, usize);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.1 >= self.0.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[self.1];
            self.1 += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<root/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(b"<?xml"), XmlEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf16_le_bom() {
        assert_eq!(XmlEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), XmlEncoding::Utf16Le);
    }

    #[test]
    fn test_detect_utf16_be_pattern() {
        assert_eq!(XmlEncoding::detect(&[0x00, b'<', 0x00, b'r']), XmlEncoding::Utf16Be);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let result = decode_all(vec![0xEF, 0xBB, 0xBF, b'<', b'r', b'/', b'>']).unwrap();
        assert_eq!(result, b"<r/>");
    }

    #[test]
    fn test_convert_utf16_le() {
        let mut input = vec![0xFF, 0xFE];
        for unit in "<r>é</r>".encode_utf16() {
            input.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_all(input).unwrap(), "<r>é</r>".as_bytes());
    }

    #[test]
    fn test_convert_utf16_be_split_surrogate() {
        let mut input = vec![0xFE, 0xFF];
        for unit in "<r>\u{1F600}</r>".encode_utf16() {
            input.extend_from_slice(&unit.to_be_bytes());
        }
        let mut out = Vec::new();
        DecodingReader::new(Trickle(input, 0)).read_to_end(&mut out).unwrap();
        assert_eq!(out, "<r>\u{1F600}</r>".as_bytes());
    }

    #[test]
    fn test_odd_utf16_input() {
        let input = vec![0xFF, 0xFE, b'<', 0x00, b'r'];
        assert!(decode_all(input).is_err());
    }

    #[test]
    fn test_utf8_passthrough() {
        let utf8 = b"<root>hello</root>".to_vec();
        assert_eq!(decode_all(utf8.clone()).unwrap(), utf8);
    }

    #[test]
    fn test_labels() {
        assert!(is_latin1_label("ISO-8859-1"));
        assert!(is_latin1_label("latin_1"));
        assert!(is_utf8_compatible_label("UTF-8"));
        assert!(is_utf16_label("UTF-16"));
        assert!(!is_utf8_compatible_label("koi8-r"));
        assert_eq!(decode_latin1(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }
}

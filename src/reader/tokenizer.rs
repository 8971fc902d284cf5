//! Incremental XML Tokenizer
//!
//! Pulls bytes through a [`BufferedReader`] and turns them into
//! [`XmlEvent`]s with bounded memory: at any time only the token being parsed
//! and the character data of the current element are held.
//!
//! The tokenizer is non-validating. It checks well-formedness (tag nesting,
//! a single root, attribute syntax, references) and applies the entity
//! security policy: an internal subset declaring entities is refused unless
//! the caller allowed it, and external entities are never resolved.
//!
//! Comments, processing instructions and the XML declaration are consumed
//! without producing events; character data on either side of them is
//! coalesced into one `Text` event.

use super::buffered::BufferedReader;
use super::events::XmlEvent;
use crate::core::attributes::parse_attributes;
use crate::core::dtd::{declares_entities, parse_internal_subset, EntityDeclarations};
use crate::core::encoding::{
    decode_latin1, is_latin1_label, is_utf16_label, is_utf8_compatible_label, DecodingReader,
    XmlEncoding,
};
use crate::core::entities::{
    decode_text, normalize_attribute_whitespace, normalize_line_endings, ReferenceError,
};
use crate::core::namespace::NamespaceResolver;
use crate::core::scanner::{is_name_start_char, is_whitespace, Scanner};
use crate::error::{Error, Result, UsageError};
use memchr::{memchr, memchr_iter, memrchr};
use std::collections::{HashSet, VecDeque};
use std::io::Read;

/// Options controlling what the tokenizer accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Accept entity declarations in the internal subset and expand them
    pub allow_entities: bool,
    /// Bytes requested from the input per read
    pub read_size: usize,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            allow_entities: false,
            read_size: super::buffered::DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Where the tokenizer stands relative to the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocState {
    /// Before the root element
    Prolog,
    /// Inside the root element
    Root,
    /// After the root element closed
    Epilog,
}

/// Outcome of one parsing step
enum Step {
    /// Something was consumed
    Progress,
    /// The buffered bytes end inside a token
    NeedData,
}

/// Pull tokenizer producing [`XmlEvent`]s
pub struct XmlTokenizer<R: Read> {
    reader: BufferedReader<DecodingReader<R>>,
    options: TokenizerOptions,
    queue: VecDeque<XmlEvent>,
    /// Character data of the innermost open element not delivered yet
    text: String,
    /// Open elements: (name as written, resolved Clark name)
    open: Vec<(String, String)>,
    namespaces: NamespaceResolver,
    entities: Option<EntityDeclarations>,
    latin1: bool,
    state: DocState,
    seen_doctype: bool,
    line: u64,
    column: u64,
    offset: u64,
    done: bool,
}

impl<R: Read> XmlTokenizer<R> {
    pub fn new(reader: R, options: TokenizerOptions) -> Self {
        XmlTokenizer {
            reader: BufferedReader::with_capacity(DecodingReader::new(reader), options.read_size),
            options,
            queue: VecDeque::with_capacity(4),
            text: String::new(),
            open: Vec::new(),
            namespaces: NamespaceResolver::new(),
            entities: None,
            latin1: false,
            state: DocState::Prolog,
            seen_doctype: false,
            line: 1,
            column: 0,
            offset: 0,
            done: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(message, self.line, self.column)
    }

    fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(Some(event));
            }
            if self.done {
                return Ok(None);
            }
            match self.step()? {
                Step::Progress => {}
                Step::NeedData => {
                    // Text held back for more data is complete at end of input
                    if !self.reader.fill_buffer()? && matches!(self.step()?, Step::NeedData) {
                        self.finish()?;
                    }
                }
            }
        }
    }

    /// Parse one construct at the start of the buffer
    fn step(&mut self) -> Result<Step> {
        if self.options.read_size == 0 {
            return Err(UsageError::InvalidReadSize(0).into());
        }
        let buf = self.reader.buffered();
        let (first, second) = match (buf.first(), buf.get(1)) {
            (None, _) => return Ok(Step::NeedData),
            (Some(&first), second) => (first, second.copied()),
        };
        if first != b'<' {
            return self.step_text();
        }
        match second {
            None => Ok(Step::NeedData),
            Some(b'/') => self.step_end_tag(),
            Some(b'!') => self.step_markup_declaration(),
            Some(b'?') => self.step_processing_instruction(),
            Some(_) => self.step_start_tag(),
        }
    }

    /// Input is exhausted: whatever is left must be a complete document
    fn finish(&mut self) -> Result<()> {
        if !self.reader.buffered().is_empty() {
            return Err(self.error("Unclosed token"));
        }
        if self.state != DocState::Epilog {
            return Err(self.error("No element found"));
        }
        self.done = true;
        Ok(())
    }

    // ========================================================================
    // Character data
    // ========================================================================

    fn step_text(&mut self) -> Result<Step> {
        let buf = self.reader.buffered();
        let take = match memchr(b'<', buf) {
            Some(lt) => lt,
            None if self.reader.reader_exhausted() => buf.len(),
            None => safe_text_prefix(buf, self.latin1),
        };
        if take == 0 {
            return Ok(Step::NeedData);
        }
        let chunk = decode_chars(&buf[..take], self.latin1)
            .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;
        self.push_text(&chunk)?;
        self.consume(take);
        Ok(Step::Progress)
    }

    fn push_text(&mut self, chunk: &str) -> Result<()> {
        if self.state != DocState::Root {
            if chunk.bytes().all(is_whitespace) {
                return Ok(());
            }
            return Err(self.misplaced());
        }
        let normalized = normalize_line_endings(chunk);
        let decoded = decode_text(&normalized, self.entities.as_ref())
            .map_err(|e| self.reference_error(e))?;
        self.text.push_str(&decoded);
        Ok(())
    }

    /// Error for content outside the root element
    fn misplaced(&self) -> Error {
        match self.state {
            DocState::Epilog => self.error("Junk after document element"),
            _ => self.error("Syntax error"),
        }
    }

    fn reference_error(&self, error: ReferenceError) -> Error {
        match error {
            ReferenceError::Undefined(name) => self.error(format!("Undefined entity &{};", name)),
            ReferenceError::Malformed => self.error("Not well-formed (invalid token)"),
            ReferenceError::InvalidChar => self.error("Reference to invalid character number"),
            ReferenceError::Recursive(name) => {
                self.error(format!("Recursive entity reference &{};", name))
            }
            ReferenceError::External(name) => Error::Security(format!(
                "External entity reference is forbidden: &{};",
                name
            )),
        }
    }

    /// Queue pending character data ahead of a tag
    fn flush_text(&mut self) {
        if !self.text.is_empty() && !self.open.is_empty() {
            self.queue.push_back(XmlEvent::Text {
                depth: self.open.len(),
                text: std::mem::take(&mut self.text),
            });
        }
    }

    // ========================================================================
    // Tags
    // ========================================================================

    fn step_start_tag(&mut self) -> Result<Step> {
        let buf = self.reader.buffered();
        if !is_name_start_char(buf[1]) {
            return Err(self.error("Not well-formed (invalid token)"));
        }
        let Some(gt) = Scanner::new(buf).find_tag_end_quoted() else {
            return Ok(Step::NeedData);
        };
        if self.state == DocState::Epilog {
            return Err(self.error("Junk after document element"));
        }

        let mut inner = &buf[1..gt];
        let self_closing = inner.last() == Some(&b'/');
        if self_closing {
            inner = &inner[..inner.len() - 1];
        }
        let mut scanner = Scanner::new(inner);
        let name_bytes = scanner.read_name().unwrap_or_default();
        let raw_attributes = parse_attributes(scanner.remaining()).map_err(|m| self.error(m))?;

        let latin1 = self.latin1;
        let invalid = || self.error("Not well-formed (invalid token)");
        let name = decode_chars(name_bytes, latin1).ok_or_else(invalid)?;
        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for attr in &raw_attributes {
            let key = decode_chars(attr.name, latin1).ok_or_else(invalid)?;
            let value = decode_chars(attr.value, latin1).ok_or_else(invalid)?;
            attributes.push((key, value, attr.is_namespace_declaration()));
        }

        self.namespaces.push_scope();
        let mut resolved = Vec::with_capacity(attributes.len());
        for (key, value, is_declaration) in attributes {
            let value = normalize_attribute_whitespace(&value);
            let value = decode_text(&value, self.entities.as_ref())
                .map_err(|e| self.reference_error(e))?
                .into_owned();
            if is_declaration {
                match key.split_once(':') {
                    Some((_, prefix)) => self.namespaces.declare(prefix, &value),
                    None => self.namespaces.declare_default(&value),
                }
            } else {
                resolved.push((key, value));
            }
        }

        let tag = self
            .namespaces
            .qualify_element(&name)
            .map_err(|prefix| self.error(format!("Unbound prefix '{}'", prefix)))?;
        let mut seen = HashSet::with_capacity(resolved.len());
        let mut attributes = Vec::with_capacity(resolved.len());
        for (key, value) in resolved {
            let qualified = self
                .namespaces
                .qualify_attribute(&key)
                .map_err(|prefix| self.error(format!("Unbound prefix '{}'", prefix)))?;
            if !seen.insert(qualified.clone()) {
                return Err(self.error("Duplicate attribute"));
            }
            attributes.push((qualified, value));
        }

        self.flush_text();
        let depth = self.open.len() + 1;
        self.queue.push_back(XmlEvent::Start {
            depth,
            tag: tag.clone(),
            attributes,
        });
        if self_closing {
            self.queue.push_back(XmlEvent::End { depth, tag });
            self.namespaces.pop_scope();
            if self.open.is_empty() {
                self.state = DocState::Epilog;
            }
        } else {
            self.open.push((name, tag));
            self.state = DocState::Root;
        }
        self.consume(gt + 1);
        Ok(Step::Progress)
    }

    fn step_end_tag(&mut self) -> Result<Step> {
        let buf = self.reader.buffered();
        let Some(gt) = memchr(b'>', buf) else {
            return Ok(Step::NeedData);
        };
        let mut scanner = Scanner::at(&buf[..gt], 2);
        let name_bytes = scanner
            .read_name()
            .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;
        scanner.skip_whitespace();
        if !scanner.is_eof() {
            return Err(self.error("Not well-formed (invalid token)"));
        }
        let name = decode_chars(name_bytes, self.latin1)
            .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;

        match self.open.last() {
            None => return Err(self.misplaced()),
            Some((open_name, _)) if *open_name != name => {
                return Err(self.error("Mismatched tag"));
            }
            Some(_) => {}
        }

        self.flush_text();
        let depth = self.open.len();
        if let Some((_, tag)) = self.open.pop() {
            self.queue.push_back(XmlEvent::End { depth, tag });
        }
        self.namespaces.pop_scope();
        if self.open.is_empty() {
            self.state = DocState::Epilog;
        }
        self.consume(gt + 1);
        Ok(Step::Progress)
    }

    // ========================================================================
    // Comments, CDATA, DOCTYPE, processing instructions
    // ========================================================================

    fn step_markup_declaration(&mut self) -> Result<Step> {
        let buf = self.reader.buffered();
        if is_cut_prefix(buf, b"<!--") || is_cut_prefix(buf, b"<![CDATA[") || is_cut_prefix(buf, b"<!DOCTYPE") {
            return Ok(Step::NeedData);
        }

        if buf.starts_with(b"<!--") {
            let Some(end) = Scanner::at(buf, 4).find_sequence(b"-->") else {
                return Ok(Step::NeedData);
            };
            self.consume(end + 3);
            return Ok(Step::Progress);
        }

        if buf.starts_with(b"<![CDATA[") {
            let Some(end) = Scanner::at(buf, 9).find_sequence(b"]]>") else {
                return Ok(Step::NeedData);
            };
            if self.state != DocState::Root {
                return Err(self.misplaced());
            }
            let content = decode_chars(&buf[9..end], self.latin1)
                .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;
            self.text.push_str(&normalize_line_endings(&content));
            self.consume(end + 3);
            return Ok(Step::Progress);
        }

        if buf.starts_with(b"<!DOCTYPE") {
            return self.step_doctype();
        }

        Err(self.error("Syntax error"))
    }

    fn step_doctype(&mut self) -> Result<Step> {
        if self.state != DocState::Prolog || self.seen_doctype {
            return Err(self.error("Syntax error"));
        }
        let buf = self.reader.buffered();
        let Some(end) = Scanner::new(buf).find_doctype_end() else {
            return Ok(Step::NeedData);
        };

        let declaration = &buf[..end];
        if let (Some(open), Some(close)) = (memchr(b'[', declaration), memrchr(b']', declaration)) {
            let subset = &declaration[open + 1..close.max(open + 1)];
            if declares_entities(subset) {
                if !self.options.allow_entities {
                    return Err(Error::Security("Entity definition is forbidden".to_string()));
                }
                let subset = decode_chars(subset, self.latin1)
                    .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;
                let declarations = parse_internal_subset(&subset).map_err(|m| self.error(m))?;
                tracing::debug!(count = declarations.len(), "expanding declared entities");
                self.entities = Some(declarations);
            }
        }

        self.seen_doctype = true;
        self.consume(end + 1);
        Ok(Step::Progress)
    }

    fn step_processing_instruction(&mut self) -> Result<Step> {
        let buf = self.reader.buffered();
        let Some(end) = Scanner::at(buf, 2).find_sequence(b"?>") else {
            return Ok(Step::NeedData);
        };
        let mut scanner = Scanner::at(&buf[..end], 2);
        let target = scanner
            .read_name()
            .ok_or_else(|| self.error("Not well-formed (invalid token)"))?;

        if target.eq_ignore_ascii_case(b"xml") {
            if target != b"xml" || self.offset != 0 {
                return Err(self.error("XML or text declaration not at start of entity"));
            }
            let declaration = parse_attributes(scanner.remaining()).map_err(|m| self.error(m))?;
            let encoding = declaration
                .iter()
                .find(|attr| attr.name == b"encoding")
                .map(|attr| String::from_utf8_lossy(attr.value).into_owned());
            if let Some(label) = encoding {
                self.apply_declared_encoding(&label)?;
            }
        }

        self.consume(end + 2);
        Ok(Step::Progress)
    }

    fn apply_declared_encoding(&mut self, label: &str) -> Result<()> {
        let detected = self.reader.get_ref().encoding().unwrap_or(XmlEncoding::Utf8);
        tracing::debug!(encoding = label, ?detected, "declared encoding");
        if detected != XmlEncoding::Utf8 {
            // The bytes were already transcoded, the label has no further effect
            return Ok(());
        }
        if is_latin1_label(label) {
            self.latin1 = true;
            Ok(())
        } else if is_utf8_compatible_label(label) {
            Ok(())
        } else if is_utf16_label(label) {
            Err(self.error("Encoding specified in XML declaration is incorrect"))
        } else {
            Err(self.error(format!("Unknown encoding '{}'", label)))
        }
    }

    // ========================================================================
    // Position tracking
    // ========================================================================

    fn consume(&mut self, n: usize) {
        let consumed = &self.reader.buffered()[..n];
        match memrchr(b'\n', consumed) {
            Some(last) => {
                self.line += memchr_iter(b'\n', consumed).count() as u64;
                self.column = (n - last - 1) as u64;
            }
            None => self.column += n as u64,
        }
        self.offset += n as u64;
        self.reader.consume(n);
    }
}

impl<R: Read> Iterator for XmlTokenizer<R> {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(event) => event.map(Ok),
            Err(error) => {
                // Parsing cannot resume after an error
                self.done = true;
                self.queue.clear();
                Some(Err(error))
            }
        }
    }
}

/// Decode raw bytes in the document encoding
fn decode_chars(bytes: &[u8], latin1: bool) -> Option<String> {
    if latin1 {
        Some(decode_latin1(bytes))
    } else {
        std::str::from_utf8(bytes).ok().map(str::to_owned)
    }
}

/// `buf` is a strict prefix of `marker`: more bytes are needed to tell
fn is_cut_prefix(buf: &[u8], marker: &[u8]) -> bool {
    buf.len() < marker.len() && marker.starts_with(buf)
}

/// Length of character data that can be decoded now without splitting a
/// reference, a CR LF pair or a UTF-8 sequence across reads
fn safe_text_prefix(buf: &[u8], latin1: bool) -> usize {
    let mut n = buf.len();
    if let Some(amp) = memrchr(b'&', &buf[..n]) {
        if memchr(b';', &buf[amp..n]).is_none() {
            n = amp;
        }
    }
    if n > 0 && buf[n - 1] == b'\r' {
        n -= 1;
    }
    if !latin1 {
        n = utf8_boundary(&buf[..n]);
    }
    n
}

/// Largest prefix length that does not end inside a multi-byte UTF-8 sequence
fn utf8_boundary(bytes: &[u8]) -> usize {
    let len = bytes.len();
    // A sequence is at most 4 bytes: look back for its lead byte
    for back in 1..=len.min(4) {
        let b = bytes[len - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let width = match b {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            _ => 4,
        };
        return if width > back { len - back } else { len };
    }
    len
}

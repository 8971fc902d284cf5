//! Input Stream Flattening
//!
//! A document may arrive as one buffer, as a reader, or as any nesting of
//! sequences of those, possibly produced lazily. [`StreamChain`] turns such a
//! description into one sequential byte source:
//! - buffers are served in slices of the requested size
//! - readers are pulled until they report end of input, then dropped
//! - sequences are expanded depth-first, one item at a time
//!
//! Zero-length chunks are skipped, so an empty read always means the whole
//! chain is exhausted.

use crate::error::{Result, UsageError};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

/// A description of input bytes.
pub enum Streamable {
    /// Bytes already in memory.
    Buffer(Cow<'static, [u8]>),
    /// Any source implementing [`Read`]; an empty read marks its end.
    Reader(Box<dyn Read>),
    /// A sequence of further descriptions, consumed lazily and in order.
    Chain(Box<dyn Iterator<Item = Streamable>>),
}

impl Streamable {
    /// Wrap a reader.
    pub fn reader<R: Read + 'static>(reader: R) -> Self {
        Streamable::Reader(Box::new(reader))
    }

    /// Wrap a (possibly lazy) sequence of streamables.
    pub fn chain<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'static,
        S: Into<Streamable> + 'static,
    {
        Streamable::Chain(Box::new(items.into_iter().map(Into::into)))
    }
}

impl fmt::Debug for Streamable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Streamable::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Streamable::Reader(_) => f.write_str("Reader"),
            Streamable::Chain(_) => f.write_str("Chain"),
        }
    }
}

impl From<&'static [u8]> for Streamable {
    fn from(bytes: &'static [u8]) -> Self {
        Streamable::Buffer(Cow::Borrowed(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Streamable {
    fn from(bytes: &'static [u8; N]) -> Self {
        Streamable::Buffer(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Streamable {
    fn from(bytes: Vec<u8>) -> Self {
        Streamable::Buffer(Cow::Owned(bytes))
    }
}

impl From<Box<[u8]>> for Streamable {
    fn from(bytes: Box<[u8]>) -> Self {
        Streamable::Buffer(Cow::Owned(bytes.into_vec()))
    }
}

impl From<Cow<'static, [u8]>> for Streamable {
    fn from(bytes: Cow<'static, [u8]>) -> Self {
        Streamable::Buffer(bytes)
    }
}

impl From<Vec<Streamable>> for Streamable {
    fn from(items: Vec<Streamable>) -> Self {
        Streamable::Chain(Box::new(items.into_iter()))
    }
}

impl<const N: usize> From<[Streamable; N]> for Streamable {
    fn from(items: [Streamable; N]) -> Self {
        Streamable::Chain(Box::new(items.into_iter()))
    }
}

/// Anything a [`Parser`](crate::Parser) can read a document from.
///
/// Text is deliberately not accepted: its byte encoding would be a guess.
/// Sets and maps are not accepted either since their order is unspecified.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as an XML input stream",
    label = "not a buffer, reader or sequence of those",
    note = "strings must be encoded into bytes first, e.g. with `.as_bytes()` or `.into_bytes()`",
    note = "sets and maps are not streams: their iteration order is not guaranteed"
)]
pub trait IntoStreamable {
    fn into_streamable(self) -> Streamable;
}

impl<T: Into<Streamable>> IntoStreamable for T {
    fn into_streamable(self) -> Streamable {
        self.into()
    }
}

/// One level of the expansion stack.
enum Source {
    Buffer { bytes: Cow<'static, [u8]>, pos: usize },
    Reader(Box<dyn Read>),
    Chain(Box<dyn Iterator<Item = Streamable>>),
}

impl From<Streamable> for Source {
    fn from(streamable: Streamable) -> Self {
        match streamable {
            Streamable::Buffer(bytes) => Source::Buffer { bytes, pos: 0 },
            Streamable::Reader(reader) => Source::Reader(reader),
            Streamable::Chain(items) => Source::Chain(items),
        }
    }
}

/// Sequential reader over a flattened [`Streamable`].
pub struct StreamChain {
    stack: Vec<Source>,
}

impl StreamChain {
    /// Start reading the given description.
    pub fn new(streamable: impl IntoStreamable) -> Self {
        StreamChain {
            stack: vec![streamable.into_streamable().into()],
        }
    }

    /// Read up to `size` bytes. An empty result means every input is exhausted,
    /// and every later call returns empty as well.
    pub fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Err(UsageError::InvalidReadSize(size).into());
        }
        let mut buf = vec![0u8; size];
        let read = self.fill(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Whether every input has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.stack.is_empty()
    }

    /// Copy the next available chunk into `buf`, expanding sources as needed.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(top) = self.stack.last_mut() {
            match top {
                Source::Buffer { bytes, pos } => {
                    let remaining = &bytes[*pos..];
                    if remaining.is_empty() {
                        self.stack.pop();
                        continue;
                    }
                    let n = remaining.len().min(buf.len());
                    buf[..n].copy_from_slice(&remaining[..n]);
                    *pos += n;
                    return Ok(n);
                }
                Source::Reader(reader) => match reader.read(buf) {
                    Ok(0) => {
                        self.stack.pop();
                    }
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                },
                Source::Chain(items) => match items.next() {
                    Some(item) => self.stack.push(item.into()),
                    None => {
                        self.stack.pop();
                    }
                },
            }
        }
        Ok(0)
    }
}

impl Read for StreamChain {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                UsageError::InvalidReadSize(0),
            ));
        }
        self.fill(buf)
    }
}

impl fmt::Debug for StreamChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamChain").field("depth", &self.stack.len()).finish()
    }
}

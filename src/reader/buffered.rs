//! Buffered XML Reader
//!
//! Reads XML from any source implementing the Read trait into a growable
//! window. The tokenizer looks at the buffered bytes, consumes what it could
//! parse, and asks for more when a token is cut at the end of the window.

use std::io::Read;

/// Buffer size for reading chunks
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered XML reader for streaming input
pub struct BufferedReader<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
    /// Most bytes requested from the reader in one call
    read_size: usize,
}

impl<R: Read> BufferedReader<R> {
    /// Create a new buffered reader reading at most `read_size` bytes at a time
    pub fn with_capacity(reader: R, read_size: usize) -> Self {
        BufferedReader {
            reader,
            buffer: Vec::with_capacity(read_size),
            pos: 0,
            end: 0,
            eof: false,
            read_size,
        }
    }

    /// Pull more data from the reader. Returns false once the reader is exhausted.
    ///
    /// Consumed bytes are compacted away first; the buffer only grows when a
    /// single unconsumed token is larger than what it already holds.
    pub fn fill_buffer(&mut self) -> std::io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        // Compact: move remaining data to start
        if self.pos > 0 {
            let remaining = self.end - self.pos;
            if remaining > 0 {
                self.buffer.copy_within(self.pos..self.end, 0);
            }
            self.end = remaining;
            self.pos = 0;
        }

        let wanted = self.end + self.read_size;
        if self.buffer.len() < wanted {
            self.buffer.resize(wanted, 0);
        }

        loop {
            match self.reader.read(&mut self.buffer[self.end..wanted]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(read) => {
                    self.end += read;
                    return Ok(true);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Get current buffered data as a slice
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..self.end]
    }

    /// Whether the reader reported its end (buffered bytes may remain)
    pub fn reader_exhausted(&self) -> bool {
        self.eof
    }

    /// Consume n bytes from the buffer
    pub fn consume(&mut self, n: usize) {
        self.pos += n.min(self.end - self.pos);
    }

    /// Access the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_buffered_reader() {
        let data = b"<root>content</root>";
        let mut reader = BufferedReader::with_capacity(Cursor::new(data.to_vec()), DEFAULT_BUFFER_SIZE);

        assert!(reader.fill_buffer().unwrap());
        assert_eq!(reader.buffered(), data);
        assert!(!reader.fill_buffer().unwrap());
        assert!(reader.reader_exhausted());
        reader.consume(data.len());
        assert!(reader.buffered().is_empty());
    }

    #[test]
    fn test_small_reads_compact() {
        let data = b"abcdefghij";
        let mut reader = BufferedReader::with_capacity(Cursor::new(data.to_vec()), 4);

        reader.fill_buffer().unwrap();
        assert_eq!(reader.buffered(), b"abcd");
        reader.consume(3);
        reader.fill_buffer().unwrap();
        assert_eq!(reader.buffered(), b"defgh");
    }

    #[test]
    fn test_grows_for_long_tokens() {
        let data = vec![b'x'; 20];
        let mut reader = BufferedReader::with_capacity(Cursor::new(data), 4);
        while reader.fill_buffer().unwrap() {}
        assert_eq!(reader.buffered().len(), 20);
    }
}

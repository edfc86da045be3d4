//! Bounded look-ahead for container sniffing.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::Read;

/// Buffers the head of a stream so detection can look at it more than once
/// without reading past a fixed limit.
pub struct PeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Up to `limit` bytes from the start of the stream.
    ///
    /// Only the bytes not already buffered are read, so asking for a shorter
    /// head after a longer one never touches the stream. A stream shorter
    /// than `limit` yields everything it has.
    pub fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if self.buffer.len() < limit {
            let missing = (limit - self.buffer.len()) as u64;
            (&mut self.inner).take(missing).read_to_end(&mut self.buffer).or_raise(|| ErrorKind::Io)?;
        }
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// Everything buffered so far.
    pub fn head(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    const BOOKS: &[u8] = b"\"_id\",\"book_uuid\",\"title\"\n\"1\",\"abc\",\"Dune\"\n";

    /// Counts how many bytes were pulled from the wrapped reader.
    struct Counting<'a> {
        inner: &'a [u8],
        read: usize,
    }

    impl Read for Counting<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.read += n;
            Ok(n)
        }
    }

    #[rstest]
    #[case(5, b"\"_id\"")]
    #[case(6, b"\"_id\",")]
    #[case(0, b"")]
    fn test_peek(#[case] limit: usize, #[case] expected: &[u8]) {
        let mut peekable = PeekableReader::new(Cursor::new(BOOKS));
        assert_eq!(peekable.peek(limit).unwrap(), expected);
    }

    #[test]
    fn test_never_reads_past_limit() {
        let mut peekable = PeekableReader::new(Counting { inner: BOOKS, read: 0 });
        peekable.peek(6).unwrap();
        peekable.peek(2).unwrap();
        assert_eq!(peekable.peek(6).unwrap(), b"\"_id\",");
        assert_eq!(peekable.inner.read, 6);
        assert_eq!(peekable.head(), b"\"_id\",");
    }

    #[test]
    fn test_short_stream() {
        let mut peekable = PeekableReader::new(Cursor::new(b"tiny"));
        assert_eq!(peekable.peek(512).unwrap(), b"tiny");
        assert!(PeekableReader::new(Cursor::new(b"")).peek(512).unwrap().is_empty());
    }
}

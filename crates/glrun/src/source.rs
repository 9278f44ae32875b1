//! # Byte sources
//!
//! A source produces a byte stream of unknown length, one chunk per call.
//! The streaming bridge hands it a buffer the size of the staging region;
//! the source fills some prefix of it.

use std::collections::VecDeque;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

#[derive(Debug)]
pub enum Error {
    /// The underlying reader failed.
    Io(std::io::Error),
    /// No payload is known under this URI.
    NotFound(String),
    /// The URI can't be resolved (for example, it escapes the loader's root).
    InvalidUri(String),
    /// The stream was cut off before it finished.
    Interrupted(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::NotFound(uri) => write!(f, "payload not found: {}", uri),
            Self::InvalidUri(uri) => write!(f, "invalid payload uri: {}", uri),
            Self::Interrupted(msg) => write!(f, "stream interrupted: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of one read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// This many bytes at the front of the buffer are valid.
    Data(usize),
    /// The stream is exhausted.
    End,
}

#[async_trait::async_trait]
pub trait ByteSource: Send {
    /// Fills a prefix of `buf` with the next bytes of the stream.
    ///
    /// # Invariants
    /// - Must never report more bytes than `buf.len()`.
    /// - After returning `Chunk::End`, the source is done.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Chunk>;
}

/// A source backed by an in-memory buffer.
///
/// By default each read fills as much of the caller's buffer as it can.
/// [`MemorySource::split`] scripts the size of each read instead, which is
/// how tests imitate a network that delivers short reads.
#[derive(Clone, Debug)]
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    sizes: VecDeque<usize>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            sizes: VecDeque::new(),
        }
    }

    /// Delivers reads of the given sizes first, then falls back to full reads.
    pub fn split(data: impl Into<Vec<u8>>, sizes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            sizes: sizes.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

#[async_trait::async_trait]
impl ByteSource for MemorySource {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Chunk> {
        if self.remaining() == 0 {
            return Ok(Chunk::End);
        }
        let want = self.sizes.pop_front().unwrap_or(buf.len());
        let n = want.min(buf.len()).min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Chunk::Data(n))
    }
}

/// A source reading from any tokio reader: a file, a socket, a pipe.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait::async_trait]
impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Chunk> {
        if buf.is_empty() {
            return Ok(Chunk::Data(0));
        }
        match self.reader.read(buf).await? {
            0 => Ok(Chunk::End),
            n => Ok(Chunk::Data(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_fills_buffer() {
        let mut src = MemorySource::new(vec![7u8; 10]);
        let mut buf = [0u8; 4];
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::Data(4));
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::Data(4));
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::Data(2));
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::End);
    }

    #[tokio::test]
    async fn test_split_is_capped_by_buffer() {
        let mut src = MemorySource::split((0u8..20).collect::<Vec<_>>(), [3, 50]);
        let mut buf = [0u8; 8];
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::Data(3));
        assert_eq!(&buf[..3], &[0, 1, 2]);
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::Data(8));
        assert_eq!(&buf[..], &[3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(src.remaining(), 9);
    }

    #[tokio::test]
    async fn test_empty_source_ends_immediately() {
        let mut src = MemorySource::new(Vec::new());
        let mut buf = [0u8; 8];
        assert_eq!(src.read_chunk(&mut buf).await.unwrap(), Chunk::End);
    }

    #[tokio::test]
    async fn test_reader_source_reads_until_eof() {
        let bytes: &[u8] = b"abcdefghij";
        let mut src = ReaderSource::new(bytes);
        let mut buf = [0u8; 6];
        let mut out = Vec::new();
        loop {
            match src.read_chunk(&mut buf).await.unwrap() {
                Chunk::Data(n) => out.extend_from_slice(&buf[..n]),
                Chunk::End => break,
            }
        }
        assert_eq!(out, bytes);
    }
}

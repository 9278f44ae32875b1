//! # Streaming bridge
//!
//! Moves a byte stream of unknown length into the guest through the
//! fixed-size staging region.
//!
//! ## Protocol
//!
//! ```text
//! read chunk -> write to staging -> consume(len) -> read chunk -> ...
//! ```
//!
//! The alternation is strict. The next read is not requested until the
//! consume call for the previous chunk has returned, because the next write
//! lands on the same bytes. The read is the only await point that can
//! actually suspend.
//!
//! Runs that share a staging region must not overlap. `Session::load`
//! takes `&mut self`, which is what serialises them.

use tracing::trace;

use crate::source;
use crate::source::ByteSource;
use crate::source::Chunk;
use crate::staging;

#[derive(Debug)]
pub enum Error {
    /// The source failed mid-stream. Chunks already consumed stay consumed.
    TransferFailed(source::Error),
    /// The source reported more bytes than the buffer it was given.
    Overrun { returned: usize, capacity: usize },
    /// The transfer buffer is empty, so no read could ever make progress.
    NoCapacity,
    /// The chunk could not be placed in the staging region.
    Staging(staging::Error),
    /// The guest's consume export trapped.
    Consume(wasmtime::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransferFailed(e) => write!(f, "transfer failed: {}", e),
            Self::Overrun { returned, capacity } => write!(
                f,
                "source returned {} bytes for a {} byte buffer",
                returned, capacity
            ),
            Self::NoCapacity => write!(f, "transfer buffer has zero capacity"),
            Self::Staging(e) => write!(f, "staging error: {}", e),
            Self::Consume(e) => write!(f, "consume call failed: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<staging::Error> for Error {
    fn from(e: staging::Error) -> Self {
        Self::Staging(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Summary of a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Number of consume calls made.
    pub chunks: usize,
    pub bytes: u64,
}

/// The consuming side of a run: puts a chunk where the guest expects it and
/// runs the guest over it.
#[async_trait::async_trait]
pub trait ChunkSink: Send {
    /// Delivers one chunk. Must not return until the consumer is done with it.
    async fn deliver(&mut self, chunk: &[u8]) -> Result<()>;
}

/// Drives byte sources into a sink through a reusable transfer buffer.
pub struct StreamingBridge {
    buf: Box<[u8]>,
}

impl StreamingBridge {
    /// `capacity` should match the staging region's.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Pumps `source` into `sink` until the source ends or fails.
    pub async fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<Transfer>
    where
        S: ByteSource + ?Sized,
        K: ChunkSink + ?Sized,
    {
        let capacity = self.buf.len();
        if capacity == 0 {
            return Err(Error::NoCapacity);
        }
        let mut transfer = Transfer::default();

        loop {
            let len = match source
                .read_chunk(&mut self.buf)
                .await
                .map_err(Error::TransferFailed)?
            {
                Chunk::End => break,
                // A short read of nothing isn't a chunk.
                Chunk::Data(0) => continue,
                Chunk::Data(n) if n > capacity => {
                    return Err(Error::Overrun { returned: n, capacity });
                }
                Chunk::Data(n) => n,
            };

            sink.deliver(&self.buf[..len]).await?;
            transfer.chunks += 1;
            transfer.bytes += len as u64;
            trace!(chunk = transfer.chunks, len, "chunk consumed");
        }

        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::source::MemorySource;
    use crate::staging::StagingRegion;

    /// Sink that stages into a plain buffer and records what a consumer
    /// would observe at each call.
    struct RecordingSink {
        mem: Vec<u8>,
        region: StagingRegion,
        seen: Vec<Vec<u8>>,
    }

    impl RecordingSink {
        fn new(capacity: u32) -> Self {
            let base = 64;
            Self {
                mem: vec![0u8; (base + capacity + 64) as usize],
                region: StagingRegion::new(base, capacity),
                seen: Vec::new(),
            }
        }

        fn lengths(&self) -> Vec<usize> {
            self.seen.iter().map(Vec::len).collect()
        }
    }

    #[async_trait::async_trait]
    impl ChunkSink for RecordingSink {
        async fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
            self.region.write(&mut self.mem, chunk)?;
            // Read back from the region, as the guest would.
            let base = self.region.base() as usize;
            self.seen.push(self.mem[base..base + chunk.len()].to_vec());
            Ok(())
        }
    }

    struct FailingSource {
        good_chunks: usize,
    }

    #[async_trait::async_trait]
    impl ByteSource for FailingSource {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> source::Result<Chunk> {
            if self.good_chunks == 0 {
                return Err(source::Error::Interrupted("connection reset".into()));
            }
            self.good_chunks -= 1;
            buf[0] = 1;
            Ok(Chunk::Data(1))
        }
    }

    struct LyingSource;

    #[async_trait::async_trait]
    impl ByteSource for LyingSource {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> source::Result<Chunk> {
            Ok(Chunk::Data(buf.len() + 1))
        }
    }

    #[tokio::test]
    async fn test_full_chunks_then_tail() {
        let mut bridge = StreamingBridge::new(16384);
        let mut sink = RecordingSink::new(16384);
        let mut src = MemorySource::new(vec![5u8; 16384 * 2 + 500]);

        let transfer = bridge.run(&mut src, &mut sink).await.unwrap();

        assert_eq!(sink.lengths(), vec![16384, 16384, 500]);
        assert_eq!(transfer, Transfer { chunks: 3, bytes: 33268 });
    }

    #[tokio::test]
    async fn test_empty_stream_makes_no_calls() {
        let mut bridge = StreamingBridge::new(64);
        let mut sink = RecordingSink::new(64);
        let mut src = MemorySource::new(Vec::new());

        let transfer = bridge.run(&mut src, &mut sink).await.unwrap();
        assert_eq!(transfer.chunks, 0);
        assert!(sink.seen.is_empty());
    }

    #[tokio::test]
    async fn test_exact_fill_has_no_trailing_call() {
        let mut bridge = StreamingBridge::new(64);
        let mut sink = RecordingSink::new(64);
        let mut src = MemorySource::new(vec![1u8; 128]);

        bridge.run(&mut src, &mut sink).await.unwrap();
        assert_eq!(sink.lengths(), vec![64, 64]);
    }

    #[tokio::test]
    async fn test_zero_length_reads_are_skipped() {
        let mut bridge = StreamingBridge::new(8);
        let mut sink = RecordingSink::new(8);
        let mut src = MemorySource::split(vec![1u8, 2, 3, 4, 5], [0, 2, 0, 3]);

        bridge.run(&mut src, &mut sink).await.unwrap();
        assert_eq!(sink.seen, vec![vec![1, 2], vec![3, 4, 5]]);
    }

    #[tokio::test]
    async fn test_random_splits_preserve_order_and_bytes() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let capacity = rng.gen_range(1..=512usize);
            let total = rng.gen_range(0..4096usize);
            let data: Vec<u8> = (0..total).map(|_| rng.r#gen()).collect();
            let sizes: Vec<usize> = (0..total).map(|_| rng.gen_range(1..=capacity)).collect();

            let mut bridge = StreamingBridge::new(capacity);
            let mut sink = RecordingSink::new(capacity as u32);
            let mut src = MemorySource::split(data.clone(), sizes.clone());

            let transfer = bridge.run(&mut src, &mut sink).await.unwrap();

            // Each call saw exactly the next scripted slice.
            let mut offset = 0;
            for (seen, want) in sink.seen.iter().zip(&sizes) {
                let want = (*want).min(total - offset);
                assert_eq!(seen.len(), want);
                assert_eq!(seen[..], data[offset..offset + want]);
                offset += want;
            }
            assert_eq!(offset, total);
            assert_eq!(transfer.bytes, total as u64);
            assert_eq!(sink.seen.concat(), data);
        }
    }

    #[tokio::test]
    async fn test_source_failure_is_transfer_failed() {
        let mut bridge = StreamingBridge::new(8);
        let mut sink = RecordingSink::new(8);
        let mut src = FailingSource { good_chunks: 2 };

        let err = bridge.run(&mut src, &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::TransferFailed(source::Error::Interrupted(_))));
        // What arrived before the failure was delivered.
        assert_eq!(sink.seen.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_fails_instead_of_spinning() {
        let mut bridge = StreamingBridge::new(0);
        let mut sink = RecordingSink::new(0);
        let mut src = MemorySource::new(vec![1u8, 2, 3]);

        let err = bridge.run(&mut src, &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::NoCapacity));
        assert!(sink.seen.is_empty());
    }

    #[tokio::test]
    async fn test_overrun_is_rejected() {
        let mut bridge = StreamingBridge::new(8);
        let mut sink = RecordingSink::new(8);

        let err = bridge.run(&mut LyingSource, &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::Overrun { returned: 9, capacity: 8 }));
        assert!(sink.seen.is_empty());
    }
}

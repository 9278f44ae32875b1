//! # Guest memory access
//!
//! Every span the guest hands us is bounds-checked against the memory as it
//! is *now*. Guest memory can grow (and move) during any call into the
//! guest, so nothing here keeps a pointer or slice across calls: the
//! [`MemoryView`] holds the wasmtime `Memory` handle and asks the store for
//! the current data on every access.
//!
//! The free functions operate on a plain slice. The dispatcher uses them on
//! the slice it borrowed alongside the store data.

use std::borrow::Cow;
use std::ops::Range;

use wasmtime::AsContext;
use wasmtime::Memory;
use wasmtime::StoreContext;
use wasmtime::StoreContextMut;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `[offset, offset + len)` does not fit inside `size` bytes of memory.
    OutOfBounds { offset: u32, len: u64, size: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds { offset, len, size } => write!(
                f,
                "span out of bounds: offset {} len {} exceeds memory of {} bytes",
                offset, len, size
            ),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// An `(offset, length)` pair into guest memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// A span of `count` elements of `width` bytes each.
    pub fn of_elements(offset: u32, count: u32, width: u32) -> Result<Self> {
        let len = count.checked_mul(width).ok_or(Error::OutOfBounds {
            offset,
            len: u64::from(count) * u64::from(width),
            size: 0,
        })?;
        Ok(Self { offset, len })
    }

    fn range(self, size: usize) -> Result<Range<usize>> {
        checked_range(size, self.offset, self.len as usize)
    }
}

fn checked_range(size: usize, offset: u32, len: usize) -> Result<Range<usize>> {
    let start = offset as usize;
    match start.checked_add(len) {
        Some(end) if end <= size => Ok(start..end),
        _ => Err(Error::OutOfBounds {
            offset,
            len: len as u64,
            size,
        }),
    }
}

pub fn read(mem: &[u8], span: Span) -> Result<&[u8]> {
    let range = span.range(mem.len())?;
    Ok(&mem[range])
}

/// Reads a span as text. Invalid UTF-8 is replaced, not rejected.
pub fn read_utf8(mem: &[u8], span: Span) -> Result<Cow<'_, str>> {
    read(mem, span).map(String::from_utf8_lossy)
}

pub fn write(mem: &mut [u8], offset: u32, bytes: &[u8]) -> Result<()> {
    let range = checked_range(mem.len(), offset, bytes.len())?;
    mem[range].copy_from_slice(bytes);
    Ok(())
}

/// Bounds-checked window onto a guest's exported memory.
#[derive(Clone, Copy, Debug)]
pub struct MemoryView {
    memory: Memory,
}

impl MemoryView {
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> Memory {
        self.memory
    }

    /// Current size in bytes.
    pub fn size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(store)
    }

    pub fn read_bytes<'a, T: 'static>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        span: Span,
    ) -> Result<&'a [u8]> {
        read(self.memory.data(store), span)
    }

    pub fn read_utf8<'a, T: 'static>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        span: Span,
    ) -> Result<Cow<'a, str>> {
        read_utf8(self.memory.data(store), span)
    }

    pub fn write_bytes<'a, T: 'static>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
        offset: u32,
        bytes: &[u8],
    ) -> Result<()> {
        write(self.memory.data_mut(store), offset, bytes)
    }

    /// The whole memory, for callers that check their own ranges.
    pub fn data_mut<'a, T: 'static>(&self, store: impl Into<StoreContextMut<'a, T>>) -> &'a mut [u8] {
        self.memory.data_mut(store)
    }
}

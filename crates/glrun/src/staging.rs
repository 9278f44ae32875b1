//! The staging region: a fixed window in guest memory that bulk payloads
//! pass through one chunk at a time.
//!
//! The guest exports the region's base address as an `i32` global. The
//! region is a single-slot mailbox. Each write overwrites the previous
//! chunk, so a write must not happen until the guest has consumed the last
//! one.

use wasmtime::AsContextMut;
use wasmtime::Instance;
use wasmtime::Val;

use crate::memory;
use crate::memory::Span;

#[derive(Debug)]
pub enum Error {
    /// The guest does not export a global with this name.
    MissingGlobal(String),
    /// The global exists but isn't an `i32`.
    NotAnAddress(String),
    /// A chunk larger than the region was offered.
    ChunkTooLarge { len: usize, capacity: u32 },
    Memory(memory::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingGlobal(name) => write!(f, "staging global '{}' not exported", name),
            Self::NotAnAddress(name) => write!(f, "staging global '{}' is not an i32 address", name),
            Self::ChunkTooLarge { len, capacity } => {
                write!(f, "chunk of {} bytes exceeds staging capacity {}", len, capacity)
            }
            Self::Memory(e) => write!(f, "staging region: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<memory::Error> for Error {
    fn from(e: memory::Error) -> Self {
        Self::Memory(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagingRegion {
    base: u32,
    capacity: u32,
}

impl StagingRegion {
    pub fn new(base: u32, capacity: u32) -> Self {
        Self { base, capacity }
    }

    /// Reads the region's base address from the guest global `name`.
    pub fn locate(
        mut store: impl AsContextMut,
        instance: &Instance,
        name: &str,
        capacity: u32,
    ) -> Result<Self> {
        let global = instance
            .get_global(&mut store, name)
            .ok_or_else(|| Error::MissingGlobal(name.to_string()))?;
        match global.get(&mut store) {
            Val::I32(base) => Ok(Self::new(base as u32, capacity)),
            _ => Err(Error::NotAnAddress(name.to_string())),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn span(&self) -> Span {
        Span::new(self.base, self.capacity)
    }

    /// Copies `chunk` to the start of the region.
    ///
    /// The whole region must fit in `mem`, not only the chunk. `mem` must be
    /// freshly borrowed: the guest may have grown its memory since the last
    /// write.
    pub fn write(&self, mem: &mut [u8], chunk: &[u8]) -> Result<()> {
        if chunk.len() > self.capacity as usize {
            return Err(Error::ChunkTooLarge {
                len: chunk.len(),
                capacity: self.capacity,
            });
        }
        memory::read(mem, self.span())?;
        memory::write(mem, self.base, chunk)?;
        Ok(())
    }
}

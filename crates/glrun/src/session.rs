//! # Session
//!
//! A running guest: its store (registry, backend and presenter live in the
//! store's data), the instance, the exported memory and the staging
//! region, plus the transfer buffer used to stream payloads in.
//!
//! Everything here is driven from one task. `load` takes `&mut self`, so a
//! second payload can't start streaming into the staging region while one
//! is still running.

use tracing::debug;
use tracing::info;
use wasmtime::Instance;
use wasmtime::Store;
use wasmtime::TypedFunc;
use wasmtime::WasmParams;
use wasmtime::WasmResults;

use crate::backend::Backend;
use crate::backend::Resource;
use crate::config::HarnessConfig;
use crate::config::Payload;
use crate::context::HarnessCtx;
use crate::dispatch;
use crate::loader::Loader;
use crate::memory;
use crate::memory::MemoryView;
use crate::memory::Span;
use crate::registry::ResourceRegistry;
use crate::source;
use crate::source::ByteSource;
use crate::staging::StagingRegion;
use crate::stream;
use crate::stream::ChunkSink;
use crate::stream::StreamingBridge;
use crate::stream::Transfer;

#[derive(Debug)]
pub enum Error {
    /// The guest has no function export by this name.
    MissingExport(String),
    /// The export exists but has the wrong signature.
    Export { name: String, source: wasmtime::Error },
    /// The export trapped. Contract violations by host calls land here.
    Call { name: String, source: wasmtime::Error },
    Stream(stream::Error),
    /// A payload could not be opened.
    Source(source::Error),
    Memory(memory::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingExport(name) => write!(f, "Missing export: {}", name),
            Self::Export { name, source } => write!(f, "Bad export {}: {}", name, source),
            Self::Call { name, source } => write!(f, "Call to {} failed: {}", name, source),
            Self::Stream(e) => write!(f, "Stream error: {}", e),
            Self::Source(e) => write!(f, "Source error: {}", e),
            Self::Memory(e) => write!(f, "Memory error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<stream::Error> for Error {
    fn from(e: stream::Error) -> Self {
        Self::Stream(e)
    }
}

impl From<memory::Error> for Error {
    fn from(e: memory::Error) -> Self {
        Self::Memory(e)
    }
}

impl Error {
    /// The host-call contract violation that trapped the guest, if that's
    /// what happened.
    pub fn contract_violation(&self) -> Option<&dispatch::Error> {
        match self {
            Self::Call { source, .. } | Self::Stream(stream::Error::Consume(source)) => source.downcast_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct Session<B: Backend> {
    store: Store<HarnessCtx<B>>,
    instance: Instance,
    memory: MemoryView,
    staging: StagingRegion,
    bridge: StreamingBridge,
}

impl<B: Backend> Session<B> {
    pub(crate) fn new(store: Store<HarnessCtx<B>>, instance: Instance, memory: MemoryView, staging: StagingRegion) -> Self {
        let bridge = StreamingBridge::new(staging.capacity() as usize);
        Self {
            store,
            instance,
            memory,
            staging,
            bridge,
        }
    }

    pub fn staging(&self) -> StagingRegion {
        self.staging
    }

    pub fn backend(&self) -> &B {
        self.store.data().backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.store.data_mut().backend_mut()
    }

    pub fn registry(&self) -> &ResourceRegistry<Resource<B>> {
        self.store.data().registry()
    }

    pub fn memory_size(&self) -> usize {
        self.memory.size(&self.store)
    }

    /// Copies `span` out of guest memory.
    pub fn read_memory(&self, span: Span) -> Result<Vec<u8>> {
        Ok(self.memory.read_bytes(&self.store, span)?.to_vec())
    }

    /// Decodes `span` as UTF-8, replacing invalid sequences.
    pub fn read_text(&self, span: Span) -> Result<String> {
        Ok(self.memory.read_utf8(&self.store, span)?.into_owned())
    }

    /// Copies `bytes` into guest memory at `offset`.
    pub fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        Ok(self.memory.write_bytes(&mut self.store, offset, bytes)?)
    }

    /// Streams `source` into the guest, calling `export(len)` once per chunk.
    pub async fn load<S>(&mut self, source: &mut S, export: &str) -> Result<Transfer>
    where
        S: ByteSource + ?Sized,
    {
        let consume = self.export::<u32, ()>(export)?;
        let mut sink = ModuleSink {
            store: &mut self.store,
            memory: self.memory,
            staging: self.staging,
            consume,
        };
        let transfer = self.bridge.run(source, &mut sink).await?;
        info!(export, chunks = transfer.chunks, bytes = transfer.bytes, "payload loaded");
        Ok(transfer)
    }

    /// Opens `payload.uri` through `loader` and loads it.
    pub async fn fetch(&mut self, loader: &dyn Loader, payload: &Payload) -> Result<Transfer> {
        let mut source = loader.open(&payload.uri).await.map_err(Error::Source)?;
        debug!(uri = %payload.uri, export = %payload.export, "payload opened");
        self.load(source.as_mut(), &payload.export).await
    }

    /// Startup sequence: every payload in order, `init`, a first frame, the
    /// debug flags, then a second frame.
    pub async fn boot(&mut self, loader: &dyn Loader, config: &HarnessConfig) -> Result<Vec<Transfer>> {
        let mut transfers = Vec::with_capacity(config.payloads.len());
        for payload in &config.payloads {
            transfers.push(self.fetch(loader, payload).await?);
        }

        self.init(config.aspect).await?;
        self.render().await?;
        for flag in &config.flags {
            self.set_flag(&flag.name, flag.on).await?;
        }
        self.render().await?;
        Ok(transfers)
    }

    pub async fn init(&mut self, aspect: f32) -> Result<()> {
        self.invoke("init", aspect).await
    }

    pub async fn render(&mut self) -> Result<()> {
        self.invoke("render", ()).await
    }

    pub async fn set_aspect(&mut self, aspect: f32) -> Result<()> {
        self.invoke("setAspect", aspect).await
    }

    /// Calls a boolean toggle such as `setDebugPath`.
    pub async fn set_flag(&mut self, name: &str, on: bool) -> Result<()> {
        self.invoke(name, on as u32).await
    }

    /// Calls a no-argument export such as `startPath`.
    pub async fn trigger(&mut self, name: &str) -> Result<()> {
        self.invoke(name, ()).await
    }

    /// Calls export `name` and waits for it to finish.
    pub async fn invoke<P, R>(&mut self, name: &str, params: P) -> Result<R>
    where
        P: WasmParams + Send + Sync,
        R: WasmResults + Send + Sync,
    {
        let func = self.export::<P, R>(name)?;
        func.call_async(&mut self.store, params)
            .await
            .map_err(|source| Error::Call {
                name: name.to_string(),
                source,
            })
    }

    /// Ends the session, releasing every live resource, and hands the
    /// backend back.
    pub fn shutdown(mut self) -> B {
        let released = self.store.data_mut().release_all();
        debug!(released, "session closed");
        self.store.into_data().backend
    }

    fn export<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| Error::MissingExport(name.to_string()))?;
        func.typed::<P, R>(&self.store).map_err(|source| Error::Export {
            name: name.to_string(),
            source,
        })
    }
}

/// Delivers chunks into the staging region and runs the guest's consume
/// export over them.
struct ModuleSink<'a, B: Backend> {
    store: &'a mut Store<HarnessCtx<B>>,
    memory: MemoryView,
    staging: StagingRegion,
    consume: TypedFunc<u32, ()>,
}

#[async_trait::async_trait]
impl<'a, B: Backend> ChunkSink for ModuleSink<'a, B> {
    async fn deliver(&mut self, chunk: &[u8]) -> stream::Result<()> {
        // Looked up again per chunk: the last consume may have grown memory.
        self.staging.write(self.memory.data_mut(&mut *self.store), chunk)?;
        self.consume
            .call_async(&mut *self.store, chunk.len() as u32)
            .await
            .map_err(stream::Error::Consume)
    }
}

//! # Session Builder
//!
//! Fluent API for starting a guest: pick a presenter, point at the staging
//! export, set a memory budget, then `build()` links the dispatcher and
//! instantiates the module.

use std::sync::Arc;

use tracing::debug;
use wasmtime::Linker;
use wasmtime::Store;

use crate::backend::Backend;
use crate::config::Budget;
use crate::config::HarnessConfig;
use crate::config::STAGING_CAPACITY;
use crate::context::HarnessCtx;
use crate::handles::ModuleId;
use crate::host;
use crate::memory;
use crate::memory::MemoryView;
use crate::presenter::Presenter;
use crate::presenter::TracingPresenter;
use crate::runtime::Runtime;
use crate::session::Session;
use crate::staging;
use crate::staging::StagingRegion;

#[derive(Debug)]
pub enum Error {
    Runtime(crate::runtime::Error),
    Host(host::Error),
    Instantiate(wasmtime::Error),
    /// The module has no `memory` export.
    MissingMemory,
    /// The staging window was configured with zero bytes.
    ZeroCapacity,
    Staging(staging::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime(e) => write!(f, "Runtime error: {}", e),
            Self::Host(e) => write!(f, "Host error: {}", e),
            Self::Instantiate(e) => write!(f, "Instantiate error: {}", e),
            Self::MissingMemory => write!(f, "Module does not export 'memory'"),
            Self::ZeroCapacity => write!(f, "Staging capacity must be non-zero"),
            Self::Staging(e) => write!(f, "Staging error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<crate::runtime::Error> for Error {
    fn from(e: crate::runtime::Error) -> Self {
        Self::Runtime(e)
    }
}

impl From<host::Error> for Error {
    fn from(e: host::Error) -> Self {
        Self::Host(e)
    }
}

impl From<staging::Error> for Error {
    fn from(e: staging::Error) -> Self {
        Self::Staging(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct SessionBuilder<B: Backend> {
    runtime: Arc<Runtime>,
    module_id: ModuleId,
    backend: B,
    presenter: Box<dyn Presenter>,
    staging_export: String,
    staging_capacity: u32,
    budget: Budget,
}

impl<B: Backend> SessionBuilder<B> {
    pub fn new(runtime: Arc<Runtime>, module_id: ModuleId, backend: B) -> Self {
        Self {
            runtime,
            module_id,
            backend,
            presenter: Box::new(TracingPresenter),
            staging_export: "global_chunk".to_string(),
            staging_capacity: STAGING_CAPACITY,
            budget: Budget::default(),
        }
    }

    pub fn presenter(mut self, presenter: impl Presenter) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    /// Names the `i32` global holding the staging address, and the window size.
    pub fn staging(mut self, export: impl Into<String>, capacity: u32) -> Self {
        self.staging_export = export.into();
        self.staging_capacity = capacity;
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Takes staging and budget settings from a config.
    pub fn configure(self, config: &HarnessConfig) -> Self {
        self.staging(config.staging_export.clone(), config.staging_capacity)
            .budget(config.budget.clone())
    }

    pub async fn build(self) -> Result<Session<B>> {
        if self.staging_capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        let module = self.runtime.get_module(self.module_id)?;

        let mut linker = Linker::new(self.runtime.engine());
        host::link(&mut linker)?;

        let ctx = HarnessCtx::new(self.backend, self.presenter, &self.budget);
        let mut store = Store::new(self.runtime.engine(), ctx);
        store.limiter(|ctx| &mut ctx.limits);

        let instance = linker
            .instantiate_async(&mut store, &module)
            .await
            .map_err(Error::Instantiate)?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .map(MemoryView::new)
            .ok_or(Error::MissingMemory)?;

        let staging = StagingRegion::locate(&mut store, &instance, &self.staging_export, self.staging_capacity)?;
        memory::read(memory.memory().data(&store), staging.span()).map_err(staging::Error::from)?;

        debug!(
            module = %self.module_id,
            base = staging.base(),
            capacity = staging.capacity(),
            "session started"
        );

        Ok(Session::new(store, instance, memory, staging))
    }
}

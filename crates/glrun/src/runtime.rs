//! # Runtime
//!
//! Owns the Wasmtime engine and a registry of compiled guest modules.
//! Sessions are built from a module id; compiling once and starting many
//! sessions from the same module is the expected pattern.
//!
//! Uses DashMap so modules can be added from several tasks without a
//! global lock.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::debug;
use wasmtime::Engine;
use wasmtime::Module;

use crate::backend::Backend;
use crate::builder::SessionBuilder;
use crate::handles::ModuleId;

#[derive(Debug)]
pub enum Error {
    ModuleNotFound(ModuleId),
    Engine(wasmtime::Error),
    Module(wasmtime::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuleNotFound(id) => write!(f, "Module not found: {}", id),
            Self::Engine(e) => write!(f, "Engine error: {}", e),
            Self::Module(e) => write!(f, "Module error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

pub struct Runtime {
    pub(crate) engine: Engine,
    pub(crate) modules: DashMap<ModuleId, Module>,
    next_module_id: AtomicU64,
}

impl Runtime {
    /// Creates a runtime whose engine runs guest exports asynchronously.
    pub fn new() -> Result<Self> {
        let mut config = wasmtime::Config::new();
        config.async_support(true);

        let engine = Engine::new(&config).map_err(Error::Engine)?;
        Ok(Self::with_engine(engine))
    }

    /// The engine must have async support enabled.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            modules: DashMap::new(),
            next_module_id: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compiles a module from binary or text and registers it.
    pub fn add_module_bytes(&self, bytes: &[u8]) -> Result<ModuleId> {
        let module = Module::new(&self.engine, bytes).map_err(Error::Module)?;
        Ok(self.add_module(module))
    }

    pub fn add_module_file(&self, path: impl AsRef<Path>) -> Result<ModuleId> {
        let module = Module::from_file(&self.engine, path.as_ref()).map_err(Error::Module)?;
        Ok(self.add_module(module))
    }

    /// Registers a module that was compiled against this runtime's engine.
    pub fn add_module(&self, module: Module) -> ModuleId {
        let id = ModuleId(self.next_module_id.fetch_add(1, Ordering::Relaxed));
        debug!(%id, imports = module.imports().len(), exports = module.exports().len(), "module registered");
        self.modules.insert(id, module);
        id
    }

    pub fn get_module(&self, id: ModuleId) -> Result<Module> {
        self.modules
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::ModuleNotFound(id))
    }

    pub fn remove_module(&self, id: ModuleId) -> Result<()> {
        self.modules.remove(&id).ok_or(Error::ModuleNotFound(id))?;
        Ok(())
    }

    /// Starts building a session of module `id` drawing into `backend`.
    pub fn session<B: Backend>(self: &Arc<Self>, id: ModuleId, backend: B) -> SessionBuilder<B> {
        SessionBuilder::new(Arc::clone(self), id, backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_registry() {
        let runtime = Runtime::new().unwrap();
        let a = runtime.add_module_bytes(b"(module)").unwrap();
        let b = runtime.add_module_bytes(br#"(module (memory (export "memory") 1))"#).unwrap();
        assert_ne!(a, b);
        assert!(runtime.get_module(b).is_ok());

        runtime.remove_module(a).unwrap();
        assert!(matches!(runtime.get_module(a), Err(Error::ModuleNotFound(id)) if id == a));
        assert!(matches!(runtime.remove_module(a), Err(Error::ModuleNotFound(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        let runtime = Runtime::new().unwrap();
        assert!(matches!(runtime.add_module_bytes(b"\0asm garbage"), Err(Error::Module(_))));
    }
}

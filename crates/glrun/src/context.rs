//! Store context for a running guest.

use wasmtime::StoreLimits;
use wasmtime::StoreLimitsBuilder;

use crate::backend::Backend;
use crate::backend::Resource;
use crate::config::Budget;
use crate::presenter::Presenter;
use crate::registry::ResourceRegistry;

/// Per-session state stored in Wasmtime's `Store`.
///
/// This is the only place host state lives. Every dispatcher entry point
/// reaches the registry, the backend and the presenter through it; there
/// are no globals.
pub struct HarnessCtx<B: Backend> {
    pub(crate) registry: ResourceRegistry<Resource<B>>,
    pub(crate) backend: B,
    pub(crate) presenter: Box<dyn Presenter>,
    pub(crate) limits: StoreLimits,
}

impl<B: Backend> HarnessCtx<B> {
    pub fn new(backend: B, presenter: Box<dyn Presenter>, budget: &Budget) -> Self {
        Self {
            registry: ResourceRegistry::new(),
            backend,
            presenter,
            limits: StoreLimitsBuilder::new()
                .memory_size(budget.memory_bytes)
                .instances(1)
                .build(),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry<Resource<B>> {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Releases every live resource, in handle order.
    pub(crate) fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (_, resource) in self.registry.drain() {
            resource.release(&mut self.backend);
            released += 1;
        }
        released
    }
}

//! # Host functions imported by the guest
//!
//! Everything is installed under the `env` module, the way a browser
//! harness passes its import object. Host functions are synchronous
//! `func_wrap` closures: the guest calls them and expects an answer
//! immediately.
//!
//! A contract violation (unknown handle, wrong kind, span out of bounds)
//! is logged and turned into a trap. The trap unwinds the guest and comes
//! back as the error of whatever export call was running.

pub mod diag;
pub mod gl;

use tracing::error;
use wasmtime::Caller;
use wasmtime::Extern;
use wasmtime::Linker;
use wasmtime::Memory;

use crate::backend::Backend;
use crate::context::HarnessCtx;
use crate::dispatch;

/// Import module name for every host function.
pub const ENV: &str = "env";

#[derive(Debug)]
pub enum Error {
    /// A host function could not be defined.
    Link { name: &'static str, source: wasmtime::Error },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Link { name, source } => write!(f, "Linker error: {}::{}: {}", ENV, name, source),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Installs the whole dispatcher surface.
pub fn link<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    gl::link(linker)?;
    diag::link(linker)?;
    Ok(())
}

pub(crate) fn link_error(name: &'static str) -> impl FnOnce(wasmtime::Error) -> Error {
    move |source| Error::Link { name, source }
}

/// The calling guest's memory, looked up fresh on every call.
pub(crate) fn guest_memory<B: Backend>(caller: &mut Caller<'_, HarnessCtx<B>>) -> wasmtime::Result<Memory> {
    caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmtime::Error::msg("guest does not export 'memory'"))
}

/// Turns a contract violation into a trap.
pub(crate) fn trap(call: &str, e: dispatch::Error) -> wasmtime::Error {
    error!(call, "guest contract violation: {}", e);
    wasmtime::Error::new(e)
}

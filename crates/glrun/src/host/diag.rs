//! Logging and tag imports.

use wasmtime::Caller;
use wasmtime::Linker;

use crate::backend::Backend;
use crate::context::HarnessCtx;
use crate::host::ENV;
use crate::host::Result;
use crate::host::guest_memory;
use crate::host::link_error;
use crate::host::trap;
use crate::memory::Span;

pub fn link<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    linker
        .func_wrap(
            ENV,
            "logWasm",
            |mut caller: Caller<'_, HarnessCtx<B>>, ptr: u32, len: u32| -> wasmtime::Result<()> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.log(mem, Span::new(ptr, len)).map_err(|e| trap("logWasm", e))
            },
        )
        .map_err(link_error("logWasm"))?;

    linker
        .func_wrap(ENV, "clearTags", |mut caller: Caller<'_, HarnessCtx<B>>| {
            caller.data_mut().clear_tags();
        })
        .map_err(link_error("clearTags"))?;

    linker
        .func_wrap(
            ENV,
            "pushTag",
            |mut caller: Caller<'_, HarnessCtx<B>>,
             key: u32,
             key_len: u32,
             value: u32,
             value_len: u32|
             -> wasmtime::Result<()> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.push_tag(mem, Span::new(key, key_len), Span::new(value, value_len))
                    .map_err(|e| trap("pushTag", e))
            },
        )
        .map_err(link_error("pushTag"))?;

    linker
        .func_wrap(ENV, "setNodeId", |mut caller: Caller<'_, HarnessCtx<B>>, id: u32| {
            caller.data_mut().set_node_id(id);
        })
        .map_err(link_error("setNodeId"))?;

    Ok(())
}

//! # Graphics imports
//!
//! GL-flavoured entry points. Object-creating calls return a handle;
//! everything else takes handles and plain numbers and forwards them to the
//! backend through the registry.

use wasmtime::Caller;
use wasmtime::Linker;

use crate::backend::Backend;
use crate::backend::ResourceKind;
use crate::backend::VertexAttrib;
use crate::context::HarnessCtx;
use crate::dispatch::TexShape;
use crate::handles::Handle;
use crate::host::ENV;
use crate::host::Result;
use crate::host::guest_memory;
use crate::host::link_error;
use crate::host::trap;
use crate::memory::Span;

type Ctx<'a, B> = Caller<'a, HarnessCtx<B>>;

pub fn link<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    link_lifecycle(linker)?;
    link_binding(linker)?;
    link_forwarding(linker)?;
    link_teardown(linker)?;
    Ok(())
}

fn link_lifecycle<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    linker
        .func_wrap(
            ENV,
            "compileLinkProgram",
            |mut caller: Ctx<'_, B>, vs: u32, vs_len: u32, fs: u32, fs_len: u32| -> wasmtime::Result<u32> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.compile_link_program(mem, Span::new(vs, vs_len), Span::new(fs, fs_len))
                    .map(Handle::into_raw)
                    .map_err(|e| trap("compileLinkProgram", e))
            },
        )
        .map_err(link_error("compileLinkProgram"))?;

    linker
        .func_wrap(
            ENV,
            "bind2DFloat32Data",
            |mut caller: Ctx<'_, B>, ptr: u32, count: u32| -> wasmtime::Result<u32> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.bind_2d_f32_data(mem, ptr, count)
                    .map(Handle::into_raw)
                    .map_err(|e| trap("bind2DFloat32Data", e))
            },
        )
        .map_err(link_error("bind2DFloat32Data"))?;

    linker
        .func_wrap(ENV, "glCreateBuffer", |mut caller: Ctx<'_, B>| -> wasmtime::Result<u32> {
            caller
                .data_mut()
                .create_buffer()
                .map(Handle::into_raw)
                .map_err(|e| trap("glCreateBuffer", e))
        })
        .map_err(link_error("glCreateBuffer"))?;

    linker
        .func_wrap(ENV, "glCreateVertexArray", |mut caller: Ctx<'_, B>| -> wasmtime::Result<u32> {
            caller
                .data_mut()
                .create_vertex_array()
                .map(Handle::into_raw)
                .map_err(|e| trap("glCreateVertexArray", e))
        })
        .map_err(link_error("glCreateVertexArray"))?;

    linker
        .func_wrap(ENV, "glCreateTexture", |mut caller: Ctx<'_, B>| -> wasmtime::Result<u32> {
            caller
                .data_mut()
                .create_texture()
                .map(Handle::into_raw)
                .map_err(|e| trap("glCreateTexture", e))
        })
        .map_err(link_error("glCreateTexture"))?;

    linker
        .func_wrap(
            ENV,
            "glGetUniformLoc",
            |mut caller: Ctx<'_, B>, program: u32, name: u32, name_len: u32| -> wasmtime::Result<u32> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.uniform_location(mem, Handle(program), Span::new(name, name_len))
                    .map(Handle::into_raw)
                    .map_err(|e| trap("glGetUniformLoc", e))
            },
        )
        .map_err(link_error("glGetUniformLoc"))?;

    Ok(())
}

fn link_binding<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    linker
        .func_wrap(
            ENV,
            "glBindBuffer",
            |mut caller: Ctx<'_, B>, target: u32, buffer: u32| -> wasmtime::Result<()> {
                caller
                    .data_mut()
                    .bind_buffer(target, Handle(buffer))
                    .map_err(|e| trap("glBindBuffer", e))
            },
        )
        .map_err(link_error("glBindBuffer"))?;

    linker
        .func_wrap(
            ENV,
            "glBufferData",
            |mut caller: Ctx<'_, B>, target: u32, ptr: u32, len: u32, usage: u32| -> wasmtime::Result<()> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                ctx.buffer_data(mem, target, Span::new(ptr, len), usage)
                    .map_err(|e| trap("glBufferData", e))
            },
        )
        .map_err(link_error("glBufferData"))?;

    linker
        .func_wrap(ENV, "glBindVertexArray", |mut caller: Ctx<'_, B>, array: u32| -> wasmtime::Result<()> {
            caller
                .data_mut()
                .bind_vertex_array(Handle(array))
                .map_err(|e| trap("glBindVertexArray", e))
        })
        .map_err(link_error("glBindVertexArray"))?;

    linker
        .func_wrap(ENV, "glUseProgram", |mut caller: Ctx<'_, B>, program: u32| -> wasmtime::Result<()> {
            caller
                .data_mut()
                .use_program(Handle(program))
                .map_err(|e| trap("glUseProgram", e))
        })
        .map_err(link_error("glUseProgram"))?;

    linker
        .func_wrap(
            ENV,
            "glBindTexture",
            |mut caller: Ctx<'_, B>, target: u32, texture: u32| -> wasmtime::Result<()> {
                caller
                    .data_mut()
                    .bind_texture(target, Handle(texture))
                    .map_err(|e| trap("glBindTexture", e))
            },
        )
        .map_err(link_error("glBindTexture"))?;

    linker
        .func_wrap(
            ENV,
            "glTexImage2D",
            |mut caller: Ctx<'_, B>,
             target: u32,
             level: i32,
             internal_format: i32,
             width: i32,
             height: i32,
             format: u32,
             ty: u32,
             ptr: u32,
             len: u32|
             -> wasmtime::Result<()> {
                let memory = guest_memory(&mut caller)?;
                let (mem, ctx) = memory.data_and_store_mut(&mut caller);
                let shape = TexShape {
                    internal_format,
                    width,
                    height,
                    format,
                    ty,
                };
                ctx.tex_image_2d(mem, target, level, shape, Span::new(ptr, len))
                    .map_err(|e| trap("glTexImage2D", e))
            },
        )
        .map_err(link_error("glTexImage2D"))?;

    linker
        .func_wrap(ENV, "glUniform1f", |mut caller: Ctx<'_, B>, loc: u32, x: f32| -> wasmtime::Result<()> {
            caller
                .data_mut()
                .uniform1f(Handle(loc), x)
                .map_err(|e| trap("glUniform1f", e))
        })
        .map_err(link_error("glUniform1f"))?;

    linker
        .func_wrap(
            ENV,
            "glUniform2f",
            |mut caller: Ctx<'_, B>, loc: u32, x: f32, y: f32| -> wasmtime::Result<()> {
                caller
                    .data_mut()
                    .uniform2f(Handle(loc), x, y)
                    .map_err(|e| trap("glUniform2f", e))
            },
        )
        .map_err(link_error("glUniform2f"))?;

    linker
        .func_wrap(
            ENV,
            "glUniform4f",
            |mut caller: Ctx<'_, B>, loc: u32, x: f32, y: f32, z: f32, w: f32| -> wasmtime::Result<()> {
                caller
                    .data_mut()
                    .uniform4f(Handle(loc), x, y, z, w)
                    .map_err(|e| trap("glUniform4f", e))
            },
        )
        .map_err(link_error("glUniform4f"))?;

    Ok(())
}

/// Calls with no handles or spans: straight through to the backend.
fn link_forwarding<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    linker
        .func_wrap(
            ENV,
            "glVertexAttribPointer",
            |mut caller: Ctx<'_, B>, index: u32, size: i32, ty: u32, normalized: u32, stride: i32, offset: i32| {
                caller.data_mut().backend_mut().vertex_attrib_pointer(&VertexAttrib {
                    index,
                    size,
                    ty,
                    normalized: normalized != 0,
                    stride,
                    offset,
                });
            },
        )
        .map_err(link_error("glVertexAttribPointer"))?;

    linker
        .func_wrap(ENV, "glEnableVertexAttribArray", |mut caller: Ctx<'_, B>, index: u32| {
            caller.data_mut().backend_mut().enable_vertex_attrib_array(index);
        })
        .map_err(link_error("glEnableVertexAttribArray"))?;

    linker
        .func_wrap(
            ENV,
            "glTexParameteri",
            |mut caller: Ctx<'_, B>, target: u32, pname: u32, param: i32| {
                caller.data_mut().backend_mut().tex_parameter_i(target, pname, param);
            },
        )
        .map_err(link_error("glTexParameteri"))?;

    linker
        .func_wrap(
            ENV,
            "glViewport",
            |mut caller: Ctx<'_, B>, x: i32, y: i32, width: i32, height: i32| {
                caller.data_mut().backend_mut().viewport(x, y, width, height);
            },
        )
        .map_err(link_error("glViewport"))?;

    linker
        .func_wrap(
            ENV,
            "glClearColor",
            |mut caller: Ctx<'_, B>, r: f32, g: f32, b: f32, a: f32| {
                caller.data_mut().backend_mut().clear_color(r, g, b, a);
            },
        )
        .map_err(link_error("glClearColor"))?;

    linker
        .func_wrap(ENV, "glClear", |mut caller: Ctx<'_, B>, mask: u32| {
            caller.data_mut().backend_mut().clear(mask);
        })
        .map_err(link_error("glClear"))?;

    linker
        .func_wrap(
            ENV,
            "glDrawArrays",
            |mut caller: Ctx<'_, B>, mode: u32, first: i32, count: i32| {
                caller.data_mut().backend_mut().draw_arrays(mode, first, count);
            },
        )
        .map_err(link_error("glDrawArrays"))?;

    linker
        .func_wrap(
            ENV,
            "glDrawElements",
            |mut caller: Ctx<'_, B>, mode: u32, count: i32, ty: u32, offset: i32| {
                caller.data_mut().backend_mut().draw_elements(mode, count, ty, offset);
            },
        )
        .map_err(link_error("glDrawElements"))?;

    Ok(())
}

fn link_teardown<B: Backend>(linker: &mut Linker<HarnessCtx<B>>) -> Result<()> {
    for (name, kind) in [
        ("glDeleteProgram", ResourceKind::Program),
        ("glDeleteBuffer", ResourceKind::Buffer),
        ("glDeleteVertexArray", ResourceKind::VertexArray),
        ("glDeleteTexture", ResourceKind::Texture),
    ] {
        linker
            .func_wrap(ENV, name, move |mut caller: Ctx<'_, B>, h: u32| -> wasmtime::Result<()> {
                caller
                    .data_mut()
                    .delete(Handle(h), kind)
                    .map_err(|e| trap(name, e))
            })
            .map_err(link_error(name))?;
    }

    linker
        .func_wrap(ENV, "releaseHandle", |mut caller: Ctx<'_, B>, h: u32| -> wasmtime::Result<()> {
            caller
                .data_mut()
                .release(Handle(h))
                .map_err(|e| trap("releaseHandle", e))
        })
        .map_err(link_error("releaseHandle"))?;

    Ok(())
}

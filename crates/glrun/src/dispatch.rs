//! # Host call dispatch
//!
//! The operations behind each `env` import. They are plain methods on
//! [`HarnessCtx`] taking the guest's memory as a slice, so they can be
//! driven without a guest. `host::gl` and `host::diag` wire them into the
//! linker.
//!
//! Every entry point runs to completion; none of them suspend. A handle
//! that isn't live, or names the wrong kind of object, or a span outside
//! memory, is a contract violation between guest and host and comes back
//! as an [`Error`].

use crate::backend::Backend;
use crate::backend::Resource;
use crate::backend::ResourceKind;
use crate::backend::TexImage;
use crate::backend::VertexAttrib;
use crate::context::HarnessCtx;
use crate::handles::Handle;
use crate::memory;
use crate::memory::Span;
use crate::presenter::Diagnostic;
use crate::registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Registry(registry::Error),
    Memory(memory::Error),
    KindMismatch {
        handle: Handle,
        expected: ResourceKind,
        found: ResourceKind,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "{}", e),
            Self::Memory(e) => write!(f, "{}", e),
            Self::KindMismatch { handle, expected, found } => write!(
                f,
                "{} names a {}, expected a {}",
                handle, found, expected
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<registry::Error> for Error {
    fn from(e: registry::Error) -> Self {
        Self::Registry(e)
    }
}

impl From<memory::Error> for Error {
    fn from(e: memory::Error) -> Self {
        Self::Memory(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn mismatch<B: Backend>(handle: Handle, expected: ResourceKind, found: &Resource<B>) -> Error {
    Error::KindMismatch {
        handle,
        expected,
        found: found.kind(),
    }
}

// Typed lookups. Each borrows only the registry, leaving the backend free.

fn program<B: Backend>(reg: &registry::ResourceRegistry<Resource<B>>, h: Handle) -> Result<&B::Program> {
    match reg.get(h)? {
        Resource::Program(p) => Ok(p),
        other => Err(mismatch(h, ResourceKind::Program, other)),
    }
}

fn buffer<B: Backend>(reg: &registry::ResourceRegistry<Resource<B>>, h: Handle) -> Result<&B::Buffer> {
    match reg.get(h)? {
        Resource::Buffer(b) => Ok(b),
        other => Err(mismatch(h, ResourceKind::Buffer, other)),
    }
}

fn vertex_array<B: Backend>(
    reg: &registry::ResourceRegistry<Resource<B>>,
    h: Handle,
) -> Result<&B::VertexArray> {
    match reg.get(h)? {
        Resource::VertexArray { array, .. } => Ok(array),
        other => Err(mismatch(h, ResourceKind::VertexArray, other)),
    }
}

fn texture<B: Backend>(reg: &registry::ResourceRegistry<Resource<B>>, h: Handle) -> Result<&B::Texture> {
    match reg.get(h)? {
        Resource::Texture(t) => Ok(t),
        other => Err(mismatch(h, ResourceKind::Texture, other)),
    }
}

fn location<B: Backend>(
    reg: &registry::ResourceRegistry<Resource<B>>,
    h: Handle,
) -> Result<Option<&B::Location>> {
    match reg.get(h)? {
        Resource::Location(l) => Ok(l.as_ref()),
        other => Err(mismatch(h, ResourceKind::Location, other)),
    }
}

impl<B: Backend> HarnessCtx<B> {
    // --- Lifecycle ---

    /// Compiles and links a program from two shader sources in guest memory.
    ///
    /// A failed build is reported to the presenter, and the guest still gets
    /// a handle to the unusable program.
    pub fn compile_link_program(&mut self, mem: &[u8], vertex: Span, fragment: Span) -> Result<Handle> {
        let vs = memory::read_utf8(mem, vertex)?;
        let fs = memory::read_utf8(mem, fragment)?;
        let build = self.backend.compile_link_program(&vs, &fs);
        let handle = self.registry.allocate(Resource::Program(build.program))?;
        if let Some(log) = build.failure {
            self.presenter
                .report(&Diagnostic::BackendCompileFailure { handle, log });
        }
        Ok(handle)
    }

    pub fn create_buffer(&mut self) -> Result<Handle> {
        let buffer = self.backend.create_buffer();
        Ok(self.registry.allocate(Resource::Buffer(buffer))?)
    }

    pub fn create_vertex_array(&mut self) -> Result<Handle> {
        let array = self.backend.create_vertex_array();
        Ok(self.registry.allocate(Resource::VertexArray { array, backing: None })?)
    }

    pub fn create_texture(&mut self) -> Result<Handle> {
        let texture = self.backend.create_texture();
        Ok(self.registry.allocate(Resource::Texture(texture))?)
    }

    /// Uploads `count` 2-D points (pairs of `f32`) as attribute 0 of a new
    /// vertex array. The array owns the buffer it created.
    pub fn bind_2d_f32_data(&mut self, mem: &[u8], ptr: u32, count: u32) -> Result<Handle> {
        const ARRAY_BUFFER: u32 = 0x8892;
        const STATIC_DRAW: u32 = 0x88E4;
        const FLOAT: u32 = 0x1406;

        let data = memory::read(mem, Span::of_elements(ptr, count, 4)?)?;
        let buffer = self.backend.create_buffer();
        let array = self.backend.create_vertex_array();
        self.backend.bind_vertex_array(&array);
        self.backend.bind_buffer(ARRAY_BUFFER, &buffer);
        self.backend.buffer_data(ARRAY_BUFFER, data, STATIC_DRAW);
        self.backend.vertex_attrib_pointer(&VertexAttrib {
            index: 0,
            size: 2,
            ty: FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
        });
        self.backend.enable_vertex_attrib_array(0);
        Ok(self.registry.allocate(Resource::VertexArray {
            array,
            backing: Some(buffer),
        })?)
    }

    // --- Binding and mutation ---

    pub fn bind_buffer(&mut self, target: u32, h: Handle) -> Result<()> {
        let buffer = buffer(&self.registry, h)?;
        self.backend.bind_buffer(target, buffer);
        Ok(())
    }

    pub fn buffer_data(&mut self, mem: &[u8], target: u32, data: Span, usage: u32) -> Result<()> {
        let bytes = memory::read(mem, data)?;
        self.backend.buffer_data(target, bytes, usage);
        Ok(())
    }

    pub fn bind_vertex_array(&mut self, h: Handle) -> Result<()> {
        let array = vertex_array(&self.registry, h)?;
        self.backend.bind_vertex_array(array);
        Ok(())
    }

    pub fn use_program(&mut self, h: Handle) -> Result<()> {
        let program = program(&self.registry, h)?;
        self.backend.use_program(program);
        Ok(())
    }

    pub fn bind_texture(&mut self, target: u32, h: Handle) -> Result<()> {
        let texture = texture(&self.registry, h)?;
        self.backend.bind_texture(target, texture);
        Ok(())
    }

    pub fn tex_image_2d(
        &mut self,
        mem: &[u8],
        target: u32,
        level: i32,
        shape: TexShape,
        pixels: Span,
    ) -> Result<()> {
        let pixels = memory::read(mem, pixels)?;
        let image = TexImage {
            internal_format: shape.internal_format,
            width: shape.width,
            height: shape.height,
            format: shape.format,
            ty: shape.ty,
            pixels,
        };
        self.backend.tex_image_2d(target, level, &image);
        Ok(())
    }

    pub fn uniform1f(&mut self, h: Handle, x: f32) -> Result<()> {
        if let Some(loc) = location(&self.registry, h)? {
            self.backend.uniform1f(loc, x);
        }
        Ok(())
    }

    pub fn uniform2f(&mut self, h: Handle, x: f32, y: f32) -> Result<()> {
        if let Some(loc) = location(&self.registry, h)? {
            self.backend.uniform2f(loc, x, y);
        }
        Ok(())
    }

    pub fn uniform4f(&mut self, h: Handle, x: f32, y: f32, z: f32, w: f32) -> Result<()> {
        if let Some(loc) = location(&self.registry, h)? {
            self.backend.uniform4f(loc, x, y, z, w);
        }
        Ok(())
    }

    // --- Introspection ---

    /// Looks up a uniform by name and registers the result as a new handle.
    pub fn uniform_location(&mut self, mem: &[u8], program_handle: Handle, name: Span) -> Result<Handle> {
        let name = memory::read_utf8(mem, name)?;
        let program = program(&self.registry, program_handle)?;
        let loc = self.backend.uniform_location(program, &name);
        Ok(self.registry.allocate(Resource::Location(loc))?)
    }

    // --- Teardown ---

    /// Releases `h`, which must name an object of `kind`.
    pub fn delete(&mut self, h: Handle, kind: ResourceKind) -> Result<()> {
        let found = self.registry.get(h)?.kind();
        if found != kind {
            return Err(Error::KindMismatch {
                handle: h,
                expected: kind,
                found,
            });
        }
        self.release(h)
    }

    /// Releases `h`, whatever it names.
    pub fn release(&mut self, h: Handle) -> Result<()> {
        let resource = self.registry.remove(h)?;
        resource.release(&mut self.backend);
        Ok(())
    }

    // --- Diagnostics ---

    pub fn log(&mut self, mem: &[u8], text: Span) -> Result<()> {
        if text.len == 0 {
            return Ok(());
        }
        let line = memory::read_utf8(mem, text)?;
        self.presenter.log(&line);
        Ok(())
    }

    pub fn clear_tags(&mut self) {
        self.presenter.clear_tags();
    }

    pub fn push_tag(&mut self, mem: &[u8], key: Span, value: Span) -> Result<()> {
        let key = memory::read_utf8(mem, key)?;
        let value = memory::read_utf8(mem, value)?;
        self.presenter.push_tag(&key, &value);
        Ok(())
    }

    pub fn set_node_id(&mut self, id: u32) {
        self.presenter.set_node_id(id);
    }
}

/// Size and format half of a `texImage2D` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexShape {
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub ty: u32,
}

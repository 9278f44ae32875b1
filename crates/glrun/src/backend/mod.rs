//! # Graphics backend
//!
//! The harness doesn't draw anything itself. Every GL-style call the guest
//! makes is forwarded to a [`Backend`], and every object the backend
//! creates is parked in the registry as a [`Resource`].
//!
//! Object types are associated types, so a backend can use whatever it has
//! (GPU handles, `web_sys` objects, plain ids) without boxing or downcasting.

pub mod recording;

pub use recording::RecordingBackend;

/// Result of compiling and linking a program.
///
/// A failed build still yields a program object. The guest gets a handle to
/// it either way; `failure` carries the info log when the build failed.
#[derive(Debug)]
pub struct ProgramBuild<P> {
    pub program: P,
    pub failure: Option<String>,
}

/// The GL-like operations the dispatcher forwards.
///
/// Integer parameters (`target`, `usage`, `mode`, ...) are passed through
/// as the guest sent them. Their meaning belongs to the backend.
pub trait Backend: Send + 'static {
    type Program: Send;
    type Buffer: Send;
    type VertexArray: Send;
    type Texture: Send;
    type Location: Send;

    fn compile_link_program(&mut self, vertex: &str, fragment: &str) -> ProgramBuild<Self::Program>;
    fn create_buffer(&mut self) -> Self::Buffer;
    fn create_vertex_array(&mut self) -> Self::VertexArray;
    fn create_texture(&mut self) -> Self::Texture;

    /// `None` if the program has no active uniform called `name`.
    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<Self::Location>;

    fn bind_buffer(&mut self, target: u32, buffer: &Self::Buffer);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn bind_vertex_array(&mut self, array: &Self::VertexArray);
    fn use_program(&mut self, program: &Self::Program);
    fn bind_texture(&mut self, target: u32, texture: &Self::Texture);
    fn tex_image_2d(&mut self, target: u32, level: i32, image: &TexImage<'_>);
    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32);

    fn uniform1f(&mut self, location: &Self::Location, x: f32);
    fn uniform2f(&mut self, location: &Self::Location, x: f32, y: f32);
    fn uniform4f(&mut self, location: &Self::Location, x: f32, y: f32, z: f32, w: f32);

    fn vertex_attrib_pointer(&mut self, attrib: &VertexAttrib);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&mut self, mask: u32);
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32);

    fn delete_program(&mut self, program: Self::Program);
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn delete_vertex_array(&mut self, array: Self::VertexArray);
    fn delete_texture(&mut self, texture: Self::Texture);
}

/// Arguments of `vertexAttribPointer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttrib {
    pub index: u32,
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

/// Arguments of `texImage2D`, with the pixel data already read out of guest memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexImage<'a> {
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub ty: u32,
    pub pixels: &'a [u8],
}

/// The kinds of object a handle can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Program,
    Buffer,
    VertexArray,
    Texture,
    Location,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Program => "program",
            Self::Buffer => "buffer",
            Self::VertexArray => "vertex array",
            Self::Texture => "texture",
            Self::Location => "uniform location",
        };
        f.write_str(name)
    }
}

/// A backend object owned by the registry.
pub enum Resource<B: Backend> {
    Program(B::Program),
    Buffer(B::Buffer),
    /// A vertex array, plus the buffer it owns when the harness created
    /// both in one call.
    VertexArray {
        array: B::VertexArray,
        backing: Option<B::Buffer>,
    },
    Texture(B::Texture),
    /// A location the backend couldn't find is still a valid handle.
    /// Setting it does nothing, as in WebGL.
    Location(Option<B::Location>),
}

impl<B: Backend> Resource<B> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Program(_) => ResourceKind::Program,
            Self::Buffer(_) => ResourceKind::Buffer,
            Self::VertexArray { .. } => ResourceKind::VertexArray,
            Self::Texture(_) => ResourceKind::Texture,
            Self::Location(_) => ResourceKind::Location,
        }
    }

    /// Hands the object back to the backend for destruction.
    pub fn release(self, backend: &mut B) {
        match self {
            Self::Program(p) => backend.delete_program(p),
            Self::Buffer(b) => backend.delete_buffer(b),
            Self::VertexArray { array, backing } => {
                backend.delete_vertex_array(array);
                if let Some(buffer) = backing {
                    backend.delete_buffer(buffer);
                }
            }
            Self::Texture(t) => backend.delete_texture(t),
            Self::Location(_) => {}
        }
    }
}

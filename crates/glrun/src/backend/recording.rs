//! # Recording backend
//!
//! A headless backend that hands out numbered objects and records every
//! call it receives. Used by the tests and by `glview`, which has no GPU.

use crate::backend::Backend;
use crate::backend::ProgramBuild;
use crate::backend::TexImage;
use crate::backend::VertexAttrib;

/// An object created by the recording backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

/// One call, as the backend received it.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CompileLinkProgram { program: ObjectId, ok: bool },
    CreateBuffer(ObjectId),
    CreateVertexArray(ObjectId),
    CreateTexture(ObjectId),
    UniformLocation { program: ObjectId, name: String, found: Option<ObjectId> },
    BindBuffer { target: u32, buffer: ObjectId },
    BufferData { target: u32, data: Vec<u8>, usage: u32 },
    BindVertexArray(ObjectId),
    UseProgram(ObjectId),
    BindTexture { target: u32, texture: ObjectId },
    TexImage2d { target: u32, level: i32, width: i32, height: i32, bytes: usize },
    TexParameterI { target: u32, pname: u32, param: i32 },
    Uniform { location: ObjectId, values: Vec<f32> },
    VertexAttribPointer(VertexAttrib),
    EnableVertexAttribArray(u32),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    ClearColor([f32; 4]),
    Clear(u32),
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements { mode: u32, count: i32, ty: u32, offset: i32 },
    DeleteProgram(ObjectId),
    DeleteBuffer(ObjectId),
    DeleteVertexArray(ObjectId),
    DeleteTexture(ObjectId),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    next: u32,
    calls: Vec<Call>,
    reject_programs: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every program build fail, as a driver with a broken compiler would.
    pub fn rejecting_programs(mut self) -> Self {
        self.reject_programs = true;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Objects created minus objects deleted.
    pub fn live_objects(&self) -> usize {
        let mut live = 0usize;
        for call in &self.calls {
            match call {
                Call::CompileLinkProgram { .. }
                | Call::CreateBuffer(_)
                | Call::CreateVertexArray(_)
                | Call::CreateTexture(_) => live += 1,
                Call::DeleteProgram(_)
                | Call::DeleteBuffer(_)
                | Call::DeleteVertexArray(_)
                | Call::DeleteTexture(_) => live = live.saturating_sub(1),
                _ => {}
            }
        }
        live
    }

    fn object(&mut self) -> ObjectId {
        self.next += 1;
        ObjectId(self.next)
    }
}

impl Backend for RecordingBackend {
    type Program = ObjectId;
    type Buffer = ObjectId;
    type VertexArray = ObjectId;
    type Texture = ObjectId;
    type Location = ObjectId;

    fn compile_link_program(&mut self, vertex: &str, fragment: &str) -> ProgramBuild<ObjectId> {
        let program = self.object();
        let failure = if self.reject_programs {
            Some("program rejected by backend".to_string())
        } else if vertex.trim().is_empty() {
            Some("vertex shader source is empty".to_string())
        } else if fragment.trim().is_empty() {
            Some("fragment shader source is empty".to_string())
        } else {
            None
        };
        self.calls.push(Call::CompileLinkProgram {
            program,
            ok: failure.is_none(),
        });
        ProgramBuild { program, failure }
    }

    fn create_buffer(&mut self) -> ObjectId {
        let id = self.object();
        self.calls.push(Call::CreateBuffer(id));
        id
    }

    fn create_vertex_array(&mut self) -> ObjectId {
        let id = self.object();
        self.calls.push(Call::CreateVertexArray(id));
        id
    }

    fn create_texture(&mut self) -> ObjectId {
        let id = self.object();
        self.calls.push(Call::CreateTexture(id));
        id
    }

    fn uniform_location(&mut self, program: &ObjectId, name: &str) -> Option<ObjectId> {
        let found = (!name.is_empty()).then(|| self.object());
        self.calls.push(Call::UniformLocation {
            program: *program,
            name: name.to_string(),
            found,
        });
        found
    }

    fn bind_buffer(&mut self, target: u32, buffer: &ObjectId) {
        self.calls.push(Call::BindBuffer { target, buffer: *buffer });
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.calls.push(Call::BufferData {
            target,
            data: data.to_vec(),
            usage,
        });
    }

    fn bind_vertex_array(&mut self, array: &ObjectId) {
        self.calls.push(Call::BindVertexArray(*array));
    }

    fn use_program(&mut self, program: &ObjectId) {
        self.calls.push(Call::UseProgram(*program));
    }

    fn bind_texture(&mut self, target: u32, texture: &ObjectId) {
        self.calls.push(Call::BindTexture { target, texture: *texture });
    }

    fn tex_image_2d(&mut self, target: u32, level: i32, image: &TexImage<'_>) {
        self.calls.push(Call::TexImage2d {
            target,
            level,
            width: image.width,
            height: image.height,
            bytes: image.pixels.len(),
        });
    }

    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32) {
        self.calls.push(Call::TexParameterI { target, pname, param });
    }

    fn uniform1f(&mut self, location: &ObjectId, x: f32) {
        self.calls.push(Call::Uniform { location: *location, values: vec![x] });
    }

    fn uniform2f(&mut self, location: &ObjectId, x: f32, y: f32) {
        self.calls.push(Call::Uniform { location: *location, values: vec![x, y] });
    }

    fn uniform4f(&mut self, location: &ObjectId, x: f32, y: f32, z: f32, w: f32) {
        self.calls.push(Call::Uniform { location: *location, values: vec![x, y, z, w] });
    }

    fn vertex_attrib_pointer(&mut self, attrib: &VertexAttrib) {
        self.calls.push(Call::VertexAttribPointer(*attrib));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(Call::EnableVertexAttribArray(index));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(Call::Viewport { x, y, width, height });
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.calls.push(Call::ClearColor([r, g, b, a]));
    }

    fn clear(&mut self, mask: u32) {
        self.calls.push(Call::Clear(mask));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.calls.push(Call::DrawArrays { mode, first, count });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.calls.push(Call::DrawElements { mode, count, ty, offset });
    }

    fn delete_program(&mut self, program: ObjectId) {
        self.calls.push(Call::DeleteProgram(program));
    }

    fn delete_buffer(&mut self, buffer: ObjectId) {
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn delete_vertex_array(&mut self, array: ObjectId) {
        self.calls.push(Call::DeleteVertexArray(array));
    }

    fn delete_texture(&mut self, texture: ObjectId) {
        self.calls.push(Call::DeleteTexture(texture));
    }
}

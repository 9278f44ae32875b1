//! Minimal map-viewer guest for glrun.
//!
//! Build with `cargo build --target wasm32-unknown-unknown --release` and
//! point glview at the output renamed to `index.wasm`. Point data arrives
//! as little-endian `f32` (x, y) pairs on `pushMapData`; metadata is kept
//! as raw bytes and only counted.

#![allow(non_snake_case, non_upper_case_globals)]

use std::cell::RefCell;

const CHUNK: usize = 16384;

const COLOR_BUFFER_BIT: u32 = 0x4000;
const POINTS: u32 = 0;

const VERTEX_SHADER: &str = "#version 300 es
in vec2 pos;
uniform float zoom;
uniform vec2 center;
void main() {
    gl_Position = vec4((pos - center) * zoom, 0.0, 1.0);
    gl_PointSize = 2.0;
}";

const FRAGMENT_SHADER: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() { color = vec4(0.1, 0.1, 0.1, 1.0); }";

mod env {
    extern "C" {
        pub fn compileLinkProgram(vs: *const u8, vs_len: usize, fs: *const u8, fs_len: usize) -> u32;
        pub fn bind2DFloat32Data(ptr: *const f32, len: usize) -> u32;
        pub fn glBindVertexArray(vao: u32);
        pub fn glUseProgram(program: u32);
        pub fn glGetUniformLoc(program: u32, name: *const u8, name_len: usize) -> u32;
        pub fn glUniform1f(loc: u32, v: f32);
        pub fn glUniform2f(loc: u32, x: f32, y: f32);
        pub fn glClearColor(r: f32, g: f32, b: f32, a: f32);
        pub fn glClear(mask: u32);
        pub fn glDrawArrays(mode: u32, first: i32, count: i32);
        pub fn glDeleteVertexArray(vao: u32);
        pub fn logWasm(s: *const u8, len: usize);
        pub fn clearTags();
        pub fn pushTag(k: *const u8, k_len: usize, v: *const u8, v_len: usize);
        pub fn setNodeId(id: u32);
    }
}

#[no_mangle]
pub static mut global_chunk: [u8; CHUNK] = [0; CHUNK];

#[derive(Default)]
struct Viewer {
    point_bytes: Vec<u8>,
    metadata_len: usize,
    points: Vec<f32>,
    program: Option<u32>,
    vao: Option<u32>,
    zoom_loc: u32,
    center_loc: u32,
    aspect: f32,
    zoom: f32,
    center: (f32, f32),
    drag_from: Option<(f32, f32)>,
    path: bool,
    debug_path: bool,
}

thread_local! {
    static VIEWER: RefCell<Viewer> = RefCell::new(Viewer {
        zoom: 1.0,
        aspect: 1.0,
        ..Viewer::default()
    });
}

fn log(line: &str) {
    unsafe { env::logWasm(line.as_ptr(), line.len()) }
}

fn push_tag(key: &str, value: &str) {
    unsafe { env::pushTag(key.as_ptr(), key.len(), value.as_ptr(), value.len()) }
}

fn staged(len: usize) -> &'static [u8] {
    let len = len.min(CHUNK);
    unsafe { std::slice::from_raw_parts(std::ptr::addr_of!(global_chunk).cast::<u8>(), len) }
}

#[no_mangle]
pub extern "C" fn pushMapData(len: usize) {
    VIEWER.with_borrow_mut(|v| v.point_bytes.extend_from_slice(staged(len)));
}

#[no_mangle]
pub extern "C" fn pushMetadata(len: usize) {
    VIEWER.with_borrow_mut(|v| v.metadata_len += staged(len).len());
}

#[no_mangle]
pub extern "C" fn init(aspect: f32) {
    VIEWER.with_borrow_mut(|v| {
        v.aspect = aspect;
        v.points = v
            .point_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        v.point_bytes = Vec::new();

        let program = unsafe {
            env::compileLinkProgram(
                VERTEX_SHADER.as_ptr(),
                VERTEX_SHADER.len(),
                FRAGMENT_SHADER.as_ptr(),
                FRAGMENT_SHADER.len(),
            )
        };
        v.zoom_loc = unsafe { env::glGetUniformLoc(program, "zoom".as_ptr(), 4) };
        v.center_loc = unsafe { env::glGetUniformLoc(program, "center".as_ptr(), 6) };
        v.vao = Some(unsafe { env::bind2DFloat32Data(v.points.as_ptr(), v.points.len()) });
        v.program = Some(program);
    });
    let count = VIEWER.with_borrow(|v| v.points.len() / 2);
    log(&format!("loaded {} points", count));
}

#[no_mangle]
pub extern "C" fn render() {
    VIEWER.with_borrow(|v| {
        let (Some(program), Some(vao)) = (v.program, v.vao) else {
            return;
        };
        unsafe {
            env::glClearColor(1.0, 1.0, 1.0, 1.0);
            env::glClear(COLOR_BUFFER_BIT);
            env::glUseProgram(program);
            env::glUniform1f(v.zoom_loc, v.zoom);
            env::glUniform2f(v.center_loc, v.center.0, v.center.1);
            env::glBindVertexArray(vao);
            env::glDrawArrays(POINTS, 0, (v.points.len() / 2) as i32);
            env::clearTags();
        }
        push_tag("points", &(v.points.len() / 2).to_string());
        push_tag("metadata bytes", &v.metadata_len.to_string());
        push_tag("zoom", &format!("{:.2}", v.zoom));
        if v.debug_path {
            push_tag("path", if v.path { "recording" } else { "idle" });
        }
    });
}

/// Index of the point closest to (x, y) in clip space.
fn closest(points: &[f32], x: f32, y: f32) -> Option<u32> {
    points
        .chunks_exact(2)
        .map(|p| (p[0] - x).powi(2) + (p[1] - y).powi(2))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i as u32)
}

fn to_world(v: &Viewer, x: f32, y: f32) -> (f32, f32) {
    let cx = (x * 2.0 - 1.0) * v.aspect;
    let cy = 1.0 - y * 2.0;
    (cx / v.zoom + v.center.0, cy / v.zoom + v.center.1)
}

#[no_mangle]
pub extern "C" fn mouseDown(x: f32, y: f32) {
    VIEWER.with_borrow_mut(|v| v.drag_from = Some((x, y)));
}

#[no_mangle]
pub extern "C" fn mouseMove(x: f32, y: f32) {
    let node = VIEWER.with_borrow_mut(|v| {
        if let Some((fx, fy)) = v.drag_from {
            v.center.0 -= (x - fx) * 2.0 * v.aspect / v.zoom;
            v.center.1 += (y - fy) * 2.0 / v.zoom;
            v.drag_from = Some((x, y));
        }
        let (wx, wy) = to_world(v, x, y);
        closest(&v.points, wx, wy)
    });
    if let Some(id) = node {
        unsafe { env::setNodeId(id) }
    }
    render();
}

#[no_mangle]
pub extern "C" fn mouseUp() {
    VIEWER.with_borrow_mut(|v| v.drag_from = None);
}

#[no_mangle]
pub extern "C" fn zoom(delta: f32) {
    VIEWER.with_borrow_mut(|v| v.zoom = (v.zoom * (1.0 - delta / 1000.0)).clamp(0.01, 1000.0));
    render();
}

#[no_mangle]
pub extern "C" fn setAspect(aspect: f32) {
    VIEWER.with_borrow_mut(|v| v.aspect = aspect);
    render();
}

#[no_mangle]
pub extern "C" fn setDebugWayFinding(_on: bool) {}

#[no_mangle]
pub extern "C" fn setDebugPointNeighbors(_on: bool) {}

#[no_mangle]
pub extern "C" fn setDebugPath(on: bool) {
    VIEWER.with_borrow_mut(|v| v.debug_path = on);
}

#[no_mangle]
pub extern "C" fn startPath() {
    VIEWER.with_borrow_mut(|v| v.path = true);
}

#[no_mangle]
pub extern "C" fn stopPath() {
    VIEWER.with_borrow_mut(|v| v.path = false);
}

#[no_mangle]
pub extern "C" fn shutdown() {
    VIEWER.with_borrow_mut(|v| {
        if let Some(vao) = v.vao.take() {
            unsafe { env::glDeleteVertexArray(vao) }
        }
    });
}

//! # glrun
//!
//! Host harness for a sandboxed map-viewer module. The guest gets opaque
//! handles in place of graphics objects, bulk data streamed through a fixed
//! staging window in its memory, and a small set of synchronous `env`
//! imports for drawing, logging and tags.

pub mod backend;
pub mod builder;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod handles;
pub mod host;
pub mod input;
pub mod loader;
pub mod memory;
pub mod presenter;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod source;
pub mod staging;
pub mod stream;

pub use backend::Backend;
pub use backend::RecordingBackend;
pub use builder::SessionBuilder;
pub use config::HarnessConfig;
pub use handles::Handle;
pub use handles::ModuleId;
pub use input::InputEvent;
pub use input::Viewport;
pub use loader::DirLoader;
pub use loader::Loader;
pub use loader::MemoryLoader;
pub use presenter::Presenter;
pub use presenter::TagBoard;
pub use registry::ResourceRegistry;
pub use runtime::Runtime;
pub use session::Session;
pub use source::ByteSource;
pub use stream::StreamingBridge;
pub use stream::Transfer;

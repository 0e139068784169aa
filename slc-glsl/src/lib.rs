//! Text back ends for sanitized SL modules: a GLSL writer targeting a
//! configurable GL/GLES version, and a minimal SL re-serializer. Both are
//! mechanical traversals — every semantic decision (types, bindings,
//! layouts, entry-point shape) was already made by the sanitizer.
mod environment;
mod error;
mod glsl_writer;
mod output;
mod sl_writer;
mod types;

pub use environment::{
    ExtensionSupportCallback, GlslEnvironment, BASE_INSTANCE_UNIFORM_NAME,
    BASE_VERTEX_UNIFORM_NAME, DRAW_INDEX_UNIFORM_NAME, FLIP_Y_UNIFORM_NAME,
};
pub use error::{GlslError, GlslResult};
pub use glsl_writer::write_glsl;
pub use output::GlslOutput;
pub use sl_writer::write_sl;

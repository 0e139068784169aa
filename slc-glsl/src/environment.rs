//! GLSL target configuration and the fixed uniform names the
//! draw-parameter fallback path emits. Those four strings are part
//! of the wire contract between this writer and whatever GL driver state
//! the embedder binds them to, so they are never derived or renamed.
use std::collections::HashMap;
use std::fmt;

pub const BASE_INSTANCE_UNIFORM_NAME: &str = "_nzsl_BaseInstance";
pub const BASE_VERTEX_UNIFORM_NAME: &str = "_nzsl_BaseVertex";
pub const DRAW_INDEX_UNIFORM_NAME: &str = "_nzsl_DrawIndex";
pub const FLIP_Y_UNIFORM_NAME: &str = "_nzsl_FlipY";

/// Callback asked whether a named GLSL extension is available on the
/// target; an override here beats the version floor computed from
/// `gl_major`/`gl_minor`.
pub type ExtensionSupportCallback = Box<dyn Fn(&str) -> bool>;

pub struct GlslEnvironment {
    pub gl_major: u32,
    pub gl_minor: u32,
    pub gl_es: bool,
    pub flip_y_position: bool,
    pub remap_z_position: bool,
    pub allow_draw_parameters_uniforms_fallback: bool,
    pub extension_support_callback: Option<ExtensionSupportCallback>,
    /// Optional rewrite of descriptor bindings into flat GL binding
    /// indices, keyed by [`slc_ast::binding_key`]'s `(set << 32) | binding`
    /// encoding.
    pub gl_binding_mapping: HashMap<u64, u32>,
}
impl Default for GlslEnvironment {
    fn default() -> Self {
        GlslEnvironment {
            gl_major: 3,
            gl_minor: 0,
            gl_es: true,
            flip_y_position: false,
            remap_z_position: false,
            allow_draw_parameters_uniforms_fallback: false,
            extension_support_callback: None,
            gl_binding_mapping: HashMap::new(),
        }
    }
}
impl fmt::Debug for GlslEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GlslEnvironment")
            .field("gl_major", &self.gl_major)
            .field("gl_minor", &self.gl_minor)
            .field("gl_es", &self.gl_es)
            .field("flip_y_position", &self.flip_y_position)
            .field("remap_z_position", &self.remap_z_position)
            .field(
                "allow_draw_parameters_uniforms_fallback",
                &self.allow_draw_parameters_uniforms_fallback,
            )
            .field("extension_support_callback", &self.extension_support_callback.is_some())
            .field("gl_binding_mapping", &self.gl_binding_mapping)
            .finish()
    }
}
impl GlslEnvironment {
    /// An extension is usable when either the callback explicitly says so,
    /// or the declared version floor already covers it (resolved Open
    /// Question: callback overrides the floor, but silence falls back to it).
    pub fn extension_available(&self, name: &str, floor_major: u32, floor_minor: u32) -> bool {
        match &self.extension_support_callback {
            Some(callback) => callback(name),
            None => (self.gl_major, self.gl_minor) >= (floor_major, floor_minor),
        }
    }
}

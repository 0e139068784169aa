//! Knobs that affect sanitizer behavior but aren't part of the module
//! itself — the target a back end is heading for, and how strict to be.
use slc_ast::ShaderStage;

#[derive(Debug, Clone, Default)]
pub struct SanitizeOptions {
    /// When set, entry-point legalization rejects functions tagged for a
    /// different stage instead of accepting any.
    pub target_stage: Option<ShaderStage>,
    /// Vertex position fix-ups, mirrored from the GLSL environment;
    /// the SPIR-V back end honors them identically since both targets sit
    /// downstream of the same hoisted `gl_Position`-equivalent variable.
    pub flip_y_position: bool,
    pub remap_z_position: bool,
    /// When true, draw-parameter intrinsics are lowered to fallback
    /// uniforms instead of native built-ins.
    pub draw_parameters_uniform_fallback: bool,
    /// Partial sanitization: downgrades `UnresolvedBinding` and
    /// shape-dependent type-completion errors to non-errors.
    pub partial: bool,
    /// Within partial sanitization, force auto-binding resolution anyway.
    pub force_auto_binding_resolve: bool,
}

//! What the GLSL writer hands back: source text plus the bookkeeping
//! an embedder needs to actually bind the shader — which GL binding index
//! backs each uniform block, and which draw-parameter fallback uniforms it
//! ended up referencing.
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct GlslOutput {
    pub code: String,
    /// Uniform block name -> the GL binding index it was assigned.
    pub explicit_uniform_block_binding: HashMap<String, u32>,
    pub uses_base_instance_uniform: bool,
    pub uses_base_vertex_uniform: bool,
    pub uses_draw_index_uniform: bool,
}

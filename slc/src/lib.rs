//! # SLC: a compiler for the SL shading language.
//!
//! SLC takes an SL module tree (built programmatically, or by an external
//! parser) through semantic analysis and legalization, then emits it as
//! binary SPIR-V, GLSL source, or an SL re-serialization.
//!
//! ## How-to
//!
//! ```ignore
//! let sanitized = Compiler::new()
//!     // Resolve `import` statements against pre-built modules.
//!     .resolver(resolver)
//!     // Tighten entry-point checking to a single pipeline stage.
//!     .options(SanitizeOptions { target_stage: Some(ShaderStage::Fragment), ..Default::default() })
//!     // Run every sanitizer sub-pass and wrap the result.
//!     .sanitize(module)
//!     .unwrap();
//! let spirv = Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()).unwrap();
//! let glsl = Compiler::new().emit_glsl(&sanitized, &GlslEnvironment::default()).unwrap();
//! ```
//!
//! All per-compilation state lives in the sanitizer invocation and the back
//! end's own context; a `Compiler` holds only configuration, so separate
//! compilations can run on separate threads with a `Compiler` each.
#[cfg(test)]
mod tests;

use thiserror::Error;

pub use slc_ast as ast;
pub use slc_ast::binding_key;
pub use slc_glsl::{GlslEnvironment, GlslError, GlslOutput};
pub use slc_sanitize::{
    MapModuleResolver, ModuleResolver, SanitizeError, SanitizeOptions, SanitizedModule,
};
pub use slc_spirv::{BackendError, SpirvEnvironment};

/// Any failure along the sanitize-then-emit pipeline. Sub-errors keep their
/// own taxonomy; this enum only routes them to a common caller boundary.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error(transparent)]
    Spirv(#[from] BackendError),
    #[error(transparent)]
    Glsl(#[from] GlslError),
}

/// The library entry point: owns a module resolver and sanitizer options,
/// and sequences the sanitizer and the back ends.
pub struct Compiler {
    resolver: Box<dyn ModuleResolver>,
    options: SanitizeOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler with no importable modules and default options.
    pub fn new() -> Self {
        Compiler {
            resolver: Box::new(MapModuleResolver::new()),
            options: SanitizeOptions::default(),
        }
    }

    pub fn resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn options(mut self, options: SanitizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sanitize(&self, module: slc_ast::Module) -> Result<SanitizedModule, CompileError> {
        Ok(slc_sanitize::sanitize(module, &self.options, &*self.resolver)?)
    }

    pub fn emit_spirv(
        &self,
        module: &SanitizedModule,
        env: &SpirvEnvironment,
    ) -> Result<Vec<u32>, CompileError> {
        Ok(slc_spirv::emit(module, env)?)
    }

    pub fn emit_glsl(
        &self,
        module: &SanitizedModule,
        env: &GlslEnvironment,
    ) -> Result<GlslOutput, CompileError> {
        Ok(slc_glsl::write_glsl(module, env)?)
    }

    pub fn emit_sl(&self, module: &SanitizedModule) -> String {
        slc_glsl::write_sl(module)
    }
}

/// Repacks a SPIR-V word stream as the little-endian byte blob loaders
/// consume.
pub fn spirv_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

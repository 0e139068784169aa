//! The GLSL/SL writers' closed error taxonomy.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlslError {
    #[error("construct is not representable in GLSL: {0}")]
    Unsupported(String),

    #[error("sampler/image type requires GLSL {0}.{1} or ES equivalent")]
    VersionTooLow(u32, u32),
}

pub type GlslResult<T> = Result<T, GlslError>;

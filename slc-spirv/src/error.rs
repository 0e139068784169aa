//! The SPIR-V back end's closed error taxonomy.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("SPIR-V {0}.{1} is not a supported target version")]
    UnsupportedVersion(u8, u8),

    #[error("primitive externals are not supported by the SPIR-V back end")]
    PrimitiveExternalNotSupported,

    #[error("recursive function `{0}` cannot be lowered to SPIR-V")]
    RecursiveFunction(String),

    #[error("runtime array used outside of a storage buffer")]
    RuntimeArrayMisplaced,

    #[error("construct is not supported by this back end: {0}")]
    Unsupported(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

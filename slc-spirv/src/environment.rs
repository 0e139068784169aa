//! SPIR-V target configuration.
use crate::error::{BackendError, BackendResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpirvEnvironment {
    pub spv_major: u8,
    pub spv_minor: u8,
}
impl Default for SpirvEnvironment {
    fn default() -> Self {
        SpirvEnvironment { spv_major: 1, spv_minor: 3 }
    }
}
impl SpirvEnvironment {
    pub fn validate(&self) -> BackendResult<()> {
        match (self.spv_major, self.spv_minor) {
            (1, 0) | (1, 1) | (1, 2) | (1, 3) => Ok(()),
            (major, minor) => Err(BackendError::UnsupportedVersion(major, minor)),
        }
    }

    /// SPIR-V 1.3 replaced the `Uniform` + `BufferBlock` encoding of storage
    /// buffers with `StorageBuffer` + `Block`.
    pub fn uses_storage_buffer_class(&self) -> bool {
        (self.spv_major, self.spv_minor) >= (1, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_version() {
        let env = SpirvEnvironment { spv_major: 1, spv_minor: 9 };
        assert!(env.validate().is_err());
    }

    #[test]
    fn one_dot_three_uses_storage_buffer_class() {
        assert!(SpirvEnvironment { spv_major: 1, spv_minor: 3 }.uses_storage_buffer_class());
        assert!(!SpirvEnvironment { spv_major: 1, spv_minor: 2 }.uses_storage_buffer_class());
    }
}

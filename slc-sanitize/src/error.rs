//! The sanitizer's closed error taxonomy. Every variant carries
//! the offending node's [`Span`] so callers can point a diagnostic at
//! source text even though this crate never touches source text itself.
use slc_ast::{ShaderStage, Span, Type};
use thiserror::Error;

use crate::resolver::ResolverError;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("{span}: unknown identifier `{name}`")]
    UnknownIdentifier { name: String, span: Span },

    #[error("{span}: `{name}` is already declared in this scope")]
    DuplicateDeclaration { name: String, span: Span },

    #[error("{span}: import of `{module_name}` failed: {source}")]
    ModuleResolution {
        module_name: String,
        span: Span,
        #[source]
        source: ResolverError,
    },

    #[error("{span}: type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        span: Span,
    },

    #[error("{span}: expected {expected} argument(s), found {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("{span}: expression is not valid in a constant context")]
    NonConstantContext { span: Span },

    #[error("{span}: invalid swizzle `{pattern}` on {base_ty}")]
    InvalidSwizzle {
        pattern: String,
        base_ty: Type,
        span: Span,
    },

    #[error("{span}: cannot cast {from} to {to}")]
    InvalidCast { from: Type, to: Type, span: Span },

    #[error("{span}: layout error: {message}")]
    LayoutError { message: String, span: Span },

    #[error(
        "{span}: binding conflict: (set {set}, binding {binding}) is assigned more than once"
    )]
    BindingConflict { set: u32, binding: u32, span: Span },

    #[error("{span}: external `{name}` has no binding and full sanitization was requested")]
    UnresolvedBinding { name: String, span: Span },

    #[error("{span}: feature `{feature}` is not declared for this module")]
    FeatureDisabled { feature: String, span: Span },

    #[error("{span}: entry point is tagged {found:?}, but the target stage is {expected:?}")]
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
        span: Span,
    },
}

pub type SanitizeResult<T> = Result<T, SanitizeError>;

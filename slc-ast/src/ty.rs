//! The type universe: a tagged variant every expression carries
//! as `Option<Type>`, fully populated once sanitization completes.
use std::fmt;

/// Index into a module's struct table.
pub type StructIndex = u32;
/// Index into a module's alias table.
pub type AliasIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    F32,
    F64,
    I32,
    U32,
}
impl PrimitiveType {
    /// Size in bytes of a single scalar of this type, used by the struct
    /// layout pass and the SPIR-V back end.
    pub fn size(&self) -> u32 {
        match self {
            PrimitiveType::Bool => 4,
            PrimitiveType::F32 => 4,
            PrimitiveType::F64 => 8,
            PrimitiveType::I32 => 4,
            PrimitiveType::U32 => 4,
        }
    }
}
impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::I32 => "i32",
            PrimitiveType::U32 => "u32",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    D1,
    D2,
    D3,
    Cube,
    D2Array,
    CubeArray,
}
impl fmt::Display for SamplerDim {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SamplerDim::D1 => "1D",
            SamplerDim::D2 => "2D",
            SamplerDim::D3 => "3D",
            SamplerDim::Cube => "Cube",
            SamplerDim::D2Array => "2DArray",
            SamplerDim::CubeArray => "CubeArray",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayLen {
    Fixed(u32),
    Runtime,
}

/// Built-in function identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicId {
    Sample,
    ArrayLength,
    BaseInstance,
    BaseVertex,
    DrawIndex,
}
impl fmt::Display for IntrinsicId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            IntrinsicId::Sample => "Sample",
            IntrinsicId::ArrayLength => "ArrayLength",
            IntrinsicId::BaseInstance => "base_instance",
            IntrinsicId::BaseVertex => "base_vertex",
            IntrinsicId::DrawIndex => "draw_index",
        };
        f.write_str(s)
    }
}

/// Method identifiers resolved against a receiver type. The sanitizer
/// lowers `Size` on a `dyn_array` member to `Intrinsic::ArrayLength` and
/// `Sample` on a sampler to `Intrinsic::Sample`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodId {
    Size,
    Sample,
}
impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            MethodId::Size => "Size",
            MethodId::Sample => "Sample",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Type {
    /// Absence of a value, e.g. the return type of a `void` function.
    NoType,
    Primitive(PrimitiveType),
    Vector {
        scalar: PrimitiveType,
        len: u32,
    },
    Matrix {
        scalar: PrimitiveType,
        cols: u32,
        rows: u32,
    },
    Array {
        element_ty: Box<Type>,
        len: ArrayLen,
    },
    Struct(StructIndex),
    Sampler {
        dim: SamplerDim,
        sampled: PrimitiveType,
    },
    /// Wraps a struct used as a `uniform[S]` external.
    Uniform(StructIndex),
    /// Wraps a struct used as a `storage[S]` external.
    Storage {
        struct_index: StructIndex,
        access: AccessMode,
    },
    /// Wraps a struct used as a `push_constant` external.
    PushConstant(StructIndex),
    Alias(AliasIndex),
    Function(FunctionSignature),
    Intrinsic(IntrinsicId),
    Method {
        receiver: Box<Type>,
        method: MethodId,
    },
}
impl Type {
    pub fn vec2(scalar: PrimitiveType) -> Type {
        Type::Vector { scalar, len: 2 }
    }
    pub fn vec3(scalar: PrimitiveType) -> Type {
        Type::Vector { scalar, len: 3 }
    }
    pub fn vec4(scalar: PrimitiveType) -> Type {
        Type::Vector { scalar, len: 4 }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Type::Primitive(x) => Some(*x),
            _ => None,
        }
    }
    pub fn as_vector(&self) -> Option<(PrimitiveType, u32)> {
        match self {
            Type::Vector { scalar, len } => Some((*scalar, *len)),
            _ => None,
        }
    }
    pub fn as_matrix(&self) -> Option<(PrimitiveType, u32, u32)> {
        match self {
            Type::Matrix { scalar, cols, rows } => Some((*scalar, *cols, *rows)),
            _ => None,
        }
    }
    pub fn as_struct(&self) -> Option<StructIndex> {
        match self {
            Type::Struct(i) => Some(*i),
            _ => None,
        }
    }
    /// The struct this type wraps, whether it's a plain struct reference or
    /// one wrapped as an external (uniform/storage/push_constant).
    pub fn wrapped_struct(&self) -> Option<StructIndex> {
        match self {
            Type::Struct(i) => Some(*i),
            Type::Uniform(i) => Some(*i),
            Type::Storage { struct_index, .. } => Some(*struct_index),
            Type::PushConstant(i) => Some(*i),
            _ => None,
        }
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }
    pub fn is_runtime_array(&self) -> bool {
        matches!(self, Type::Array { len: ArrayLen::Runtime, .. })
    }

    /// Number of scalar components, used for cast/constructor arity checks.
    pub fn component_count(&self) -> Option<u32> {
        match self {
            Type::Primitive(_) => Some(1),
            Type::Vector { len, .. } => Some(*len),
            Type::Matrix { cols, rows, .. } => Some(cols * rows),
            _ => None,
        }
    }
}
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::NoType => f.write_str("void"),
            Type::Primitive(x) => x.fmt(f),
            Type::Vector { scalar, len } => write!(f, "vec{len}[{scalar}]"),
            Type::Matrix { scalar, cols, rows } => write!(f, "mat{cols}x{rows}[{scalar}]"),
            Type::Array { element_ty, len } => match len {
                ArrayLen::Fixed(n) => write!(f, "array[{element_ty}, {n}]"),
                ArrayLen::Runtime => write!(f, "dyn_array[{element_ty}]"),
            },
            Type::Struct(i) => write!(f, "struct#{i}"),
            Type::Sampler { dim, sampled } => write!(f, "sampler{dim}[{sampled}]"),
            Type::Uniform(i) => write!(f, "uniform[struct#{i}]"),
            Type::Storage { struct_index, access } => {
                write!(f, "storage[struct#{struct_index}, {access:?}]")
            }
            Type::PushConstant(i) => write!(f, "push_constant[struct#{i}]"),
            Type::Alias(i) => write!(f, "alias#{i}"),
            Type::Function(sig) => {
                f.write_str("fn(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", sig.ret)
            }
            Type::Intrinsic(x) => write!(f, "intrinsic:{x}"),
            Type::Method { receiver, method } => write!(f, "{receiver}.{method}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn vector_display() {
        assert_eq!(Type::vec3(PrimitiveType::F32).to_string(), "vec3[f32]");
    }

    #[test]
    fn wrapped_struct_unwraps_every_external_kind() {
        assert_eq!(Type::Struct(3).wrapped_struct(), Some(3));
        assert_eq!(Type::Uniform(3).wrapped_struct(), Some(3));
        assert_eq!(
            Type::Storage { struct_index: 3, access: AccessMode::Read }.wrapped_struct(),
            Some(3)
        );
        assert_eq!(Type::PushConstant(3).wrapped_struct(), Some(3));
        assert_eq!(Type::NoType.wrapped_struct(), None);
    }

    #[test]
    fn component_count_matches_matrix_dimensions() {
        let m = Type::Matrix { scalar: PrimitiveType::F32, cols: 4, rows: 3 };
        assert_eq!(m.component_count(), Some(12));
    }
}

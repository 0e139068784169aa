//! GLSL type-name spelling: every [`Type`] variant this writer can emit
//! text for, collapsed to the token GLSL expects in a declaration or a
//! constructor call.
use slc_ast::{PrimitiveType, SamplerDim, StructTable, Type};

use crate::error::{GlslError, GlslResult};

pub fn primitive_name(ty: PrimitiveType) -> &'static str {
    match ty {
        PrimitiveType::Bool => "bool",
        PrimitiveType::F32 => "float",
        PrimitiveType::F64 => "double",
        PrimitiveType::I32 => "int",
        PrimitiveType::U32 => "uint",
    }
}

fn vector_prefix(scalar: PrimitiveType) -> &'static str {
    match scalar {
        PrimitiveType::Bool => "bvec",
        PrimitiveType::F32 => "vec",
        PrimitiveType::F64 => "dvec",
        PrimitiveType::I32 => "ivec",
        PrimitiveType::U32 => "uvec",
    }
}

fn sampler_suffix(dim: SamplerDim) -> &'static str {
    match dim {
        SamplerDim::D1 => "1D",
        SamplerDim::D2 => "2D",
        SamplerDim::D3 => "3D",
        SamplerDim::Cube => "Cube",
        SamplerDim::D2Array => "2DArray",
        SamplerDim::CubeArray => "CubeArray",
    }
}

fn sampler_scalar_prefix(scalar: PrimitiveType) -> &'static str {
    match scalar {
        PrimitiveType::I32 => "i",
        PrimitiveType::U32 => "u",
        _ => "",
    }
}

pub fn type_name(ty: &Type, structs: &StructTable) -> GlslResult<String> {
    let name = match ty {
        Type::NoType => "void".to_owned(),
        Type::Primitive(p) => primitive_name(*p).to_owned(),
        Type::Vector { scalar, len } => format!("{}{len}", vector_prefix(*scalar)),
        Type::Matrix { scalar, cols, rows } => {
            let prefix = if matches!(scalar, PrimitiveType::F64) { "dmat" } else { "mat" };
            if cols == rows {
                format!("{prefix}{cols}")
            } else {
                format!("{prefix}{cols}x{rows}")
            }
        }
        Type::Array { element_ty, .. } => type_name(element_ty, structs)?,
        Type::Struct(index) => structs.get(*index).name.clone(),
        Type::Sampler { dim, sampled } => {
            format!("{}sampler{}", sampler_scalar_prefix(*sampled), sampler_suffix(*dim))
        }
        Type::Uniform(index) | Type::PushConstant(index) => structs.get(*index).name.clone(),
        Type::Storage { struct_index, .. } => structs.get(*struct_index).name.clone(),
        other => return Err(GlslError::Unsupported(format!("{other} has no GLSL spelling"))),
    };
    Ok(name)
}

/// Trailing `[N]`/`[]` for array-typed declarations; GLSL puts the length
/// after the variable name rather than inside the type like the element
/// type itself would suggest.
pub fn array_suffix(ty: &Type) -> GlslResult<String> {
    match ty {
        Type::Array { len, .. } => match len {
            slc_ast::ArrayLen::Fixed(n) => Ok(format!("[{n}]")),
            slc_ast::ArrayLen::Runtime => Ok("[]".to_owned()),
        },
        _ => Ok(String::new()),
    }
}

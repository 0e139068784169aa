//! std140/std430 size, alignment and stride rules. Shared by the struct
//! layout pass and the SPIR-V stride decorations so offsets and strides
//! can never disagree about how a type is laid out.
use crate::ty::{ArrayLen, PrimitiveType, Type};

pub fn align_up(offset: u32, align: u32) -> u32 {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) / align * align
}

/// `(size, alignment)` in bytes for one struct member under std140/std430.
/// std140 pads vec3 to a vec4-sized slot for alignment purposes and rounds
/// array and matrix-column strides up to 16; std430 packs both tighter.
pub fn layout_of(ty: &Type, std140: bool) -> (u32, u32) {
    match ty {
        Type::Primitive(p) => {
            let s = p.size();
            (s, s)
        }
        Type::Vector { scalar, len } => {
            let s = scalar.size();
            match len {
                2 => (s * 2, s * 2),
                3 => (s * 3, s * 4),
                4 => (s * 4, s * 4),
                _ => (s * len, s * len),
            }
        }
        Type::Matrix { scalar, cols, rows } => {
            // Column-major: each column is laid out like a vector of
            // length `rows`, and the matrix stride is that column's
            // std140/std430 array stride.
            let column_ty = Type::Vector { scalar: *scalar, len: *rows };
            let (_, col_align) = layout_of(&column_ty, std140);
            let stride = if std140 { col_align.max(16) } else { col_align };
            (stride * cols, stride)
        }
        Type::Array { element_ty, len } => {
            let stride = array_stride(element_ty, std140);
            let count = match len {
                ArrayLen::Fixed(n) => *n,
                ArrayLen::Runtime => 0,
            };
            (stride * count, stride)
        }
        Type::Struct(_) | Type::Uniform(_) | Type::Storage { .. } | Type::PushConstant(_) => {
            // Nested structs round to a 16-byte slot. Structs are resolved
            // in declaration order and a nested struct always names an
            // earlier declaration, so its own layout is already settled.
            (16, 16)
        }
        _ => (PrimitiveType::F32.size(), PrimitiveType::F32.size()),
    }
}

/// Byte stride of one array element: the element's size rounded up to its
/// alignment, with std140 rounding that alignment up to 16 first.
pub fn array_stride(element_ty: &Type, std140: bool) -> u32 {
    let (size, align) = layout_of(element_ty, std140);
    let align = if std140 { align.max(16) } else { align };
    align_up(size, align.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn std140_scalar_array_stride_rounds_to_16() {
        assert_eq!(array_stride(&Type::Primitive(PrimitiveType::F32), true), 16);
        assert_eq!(array_stride(&Type::Primitive(PrimitiveType::F32), false), 4);
    }

    #[test]
    fn matrix_stride_rounds_each_column_not_the_total() {
        let mat2 = Type::Matrix { scalar: PrimitiveType::F32, cols: 2, rows: 2 };
        // Two 16-byte column slots under std140, not one 16-byte matrix.
        assert_eq!(layout_of(&mat2, true), (32, 16));
        assert_eq!(array_stride(&mat2, true), 32);
        // std430 keeps the vec2 column alignment.
        assert_eq!(layout_of(&mat2, false), (16, 8));
        assert_eq!(array_stride(&mat2, false), 16);
    }

    #[test]
    fn vec3_element_stride_pads_to_its_alignment() {
        let vec3 = Type::vec3(PrimitiveType::F32);
        assert_eq!(array_stride(&vec3, true), 16);
        assert_eq!(array_stride(&vec3, false), 16);
    }
}

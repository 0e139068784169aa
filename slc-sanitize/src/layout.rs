//! std140/std430 struct layout resolution.
use slc_ast::layout::{align_up, layout_of};
use slc_ast::module::Layout;
use slc_ast::ty::StructIndex;
use slc_ast::{Module, Span};

use crate::error::{SanitizeError, SanitizeResult};

pub fn run(module: &mut Module) -> SanitizeResult<()> {
    for index in 0..module.structs.structs.len() as StructIndex {
        let layout = module.structs.get(index).layout;
        if layout == Layout::Default {
            continue;
        }
        resolve_struct(module, index, layout)?;
    }
    Ok(())
}

fn resolve_struct(module: &mut Module, index: StructIndex, layout: Layout) -> SanitizeResult<()> {
    let std140 = layout == Layout::Std140;
    let member_count = module.structs.get(index).members.len();
    let mut offset = 0u32;
    let mut max_align = 0u32;

    for member_index in 0..member_count {
        let ty = module.structs.get(index).members[member_index].ty.clone();
        if ty.is_runtime_array() && member_index + 1 != member_count {
            return Err(SanitizeError::LayoutError {
                message: "runtime array must be the last member of the struct".to_owned(),
                span: Span::synthetic(),
            });
        }
        let (size, align) = layout_of(&ty, std140);
        max_align = max_align.max(align);
        let member_offset = align_up(offset, align);
        module.structs.get_mut(index).members[member_index].offset = Some(member_offset);
        offset = member_offset + size;
    }

    let struct_align = if std140 { max_align.max(16) } else { max_align };
    let total = align_up(offset, struct_align.max(1));
    module.structs.get_mut(index).size = Some(total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use slc_ast::module::{StructDecl, StructMember};
    use slc_ast::{PrimitiveType, Type};

    #[test]
    fn std140_vec3_is_padded_to_16_bytes() {
        let mut module = Module::new("m", noop_body());
        let index = module.structs.push(StructDecl {
            name: "S".into(),
            members: vec![
                StructMember { name: "a".into(), ty: Type::vec3(PrimitiveType::F32), offset: None, tag: None },
                StructMember { name: "b".into(), ty: Type::Primitive(PrimitiveType::F32), offset: None, tag: None },
            ],
            layout: Layout::Std140,
            size: None,
        });
        run(&mut module).unwrap();
        let decl = module.structs.get(index);
        assert_eq!(decl.members[0].offset, Some(0));
        assert_eq!(decl.members[1].offset, Some(12));
        assert_eq!(decl.size, Some(16));
    }

    #[test]
    fn matrix_array_member_offsets_agree_with_its_stride() {
        let mat2 = Type::Matrix { scalar: PrimitiveType::F32, cols: 2, rows: 2 };
        let mut module = Module::new("m", noop_body());
        let index = module.structs.push(StructDecl {
            name: "S".into(),
            members: vec![
                StructMember {
                    name: "mats".into(),
                    ty: Type::Array { element_ty: Box::new(mat2.clone()), len: slc_ast::ArrayLen::Fixed(3) },
                    offset: None,
                    tag: None,
                },
                StructMember { name: "tail".into(), ty: Type::Primitive(PrimitiveType::F32), offset: None, tag: None },
            ],
            layout: Layout::Std140,
            size: None,
        });
        run(&mut module).unwrap();
        let decl = module.structs.get(index);
        let stride = slc_ast::layout::array_stride(&mat2, true);
        assert_eq!(decl.members[0].offset, Some(0));
        assert_eq!(decl.members[1].offset, Some(stride * 3));
    }

    fn noop_body() -> slc_ast::Stmt {
        slc_ast::Stmt::new(slc_ast::StmtKind::NoOp, Span::synthetic())
    }
}

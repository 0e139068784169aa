//! Decoration emission: `Binding`, `DescriptorSet`, member `Offset`,
//! `Block`/`BufferBlock`.
use slc_ast::StructDecl;
use spirv::Decoration;

use crate::instr::{InstructionBuilder, SectionBuffer};

pub fn decorate(section: &mut SectionBuffer, target: u32, decoration: Decoration) {
    section.emit(InstructionBuilder::new(spirv::Op::Decorate).push(target).push(decoration as u32).build());
}

pub fn decorate_with_literal(section: &mut SectionBuffer, target: u32, decoration: Decoration, literal: u32) {
    section.emit(
        InstructionBuilder::new(spirv::Op::Decorate)
            .push(target)
            .push(decoration as u32)
            .push(literal)
            .build(),
    );
}

pub fn member_decorate_with_literal(
    section: &mut SectionBuffer,
    struct_id: u32,
    member: u32,
    decoration: Decoration,
    literal: u32,
) {
    section.emit(
        InstructionBuilder::new(spirv::Op::MemberDecorate)
            .push(struct_id)
            .push(member)
            .push(decoration as u32)
            .push(literal)
            .build(),
    );
}

pub fn decorate_binding(section: &mut SectionBuffer, var_id: u32, set: u32, binding: u32) {
    decorate_with_literal(section, var_id, Decoration::DescriptorSet, set);
    decorate_with_literal(section, var_id, Decoration::Binding, binding);
}

/// Emits `Offset` on every member (resolved by the sanitizer's layout
/// pass), plus `Block` (uniform, push_constant) or `BufferBlock`/`Block`
/// (storage, version-dependent) on the struct type itself. `ArrayStride`
/// targets the array *type*, so the emitter handles it where the type
/// table's IDs are at hand.
pub fn decorate_block_struct(
    section: &mut SectionBuffer,
    struct_id: u32,
    decl: &StructDecl,
    block_decoration: Decoration,
) {
    decorate(section, struct_id, block_decoration);
    for (i, member) in decl.members.iter().enumerate() {
        if let Some(offset) = member.offset {
            member_decorate_with_literal(section, struct_id, i as u32, Decoration::Offset, offset);
        }
    }
}

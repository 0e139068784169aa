//! SPIR-V back end: lowers a sanitized module straight to a
//! binary SPIR-V module, with no textual intermediate.
//!
//! [`emit`] accepts anything that derefs to [`slc_ast::Module`] — in
//! practice a `slc_sanitize::SanitizedModule` — since every invariant this
//! back end relies on (fully resolved bindings, no remaining draw-parameter
//! intrinsics, struct layouts assigned) is established by the sanitizer
//! rather than checked here.
mod decorate;
mod emit;
mod environment;
mod error;
mod ids;
mod instr;
mod types;

pub use environment::SpirvEnvironment;
pub use error::{BackendError, BackendResult};

/// Lowers `module` to a binary SPIR-V module (a sequence of little-endian
/// `u32` words, header first) targeting `env`.
pub fn emit(module: &slc_ast::Module, env: &SpirvEnvironment) -> BackendResult<Vec<u32>> {
    emit::emit(module, env)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use num_traits::FromPrimitive;
    use slc_ast::module::{
        AutoBinding, ExternalBinding, ExternalBlock, FunctionDecl, Module, StructDecl,
        StructMember, VariableKind, VariableSlot,
    };
    use slc_ast::{
        ArrayLen, Expr, ExprKind, Layout, PrimitiveType, SamplerDim, Span, Stmt, StmtKind, Type,
    };
    use spirv::Op;

    /// Decodes the emitted word stream back into `(opcode, operands)` pairs,
    /// the inverse of `InstructionBuilder`.
    fn instructions(words: &[u32]) -> Vec<(Op, Vec<u32>)> {
        let mut out = Vec::new();
        let mut i = 5;
        while i < words.len() {
            let word = words[i];
            let count = ((word >> 16) as usize).max(1);
            let op = Op::from_u32(word & 0xFFFF).expect("emitted an unknown opcode");
            out.push((op, words[i + 1..i + count].to_vec()));
            i += count;
        }
        out
    }

    fn ops(words: &[u32]) -> Vec<Op> {
        instructions(words).into_iter().map(|(op, _)| op).collect()
    }

    fn empty_vertex_module() -> Module {
        let mut module = Module::new("test", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.variables.push(VariableSlot {
            name: "out_color".to_owned(),
            ty: Type::Vector { scalar: PrimitiveType::F32, len: 4 },
            kind: VariableKind::StageOutput { location: 0 },
        });
        module
    }

    #[test]
    fn emits_header_with_configured_version() {
        let module = empty_vertex_module();
        let env = SpirvEnvironment { spv_major: 1, spv_minor: 3 };
        let words = emit(&module, &env).expect("emission should succeed");
        assert!(words.len() >= 5);
        assert_eq!(words[0], 0x0723_0203);
        assert_eq!(words[1], (1u32 << 16) | (3u32 << 8));
    }

    #[test]
    fn rejects_unsupported_version() {
        let module = empty_vertex_module();
        let env = SpirvEnvironment { spv_major: 9, spv_minor: 9 };
        assert!(matches!(emit(&module, &env), Err(BackendError::UnsupportedVersion(9, 9))));
    }

    #[test]
    fn detects_direct_recursion() {
        let mut module = empty_vertex_module();
        let call_self = Expr::typed(
            ExprKind::CallFunction {
                callee: Box::new(Expr::typed(ExprKind::Function(0), Type::NoType, Span::synthetic())),
                args: Vec::new(),
            },
            Type::NoType,
            Span::synthetic(),
        );
        module.functions.push(FunctionDecl {
            name: "loops_forever".to_owned(),
            params: Vec::new(),
            ret_ty: Type::NoType,
            body: Stmt::new(StmtKind::Expression(call_self), Span::synthetic()),
            entry_point: None,
            param_vars: Vec::new(),
            output_var: None,
        });
        let env = SpirvEnvironment::default();
        assert!(matches!(emit(&module, &env), Err(BackendError::RecursiveFunction(_))));
    }

    fn module_with_external(ty: Type) -> Module {
        let mut module = Module::new("test", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        let block = module.externals.push(ExternalBlock {
            set: Some(0),
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![ExternalBinding {
                name: "ext".to_owned(),
                ty: ty.clone(),
                binding: Some(0),
                tag: None,
                var_index: None,
            }],
        });
        let var = module.variables.push(VariableSlot {
            name: "ext".to_owned(),
            ty,
            kind: VariableKind::External { block, binding_index: 0 },
        });
        module.externals.get_mut(block).bindings[0].var_index = Some(var);
        module
    }

    #[test]
    fn sampler_array_external_lowers_to_sampled_image_array() {
        let module = module_with_external(Type::Array {
            element_ty: Box::new(Type::Sampler { dim: SamplerDim::Cube, sampled: PrimitiveType::F32 }),
            len: ArrayLen::Fixed(5),
        });
        let words = emit(&module, &SpirvEnvironment::default()).unwrap();
        let emitted = instructions(&words);
        assert!(emitted.iter().any(|(op, _)| *op == Op::TypeImage));
        assert!(emitted.iter().any(|(op, _)| *op == Op::TypeSampledImage));
        assert!(emitted.iter().any(|(op, operands)| *op == Op::Constant && operands.last() == Some(&5)));
        assert!(emitted.iter().any(|(op, _)| *op == Op::TypeArray));
        assert!(emitted.iter().any(|(op, operands)| {
            *op == Op::Variable && operands[2] == spirv::StorageClass::UniformConstant as u32
        }));
    }

    fn storage_buffer_module() -> Module {
        let mut module = Module::new("test", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        let data = module.structs.push(StructDecl {
            name: "Data".to_owned(),
            members: vec![StructMember {
                name: "values".to_owned(),
                ty: Type::Array {
                    element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
                    len: ArrayLen::Runtime,
                },
                offset: Some(0),
                tag: None,
            }],
            layout: Layout::Std430,
            size: Some(0),
        });
        let ty = Type::Storage { struct_index: data, access: slc_ast::AccessMode::ReadWrite };
        let block = module.externals.push(ExternalBlock {
            set: Some(0),
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![ExternalBinding {
                name: "data".to_owned(),
                ty: ty.clone(),
                binding: Some(0),
                tag: None,
                var_index: None,
            }],
        });
        let var = module.variables.push(VariableSlot {
            name: "data".to_owned(),
            ty,
            kind: VariableKind::External { block, binding_index: 0 },
        });
        module.externals.get_mut(block).bindings[0].var_index = Some(var);
        module
    }

    #[test]
    fn storage_buffer_encoding_follows_target_version() {
        let module = storage_buffer_module();

        let words = emit(&module, &SpirvEnvironment { spv_major: 1, spv_minor: 0 }).unwrap();
        let emitted = instructions(&words);
        assert!(emitted.iter().any(|(op, operands)| {
            *op == Op::Decorate && operands[1] == spirv::Decoration::BufferBlock as u32
        }));
        assert!(emitted.iter().any(|(op, operands)| {
            *op == Op::Variable && operands[2] == spirv::StorageClass::Uniform as u32
        }));

        let words = emit(&module, &SpirvEnvironment { spv_major: 1, spv_minor: 3 }).unwrap();
        let emitted = instructions(&words);
        assert!(emitted.iter().any(|(op, operands)| {
            *op == Op::Decorate && operands[1] == spirv::Decoration::Block as u32
        }));
        assert!(emitted.iter().any(|(op, operands)| {
            *op == Op::Variable && operands[2] == spirv::StorageClass::StorageBuffer as u32
        }));
    }

    #[test]
    fn primitive_external_is_rejected() {
        let module = module_with_external(Type::Primitive(PrimitiveType::Bool));
        assert!(matches!(
            emit(&module, &SpirvEnvironment::default()),
            Err(BackendError::PrimitiveExternalNotSupported)
        ));
    }

    #[test]
    fn header_and_sections_round_trip_through_the_scanner() {
        let words = emit(&empty_vertex_module(), &SpirvEnvironment::default()).unwrap();
        let emitted = ops(&words);
        assert_eq!(emitted.first(), Some(&Op::Capability));
        assert!(emitted.contains(&Op::MemoryModel));
    }
}

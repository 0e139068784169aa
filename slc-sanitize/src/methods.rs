//! Method-call lowering. `.Size()` on a storage buffer's
//! runtime array becomes an `ArrayLength(struct_var, member_index)`
//! intrinsic call, `.Sample(coord)` on a sampler becomes
//! `Sample(sampler, coord)`; runtime-array placement is validated here too
//! since this is the last pass that looks at array members as such.
use slc_ast::visit::{fold_expr_children, fold_stmt_children, ExprRewriter, StmtRewriter};
use slc_ast::{
    ConstValue, Expr, ExprKind, IntrinsicId, Module, PrimitiveType, Span, Stmt, StmtKind,
    StructTable, Type,
};

use crate::error::{SanitizeError, SanitizeResult};

pub fn run(module: &mut Module) -> SanitizeResult<()> {
    validate_positions(&module.structs)?;

    let body = std::mem::replace(&mut module.body, Stmt::new(StmtKind::NoOp, Span::synthetic()));
    let mut lowerer = MethodLowerer { structs: &module.structs };
    module.body = lowerer.rewrite_stmt(body);
    Ok(())
}

fn validate_positions(structs: &StructTable) -> SanitizeResult<()> {
    for decl in &structs.structs {
        for (i, member) in decl.members.iter().enumerate() {
            if member.ty.is_runtime_array() && i + 1 != decl.members.len() {
                return Err(SanitizeError::LayoutError {
                    message: format!(
                        "`{}` in struct `{}` is a runtime array but is not the last member",
                        member.name, decl.name
                    ),
                    span: Span::synthetic(),
                });
            }
        }
    }
    Ok(())
}

struct MethodLowerer<'a> {
    structs: &'a StructTable,
}
impl ExprRewriter for MethodLowerer<'_> {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        let expr = fold_expr_children(self, expr);
        let span = expr.span;
        let ty = expr.ty.clone();
        if let ExprKind::CallFunction { callee, args } = &expr.kind {
            if args.is_empty() {
                if let Some(lowered) = self.try_lower_size(callee, span) {
                    return Expr { kind: lowered, ty, span };
                }
            }
            if let Some(lowered) = self.try_lower_sample(callee, args, span) {
                return Expr { kind: lowered, ty, span };
            }
        }
        expr
    }
}
impl StmtRewriter for MethodLowerer<'_> {
    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        fold_stmt_children(self, stmt)
    }
}
impl MethodLowerer<'_> {
    fn try_lower_size(&self, callee: &Expr, span: Span) -> Option<ExprKind> {
        let ExprKind::AccessIdentifier { base: Some(field_access), member } = &callee.kind else {
            return None;
        };
        if member != "Size" {
            return None;
        }
        let ExprKind::AccessIdentifier { base: Some(struct_expr), member: field_name } =
            &field_access.kind
        else {
            return None;
        };
        let struct_index = struct_expr.ty.as_ref().and_then(Type::wrapped_struct)?;
        let member_index = self.structs.get(struct_index).member_index(field_name)?;
        Some(ExprKind::CallFunction {
            callee: Box::new(Expr::typed(
                ExprKind::Intrinsic(IntrinsicId::ArrayLength),
                Type::Intrinsic(IntrinsicId::ArrayLength),
                span,
            )),
            args: vec![
                (**struct_expr).clone(),
                Expr::typed(
                    ExprKind::ConstantValue(ConstValue::U32(member_index as u32)),
                    Type::Primitive(PrimitiveType::U32),
                    span,
                ),
            ],
        })
    }

    /// `tex.Sample(coord)` becomes `Sample(tex, coord)`: the receiver is
    /// folded into the argument list so back ends see a plain intrinsic call
    /// with the fixed `(sampler, coord_vec)` signature.
    fn try_lower_sample(&self, callee: &Expr, args: &[Expr], span: Span) -> Option<ExprKind> {
        let ExprKind::AccessIdentifier { base: Some(sampler_expr), member } = &callee.kind else {
            return None;
        };
        if member != "Sample" || !matches!(sampler_expr.ty, Some(Type::Sampler { .. })) {
            return None;
        }
        let mut lowered_args = Vec::with_capacity(args.len() + 1);
        lowered_args.push((**sampler_expr).clone());
        lowered_args.extend(args.iter().cloned());
        Some(ExprKind::CallFunction {
            callee: Box::new(Expr::typed(
                ExprKind::Intrinsic(IntrinsicId::Sample),
                Type::Intrinsic(IntrinsicId::Sample),
                span,
            )),
            args: lowered_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use slc_ast::module::{StructDecl, StructMember};
    use slc_ast::{ArrayLen, Layout};

    #[test]
    fn runtime_array_must_be_last_member() {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.structs.push(StructDecl {
            name: "Data".into(),
            members: vec![
                StructMember {
                    name: "values".into(),
                    ty: Type::Array {
                        element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
                        len: ArrayLen::Runtime,
                    },
                    offset: None,
                    tag: None,
                },
                StructMember {
                    name: "count".into(),
                    ty: Type::Primitive(PrimitiveType::U32),
                    offset: None,
                    tag: None,
                },
            ],
            layout: Layout::Std430,
            size: None,
        });
        assert!(matches!(run(&mut module), Err(SanitizeError::LayoutError { .. })));
    }

    #[test]
    fn sample_method_folds_receiver_into_intrinsic_call() {
        let structs = StructTable::default();
        let mut lowerer = MethodLowerer { structs: &structs };
        let sampler_ty = Type::Sampler { dim: slc_ast::SamplerDim::D2, sampled: PrimitiveType::F32 };
        let call = Expr::typed(
            ExprKind::CallFunction {
                callee: Box::new(Expr::typed(
                    ExprKind::AccessIdentifier {
                        base: Some(Box::new(Expr::typed(
                            ExprKind::VariableValue(0),
                            sampler_ty.clone(),
                            Span::synthetic(),
                        ))),
                        member: "Sample".into(),
                    },
                    Type::Method { receiver: Box::new(sampler_ty), method: slc_ast::MethodId::Sample },
                    Span::synthetic(),
                )),
                args: vec![Expr::typed(
                    ExprKind::Cast {
                        target_ty: Type::vec2(PrimitiveType::F32),
                        args: Vec::new(),
                    },
                    Type::vec2(PrimitiveType::F32),
                    Span::synthetic(),
                )],
            },
            Type::vec4(PrimitiveType::F32),
            Span::synthetic(),
        );
        let lowered = lowerer.rewrite(call);
        let ExprKind::CallFunction { callee, args } = &lowered.kind else {
            panic!("expected a call, found {:?}", lowered.kind);
        };
        assert!(matches!(callee.kind, ExprKind::Intrinsic(IntrinsicId::Sample)));
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0].kind, ExprKind::VariableValue(0)));
    }
}

//! Bottom-up type inference and checking.
use slc_ast::visit::{fold_expr_children, ExprRewriter};
use slc_ast::{
    BinaryOp, ConstValue, Expr, ExprKind, FunctionTable, IntrinsicId, Module, PrimitiveType,
    StructTable, Type, UnaryOp, VariableTable,
};

use crate::error::{SanitizeError, SanitizeResult};

pub fn run(module: &mut Module) -> SanitizeResult<()> {
    let body = std::mem::replace(
        &mut module.body,
        slc_ast::Stmt::new(slc_ast::StmtKind::NoOp, slc_ast::Span::synthetic()),
    );
    let mut checker = TypeChecker {
        structs: &module.structs,
        functions: &module.functions,
        variables: &module.variables,
        error: None,
    };
    let body = slc_ast::visit::fold_stmt_children(
        &mut StmtTypeWalk { checker: &mut checker },
        body,
    );
    if let Some(err) = checker.error.take() {
        return Err(err);
    }
    module.body = body;
    Ok(())
}

/// `fold_stmt_children` requires `ExprRewriter`; `StmtRewriter` additionally
/// requires it be the *same* type, so this thin adapter lets the statement
/// walk and the expression walk share one `TypeChecker` without the
/// statement-level plumbing (hoisting, scoping) that scope resolution
/// already owns.
struct StmtTypeWalk<'a, 'b> {
    checker: &'a mut TypeChecker<'b>,
}
impl ExprRewriter for StmtTypeWalk<'_, '_> {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        self.checker.rewrite(expr)
    }
}
impl slc_ast::visit::StmtRewriter for StmtTypeWalk<'_, '_> {
    fn rewrite_stmt(&mut self, stmt: slc_ast::Stmt) -> slc_ast::Stmt {
        slc_ast::visit::fold_stmt_children(self, stmt)
    }
}

struct TypeChecker<'a> {
    structs: &'a StructTable,
    functions: &'a FunctionTable,
    variables: &'a VariableTable,
    error: Option<SanitizeError>,
}
impl TypeChecker<'_> {
    fn fail(&mut self, err: SanitizeError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn member_ty(&mut self, base_ty: &Type, member: &str, span: slc_ast::Span) -> Type {
        let Some(struct_index) = base_ty.wrapped_struct() else {
            self.fail(SanitizeError::UnknownIdentifier { name: member.to_owned(), span });
            return Type::NoType;
        };
        let decl = self.structs.get(struct_index);
        match decl.member_index(member) {
            Some(i) => decl.members[i].ty.clone(),
            None => {
                self.fail(SanitizeError::UnknownIdentifier { name: member.to_owned(), span });
                Type::NoType
            }
        }
    }

    fn binary_result_ty(
        &mut self,
        op: BinaryOp,
        lhs: &Type,
        rhs: &Type,
        span: slc_ast::Span,
    ) -> Type {
        if op.is_logical() {
            return Type::Primitive(PrimitiveType::Bool);
        }
        if op.is_comparison() {
            return Type::Primitive(PrimitiveType::Bool);
        }
        match (lhs, rhs) {
            (a, b) if a == b => a.clone(),
            // Scalar-vector broadcast: `vecN[s] op s` or `s op vecN[s]`.
            (Type::Vector { scalar, len }, Type::Primitive(p)) if scalar == p => {
                Type::Vector { scalar: *scalar, len: *len }
            }
            (Type::Primitive(p), Type::Vector { scalar, len }) if scalar == p => {
                Type::Vector { scalar: *scalar, len: *len }
            }
            (Type::Matrix { scalar, cols, .. }, Type::Vector { scalar: vs, len })
                if scalar == vs && cols == len =>
            {
                Type::Vector { scalar: *scalar, len: *cols }
            }
            (Type::Vector { scalar: vs, len }, Type::Matrix { scalar, rows, .. })
                if scalar == vs && rows == len =>
            {
                Type::Vector { scalar: *scalar, len: *rows }
            }
            _ => {
                self.fail(SanitizeError::TypeMismatch {
                    expected: lhs.clone(),
                    found: rhs.clone(),
                    span,
                });
                Type::NoType
            }
        }
    }
}
impl ExprRewriter for TypeChecker<'_> {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        let span = expr.span;
        let expr = fold_expr_children(self, expr);
        if expr.ty.is_some() {
            return expr;
        }
        let ty = match &expr.kind {
            ExprKind::ConstantValue(ConstValue::Bool(_)) => Type::Primitive(PrimitiveType::Bool),
            ExprKind::ConstantValue(ConstValue::I32(_)) => Type::Primitive(PrimitiveType::I32),
            ExprKind::ConstantValue(ConstValue::U32(_)) => Type::Primitive(PrimitiveType::U32),
            ExprKind::ConstantValue(ConstValue::F32(_)) => Type::Primitive(PrimitiveType::F32),
            ExprKind::ConstantValue(ConstValue::F64(_)) => Type::Primitive(PrimitiveType::F64),
            ExprKind::VariableValue(i) => self.variables.get(*i).ty.clone(),
            ExprKind::AliasValue(_) => Type::NoType,
            ExprKind::Function(i) => {
                let decl = self.functions.get(*i);
                Type::Function(slc_ast::FunctionSignature {
                    params: decl.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(decl.ret_ty.clone()),
                })
            }
            ExprKind::Intrinsic(id) => Type::Intrinsic(*id),
            ExprKind::Unary { op, value } => match op {
                UnaryOp::Not => Type::Primitive(PrimitiveType::Bool),
                UnaryOp::Neg => value.ty.clone().unwrap_or(Type::NoType),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = lhs.ty.clone().unwrap_or(Type::NoType);
                let rhs_ty = rhs.ty.clone().unwrap_or(Type::NoType);
                self.binary_result_ty(*op, &lhs_ty, &rhs_ty, span)
            }
            ExprKind::Assign { value, .. } => value.ty.clone().unwrap_or(Type::NoType),
            ExprKind::AccessIdentifier { base: Some(base), member } => {
                let base_ty = base.ty.clone().unwrap_or(Type::NoType);
                self.resolve_member_or_method(&base_ty, member, span)
            }
            ExprKind::AccessIdentifier { base: None, member } => {
                self.fail(SanitizeError::UnknownIdentifier { name: member.clone(), span });
                Type::NoType
            }
            ExprKind::AccessIndex { base, .. } => match base.ty.clone() {
                Some(Type::Array { element_ty, .. }) => *element_ty,
                Some(Type::Vector { scalar, .. }) => Type::Primitive(scalar),
                other => {
                    self.fail(SanitizeError::TypeMismatch {
                        expected: Type::Array {
                            element_ty: Box::new(Type::NoType),
                            len: slc_ast::ArrayLen::Runtime,
                        },
                        found: other.unwrap_or(Type::NoType),
                        span,
                    });
                    Type::NoType
                }
            },
            ExprKind::Swizzle { base, components } => {
                let scalar = match base.ty.as_ref().and_then(Type::as_vector) {
                    Some((scalar, _)) => scalar,
                    None => {
                        self.fail(SanitizeError::InvalidSwizzle {
                            pattern: swizzle_pattern(components),
                            base_ty: base.ty.clone().unwrap_or(Type::NoType),
                            span,
                        });
                        PrimitiveType::F32
                    }
                };
                if components.len() == 1 {
                    Type::Primitive(scalar)
                } else {
                    Type::Vector { scalar, len: components.len() as u32 }
                }
            }
            ExprKind::Cast { target_ty, args } => {
                match target_ty.component_count() {
                    Some(expected) => {
                        let total: u32 = args
                            .iter()
                            .map(|a| a.ty.as_ref().and_then(Type::component_count).unwrap_or(1))
                            .sum();
                        if expected != total && !(args.len() == 1 && target_ty.is_scalar()) {
                            self.fail(SanitizeError::ArityMismatch {
                                expected: expected as usize,
                                found: total as usize,
                                span,
                            });
                        }
                    }
                    // Only numeric scalars/vectors/matrices are castable or
                    // constructible.
                    None => {
                        let from = args
                            .first()
                            .and_then(|a| a.ty.clone())
                            .unwrap_or(Type::NoType);
                        self.fail(SanitizeError::InvalidCast {
                            from,
                            to: target_ty.clone(),
                            span,
                        });
                    }
                }
                target_ty.clone()
            }
            ExprKind::CallFunction { callee, args } => {
                self.check_call(callee, args, span)
            }
            _ => Type::NoType,
        };
        Expr { ty: Some(ty), ..expr }
    }
}
impl TypeChecker<'_> {
    fn resolve_member_or_method(&mut self, base_ty: &Type, member: &str, span: slc_ast::Span) -> Type {
        match member {
            "Size" if base_ty.is_array() => {
                Type::Method { receiver: Box::new(base_ty.clone()), method: slc_ast::MethodId::Size }
            }
            "Sample" if matches!(base_ty, Type::Sampler { .. }) => Type::Method {
                receiver: Box::new(base_ty.clone()),
                method: slc_ast::MethodId::Sample,
            },
            _ => self.member_ty(base_ty, member, span),
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: slc_ast::Span) -> Type {
        match callee.ty.as_ref() {
            Some(Type::Function(sig)) => {
                if sig.params.len() != args.len() {
                    self.fail(SanitizeError::ArityMismatch {
                        expected: sig.params.len(),
                        found: args.len(),
                        span,
                    });
                }
                (*sig.ret).clone()
            }
            Some(Type::Method { receiver, method: slc_ast::MethodId::Size }) => {
                let _ = receiver;
                Type::Primitive(PrimitiveType::U32)
            }
            Some(Type::Method { receiver, method: slc_ast::MethodId::Sample }) => {
                sample_result_ty(receiver)
            }
            // Once lowered, the sampler travels as the first argument.
            Some(Type::Intrinsic(IntrinsicId::Sample)) => args
                .first()
                .and_then(|a| a.ty.as_ref())
                .map(sample_result_ty)
                .unwrap_or(Type::vec4(PrimitiveType::F32)),
            Some(Type::Intrinsic(IntrinsicId::ArrayLength)) => {
                Type::Primitive(PrimitiveType::U32)
            }
            Some(Type::Intrinsic(
                IntrinsicId::BaseInstance | IntrinsicId::BaseVertex | IntrinsicId::DrawIndex,
            )) => Type::Primitive(PrimitiveType::I32),
            other => {
                self.fail(SanitizeError::TypeMismatch {
                    expected: Type::Function(slc_ast::FunctionSignature {
                        params: vec![],
                        ret: Box::new(Type::NoType),
                    }),
                    found: other.cloned().unwrap_or(Type::NoType),
                    span,
                });
                Type::NoType
            }
        }
    }
}

/// `Sample` yields a four-component vector of the sampler's sampled
/// primitive, so an `isampler`/`usampler` read comes back integer-typed.
fn sample_result_ty(receiver: &Type) -> Type {
    match receiver {
        Type::Sampler { sampled, .. } => Type::vec4(*sampled),
        _ => Type::vec4(PrimitiveType::F32),
    }
}

fn swizzle_pattern(components: &[u8]) -> String {
    const LETTERS: [char; 4] = ['x', 'y', 'z', 'w'];
    components
        .iter()
        .map(|&c| LETTERS.get(c as usize).copied().unwrap_or('?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use slc_ast::module::{VariableKind, VariableSlot};
    use slc_ast::{SamplerDim, Span, Stmt, StmtKind};

    #[test]
    fn sample_returns_the_samplers_component_type() {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        let tex = module.variables.push(VariableSlot {
            name: "tex".into(),
            ty: Type::Sampler { dim: SamplerDim::D2, sampled: PrimitiveType::I32 },
            kind: VariableKind::Local,
        });
        let coord = Expr::untyped(
            ExprKind::Cast {
                target_ty: Type::vec2(PrimitiveType::F32),
                args: vec![
                    Expr::untyped(ExprKind::ConstantValue(ConstValue::from(0.0f32)), Span::synthetic()),
                    Expr::untyped(ExprKind::ConstantValue(ConstValue::from(0.0f32)), Span::synthetic()),
                ],
            },
            Span::synthetic(),
        );
        let call = Expr::untyped(
            ExprKind::CallFunction {
                callee: Box::new(Expr::untyped(
                    ExprKind::AccessIdentifier {
                        base: Some(Box::new(Expr::untyped(
                            ExprKind::VariableValue(tex),
                            Span::synthetic(),
                        ))),
                        member: "Sample".into(),
                    },
                    Span::synthetic(),
                )),
                args: vec![coord],
            },
            Span::synthetic(),
        );
        module.body = Stmt::new(StmtKind::Expression(call), Span::synthetic());

        run(&mut module).unwrap();

        let StmtKind::Expression(expr) = &module.body.kind else {
            panic!("body changed shape");
        };
        assert_eq!(expr.ty, Some(Type::vec4(PrimitiveType::I32)));
    }
}

//! Entry-point legalization: hoists stage inputs/outputs to module
//! variables and rewrites the entry function against them.
use slc_ast::module::{BuiltinVar, DrawParamKind, VariableKind, VariableSlot};
use slc_ast::visit::{fold_expr_children, fold_stmt_children, ExprRewriter, StmtRewriter};
use slc_ast::{
    BinaryOp, ConstValue, Expr, ExprKind, FunctionIndex, IntrinsicId, Module, PrimitiveType,
    ShaderStage, Span, Stmt, StmtKind, Type, VarIndex,
};

use crate::error::{SanitizeError, SanitizeResult};
use crate::options::SanitizeOptions;

pub fn run(module: &mut Module, options: &SanitizeOptions) -> SanitizeResult<()> {
    let indices: Vec<FunctionIndex> =
        module.functions.entry_points().map(|(i, _)| i).collect();
    for index in indices {
        legalize_one(module, index, options)?;
    }
    Ok(())
}

fn legalize_one(module: &mut Module, index: FunctionIndex, options: &SanitizeOptions) -> SanitizeResult<()> {
    let stage = module.functions.get(index).entry_point.as_ref().and_then(|e| e.stage);
    if let (Some(target), Some(found)) = (options.target_stage, stage) {
        if target != found {
            return Err(SanitizeError::StageMismatch {
                expected: target,
                found,
                span: module.functions.get(index).body.span,
            });
        }
    }

    hoist_inputs(module, index, stage);
    let output_var = hoist_output(module, index, stage);

    let decl = module.functions.get_mut(index);
    decl.output_var = output_var;
    let body = std::mem::replace(&mut decl.body, Stmt::new(StmtKind::NoOp, Span::synthetic()));

    let fallback_vars = if options.draw_parameters_uniform_fallback {
        materialize_fallback_vars(module, &body)
    } else {
        Default::default()
    };

    let mut rewriter = EntryPointRewriter {
        output_var,
        stage,
        flip_y: options.flip_y_position,
        remap_z: options.remap_z_position,
        fallback_vars,
    };
    let body = rewriter.rewrite_stmt(body);
    let decl = module.functions.get_mut(index);
    decl.body = body;
    // The signature is now carried entirely by hoisted module variables:
    // inputs read from `StageInput`/`Builtin` slots, the return value
    // written through `output_var`.
    decl.params = Vec::new();
    if decl.output_var.is_some() {
        decl.ret_ty = Type::NoType;
    }
    Ok(())
}

/// Scans `body` for draw-parameter intrinsic calls and pushes one fallback
/// uniform variable per distinct kind actually used, before the rewrite
/// pass needs a `VarIndex` to substitute in.
fn materialize_fallback_vars(
    module: &mut Module,
    body: &Stmt,
) -> fnv::FnvHashMap<DrawParamKind, VarIndex> {
    use slc_ast::{ExprVisitor, StmtVisitor};

    struct Scan {
        found: Vec<DrawParamKind>,
    }
    impl ExprVisitor for Scan {
        fn visit_call_function(&mut self, callee: &Expr, args: &[Expr]) {
            if !args.is_empty() {
                return;
            }
            let kind = match callee.ty.as_ref() {
                Some(Type::Intrinsic(IntrinsicId::BaseInstance)) => Some(DrawParamKind::BaseInstance),
                Some(Type::Intrinsic(IntrinsicId::BaseVertex)) => Some(DrawParamKind::BaseVertex),
                Some(Type::Intrinsic(IntrinsicId::DrawIndex)) => Some(DrawParamKind::DrawIndex),
                _ => None,
            };
            if let Some(kind) = kind {
                self.found.push(kind);
            }
        }
    }
    impl StmtVisitor for Scan {
        fn visit_embedded_expr(&mut self, expr: &Expr) {
            slc_ast::walk_expr(self, expr);
        }
    }

    let mut scan = Scan { found: Vec::new() };
    slc_ast::walk_stmt(&mut scan, body);

    let mut vars = fnv::FnvHashMap::default();
    for kind in scan.found {
        vars.entry(kind).or_insert_with(|| {
            let name = match kind {
                DrawParamKind::BaseInstance => "base_instance__fallback",
                DrawParamKind::BaseVertex => "base_vertex__fallback",
                DrawParamKind::DrawIndex => "draw_index__fallback",
            };
            module.variables.push(VariableSlot {
                name: name.to_owned(),
                ty: Type::Primitive(PrimitiveType::I32),
                kind: VariableKind::DrawParameterFallback(kind),
            })
        });
    }
    vars
}

fn hoist_inputs(module: &mut Module, index: FunctionIndex, _stage: Option<ShaderStage>) {
    let param_vars = module.functions.get(index).param_vars.clone();
    for (location, var_index) in param_vars.into_iter().enumerate() {
        module.variables.get_mut(var_index).kind =
            VariableKind::StageInput { location: location as u32 };
    }
}

/// Vertex entry points returning `vec4[f32]` are assumed to be returning
/// clip-space position (the SL convention this back end targets has no
/// separate output-struct syntax to declare that explicitly); every other
/// stage gets a single generic `Location(0)` output.
fn hoist_output(module: &mut Module, index: FunctionIndex, stage: Option<ShaderStage>) -> Option<VarIndex> {
    let decl = module.functions.get(index);
    if decl.ret_ty == Type::NoType {
        return None;
    }
    let is_position = stage == Some(ShaderStage::Vertex) && decl.ret_ty == Type::vec4(PrimitiveType::F32);
    let kind = if is_position {
        VariableKind::Builtin(BuiltinVar::Position)
    } else {
        VariableKind::StageOutput { location: 0 }
    };
    let ty = decl.ret_ty.clone();
    Some(module.variables.push(VariableSlot { name: format!("{}__out", decl.name), ty, kind }))
}

struct EntryPointRewriter {
    output_var: Option<VarIndex>,
    stage: Option<ShaderStage>,
    flip_y: bool,
    remap_z: bool,
    fallback_vars: fnv::FnvHashMap<DrawParamKind, VarIndex>,
}
impl EntryPointRewriter {
    fn apply_vertex_fixups(&self, expr: Expr) -> Expr {
        if self.stage != Some(ShaderStage::Vertex) {
            return expr;
        }
        let span = expr.span;
        let ty = expr.ty.clone();
        let mut expr = expr;
        if self.flip_y {
            expr = flip_y_component(expr, ty.clone(), span);
        }
        if self.remap_z {
            // `z = z * 2.0 - 1.0`, expressed as a cast-free arithmetic
            // rewrite the back end lowers per-component.
            expr = Expr {
                kind: ExprKind::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(Expr {
                        kind: ExprKind::Binary {
                            op: BinaryOp::Mul,
                            lhs: Box::new(expr),
                            rhs: Box::new(Expr::typed(
                                ExprKind::ConstantValue(ConstValue::from(2.0f32)),
                                Type::Primitive(PrimitiveType::F32),
                                span,
                            )),
                        },
                        ty: ty.clone(),
                        span,
                    }),
                    rhs: Box::new(Expr::typed(
                        ExprKind::ConstantValue(ConstValue::from(1.0f32)),
                        Type::Primitive(PrimitiveType::F32),
                        span,
                    )),
                },
                ty,
                span,
            };
        }
        expr
    }
}

/// Rebuilds `position` with its `y` component negated, as a
/// `vec4(position.x, -position.y, position.z, position.w)` constructor —
/// there's no in-place component assignment on an arbitrary expression, so
/// the fix-up is expressed as reconstruction instead.
fn flip_y_component(position: Expr, ty: Option<Type>, span: Span) -> Expr {
    let swizzle = |component: u8| Expr {
        kind: ExprKind::Swizzle { base: Box::new(position.clone()), components: vec![component] },
        ty: Some(Type::Primitive(PrimitiveType::F32)),
        span,
    };
    let neg_y = Expr {
        kind: ExprKind::Unary { op: slc_ast::UnaryOp::Neg, value: Box::new(swizzle(1)) },
        ty: Some(Type::Primitive(PrimitiveType::F32)),
        span,
    };
    Expr {
        kind: ExprKind::Cast {
            target_ty: Type::vec4(PrimitiveType::F32),
            args: vec![swizzle(0), neg_y, swizzle(2), swizzle(3)],
        },
        ty,
        span,
    }
}

impl ExprRewriter for EntryPointRewriter {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        let expr = fold_expr_children(self, expr);
        if self.fallback_vars.is_empty() {
            return expr;
        }
        let span = expr.span;
        let draw_param = match &expr.kind {
            ExprKind::CallFunction { callee, args } if args.is_empty() => {
                match callee.ty.as_ref() {
                    Some(Type::Intrinsic(IntrinsicId::BaseInstance)) => Some(DrawParamKind::BaseInstance),
                    Some(Type::Intrinsic(IntrinsicId::BaseVertex)) => Some(DrawParamKind::BaseVertex),
                    Some(Type::Intrinsic(IntrinsicId::DrawIndex)) => Some(DrawParamKind::DrawIndex),
                    _ => None,
                }
            }
            _ => None,
        };
        match draw_param.and_then(|kind| self.fallback_vars.get(&kind).copied()) {
            Some(var) => Expr { kind: ExprKind::VariableValue(var), ty: expr.ty, span },
            None => expr,
        }
    }
}
impl StmtRewriter for EntryPointRewriter {
    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        let span = stmt.span;
        match stmt.kind {
            StmtKind::Return(Some(value)) => {
                let value = self.rewrite(value);
                let value = self.apply_vertex_fixups(value);
                match self.output_var {
                    Some(var) => {
                        let value_ty = value.ty.clone();
                        Stmt::new(
                            StmtKind::Multi(vec![
                                Stmt::new(
                                    StmtKind::Expression(Expr {
                                        kind: ExprKind::Assign {
                                            target: Box::new(Expr {
                                                kind: ExprKind::VariableValue(var),
                                                ty: value_ty.clone(),
                                                span,
                                            }),
                                            value: Box::new(value),
                                        },
                                        ty: value_ty,
                                        span,
                                    }),
                                    span,
                                ),
                                Stmt::new(StmtKind::Return(None), span),
                            ]),
                            span,
                        )
                    }
                    None => Stmt::new(StmtKind::Return(Some(value)), span),
                }
            }
            other => fold_stmt_children(self, Stmt { kind: other, span }),
        }
    }
}

//! Constant folding: collapse pure constant subtrees and prune dead conditional
//! branches whose predicate is a fully known boolean constant.
use slc_ast::visit::{fold_expr_children, fold_stmt_children, ExprRewriter, StmtRewriter};
use slc_ast::{BinaryOp, ConstValue, Expr, ExprKind, Module, Stmt, StmtKind, UnaryOp};

use crate::error::SanitizeResult;

pub fn run(module: &mut Module) -> SanitizeResult<()> {
    let body = std::mem::replace(
        &mut module.body,
        Stmt::new(StmtKind::NoOp, slc_ast::Span::synthetic()),
    );
    let mut folder = ConstFolder { error: None };
    module.body = folder.rewrite_stmt(body);
    if let Some(err) = folder.error.take() {
        return Err(err);
    }
    Ok(())
}

struct ConstFolder {
    error: Option<crate::error::SanitizeError>,
}
impl ExprRewriter for ConstFolder {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        let expr = fold_expr_children(self, expr);
        let span = expr.span;
        let ty = expr.ty.clone();
        match &expr.kind {
            ExprKind::Unary { op, value } => {
                if let ExprKind::ConstantValue(v) = &value.kind {
                    if let Some(folded) = fold_unary(*op, v) {
                        return Expr { kind: ExprKind::ConstantValue(folded), ty, span };
                    }
                }
                expr
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if let (ExprKind::ConstantValue(a), ExprKind::ConstantValue(b)) =
                    (&lhs.kind, &rhs.kind)
                {
                    if let Some(folded) = fold_binary(*op, a, b) {
                        return Expr { kind: ExprKind::ConstantValue(folded), ty, span };
                    }
                }
                expr
            }
            _ => expr,
        }
    }
}
impl StmtRewriter for ConstFolder {
    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        let span = stmt.span;
        match stmt.kind {
            // An `option` default is a constant context: whatever it was
            // written as, it must have folded down to a literal by now.
            StmtKind::DeclareOption { name, ty, default, index } => {
                let default = default.map(|d| self.rewrite(d));
                if let Some(d) = &default {
                    if !matches!(d.kind, ExprKind::ConstantValue(_)) && self.error.is_none() {
                        self.error =
                            Some(crate::error::SanitizeError::NonConstantContext { span: d.span });
                    }
                }
                Stmt::new(StmtKind::DeclareOption { name, ty, default, index }, span)
            }
            StmtKind::Branch { cond, then_branch, else_branch } => {
                let cond = self.rewrite(cond);
                let then_branch = Box::new(self.rewrite_stmt(*then_branch));
                let else_branch = else_branch.map(|e| Box::new(self.rewrite_stmt(*e)));
                match &cond.kind {
                    ExprKind::ConstantValue(ConstValue::Bool(true)) => *then_branch,
                    ExprKind::ConstantValue(ConstValue::Bool(false)) => else_branch
                        .map(|e| *e)
                        .unwrap_or(Stmt::new(StmtKind::NoOp, span)),
                    _ => Stmt::new(StmtKind::Branch { cond, then_branch, else_branch }, span),
                }
            }
            other => fold_stmt_children(self, Stmt { kind: other, span }),
        }
    }
}

fn fold_unary(op: UnaryOp, v: &ConstValue) -> Option<ConstValue> {
    match (op, v) {
        (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        (UnaryOp::Neg, ConstValue::I32(x)) => Some(ConstValue::I32(-x)),
        (UnaryOp::Neg, ConstValue::F32(x)) => Some(ConstValue::from(-x.0)),
        (UnaryOp::Neg, ConstValue::F64(x)) => Some(ConstValue::from(-x.0)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    match (a, b) {
        (I32(a), I32(b)) => fold_arith_i32(op, *a, *b),
        (U32(a), U32(b)) => fold_arith_u32(op, *a, *b),
        (F32(a), F32(b)) => fold_arith_f32(op, a.0, b.0),
        (Bool(a), Bool(b)) => fold_logical(op, *a, *b),
        _ => None,
    }
}

fn fold_arith_i32(op: BinaryOp, a: i32, b: i32) -> Option<ConstValue> {
    Some(match op {
        BinaryOp::Add => ConstValue::from(a.wrapping_add(b)),
        BinaryOp::Sub => ConstValue::from(a.wrapping_sub(b)),
        BinaryOp::Mul => ConstValue::from(a.wrapping_mul(b)),
        BinaryOp::Div if b != 0 => ConstValue::from(a / b),
        BinaryOp::Mod if b != 0 => ConstValue::from(a % b),
        BinaryOp::Eq => ConstValue::from(a == b),
        BinaryOp::Ne => ConstValue::from(a != b),
        BinaryOp::Lt => ConstValue::from(a < b),
        BinaryOp::Le => ConstValue::from(a <= b),
        BinaryOp::Gt => ConstValue::from(a > b),
        BinaryOp::Ge => ConstValue::from(a >= b),
        _ => return None,
    })
}

fn fold_arith_u32(op: BinaryOp, a: u32, b: u32) -> Option<ConstValue> {
    Some(match op {
        BinaryOp::Add => ConstValue::from(a.wrapping_add(b)),
        BinaryOp::Sub => ConstValue::from(a.wrapping_sub(b)),
        BinaryOp::Mul => ConstValue::from(a.wrapping_mul(b)),
        BinaryOp::Div if b != 0 => ConstValue::from(a / b),
        BinaryOp::Mod if b != 0 => ConstValue::from(a % b),
        BinaryOp::Eq => ConstValue::from(a == b),
        BinaryOp::Ne => ConstValue::from(a != b),
        BinaryOp::Lt => ConstValue::from(a < b),
        BinaryOp::Le => ConstValue::from(a <= b),
        BinaryOp::Gt => ConstValue::from(a > b),
        BinaryOp::Ge => ConstValue::from(a >= b),
        _ => return None,
    })
}

fn fold_arith_f32(op: BinaryOp, a: f32, b: f32) -> Option<ConstValue> {
    Some(match op {
        BinaryOp::Add => ConstValue::from(a + b),
        BinaryOp::Sub => ConstValue::from(a - b),
        BinaryOp::Mul => ConstValue::from(a * b),
        BinaryOp::Div => ConstValue::from(a / b),
        BinaryOp::Eq => ConstValue::from(a == b),
        BinaryOp::Ne => ConstValue::from(a != b),
        BinaryOp::Lt => ConstValue::from(a < b),
        BinaryOp::Le => ConstValue::from(a <= b),
        BinaryOp::Gt => ConstValue::from(a > b),
        BinaryOp::Ge => ConstValue::from(a >= b),
        _ => return None,
    })
}

fn fold_logical(op: BinaryOp, a: bool, b: bool) -> Option<ConstValue> {
    Some(match op {
        BinaryOp::And => ConstValue::from(a && b),
        BinaryOp::Or => ConstValue::from(a || b),
        BinaryOp::Eq => ConstValue::from(a == b),
        BinaryOp::Ne => ConstValue::from(a != b),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use slc_ast::Span;

    fn int(v: i32) -> Expr {
        Expr::untyped(ExprKind::ConstantValue(ConstValue::I32(v)), Span::synthetic())
    }

    #[test]
    fn folds_integer_addition() {
        let mut folder = ConstFolder { error: None };
        let expr = Expr::untyped(
            ExprKind::Binary { op: BinaryOp::Add, lhs: Box::new(int(2)), rhs: Box::new(int(3)) },
            Span::synthetic(),
        );
        let folded = folder.rewrite(expr);
        assert_eq!(folded.kind, ExprKind::ConstantValue(ConstValue::I32(5)));
    }

    #[test]
    fn prunes_dead_branch() {
        let mut folder = ConstFolder { error: None };
        let cond = Expr::untyped(
            ExprKind::ConstantValue(ConstValue::Bool(false)),
            Span::synthetic(),
        );
        let then_branch = Box::new(Stmt::new(StmtKind::Discard, Span::synthetic()));
        let else_branch = Some(Box::new(Stmt::new(StmtKind::NoOp, Span::synthetic())));
        let stmt = Stmt::new(
            StmtKind::Branch { cond, then_branch, else_branch },
            Span::synthetic(),
        );
        let rewritten = folder.rewrite_stmt(stmt);
        assert_eq!(rewritten.kind, StmtKind::NoOp);
    }
}

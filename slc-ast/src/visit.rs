//! Tree walkers for `Expr`/`Stmt`. Rather than the
//! virtual-dispatch visitor of a class hierarchy, each node kind is a tagged
//! enum variant and a "visitor" is just a type implementing one method per
//! variant; the default implementation of every method is a no-op, so a
//! sanitizer pass overrides only the handful of variants it cares about and
//! relies on `walk_expr`/`walk_stmt` for the rest.
//!
//! Two flavors are provided: read-only `ExprVisitor`/`StmtVisitor` for
//! passes that only inspect the tree (e.g. diagnostics, binding collection),
//! and `ExprRewriter`/`StmtRewriter` for passes that rebuild it (scope
//! resolution replacing bare identifiers, constant folding collapsing
//! arithmetic).
use crate::const_value::ConstValue;
use crate::expr::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::module::{ExternalBlockIndex, FunctionIndex, VarIndex};
use crate::stmt::{Stmt, StmtKind};
use crate::ty::{AliasIndex, IntrinsicId, StructIndex, Type};

#[allow(unused_variables)]
pub trait ExprVisitor {
    fn visit_access_identifier(&mut self, base: Option<&Expr>, member: &str) {}
    fn visit_access_index(&mut self, base: &Expr, index: &Expr) {}
    fn visit_alias_value(&mut self, index: AliasIndex) {}
    fn visit_assign(&mut self, target: &Expr, value: &Expr) {}
    fn visit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) {}
    fn visit_call_function(&mut self, callee: &Expr, args: &[Expr]) {}
    fn visit_cast(&mut self, target_ty: &Type, args: &[Expr]) {}
    fn visit_constant_value(&mut self, value: &ConstValue) {}
    fn visit_function(&mut self, index: FunctionIndex) {}
    fn visit_intrinsic(&mut self, id: IntrinsicId) {}
    fn visit_swizzle(&mut self, base: &Expr, components: &[u8]) {}
    fn visit_variable_value(&mut self, index: VarIndex) {}
    fn visit_unary(&mut self, op: UnaryOp, value: &Expr) {}
}

/// Pre-order traversal: visits `expr` itself, then its children.
pub fn walk_expr<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::AccessIdentifier { base, member } => {
            visitor.visit_access_identifier(base.as_deref(), member);
            if let Some(base) = base {
                walk_expr(visitor, base);
            }
        }
        ExprKind::AccessIndex { base, index } => {
            visitor.visit_access_index(base, index);
            walk_expr(visitor, base);
            walk_expr(visitor, index);
        }
        ExprKind::AliasValue(index) => visitor.visit_alias_value(*index),
        ExprKind::Assign { target, value } => {
            visitor.visit_assign(target, value);
            walk_expr(visitor, target);
            walk_expr(visitor, value);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            visitor.visit_binary(*op, lhs, rhs);
            walk_expr(visitor, lhs);
            walk_expr(visitor, rhs);
        }
        ExprKind::CallFunction { callee, args } => {
            visitor.visit_call_function(callee, args);
            walk_expr(visitor, callee);
            for arg in args {
                walk_expr(visitor, arg);
            }
        }
        ExprKind::Cast { target_ty, args } => {
            visitor.visit_cast(target_ty, args);
            for arg in args {
                walk_expr(visitor, arg);
            }
        }
        ExprKind::ConstantValue(value) => visitor.visit_constant_value(value),
        ExprKind::Function(index) => visitor.visit_function(*index),
        ExprKind::Intrinsic(id) => visitor.visit_intrinsic(*id),
        ExprKind::Swizzle { base, components } => {
            visitor.visit_swizzle(base, components);
            walk_expr(visitor, base);
        }
        ExprKind::VariableValue(index) => visitor.visit_variable_value(*index),
        ExprKind::Unary { op, value } => {
            visitor.visit_unary(*op, value);
            walk_expr(visitor, value);
        }
    }
}

#[allow(unused_variables)]
pub trait StmtVisitor {
    fn visit_branch(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {}
    fn visit_declare_alias(&mut self, name: &str, ty: &Type, index: Option<AliasIndex>) {}
    fn visit_declare_const(&mut self, name: &str, value: &Expr, index: Option<VarIndex>) {}
    fn visit_declare_external(&mut self, index: Option<ExternalBlockIndex>) {}
    fn visit_declare_function(&mut self, name: &str, body: &Stmt, index: Option<FunctionIndex>) {}
    fn visit_declare_option(&mut self, name: &str, default: Option<&Expr>, index: Option<VarIndex>) {}
    fn visit_declare_struct(&mut self, name: &str, index: Option<StructIndex>) {}
    fn visit_declare_variable(
        &mut self,
        name: &str,
        initializer: Option<&Expr>,
        index: Option<VarIndex>,
    ) {
    }
    fn visit_discard(&mut self) {}
    fn visit_expression(&mut self, expr: &Expr) {}
    fn visit_import(&mut self, module_name: &str, alias: &str) {}
    fn visit_multi(&mut self, stmts: &[Stmt]) {}
    fn visit_no_op(&mut self) {}
    fn visit_return(&mut self, value: Option<&Expr>) {}
    fn visit_scoped(&mut self, body: &Stmt) {}
    fn visit_while(&mut self, cond: &Expr, body: &Stmt) {}

    /// Called for every `Expr` embedded in a statement, in addition to the
    /// `visit_*` hook for the enclosing statement kind. The default does
    /// nothing; override it (and call `walk_expr` yourself) to also recurse
    /// into expression subtrees from a `StmtVisitor` pass.
    fn visit_embedded_expr(&mut self, expr: &Expr) {}
}

pub fn walk_stmt<V: StmtVisitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Branch { cond, then_branch, else_branch } => {
            visitor.visit_branch(cond, then_branch, else_branch.as_deref());
            visitor.visit_embedded_expr(cond);
            walk_stmt(visitor, then_branch);
            if let Some(e) = else_branch {
                walk_stmt(visitor, e);
            }
        }
        StmtKind::DeclareAlias { name, ty, index } => {
            visitor.visit_declare_alias(name, ty, *index);
        }
        StmtKind::DeclareConst { name, value, index, .. } => {
            visitor.visit_declare_const(name, value, *index);
            visitor.visit_embedded_expr(value);
        }
        StmtKind::DeclareExternal { index, .. } => {
            visitor.visit_declare_external(*index);
        }
        StmtKind::DeclareFunction { name, body, index, .. } => {
            visitor.visit_declare_function(name, body, *index);
            walk_stmt(visitor, body);
        }
        StmtKind::DeclareOption { name, default, index, .. } => {
            visitor.visit_declare_option(name, default.as_ref(), *index);
            if let Some(d) = default {
                visitor.visit_embedded_expr(d);
            }
        }
        StmtKind::DeclareStruct { name, index, .. } => {
            visitor.visit_declare_struct(name, *index);
        }
        StmtKind::DeclareVariable { name, initializer, index, .. } => {
            visitor.visit_declare_variable(name, initializer.as_ref(), *index);
            if let Some(init) = initializer {
                visitor.visit_embedded_expr(init);
            }
        }
        StmtKind::Discard => visitor.visit_discard(),
        StmtKind::Expression(expr) => {
            visitor.visit_expression(expr);
            visitor.visit_embedded_expr(expr);
        }
        StmtKind::Import { module_name, alias, .. } => {
            visitor.visit_import(module_name, alias);
        }
        StmtKind::Multi(stmts) => {
            visitor.visit_multi(stmts);
            for s in stmts {
                walk_stmt(visitor, s);
            }
        }
        StmtKind::NoOp => visitor.visit_no_op(),
        StmtKind::Return(value) => {
            visitor.visit_return(value.as_ref());
            if let Some(v) = value {
                visitor.visit_embedded_expr(v);
            }
        }
        StmtKind::Scoped(body) => {
            visitor.visit_scoped(body);
            walk_stmt(visitor, body);
        }
        StmtKind::While { cond, body } => {
            visitor.visit_while(cond, body);
            visitor.visit_embedded_expr(cond);
            walk_stmt(visitor, body);
        }
    }
}

/// Owning rewrite pass over `Expr` trees. `rewrite` receives an owned node
/// and returns its (possibly transformed) replacement; call
/// `fold_expr_children` from inside an override to recurse into children
/// before or after transforming the node itself.
pub trait ExprRewriter {
    fn rewrite(&mut self, expr: Expr) -> Expr;
}

pub fn fold_expr_children<R: ExprRewriter + ?Sized>(rewriter: &mut R, expr: Expr) -> Expr {
    let Expr { kind, ty, span } = expr;
    let kind = match kind {
        ExprKind::AccessIdentifier { base, member } => ExprKind::AccessIdentifier {
            base: base.map(|b| Box::new(rewriter.rewrite(*b))),
            member,
        },
        ExprKind::AccessIndex { base, index } => ExprKind::AccessIndex {
            base: Box::new(rewriter.rewrite(*base)),
            index: Box::new(rewriter.rewrite(*index)),
        },
        ExprKind::Assign { target, value } => ExprKind::Assign {
            target: Box::new(rewriter.rewrite(*target)),
            value: Box::new(rewriter.rewrite(*value)),
        },
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op,
            lhs: Box::new(rewriter.rewrite(*lhs)),
            rhs: Box::new(rewriter.rewrite(*rhs)),
        },
        ExprKind::CallFunction { callee, args } => ExprKind::CallFunction {
            callee: Box::new(rewriter.rewrite(*callee)),
            args: args.into_iter().map(|a| rewriter.rewrite(a)).collect(),
        },
        ExprKind::Cast { target_ty, args } => ExprKind::Cast {
            target_ty,
            args: args.into_iter().map(|a| rewriter.rewrite(a)).collect(),
        },
        ExprKind::Swizzle { base, components } => ExprKind::Swizzle {
            base: Box::new(rewriter.rewrite(*base)),
            components,
        },
        ExprKind::Unary { op, value } => ExprKind::Unary {
            op,
            value: Box::new(rewriter.rewrite(*value)),
        },
        leaf @ (ExprKind::AliasValue(_)
        | ExprKind::ConstantValue(_)
        | ExprKind::Function(_)
        | ExprKind::Intrinsic(_)
        | ExprKind::VariableValue(_)) => leaf,
    };
    Expr { kind, ty, span }
}

pub trait StmtRewriter: ExprRewriter {
    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt;
}

pub fn fold_stmt_children<R: StmtRewriter + ?Sized>(rewriter: &mut R, stmt: Stmt) -> Stmt {
    let Stmt { kind, span } = stmt;
    let kind = match kind {
        StmtKind::Branch { cond, then_branch, else_branch } => StmtKind::Branch {
            cond: rewriter.rewrite(cond),
            then_branch: Box::new(rewriter.rewrite_stmt(*then_branch)),
            else_branch: else_branch.map(|e| Box::new(rewriter.rewrite_stmt(*e))),
        },
        StmtKind::DeclareConst { name, ty, value, index } => StmtKind::DeclareConst {
            name,
            ty,
            value: rewriter.rewrite(value),
            index,
        },
        StmtKind::DeclareFunction { name, params, ret_ty, body, entry_point, index } => {
            StmtKind::DeclareFunction {
                name,
                params,
                ret_ty,
                body: Box::new(rewriter.rewrite_stmt(*body)),
                entry_point,
                index,
            }
        }
        StmtKind::DeclareOption { name, ty, default, index } => StmtKind::DeclareOption {
            name,
            ty,
            default: default.map(|d| rewriter.rewrite(d)),
            index,
        },
        StmtKind::DeclareVariable { name, ty, initializer, index } => StmtKind::DeclareVariable {
            name,
            ty,
            initializer: initializer.map(|i| rewriter.rewrite(i)),
            index,
        },
        StmtKind::Expression(expr) => StmtKind::Expression(rewriter.rewrite(expr)),
        StmtKind::Multi(stmts) => {
            StmtKind::Multi(stmts.into_iter().map(|s| rewriter.rewrite_stmt(s)).collect())
        }
        StmtKind::Return(value) => StmtKind::Return(value.map(|v| rewriter.rewrite(v))),
        StmtKind::Scoped(body) => StmtKind::Scoped(Box::new(rewriter.rewrite_stmt(*body))),
        StmtKind::While { cond, body } => StmtKind::While {
            cond: rewriter.rewrite(cond),
            body: Box::new(rewriter.rewrite_stmt(*body)),
        },
        leaf @ (StmtKind::DeclareAlias { .. }
        | StmtKind::DeclareExternal { .. }
        | StmtKind::DeclareStruct { .. }
        | StmtKind::Discard
        | StmtKind::Import { .. }
        | StmtKind::NoOp) => leaf,
    };
    Stmt { kind, span }
}

//! Expression nodes.
use crate::const_value::ConstValue;
use crate::module::{FunctionIndex, VarIndex};
use crate::span::Span;
use crate::ty::{AliasIndex, IntrinsicId, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// One expression node. `ty` is `None` until type inference assigns it;
/// every expression in a sanitized module has `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
    pub span: Span,
}
impl Expr {
    pub fn untyped(kind: ExprKind, span: Span) -> Self {
        Expr { kind, ty: None, span }
    }
    pub fn typed(kind: ExprKind, ty: Type, span: Span) -> Self {
        Expr { kind, ty: Some(ty), span }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprKind {
    /// `base.member`, or a bare identifier when `base` is `None`. Scope
    /// resolution resolves bare-identifier roots into
    /// `VariableValue`/`AliasValue`/`Function`/`Intrinsic`; chained member
    /// accesses on struct-typed bases remain `AccessIdentifier` by name so
    /// later back ends pick the lowering (named GLSL field vs. a
    /// by-index `OpAccessChain` operand) that suits them.
    AccessIdentifier {
        base: Option<Box<Expr>>,
        member: String,
    },
    /// `base[index]`: array/vector subscript by a computed (non-swizzle)
    /// index expression.
    AccessIndex {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    AliasValue(AliasIndex),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    CallFunction {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Primitive conversion or constructor-style composite construction
    /// (`vec3(a, b, c)`).
    Cast {
        target_ty: Type,
        args: Vec<Expr>,
    },
    ConstantValue(ConstValue),
    Function(FunctionIndex),
    Intrinsic(IntrinsicId),
    /// `base.xyzw`-style component selection; each entry is 0..=3.
    Swizzle {
        base: Box<Expr>,
        components: Vec<u8>,
    },
    VariableValue(VarIndex),
    Unary {
        op: UnaryOp,
        value: Box<Expr>,
    },
}

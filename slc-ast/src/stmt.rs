//! Statement nodes.
use crate::expr::Expr;
use crate::module::{
    AutoBinding, EntryPointMetadata, ExternalBinding, ExternalBlockIndex, FunctionIndex,
    FunctionParam, Layout, StructMember, VarIndex,
};
use crate::span::Span;
use crate::ty::{AliasIndex, StructIndex, Type};

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}
impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// Every declaration variant below carries its raw (pre-sanitization) fields
/// plus a resolved index slot that scope resolution fills in.
/// Keeping both on one node, rather than rewriting declarations into a
/// separate resolved AST, is what lets `slc-sanitize` implement its passes
/// as in-place tree rewrites (see `Rewriter` in `visit.rs`).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum StmtKind {
    Branch {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    DeclareAlias {
        name: String,
        ty: Type,
        index: Option<AliasIndex>,
    },
    DeclareConst {
        name: String,
        ty: Option<Type>,
        value: Expr,
        index: Option<VarIndex>,
    },
    DeclareExternal {
        set: Option<u32>,
        auto_binding: AutoBinding,
        tag: Option<String>,
        bindings: Vec<ExternalBinding>,
        index: Option<ExternalBlockIndex>,
    },
    DeclareFunction {
        name: String,
        params: Vec<FunctionParam>,
        ret_ty: Type,
        body: Box<Stmt>,
        entry_point: Option<EntryPointMetadata>,
        index: Option<FunctionIndex>,
    },
    /// A compile-time-specializable constant (`option` in source), folded to
    /// its default or an externally supplied value by constant folding.
    DeclareOption {
        name: String,
        ty: Type,
        default: Option<Expr>,
        index: Option<VarIndex>,
    },
    DeclareStruct {
        name: String,
        members: Vec<StructMember>,
        layout: Layout,
        index: Option<StructIndex>,
    },
    DeclareVariable {
        name: String,
        ty: Option<Type>,
        initializer: Option<Expr>,
        index: Option<VarIndex>,
    },
    Discard,
    Expression(Expr),
    Import {
        module_name: String,
        alias: String,
        resolved: bool,
    },
    Multi(Vec<Stmt>),
    NoOp,
    Return(Option<Expr>),
    /// Introduces a child lexical scope for scope resolution; otherwise
    /// transparent.
    Scoped(Box<Stmt>),
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
}

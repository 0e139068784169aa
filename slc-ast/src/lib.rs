//! Typed AST for the SL shading language: the [`Module`] tree shared by the
//! sanitizer and every back end, plus the visitor/rewriter scaffolding used
//! to walk and transform it.
pub mod const_value;
pub mod expr;
pub mod layout;
pub mod module;
pub mod span;
pub mod stmt;
pub mod ty;
pub mod visit;

pub use const_value::ConstValue;
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use module::{
    binding_key, AliasDecl, AliasTable, AutoBinding, BuiltinVar, DrawParamKind, EntryPointMetadata,
    ExternalBinding, ExternalBlock, ExternalBlockIndex, ExternalTable, Feature, FunctionDecl,
    FunctionIndex, FunctionParam, FunctionTable, ImportedModule, Layout, Module, ShaderStage,
    StructDecl, StructMember, StructTable, VarIndex, VariableKind, VariableSlot, VariableTable,
};
pub use span::Span;
pub use stmt::{Stmt, StmtKind};
pub use ty::{
    AccessMode, AliasIndex, ArrayLen, FunctionSignature, IntrinsicId, MethodId, PrimitiveType,
    SamplerDim, StructIndex, Type,
};
pub use visit::{
    fold_expr_children, fold_stmt_children, walk_expr, walk_stmt, ExprRewriter, ExprVisitor,
    StmtRewriter, StmtVisitor,
};

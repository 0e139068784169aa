//! Import resolution and scope/identifier resolution.
//!
//! These run as one traversal because splicing an import's declarations
//! into scope has to happen before the rest of the module can see them, and
//! functions are allowed to call each other regardless of declaration
//! order, so top-level declarations are collected in a first pass before
//! the body is rewritten in a second.
use slc_ast::module::{AliasDecl, ExternalBlock, FunctionDecl, StructDecl, VariableKind, VariableSlot};
use slc_ast::visit::{fold_expr_children, fold_stmt_children, ExprRewriter, StmtRewriter};
use slc_ast::{
    AliasTable, Expr, ExprKind, ExternalTable, FunctionTable, IntrinsicId, Module, Span, Stmt,
    StmtKind, StructTable, Type, VariableTable,
};

use crate::error::{SanitizeError, SanitizeResult};
use crate::resolver::ModuleResolver;
use crate::scope::{ScopeStack, Symbol};

pub fn run(module: &mut Module, resolver: &dyn ModuleResolver) -> SanitizeResult<()> {
    let body = std::mem::replace(&mut module.body, Stmt::new(StmtKind::NoOp, Span::synthetic()));
    let mut scope = ScopeStack::new();
    for (name, id) in [
        ("base_instance", IntrinsicId::BaseInstance),
        ("base_vertex", IntrinsicId::BaseVertex),
        ("draw_index", IntrinsicId::DrawIndex),
    ] {
        scope.declare(name, Symbol::Intrinsic(id));
    }

    collect_top_level(
        &body,
        &mut scope,
        &mut module.structs,
        &mut module.aliases,
        &mut module.functions,
        &mut module.externals,
        &mut module.variables,
    )?;

    let mut pass = ScopeResolver {
        resolver,
        scope,
        structs: &mut module.structs,
        aliases: &mut module.aliases,
        functions: &mut module.functions,
        variables: &mut module.variables,
        imports: &mut module.imports,
        next_external: 0,
        error: None,
    };
    let body = pass.rewrite_stmt(body);
    if let Some(err) = pass.error.take() {
        return Err(err);
    }
    module.body = body;
    Ok(())
}

/// First pass: walks top-level declarations only (never descending into a
/// function body) so forward references between sibling declarations
/// resolve regardless of source order.
fn collect_top_level(
    stmt: &Stmt,
    scope: &mut ScopeStack,
    structs: &mut StructTable,
    aliases: &mut AliasTable,
    functions: &mut FunctionTable,
    externals: &mut ExternalTable,
    variables: &mut VariableTable,
) -> SanitizeResult<()> {
    match &stmt.kind {
        StmtKind::Multi(stmts) => {
            for s in stmts {
                collect_top_level(s, scope, structs, aliases, functions, externals, variables)?;
            }
            Ok(())
        }
        StmtKind::Scoped(inner) => {
            collect_top_level(inner, scope, structs, aliases, functions, externals, variables)
        }
        StmtKind::DeclareStruct { name, members, layout, .. } => {
            let index = structs.push(StructDecl {
                name: name.clone(),
                members: members.clone(),
                layout: *layout,
                size: None,
            });
            declare_unique(scope, name, Symbol::Struct(index), stmt.span)
        }
        StmtKind::DeclareAlias { name, ty, .. } => {
            let index = aliases.push(AliasDecl { name: name.clone(), ty: ty.clone() });
            declare_unique(scope, name, Symbol::Alias(index), stmt.span)
        }
        StmtKind::DeclareFunction { name, params, ret_ty, entry_point, .. } => {
            let index = functions.push(FunctionDecl {
                name: name.clone(),
                params: params.clone(),
                ret_ty: ret_ty.clone(),
                body: Stmt::new(StmtKind::NoOp, Span::synthetic()),
                entry_point: entry_point.clone(),
                param_vars: Vec::new(),
                output_var: None,
            });
            declare_unique(scope, name, Symbol::Function(index), stmt.span)
        }
        // Externals materialize here too: every binding becomes a module
        // variable up front so function bodies can reference it regardless
        // of declaration order. The `(set, binding)` pair stays unresolved
        // until the binding-assignment pass.
        StmtKind::DeclareExternal { set, auto_binding, tag, bindings, .. } => {
            let block_index = externals.push(ExternalBlock {
                set: *set,
                auto_binding: *auto_binding,
                tag: tag.clone(),
                bindings: bindings.clone(),
            });
            for (binding_index, binding) in bindings.iter().enumerate() {
                let var_index = variables.push(VariableSlot {
                    name: binding.name.clone(),
                    ty: binding.ty.clone(),
                    kind: VariableKind::External { block: block_index, binding_index },
                });
                externals.get_mut(block_index).bindings[binding_index].var_index = Some(var_index);
                declare_unique(scope, &binding.name, Symbol::Variable(var_index), stmt.span)?;
            }
            Ok(())
        }
        // Variables, consts, options, imports and everything else are
        // handled by the second (rewriting) pass.
        _ => Ok(()),
    }
}

fn declare_unique(
    scope: &mut ScopeStack,
    name: &str,
    symbol: Symbol,
    span: Span,
) -> SanitizeResult<()> {
    if scope.declare(name, symbol) {
        Ok(())
    } else {
        Err(SanitizeError::DuplicateDeclaration { name: name.to_owned(), span })
    }
}

struct ScopeResolver<'a> {
    resolver: &'a dyn ModuleResolver,
    scope: ScopeStack,
    structs: &'a mut StructTable,
    aliases: &'a mut AliasTable,
    functions: &'a mut FunctionTable,
    variables: &'a mut VariableTable,
    imports: &'a mut Vec<slc_ast::ImportedModule>,
    next_external: u32,
    error: Option<SanitizeError>,
}
impl ScopeResolver<'_> {
    fn fail(&mut self, err: SanitizeError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn declare_variable(&mut self, name: &str, ty: Type, kind: VariableKind, span: Span) -> u32 {
        let index = self.variables.push(VariableSlot { name: name.to_owned(), ty, kind });
        if !self.scope.declare(name, Symbol::Variable(index)) {
            self.fail(SanitizeError::DuplicateDeclaration { name: name.to_owned(), span });
        }
        index
    }

    /// Merges an imported module's struct/alias/function tables into ours,
    /// registering each under `alias.name` in scope.
    fn splice_import(&mut self, alias: &str, imported: &Module) {
        let struct_base = self.structs.structs.len() as u32;
        for decl in &imported.structs.structs {
            self.structs.push(decl.clone());
        }
        for (local_i, decl) in imported.structs.structs.iter().enumerate() {
            let qualified = format!("{alias}.{}", decl.name);
            self.scope.declare(&qualified, Symbol::Struct(struct_base + local_i as u32));
        }

        let alias_base = self.aliases.aliases.len() as u32;
        for decl in &imported.aliases.aliases {
            self.aliases.push(decl.clone());
        }
        for (local_i, decl) in imported.aliases.aliases.iter().enumerate() {
            let qualified = format!("{alias}.{}", decl.name);
            self.scope.declare(&qualified, Symbol::Alias(alias_base + local_i as u32));
        }

        let fn_base = self.functions.functions.len() as u32;
        for decl in &imported.functions.functions {
            self.functions.push(decl.clone());
        }
        for (local_i, decl) in imported.functions.functions.iter().enumerate() {
            let qualified = format!("{alias}.{}", decl.name);
            self.scope.declare(&qualified, Symbol::Function(fn_base + local_i as u32));
        }
    }
}
impl ExprRewriter for ScopeResolver<'_> {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        let span = expr.span;
        match expr.kind {
            ExprKind::AccessIdentifier { base: None, member } => match self.scope.resolve(&member)
            {
                Some(Symbol::Variable(i)) => Expr::untyped(ExprKind::VariableValue(i), span),
                Some(Symbol::Alias(i)) => Expr::untyped(ExprKind::AliasValue(i), span),
                Some(Symbol::Function(i)) => Expr::untyped(ExprKind::Function(i), span),
                Some(Symbol::Intrinsic(id)) => Expr::untyped(ExprKind::Intrinsic(id), span),
                Some(Symbol::Struct(_)) | None => {
                    self.fail(SanitizeError::UnknownIdentifier { name: member.clone(), span });
                    Expr::untyped(ExprKind::AccessIdentifier { base: None, member }, span)
                }
            },
            other => fold_expr_children(self, Expr { kind: other, ty: expr.ty, span: expr.span }),
        }
    }
}
impl StmtRewriter for ScopeResolver<'_> {
    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        let span = stmt.span;
        match stmt.kind {
            StmtKind::Scoped(body) => {
                self.scope.push();
                let body = self.rewrite_stmt(*body);
                self.scope.pop();
                Stmt::new(StmtKind::Scoped(Box::new(body)), span)
            }
            StmtKind::DeclareVariable { name, ty, initializer, .. } => {
                let initializer = initializer.map(|i| self.rewrite(i));
                let resolved_ty = ty.clone().unwrap_or(Type::NoType);
                let index =
                    self.declare_variable(&name, resolved_ty, VariableKind::Local, span);
                Stmt::new(
                    StmtKind::DeclareVariable { name, ty, initializer, index: Some(index) },
                    span,
                )
            }
            StmtKind::DeclareConst { name, ty, value, .. } => {
                let value = self.rewrite(value);
                let resolved_ty = ty.clone().unwrap_or(Type::NoType);
                let index =
                    self.declare_variable(&name, resolved_ty, VariableKind::Local, span);
                Stmt::new(StmtKind::DeclareConst { name, ty, value, index: Some(index) }, span)
            }
            StmtKind::DeclareOption { name, ty, default, .. } => {
                let default = default.map(|d| self.rewrite(d));
                let index =
                    self.declare_variable(&name, ty.clone(), VariableKind::Local, span);
                Stmt::new(
                    StmtKind::DeclareOption { name, ty, default, index: Some(index) },
                    span,
                )
            }
            StmtKind::DeclareStruct { name, members, layout, .. } => {
                let index = self.structs.find_by_name(&name);
                Stmt::new(StmtKind::DeclareStruct { name, members, layout, index }, span)
            }
            StmtKind::DeclareAlias { name, ty, .. } => {
                let index = self.aliases.find_by_name(&name);
                Stmt::new(StmtKind::DeclareAlias { name, ty, index }, span)
            }
            StmtKind::DeclareFunction { name, params, ret_ty, body, entry_point, .. } => {
                let index = self.functions.find_by_name(&name);
                self.scope.push();
                let param_vars: Vec<u32> = params
                    .iter()
                    .map(|param| {
                        self.declare_variable(&param.name, param.ty.clone(), VariableKind::Parameter, span)
                    })
                    .collect();
                let body = self.rewrite_stmt(*body);
                self.scope.pop();
                if let Some(idx) = index {
                    let decl = self.functions.get_mut(idx);
                    decl.body = body.clone();
                    decl.param_vars = param_vars;
                }
                Stmt::new(
                    StmtKind::DeclareFunction {
                        name,
                        params,
                        ret_ty,
                        body: Box::new(body),
                        entry_point,
                        index,
                    },
                    span,
                )
            }
            StmtKind::DeclareExternal { set, auto_binding, tag, bindings, .. } => {
                // Blocks were materialized in declaration order by
                // `collect_top_level`, so the running counter recovers each
                // statement's table index.
                let index = self.next_external;
                self.next_external += 1;
                Stmt::new(
                    StmtKind::DeclareExternal { set, auto_binding, tag, bindings, index: Some(index) },
                    span,
                )
            }
            StmtKind::Import { module_name, alias, .. } => {
                match self.resolver.resolve(&module_name) {
                    Ok(imported) => {
                        self.splice_import(&alias, &imported);
                        self.imports.push(slc_ast::ImportedModule {
                            module_name: module_name.clone(),
                            alias: alias.clone(),
                        });
                        Stmt::new(StmtKind::Import { module_name, alias, resolved: true }, span)
                    }
                    Err(source) => {
                        self.fail(SanitizeError::ModuleResolution { module_name: module_name.clone(), span, source });
                        Stmt::new(StmtKind::Import { module_name, alias, resolved: false }, span)
                    }
                }
            }
            other => fold_stmt_children(self, Stmt { kind: other, span }),
        }
    }
}

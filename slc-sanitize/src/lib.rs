//! Semantic analysis and legalization: turns a raw [`slc_ast::Module`] tree
//! into a [`SanitizedModule`] every back end can assume is fully resolved —
//! every identifier bound, every expression typed, every binding and struct
//! layout settled.
mod binding;
mod const_fold;
mod entry_point;
mod error;
mod features;
mod layout;
mod methods;
mod options;
mod resolver;
mod scope;
mod scope_resolve;
mod type_check;

pub use error::{SanitizeError, SanitizeResult};
pub use options::SanitizeOptions;
pub use resolver::{MapModuleResolver, ModuleResolver, ParsedModule, ResolverError};

use slc_ast::Module;
use std::ops::Deref;

/// A module that has been through every sanitizer sub-pass: scope
/// resolution, type checking, constant folding, entry-point legalization,
/// binding assignment, struct layout, and runtime-array lowering. Back ends
/// take this type rather than a plain [`Module`] so they never have to
/// re-check preconditions the sanitizer already guarantees.
#[derive(Debug)]
pub struct SanitizedModule(Module);
impl SanitizedModule {
    pub fn into_inner(self) -> Module {
        self.0
    }
}
impl Deref for SanitizedModule {
    type Target = Module;
    fn deref(&self) -> &Module {
        &self.0
    }
}

/// Runs every sub-pass in order and wraps the result. Each sub-pass mutates
/// `module` in place and bails out on the first error it finds; everything
/// downstream of scope resolution assumes every identifier has already been
/// resolved, so a scope-resolution failure must stop the pipeline rather
/// than let a later pass dereference a dangling name.
pub fn sanitize(
    mut module: Module,
    options: &SanitizeOptions,
    resolver: &dyn ModuleResolver,
) -> SanitizeResult<SanitizedModule> {
    log::debug!("sanitizing module `{}`", module.name);
    scope_resolve::run(&mut module, resolver)?;
    features::run(&module)?;
    type_check::run(&mut module)?;
    const_fold::run(&mut module)?;
    methods::run(&mut module)?;
    // The tree-rewriting passes above operate on the statement tree; the
    // function table's body copies (what entry-point legalization and the
    // back ends consume) are refreshed from it before diverging.
    sync_function_bodies(&mut module);
    entry_point::run(&mut module, options)?;
    binding::run(&mut module, options)?;
    layout::run(&mut module)?;
    log::debug!(
        "sanitized `{}`: {} function(s), {} external block(s), {} variable slot(s)",
        module.name,
        module.functions.functions.len(),
        module.externals.blocks.len(),
        module.variables.variables.len()
    );
    Ok(SanitizedModule(module))
}

fn sync_function_bodies(module: &mut Module) {
    fn walk(stmt: &slc_ast::Stmt, functions: &mut slc_ast::FunctionTable) {
        match &stmt.kind {
            slc_ast::StmtKind::Multi(stmts) => {
                for s in stmts {
                    walk(s, functions);
                }
            }
            slc_ast::StmtKind::Scoped(inner) => walk(inner, functions),
            slc_ast::StmtKind::DeclareFunction { body, index: Some(index), .. } => {
                functions.get_mut(*index).body = (**body).clone();
            }
            _ => {}
        }
    }
    let body = std::mem::replace(
        &mut module.body,
        slc_ast::Stmt::new(slc_ast::StmtKind::NoOp, slc_ast::Span::synthetic()),
    );
    walk(&body, &mut module.functions);
    module.body = body;
}

//! Feature-flag gating: constructs guarded by a module-level feature
//! declaration are rejected unless that feature was enabled.
use slc_ast::{Feature, Module, Span, Type};

use crate::error::{SanitizeError, SanitizeResult};

pub fn run(module: &Module) -> SanitizeResult<()> {
    for block in &module.externals.blocks {
        for binding in &block.bindings {
            // A bare primitive (or vector/matrix) external is only legal
            // under `primitive_externals`; whether a *back end* can express
            // it is checked again at emission time.
            let primitive = matches!(
                binding.ty,
                Type::Primitive(_) | Type::Vector { .. } | Type::Matrix { .. }
            );
            if primitive && !module.has_feature(Feature::PrimitiveExternals) {
                return Err(SanitizeError::FeatureDisabled {
                    feature: "primitive_externals".to_owned(),
                    span: Span::synthetic(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slc_ast::module::{AutoBinding, ExternalBinding, ExternalBlock};
    use slc_ast::{PrimitiveType, Stmt, StmtKind};

    fn module_with_bool_external() -> Module {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.externals.push(ExternalBlock {
            set: None,
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![ExternalBinding {
                name: "bVal".into(),
                ty: Type::Primitive(PrimitiveType::Bool),
                binding: None,
                tag: None,
                var_index: None,
            }],
        });
        module
    }

    #[test]
    fn primitive_external_requires_feature() {
        let module = module_with_bool_external();
        assert!(matches!(run(&module), Err(SanitizeError::FeatureDisabled { .. })));
    }

    #[test]
    fn declared_feature_unlocks_primitive_externals() {
        let mut module = module_with_bool_external();
        module.features.insert(Feature::PrimitiveExternals);
        assert!(run(&module).is_ok());
    }
}

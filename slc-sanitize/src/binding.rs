//! Binding assignment for external blocks.
use fnv::FnvHashSet;
use slc_ast::module::ExternalBlockIndex;
use slc_ast::{Module, Type};

use crate::error::{SanitizeError, SanitizeResult};
use crate::options::SanitizeOptions;

pub fn run(module: &mut Module, options: &SanitizeOptions) -> SanitizeResult<()> {
    let block_count = module.externals.blocks.len();

    // Conflicts among *explicit* bindings are checked globally, before any
    // auto-assignment, since auto-assignment must see the true used set.
    let mut used: FnvHashSet<(u32, u32)> = FnvHashSet::default();
    for block_index in 0..block_count {
        let block = module.externals.get(block_index as ExternalBlockIndex);
        let set = block.set.unwrap_or(0);
        for binding in &block.bindings {
            if let Some(b) = binding.binding {
                if !used.insert((set, b)) {
                    return Err(SanitizeError::BindingConflict {
                        set,
                        binding: b,
                        span: slc_ast::Span::synthetic(),
                    });
                }
            }
        }
    }

    for block_index in 0..block_count {
        assign_block(module, block_index as ExternalBlockIndex, &used, options)?;
    }
    Ok(())
}

fn assign_block(
    module: &mut Module,
    block_index: ExternalBlockIndex,
    globally_used: &FnvHashSet<(u32, u32)>,
    options: &SanitizeOptions,
) -> SanitizeResult<()> {
    let set = module.externals.get(block_index).set.unwrap_or(0);
    let any_unbound = module
        .externals
        .get(block_index)
        .bindings
        .iter()
        .any(|b| b.binding.is_none() && !matches!(b.ty, Type::PushConstant(_)));
    let auto_binding = module.externals.get(block_index).auto_binding.resolved(any_unbound);

    if !auto_binding {
        if options.partial && !options.force_auto_binding_resolve {
            module.externals.get_mut(block_index).set.get_or_insert(0);
            return Ok(());
        }
        let unresolved = module
            .externals
            .get(block_index)
            .bindings
            .iter()
            .find(|b| b.binding.is_none() && !matches!(b.ty, Type::PushConstant(_)))
            .map(|b| b.name.clone());
        if let Some(name) = unresolved {
            return Err(SanitizeError::UnresolvedBinding { name, span: slc_ast::Span::synthetic() });
        }
        module.externals.get_mut(block_index).set.get_or_insert(0);
        return Ok(());
    }

    let mut used_in_set: FnvHashSet<u32> =
        globally_used.iter().filter(|(s, _)| *s == set).map(|(_, b)| *b).collect();
    let mut next_free = 0u32;
    let mut take_next = |used: &mut FnvHashSet<u32>| -> u32 {
        while used.contains(&next_free) {
            next_free += 1;
        }
        used.insert(next_free);
        next_free
    };

    let block = module.externals.get_mut(block_index);
    block.set.get_or_insert(set);
    for binding in &mut block.bindings {
        // `push_constant` members never receive a (set, binding) pair.
        if binding.binding.is_none() && !matches!(binding.ty, Type::PushConstant(_)) {
            binding.binding = Some(take_next(&mut used_in_set));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slc_ast::module::{AutoBinding, ExternalBinding, ExternalBlock, StructDecl};
    use slc_ast::{PrimitiveType, SamplerDim, Span, Stmt, StmtKind};

    fn sampler_binding(name: &str, binding: Option<u32>) -> ExternalBinding {
        ExternalBinding {
            name: name.to_owned(),
            ty: Type::Sampler { dim: SamplerDim::D2, sampled: PrimitiveType::F32 },
            binding,
            tag: None,
            var_index: None,
        }
    }

    /// The mixed explicit/implicit layout from the auto-binding resolution
    /// scenario: `{tex1, tex2, foo(push_constant), [binding(4)] tex3,
    /// [binding(0)] tex4}` must resolve to `tex1 -> 1, tex2 -> 2,
    /// tex3 -> 4, tex4 -> 0`, with the push constant left unbound.
    #[test]
    fn auto_binding_skips_explicitly_used_indices() {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        let pc_struct = module.structs.push(StructDecl {
            name: "Foo".into(),
            members: Vec::new(),
            layout: slc_ast::Layout::Default,
            size: None,
        });
        module.externals.push(ExternalBlock {
            set: None,
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![
                sampler_binding("tex1", None),
                sampler_binding("tex2", None),
                ExternalBinding {
                    name: "foo".into(),
                    ty: Type::PushConstant(pc_struct),
                    binding: None,
                    tag: None,
                    var_index: None,
                },
                sampler_binding("tex3", Some(4)),
                sampler_binding("tex4", Some(0)),
            ],
        });

        run(&mut module, &SanitizeOptions::default()).unwrap();

        let bindings = &module.externals.get(0).bindings;
        assert_eq!(bindings[0].binding, Some(1));
        assert_eq!(bindings[1].binding, Some(2));
        assert_eq!(bindings[2].binding, None);
        assert_eq!(bindings[3].binding, Some(4));
        assert_eq!(bindings[4].binding, Some(0));
    }

    #[test]
    fn duplicate_explicit_bindings_conflict() {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.externals.push(ExternalBlock {
            set: None,
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![sampler_binding("a", Some(2)), sampler_binding("b", Some(2))],
        });
        assert!(matches!(
            run(&mut module, &SanitizeOptions::default()),
            Err(SanitizeError::BindingConflict { set: 0, binding: 2, .. })
        ));
    }

    #[test]
    fn partial_sanitization_leaves_bindings_unresolved() {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.externals.push(ExternalBlock {
            set: None,
            auto_binding: AutoBinding::Explicit(false),
            tag: None,
            bindings: vec![sampler_binding("tex", None)],
        });
        let options = SanitizeOptions { partial: true, ..Default::default() };
        run(&mut module, &options).unwrap();
        let block = module.externals.get(0);
        assert_eq!(block.set, Some(0));
        assert_eq!(block.bindings[0].binding, None);
    }
}

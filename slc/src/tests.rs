use num_traits::FromPrimitive;
use pretty_assertions::assert_eq;
use spirv::Op;

use slc_ast::module::{
    AutoBinding, EntryPointMetadata, ExternalBinding, Layout, ShaderStage, StructMember,
};
use slc_ast::{
    ArrayLen, ConstValue, Expr, ExprKind, Feature, Module, PrimitiveType, SamplerDim, Span, Stmt,
    StmtKind, StmtVisitor, Type,
};

use super::*;

fn span() -> Span {
    Span::synthetic()
}

fn ident(name: &str) -> Expr {
    Expr::untyped(ExprKind::AccessIdentifier { base: None, member: name.to_owned() }, span())
}

fn member(base: Expr, name: &str) -> Expr {
    Expr::untyped(
        ExprKind::AccessIdentifier { base: Some(Box::new(base)), member: name.to_owned() },
        span(),
    )
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::untyped(ExprKind::CallFunction { callee: Box::new(callee), args }, span())
}

fn cast(target_ty: Type, args: Vec<Expr>) -> Expr {
    Expr::untyped(ExprKind::Cast { target_ty, args }, span())
}

fn fconst(value: f32) -> Expr {
    Expr::untyped(ExprKind::ConstantValue(ConstValue::from(value)), span())
}

fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::new(
        StmtKind::Expression(Expr::untyped(
            ExprKind::Assign { target: Box::new(target), value: Box::new(value) },
            span(),
        )),
        span(),
    )
}

fn declare_var(name: &str, ty: Type) -> Stmt {
    Stmt::new(
        StmtKind::DeclareVariable { name: name.to_owned(), ty: Some(ty), initializer: None, index: None },
        span(),
    )
}

fn declare_struct(name: &str, members: Vec<(&str, Type)>, layout: Layout) -> Stmt {
    Stmt::new(
        StmtKind::DeclareStruct {
            name: name.to_owned(),
            members: members
                .into_iter()
                .map(|(name, ty)| StructMember { name: name.to_owned(), ty, offset: None, tag: None })
                .collect(),
            layout,
            index: None,
        },
        span(),
    )
}

fn declare_external(bindings: Vec<(&str, Type, Option<u32>)>) -> Stmt {
    Stmt::new(
        StmtKind::DeclareExternal {
            set: None,
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: bindings
                .into_iter()
                .map(|(name, ty, binding)| ExternalBinding {
                    name: name.to_owned(),
                    ty,
                    binding,
                    tag: None,
                    var_index: None,
                })
                .collect(),
            index: None,
        },
        span(),
    )
}

fn entry_point(name: &str, stage: ShaderStage, ret_ty: Type, body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::DeclareFunction {
            name: name.to_owned(),
            params: Vec::new(),
            ret_ty,
            body: Box::new(Stmt::new(StmtKind::Multi(body), span())),
            entry_point: Some(EntryPointMetadata { stage: Some(stage), workgroup_size: None }),
            index: None,
        },
        span(),
    )
}

fn module(name: &str, stmts: Vec<Stmt>) -> Module {
    Module::new(name, Stmt::new(StmtKind::Multi(stmts), span()))
}

fn sampler2d() -> Type {
    Type::Sampler { dim: SamplerDim::D2, sampled: PrimitiveType::F32 }
}

/// Decodes an emitted word stream back into `(opcode, operands)` pairs.
fn instructions(words: &[u32]) -> Vec<(Op, Vec<u32>)> {
    let mut out = Vec::new();
    let mut i = 5;
    while i < words.len() {
        let word = words[i];
        let count = ((word >> 16) as usize).max(1);
        let op = Op::from_u32(word & 0xFFFF).expect("emitted an unknown opcode");
        out.push((op, words[i + 1..i + count].to_vec()));
        i += count;
    }
    out
}

fn count_op(emitted: &[(Op, Vec<u32>)], op: Op) -> usize {
    emitted.iter().filter(|(o, _)| *o == op).count()
}

/// One external `[binding(0)] tex: sampler2D[f32]` plus a fragment entry
/// that samples it at `(0.0, 0.0)`.
fn texture_sample_module() -> Module {
    module(
        "sample2d",
        vec![
            declare_external(vec![("tex", sampler2d(), Some(0))]),
            entry_point(
                "main_frag",
                ShaderStage::Fragment,
                Type::vec4(PrimitiveType::F32),
                vec![Stmt::new(
                    StmtKind::Return(Some(call(
                        member(ident("tex"), "Sample"),
                        vec![cast(Type::vec2(PrimitiveType::F32), vec![fconst(0.0), fconst(0.0)])],
                    ))),
                    span(),
                )],
            ),
        ],
    )
}

#[test]
fn texture_sample_glsl() {
    let sanitized = Compiler::new().sanitize(texture_sample_module()).unwrap();
    let output = Compiler::new().emit_glsl(&sanitized, &GlslEnvironment::default()).unwrap();
    assert!(output.code.contains("uniform sampler2D tex;"), "got:\n{}", output.code);
    assert!(output.code.contains("texture(tex, vec2(0.0, 0.0))"), "got:\n{}", output.code);
}

#[test]
fn texture_sample_spirv() {
    let sanitized = Compiler::new().sanitize(texture_sample_module()).unwrap();
    let words = Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()).unwrap();
    let emitted = instructions(&words);

    // OpTypeImage %f32 Dim2D 0 0 0 1 Unknown
    assert!(emitted.iter().any(|(op, operands)| {
        *op == Op::TypeImage && operands[2..] == [spirv::Dim::Dim2D as u32, 0, 0, 0, 1, 0]
    }));
    assert_eq!(count_op(&emitted, Op::TypeSampledImage), 1);
    assert!(emitted.iter().any(|(op, operands)| {
        *op == Op::Variable && operands[2] == spirv::StorageClass::UniformConstant as u32
    }));
    assert_eq!(count_op(&emitted, Op::ImageSampleImplicitLod), 1);
}

/// Struct `Data { values: array[f32, 47] }` bound as `uniform[Data]`.
fn uniform_array_module() -> Module {
    let values_ty = Type::Array {
        element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
        len: ArrayLen::Fixed(47),
    };
    module(
        "fixed_array",
        vec![
            declare_struct("Data", vec![("values", values_ty)], Layout::Std140),
            declare_external(vec![("data", Type::Uniform(0), Some(0))]),
        ],
    )
}

#[test]
fn uniform_buffer_with_fixed_array() {
    let sanitized = Compiler::new().sanitize(uniform_array_module()).unwrap();

    let output = Compiler::new().emit_glsl(&sanitized, &GlslEnvironment::default()).unwrap();
    assert!(output.code.contains("uniform _nzslBindingdata {"), "got:\n{}", output.code);
    assert!(output.code.contains("float values[47];"), "got:\n{}", output.code);
    assert!(output.code.contains("} data;"), "got:\n{}", output.code);
    assert_eq!(output.explicit_uniform_block_binding.get("data"), Some(&0));

    let words = Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()).unwrap();
    let emitted = instructions(&words);
    let block_struct = emitted
        .iter()
        .find_map(|(op, operands)| {
            (*op == Op::Decorate && operands[1] == spirv::Decoration::Block as u32)
                .then(|| operands[0])
        })
        .expect("no struct was decorated Block");
    assert!(emitted.iter().any(|(op, operands)| {
        *op == Op::MemberDecorate
            && operands[0] == block_struct
            && operands[2..] == [spirv::Decoration::Offset as u32, 0]
    }));
    // ArrayStride sits on the array type itself.
    assert!(emitted.iter().any(|(op, operands)| {
        *op == Op::Decorate && operands[1..] == [spirv::Decoration::ArrayStride as u32, 16]
    }));
}

/// Storage buffer `Data { values: dyn_array[f32] }` with a `.Size()` call.
fn runtime_array_module() -> Module {
    let values_ty = Type::Array {
        element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
        len: ArrayLen::Runtime,
    };
    let storage_ty = Type::Storage { struct_index: 0, access: slc_ast::AccessMode::Read };
    module(
        "dyn_array",
        vec![
            declare_struct("Data", vec![("values", values_ty)], Layout::Std430),
            declare_external(vec![("data", storage_ty, Some(0))]),
            entry_point(
                "main_frag",
                ShaderStage::Fragment,
                Type::vec4(PrimitiveType::F32),
                vec![
                    Stmt::new(
                        StmtKind::DeclareVariable {
                            name: "count".to_owned(),
                            ty: Some(Type::Primitive(PrimitiveType::U32)),
                            initializer: Some(call(
                                member(member(ident("data"), "values"), "Size"),
                                Vec::new(),
                            )),
                            index: None,
                        },
                        span(),
                    ),
                    Stmt::new(
                        StmtKind::Return(Some(cast(
                            Type::vec4(PrimitiveType::F32),
                            vec![fconst(0.0), fconst(0.0), fconst(0.0), fconst(1.0)],
                        ))),
                        span(),
                    ),
                ],
            ),
        ],
    )
}

#[test]
fn runtime_array_size_lowers_to_array_length() {
    let sanitized = Compiler::new().sanitize(runtime_array_module()).unwrap();

    let words = Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()).unwrap();
    let emitted = instructions(&words);
    assert!(emitted.iter().any(|(op, operands)| {
        // OpArrayLength %u32 %result %var <member index of `values`>
        *op == Op::ArrayLength && operands[3] == 0
    }));

    let env = GlslEnvironment { gl_major: 3, gl_minor: 1, ..Default::default() };
    let output = Compiler::new().emit_glsl(&sanitized, &env).unwrap();
    assert!(output.code.contains("uint(data.values.length())"), "got:\n{}", output.code);
}

#[test]
fn runtime_array_in_the_middle_of_a_struct_is_rejected() {
    let values_ty = Type::Array {
        element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
        len: ArrayLen::Runtime,
    };
    let raw = module(
        "bad_layout",
        vec![declare_struct(
            "Data",
            vec![("values", values_ty), ("count", Type::Primitive(PrimitiveType::U32))],
            Layout::Std430,
        )],
    );
    assert!(matches!(
        Compiler::new().sanitize(raw),
        Err(CompileError::Sanitize(SanitizeError::LayoutError { .. }))
    ));
}

/// Mixed explicit and implicit bindings, with a push constant in the middle.
fn auto_binding_module() -> Module {
    module(
        "auto_binding",
        vec![
            declare_struct("Foo", vec![("value", Type::Primitive(PrimitiveType::F32))], Layout::Std140),
            declare_external(vec![
                ("tex1", sampler2d(), None),
                ("tex2", sampler2d(), None),
                ("foo", Type::PushConstant(0), None),
                ("tex3", sampler2d(), Some(4)),
                ("tex4", sampler2d(), Some(0)),
            ]),
        ],
    )
}

#[test]
fn auto_binding_assigns_lowest_unused_indices() {
    let sanitized = Compiler::new().sanitize(auto_binding_module()).unwrap();
    let block = sanitized.externals.get(0);
    let by_name: Vec<(&str, Option<u32>)> =
        block.bindings.iter().map(|b| (b.name.as_str(), b.binding)).collect();
    assert_eq!(
        by_name,
        vec![
            ("tex1", Some(1)),
            ("tex2", Some(2)),
            ("foo", None),
            ("tex3", Some(4)),
            ("tex4", Some(0)),
        ]
    );

    // Post-sanitization invariant: every resolved `(set, binding)` pair is
    // unique across the module.
    let mut seen = std::collections::HashSet::new();
    for block in &sanitized.externals.blocks {
        for binding in &block.bindings {
            if let Some(b) = binding.binding {
                assert!(seen.insert(binding_key(block.set.unwrap_or(0), b)));
            }
        }
    }
}

/// `Inner` fetched out of a std140 UBO into a local, then copied local to
/// local: the first assignment is a per-member copy, the second a single
/// load/store pair.
fn struct_copy_module() -> Module {
    module(
        "struct_copy",
        vec![
            declare_struct(
                "Inner",
                vec![("a", Type::Primitive(PrimitiveType::F32)), ("b", Type::Primitive(PrimitiveType::F32))],
                Layout::Default,
            ),
            declare_struct("Outer", vec![("inner", Type::Struct(0))], Layout::Std140),
            declare_external(vec![("data", Type::Uniform(1), Some(0))]),
            entry_point(
                "main_frag",
                ShaderStage::Fragment,
                Type::vec4(PrimitiveType::F32),
                vec![
                    declare_var("l", Type::Struct(0)),
                    assign(ident("l"), member(ident("data"), "inner")),
                    declare_var("l2", Type::Struct(0)),
                    assign(ident("l2"), ident("l")),
                    Stmt::new(
                        StmtKind::Return(Some(cast(
                            Type::vec4(PrimitiveType::F32),
                            vec![
                                member(ident("l2"), "a"),
                                member(ident("l2"), "b"),
                                fconst(0.0),
                                fconst(1.0),
                            ],
                        ))),
                        span(),
                    ),
                ],
            ),
        ],
    )
}

#[test]
fn block_struct_fetch_copies_member_by_member() {
    let sanitized = Compiler::new().sanitize(struct_copy_module()).unwrap();
    let words = Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()).unwrap();
    let emitted = instructions(&words);

    // First copy: one chain reaching `data.inner`, then per member one
    // source chain and one destination chain (2 members). Second copy: a
    // bare load/store with no chains. The return path adds two more chains
    // for `l2.a`/`l2.b`.
    assert_eq!(count_op(&emitted, Op::AccessChain), 7);
    // Stores: 2 per-member + 1 whole-struct + 1 entry output.
    assert_eq!(count_op(&emitted, Op::Store), 4);
}

/// `[feature(primitive_externals)]` with a `uniform bool`.
fn primitive_external_module() -> Module {
    let mut raw = module(
        "primitive_ext",
        vec![declare_external(vec![("bVal", Type::Primitive(PrimitiveType::Bool), None)])],
    );
    raw.features.insert(Feature::PrimitiveExternals);
    raw
}

#[test]
fn primitive_externals_split_backends() {
    let sanitized = Compiler::new().sanitize(primitive_external_module()).unwrap();

    assert!(matches!(
        Compiler::new().emit_spirv(&sanitized, &SpirvEnvironment::default()),
        Err(CompileError::Spirv(BackendError::PrimitiveExternalNotSupported))
    ));

    let output = Compiler::new().emit_glsl(&sanitized, &GlslEnvironment::default()).unwrap();
    assert!(output.code.contains("uniform bool bVal;"), "got:\n{}", output.code);
}

#[test]
fn primitive_externals_require_the_feature() {
    let raw = module(
        "primitive_ext",
        vec![declare_external(vec![("bVal", Type::Primitive(PrimitiveType::Bool), None)])],
    );
    assert!(matches!(
        Compiler::new().sanitize(raw),
        Err(CompileError::Sanitize(SanitizeError::FeatureDisabled { .. }))
    ));
}

#[test]
fn every_expression_is_typed_after_sanitization() {
    fn untyped_nodes(expr: &Expr) -> usize {
        let mut holes = expr.ty.is_none() as usize;
        match &expr.kind {
            ExprKind::AccessIdentifier { base, .. } => {
                holes += base.as_deref().map(untyped_nodes).unwrap_or(0);
            }
            ExprKind::AccessIndex { base, index } => {
                holes += untyped_nodes(base) + untyped_nodes(index);
            }
            ExprKind::Assign { target, value } => {
                holes += untyped_nodes(target) + untyped_nodes(value);
            }
            ExprKind::Binary { lhs, rhs, .. } => holes += untyped_nodes(lhs) + untyped_nodes(rhs),
            ExprKind::CallFunction { callee, args } => {
                holes += untyped_nodes(callee);
                holes += args.iter().map(untyped_nodes).sum::<usize>();
            }
            ExprKind::Cast { args, .. } => holes += args.iter().map(untyped_nodes).sum::<usize>(),
            ExprKind::Swizzle { base, .. } => holes += untyped_nodes(base),
            ExprKind::Unary { value, .. } => holes += untyped_nodes(value),
            _ => {}
        }
        holes
    }

    struct Check {
        holes: usize,
    }
    impl StmtVisitor for Check {
        fn visit_embedded_expr(&mut self, expr: &Expr) {
            self.holes += untyped_nodes(expr);
        }
    }

    for raw in [texture_sample_module(), runtime_array_module(), struct_copy_module()] {
        let sanitized = Compiler::new().sanitize(raw).unwrap();
        let mut check = Check { holes: 0 };
        for decl in &sanitized.functions.functions {
            slc_ast::walk_stmt(&mut check, &decl.body);
        }
        assert_eq!(check.holes, 0, "sanitized module still has untyped expressions");
    }
}

#[test]
fn sanitizing_equal_fixtures_is_deterministic() {
    let first = Compiler::new().sanitize(texture_sample_module()).unwrap();
    let second = Compiler::new().sanitize(texture_sample_module()).unwrap();

    assert_eq!(Compiler::new().emit_sl(&first), Compiler::new().emit_sl(&second));
    assert_eq!(
        Compiler::new().emit_spirv(&first, &SpirvEnvironment::default()).unwrap(),
        Compiler::new().emit_spirv(&second, &SpirvEnvironment::default()).unwrap()
    );
}

#[test]
fn sl_serialization_names_every_declaration() {
    let sanitized = Compiler::new().sanitize(uniform_array_module()).unwrap();
    let text = Compiler::new().emit_sl(&sanitized);
    assert!(text.contains("module fixed_array;"));
    assert!(text.contains("struct Data {"));
    assert!(text.contains("data: uniform<Data> binding(0),"));
}

#[test]
fn imports_are_spliced_under_their_alias() {
    let mut library = module(
        "mathlib",
        vec![Stmt::new(
            StmtKind::DeclareFunction {
                name: "half".to_owned(),
                params: vec![slc_ast::FunctionParam {
                    name: "x".to_owned(),
                    ty: Type::Primitive(PrimitiveType::F32),
                }],
                ret_ty: Type::Primitive(PrimitiveType::F32),
                body: Box::new(Stmt::new(StmtKind::Return(Some(fconst(0.5))), span())),
                entry_point: None,
                index: None,
            },
            span(),
        )],
    );
    // The resolver hands back pre-sanitized libraries in this setup, so the
    // library's own tables have to be populated the way its sanitizer run
    // would have left them.
    library.functions.push(slc_ast::FunctionDecl {
        name: "half".to_owned(),
        params: vec![slc_ast::FunctionParam {
            name: "x".to_owned(),
            ty: Type::Primitive(PrimitiveType::F32),
        }],
        ret_ty: Type::Primitive(PrimitiveType::F32),
        body: Stmt::new(
            StmtKind::Return(Some(Expr::typed(
                ExprKind::ConstantValue(ConstValue::from(0.5f32)),
                Type::Primitive(PrimitiveType::F32),
                span(),
            ))),
            span(),
        ),
        entry_point: None,
        param_vars: Vec::new(),
        output_var: None,
    });

    let mut resolver = MapModuleResolver::new();
    resolver.insert("mathlib", library);

    let raw = module(
        "importer",
        vec![
            Stmt::new(
                StmtKind::Import {
                    module_name: "mathlib".to_owned(),
                    alias: "m".to_owned(),
                    resolved: false,
                },
                span(),
            ),
            entry_point(
                "main_frag",
                ShaderStage::Fragment,
                Type::vec4(PrimitiveType::F32),
                vec![Stmt::new(
                    StmtKind::Return(Some(cast(
                        Type::vec4(PrimitiveType::F32),
                        vec![
                            call(ident("m.half"), vec![fconst(1.0)]),
                            fconst(0.0),
                            fconst(0.0),
                            fconst(1.0),
                        ],
                    ))),
                    span(),
                )],
            ),
        ],
    );
    let sanitized = Compiler::new().resolver(resolver).sanitize(raw).unwrap();
    assert_eq!(sanitized.imports.len(), 1);
    assert_eq!(sanitized.imports[0].alias, "m");
    assert!(sanitized.functions.find_by_name("half").is_some());
}

#[test]
fn unknown_import_is_a_module_resolution_error() {
    let raw = module(
        "importer",
        vec![Stmt::new(
            StmtKind::Import {
                module_name: "nowhere".to_owned(),
                alias: "n".to_owned(),
                resolved: false,
            },
            span(),
        )],
    );
    assert!(matches!(
        Compiler::new().sanitize(raw),
        Err(CompileError::Sanitize(SanitizeError::ModuleResolution { .. }))
    ));
}

#[test]
fn spirv_bytes_are_little_endian_words() {
    let bytes = spirv_to_bytes(&[0x0723_0203]);
    assert_eq!(bytes, vec![0x03, 0x02, 0x23, 0x07]);
}

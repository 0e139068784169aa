//! Built-in demonstration modules. The compiler has no parser of its own,
//! so the CLI carries a few hand-assembled trees that exercise the main
//! paths: texture sampling, uniform buffers, storage buffers.
use slc_ast::module::{
    AutoBinding, EntryPointMetadata, ExternalBinding, Layout, ShaderStage, StructMember,
};
use slc_ast::{
    ArrayLen, ConstValue, Expr, ExprKind, Module, PrimitiveType, SamplerDim, Span, Stmt, StmtKind,
    Type,
};

pub const SAMPLE_NAMES: &[&str] = &["texture", "uniform-array", "storage"];

pub fn build(name: &str) -> Option<Module> {
    match name {
        "texture" => Some(texture()),
        "uniform-array" => Some(uniform_array()),
        "storage" => Some(storage()),
        _ => None,
    }
}

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

fn fconst(value: f32) -> Expr {
    Expr::untyped(ExprKind::ConstantValue(ConstValue::from(value)), span())
}

fn vec2(x: f32, y: f32) -> Expr {
    Expr::untyped(
        ExprKind::Cast {
            target_ty: Type::vec2(PrimitiveType::F32),
            args: vec![fconst(x), fconst(y)],
        },
        span(),
    )
}

fn frag_entry(body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::DeclareFunction {
            name: "main_frag".to_owned(),
            params: Vec::new(),
            ret_ty: Type::vec4(PrimitiveType::F32),
            body: Box::new(Stmt::new(StmtKind::Multi(body), span())),
            entry_point: Some(EntryPointMetadata {
                stage: Some(ShaderStage::Fragment),
                workgroup_size: None,
            }),
            index: None,
        },
        span(),
    )
}

fn external(bindings: Vec<(&str, Type, Option<u32>)>) -> Stmt {
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

/// One 2D texture sampled at the origin.
fn texture() -> Module {
    let sampler = Type::Sampler { dim: SamplerDim::D2, sampled: PrimitiveType::F32 };
    Module::new(
        "texture",
        Stmt::new(
            StmtKind::Multi(vec![
                external(vec![("tex", sampler, Some(0))]),
                frag_entry(vec![Stmt::new(
                    StmtKind::Return(Some(call(
                        member(ident("tex"), "Sample"),
                        vec![vec2(0.0, 0.0)],
                    ))),
                    span(),
                )]),
            ]),
            span(),
        ),
    )
}

/// A std140 uniform block holding a fixed float array.
fn uniform_array() -> Module {
    Module::new(
        "uniform_array",
        Stmt::new(
            StmtKind::Multi(vec![
                Stmt::new(
                    StmtKind::DeclareStruct {
                        name: "Data".to_owned(),
                        members: vec![StructMember {
                            name: "values".to_owned(),
                            ty: Type::Array {
                                element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
                                len: ArrayLen::Fixed(47),
                            },
                            offset: None,
                            tag: None,
                        }],
                        layout: Layout::Std140,
                        index: None,
                    },
                    span(),
                ),
                external(vec![("data", Type::Uniform(0), Some(0))]),
                frag_entry(vec![Stmt::new(
                    StmtKind::Return(Some(Expr::untyped(
                        ExprKind::Cast {
                            target_ty: Type::vec4(PrimitiveType::F32),
                            args: vec![
                                Expr::untyped(
                                    ExprKind::AccessIndex {
                                        base: Box::new(member(ident("data"), "values")),
                                        index: Box::new(Expr::untyped(
                                            ExprKind::ConstantValue(ConstValue::I32(0)),
                                            span(),
                                        )),
                                    },
                                    span(),
                                ),
                                fconst(0.0),
                                fconst(0.0),
                                fconst(1.0),
                            ],
                        },
                        span(),
                    ))),
                    span(),
                )]),
            ]),
            span(),
        ),
    )
}

/// A std430 storage buffer with a runtime array and a `.Size()` query.
fn storage() -> Module {
    Module::new(
        "storage",
        Stmt::new(
            StmtKind::Multi(vec![
                Stmt::new(
                    StmtKind::DeclareStruct {
                        name: "Data".to_owned(),
                        members: vec![StructMember {
                            name: "values".to_owned(),
                            ty: Type::Array {
                                element_ty: Box::new(Type::Primitive(PrimitiveType::F32)),
                                len: ArrayLen::Runtime,
                            },
                            offset: None,
                            tag: None,
                        }],
                        layout: Layout::Std430,
                        index: None,
                    },
                    span(),
                ),
                external(vec![(
                    "data",
                    Type::Storage { struct_index: 0, access: slc_ast::AccessMode::Read },
                    Some(0),
                )]),
                frag_entry(vec![
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
                        StmtKind::Return(Some(Expr::untyped(
                            ExprKind::Cast {
                                target_ty: Type::vec4(PrimitiveType::F32),
                                args: vec![
                                    Expr::untyped(
                                        ExprKind::Cast {
                                            target_ty: Type::Primitive(PrimitiveType::F32),
                                            args: vec![Expr::untyped(
                                                ExprKind::AccessIdentifier {
                                                    base: None,
                                                    member: "count".to_owned(),
                                                },
                                                span(),
                                            )],
                                        },
                                        span(),
                                    ),
                                    fconst(0.0),
                                    fconst(0.0),
                                    fconst(1.0),
                                ],
                            },
                            span(),
                        ))),
                        span(),
                    ),
                ]),
            ]),
            span(),
        ),
    )
}

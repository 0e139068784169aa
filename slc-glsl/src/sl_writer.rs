//! Minimal SL re-serialization: a `Display`-style writer that dumps a
//! sanitized module back to SL-shaped source text. There is no parser in
//! this crate, so nothing consumes this text downstream; it gives tests
//! and the CLI a readable rendition of a sanitized module.
use std::fmt::Write as _;

use slc_ast::module::{BuiltinVar, VariableKind};
use slc_ast::{BinaryOp, ConstValue, Expr, ExprKind, Module, Stmt, StmtKind, Type, UnaryOp};

pub fn write_sl(module: &Module) -> String {
    let mut writer = SlWriter { module, out: String::new(), indent: 0 };
    writer.write_module();
    writer.out
}

struct SlWriter<'a> {
    module: &'a Module,
    out: String,
    indent: u32,
}

impl<'a> SlWriter<'a> {
    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn write_module(&mut self) {
        let _ = writeln!(self.out, "module {};", self.module.name);
        for import in &self.module.imports {
            let _ = writeln!(self.out, "import {} as {};", import.module_name, import.alias);
        }
        for decl in &self.module.structs.structs {
            let _ = writeln!(self.out, "struct {} {{", decl.name);
            for member in &decl.members {
                let _ = writeln!(self.out, "    {}: {},", member.name, self.type_name(&member.ty));
            }
            let _ = writeln!(self.out, "}}");
        }
        for block in &self.module.externals.blocks {
            let _ = writeln!(self.out, "external {{");
            for binding in &block.bindings {
                let binding_suffix = match binding.binding {
                    Some(b) => format!(" binding({b})"),
                    None => String::new(),
                };
                let _ = writeln!(
                    self.out,
                    "    {}: {}{binding_suffix},",
                    binding.name,
                    self.type_name(&binding.ty)
                );
            }
            let _ = writeln!(self.out, "}}");
        }
        for decl in &self.module.functions.functions {
            let stage_attr = decl
                .entry_point
                .as_ref()
                .and_then(|ep| ep.stage)
                .map(|stage| format!("[{stage:?}] "))
                .unwrap_or_default();
            let params: Vec<String> = decl
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name, self.type_name(&p.ty)))
                .collect();
            let _ = writeln!(
                self.out,
                "{stage_attr}fn {}({}) -> {} {{",
                decl.name,
                params.join(", "),
                self.type_name(&decl.ret_ty)
            );
            self.indent += 1;
            self.write_stmt(&decl.body);
            self.indent -= 1;
            let _ = writeln!(self.out, "}}");
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::NoType => "void".to_owned(),
            Type::Primitive(p) => p.to_string(),
            Type::Vector { scalar, len } => format!("vec{len}<{scalar}>"),
            Type::Matrix { scalar, cols, rows } => format!("mat{cols}x{rows}<{scalar}>"),
            Type::Array { element_ty, len } => match len {
                slc_ast::ArrayLen::Fixed(n) => format!("array<{}, {n}>", self.type_name(element_ty)),
                slc_ast::ArrayLen::Runtime => format!("array<{}>", self.type_name(element_ty)),
            },
            Type::Struct(index) => self.module.structs.get(*index).name.clone(),
            Type::Sampler { dim, sampled } => format!("sampler{dim}<{sampled}>"),
            Type::Uniform(index) => format!("uniform<{}>", self.module.structs.get(*index).name),
            Type::Storage { struct_index, .. } => {
                format!("storage<{}>", self.module.structs.get(*struct_index).name)
            }
            Type::PushConstant(index) => {
                format!("push_constant<{}>", self.module.structs.get(*index).name)
            }
            Type::Alias(index) => self.module.aliases.get(*index).name.clone(),
            other => format!("{other}"),
        }
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Multi(stmts) => {
                for s in stmts {
                    self.write_stmt(s);
                }
            }
            StmtKind::Scoped(inner) => self.write_stmt(inner),
            StmtKind::NoOp => {}
            StmtKind::Expression(expr) => {
                self.pad();
                let _ = writeln!(self.out, "{};", self.write_expr(expr));
            }
            StmtKind::DeclareVariable { name, ty, initializer, .. } => {
                self.pad();
                let ty_text = ty.as_ref().map(|t| format!(": {}", self.type_name(t))).unwrap_or_default();
                match initializer {
                    Some(init) => {
                        let _ = writeln!(self.out, "let {name}{ty_text} = {};", self.write_expr(init));
                    }
                    None => {
                        let _ = writeln!(self.out, "let {name}{ty_text};");
                    }
                }
            }
            StmtKind::DeclareConst { name, ty, value, .. } => {
                self.pad();
                let ty_text = ty.as_ref().map(|t| format!(": {}", self.type_name(t))).unwrap_or_default();
                let _ = writeln!(self.out, "const {name}{ty_text} = {};", self.write_expr(value));
            }
            StmtKind::DeclareOption { name, ty, default, .. } => {
                self.pad();
                let default_text =
                    default.as_ref().map(|e| format!(" = {}", self.write_expr(e))).unwrap_or_default();
                let _ = writeln!(self.out, "option {name}: {}{default_text};", self.type_name(ty));
            }
            StmtKind::Branch { cond, then_branch, else_branch } => {
                self.pad();
                let _ = writeln!(self.out, "if ({}) {{", self.write_expr(cond));
                self.indent += 1;
                self.write_stmt(then_branch);
                self.indent -= 1;
                self.pad();
                let _ = writeln!(self.out, "}}");
                if let Some(else_branch) = else_branch {
                    self.pad();
                    let _ = writeln!(self.out, "else {{");
                    self.indent += 1;
                    self.write_stmt(else_branch);
                    self.indent -= 1;
                    self.pad();
                    let _ = writeln!(self.out, "}}");
                }
            }
            StmtKind::While { cond, body } => {
                self.pad();
                let _ = writeln!(self.out, "while ({}) {{", self.write_expr(cond));
                self.indent += 1;
                self.write_stmt(body);
                self.indent -= 1;
                self.pad();
                let _ = writeln!(self.out, "}}");
            }
            StmtKind::Return(value) => {
                self.pad();
                match value {
                    Some(expr) => {
                        let _ = writeln!(self.out, "return {};", self.write_expr(expr));
                    }
                    None => {
                        let _ = writeln!(self.out, "return;");
                    }
                }
            }
            StmtKind::Discard => {
                self.pad();
                let _ = writeln!(self.out, "discard;");
            }
            _ => {}
        }
    }

    fn write_expr(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::ConstantValue(value) => format_const(value),
            ExprKind::VariableValue(index) => self.variable_name(*index),
            ExprKind::AliasValue(index) => self.module.aliases.get(*index).name.clone(),
            ExprKind::Function(index) => self.module.functions.get(*index).name.clone(),
            ExprKind::Intrinsic(id) => format!("{id}"),
            ExprKind::Unary { op, value } => {
                format!("{}{}", unary_token(*op), self.write_expr(value))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                format!("({} {} {})", self.write_expr(lhs), binary_token(*op), self.write_expr(rhs))
            }
            ExprKind::Assign { target, value } => {
                format!("{} = {}", self.write_expr(target), self.write_expr(value))
            }
            ExprKind::Cast { target_ty, args } => {
                format!("{}({})", self.type_name(target_ty), self.write_args(args))
            }
            ExprKind::AccessIdentifier { base, member } => match base {
                Some(base) => format!("{}.{member}", self.write_expr(base)),
                None => member.clone(),
            },
            ExprKind::AccessIndex { base, index } => {
                format!("{}[{}]", self.write_expr(base), self.write_expr(index))
            }
            ExprKind::Swizzle { base, components } => {
                let pattern: String = components.iter().map(|c| swizzle_char(*c)).collect();
                format!("{}.{pattern}", self.write_expr(base))
            }
            ExprKind::CallFunction { callee, args } => {
                format!("{}({})", self.write_expr(callee), self.write_args(args))
            }
            _ => "<unsupported>".to_owned(),
        }
    }

    fn write_args(&self, args: &[Expr]) -> String {
        args.iter().map(|a| self.write_expr(a)).collect::<Vec<_>>().join(", ")
    }

    fn variable_name(&self, index: u32) -> String {
        let slot = self.module.variables.get(index);
        match &slot.kind {
            VariableKind::Builtin(builtin) => sl_builtin_name(*builtin).to_owned(),
            _ => slot.name.clone(),
        }
    }
}

fn sl_builtin_name(builtin: BuiltinVar) -> &'static str {
    match builtin {
        BuiltinVar::Position => "builtin::position",
        BuiltinVar::FragCoord => "builtin::frag_coord",
        BuiltinVar::VertexIndex => "builtin::vertex_index",
        BuiltinVar::InstanceIndex => "builtin::instance_index",
    }
}

fn unary_token(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
    }
}

fn binary_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

fn swizzle_char(component: u8) -> char {
    match component {
        0 => 'x',
        1 => 'y',
        2 => 'z',
        _ => 'w',
    }
}

fn format_const(value: &ConstValue) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slc_ast::module::{StructDecl, StructMember};
    use slc_ast::{Layout, PrimitiveType, Span, StmtKind};

    #[test]
    fn renders_module_header_and_declarations() {
        let mut module = Module::new("lighting", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        module.structs.push(StructDecl {
            name: "Light".into(),
            members: vec![StructMember {
                name: "intensity".into(),
                ty: Type::Primitive(PrimitiveType::F32),
                offset: None,
                tag: None,
            }],
            layout: Layout::Default,
            size: None,
        });
        let text = write_sl(&module);
        assert!(text.starts_with("module lighting;\n"));
        assert!(text.contains("struct Light {"));
        assert!(text.contains("intensity: f32,"));
    }
}

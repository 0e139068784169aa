//! Mechanical GLSL emission: one pass over a sanitized module, one
//! declaration or statement at a time, with no intermediate representation
//! of its own. Each node kind gets its own `write_*` method, the same
//! per-variant-dispatch shape the SPIR-V back end uses for its own
//! traversal, just producing text instead of words.
use std::collections::HashMap;
use std::fmt::Write as _;

use fnv::FnvHashMap;
use slc_ast::module::{BuiltinVar, DrawParamKind, VarIndex, VariableKind};
use slc_ast::{BinaryOp, ConstValue, Expr, ExprKind, IntrinsicId, Module, Stmt, StmtKind, Type, UnaryOp};

use crate::environment::{
    GlslEnvironment, BASE_INSTANCE_UNIFORM_NAME, BASE_VERTEX_UNIFORM_NAME, DRAW_INDEX_UNIFORM_NAME,
    FLIP_Y_UNIFORM_NAME,
};
use crate::error::{GlslError, GlslResult};
use crate::output::GlslOutput;
use crate::types::{array_suffix, type_name};

pub fn write_glsl(module: &Module, env: &GlslEnvironment) -> GlslResult<GlslOutput> {
    log::debug!(
        "writing GLSL {}.{}{} for module `{}`",
        env.gl_major,
        env.gl_minor,
        if env.gl_es { " es" } else { "" },
        module.name
    );
    let mut writer = Writer::new(module, env);
    writer.write_version_header();
    writer.write_extensions()?;
    writer.write_structs()?;
    writer.write_externals()?;
    writer.write_stage_io()?;
    writer.write_functions()?;
    Ok(writer.finish())
}

struct Writer<'a> {
    module: &'a Module,
    env: &'a GlslEnvironment,
    out: String,
    indent: u32,
    var_names: FnvHashMap<VarIndex, String>,
    explicit_uniform_block_binding: HashMap<String, u32>,
    uses_base_instance_uniform: bool,
    uses_base_vertex_uniform: bool,
    uses_draw_index_uniform: bool,
}

impl<'a> Writer<'a> {
    fn new(module: &'a Module, env: &'a GlslEnvironment) -> Self {
        Writer {
            module,
            env,
            out: String::new(),
            indent: 0,
            var_names: FnvHashMap::default(),
            explicit_uniform_block_binding: HashMap::new(),
            uses_base_instance_uniform: false,
            uses_base_vertex_uniform: false,
            uses_draw_index_uniform: false,
        }
    }

    fn finish(self) -> GlslOutput {
        GlslOutput {
            code: self.out,
            explicit_uniform_block_binding: self.explicit_uniform_block_binding,
            uses_base_instance_uniform: self.uses_base_instance_uniform,
            uses_base_vertex_uniform: self.uses_base_vertex_uniform,
            uses_draw_index_uniform: self.uses_draw_index_uniform,
        }
    }

    fn write_version_header(&mut self) {
        let number = self.env.gl_major * 100 + self.env.gl_minor * 10;
        if self.env.gl_es {
            let _ = writeln!(self.out, "#version {number} es");
        } else {
            let _ = writeln!(self.out, "#version {number}");
        }
    }

    fn type_name(&self, ty: &Type) -> GlslResult<String> {
        type_name(ty, &self.module.structs)
    }

    fn write_structs(&mut self) -> GlslResult<()> {
        for decl in &self.module.structs.structs {
            let _ = writeln!(self.out, "struct {} {{", decl.name);
            for member in &decl.members {
                let suffix = array_suffix(&member.ty)?;
                let ty_name = self.type_name(&member.ty)?;
                let _ = writeln!(self.out, "    {ty_name} {}{suffix};", member.name);
            }
            let _ = writeln!(self.out, "}};");
        }
        Ok(())
    }

    /// Whether `layout(binding = N)` is legal on the declared target.
    fn explicit_binding_supported(&self) -> bool {
        if self.env.gl_es {
            (self.env.gl_major, self.env.gl_minor) >= (3, 1)
        } else {
            (self.env.gl_major, self.env.gl_minor) >= (4, 2)
        }
    }

    /// `#extension` lines sit directly under `#version`. Storage buffers
    /// need GL 4.3 / ES 3.1, or the SSBO extension when the support
    /// callback grants it (callback overrides the version floor).
    fn write_extensions(&mut self) -> GlslResult<()> {
        let uses_storage = self
            .module
            .externals
            .blocks
            .iter()
            .flat_map(|b| &b.bindings)
            .any(|b| matches!(b.ty, Type::Storage { .. }));
        if !uses_storage {
            return Ok(());
        }
        let floor = if self.env.gl_es { (3, 1) } else { (4, 3) };
        if (self.env.gl_major, self.env.gl_minor) >= floor {
            return Ok(());
        }
        let extension = "GL_ARB_shader_storage_buffer_object";
        if self.env.extension_available(extension, floor.0, floor.1) {
            let _ = writeln!(self.out, "#extension {extension} : require");
            Ok(())
        } else {
            Err(GlslError::VersionTooLow(floor.0, floor.1))
        }
    }

    fn block_layout(&self, packing: &str, gl_binding: Option<u32>) -> String {
        match gl_binding {
            Some(n) if self.explicit_binding_supported() => format!("{packing}, binding = {n}"),
            _ => packing.to_owned(),
        }
    }

    /// The GL binding index a resolved `(set, binding)` pair maps to: the
    /// environment's remap table wins, otherwise the descriptor binding is
    /// used flat.
    fn gl_binding(&self, set: Option<u32>, binding: Option<u32>) -> Option<u32> {
        let binding = binding?;
        let key = slc_ast::binding_key(set.unwrap_or(0), binding);
        Some(self.env.gl_binding_mapping.get(&key).copied().unwrap_or(binding))
    }

    /// Every `external` binding becomes its own top-level declaration: a
    /// bare opaque-typed uniform for samplers and feature-gated primitives,
    /// a named `_nzslBinding*` block for uniform/storage/push-constant
    /// structs.
    fn write_externals(&mut self) -> GlslResult<()> {
        for block in &self.module.externals.blocks {
            for binding in &block.bindings {
                let gl_binding = self.gl_binding(block.set, binding.binding);
                if let Some(var_index) = binding.var_index {
                    self.var_names.insert(var_index, binding.name.clone());
                }
                let binding_prefix = match gl_binding {
                    Some(n) if self.explicit_binding_supported() => {
                        format!("layout(binding = {n}) ")
                    }
                    _ => String::new(),
                };
                match &binding.ty {
                    Type::Sampler { .. } => {
                        let ty_name = self.type_name(&binding.ty)?;
                        let _ = writeln!(
                            self.out,
                            "{binding_prefix}uniform {ty_name} {};",
                            binding.name
                        );
                    }
                    Type::Primitive(_) | Type::Vector { .. } | Type::Matrix { .. } => {
                        // Only reachable with `primitive_externals` declared;
                        // plain uniforms have no block and no binding index.
                        let ty_name = self.type_name(&binding.ty)?;
                        let _ = writeln!(self.out, "uniform {ty_name} {};", binding.name);
                    }
                    Type::Uniform(struct_index) => {
                        let decl = self.module.structs.get(*struct_index);
                        let layout = self.block_layout("std140", gl_binding);
                        if let Some(n) = gl_binding {
                            self.explicit_uniform_block_binding.insert(binding.name.clone(), n);
                        }
                        let _ = writeln!(
                            self.out,
                            "layout({layout}) uniform _nzslBinding{} {{",
                            binding.name
                        );
                        self.write_struct_members(&decl.members)?;
                        let _ = writeln!(self.out, "}} {};", binding.name);
                    }
                    Type::Storage { struct_index, .. } => {
                        let decl = self.module.structs.get(*struct_index);
                        let layout = self.block_layout("std430", gl_binding);
                        if let Some(n) = gl_binding {
                            self.explicit_uniform_block_binding.insert(binding.name.clone(), n);
                        }
                        let _ = writeln!(
                            self.out,
                            "layout({layout}) buffer _nzslBinding{} {{",
                            binding.name
                        );
                        self.write_struct_members(&decl.members)?;
                        let _ = writeln!(self.out, "}} {};", binding.name);
                    }
                    Type::PushConstant(struct_index) => {
                        let decl = self.module.structs.get(*struct_index);
                        let _ = writeln!(self.out, "uniform _nzslBinding{} {{", binding.name);
                        self.write_struct_members(&decl.members)?;
                        let _ = writeln!(self.out, "}} {};", binding.name);
                    }
                    other => {
                        return Err(GlslError::Unsupported(format!(
                            "external `{}` of type {other} has no GLSL binding form",
                            binding.name
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    fn write_struct_members(&mut self, members: &[slc_ast::StructMember]) -> GlslResult<()> {
        for member in members {
            let suffix = array_suffix(&member.ty)?;
            let ty_name = self.type_name(&member.ty)?;
            let _ = writeln!(self.out, "    {ty_name} {}{suffix};", member.name);
        }
        Ok(())
    }

    /// Stage inputs/outputs, built-ins and the draw-parameter fallback
    /// uniforms all live in [`Module::variables`] rather than a dedicated
    /// table; this walks that table once up front so every
    /// function body can assume its variable names already exist.
    fn write_stage_io(&mut self) -> GlslResult<()> {
        for (index, slot) in self.module.variables.variables.iter().enumerate() {
            let var_index = index as VarIndex;
            match &slot.kind {
                VariableKind::StageInput { location } => {
                    self.var_names.insert(var_index, slot.name.clone());
                    let ty_name = self.type_name(&slot.ty)?;
                    let _ = writeln!(
                        self.out,
                        "layout(location = {location}) in {ty_name} {};",
                        slot.name
                    );
                }
                VariableKind::StageOutput { location } => {
                    self.var_names.insert(var_index, slot.name.clone());
                    let ty_name = self.type_name(&slot.ty)?;
                    let _ = writeln!(
                        self.out,
                        "layout(location = {location}) out {ty_name} {};",
                        slot.name
                    );
                }
                VariableKind::Builtin(builtin) => {
                    self.var_names.insert(var_index, builtin_name(*builtin).to_owned());
                }
                VariableKind::DrawParameterFallback(kind) => {
                    let name = fallback_uniform_name(*kind);
                    self.var_names.insert(var_index, name.to_owned());
                    let _ = writeln!(self.out, "uniform int {name};");
                    match kind {
                        DrawParamKind::BaseInstance => self.uses_base_instance_uniform = true,
                        DrawParamKind::BaseVertex => self.uses_base_vertex_uniform = true,
                        DrawParamKind::DrawIndex => self.uses_draw_index_uniform = true,
                    }
                }
                VariableKind::Local | VariableKind::Parameter | VariableKind::External { .. } => {}
            }
        }
        if self.env.flip_y_position {
            let _ = writeln!(self.out, "uniform float {FLIP_Y_UNIFORM_NAME};");
        }
        self.write_draw_parameter_uniforms();
        Ok(())
    }

    /// Draw-parameter intrinsics the sanitizer left in place (it only
    /// rewrites them when *it* was asked to) still need their fallback
    /// uniforms declared before any function body references them.
    fn write_draw_parameter_uniforms(&mut self) {
        use slc_ast::{ExprVisitor, StmtVisitor};

        if !self.env.allow_draw_parameters_uniforms_fallback {
            return;
        }

        #[derive(Default)]
        struct Scan {
            found: Vec<DrawParamKind>,
        }
        impl ExprVisitor for Scan {
            fn visit_call_function(&mut self, callee: &Expr, args: &[Expr]) {
                if !args.is_empty() {
                    return;
                }
                let kind = match &callee.kind {
                    ExprKind::Intrinsic(IntrinsicId::BaseInstance) => Some(DrawParamKind::BaseInstance),
                    ExprKind::Intrinsic(IntrinsicId::BaseVertex) => Some(DrawParamKind::BaseVertex),
                    ExprKind::Intrinsic(IntrinsicId::DrawIndex) => Some(DrawParamKind::DrawIndex),
                    _ => None,
                };
                if let Some(kind) = kind {
                    self.found.push(kind);
                }
            }
        }
        impl StmtVisitor for Scan {
            fn visit_embedded_expr(&mut self, expr: &Expr) {
                slc_ast::walk_expr(self, expr);
            }
        }

        let mut scan = Scan::default();
        for decl in &self.module.functions.functions {
            slc_ast::walk_stmt(&mut scan, &decl.body);
        }
        let mut declared = [false; 3];
        for kind in scan.found {
            let slot = kind as usize;
            if !declared[slot] {
                declared[slot] = true;
                let _ = writeln!(self.out, "uniform int {};", fallback_uniform_name(kind));
            }
        }
    }

    fn write_functions(&mut self) -> GlslResult<()> {
        for decl in &self.module.functions.functions {
            if decl.entry_point.is_some() {
                continue;
            }
            self.write_function_signature(decl)?;
            self.write_block(&decl.body)?;
        }
        for (_, decl) in self.module.functions.entry_points() {
            let _ = writeln!(self.out, "void main() {{");
            self.indent += 1;
            self.write_stmt(&decl.body)?;
            self.indent -= 1;
            let _ = writeln!(self.out, "}}");
        }
        Ok(())
    }

    fn write_function_signature(&mut self, decl: &slc_ast::FunctionDecl) -> GlslResult<()> {
        let ret = self.type_name(&decl.ret_ty)?;
        let mut params = Vec::with_capacity(decl.params.len());
        for (param, &var_index) in decl.params.iter().zip(&decl.param_vars) {
            self.var_names.insert(var_index, param.name.clone());
            params.push(format!("{} {}", self.type_name(&param.ty)?, param.name));
        }
        let _ = write!(self.out, "{ret} {}(", decl.name);
        self.out.push_str(&params.join(", "));
        let _ = writeln!(self.out, ") {{");
        Ok(())
    }

    fn write_block(&mut self, body: &Stmt) -> GlslResult<()> {
        self.indent += 1;
        self.write_stmt(body)?;
        self.indent -= 1;
        let _ = writeln!(self.out, "}}");
        Ok(())
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn write_stmt(&mut self, stmt: &Stmt) -> GlslResult<()> {
        match &stmt.kind {
            StmtKind::Multi(stmts) => {
                for s in stmts {
                    self.write_stmt(s)?;
                }
            }
            StmtKind::Scoped(inner) => self.write_stmt(inner)?,
            StmtKind::NoOp => {}
            StmtKind::Expression(expr) => {
                let text = self.write_expr(expr)?;
                self.pad();
                let _ = writeln!(self.out, "{text};");
            }
            StmtKind::DeclareVariable { name, ty, initializer, index } => {
                if let Some(var_index) = index {
                    self.var_names.insert(*var_index, name.clone());
                }
                let ty = ty.clone().or_else(|| initializer.as_ref().and_then(|e| e.ty.clone()));
                let ty_name = match &ty {
                    Some(ty) => self.type_name(ty)?,
                    None => return Err(GlslError::Unsupported(format!("`{name}` has no known type"))),
                };
                self.pad();
                match initializer {
                    Some(init) => {
                        let value = self.write_expr(init)?;
                        let _ = writeln!(self.out, "{ty_name} {name} = {value};");
                    }
                    None => {
                        let _ = writeln!(self.out, "{ty_name} {name};");
                    }
                }
            }
            StmtKind::DeclareConst { name, ty, value, index } => {
                if let Some(var_index) = index {
                    self.var_names.insert(*var_index, name.clone());
                }
                let ty = ty.clone().or_else(|| value.ty.clone());
                let ty_name = match &ty {
                    Some(ty) => self.type_name(ty)?,
                    None => return Err(GlslError::Unsupported(format!("`{name}` has no known type"))),
                };
                let rendered = self.write_expr(value)?;
                self.pad();
                let _ = writeln!(self.out, "const {ty_name} {name} = {rendered};");
            }
            StmtKind::DeclareOption { name, ty, default, index } => {
                if let Some(var_index) = index {
                    self.var_names.insert(*var_index, name.clone());
                }
                let ty_name = self.type_name(ty)?;
                self.pad();
                match default {
                    Some(expr) => {
                        let rendered = self.write_expr(expr)?;
                        let _ = writeln!(self.out, "{ty_name} {name} = {rendered};");
                    }
                    None => {
                        let _ = writeln!(self.out, "{ty_name} {name};");
                    }
                }
            }
            StmtKind::Branch { cond, then_branch, else_branch } => {
                let cond_text = self.write_expr(cond)?;
                self.pad();
                let _ = writeln!(self.out, "if ({cond_text}) {{");
                self.write_block(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.pad();
                    let _ = writeln!(self.out, "else {{");
                    self.write_block(else_branch)?;
                }
            }
            StmtKind::While { cond, body } => {
                let cond_text = self.write_expr(cond)?;
                self.pad();
                let _ = writeln!(self.out, "while ({cond_text}) {{");
                self.write_block(body)?;
            }
            StmtKind::Return(value) => {
                self.pad();
                match value {
                    Some(expr) => {
                        let rendered = self.write_expr(expr)?;
                        let _ = writeln!(self.out, "return {rendered};");
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
        Ok(())
    }

    fn var_name(&self, index: VarIndex) -> GlslResult<String> {
        self.var_names
            .get(&index)
            .cloned()
            .ok_or_else(|| GlslError::Unsupported(format!("variable #{index} was never declared")))
    }

    fn write_expr(&mut self, expr: &Expr) -> GlslResult<String> {
        match &expr.kind {
            ExprKind::ConstantValue(value) => Ok(format_const(value)),
            ExprKind::VariableValue(index) => self.var_name(*index),
            ExprKind::AliasValue(index) => {
                let decl = self.module.aliases.get(*index);
                Err(GlslError::Unsupported(format!("unresolved alias `{}`", decl.name)))
            }
            ExprKind::Function(index) => Ok(self.module.functions.get(*index).name.clone()),
            ExprKind::Intrinsic(id) => {
                Err(GlslError::Unsupported(format!("{id} is only valid as a call target")))
            }
            ExprKind::Unary { op, value } => {
                let inner = self.write_expr(value)?;
                Ok(format!("{}({inner})", unary_token(*op)))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_text = self.write_expr(lhs)?;
                let rhs_text = self.write_expr(rhs)?;
                Ok(format!("({lhs_text} {} {rhs_text})", binary_token(*op)))
            }
            ExprKind::Assign { target, value } => {
                let target_text = self.write_expr(target)?;
                let value_text = self.write_expr(value)?;
                Ok(format!("{target_text} = {value_text}"))
            }
            ExprKind::Cast { target_ty, args } => {
                let ty_name = self.type_name(target_ty)?;
                let args_text = self.write_args(args)?;
                Ok(format!("{ty_name}({args_text})"))
            }
            ExprKind::AccessIdentifier { base, member } => match base {
                Some(base) => {
                    let base_text = self.write_expr(base)?;
                    Ok(format!("{base_text}.{member}"))
                }
                None => Ok(member.clone()),
            },
            ExprKind::AccessIndex { base, index } => {
                let base_text = self.write_expr(base)?;
                let index_text = self.write_expr(index)?;
                Ok(format!("{base_text}[{index_text}]"))
            }
            ExprKind::Swizzle { base, components } => {
                let base_text = self.write_expr(base)?;
                let pattern: String = components.iter().map(|c| swizzle_char(*c)).collect();
                Ok(format!("{base_text}.{pattern}"))
            }
            ExprKind::CallFunction { callee, args } => self.write_call(callee, args),
            other => Err(GlslError::Unsupported(format!("{other:?} is not representable in GLSL"))),
        }
    }

    fn write_args(&mut self, args: &[Expr]) -> GlslResult<String> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.write_expr(arg)?);
        }
        Ok(rendered.join(", "))
    }

    fn write_call(&mut self, callee: &Expr, args: &[Expr]) -> GlslResult<String> {
        match &callee.kind {
            ExprKind::Function(index) => {
                let name = self.module.functions.get(*index).name.clone();
                let args_text = self.write_args(args)?;
                Ok(format!("{name}({args_text})"))
            }
            ExprKind::Intrinsic(IntrinsicId::Sample) => {
                let args_text = self.write_args(args)?;
                Ok(format!("texture({args_text})"))
            }
            ExprKind::Intrinsic(IntrinsicId::ArrayLength) => {
                // Sanitized shape is `ArrayLength(struct_var, member_index)`;
                // GLSL spells it as `.length()` on the named member, and
                // `.length()` is an int, so the result is cast back to uint.
                let base_text = self.write_expr(&args[0])?;
                let member_name = args[0]
                    .ty
                    .as_ref()
                    .and_then(Type::wrapped_struct)
                    .and_then(|struct_index| {
                        let member_index = match &args[1].kind {
                            ExprKind::ConstantValue(ConstValue::U32(n)) => *n as usize,
                            _ => return None,
                        };
                        self.module
                            .structs
                            .get(struct_index)
                            .members
                            .get(member_index)
                            .map(|m| m.name.clone())
                    })
                    .ok_or_else(|| {
                        GlslError::Unsupported("array length of an unknown struct member".to_owned())
                    })?;
                Ok(format!("uint({base_text}.{member_name}.length())"))
            }
            ExprKind::Intrinsic(IntrinsicId::BaseInstance) => {
                if self.env.allow_draw_parameters_uniforms_fallback {
                    self.uses_base_instance_uniform = true;
                    Ok(BASE_INSTANCE_UNIFORM_NAME.to_owned())
                } else {
                    Ok("gl_BaseInstance".to_owned())
                }
            }
            ExprKind::Intrinsic(IntrinsicId::BaseVertex) => {
                if self.env.allow_draw_parameters_uniforms_fallback {
                    self.uses_base_vertex_uniform = true;
                    Ok(BASE_VERTEX_UNIFORM_NAME.to_owned())
                } else {
                    Ok("gl_BaseVertex".to_owned())
                }
            }
            ExprKind::Intrinsic(IntrinsicId::DrawIndex) => {
                if self.env.allow_draw_parameters_uniforms_fallback {
                    self.uses_draw_index_uniform = true;
                    Ok(DRAW_INDEX_UNIFORM_NAME.to_owned())
                } else {
                    Ok("gl_DrawID".to_owned())
                }
            }
            other => Err(GlslError::Unsupported(format!("{other:?} is not callable in GLSL"))),
        }
    }
}

fn builtin_name(builtin: BuiltinVar) -> &'static str {
    match builtin {
        BuiltinVar::Position => "gl_Position",
        BuiltinVar::FragCoord => "gl_FragCoord",
        BuiltinVar::VertexIndex => "gl_VertexID",
        BuiltinVar::InstanceIndex => "gl_InstanceID",
    }
}

fn fallback_uniform_name(kind: DrawParamKind) -> &'static str {
    match kind {
        DrawParamKind::BaseInstance => BASE_INSTANCE_UNIFORM_NAME,
        DrawParamKind::BaseVertex => BASE_VERTEX_UNIFORM_NAME,
        DrawParamKind::DrawIndex => DRAW_INDEX_UNIFORM_NAME,
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
    use slc_ast::module::{AutoBinding, ExternalBinding, ExternalBlock, VariableSlot};
    use slc_ast::{PrimitiveType, SamplerDim, Span, StmtKind};

    fn sampler_module() -> Module {
        let mut module = Module::new("m", Stmt::new(StmtKind::NoOp, Span::synthetic()));
        let ty = Type::Sampler { dim: SamplerDim::D2, sampled: PrimitiveType::F32 };
        let block = module.externals.push(ExternalBlock {
            set: Some(0),
            auto_binding: AutoBinding::Unset,
            tag: None,
            bindings: vec![ExternalBinding {
                name: "tex".to_owned(),
                ty: ty.clone(),
                binding: Some(0),
                tag: None,
                var_index: None,
            }],
        });
        let var = module.variables.push(VariableSlot {
            name: "tex".to_owned(),
            ty,
            kind: VariableKind::External { block, binding_index: 0 },
        });
        module.externals.get_mut(block).bindings[0].var_index = Some(var);
        module
    }

    #[test]
    fn es_target_gets_es_version_header() {
        let output = write_glsl(&sampler_module(), &GlslEnvironment::default()).unwrap();
        assert!(output.code.starts_with("#version 300 es\n"));
    }

    #[test]
    fn sampler_is_a_plain_uniform_below_es31() {
        let output = write_glsl(&sampler_module(), &GlslEnvironment::default()).unwrap();
        assert!(output.code.contains("uniform sampler2D tex;"));
        assert!(!output.code.contains("layout(binding"));
    }

    #[test]
    fn binding_remap_table_overrides_descriptor_binding() {
        let env = GlslEnvironment {
            gl_es: true,
            gl_major: 3,
            gl_minor: 1,
            gl_binding_mapping: HashMap::from([(slc_ast::binding_key(0, 0), 7)]),
            ..Default::default()
        };
        let output = write_glsl(&sampler_module(), &env).unwrap();
        assert!(output.code.contains("layout(binding = 7) uniform sampler2D tex;"));
    }
}

//! Orchestration: the `Idle -> CollectingTypes ->
//! EmittingGlobals -> EmittingFunctions -> Finalizing -> Done` state machine
//! that turns a sanitized [`Module`] into a SPIR-V binary.
use fnv::{FnvHashMap, FnvHashSet};
use slc_ast::module::{BuiltinVar, FunctionDecl, VarIndex, VariableKind};
use slc_ast::{
    BinaryOp, ConstValue, Expr, ExprKind, FunctionIndex, IntrinsicId, Module, PrimitiveType,
    ShaderStage, Stmt, StmtKind, Type, UnaryOp,
};
use spirv::{AddressingModel, BuiltIn, Decoration, ExecutionMode, ExecutionModel, MemoryModel, Op, StorageClass};

use crate::decorate::{decorate_binding, decorate_block_struct, decorate_with_literal};
use crate::environment::SpirvEnvironment;
use crate::error::{BackendError, BackendResult};
use crate::ids::IdAllocator;
use crate::instr::{InstructionBuilder, SectionBuffer};
use crate::types::{ConstantTable, TypeKey, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendState {
    Idle,
    CollectingTypes,
    EmittingGlobals,
    EmittingFunctions,
    Finalizing,
    Done,
}

pub fn emit(module: &Module, env: &SpirvEnvironment) -> BackendResult<Vec<u32>> {
    env.validate()?;
    check_no_recursion(module)?;

    let mut emitter = Emitter::new(module, env);
    emitter.state = BackendState::CollectingTypes;
    emitter.emit_preamble();

    emitter.state = BackendState::EmittingGlobals;
    log::trace!("emitting globals for `{}`", module.name);
    emitter.emit_globals()?;

    emitter.state = BackendState::EmittingFunctions;
    log::trace!("emitting {} function(s)", module.functions.functions.len());
    emitter.emit_functions()?;

    emitter.state = BackendState::Finalizing;
    let words = emitter.finalize();
    log::debug!("emitted {} words of SPIR-V {}.{}", words.len(), env.spv_major, env.spv_minor);
    Ok(words)
}

/// Whether control flow leaving `stmt` always ends at a terminator
/// (`OpReturn`/`OpReturnValue`/`OpKill`), so no implicit return is needed.
fn always_terminates(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Discard => true,
        StmtKind::Multi(stmts) => stmts.last().map(always_terminates).unwrap_or(false),
        StmtKind::Scoped(inner) => always_terminates(inner),
        _ => false,
    }
}

/// Opaque handle types (samplers, possibly aggregated into fixed arrays)
/// live in `UniformConstant` storage and are never Block-wrapped.
fn is_opaque(ty: &Type) -> bool {
    match ty {
        Type::Sampler { .. } => true,
        Type::Array { element_ty, .. } => is_opaque(element_ty),
        _ => false,
    }
}

fn check_no_recursion(module: &Module) -> BackendResult<()> {
    fn visit(module: &Module, index: FunctionIndex, stack: &mut FnvHashSet<FunctionIndex>) -> BackendResult<()> {
        if !stack.insert(index) {
            let name = module.functions.get(index).name.clone();
            return Err(BackendError::RecursiveFunction(name));
        }
        let mut callees = Vec::new();
        collect_calls(&module.functions.get(index).body, &mut callees);
        for callee in callees {
            visit(module, callee, stack)?;
        }
        stack.remove(&index);
        Ok(())
    }

    fn collect_calls(stmt: &Stmt, out: &mut Vec<FunctionIndex>) {
        struct Scan<'a> {
            out: &'a mut Vec<FunctionIndex>,
        }
        impl slc_ast::ExprVisitor for Scan<'_> {
            fn visit_call_function(&mut self, callee: &Expr, _args: &[Expr]) {
                if let ExprKind::Function(index) = &callee.kind {
                    self.out.push(*index);
                }
            }
        }
        impl slc_ast::StmtVisitor for Scan<'_> {
            fn visit_embedded_expr(&mut self, expr: &Expr) {
                slc_ast::walk_expr(self, expr);
            }
        }
        let mut scan = Scan { out };
        slc_ast::walk_stmt(&mut scan, stmt);
    }

    for index in 0..module.functions.functions.len() as FunctionIndex {
        visit(module, index, &mut FnvHashSet::default())?;
    }
    Ok(())
}

struct Emitter<'a> {
    module: &'a Module,
    env: &'a SpirvEnvironment,
    state: BackendState,
    ids: IdAllocator,
    types: TypeTable<'a>,
    consts: ConstantTable,
    capabilities: SectionBuffer,
    ext_inst_import: SectionBuffer,
    memory_model: SectionBuffer,
    entry_points: SectionBuffer,
    execution_modes: SectionBuffer,
    debug: SectionBuffer,
    annotations: SectionBuffer,
    functions: SectionBuffer,
    vars: FnvHashMap<VarIndex, (u32, StorageClass, Type)>,
    func_ids: FnvHashMap<FunctionIndex, u32>,
    func_ty_ids: FnvHashMap<FunctionIndex, u32>,
    fn_type_cache: FnvHashMap<(u32, Vec<u32>), u32>,
    stride_decorated: FnvHashSet<u32>,
    interface: Vec<u32>,
    next_fallback_location: u32,
}
impl<'a> Emitter<'a> {
    fn new(module: &'a Module, env: &'a SpirvEnvironment) -> Self {
        Emitter {
            module,
            env,
            state: BackendState::Idle,
            ids: IdAllocator::new(),
            types: TypeTable::new(&module.structs),
            consts: ConstantTable::default(),
            capabilities: SectionBuffer::default(),
            ext_inst_import: SectionBuffer::default(),
            memory_model: SectionBuffer::default(),
            entry_points: SectionBuffer::default(),
            execution_modes: SectionBuffer::default(),
            debug: SectionBuffer::default(),
            annotations: SectionBuffer::default(),
            functions: SectionBuffer::default(),
            vars: FnvHashMap::default(),
            func_ids: FnvHashMap::default(),
            func_ty_ids: FnvHashMap::default(),
            fn_type_cache: FnvHashMap::default(),
            stride_decorated: FnvHashSet::default(),
            interface: Vec::new(),
            next_fallback_location: 64,
        }
    }

    fn emit_preamble(&mut self) {
        self.capabilities.emit(InstructionBuilder::new(Op::Capability).push(spirv::Capability::Shader as u32).build());
        let glsl_std = self.ids.alloc();
        self.ext_inst_import
            .emit(InstructionBuilder::new(Op::ExtInstImport).push(glsl_std).push_str("GLSL.std.450").build());
        self.memory_model.emit(
            InstructionBuilder::new(Op::MemoryModel)
                .push(AddressingModel::Logical as u32)
                .push(MemoryModel::GLSL450 as u32)
                .build(),
        );
    }

    fn emit_globals(&mut self) -> BackendResult<()> {
        for var_index in 0..self.module.variables.variables.len() as VarIndex {
            let slot = self.module.variables.get(var_index);
            match &slot.kind {
                VariableKind::Local | VariableKind::Parameter => continue,
                VariableKind::StageInput { location } => {
                    self.emit_interface_var(var_index, &slot.ty, StorageClass::Input, Some(*location), None)?;
                }
                VariableKind::StageOutput { location } => {
                    self.emit_interface_var(var_index, &slot.ty, StorageClass::Output, Some(*location), None)?;
                }
                VariableKind::Builtin(BuiltinVar::Position) => {
                    self.emit_interface_var(var_index, &slot.ty, StorageClass::Output, None, Some(BuiltIn::Position))?;
                }
                VariableKind::Builtin(b) => {
                    let builtin = match b {
                        BuiltinVar::FragCoord => BuiltIn::FragCoord,
                        BuiltinVar::VertexIndex => BuiltIn::VertexIndex,
                        BuiltinVar::InstanceIndex => BuiltIn::InstanceIndex,
                        BuiltinVar::Position => unreachable!(),
                    };
                    self.emit_interface_var(var_index, &slot.ty, StorageClass::Input, None, Some(builtin))?;
                }
                VariableKind::DrawParameterFallback(_) => {
                    // Emulated as an extra vertex-input attribute when the
                    // target has no native draw-parameter built-in.
                    let location = self.next_fallback_location;
                    self.next_fallback_location += 1;
                    self.emit_interface_var(var_index, &slot.ty, StorageClass::Input, Some(location), None)?;
                }
                VariableKind::External { block, binding_index } => {
                    self.emit_external_var(var_index, *block, *binding_index)?;
                }
            }
        }
        Ok(())
    }

    fn emit_interface_var(
        &mut self,
        var_index: VarIndex,
        ty: &Type,
        storage_class: StorageClass,
        location: Option<u32>,
        builtin: Option<BuiltIn>,
    ) -> BackendResult<u32> {
        let pointer_id = self.types.emit_pointer(&mut self.ids, TypeKey::Plain(ty.clone()), storage_class)?;
        let id = self.ids.alloc();
        self.emit_module_var(id, pointer_id, storage_class);
        if let Some(location) = location {
            decorate_with_literal(&mut self.annotations, id, Decoration::Location, location);
        }
        if let Some(builtin) = builtin {
            decorate_with_literal(&mut self.annotations, id, Decoration::BuiltIn, builtin as u32);
        }
        self.vars.insert(var_index, (id, storage_class, ty.clone()));
        self.interface.push(id);
        Ok(id)
    }

    /// Module-scope `OpVariable`s live in the types/constants/globals
    /// section, not the function section — they must exist before the
    /// functions that reference them.
    fn emit_module_var(&mut self, id: u32, pointer_ty: u32, storage_class: StorageClass) {
        self.types.section.emit(
            InstructionBuilder::new(Op::Variable).push(pointer_ty).push(id).push(storage_class as u32).build(),
        );
    }

    fn emit_external_var(
        &mut self,
        var_index: VarIndex,
        block_index: slc_ast::ExternalBlockIndex,
        binding_index: usize,
    ) -> BackendResult<u32> {
        let block = self.module.externals.get(block_index);
        let binding = &block.bindings[binding_index];

        // Samplers (and fixed arrays of samplers) are opaque handles: they
        // get a `UniformConstant` variable and `(set, binding)` decorations,
        // but no Block wrapper.
        if is_opaque(&binding.ty) {
            let binding = binding.clone();
            let set = block.set;
            let pointer_id = self.types.emit_pointer(
                &mut self.ids,
                TypeKey::Plain(binding.ty.clone()),
                StorageClass::UniformConstant,
            )?;
            let id = self.ids.alloc();
            self.emit_module_var(id, pointer_id, StorageClass::UniformConstant);
            if let (Some(set), Some(binding_num)) = (set, binding.binding) {
                decorate_binding(&mut self.annotations, id, set, binding_num);
            }
            self.vars.insert(var_index, (id, StorageClass::UniformConstant, binding.ty.clone()));
            return Ok(id);
        }

        let struct_index = binding.ty.wrapped_struct().ok_or(BackendError::PrimitiveExternalNotSupported)?;

        let storage_class = match &binding.ty {
            Type::Uniform(_) => StorageClass::Uniform,
            Type::PushConstant(_) => StorageClass::PushConstant,
            Type::Storage { .. } => {
                if self.env.uses_storage_buffer_class() {
                    StorageClass::StorageBuffer
                } else {
                    StorageClass::Uniform
                }
            }
            _ => return Err(BackendError::PrimitiveExternalNotSupported),
        };
        let block_decoration = match (&binding.ty, self.env.uses_storage_buffer_class()) {
            (Type::Storage { .. }, false) => Decoration::BufferBlock,
            _ => Decoration::Block,
        };

        let struct_id = self.types.emit_block_wrapped(&mut self.ids, struct_index, storage_class)?;
        let decl = self.module.structs.get(struct_index);
        let std140 = !matches!(decl.layout, slc_ast::module::Layout::Std430);
        decorate_block_struct(&mut self.annotations, struct_id, decl, block_decoration);
        self.decorate_array_strides(struct_index, std140);

        let pointer_id =
            self.types.emit_pointer(&mut self.ids, TypeKey::BlockWrapped(struct_index, storage_class), storage_class)?;
        let id = self.ids.alloc();
        self.emit_module_var(id, pointer_id, storage_class);
        if let (Some(set), Some(binding_num)) = (block.set, binding.binding) {
            decorate_binding(&mut self.annotations, id, set, binding_num);
        }
        self.vars.insert(var_index, (id, storage_class, binding.ty.clone()));
        Ok(id)
    }

    /// `ArrayStride` targets the array type itself. Member types were just
    /// registered by the block-wrapped struct emission, so their IDs are in
    /// the type table; each gets its stride decoration at most once.
    fn decorate_array_strides(&mut self, struct_index: slc_ast::StructIndex, std140: bool) {
        let decl = self.module.structs.get(struct_index);
        for member in &decl.members {
            if let Type::Array { element_ty, .. } = &member.ty {
                let Some(array_ty_id) = self.types.id_of(&TypeKey::Plain(member.ty.clone())) else {
                    continue;
                };
                if self.stride_decorated.insert(array_ty_id) {
                    let stride = slc_ast::layout::array_stride(element_ty, std140);
                    decorate_with_literal(&mut self.annotations, array_ty_id, Decoration::ArrayStride, stride);
                }
            }
        }
    }

    fn emit_functions(&mut self) -> BackendResult<()> {
        // Pre-allocate every function's result ID and `OpTypeFunction` so
        // calls can reference a callee emitted later in module order.
        for index in 0..self.module.functions.functions.len() as FunctionIndex {
            let decl = self.module.functions.get(index);
            let ret_ty = self.types.emit(&mut self.ids, &decl.ret_ty)?;
            let param_tys: Vec<u32> = decl
                .params
                .iter()
                .map(|p| self.types.emit(&mut self.ids, &p.ty))
                .collect::<BackendResult<_>>()?;
            let fn_ty_id = self.get_or_create_fn_type(ret_ty, &param_tys);
            let fn_id = self.ids.alloc();
            self.func_ids.insert(index, fn_id);
            self.func_ty_ids.insert(index, fn_ty_id);
        }

        for index in 0..self.module.functions.functions.len() as FunctionIndex {
            self.emit_one_function(index)?;
        }
        Ok(())
    }

    fn get_or_create_fn_type(&mut self, ret: u32, params: &[u32]) -> u32 {
        let key = (ret, params.to_vec());
        if let Some(&id) = self.fn_type_cache.get(&key) {
            return id;
        }
        let id = self.ids.alloc();
        self.types
            .section
            .emit(InstructionBuilder::new(Op::TypeFunction).push(id).push(ret).push_list(params).build());
        self.fn_type_cache.insert(key, id);
        id
    }

    fn emit_one_function(&mut self, index: FunctionIndex) -> BackendResult<()> {
        let decl = self.module.functions.get(index).clone();
        let fn_id = self.func_ids[&index];
        let fn_ty_id = self.func_ty_ids[&index];
        let ret_ty = self.types.emit(&mut self.ids, &decl.ret_ty)?;

        self.functions.emit(
            InstructionBuilder::new(Op::Function).push(ret_ty).push(fn_id).push(0).push(fn_ty_id).build(),
        );
        let mut param_values = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let param_ty = self.types.emit(&mut self.ids, &param.ty)?;
            let id = self.ids.alloc();
            self.functions.emit(InstructionBuilder::new(Op::FunctionParameter).push(param_ty).push(id).build());
            param_values.push(id);
        }

        let label = self.ids.alloc();
        self.functions.emit(InstructionBuilder::new(Op::Label).push(label).build());

        // Parameters arrive by value, but the body addresses every variable
        // through a pointer; each parameter is shadowed into a
        // `Function`-storage variable. All `OpVariable`s precede the stores
        // (block-leading variable rule).
        let mut locals = FnvHashMap::default();
        let mut param_ptrs = Vec::with_capacity(decl.params.len());
        for (param, &var_index) in decl.params.iter().zip(decl.param_vars.iter()) {
            let pointer_id =
                self.types.emit_pointer(&mut self.ids, TypeKey::Plain(param.ty.clone()), StorageClass::Function)?;
            let id = self.ids.alloc();
            self.functions.emit(
                InstructionBuilder::new(Op::Variable).push(pointer_id).push(id).push(StorageClass::Function as u32).build(),
            );
            locals.insert(var_index, (id, StorageClass::Function, param.ty.clone()));
            param_ptrs.push(id);
        }
        for (&ptr, &value) in param_ptrs.iter().zip(param_values.iter()) {
            self.functions.emit(InstructionBuilder::new(Op::Store).push(ptr).push(value).build());
        }

        let mut body = FunctionBody { emitter: &mut *self, locals };
        body.lower_stmt(&decl.body)?;
        // A block may have exactly one terminator; only fall-through bodies
        // get the implicit `OpReturn`.
        if decl.ret_ty == Type::NoType && !always_terminates(&decl.body) {
            self.functions.emit(InstructionBuilder::new(Op::Return).build());
        }
        self.functions.emit(InstructionBuilder::new(Op::FunctionEnd).build());

        if let Some(entry) = &decl.entry_point {
            self.emit_entry_point_decl(fn_id, &decl, entry.stage);
        }
        Ok(())
    }

    fn emit_entry_point_decl(&mut self, fn_id: u32, decl: &FunctionDecl, stage: Option<ShaderStage>) {
        let model = match stage {
            Some(ShaderStage::Vertex) => ExecutionModel::Vertex,
            Some(ShaderStage::Fragment) => ExecutionModel::Fragment,
            Some(ShaderStage::Geometry) => ExecutionModel::Geometry,
            Some(ShaderStage::Compute) | None => ExecutionModel::GLCompute,
        };
        self.entry_points.emit(
            InstructionBuilder::new(Op::EntryPoint)
                .push(model as u32)
                .push(fn_id)
                .push_str(&decl.name)
                .push_list(&self.interface)
                .build(),
        );
        if matches!(stage, Some(ShaderStage::Fragment)) {
            self.execution_modes.emit(
                InstructionBuilder::new(Op::ExecutionMode).push(fn_id).push(ExecutionMode::OriginUpperLeft as u32).build(),
            );
        }
        if matches!(stage, Some(ShaderStage::Compute)) {
            let (x, y, z) = decl
                .entry_point
                .as_ref()
                .and_then(|e| e.workgroup_size)
                .unwrap_or((1, 1, 1));
            self.execution_modes.emit(
                InstructionBuilder::new(Op::ExecutionMode)
                    .push(fn_id)
                    .push(ExecutionMode::LocalSize as u32)
                    .push(x)
                    .push(y)
                    .push(z)
                    .build(),
            );
        }
    }

    fn finalize(&mut self) -> Vec<u32> {
        self.state = BackendState::Done;
        let mut words = Vec::new();
        let bound = self.ids.bound();
        words.extend_from_slice(&crate::instr::SpirvHeader::new(self.env.spv_major, self.env.spv_minor, bound).words());
        for section in [
            &self.capabilities,
            &self.ext_inst_import,
            &self.memory_model,
            &self.entry_points,
            &self.execution_modes,
            &self.debug,
            &self.annotations,
            &self.types.section,
            &self.functions,
        ] {
            words.extend_from_slice(section.words());
        }
        words
    }
}

/// Per-function lowering state: the parent emitter plus this function's
/// local variable table (parameters and `DeclareVariable`/`DeclareConst`
/// locals), since locals don't survive past one function the way module
/// variables do.
struct FunctionBody<'a, 'b> {
    emitter: &'a mut Emitter<'b>,
    locals: FnvHashMap<VarIndex, (u32, StorageClass, Type)>,
}
impl FunctionBody<'_, '_> {
    fn var_entry(&self, index: VarIndex) -> BackendResult<(u32, StorageClass, Type)> {
        self.locals
            .get(&index)
            .or_else(|| self.emitter.vars.get(&index))
            .cloned()
            .ok_or_else(|| BackendError::Unsupported(format!("variable #{index} was never materialized")))
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> BackendResult<()> {
        match &stmt.kind {
            StmtKind::Multi(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Scoped(inner) => self.lower_stmt(inner),
            StmtKind::DeclareVariable { ty, initializer, index, .. } => {
                let ty = ty
                    .clone()
                    .or_else(|| initializer.as_ref().and_then(|e| e.ty.clone()))
                    .unwrap_or(Type::NoType);
                self.declare_local(ty, initializer.as_ref(), *index)
            }
            StmtKind::DeclareConst { ty, value, index, .. } => {
                let ty = ty.clone().or_else(|| value.ty.clone()).unwrap_or(Type::NoType);
                self.declare_local(ty, Some(value), *index)
            }
            StmtKind::DeclareOption { ty, default, index, .. } => {
                self.declare_local(ty.clone(), default.as_ref(), *index)
            }
            StmtKind::Expression(expr) => {
                if let ExprKind::Assign { target, value } = &expr.kind {
                    self.lower_assign(target, value)
                } else {
                    self.lower_value(expr).map(|_| ())
                }
            }
            StmtKind::Return(Some(value)) => {
                let (id, _ty) = self.lower_value(value)?;
                self.emitter.functions.emit(InstructionBuilder::new(Op::ReturnValue).push(id).build());
                Ok(())
            }
            StmtKind::Return(None) => {
                self.emitter.functions.emit(InstructionBuilder::new(Op::Return).build());
                Ok(())
            }
            StmtKind::Discard => {
                self.emitter.functions.emit(InstructionBuilder::new(Op::Kill).build());
                Ok(())
            }
            StmtKind::Branch { cond, then_branch, else_branch } => {
                let (cond_id, _) = self.lower_value(cond)?;
                let then_label = self.emitter.ids.alloc();
                let merge_label = self.emitter.ids.alloc();
                let else_label = if else_branch.is_some() { self.emitter.ids.alloc() } else { merge_label };

                self.emitter.functions.emit(InstructionBuilder::new(Op::SelectionMerge).push(merge_label).push(0).build());
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::BranchConditional).push(cond_id).push(then_label).push(else_label).build(),
                );
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(then_label).build());
                self.lower_stmt(then_branch)?;
                self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(merge_label).build());
                if let Some(else_branch) = else_branch {
                    self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(else_label).build());
                    self.lower_stmt(else_branch)?;
                    self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(merge_label).build());
                }
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(merge_label).build());
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let header = self.emitter.ids.alloc();
                let merge = self.emitter.ids.alloc();
                let continue_target = self.emitter.ids.alloc();
                let body_label = self.emitter.ids.alloc();
                let check_label = self.emitter.ids.alloc();

                self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(header).build());
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(header).build());
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::LoopMerge).push(merge).push(continue_target).push(0).build(),
                );
                self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(check_label).build());
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(check_label).build());
                let (cond_id, _) = self.lower_value(cond)?;
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::BranchConditional).push(cond_id).push(body_label).push(merge).build(),
                );
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(body_label).build());
                self.lower_stmt(body)?;
                self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(continue_target).build());
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(continue_target).build());
                self.emitter.functions.emit(InstructionBuilder::new(Op::Branch).push(header).build());
                self.emitter.functions.emit(InstructionBuilder::new(Op::Label).push(merge).build());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn declare_local(&mut self, ty: Type, initializer: Option<&Expr>, index: Option<VarIndex>) -> BackendResult<()> {
        let Some(index) = index else { return Ok(()) };
        if ty.is_runtime_array() {
            return Err(BackendError::RuntimeArrayMisplaced);
        }
        let pointer_id =
            self.emitter.types.emit_pointer(&mut self.emitter.ids, TypeKey::Plain(ty.clone()), StorageClass::Function)?;
        let id = self.emitter.ids.alloc();
        self.emitter.functions.emit(
            InstructionBuilder::new(Op::Variable).push(pointer_id).push(id).push(StorageClass::Function as u32).build(),
        );
        self.locals.insert(index, (id, StorageClass::Function, ty.clone()));
        if let Some(init) = initializer {
            // Initializing from a Block-decorated buffer is a struct copy
            // like any other; the same per-member policy applies.
            if let Some(struct_index) = ty.as_struct() {
                if self.roots_in_block_storage(init) {
                    let (src_ptr, src_class, _) = self.lower_pointer(init)?;
                    return self.copy_struct_members(id, StorageClass::Function, src_ptr, src_class, struct_index);
                }
            }
            let (value_id, _) = self.lower_value(init)?;
            self.emitter.functions.emit(InstructionBuilder::new(Op::Store).push(id).push(value_id).build());
        }
        Ok(())
    }

    /// Statement-position assignment, where the struct copy policy applies:
    /// a struct fetched out of a Block-decorated buffer is a different
    /// SPIR-V type than the same struct in `Function` storage, so it has to
    /// be copied member by member; two pointers of identical type take a
    /// single `OpLoad`/`OpStore` pair.
    fn lower_assign(&mut self, target: &Expr, value: &Expr) -> BackendResult<()> {
        let assigned_ty = value.ty.as_ref().or(target.ty.as_ref());
        let struct_index = assigned_ty.and_then(Type::as_struct);
        if let Some(struct_index) = struct_index {
            if self.roots_in_block_storage(value) != self.roots_in_block_storage(target) {
                let (src_ptr, src_class, _) = self.lower_pointer(value)?;
                let (dst_ptr, dst_class, _) = self.lower_pointer(target)?;
                return self.copy_struct_members(dst_ptr, dst_class, src_ptr, src_class, struct_index);
            }
        }
        let (value_id, _) = self.lower_value(value)?;
        let (ptr, _, _) = self.lower_pointer(target)?;
        self.emitter.functions.emit(InstructionBuilder::new(Op::Store).push(ptr).push(value_id).build());
        Ok(())
    }

    /// Whether `expr` is an lvalue chain whose root variable lives in a
    /// Block-decorated storage class (uniform/storage/push-constant).
    fn roots_in_block_storage(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::VariableValue(index) => self
                .var_entry(*index)
                .map(|(_, storage_class, _)| {
                    matches!(
                        storage_class,
                        StorageClass::Uniform | StorageClass::StorageBuffer | StorageClass::PushConstant
                    )
                })
                .unwrap_or(false),
            ExprKind::AccessIdentifier { base: Some(base), .. } => self.roots_in_block_storage(base),
            ExprKind::AccessIndex { base, .. } => self.roots_in_block_storage(base),
            _ => false,
        }
    }

    fn copy_struct_members(
        &mut self,
        dst_ptr: u32,
        dst_class: StorageClass,
        src_ptr: u32,
        src_class: StorageClass,
        struct_index: slc_ast::StructIndex,
    ) -> BackendResult<()> {
        let member_count = self.emitter.module.structs.get(struct_index).members.len();
        for member_index in 0..member_count {
            let member_ty = self.emitter.module.structs.get(struct_index).members[member_index].ty.clone();
            let index_const = self.const_u32(member_index as u32)?;
            let src_member_ptr_ty =
                self.emitter.types.emit_pointer(&mut self.emitter.ids, TypeKey::Plain(member_ty.clone()), src_class)?;
            let src_member = self.emitter.ids.alloc();
            self.emitter.functions.emit(
                InstructionBuilder::new(Op::AccessChain)
                    .push(src_member_ptr_ty)
                    .push(src_member)
                    .push(src_ptr)
                    .push(index_const)
                    .build(),
            );
            let member_ty_id = self.emitter.types.emit(&mut self.emitter.ids, &member_ty)?;
            let loaded = self.emitter.ids.alloc();
            self.emitter
                .functions
                .emit(InstructionBuilder::new(Op::Load).push(member_ty_id).push(loaded).push(src_member).build());
            let dst_member_ptr_ty =
                self.emitter.types.emit_pointer(&mut self.emitter.ids, TypeKey::Plain(member_ty), dst_class)?;
            let dst_member = self.emitter.ids.alloc();
            self.emitter.functions.emit(
                InstructionBuilder::new(Op::AccessChain)
                    .push(dst_member_ptr_ty)
                    .push(dst_member)
                    .push(dst_ptr)
                    .push(index_const)
                    .build(),
            );
            self.emitter.functions.emit(InstructionBuilder::new(Op::Store).push(dst_member).push(loaded).build());
        }
        Ok(())
    }

    /// Lowers an lvalue to its pointer ID, storage class and pointee type —
    /// the shared core of `Assign` targets and any chained
    /// `AccessIndex`/`AccessIdentifier` sequence, which folds into a single
    /// `OpAccessChain`.
    fn lower_pointer(&mut self, expr: &Expr) -> BackendResult<(u32, StorageClass, Type)> {
        match &expr.kind {
            ExprKind::VariableValue(index) => self.var_entry(*index),
            ExprKind::AccessIndex { base, index } => {
                let (base_ptr, storage_class, base_ty) = self.lower_pointer(base)?;
                let (index_id, _) = self.lower_value(index)?;
                let element_ty = match &base_ty {
                    Type::Array { element_ty, .. } => (**element_ty).clone(),
                    Type::Vector { scalar, .. } => Type::Primitive(*scalar),
                    Type::Matrix { scalar, rows, .. } => Type::Vector { scalar: *scalar, len: *rows },
                    other => other.clone(),
                };
                let pointer_id =
                    self.emitter.types.emit_pointer(&mut self.emitter.ids, TypeKey::Plain(element_ty.clone()), storage_class)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::AccessChain).push(pointer_id).push(id).push(base_ptr).push(index_id).build(),
                );
                Ok((id, storage_class, element_ty))
            }
            ExprKind::AccessIdentifier { base: Some(base), member } => {
                let (base_ptr, storage_class, base_ty) = self.lower_pointer(base)?;
                let struct_index = base_ty
                    .wrapped_struct()
                    .ok_or_else(|| BackendError::Unsupported(format!("`.{member}` on a non-struct type")))?;
                let decl = self.emitter.module.structs.get(struct_index);
                let member_index = decl
                    .member_index(member)
                    .ok_or_else(|| BackendError::Unsupported(format!("unknown member `{member}`")))?;
                let member_ty = decl.members[member_index].ty.clone();
                let index_const = self.const_u32(member_index as u32)?;
                let pointer_id =
                    self.emitter.types.emit_pointer(&mut self.emitter.ids, TypeKey::Plain(member_ty.clone()), storage_class)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::AccessChain).push(pointer_id).push(id).push(base_ptr).push(index_const).build(),
                );
                Ok((id, storage_class, member_ty))
            }
            other => Err(BackendError::Unsupported(format!("{other:?} is not an lvalue"))),
        }
    }

    fn const_u32(&mut self, value: u32) -> BackendResult<u32> {
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, &Type::Primitive(PrimitiveType::U32))?;
        Ok(self.emitter.consts.emit(&mut self.emitter.ids, &mut self.emitter.types.section, type_id, &ConstValue::U32(value)))
    }

    /// Lowers an expression to a value ID plus its type.
    fn lower_value(&mut self, expr: &Expr) -> BackendResult<(u32, Type)> {
        let ty = expr.ty.clone().unwrap_or(Type::NoType);
        match &expr.kind {
            ExprKind::ConstantValue(value) => {
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
                let id = self.emitter.consts.emit(&mut self.emitter.ids, &mut self.emitter.types.section, type_id, value);
                Ok((id, ty))
            }
            ExprKind::VariableValue(_) | ExprKind::AccessIndex { .. } => {
                let (ptr, _, pointee_ty) = self.lower_pointer(expr)?;
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &pointee_ty)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(InstructionBuilder::new(Op::Load).push(type_id).push(id).push(ptr).build());
                Ok((id, pointee_ty))
            }
            ExprKind::AccessIdentifier { base: Some(base), member } => {
                if matches!(base.ty, Some(Type::Sampler { .. })) {
                    return self.lower_method_placeholder(base, member, expr);
                }
                let (ptr, _, pointee_ty) = self.lower_pointer(expr)?;
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &pointee_ty)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(InstructionBuilder::new(Op::Load).push(type_id).push(id).push(ptr).build());
                Ok((id, pointee_ty))
            }
            ExprKind::AccessIdentifier { base: None, member } => {
                Err(BackendError::Unsupported(format!("unresolved identifier `{member}`")))
            }
            ExprKind::Assign { target, value } => {
                let (value_id, value_ty) = self.lower_value(value)?;
                let (ptr, _, _) = self.lower_pointer(target)?;
                self.emitter.functions.emit(InstructionBuilder::new(Op::Store).push(ptr).push(value_id).build());
                Ok((value_id, value_ty))
            }
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, ty),
            ExprKind::Unary { op, value } => self.lower_unary(*op, value, ty),
            ExprKind::Swizzle { base, components } => self.lower_swizzle(base, components, ty),
            ExprKind::Cast { target_ty, args } => self.lower_cast(target_ty, args),
            ExprKind::CallFunction { callee, args } => self.lower_call(callee, args, ty),
            other => Err(BackendError::Unsupported(format!("{other:?} is not directly lowerable to a value"))),
        }
    }

    fn lower_method_placeholder(&mut self, _base: &Expr, _member: &str, expr: &Expr) -> BackendResult<(u32, Type)> {
        // `.Sample`/`.Size` resolve to an `Intrinsic` callee once wrapped in
        // a `CallFunction` (see `lower_call`); bare member access on a
        // sampler never reaches the back end in a sanitized module.
        Err(BackendError::Unsupported(format!("{:?} cannot be loaded directly", expr.kind)))
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, ty: Type) -> BackendResult<(u32, Type)> {
        let (lhs_id, lhs_ty) = self.lower_value(lhs)?;
        let (rhs_id, _) = self.lower_value(rhs)?;
        let is_float = matches!(
            lhs_ty,
            Type::Primitive(PrimitiveType::F32)
                | Type::Primitive(PrimitiveType::F64)
                | Type::Vector { scalar: PrimitiveType::F32, .. }
        );
        let is_unsigned =
            matches!(lhs_ty, Type::Primitive(PrimitiveType::U32) | Type::Vector { scalar: PrimitiveType::U32, .. });
        let opcode = match (op, is_float, is_unsigned) {
            (BinaryOp::Add, true, _) => Op::FAdd,
            (BinaryOp::Add, false, _) => Op::IAdd,
            (BinaryOp::Sub, true, _) => Op::FSub,
            (BinaryOp::Sub, false, _) => Op::ISub,
            (BinaryOp::Mul, true, _) => Op::FMul,
            (BinaryOp::Mul, false, _) => Op::IMul,
            (BinaryOp::Div, true, _) => Op::FDiv,
            (BinaryOp::Div, false, true) => Op::UDiv,
            (BinaryOp::Div, false, false) => Op::SDiv,
            (BinaryOp::Mod, true, _) => Op::FMod,
            (BinaryOp::Mod, false, true) => Op::UMod,
            (BinaryOp::Mod, false, false) => Op::SMod,
            (BinaryOp::And, ..) => Op::LogicalAnd,
            (BinaryOp::Or, ..) => Op::LogicalOr,
            (BinaryOp::Eq, true, _) => Op::FOrdEqual,
            (BinaryOp::Eq, false, _) => Op::IEqual,
            (BinaryOp::Ne, true, _) => Op::FOrdNotEqual,
            (BinaryOp::Ne, false, _) => Op::INotEqual,
            (BinaryOp::Lt, true, _) => Op::FOrdLessThan,
            (BinaryOp::Lt, false, true) => Op::ULessThan,
            (BinaryOp::Lt, false, false) => Op::SLessThan,
            (BinaryOp::Le, true, _) => Op::FOrdLessThanEqual,
            (BinaryOp::Le, false, true) => Op::ULessThanEqual,
            (BinaryOp::Le, false, false) => Op::SLessThanEqual,
            (BinaryOp::Gt, true, _) => Op::FOrdGreaterThan,
            (BinaryOp::Gt, false, true) => Op::UGreaterThan,
            (BinaryOp::Gt, false, false) => Op::SGreaterThan,
            (BinaryOp::Ge, true, _) => Op::FOrdGreaterThanEqual,
            (BinaryOp::Ge, false, true) => Op::UGreaterThanEqual,
            (BinaryOp::Ge, false, false) => Op::SGreaterThanEqual,
        };
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
        let id = self.emitter.ids.alloc();
        self.emitter.functions.emit(InstructionBuilder::new(opcode).push(type_id).push(id).push(lhs_id).push(rhs_id).build());
        Ok((id, ty))
    }

    fn lower_unary(&mut self, op: UnaryOp, value: &Expr, ty: Type) -> BackendResult<(u32, Type)> {
        let (value_id, value_ty) = self.lower_value(value)?;
        let is_float = matches!(value_ty, Type::Primitive(PrimitiveType::F32) | Type::Primitive(PrimitiveType::F64));
        let opcode = match (op, is_float) {
            (UnaryOp::Neg, true) => Op::FNegate,
            (UnaryOp::Neg, false) => Op::SNegate,
            (UnaryOp::Not, _) => Op::LogicalNot,
        };
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
        let id = self.emitter.ids.alloc();
        self.emitter.functions.emit(InstructionBuilder::new(opcode).push(type_id).push(id).push(value_id).build());
        Ok((id, ty))
    }

    fn lower_swizzle(&mut self, base: &Expr, components: &[u8], ty: Type) -> BackendResult<(u32, Type)> {
        let (base_id, _) = self.lower_value(base)?;
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
        let id = self.emitter.ids.alloc();
        if components.len() == 1 {
            self.emitter.functions.emit(
                InstructionBuilder::new(Op::CompositeExtract)
                    .push(type_id)
                    .push(id)
                    .push(base_id)
                    .push(components[0] as u32)
                    .build(),
            );
        } else {
            let literals: Vec<u32> = components.iter().map(|&c| c as u32).collect();
            self.emitter.functions.emit(
                InstructionBuilder::new(Op::VectorShuffle)
                    .push(type_id)
                    .push(id)
                    .push(base_id)
                    .push(base_id)
                    .push_list(&literals)
                    .build(),
            );
        }
        Ok((id, ty))
    }

    fn lower_cast(&mut self, target_ty: &Type, args: &[Expr]) -> BackendResult<(u32, Type)> {
        let values: Vec<(u32, Type)> = args.iter().map(|a| self.lower_value(a)).collect::<BackendResult<_>>()?;
        if let (1, Some(to)) = (values.len(), target_ty.as_primitive()) {
            if let Some(from) = values[0].1.as_primitive() {
                return self.lower_scalar_conversion(values[0].0, from, to);
            }
        }
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, target_ty)?;
        let id = self.emitter.ids.alloc();
        let operands: Vec<u32> = values.iter().map(|(id, _)| *id).collect();
        self.emitter.functions.emit(
            InstructionBuilder::new(Op::CompositeConstruct).push(type_id).push(id).push_list(&operands).build(),
        );
        Ok((id, target_ty.clone()))
    }

    fn lower_scalar_conversion(&mut self, value_id: u32, from: PrimitiveType, to: PrimitiveType) -> BackendResult<(u32, Type)> {
        use PrimitiveType::*;
        let target_ty = Type::Primitive(to);
        if from == to {
            return Ok((value_id, target_ty));
        }
        let opcode = match (from, to) {
            (I32, F32) | (I32, F64) => Op::ConvertSToF,
            (U32, F32) | (U32, F64) => Op::ConvertUToF,
            (F32, I32) | (F64, I32) => Op::ConvertFToS,
            (F32, U32) | (F64, U32) => Op::ConvertFToU,
            (F32, F64) | (F64, F32) => Op::FConvert,
            (I32, U32) | (U32, I32) => Op::Bitcast,
            _ => return Err(BackendError::Unsupported(format!("cannot convert {from} to {to}"))),
        };
        let type_id = self.emitter.types.emit(&mut self.emitter.ids, &target_ty)?;
        let id = self.emitter.ids.alloc();
        self.emitter.functions.emit(InstructionBuilder::new(opcode).push(type_id).push(id).push(value_id).build());
        Ok((id, target_ty))
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Expr], ty: Type) -> BackendResult<(u32, Type)> {
        match &callee.kind {
            ExprKind::Function(index) => {
                let fn_id = self.emitter.func_ids[index];
                let arg_values: Vec<u32> =
                    args.iter().map(|a| self.lower_value(a).map(|(id, _)| id)).collect::<BackendResult<_>>()?;
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::FunctionCall).push(type_id).push(id).push(fn_id).push_list(&arg_values).build(),
                );
                Ok((id, ty))
            }
            ExprKind::Intrinsic(IntrinsicId::ArrayLength) => {
                let (base_ptr, _, _) = self.lower_pointer(&args[0])?;
                let member_index = match &args[1].kind {
                    ExprKind::ConstantValue(ConstValue::U32(n)) => *n,
                    _ => return Err(BackendError::Unsupported("ArrayLength expects a constant member index".to_owned())),
                };
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &Type::Primitive(PrimitiveType::U32))?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::ArrayLength).push(type_id).push(id).push(base_ptr).push(member_index).build(),
                );
                Ok((id, Type::Primitive(PrimitiveType::U32)))
            }
            ExprKind::Intrinsic(IntrinsicId::Sample) => {
                let (image_id, _) = self.lower_value(&args[0])?;
                let (coord_id, _) = self.lower_value(&args[1])?;
                let type_id = self.emitter.types.emit(&mut self.emitter.ids, &ty)?;
                let id = self.emitter.ids.alloc();
                self.emitter.functions.emit(
                    InstructionBuilder::new(Op::ImageSampleImplicitLod)
                        .push(type_id)
                        .push(id)
                        .push(image_id)
                        .push(coord_id)
                        .build(),
                );
                Ok((id, ty))
            }
            ExprKind::Intrinsic(IntrinsicId::BaseInstance | IntrinsicId::BaseVertex | IntrinsicId::DrawIndex) => {
                Err(BackendError::Unsupported(
                    "draw-parameter intrinsics must be legalized before back-end emission".to_owned(),
                ))
            }
            other => Err(BackendError::Unsupported(format!("{other:?} is not callable"))),
        }
    }
}

//! Module-level tables shared by every pass and back end.
use crate::stmt::Stmt;
use crate::ty::{AliasIndex, StructIndex, Type};
use fnv::FnvHashSet;

/// Stable index into [`Module::variables`], shared across locals,
/// parameters, hoisted stage inputs/outputs and external bindings,
/// disambiguated by [`VariableKind`] rather than by a separate index space
/// per kind.
pub type VarIndex = u32;
pub type FunctionIndex = u32;
pub type ExternalBlockIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PrimitiveExternals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Default,
    Std140,
    Std430,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    /// Resolved by the layout pass for std140/std430 structs; `None`
    /// otherwise.
    pub offset: Option<u32>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<StructMember>,
    pub layout: Layout,
    /// Total padded byte size, resolved by the layout pass.
    pub size: Option<u32>,
}
impl StructDecl {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
    pub fn has_runtime_array(&self) -> bool {
        self.members
            .last()
            .map(|m| m.ty.is_runtime_array())
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct StructTable {
    pub structs: Vec<StructDecl>,
}
impl StructTable {
    pub fn push(&mut self, decl: StructDecl) -> StructIndex {
        self.structs.push(decl);
        (self.structs.len() - 1) as StructIndex
    }
    pub fn get(&self, index: StructIndex) -> &StructDecl {
        &self.structs[index as usize]
    }
    pub fn get_mut(&mut self, index: StructIndex) -> &mut StructDecl {
        &mut self.structs[index as usize]
    }
    pub fn find_by_name(&self, name: &str) -> Option<StructIndex> {
        self.structs
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as StructIndex)
    }
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub name: String,
    pub ty: Type,
}
#[derive(Debug, Default)]
pub struct AliasTable {
    pub aliases: Vec<AliasDecl>,
}
impl AliasTable {
    pub fn push(&mut self, decl: AliasDecl) -> AliasIndex {
        self.aliases.push(decl);
        (self.aliases.len() - 1) as AliasIndex
    }
    pub fn get(&self, index: AliasIndex) -> &AliasDecl {
        &self.aliases[index as usize]
    }
    pub fn find_by_name(&self, name: &str) -> Option<AliasIndex> {
        self.aliases
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as AliasIndex)
    }
}

/// Tri-state `auto_binding` flag: explicit `true`/`false`, or
/// implicitly enabled when any binding in the block lacks `binding(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoBinding {
    Unset,
    Explicit(bool),
}
impl AutoBinding {
    pub fn resolved(&self, any_unbound: bool) -> bool {
        match self {
            AutoBinding::Explicit(b) => *b,
            AutoBinding::Unset => any_unbound,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalBinding {
    pub name: String,
    pub ty: Type,
    pub binding: Option<u32>,
    pub tag: Option<String>,
    /// `VarIndex` this binding materializes as, assigned once the binding
    /// pass (f) and scope resolution (b) have run.
    pub var_index: Option<VarIndex>,
}
#[derive(Debug, Clone)]
pub struct ExternalBlock {
    pub set: Option<u32>,
    pub auto_binding: AutoBinding,
    pub tag: Option<String>,
    pub bindings: Vec<ExternalBinding>,
}
#[derive(Debug, Default)]
pub struct ExternalTable {
    pub blocks: Vec<ExternalBlock>,
}
impl ExternalTable {
    pub fn push(&mut self, block: ExternalBlock) -> ExternalBlockIndex {
        self.blocks.push(block);
        (self.blocks.len() - 1) as ExternalBlockIndex
    }
    pub fn get(&self, index: ExternalBlockIndex) -> &ExternalBlock {
        &self.blocks[index as usize]
    }
    pub fn get_mut(&mut self, index: ExternalBlockIndex) -> &mut ExternalBlock {
        &mut self.blocks[index as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPointMetadata {
    pub stage: Option<ShaderStage>,
    pub workgroup_size: Option<(u32, u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub ret_ty: Type,
    pub body: Stmt,
    pub entry_point: Option<EntryPointMetadata>,
    /// `variables` slots backing each parameter, assigned by scope
    /// resolution; filled for every function, re-typed from `Parameter` to
    /// `StageInput`/`Builtin` for entry points by entry-point legalization.
    pub param_vars: Vec<VarIndex>,
    /// The hoisted output variable an entry point's `Return` is rewritten
    /// to assign into, assigned by entry-point legalization. `None` for
    /// non-entry
    /// points and for entry points returning `NoType`.
    pub output_var: Option<VarIndex>,
}
#[derive(Debug, Default)]
pub struct FunctionTable {
    pub functions: Vec<FunctionDecl>,
}
impl FunctionTable {
    pub fn push(&mut self, decl: FunctionDecl) -> FunctionIndex {
        self.functions.push(decl);
        (self.functions.len() - 1) as FunctionIndex
    }
    pub fn get(&self, index: FunctionIndex) -> &FunctionDecl {
        &self.functions[index as usize]
    }
    pub fn get_mut(&mut self, index: FunctionIndex) -> &mut FunctionDecl {
        &mut self.functions[index as usize]
    }
    pub fn find_by_name(&self, name: &str) -> Option<FunctionIndex> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|i| i as FunctionIndex)
    }
    pub fn entry_points(&self) -> impl Iterator<Item = (FunctionIndex, &FunctionDecl)> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.entry_point.is_some())
            .map(|(i, f)| (i as FunctionIndex, f))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinVar {
    Position,
    FragCoord,
    VertexIndex,
    InstanceIndex,
}

/// A draw-parameter intrinsic materialized as a named uniform because the
/// target environment disallows the native built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawParamKind {
    BaseInstance,
    BaseVertex,
    DrawIndex,
}

/// Disambiguates what a [`VarIndex`] slot represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Local,
    Parameter,
    StageInput { location: u32 },
    StageOutput { location: u32 },
    Builtin(BuiltinVar),
    DrawParameterFallback(DrawParamKind),
    External {
        block: ExternalBlockIndex,
        binding_index: usize,
    },
}

#[derive(Debug, Clone)]
pub struct VariableSlot {
    pub name: String,
    pub ty: Type,
    pub kind: VariableKind,
}

#[derive(Debug, Default)]
pub struct VariableTable {
    pub variables: Vec<VariableSlot>,
}
impl VariableTable {
    pub fn push(&mut self, slot: VariableSlot) -> VarIndex {
        self.variables.push(slot);
        (self.variables.len() - 1) as VarIndex
    }
    pub fn get(&self, index: VarIndex) -> &VariableSlot {
        &self.variables[index as usize]
    }
    pub fn get_mut(&mut self, index: VarIndex) -> &mut VariableSlot {
        &mut self.variables[index as usize]
    }
}

#[derive(Debug, Clone)]
pub struct ImportedModule {
    pub module_name: String,
    pub alias: String,
}

/// The 64-bit key external bindings are addressed by across back ends:
/// `(set << 32) | binding`. Back ends accept remap tables keyed this way to
/// rewrite descriptor bindings into flat GL uniform indices.
pub fn binding_key(set: u32, binding: u32) -> u64 {
    ((set as u64) << 32) | binding as u64
}

/// The module being compiled. The same shape is used before and after
/// sanitization: pre-sanitization, `variables`/struct offsets/binding
/// indices are empty or `None`; `slc_sanitize::sanitize` fills them in and
/// hands back a `SanitizedModule` wrapper so back ends can require that
/// stronger type (see `slc-sanitize`).
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub language_version: String,
    pub features: FnvHashSet<Feature>,
    pub imports: Vec<ImportedModule>,
    pub structs: StructTable,
    pub aliases: AliasTable,
    pub externals: ExternalTable,
    pub functions: FunctionTable,
    pub variables: VariableTable,
    pub body: Stmt,
}
impl Module {
    pub fn new(name: impl Into<String>, body: Stmt) -> Self {
        Module {
            name: name.into(),
            language_version: "1.0".to_owned(),
            features: FnvHashSet::default(),
            imports: Vec::new(),
            structs: StructTable::default(),
            aliases: AliasTable::default(),
            externals: ExternalTable::default(),
            functions: FunctionTable::default(),
            variables: VariableTable::default(),
            body,
        }
    }
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

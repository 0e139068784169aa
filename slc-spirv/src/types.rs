//! Type and constant tables: both deduplicated by structural
//! key, populated lazily as expression trees are visited type-first.
use fnv::FnvHashMap;
use slc_ast::{ConstValue, PrimitiveType, SamplerDim, StructDecl, StructIndex, StructTable, Type};
use spirv::{Dim, StorageClass};

use crate::error::{BackendError, BackendResult};
use crate::ids::IdAllocator;
use crate::instr::{InstructionBuilder, SectionBuffer};

/// A struct used as a `uniform`/`storage`/`push_constant` external gets a
/// SPIR-V type distinct from the same struct used as a plain value type,
/// since it carries `Block`/`BufferBlock` decorations the plain struct
/// doesn't.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Plain(Type),
    BlockWrapped(StructIndex, StorageClass),
    Pointer(Box<TypeKey>, StorageClass),
}

pub struct TypeTable<'a> {
    structs: &'a StructTable,
    by_key: FnvHashMap<TypeKey, u32>,
    pub section: SectionBuffer,
}
impl<'a> TypeTable<'a> {
    pub fn new(structs: &'a StructTable) -> Self {
        TypeTable { structs, by_key: FnvHashMap::default(), section: SectionBuffer::default() }
    }

    pub fn id_of(&self, key: &TypeKey) -> Option<u32> {
        self.by_key.get(key).copied()
    }

    pub fn emit(&mut self, ids: &mut IdAllocator, ty: &Type) -> BackendResult<u32> {
        self.emit_key(ids, TypeKey::Plain(ty.clone()))
    }

    pub fn emit_pointer(
        &mut self,
        ids: &mut IdAllocator,
        pointee: TypeKey,
        storage_class: StorageClass,
    ) -> BackendResult<u32> {
        let pointee_id = self.emit_key(ids, pointee.clone())?;
        let key = TypeKey::Pointer(Box::new(pointee), storage_class);
        if let Some(id) = self.by_key.get(&key) {
            return Ok(*id);
        }
        let id = ids.alloc();
        self.section.emit(
            InstructionBuilder::new(spirv::Op::TypePointer)
                .push(id)
                .push(storage_class as u32)
                .push(pointee_id)
                .build(),
        );
        self.by_key.insert(key, id);
        Ok(id)
    }

    pub fn emit_block_wrapped(
        &mut self,
        ids: &mut IdAllocator,
        struct_index: StructIndex,
        storage_class: StorageClass,
    ) -> BackendResult<u32> {
        self.emit_key(ids, TypeKey::BlockWrapped(struct_index, storage_class))
    }

    fn emit_key(&mut self, ids: &mut IdAllocator, key: TypeKey) -> BackendResult<u32> {
        if let Some(id) = self.by_key.get(&key) {
            return Ok(*id);
        }
        let id = match &key {
            TypeKey::Plain(ty) => self.emit_plain(ids, ty)?,
            TypeKey::BlockWrapped(struct_index, _storage_class) => {
                self.emit_struct_body(ids, *struct_index)?
            }
            TypeKey::Pointer(..) => unreachable!("pointers go through emit_pointer"),
        };
        self.by_key.insert(key, id);
        Ok(id)
    }

    fn emit_plain(&mut self, ids: &mut IdAllocator, ty: &Type) -> BackendResult<u32> {
        use spirv::Op;
        let id = match ty {
            Type::NoType => {
                let id = ids.alloc();
                self.section.emit(InstructionBuilder::new(Op::TypeVoid).push(id).build());
                id
            }
            Type::Primitive(PrimitiveType::Bool) => {
                let id = ids.alloc();
                self.section.emit(InstructionBuilder::new(Op::TypeBool).push(id).build());
                id
            }
            Type::Primitive(PrimitiveType::I32) => {
                let id = ids.alloc();
                self.section
                    .emit(InstructionBuilder::new(Op::TypeInt).push(id).push(32).push(1).build());
                id
            }
            Type::Primitive(PrimitiveType::U32) => {
                let id = ids.alloc();
                self.section
                    .emit(InstructionBuilder::new(Op::TypeInt).push(id).push(32).push(0).build());
                id
            }
            Type::Primitive(PrimitiveType::F32) => {
                let id = ids.alloc();
                self.section.emit(InstructionBuilder::new(Op::TypeFloat).push(id).push(32).build());
                id
            }
            Type::Primitive(PrimitiveType::F64) => {
                let id = ids.alloc();
                self.section.emit(InstructionBuilder::new(Op::TypeFloat).push(id).push(64).build());
                id
            }
            Type::Vector { scalar, len } => {
                let component = self.emit_key(ids, TypeKey::Plain(Type::Primitive(*scalar)))?;
                let id = ids.alloc();
                self.section.emit(
                    InstructionBuilder::new(Op::TypeVector)
                        .push(id)
                        .push(component)
                        .push(*len)
                        .build(),
                );
                id
            }
            Type::Matrix { scalar, cols, rows } => {
                let column = self
                    .emit_key(ids, TypeKey::Plain(Type::Vector { scalar: *scalar, len: *rows }))?;
                let id = ids.alloc();
                self.section.emit(
                    InstructionBuilder::new(Op::TypeMatrix)
                        .push(id)
                        .push(column)
                        .push(*cols)
                        .build(),
                );
                id
            }
            Type::Array { element_ty, len } => {
                let element = self.emit_key(ids, TypeKey::Plain((**element_ty).clone()))?;
                let id = ids.alloc();
                match len {
                    slc_ast::ArrayLen::Fixed(n) => {
                        let length_const =
                            self.emit_uint_constant(ids, Type::Primitive(PrimitiveType::U32), *n)?;
                        self.section.emit(
                            InstructionBuilder::new(Op::TypeArray)
                                .push(id)
                                .push(element)
                                .push(length_const)
                                .build(),
                        );
                    }
                    slc_ast::ArrayLen::Runtime => {
                        self.section.emit(
                            InstructionBuilder::new(Op::TypeRuntimeArray)
                                .push(id)
                                .push(element)
                                .build(),
                        );
                    }
                }
                id
            }
            Type::Struct(struct_index) => self.emit_struct_body(ids, *struct_index)?,
            Type::Sampler { dim, sampled } => {
                let sampled_ty =
                    self.emit_key(ids, TypeKey::Plain(Type::Primitive(*sampled)))?;
                let image_id = ids.alloc();
                let (spv_dim, arrayed) = sampler_dim(*dim);
                self.section.emit(
                    InstructionBuilder::new(Op::TypeImage)
                        .push(image_id)
                        .push(sampled_ty)
                        .push(spv_dim as u32)
                        .push(0) // depth: unknown
                        .push(arrayed as u32)
                        .push(0) // multisampled
                        .push(1) // sampled: with sampler
                        .push(0) // format: unknown
                        .build(),
                );
                let id = ids.alloc();
                self.section.emit(
                    InstructionBuilder::new(Op::TypeSampledImage).push(id).push(image_id).build(),
                );
                id
            }
            Type::Uniform(struct_index) | Type::PushConstant(struct_index) => {
                self.emit_struct_body(ids, *struct_index)?
            }
            Type::Storage { struct_index, .. } => self.emit_struct_body(ids, *struct_index)?,
            other => {
                return Err(BackendError::Unsupported(format!(
                    "{other} has no SPIR-V type representation"
                )))
            }
        };
        Ok(id)
    }

    fn emit_struct_body(&mut self, ids: &mut IdAllocator, struct_index: StructIndex) -> BackendResult<u32> {
        let decl: &StructDecl = self.structs.get(struct_index);
        let member_ids: Vec<u32> = decl
            .members
            .iter()
            .map(|m| self.emit_key(ids, TypeKey::Plain(m.ty.clone())))
            .collect::<BackendResult<_>>()?;
        let id = ids.alloc();
        self.section.emit(
            InstructionBuilder::new(spirv::Op::TypeStruct).push(id).push_list(&member_ids).build(),
        );
        Ok(id)
    }

    fn emit_uint_constant(&mut self, ids: &mut IdAllocator, ty: Type, value: u32) -> BackendResult<u32> {
        let type_id = self.emit_key(ids, TypeKey::Plain(ty))?;
        let id = ids.alloc();
        self.section.emit(
            InstructionBuilder::new(spirv::Op::Constant)
                .push(type_id)
                .push(id)
                .push(value)
                .build(),
        );
        Ok(id)
    }
}

fn sampler_dim(dim: SamplerDim) -> (Dim, bool) {
    match dim {
        SamplerDim::D1 => (Dim::Dim1D, false),
        SamplerDim::D2 => (Dim::Dim2D, false),
        SamplerDim::D3 => (Dim::Dim3D, false),
        SamplerDim::Cube => (Dim::DimCube, false),
        SamplerDim::D2Array => (Dim::Dim2D, true),
        SamplerDim::CubeArray => (Dim::DimCube, true),
    }
}

/// Constant table keyed by `(type id, literal bits)`.
#[derive(Default)]
pub struct ConstantTable {
    by_bits: FnvHashMap<(u32, u64), u32>,
}
impl ConstantTable {
    pub fn emit(
        &mut self,
        ids: &mut IdAllocator,
        section: &mut SectionBuffer,
        type_id: u32,
        value: &ConstValue,
    ) -> u32 {
        let bits = literal_bits(value);
        if let Some(id) = self.by_bits.get(&(type_id, bits)) {
            return *id;
        }
        let id = ids.alloc();
        let instr = match value {
            ConstValue::Bool(true) => InstructionBuilder::new(spirv::Op::ConstantTrue)
                .push(type_id)
                .push(id)
                .build(),
            ConstValue::Bool(false) => InstructionBuilder::new(spirv::Op::ConstantFalse)
                .push(type_id)
                .push(id)
                .build(),
            _ => InstructionBuilder::new(spirv::Op::Constant)
                .push(type_id)
                .push(id)
                .push(bits as u32)
                .build(),
        };
        section.emit(instr);
        self.by_bits.insert((type_id, bits), id);
        id
    }
}

fn literal_bits(value: &ConstValue) -> u64 {
    match value {
        ConstValue::Bool(b) => *b as u64,
        ConstValue::I32(x) => *x as u32 as u64,
        ConstValue::U32(x) => *x as u64,
        ConstValue::F32(x) => x.0.to_bits() as u64,
        ConstValue::F64(x) => x.0.to_bits(),
    }
}

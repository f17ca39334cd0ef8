//! IR Values
//!
//! Every node of the graph (arguments, blocks, functions, globals, constants
//! and instructions) is a `Value` owned by its module's arena. The concrete
//! kind is the closed `ValueDef` variant; accessors narrow on it once and
//! return `None` when the value is of another kind.

use irlens_common::{DllStorageClass, Linkage, ValueId, ValueKind, Visibility};
use std::cell::{Cell, Ref, RefCell};
use std::ffi::{CStr, CString};
use std::ptr::NonNull;

use crate::apfloat::ApFloat;
use crate::apint::ApInt;
use crate::module::Module;
use crate::opcode::{IntPredicate, Opcode};
use crate::types::IrType;

/// An operand edge: the user holds a `Use`, the referenced value is `get()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    value: ValueId,
}

impl Use {
    pub fn new(value: ValueId) -> Self {
        Self { value }
    }

    /// The value this edge refers to
    pub fn get(&self) -> ValueId {
        self.value
    }
}

/// Linkage, visibility and DLL storage class shared by functions and global variables
#[derive(Debug, Default)]
pub struct GlobalAttrs {
    linkage: Cell<Linkage>,
    visibility: Cell<Visibility>,
    dll_storage_class: Cell<DllStorageClass>,
}

impl GlobalAttrs {
    pub fn linkage(&self) -> Linkage {
        self.linkage.get()
    }

    pub fn set_linkage(&self, linkage: Linkage) {
        self.linkage.set(linkage);
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.set(visibility);
    }

    pub fn dll_storage_class(&self) -> DllStorageClass {
        self.dll_storage_class.get()
    }

    pub fn set_dll_storage_class(&self, class: DllStorageClass) {
        self.dll_storage_class.set(class);
    }
}

/// Function body and signature
#[derive(Debug)]
pub struct FunctionData {
    pub(crate) attrs: GlobalAttrs,
    pub(crate) function_type: IrType,
    pub(crate) arguments: RefCell<Vec<ValueId>>,
    pub(crate) blocks: RefCell<Vec<ValueId>>,
}

impl FunctionData {
    pub fn attrs(&self) -> &GlobalAttrs {
        &self.attrs
    }

    pub fn function_type(&self) -> &IrType {
        &self.function_type
    }

    pub fn return_type(&self) -> &IrType {
        match &self.function_type {
            IrType::Function { return_type, .. } => return_type,
            other => other,
        }
    }

    pub fn is_vararg(&self) -> bool {
        matches!(self.function_type, IrType::Function { is_vararg: true, .. })
    }

    pub fn arguments(&self) -> Ref<'_, [ValueId]> {
        Ref::map(self.arguments.borrow(), |a| a.as_slice())
    }

    /// Blocks in layout order; the first one is the entry block
    pub fn blocks(&self) -> Ref<'_, [ValueId]> {
        Ref::map(self.blocks.borrow(), |b| b.as_slice())
    }

    pub fn entry_block(&self) -> Option<ValueId> {
        self.blocks.borrow().first().copied()
    }
}

/// Basic Block - a sequence of instructions with a single entry and exit
#[derive(Debug, Default)]
pub struct BlockData {
    pub(crate) parent: Cell<Option<ValueId>>,
    pub(crate) instructions: RefCell<Vec<ValueId>>,
}

impl BlockData {
    /// Owning function
    pub fn parent(&self) -> Option<ValueId> {
        self.parent.get()
    }

    pub fn instructions(&self) -> Ref<'_, [ValueId]> {
        Ref::map(self.instructions.borrow(), |i| i.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.borrow().is_empty()
    }
}

/// Global variable definition
#[derive(Debug)]
pub struct GlobalVariableData {
    pub(crate) attrs: GlobalAttrs,
    pub(crate) value_type: IrType,
    pub(crate) is_constant: bool,
    pub(crate) initializer: Cell<Option<ValueId>>,
}

impl GlobalVariableData {
    pub fn attrs(&self) -> &GlobalAttrs {
        &self.attrs
    }

    /// Type of the memory the global designates
    pub fn value_type(&self) -> &IrType {
        &self.value_type
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn initializer(&self) -> Option<ValueId> {
        self.initializer.get()
    }
}

/// Opcode-specific payload of an instruction or constant expression
#[derive(Debug)]
pub enum InstDetail {
    None,
    Alloca { allocated_type: IrType },
    GetElementPtr { source_element_type: IrType, inbounds: bool },
    ICmp(IntPredicate),
    /// Incoming blocks, parallel to the phi's operands
    Phi { incoming_blocks: RefCell<Vec<ValueId>> },
    Call { function_type: IrType },
}

impl InstDetail {
    /// Copy of the payload for a new instruction
    pub(crate) fn duplicate(&self) -> InstDetail {
        match self {
            InstDetail::None => InstDetail::None,
            InstDetail::Alloca { allocated_type } => InstDetail::Alloca {
                allocated_type: allocated_type.clone(),
            },
            InstDetail::GetElementPtr { source_element_type, inbounds } => {
                InstDetail::GetElementPtr {
                    source_element_type: source_element_type.clone(),
                    inbounds: *inbounds,
                }
            }
            InstDetail::ICmp(pred) => InstDetail::ICmp(*pred),
            InstDetail::Phi { incoming_blocks } => InstDetail::Phi {
                incoming_blocks: RefCell::new(incoming_blocks.borrow().clone()),
            },
            InstDetail::Call { function_type } => InstDetail::Call {
                function_type: function_type.clone(),
            },
        }
    }
}

/// IR Instruction
#[derive(Debug)]
pub struct InstData {
    pub(crate) opcode: Opcode,
    pub(crate) operands: RefCell<Vec<Use>>,
    pub(crate) parent: Cell<Option<ValueId>>,
    pub(crate) detail: InstDetail,
}

impl InstData {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> Ref<'_, [Use]> {
        Ref::map(self.operands.borrow(), |o| o.as_slice())
    }

    /// Containing block; `None` while detached
    pub fn parent(&self) -> Option<ValueId> {
        self.parent.get()
    }

    pub fn detail(&self) -> &InstDetail {
        &self.detail
    }

    /// Incoming blocks of a phi node
    pub fn incoming_blocks(&self) -> Option<Ref<'_, [ValueId]>> {
        match &self.detail {
            InstDetail::Phi { incoming_blocks } => {
                Some(Ref::map(incoming_blocks.borrow(), |b| b.as_slice()))
            }
            _ => None,
        }
    }
}

/// Symbolic compile-time computation over constant operands
#[derive(Debug)]
pub struct ConstantExpr {
    pub(crate) opcode: Opcode,
    pub(crate) operands: Vec<Use>,
    pub(crate) detail: InstDetail,
}

impl ConstantExpr {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[Use] {
        &self.operands
    }

    pub fn detail(&self) -> &InstDetail {
        &self.detail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Array,
    Struct,
    Vector,
}

/// Constant array, struct or vector built from other constants
#[derive(Debug)]
pub struct ConstantAggregate {
    pub(crate) kind: AggregateKind,
    pub(crate) elements: Vec<Use>,
}

impl ConstantAggregate {
    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    pub fn elements(&self) -> &[Use] {
        &self.elements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Array,
    Vector,
}

/// Packed array or vector of primitive elements
///
/// `raw` holds the elements back to back in host byte order. The element
/// constants are materialized once when the data is created, so indexing
/// never allocates.
#[derive(Debug)]
pub struct ConstantData {
    pub(crate) kind: SequenceKind,
    pub(crate) element_type: IrType,
    pub(crate) raw: Vec<u8>,
    pub(crate) elements: Vec<ValueId>,
}

impl ConstantData {
    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn element_type(&self) -> &IrType {
        &self.element_type
    }

    /// An array of i8 is a string
    pub fn is_string(&self) -> bool {
        self.kind == SequenceKind::Array && self.element_type == IrType::I8
    }

    /// Bytes of a string constant, embedded NULs included
    pub fn as_string(&self) -> Option<&[u8]> {
        if self.is_string() {
            Some(&self.raw)
        } else {
            None
        }
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.raw
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, index: usize) -> Option<ValueId> {
        self.elements.get(index).copied()
    }
}

/// Closed set of value kinds
#[derive(Debug)]
pub enum ValueDef {
    Argument { parent: ValueId, index: u32 },
    BasicBlock(BlockData),
    Function(FunctionData),
    GlobalVariable(GlobalVariableData),
    ConstantInt(ApInt),
    ConstantFp(ApFloat),
    ConstantData(ConstantData),
    ConstantAggregate(ConstantAggregate),
    ConstantExpr(ConstantExpr),
    ConstantPointerNull,
    Undef,
    Poison,
    Instruction(InstData),
}

/// A node of the IR graph
///
/// Values are only ever created by a [`Module`], live at a fixed address for
/// the module's whole lifetime, and are handed out by shared reference.
#[derive(Debug)]
pub struct Value {
    pub(crate) id: ValueId,
    pub(crate) module: NonNull<Module>,
    pub(crate) ty: IrType,
    pub(crate) name: RefCell<CString>,
    pub(crate) def: ValueDef,
}

/// Names are C strings; anything after an embedded NUL is dropped
pub(crate) fn to_cstring(name: &str) -> CString {
    let head = name.split('\0').next().unwrap_or_default();
    CString::new(head).unwrap_or_default()
}

impl Value {
    pub fn id(&self) -> ValueId {
        self.id
    }

    pub fn ty(&self) -> &IrType {
        &self.ty
    }

    pub fn def(&self) -> &ValueDef {
        &self.def
    }

    /// The module owning this value
    pub fn module(&self) -> &Module {
        // SAFETY: the module is pinned and owns this node, so it outlives `self`.
        unsafe { self.module.as_ref() }
    }

    pub fn kind(&self) -> ValueKind {
        match &self.def {
            ValueDef::Argument { .. } => ValueKind::Argument,
            ValueDef::BasicBlock(_) => ValueKind::BasicBlock,
            ValueDef::Function(_) => ValueKind::Function,
            ValueDef::GlobalVariable(_) => ValueKind::GlobalVariable,
            ValueDef::ConstantInt(_) => ValueKind::ConstantInt,
            ValueDef::ConstantFp(_) => ValueKind::ConstantFP,
            ValueDef::ConstantData(data) => match data.kind {
                SequenceKind::Array => ValueKind::ConstantDataArray,
                SequenceKind::Vector => ValueKind::ConstantDataVector,
            },
            ValueDef::ConstantAggregate(agg) => match agg.kind {
                AggregateKind::Array => ValueKind::ConstantArray,
                AggregateKind::Struct => ValueKind::ConstantStruct,
                AggregateKind::Vector => ValueKind::ConstantVector,
            },
            ValueDef::ConstantExpr(_) => ValueKind::ConstantExpr,
            ValueDef::ConstantPointerNull => ValueKind::ConstantPointerNull,
            ValueDef::Undef => ValueKind::UndefValue,
            ValueDef::Poison => ValueKind::PoisonValue,
            ValueDef::Instruction(_) => ValueKind::Instruction,
        }
    }

    pub fn name(&self) -> String {
        self.name.borrow().to_string_lossy().into_owned()
    }

    /// Borrow the name as a C string; the bytes stay put until the next rename
    pub fn name_cstr(&self) -> Ref<'_, CStr> {
        Ref::map(self.name.borrow(), |n| n.as_c_str())
    }

    pub fn has_name(&self) -> bool {
        !self.name.borrow().as_bytes().is_empty()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = to_cstring(name);
    }

    /// Functions and global variables count as constants (their address is)
    pub fn is_constant(&self) -> bool {
        matches!(
            self.def,
            ValueDef::Function(_)
                | ValueDef::GlobalVariable(_)
                | ValueDef::ConstantInt(_)
                | ValueDef::ConstantFp(_)
                | ValueDef::ConstantData(_)
                | ValueDef::ConstantAggregate(_)
                | ValueDef::ConstantExpr(_)
                | ValueDef::ConstantPointerNull
                | ValueDef::Undef
                | ValueDef::Poison
        )
    }

    pub fn is_global(&self) -> bool {
        self.global_attrs().is_some()
    }

    pub fn is_instruction(&self) -> bool {
        matches!(self.def, ValueDef::Instruction(_))
    }

    pub fn as_constant_int(&self) -> Option<&ApInt> {
        match &self.def {
            ValueDef::ConstantInt(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_constant_fp(&self) -> Option<&ApFloat> {
        match &self.def {
            ValueDef::ConstantFp(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_constant_data(&self) -> Option<&ConstantData> {
        match &self.def {
            ValueDef::ConstantData(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_constant_aggregate(&self) -> Option<&ConstantAggregate> {
        match &self.def {
            ValueDef::ConstantAggregate(agg) => Some(agg),
            _ => None,
        }
    }

    pub fn as_constant_expr(&self) -> Option<&ConstantExpr> {
        match &self.def {
            ValueDef::ConstantExpr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_global_variable(&self) -> Option<&GlobalVariableData> {
        match &self.def {
            ValueDef::GlobalVariable(global) => Some(global),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.def {
            ValueDef::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockData> {
        match &self.def {
            ValueDef::BasicBlock(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&InstData> {
        match &self.def {
            ValueDef::Instruction(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn global_attrs(&self) -> Option<&GlobalAttrs> {
        match &self.def {
            ValueDef::Function(function) => Some(&function.attrs),
            ValueDef::GlobalVariable(global) => Some(&global.attrs),
            _ => None,
        }
    }

    /// A function without blocks or a global variable without initializer
    pub fn is_declaration(&self) -> bool {
        match &self.def {
            ValueDef::Function(function) => function.blocks.borrow().is_empty(),
            ValueDef::GlobalVariable(global) => global.initializer.get().is_none(),
            _ => false,
        }
    }

    /// Opcode of an instruction; constant expressions are not instructions
    pub fn opcode(&self) -> Option<Opcode> {
        self.as_instruction().map(InstData::opcode)
    }

    /// Operand count of instructions, constant expressions and constant aggregates
    pub fn num_operands(&self) -> usize {
        match &self.def {
            ValueDef::Instruction(inst) => inst.operands.borrow().len(),
            ValueDef::ConstantExpr(expr) => expr.operands.len(),
            ValueDef::ConstantAggregate(agg) => agg.elements.len(),
            _ => 0,
        }
    }

    /// The use edge at `index`
    pub fn operand_use(&self, index: usize) -> Option<Use> {
        match &self.def {
            ValueDef::Instruction(inst) => inst.operands.borrow().get(index).copied(),
            ValueDef::ConstantExpr(expr) => expr.operands.get(index).copied(),
            ValueDef::ConstantAggregate(agg) => agg.elements.get(index).copied(),
            _ => None,
        }
    }

    /// Referenced operand values, left to right
    pub fn operand_values(&self) -> Vec<ValueId> {
        (0..self.num_operands())
            .filter_map(|i| self.operand_use(i))
            .map(|u| u.get())
            .collect()
    }

    /// Function containing an argument, block or attached instruction
    pub fn parent_function(&self) -> Option<ValueId> {
        match &self.def {
            ValueDef::Argument { parent, .. } => Some(*parent),
            ValueDef::BasicBlock(block) => block.parent.get(),
            ValueDef::Instruction(inst) => {
                let block = inst.parent.get()?;
                self.module().value(block).as_block()?.parent.get()
            }
            _ => None,
        }
    }

    /// Type of the memory an instruction touches
    ///
    /// Store: the stored value's type. Load: the loaded type. GEP: the source
    /// element type. Alloca: the allocated type. Anything else has none.
    pub fn type_of_memory(&self) -> Option<&IrType> {
        let inst = self.as_instruction()?;
        match (inst.opcode, &inst.detail) {
            (Opcode::Store, _) => {
                let stored = inst.operands.borrow().first()?.get();
                Some(self.module().value(stored).ty())
            }
            (Opcode::Load, _) => Some(&self.ty),
            (Opcode::GetElementPtr, InstDetail::GetElementPtr { source_element_type, .. }) => {
                Some(source_element_type)
            }
            (Opcode::Alloca, InstDetail::Alloca { allocated_type }) => Some(allocated_type),
            _ => None,
        }
    }
}

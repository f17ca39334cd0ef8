//! Module - the arena owning every node of an IR graph
//!
//! A module is created pinned and is append-only: nodes are boxed once,
//! never moved and never freed before the module itself. This is what makes
//! it sound to hand out `&Value` (and raw `*const Value` handles) whose
//! lifetime is that of the module.

use irlens_common::{IrError, Result, ValueId};
use log::trace;
use std::cell::{Cell, Ref, RefCell};
use std::ffi::{CStr, CString};
use std::marker::PhantomPinned;
use std::pin::Pin;
use std::ptr::NonNull;

use crate::value::{
    to_cstring, BlockData, FunctionData, GlobalAttrs, GlobalVariableData, InstData, Value,
    ValueDef,
};
use crate::types::IrType;

/// IR Module - represents a complete compilation unit
pub struct Module {
    name: RefCell<CString>,
    arena: RefCell<Vec<NonNull<Value>>>,
    functions: RefCell<Vec<ValueId>>,
    globals: RefCell<Vec<ValueId>>,
    _pinned: PhantomPinned,
}

impl Module {
    pub fn new(name: &str) -> Pin<Box<Module>> {
        Box::pin(Module {
            name: RefCell::new(to_cstring(name)),
            arena: RefCell::new(Vec::new()),
            functions: RefCell::new(Vec::new()),
            globals: RefCell::new(Vec::new()),
            _pinned: PhantomPinned,
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().to_string_lossy().into_owned()
    }

    pub fn name_cstr(&self) -> Ref<'_, CStr> {
        Ref::map(self.name.borrow(), |n| n.as_c_str())
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = to_cstring(name);
    }

    /// Number of nodes allocated so far
    pub fn len(&self) -> usize {
        self.arena.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.borrow().is_empty()
    }

    /// Move a new node into the arena
    pub(crate) fn alloc(&self, ty: IrType, name: &str, def: ValueDef) -> ValueId {
        let mut arena = self.arena.borrow_mut();
        let id = ValueId::new(arena.len());
        let node = Box::new(Value {
            id,
            module: NonNull::from(self),
            ty,
            name: RefCell::new(to_cstring(name)),
            def,
        });
        trace!("alloc %{id} ({:?})", node.kind());
        arena.push(NonNull::from(Box::leak(node)));
        id
    }

    /// Look up a node; ids only come from this module, so a miss is a bug
    pub fn value(&self, id: ValueId) -> &Value {
        let ptr = self.arena.borrow()[id.index()];
        // SAFETY: nodes are never freed or moved before the module is dropped,
        // and the returned borrow cannot outlive `self`.
        unsafe { ptr.as_ref() }
    }

    pub fn try_value(&self, id: ValueId) -> Option<&Value> {
        let ptr = *self.arena.borrow().get(id.index())?;
        // SAFETY: as in `value`.
        Some(unsafe { ptr.as_ref() })
    }

    /// Stable address of a node, as handed across the C boundary
    pub fn value_ptr(&self, id: ValueId) -> *const Value {
        self.value(id) as *const Value
    }

    pub(crate) fn function_data(&self, id: ValueId) -> Result<&FunctionData> {
        self.value(id)
            .as_function()
            .ok_or(IrError::WrongValueKind { id: id.as_u32(), expected: "function" })
    }

    pub(crate) fn block_data(&self, id: ValueId) -> Result<&BlockData> {
        self.value(id)
            .as_block()
            .ok_or(IrError::WrongValueKind { id: id.as_u32(), expected: "basic block" })
    }

    pub(crate) fn inst_data(&self, id: ValueId) -> Result<&InstData> {
        self.value(id)
            .as_instruction()
            .ok_or(IrError::WrongValueKind { id: id.as_u32(), expected: "instruction" })
    }

    /// Declare a function; its arguments are created right away
    pub fn add_function(&self, name: &str, function_type: IrType) -> Result<ValueId> {
        let param_types = match &function_type {
            IrType::Function { param_types, .. } => param_types.clone(),
            other => return Err(IrError::type_mismatch("function type", other)),
        };

        let function = self.alloc(
            IrType::Ptr,
            name,
            ValueDef::Function(FunctionData {
                attrs: GlobalAttrs::default(),
                function_type,
                arguments: RefCell::new(Vec::new()),
                blocks: RefCell::new(Vec::new()),
            }),
        );

        let arguments: Vec<ValueId> = param_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.alloc(ty, "", ValueDef::Argument { parent: function, index: index as u32 })
            })
            .collect();
        *self.function_data(function)?.arguments.borrow_mut() = arguments;

        self.functions.borrow_mut().push(function);
        Ok(function)
    }

    /// Add a global variable without initializer
    pub fn add_global(&self, name: &str, value_type: IrType, is_constant: bool) -> ValueId {
        let global = self.alloc(
            IrType::Ptr,
            name,
            ValueDef::GlobalVariable(GlobalVariableData {
                attrs: GlobalAttrs::default(),
                value_type,
                is_constant,
                initializer: Cell::new(None),
            }),
        );
        self.globals.borrow_mut().push(global);
        global
    }

    pub fn set_initializer(&self, global: ValueId, initializer: ValueId) -> Result<()> {
        let data = self
            .value(global)
            .as_global_variable()
            .ok_or(IrError::WrongValueKind { id: global.as_u32(), expected: "global variable" })?;
        let init = self.value(initializer);
        if !init.is_constant() {
            return Err(IrError::NotAConstant { id: initializer.as_u32() });
        }
        if init.ty() != &data.value_type {
            return Err(IrError::type_mismatch(&data.value_type, init.ty()));
        }
        data.initializer.set(Some(initializer));
        Ok(())
    }

    /// Append a new, empty basic block to a function
    pub fn append_basic_block(&self, function: ValueId, name: &str) -> Result<ValueId> {
        let data = self.function_data(function)?;
        let block = self.alloc(
            IrType::Label,
            name,
            ValueDef::BasicBlock(BlockData {
                parent: Cell::new(Some(function)),
                instructions: RefCell::new(Vec::new()),
            }),
        );
        data.blocks.borrow_mut().push(block);
        Ok(block)
    }

    pub fn functions(&self) -> Vec<ValueId> {
        self.functions.borrow().clone()
    }

    pub fn globals(&self) -> Vec<ValueId> {
        self.globals.borrow().clone()
    }

    pub fn get_function(&self, name: &str) -> Option<ValueId> {
        self.functions
            .borrow()
            .iter()
            .copied()
            .find(|id| self.value(*id).name_cstr().to_bytes() == name.as_bytes())
    }

    pub fn get_global(&self, name: &str) -> Option<ValueId> {
        self.globals
            .borrow()
            .iter()
            .copied()
            .find(|id| self.value(*id).name_cstr().to_bytes() == name.as_bytes())
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        for ptr in self.arena.get_mut().drain(..) {
            // SAFETY: every pointer came from `Box::leak` in `alloc` and is freed once.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name())
            .field("nodes", &self.len())
            .field("functions", &self.functions.borrow())
            .field("globals", &self.globals.borrow())
            .finish()
    }
}

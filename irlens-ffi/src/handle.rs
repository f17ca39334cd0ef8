//! Handle types
//!
//! Handles are the addresses of nodes owned by a pinned module, so they stay
//! valid for as long as the module lives. All of them are read-only
//! pointers; the few mutators act through the interior-mutable cells on the
//! node instead of through a writable handle.

use irlens_common::ValueId;
use irlens_ir::{DataLayout, IrType, Module, Value};
use std::ptr;

/// Any IR node: argument, block, function, global, constant or instruction
pub type ValueRef = *const Value;

/// A type owned by a node (its value type, or a type recorded on an instruction)
pub type TypeRef = *const IrType;

pub type ModuleRef = *const Module;

/// Data layout allocated by `irlens_create_target_data`
pub type TargetDataRef = *mut DataLayout;

/// Borrow the node behind a handle; null maps to `None`
///
/// # Safety
/// A non-null handle must point at a node of a live module.
pub(crate) unsafe fn value_ref<'a>(handle: ValueRef) -> Option<&'a Value> {
    unsafe { handle.as_ref() }
}

/// # Safety
/// A non-null handle must point at a type owned by a live module, or at a
/// type kept alive by the caller.
pub(crate) unsafe fn type_ref<'a>(handle: TypeRef) -> Option<&'a IrType> {
    unsafe { handle.as_ref() }
}

/// # Safety
/// A non-null handle must point at a live module.
pub(crate) unsafe fn module_ref<'a>(handle: ModuleRef) -> Option<&'a Module> {
    unsafe { handle.as_ref() }
}

/// Handle of node `id` in the same module as `anchor`
pub(crate) fn wrap(anchor: &Value, id: ValueId) -> ValueRef {
    anchor.module().value_ptr(id)
}

pub(crate) fn wrap_opt(anchor: &Value, id: Option<ValueId>) -> ValueRef {
    id.map_or(ptr::null(), |id| wrap(anchor, id))
}

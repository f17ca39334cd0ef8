//! Iteration across the boundary
//!
//! One generic cursor serves every collection: a `Collection` says how long
//! the collection of a given parent is and which node sits at an index. A
//! cursor snapshots the length when it is created and hands out one element
//! per `next` until it reaches that end, then keeps returning null.
//!
//! Cursors are heap allocated by the `*_iter` entry points and released by the
//! matching `irlens_dispose_*_iter`. The parent must not change shape while a
//! cursor over it is live. Rust callers can use [`ScopedCursor`] instead,
//! which disposes on drop.

use irlens_common::ValueId;
use irlens_ir::Value;
use log::trace;
use std::marker::PhantomData;
use std::ptr;

use crate::handle::{value_ref, ValueRef};

/// A child collection of some parent node
pub trait Collection {
    const LABEL: &'static str;

    /// Number of elements; zero when `parent` is not of the expected kind
    fn len(parent: &Value) -> usize;

    fn element(parent: &Value, index: usize) -> Option<ValueId>;
}

/// Basic blocks of a function, in layout order
pub struct FunctionBlocks;

impl Collection for FunctionBlocks {
    const LABEL: &'static str = "blocks";

    fn len(parent: &Value) -> usize {
        parent.as_function().map_or(0, |f| f.blocks().len())
    }

    fn element(parent: &Value, index: usize) -> Option<ValueId> {
        parent.as_function()?.blocks().get(index).copied()
    }
}

/// Formal arguments of a function
pub struct FunctionArguments;

impl Collection for FunctionArguments {
    const LABEL: &'static str = "arguments";

    fn len(parent: &Value) -> usize {
        parent.as_function().map_or(0, |f| f.arguments().len())
    }

    fn element(parent: &Value, index: usize) -> Option<ValueId> {
        parent.as_function()?.arguments().get(index).copied()
    }
}

/// Instructions of a basic block
pub struct BlockInstructions;

impl Collection for BlockInstructions {
    const LABEL: &'static str = "instructions";

    fn len(parent: &Value) -> usize {
        parent.as_block().map_or(0, |b| b.instructions().len())
    }

    fn element(parent: &Value, index: usize) -> Option<ValueId> {
        parent.as_block()?.instructions().get(index).copied()
    }
}

/// Operands of an instruction or constant aggregate; yields the used value, not the edge
pub struct Operands;

impl Collection for Operands {
    const LABEL: &'static str = "operands";

    fn len(parent: &Value) -> usize {
        parent.num_operands()
    }

    fn element(parent: &Value, index: usize) -> Option<ValueId> {
        parent.operand_use(index).map(|u| u.get())
    }
}

/// Incoming blocks of a phi node, in edge order
pub struct PhiIncomingBlocks;

impl Collection for PhiIncomingBlocks {
    const LABEL: &'static str = "incoming blocks";

    fn len(parent: &Value) -> usize {
        parent
            .as_instruction()
            .and_then(|i| i.incoming_blocks())
            .map_or(0, |b| b.len())
    }

    fn element(parent: &Value, index: usize) -> Option<ValueId> {
        parent.as_instruction()?.incoming_blocks()?.get(index).copied()
    }
}

/// Position and end over one parent's collection
pub struct Cursor<K> {
    parent: *const Value,
    position: usize,
    end: usize,
    _kind: PhantomData<K>,
}

pub type BlocksIterator = Cursor<FunctionBlocks>;
pub type ArgumentsIterator = Cursor<FunctionArguments>;
pub type InstructionsIterator = Cursor<BlockInstructions>;
pub type OperandsIterator = Cursor<Operands>;
pub type IncomingBlocksIterator = Cursor<PhiIncomingBlocks>;

impl<K: Collection> Cursor<K> {
    fn new(parent: ValueRef) -> Self {
        // SAFETY: a non-null parent is a live node by contract.
        let end = unsafe { value_ref(parent) }.map_or(0, K::len);
        Self { parent, position: 0, end, _kind: PhantomData }
    }

    /// Handle of the current element, advancing past it
    fn advance(&mut self) -> ValueRef {
        if self.position >= self.end {
            return ptr::null();
        }
        // SAFETY: `end > 0` implies the parent was non-null, and the graph
        // outlives every cursor over it.
        let Some(parent) = (unsafe { value_ref(self.parent) }) else {
            return ptr::null();
        };
        let index = self.position;
        self.position += 1;
        match K::element(parent, index) {
            Some(id) => parent.module().value_ptr(id),
            None => {
                // The collection shrank under a live cursor
                self.position = self.end;
                ptr::null()
            }
        }
    }
}

fn begin<K: Collection>(parent: ValueRef) -> *mut Cursor<K> {
    let cursor = Cursor::<K>::new(parent);
    trace!("begin {} iteration ({} elements)", K::LABEL, cursor.end);
    Box::into_raw(Box::new(cursor))
}

fn next<K: Collection>(cursor: *mut Cursor<K>) -> ValueRef {
    // SAFETY: the cursor came from `begin` and has not been disposed.
    match unsafe { cursor.as_mut() } {
        Some(cursor) => cursor.advance(),
        None => ptr::null(),
    }
}

fn dispose<K: Collection>(cursor: *mut Cursor<K>) {
    if cursor.is_null() {
        return;
    }
    trace!("dispose {} cursor", K::LABEL);
    // SAFETY: the cursor came from `Box::into_raw` in `begin` and is disposed once.
    drop(unsafe { Box::from_raw(cursor) });
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_function_blocks_iter(function: ValueRef) -> *mut BlocksIterator {
    begin(function)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_function_arguments_iter(function: ValueRef) -> *mut ArgumentsIterator {
    begin(function)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_block_instructions_iter(block: ValueRef) -> *mut InstructionsIterator {
    begin(block)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_instruction_operands_iter(inst: ValueRef) -> *mut OperandsIterator {
    begin(inst)
}

/// Operands of a constant array, struct or vector; driven with the operands next/dispose
#[unsafe(no_mangle)]
pub extern "C" fn irlens_constant_aggregate_operands_iter(
    constant: ValueRef,
) -> *mut OperandsIterator {
    begin(constant)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_phi_incoming_blocks_iter(phi: ValueRef) -> *mut IncomingBlocksIterator {
    begin(phi)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_blocks_iter_next(cursor: *mut BlocksIterator) -> ValueRef {
    next(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_arguments_iter_next(cursor: *mut ArgumentsIterator) -> ValueRef {
    next(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_instructions_iter_next(cursor: *mut InstructionsIterator) -> ValueRef {
    next(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_operands_iter_next(cursor: *mut OperandsIterator) -> ValueRef {
    next(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_incoming_blocks_iter_next(
    cursor: *mut IncomingBlocksIterator,
) -> ValueRef {
    next(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_blocks_iter(cursor: *mut BlocksIterator) {
    dispose(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_arguments_iter(cursor: *mut ArgumentsIterator) {
    dispose(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_instructions_iter(cursor: *mut InstructionsIterator) {
    dispose(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_operands_iter(cursor: *mut OperandsIterator) {
    dispose(cursor)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_incoming_blocks_iter(cursor: *mut IncomingBlocksIterator) {
    dispose(cursor)
}

/// A boundary cursor released when it goes out of scope
///
/// Goes through the same begin/next/dispose path a foreign caller uses.
pub struct ScopedCursor<'a, K: Collection> {
    raw: *mut Cursor<K>,
    _parent: PhantomData<&'a Value>,
}

impl<'a, K: Collection> ScopedCursor<'a, K> {
    pub fn new(parent: &'a Value) -> Self {
        Self { raw: begin(parent as ValueRef), _parent: PhantomData }
    }
}

impl<'a, K: Collection> Iterator for ScopedCursor<'a, K> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        // SAFETY: handles from the cursor point into the parent's module, which `'a` keeps alive.
        unsafe { value_ref(next(self.raw)) }
    }
}

impl<K: Collection> Drop for ScopedCursor<'_, K> {
    fn drop(&mut self) {
        dispose(self.raw);
    }
}

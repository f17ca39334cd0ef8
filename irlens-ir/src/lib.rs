//! Host Intermediate Representation
//!
//! The in-memory IR graph the C boundary exposes. A pinned `Module` owns
//! every node; nodes are addressed by `ValueId` on the Rust side and by
//! their stable address across the boundary.
//!
//! ## Architecture
//!
//! - `types` - Type system (IrType)
//! - `apint` / `apfloat` - Arbitrary-width integers and binary floats
//! - `opcode` - Instruction opcodes and predicates
//! - `value` - Value nodes and the closed `ValueDef` variant
//! - `module` - The node arena, functions and globals
//! - `constant` - Constant constructors and constant expressions
//! - `builder` - Instruction construction
//! - `printer` - Textual IR
//! - `layout` - Data layout size and offset queries

// Public exports - clean API surface
pub use self::apfloat::{ApFloat, FloatSemantics};
pub use self::apint::ApInt;
pub use self::builder::IrBuilder;
pub use self::layout::DataLayout;
pub use self::module::Module;
pub use self::opcode::{IntPredicate, Opcode};
pub use self::printer::AsmWriter;
pub use self::types::IrType;
pub use self::value::{
    AggregateKind, BlockData, ConstantAggregate, ConstantData, ConstantExpr, FunctionData,
    GlobalAttrs, GlobalVariableData, InstData, InstDetail, SequenceKind, Use, Value, ValueDef,
};

pub mod apfloat;
pub mod apint;
mod builder;
mod constant;
mod layout;
mod module;
mod opcode;
mod printer;
mod types;
mod value;

#[cfg(test)]
mod tests;

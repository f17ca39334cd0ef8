//! C boundary for the host IR graph
//!
//! Every entry point here is a flat `extern "C"` function over opaque
//! handles. Nothing crosses the boundary as an error: each accessor reports
//! "not applicable" through its own sentinel (null, 0, -1 or an empty
//! string), and iteration is driven through begin/next/dispose cursors.
//!
//! ## Architecture
//!
//! - `handle` - Handle types and conversions
//! - `strings` - Owned strings and their release
//! - `iter` - Cursor-based iteration over blocks, arguments, instructions, operands and phi edges
//! - `value` - Value and constant introspection, attribute mutators
//! - `module` - Module lookups and printing
//! - `targets` - Data layout size and offset queries
//! - `initfini` - Logging setup and version reporting

// Entry points take raw handles from C and dereference them after a null check
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod handle;
pub mod initfini;
pub mod iter;
pub mod module;
pub mod strings;
pub mod targets;
pub mod value;

pub use handle::{ModuleRef, TargetDataRef, TypeRef, ValueRef};
pub use iter::{
    ArgumentsIterator, BlocksIterator, Cursor, IncomingBlocksIterator, InstructionsIterator,
    OperandsIterator, ScopedCursor,
};

//! IR bridge - Common Types and Errors
//! 
//! This crate contains the identifiers, boundary-stable enumerations and
//! error definitions shared by the host IR graph and the C ABI layer.

pub mod error;
pub mod types;

pub use error::{IrError, Result};
pub use types::*;

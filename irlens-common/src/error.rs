//! Error handling for the host IR graph
//! 
//! Errors only exist on the host side (building IR, parsing literals and
//! layout strings). Nothing in this module crosses the C boundary: the
//! boundary reports failures through per-accessor sentinels instead.

use thiserror::Error;

/// Errors raised while constructing or configuring IR
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
    },

    #[error("Invalid operand: {message}")]
    InvalidOperand { message: String },

    #[error("Value %{id} is not a {expected}")]
    WrongValueKind {
        id: u32,
        expected: &'static str,
    },

    #[error("Builder has no insertion point")]
    NoInsertionPoint,

    #[error("Constant expression operand %{id} is not a constant")]
    NotAConstant { id: u32 },

    #[error("Invalid integer literal '{literal}' for i{bit_width}")]
    IntegerLiteral {
        literal: String,
        bit_width: u32,
    },

    #[error("Unsupported element type {element_type} for constant data")]
    UnsupportedElementType { element_type: String },

    #[error("Invalid data layout '{rep}': {message}")]
    InvalidDataLayout {
        rep: String,
        message: String,
    },
}

impl IrError {
    /// Create a type mismatch error from anything printable
    pub fn type_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        IrError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create an invalid operand error
    pub fn invalid_operand(message: impl Into<String>) -> Self {
        IrError::InvalidOperand { message: message.into() }
    }

    /// Create a layout parse error
    pub fn layout(rep: &str, message: impl Into<String>) -> Self {
        IrError::InvalidDataLayout {
            rep: rep.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IrError>;

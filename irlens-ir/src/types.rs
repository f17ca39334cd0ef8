//! IR Type System
//!
//! Defines the types carried by every value in the graph: arbitrary-width
//! integers, the floating-point formats, an opaque pointer, and the derived
//! array, vector, struct and function types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::apfloat::FloatSemantics;

/// IR Type system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    /// Void type
    Void,

    /// Integer type with an explicit bit width (i1 .. i(2^23))
    Int(u32),

    /// Floating point formats
    Half,
    Float,
    Double,
    X86Fp80,
    Fp128,

    /// Opaque pointer
    Ptr,

    /// Array type [size x element_type]
    Array { size: u64, element_type: Box<IrType> },

    /// Vector type <size x element_type>
    Vector { size: u64, element_type: Box<IrType> },

    /// Struct type
    Struct {
        name: Option<String>,
        fields: Vec<IrType>,
        packed: bool,
    },

    /// Function type
    Function {
        return_type: Box<IrType>,
        param_types: Vec<IrType>,
        is_vararg: bool,
    },

    /// Label type (for basic blocks)
    Label,
}

impl IrType {
    pub const I1: IrType = IrType::Int(1);
    pub const I8: IrType = IrType::Int(8);
    pub const I16: IrType = IrType::Int(16);
    pub const I32: IrType = IrType::Int(32);
    pub const I64: IrType = IrType::Int(64);
    pub const I128: IrType = IrType::Int(128);

    pub fn array(element_type: IrType, size: u64) -> Self {
        IrType::Array { size, element_type: Box::new(element_type) }
    }

    pub fn vector(element_type: IrType, size: u64) -> Self {
        IrType::Vector { size, element_type: Box::new(element_type) }
    }

    pub fn structure(fields: Vec<IrType>, packed: bool) -> Self {
        IrType::Struct { name: None, fields, packed }
    }

    pub fn function(return_type: IrType, param_types: Vec<IrType>, is_vararg: bool) -> Self {
        IrType::Function {
            return_type: Box::new(return_type),
            param_types,
            is_vararg,
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    pub fn int_width(&self) -> Option<u32> {
        match self {
            IrType::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Check if this is one of the floating point formats
    pub fn is_floating_point(&self) -> bool {
        self.float_semantics().is_some()
    }

    pub fn float_semantics(&self) -> Option<FloatSemantics> {
        match self {
            IrType::Half => Some(FloatSemantics::Half),
            IrType::Float => Some(FloatSemantics::Single),
            IrType::Double => Some(FloatSemantics::Double),
            IrType::X86Fp80 => Some(FloatSemantics::X87DoubleExtended),
            IrType::Fp128 => Some(FloatSemantics::Quad),
            _ => None,
        }
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, IrType::Struct { .. })
    }

    /// Whether values of this type occupy memory
    pub fn is_sized(&self) -> bool {
        match self {
            IrType::Void | IrType::Function { .. } | IrType::Label => false,
            IrType::Array { element_type, .. } | IrType::Vector { element_type, .. } => {
                element_type.is_sized()
            }
            IrType::Struct { fields, .. } => fields.iter().all(IrType::is_sized),
            _ => true,
        }
    }

    /// Get the element type for arrays and vectors
    pub fn element_type(&self) -> Option<&IrType> {
        match self {
            IrType::Array { element_type, .. } | IrType::Vector { element_type, .. } => {
                Some(element_type)
            }
            _ => None,
        }
    }

    /// Width in bits of the scalar types; `None` for aggregates and unsized types
    pub fn primitive_bits(&self) -> Option<u64> {
        match self {
            IrType::Int(bits) => Some(*bits as u64),
            IrType::Half => Some(16),
            IrType::Float => Some(32),
            IrType::Double => Some(64),
            IrType::X86Fp80 => Some(80),
            IrType::Fp128 => Some(128),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::Half => write!(f, "half"),
            IrType::Float => write!(f, "float"),
            IrType::Double => write!(f, "double"),
            IrType::X86Fp80 => write!(f, "x86_fp80"),
            IrType::Fp128 => write!(f, "fp128"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Array { size, element_type } => write!(f, "[{size} x {element_type}]"),
            IrType::Vector { size, element_type } => write!(f, "<{size} x {element_type}>"),
            IrType::Struct { name: Some(name), .. } => write!(f, "%{name}"),
            IrType::Struct { name: None, fields, packed } => {
                if *packed { write!(f, "<")?; }
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")?;
                if *packed { write!(f, ">")?; }
                Ok(())
            }
            IrType::Function { return_type, param_types, is_vararg } => {
                write!(f, "{return_type} (")?;
                for (i, param) in param_types.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{param}")?;
                }
                if *is_vararg {
                    if !param_types.is_empty() { write!(f, ", ")?; }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            IrType::Label => write!(f, "label"),
        }
    }
}

//! Common types shared across the bridge
//!
//! The enumerations in this module cross the C boundary as plain integers.
//! Their discriminants follow the numbering existing foreign callers were
//! written against and must never be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside its module arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(u32);

impl ValueId {
    pub fn new(index: usize) -> Self {
        ValueId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete kind of a value, as reported by `irlens_get_value_kind`
///
/// Gaps in the numbering belong to kinds this graph never produces
/// (memory SSA nodes, aliases, ifuncs, block addresses, metadata, inline asm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ValueKind {
    Argument = 0,
    BasicBlock = 1,
    Function = 5,
    GlobalVariable = 8,
    ConstantExpr = 10,
    ConstantArray = 11,
    ConstantStruct = 12,
    ConstantVector = 13,
    UndefValue = 14,
    ConstantDataArray = 16,
    ConstantDataVector = 17,
    ConstantInt = 18,
    ConstantFP = 19,
    ConstantPointerNull = 20,
    Instruction = 24,
    PoisonValue = 25,
}

impl ValueKind {
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Linkage of a global value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum Linkage {
    #[default]
    External = 0,
    AvailableExternally = 1,
    LinkOnceAny = 2,
    LinkOnceODR = 3,
    WeakAny = 5,
    WeakODR = 6,
    Appending = 7,
    Internal = 8,
    Private = 9,
    ExternalWeak = 12,
    Common = 14,
}

impl Linkage {
    /// Decode a boundary integer; retired slots (4, 10, 11, 13, 15, 16) are rejected
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Linkage::External,
            1 => Linkage::AvailableExternally,
            2 => Linkage::LinkOnceAny,
            3 => Linkage::LinkOnceODR,
            5 => Linkage::WeakAny,
            6 => Linkage::WeakODR,
            7 => Linkage::Appending,
            8 => Linkage::Internal,
            9 => Linkage::Private,
            12 => Linkage::ExternalWeak,
            14 => Linkage::Common,
            _ => return None,
        })
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Keyword used by the textual printer; external linkage prints nothing
    pub fn keyword(self) -> &'static str {
        match self {
            Linkage::External => "",
            Linkage::AvailableExternally => "available_externally",
            Linkage::LinkOnceAny => "linkonce",
            Linkage::LinkOnceODR => "linkonce_odr",
            Linkage::WeakAny => "weak",
            Linkage::WeakODR => "weak_odr",
            Linkage::Appending => "appending",
            Linkage::Internal => "internal",
            Linkage::Private => "private",
            Linkage::ExternalWeak => "extern_weak",
            Linkage::Common => "common",
        }
    }
}

/// Symbol visibility of a global value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum Visibility {
    #[default]
    Default = 0,
    Hidden = 1,
    Protected = 2,
}

impl Visibility {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Visibility::Default),
            1 => Some(Visibility::Hidden),
            2 => Some(Visibility::Protected),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Default => "",
            Visibility::Hidden => "hidden",
            Visibility::Protected => "protected",
        }
    }
}

/// DLL storage class of a global value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum DllStorageClass {
    #[default]
    Default = 0,
    DllImport = 1,
    DllExport = 2,
}

impl DllStorageClass {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(DllStorageClass::Default),
            1 => Some(DllStorageClass::DllImport),
            2 => Some(DllStorageClass::DllExport),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DllStorageClass::Default => "",
            DllStorageClass::DllImport => "dllimport",
            DllStorageClass::DllExport => "dllexport",
        }
    }
}

//! Instruction opcodes and comparison predicates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Terminators
    Ret,
    Br,
    Unreachable,

    // Unary
    FNeg,

    // Binary
    Add, FAdd, Sub, FSub, Mul, FMul,
    UDiv, SDiv, FDiv, URem, SRem, FRem,
    Shl, LShr, AShr, And, Or, Xor,

    // Memory
    Alloca,
    Load,
    Store,
    GetElementPtr,

    // Casts
    Trunc, ZExt, SExt,
    FPTrunc, FPExt,
    FPToUI, FPToSI, UIToFP, SIToFP,
    PtrToInt, IntToPtr, BitCast,

    // Other
    ICmp,
    Phi,
    Call,
    Select,
}

impl Opcode {
    /// Textual opcode name as printed in IR
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::Unreachable => "unreachable",
            Opcode::FNeg => "fneg",
            Opcode::Add => "add",
            Opcode::FAdd => "fadd",
            Opcode::Sub => "sub",
            Opcode::FSub => "fsub",
            Opcode::Mul => "mul",
            Opcode::FMul => "fmul",
            Opcode::UDiv => "udiv",
            Opcode::SDiv => "sdiv",
            Opcode::FDiv => "fdiv",
            Opcode::URem => "urem",
            Opcode::SRem => "srem",
            Opcode::FRem => "frem",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::GetElementPtr => "getelementptr",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::FPTrunc => "fptrunc",
            Opcode::FPExt => "fpext",
            Opcode::FPToUI => "fptoui",
            Opcode::FPToSI => "fptosi",
            Opcode::UIToFP => "uitofp",
            Opcode::SIToFP => "sitofp",
            Opcode::PtrToInt => "ptrtoint",
            Opcode::IntToPtr => "inttoptr",
            Opcode::BitCast => "bitcast",
            Opcode::ICmp => "icmp",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Select => "select",
        }
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Br | Opcode::Unreachable)
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::FAdd | Opcode::Sub | Opcode::FSub | Opcode::Mul | Opcode::FMul
                | Opcode::UDiv | Opcode::SDiv | Opcode::FDiv | Opcode::URem | Opcode::SRem
                | Opcode::FRem | Opcode::Shl | Opcode::LShr | Opcode::AShr | Opcode::And
                | Opcode::Or | Opcode::Xor
        )
    }

    /// Binary opcodes operating on floating point operands
    pub fn is_float_binary(self) -> bool {
        matches!(
            self,
            Opcode::FAdd | Opcode::FSub | Opcode::FMul | Opcode::FDiv | Opcode::FRem
        )
    }

    pub fn is_cast(self) -> bool {
        matches!(
            self,
            Opcode::Trunc | Opcode::ZExt | Opcode::SExt | Opcode::FPTrunc | Opcode::FPExt
                | Opcode::FPToUI | Opcode::FPToSI | Opcode::UIToFP | Opcode::SIToFP
                | Opcode::PtrToInt | Opcode::IntToPtr | Opcode::BitCast
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Integer comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntPredicate {
    Eq, Ne,
    Ugt, Uge, Ult, Ule, // Unsigned comparisons
    Sgt, Sge, Slt, Sle, // Signed comparisons
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pred_str = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
        };
        write!(f, "{}", pred_str)
    }
}

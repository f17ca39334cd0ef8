//! Constants
//!
//! Constructors for every constant kind. Constants are not uniqued: each call
//! allocates a fresh node, so identity comparisons between separately built
//! constants are meaningless.

use irlens_common::{IrError, Result, ValueId};
use log::trace;
use std::cell::{Cell, RefCell};

use crate::apfloat::{ApFloat, FloatSemantics};
use crate::apint::ApInt;
use crate::module::Module;
use crate::opcode::{IntPredicate, Opcode};
use crate::types::IrType;
use crate::value::{
    AggregateKind, ConstantAggregate, ConstantData, ConstantExpr, InstData, InstDetail,
    SequenceKind, Use, ValueDef,
};

/// Byte width of an element that constant data can hold
fn data_element_size(element_type: &IrType) -> Result<usize> {
    match element_type {
        IrType::Int(8) => Ok(1),
        IrType::Int(16) | IrType::Half => Ok(2),
        IrType::Int(32) | IrType::Float => Ok(4),
        IrType::Int(64) | IrType::Double => Ok(8),
        other => Err(IrError::UnsupportedElementType {
            element_type: other.to_string(),
        }),
    }
}

/// Read one native-endian element of `size` bytes
fn read_element(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    if cfg!(target_endian = "little") {
        buf[..bytes.len()].copy_from_slice(bytes);
    } else {
        buf[8 - bytes.len()..].copy_from_slice(bytes);
    }
    u64::from_ne_bytes(buf)
}

/// Write the low `size` bytes of `value` in native byte order
fn write_element(out: &mut Vec<u8>, value: u64, size: usize) {
    let bytes = value.to_ne_bytes();
    if cfg!(target_endian = "little") {
        out.extend_from_slice(&bytes[..size]);
    } else {
        out.extend_from_slice(&bytes[8 - size..]);
    }
}

impl Module {
    fn require_constant(&self, id: ValueId) -> Result<()> {
        if self.value(id).is_constant() {
            Ok(())
        } else {
            Err(IrError::NotAConstant { id: id.as_u32() })
        }
    }

    /// Integer constant of type `ty`; `sign_extend` treats `value` as an i64
    pub fn const_int(&self, ty: &IrType, value: u64, sign_extend: bool) -> Result<ValueId> {
        let bits = ty.int_width().ok_or_else(|| IrError::type_mismatch("integer type", ty))?;
        let value = if sign_extend {
            ApInt::from_i64(bits, value as i64)
        } else {
            ApInt::from_u64(bits, value)
        };
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantInt(value)))
    }

    /// Integer constant from little-endian words
    pub fn const_int_words(&self, ty: &IrType, words: &[u64]) -> Result<ValueId> {
        let bits = ty.int_width().ok_or_else(|| IrError::type_mismatch("integer type", ty))?;
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantInt(ApInt::from_words(bits, words))))
    }

    pub fn const_int_from_str(&self, ty: &IrType, literal: &str, radix: u32) -> Result<ValueId> {
        let bits = ty.int_width().ok_or_else(|| IrError::type_mismatch("integer type", ty))?;
        let value = ApInt::from_str_radix(bits, literal, radix)?;
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantInt(value)))
    }

    /// Floating point constant rounded from a host double
    pub fn const_real(&self, ty: &IrType, value: f64) -> Result<ValueId> {
        let semantics = ty
            .float_semantics()
            .ok_or_else(|| IrError::type_mismatch("floating point type", ty))?;
        let (value, _) = ApFloat::from_f64(semantics, value);
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantFp(value)))
    }

    /// Floating point constant holding `value` exactly; the formats must agree
    pub fn const_float(&self, ty: &IrType, value: ApFloat) -> Result<ValueId> {
        if ty.float_semantics() != Some(value.semantics()) {
            return Err(IrError::type_mismatch(ty, format!("{:?}", value.semantics())));
        }
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantFp(value)))
    }

    fn const_data(
        &self,
        kind: SequenceKind,
        element_type: &IrType,
        raw: Vec<u8>,
    ) -> Result<ValueId> {
        let size = data_element_size(element_type)?;
        let semantics = element_type.float_semantics();

        let mut elements = Vec::with_capacity(raw.len() / size);
        for chunk in raw.chunks_exact(size) {
            let bits = read_element(chunk);
            let def = match semantics {
                Some(semantics) => {
                    ValueDef::ConstantFp(ApFloat::from_bits(semantics, bits as u128))
                }
                None => ValueDef::ConstantInt(ApInt::from_u64(size as u32 * 8, bits)),
            };
            elements.push(self.alloc(element_type.clone(), "", def));
        }

        let count = elements.len() as u64;
        let ty = match kind {
            SequenceKind::Array => IrType::array(element_type.clone(), count),
            SequenceKind::Vector => IrType::vector(element_type.clone(), count),
        };
        let data = ConstantData {
            kind,
            element_type: element_type.clone(),
            raw,
            elements,
        };
        Ok(self.alloc(ty, "", ValueDef::ConstantData(data)))
    }

    fn pack_ints(element_type: &IrType, values: &[u64]) -> Result<Vec<u8>> {
        if !element_type.is_integer() {
            return Err(IrError::type_mismatch("integer element type", element_type));
        }
        let size = data_element_size(element_type)?;
        let mut raw = Vec::with_capacity(values.len() * size);
        for value in values {
            write_element(&mut raw, *value, size);
        }
        Ok(raw)
    }

    /// Packed integer array; elements are truncated to the element width
    pub fn const_data_array(&self, element_type: &IrType, values: &[u64]) -> Result<ValueId> {
        let raw = Self::pack_ints(element_type, values)?;
        self.const_data(SequenceKind::Array, element_type, raw)
    }

    pub fn const_data_vector(&self, element_type: &IrType, values: &[u64]) -> Result<ValueId> {
        let raw = Self::pack_ints(element_type, values)?;
        self.const_data(SequenceKind::Vector, element_type, raw)
    }

    /// Packed floating point array; each element is rounded into the element format
    pub fn const_data_array_fp(&self, element_type: &IrType, values: &[f64]) -> Result<ValueId> {
        let semantics: FloatSemantics = element_type
            .float_semantics()
            .ok_or_else(|| IrError::type_mismatch("floating point element type", element_type))?;
        let size = data_element_size(element_type)?;
        let mut raw = Vec::with_capacity(values.len() * size);
        for value in values {
            let (encoded, _) = ApFloat::from_f64(semantics, *value);
            write_element(&mut raw, encoded.to_bits() as u64, size);
        }
        self.const_data(SequenceKind::Array, element_type, raw)
    }

    /// `[N x i8]` string constant; embedded NULs are kept verbatim
    pub fn const_string(&self, bytes: &[u8], null_terminate: bool) -> Result<ValueId> {
        let mut raw = bytes.to_vec();
        if null_terminate {
            raw.push(0);
        }
        self.const_data(SequenceKind::Array, &IrType::I8, raw)
    }

    fn check_elements(&self, element_type: &IrType, elements: &[ValueId]) -> Result<Vec<Use>> {
        elements
            .iter()
            .map(|id| {
                self.require_constant(*id)?;
                let ty = self.value(*id).ty();
                if ty != element_type {
                    return Err(IrError::type_mismatch(element_type, ty));
                }
                Ok(Use::new(*id))
            })
            .collect()
    }

    pub fn const_array(&self, element_type: &IrType, elements: &[ValueId]) -> Result<ValueId> {
        let uses = self.check_elements(element_type, elements)?;
        let ty = IrType::array(element_type.clone(), uses.len() as u64);
        let agg = ConstantAggregate { kind: AggregateKind::Array, elements: uses };
        Ok(self.alloc(ty, "", ValueDef::ConstantAggregate(agg)))
    }

    /// Anonymous struct constant whose field types are those of `elements`
    pub fn const_struct(&self, elements: &[ValueId], packed: bool) -> Result<ValueId> {
        let mut fields = Vec::with_capacity(elements.len());
        let mut uses = Vec::with_capacity(elements.len());
        for id in elements {
            self.require_constant(*id)?;
            fields.push(self.value(*id).ty().clone());
            uses.push(Use::new(*id));
        }
        let agg = ConstantAggregate { kind: AggregateKind::Struct, elements: uses };
        Ok(self.alloc(IrType::structure(fields, packed), "", ValueDef::ConstantAggregate(agg)))
    }

    pub fn const_vector(&self, elements: &[ValueId]) -> Result<ValueId> {
        let first = elements
            .first()
            .ok_or_else(|| IrError::invalid_operand("vector constant needs at least one element"))?;
        let element_type = self.value(*first).ty().clone();
        let uses = self.check_elements(&element_type, elements)?;
        let ty = IrType::vector(element_type, uses.len() as u64);
        let agg = ConstantAggregate { kind: AggregateKind::Vector, elements: uses };
        Ok(self.alloc(ty, "", ValueDef::ConstantAggregate(agg)))
    }

    pub fn const_null(&self, ty: &IrType) -> Result<ValueId> {
        if !ty.is_pointer() {
            return Err(IrError::type_mismatch("ptr", ty));
        }
        Ok(self.alloc(ty.clone(), "", ValueDef::ConstantPointerNull))
    }

    pub fn undef(&self, ty: &IrType) -> ValueId {
        self.alloc(ty.clone(), "", ValueDef::Undef)
    }

    pub fn poison(&self, ty: &IrType) -> ValueId {
        self.alloc(ty.clone(), "", ValueDef::Poison)
    }

    /// Binary constant expression, e.g. `add (i32 1, i32 2)`
    pub fn const_binary(&self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        if !opcode.is_binary() {
            return Err(IrError::invalid_operand(format!("{opcode} is not a binary opcode")));
        }
        self.require_constant(lhs)?;
        self.require_constant(rhs)?;
        let ty = self.value(lhs).ty().clone();
        if self.value(rhs).ty() != &ty {
            return Err(IrError::type_mismatch(&ty, self.value(rhs).ty()));
        }
        let expr = ConstantExpr {
            opcode,
            operands: vec![Use::new(lhs), Use::new(rhs)],
            detail: InstDetail::None,
        };
        Ok(self.alloc(ty, "", ValueDef::ConstantExpr(expr)))
    }

    pub fn const_icmp(
        &self,
        predicate: IntPredicate,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId> {
        self.require_constant(lhs)?;
        self.require_constant(rhs)?;
        let ty = self.value(lhs).ty();
        if self.value(rhs).ty() != ty {
            return Err(IrError::type_mismatch(ty, self.value(rhs).ty()));
        }
        let expr = ConstantExpr {
            opcode: Opcode::ICmp,
            operands: vec![Use::new(lhs), Use::new(rhs)],
            detail: InstDetail::ICmp(predicate),
        };
        Ok(self.alloc(IrType::I1, "", ValueDef::ConstantExpr(expr)))
    }

    /// Cast constant expression, e.g. `ptrtoint (ptr @g to i64)`
    pub fn const_cast(&self, opcode: Opcode, value: ValueId, to: &IrType) -> Result<ValueId> {
        if !opcode.is_cast() {
            return Err(IrError::invalid_operand(format!("{opcode} is not a cast opcode")));
        }
        self.require_constant(value)?;
        let expr = ConstantExpr {
            opcode,
            operands: vec![Use::new(value)],
            detail: InstDetail::None,
        };
        Ok(self.alloc(to.clone(), "", ValueDef::ConstantExpr(expr)))
    }

    pub fn const_gep(
        &self,
        source_element_type: &IrType,
        pointer: ValueId,
        indices: &[ValueId],
        inbounds: bool,
    ) -> Result<ValueId> {
        self.require_constant(pointer)?;
        if !self.value(pointer).ty().is_pointer() {
            return Err(IrError::type_mismatch("ptr", self.value(pointer).ty()));
        }
        let mut operands = vec![Use::new(pointer)];
        for index in indices {
            self.require_constant(*index)?;
            if !self.value(*index).ty().is_integer() {
                return Err(IrError::type_mismatch("integer index", self.value(*index).ty()));
            }
            operands.push(Use::new(*index));
        }
        let expr = ConstantExpr {
            opcode: Opcode::GetElementPtr,
            operands,
            detail: InstDetail::GetElementPtr {
                source_element_type: source_element_type.clone(),
                inbounds,
            },
        };
        Ok(self.alloc(IrType::Ptr, "", ValueDef::ConstantExpr(expr)))
    }

    /// Build a detached instruction computing the same thing as a constant expression
    ///
    /// The new instruction belongs to no block; the caller decides whether to
    /// insert it (see `IrBuilder::insert`) or leave it unused.
    pub fn constant_expr_as_instruction(&self, expr: ValueId) -> Option<ValueId> {
        let value = self.value(expr);
        let data = value.as_constant_expr()?;
        let inst = InstData {
            opcode: data.opcode,
            operands: RefCell::new(data.operands.clone()),
            parent: Cell::new(None),
            detail: data.detail.duplicate(),
        };
        let id = self.alloc(value.ty().clone(), "", ValueDef::Instruction(inst));
        trace!("materialized constant expression %{expr} as %{id}");
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_data_elements() {
        let module = Module::new("m");
        let arr = module.const_data_array(&IrType::I16, &[1, 0x1_0002, 3]).unwrap();
        let data = module.value(arr).as_constant_data().unwrap();
        assert_eq!(data.num_elements(), 3);
        assert_eq!(data.raw_data().len(), 6);
        assert!(!data.is_string());
        assert_eq!(module.value(arr).ty(), &IrType::array(IrType::I16, 3));

        let second = module.value(data.element(1).unwrap());
        assert_eq!(second.as_constant_int().unwrap().zext_value(), Some(2));
        assert!(data.element(3).is_none());
    }

    #[test]
    fn test_constant_data_rejects_wide_elements() {
        let module = Module::new("m");
        assert!(matches!(
            module.const_data_array(&IrType::I128, &[1]),
            Err(IrError::UnsupportedElementType { .. })
        ));
        assert!(module.const_data_array(&IrType::Float, &[1]).is_err());
    }

    #[test]
    fn test_fp_data_round_trip() {
        let module = Module::new("m");
        let arr = module.const_data_array_fp(&IrType::Float, &[1.5, -2.0]).unwrap();
        let data = module.value(arr).as_constant_data().unwrap();
        let first = module.value(data.element(0).unwrap()).as_constant_fp().unwrap();
        assert_eq!(first.to_f64(), (1.5, false));
        let second = module.value(data.element(1).unwrap()).as_constant_fp().unwrap();
        assert_eq!(second.to_f64(), (-2.0, false));
    }

    #[test]
    fn test_string_keeps_embedded_nul() {
        let module = Module::new("m");
        let s = module.const_string(b"a\0b", false).unwrap();
        let data = module.value(s).as_constant_data().unwrap();
        assert_eq!(data.as_string(), Some(&b"a\0b"[..]));
        assert_eq!(module.value(s).ty(), &IrType::array(IrType::I8, 3));
    }

    #[test]
    fn test_constant_expr_operands_must_be_constant() {
        let module = Module::new("m");
        let f = module
            .add_function("f", IrType::function(IrType::Void, vec![IrType::I32], false))
            .unwrap();
        let arg = module.value(f).as_function().unwrap().arguments()[0];
        let one = module.const_int(&IrType::I32, 1, false).unwrap();
        assert_eq!(
            module.const_binary(Opcode::Add, arg, one),
            Err(IrError::NotAConstant { id: arg.as_u32() })
        );
    }

    #[test]
    fn test_constant_expr_as_instruction_is_detached() {
        let module = Module::new("m");
        let g = module.add_global("g", IrType::I64, false);
        let cast = module.const_cast(Opcode::PtrToInt, g, &IrType::I64).unwrap();
        let inst = module.constant_expr_as_instruction(cast).unwrap();
        let value = module.value(inst);
        assert_eq!(value.opcode(), Some(Opcode::PtrToInt));
        assert_eq!(value.operand_values(), vec![g]);
        assert_eq!(value.as_instruction().unwrap().parent(), None);
        assert_eq!(value.ty(), &IrType::I64);

        assert_eq!(module.constant_expr_as_instruction(g), None);
    }
}

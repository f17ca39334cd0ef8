//! IR Builder
//!
//! Provides utilities for constructing instructions at the end of a block.

use irlens_common::{IrError, Result, ValueId};
use std::cell::{Cell, RefCell};

use crate::module::Module;
use crate::opcode::{IntPredicate, Opcode};
use crate::types::IrType;
use crate::value::{InstData, InstDetail, Use, ValueDef};

/// Builder for constructing IR
pub struct IrBuilder<'m> {
    module: &'m Module,
    current_block: Option<ValueId>,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module, current_block: None }
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    /// Append subsequent instructions to `block`
    pub fn position_at_end(&mut self, block: ValueId) -> Result<()> {
        self.module.block_data(block)?;
        self.current_block = Some(block);
        Ok(())
    }

    pub fn insert_block(&self) -> Option<ValueId> {
        self.current_block
    }

    fn type_of(&self, id: ValueId) -> &'m IrType {
        self.module.value(id).ty()
    }

    fn push(&self, inst: ValueId) -> Result<()> {
        let block = self.current_block.ok_or(IrError::NoInsertionPoint)?;
        let data = self.module.block_data(block)?;
        self.module.inst_data(inst)?.parent.set(Some(block));
        data.instructions.borrow_mut().push(inst);
        Ok(())
    }

    fn add_instruction(
        &self,
        opcode: Opcode,
        ty: IrType,
        operands: &[ValueId],
        detail: InstDetail,
        name: &str,
    ) -> Result<ValueId> {
        if self.current_block.is_none() {
            return Err(IrError::NoInsertionPoint);
        }
        let inst = InstData {
            opcode,
            operands: RefCell::new(operands.iter().copied().map(Use::new).collect()),
            parent: Cell::new(None),
            detail,
        };
        let id = self.module.alloc(ty, name, ValueDef::Instruction(inst));
        self.push(id)?;
        Ok(id)
    }

    /// Attach a detached instruction (e.g. a materialized constant expression)
    pub fn insert(&self, inst: ValueId) -> Result<()> {
        if self.module.inst_data(inst)?.parent().is_some() {
            return Err(IrError::invalid_operand(format!("%{inst} is already in a block")));
        }
        self.push(inst)
    }

    fn expect_same_type(&self, lhs: ValueId, rhs: ValueId) -> Result<&'m IrType> {
        let ty = self.type_of(lhs);
        if self.type_of(rhs) != ty {
            return Err(IrError::type_mismatch(ty, self.type_of(rhs)));
        }
        Ok(ty)
    }

    pub fn build_binary(
        &self,
        op: Opcode,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId> {
        if !op.is_binary() {
            return Err(IrError::invalid_operand(format!("{op} is not a binary opcode")));
        }
        let ty = self.expect_same_type(lhs, rhs)?;
        let scalar =
            ty.element_type().filter(|_| matches!(ty, IrType::Vector { .. })).unwrap_or(ty);
        if op.is_float_binary() && !scalar.is_floating_point() {
            return Err(IrError::type_mismatch("floating point type", ty));
        }
        if !op.is_float_binary() && !scalar.is_integer() {
            return Err(IrError::type_mismatch("integer type", ty));
        }
        self.add_instruction(op, ty.clone(), &[lhs, rhs], InstDetail::None, name)
    }

    pub fn build_fneg(&self, value: ValueId, name: &str) -> Result<ValueId> {
        let ty = self.type_of(value);
        if !ty.is_floating_point() {
            return Err(IrError::type_mismatch("floating point type", ty));
        }
        self.add_instruction(Opcode::FNeg, ty.clone(), &[value], InstDetail::None, name)
    }

    pub fn build_icmp(
        &self,
        predicate: IntPredicate,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId> {
        let ty = self.expect_same_type(lhs, rhs)?;
        if !ty.is_integer() && !ty.is_pointer() {
            return Err(IrError::type_mismatch("integer or pointer type", ty));
        }
        let detail = InstDetail::ICmp(predicate);
        self.add_instruction(Opcode::ICmp, IrType::I1, &[lhs, rhs], detail, name)
    }

    pub fn build_cast(
        &self,
        op: Opcode,
        value: ValueId,
        dest: &IrType,
        name: &str,
    ) -> Result<ValueId> {
        if !op.is_cast() {
            return Err(IrError::invalid_operand(format!("{op} is not a cast opcode")));
        }
        self.add_instruction(op, dest.clone(), &[value], InstDetail::None, name)
    }

    pub fn build_alloca(&self, allocated_type: &IrType, name: &str) -> Result<ValueId> {
        if !allocated_type.is_sized() {
            return Err(IrError::type_mismatch("sized type", allocated_type));
        }
        let detail = InstDetail::Alloca { allocated_type: allocated_type.clone() };
        self.add_instruction(Opcode::Alloca, IrType::Ptr, &[], detail, name)
    }

    pub fn build_load(&self, ty: &IrType, pointer: ValueId, name: &str) -> Result<ValueId> {
        if !self.type_of(pointer).is_pointer() {
            return Err(IrError::type_mismatch("ptr", self.type_of(pointer)));
        }
        self.add_instruction(Opcode::Load, ty.clone(), &[pointer], InstDetail::None, name)
    }

    /// Store `value` through `pointer`; operands are (value, pointer)
    pub fn build_store(&self, value: ValueId, pointer: ValueId) -> Result<ValueId> {
        if !self.type_of(pointer).is_pointer() {
            return Err(IrError::type_mismatch("ptr", self.type_of(pointer)));
        }
        self.add_instruction(Opcode::Store, IrType::Void, &[value, pointer], InstDetail::None, "")
    }

    pub fn build_gep(
        &self,
        source_element_type: &IrType,
        pointer: ValueId,
        indices: &[ValueId],
        inbounds: bool,
        name: &str,
    ) -> Result<ValueId> {
        if !self.type_of(pointer).is_pointer() {
            return Err(IrError::type_mismatch("ptr", self.type_of(pointer)));
        }
        let mut operands = Vec::with_capacity(indices.len() + 1);
        operands.push(pointer);
        for index in indices {
            if !self.type_of(*index).is_integer() {
                return Err(IrError::type_mismatch("integer index", self.type_of(*index)));
            }
            operands.push(*index);
        }
        let detail = InstDetail::GetElementPtr {
            source_element_type: source_element_type.clone(),
            inbounds,
        };
        self.add_instruction(Opcode::GetElementPtr, IrType::Ptr, &operands, detail, name)
    }

    /// Direct call; operands are the arguments followed by the callee
    pub fn build_call(&self, callee: ValueId, args: &[ValueId], name: &str) -> Result<ValueId> {
        let function_type = self.module.function_data(callee)?.function_type().clone();
        let (return_type, param_types, is_vararg) = match &function_type {
            IrType::Function { return_type, param_types, is_vararg } => {
                (return_type.as_ref().clone(), param_types, *is_vararg)
            }
            other => return Err(IrError::type_mismatch("function type", other)),
        };

        if args.len() < param_types.len() || (!is_vararg && args.len() != param_types.len()) {
            return Err(IrError::invalid_operand(format!(
                "call expects {} arguments, got {}",
                param_types.len(),
                args.len()
            )));
        }
        for (arg, param) in args.iter().zip(param_types) {
            if self.type_of(*arg) != param {
                return Err(IrError::type_mismatch(param, self.type_of(*arg)));
            }
        }

        let mut operands = args.to_vec();
        operands.push(callee);
        let name = if return_type.is_void() { "" } else { name };
        let detail = InstDetail::Call { function_type: function_type.clone() };
        self.add_instruction(Opcode::Call, return_type, &operands, detail, name)
    }

    /// Empty phi node; fill it with `add_incoming`
    pub fn build_phi(&self, ty: &IrType, name: &str) -> Result<ValueId> {
        let detail = InstDetail::Phi { incoming_blocks: RefCell::new(Vec::new()) };
        self.add_instruction(Opcode::Phi, ty.clone(), &[], detail, name)
    }

    pub fn add_incoming(&self, phi: ValueId, value: ValueId, block: ValueId) -> Result<()> {
        let data = self.module.inst_data(phi)?;
        let incoming_blocks = match &data.detail {
            InstDetail::Phi { incoming_blocks } => incoming_blocks,
            _ => return Err(IrError::WrongValueKind { id: phi.as_u32(), expected: "phi node" }),
        };
        self.module.block_data(block)?;
        let ty = self.type_of(phi);
        if self.type_of(value) != ty {
            return Err(IrError::type_mismatch(ty, self.type_of(value)));
        }
        data.operands.borrow_mut().push(Use::new(value));
        incoming_blocks.borrow_mut().push(block);
        Ok(())
    }

    pub fn build_select(
        &self,
        condition: ValueId,
        then_value: ValueId,
        else_value: ValueId,
        name: &str,
    ) -> Result<ValueId> {
        if self.type_of(condition) != &IrType::I1 {
            return Err(IrError::type_mismatch(IrType::I1, self.type_of(condition)));
        }
        let ty = self.expect_same_type(then_value, else_value)?;
        let operands = [condition, then_value, else_value];
        self.add_instruction(Opcode::Select, ty.clone(), &operands, InstDetail::None, name)
    }

    /// Return from the current function; the value must match its return type
    pub fn build_ret(&self, value: Option<ValueId>) -> Result<ValueId> {
        let block = self.current_block.ok_or(IrError::NoInsertionPoint)?;
        let function = self
            .module
            .block_data(block)?
            .parent()
            .ok_or_else(|| IrError::invalid_operand("block is not part of a function"))?;
        let expected = self.module.function_data(function)?.return_type();
        match value {
            Some(v) if self.type_of(v) != expected => {
                return Err(IrError::type_mismatch(expected, self.type_of(v)));
            }
            None if !expected.is_void() => return Err(IrError::type_mismatch(expected, "void")),
            _ => {}
        }
        let operands: Vec<ValueId> = value.into_iter().collect();
        self.add_instruction(Opcode::Ret, IrType::Void, &operands, InstDetail::None, "")
    }

    pub fn build_br(&self, dest: ValueId) -> Result<ValueId> {
        self.module.block_data(dest)?;
        self.add_instruction(Opcode::Br, IrType::Void, &[dest], InstDetail::None, "")
    }

    /// Conditional branch; operands are (condition, then, else)
    pub fn build_cond_br(
        &self,
        condition: ValueId,
        then_block: ValueId,
        else_block: ValueId,
    ) -> Result<ValueId> {
        if self.type_of(condition) != &IrType::I1 {
            return Err(IrError::type_mismatch(IrType::I1, self.type_of(condition)));
        }
        self.module.block_data(then_block)?;
        self.module.block_data(else_block)?;
        self.add_instruction(
            Opcode::Br,
            IrType::Void,
            &[condition, then_block, else_block],
            InstDetail::None,
            "",
        )
    }

    pub fn build_unreachable(&self) -> Result<ValueId> {
        self.add_instruction(Opcode::Unreachable, IrType::Void, &[], InstDetail::None, "")
    }
}

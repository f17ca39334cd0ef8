//! Textual IR printer
//!
//! Renders values, functions, globals and whole modules in the familiar
//! assembly syntax. Unnamed locals are numbered per function in definition
//! order (arguments, then each block followed by its non-void instructions);
//! a local that cannot be numbered, such as the result of a detached
//! instruction, prints as `%<badref>`.

use irlens_common::ValueId;
use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::module::Module;
use crate::opcode::Opcode;
use crate::types::IrType;
use crate::value::{AggregateKind, GlobalAttrs, InstDetail, SequenceKind, Value, ValueDef};

fn is_bare_ident(name: &[u8]) -> bool {
    match name.first() {
        Some(first) if !first.is_ascii_digit() => name
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || b"-$._".contains(c)),
        _ => false,
    }
}

fn write_escaped(f: &mut dyn Write, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        match byte {
            b'"' | b'\\' => write!(f, "\\{byte:02X}")?,
            0x20..=0x7e => f.write_char(*byte as char)?,
            _ => write!(f, "\\{byte:02X}")?,
        }
    }
    Ok(())
}

/// `@name`, `%name` or a bare label, quoted when it is not a plain identifier
fn write_ident(f: &mut dyn Write, sigil: Option<char>, name: &[u8]) -> fmt::Result {
    if let Some(sigil) = sigil {
        f.write_char(sigil)?;
    }
    if is_bare_ident(name) {
        f.write_str(&String::from_utf8_lossy(name))
    } else {
        f.write_char('"')?;
        write_escaped(f, name)?;
        f.write_char('"')
    }
}

fn write_attrs(f: &mut dyn Write, attrs: &GlobalAttrs) -> fmt::Result {
    for keyword in [
        attrs.linkage().keyword(),
        attrs.visibility().keyword(),
        attrs.dll_storage_class().keyword(),
    ] {
        if !keyword.is_empty() {
            write!(f, "{keyword} ")?;
        }
    }
    Ok(())
}

/// Printer state: slot numbers for unnamed globals and the current function's locals
pub struct AsmWriter<'a> {
    module: &'a Module,
    globals: HashMap<ValueId, usize>,
    locals: HashMap<ValueId, usize>,
}

impl<'a> AsmWriter<'a> {
    pub fn new(module: &'a Module) -> Self {
        let mut globals = HashMap::new();
        for id in module.globals().into_iter().chain(module.functions()) {
            if !module.value(id).has_name() {
                let slot = globals.len();
                globals.insert(id, slot);
            }
        }
        Self { module, globals, locals: HashMap::new() }
    }

    /// Number the unnamed locals of `function`
    pub fn incorporate_function(&mut self, function: ValueId) {
        self.locals.clear();
        let Some(data) = self.module.value(function).as_function() else {
            return;
        };
        let mut next = 0usize;
        let mut number = |locals: &mut HashMap<ValueId, usize>, id: ValueId| {
            locals.insert(id, next);
            next += 1;
        };

        for arg in data.arguments().iter() {
            if !self.module.value(*arg).has_name() {
                number(&mut self.locals, *arg);
            }
        }
        for block in data.blocks().iter() {
            let block_value = self.module.value(*block);
            if !block_value.has_name() {
                number(&mut self.locals, *block);
            }
            let Some(block_data) = block_value.as_block() else {
                continue;
            };
            for inst in block_data.instructions().iter() {
                let inst_value = self.module.value(*inst);
                if !inst_value.has_name() && !inst_value.ty().is_void() {
                    number(&mut self.locals, *inst);
                }
            }
        }
    }

    /// Reference to a value as it appears in operand position, without its type
    pub fn write_ref(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        let value = self.module.value(id);
        match value.def() {
            ValueDef::Function(_) | ValueDef::GlobalVariable(_) => {
                if value.has_name() {
                    write_ident(f, Some('@'), value.name_cstr().to_bytes())
                } else {
                    write!(f, "@{}", self.globals.get(&id).copied().unwrap_or_default())
                }
            }
            ValueDef::Argument { .. } | ValueDef::BasicBlock(_) | ValueDef::Instruction(_) => {
                if value.has_name() {
                    write_ident(f, Some('%'), value.name_cstr().to_bytes())
                } else if let Some(slot) = self.locals.get(&id) {
                    write!(f, "%{slot}")
                } else {
                    f.write_str("%<badref>")
                }
            }
            _ => self.write_constant(f, value),
        }
    }

    /// `<type> <ref>`
    pub fn write_operand(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        write!(f, "{} ", self.module.value(id).ty())?;
        self.write_ref(f, id)
    }

    fn write_operand_list(&self, f: &mut dyn Write, ids: &[ValueId]) -> fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_operand(f, *id)?;
        }
        Ok(())
    }

    fn write_constant(&self, f: &mut dyn Write, value: &Value) -> fmt::Result {
        match value.def() {
            ValueDef::ConstantInt(int) => {
                if value.ty() == &IrType::I1 {
                    f.write_str(if int.is_zero() { "false" } else { "true" })
                } else {
                    write!(f, "{int}")
                }
            }
            ValueDef::ConstantFp(float) => write!(f, "{float}"),
            ValueDef::ConstantData(data) => {
                if let Some(bytes) = data.as_string() {
                    f.write_str("c\"")?;
                    write_escaped(f, bytes)?;
                    return f.write_char('"');
                }
                let (open, close) = match data.kind() {
                    SequenceKind::Array => ('[', ']'),
                    SequenceKind::Vector => ('<', '>'),
                };
                f.write_char(open)?;
                let elements: Vec<ValueId> =
                    (0..data.num_elements()).filter_map(|i| data.element(i)).collect();
                self.write_operand_list(f, &elements)?;
                f.write_char(close)
            }
            ValueDef::ConstantAggregate(agg) => {
                let elements = value.operand_values();
                let packed = matches!(value.ty(), IrType::Struct { packed: true, .. });
                let (open, close) = match agg.kind() {
                    AggregateKind::Array => ("[", "]"),
                    AggregateKind::Vector => ("<", ">"),
                    AggregateKind::Struct if elements.is_empty() => {
                        return f.write_str(if packed { "<{}>" } else { "{}" });
                    }
                    AggregateKind::Struct if packed => ("<{ ", " }>"),
                    AggregateKind::Struct => ("{ ", " }"),
                };
                f.write_str(open)?;
                self.write_operand_list(f, &elements)?;
                f.write_str(close)
            }
            ValueDef::ConstantExpr(expr) => {
                let operands = value.operand_values();
                write!(f, "{}", expr.opcode())?;
                match expr.detail() {
                    InstDetail::ICmp(predicate) => write!(f, " {predicate}")?,
                    InstDetail::GetElementPtr { inbounds: true, .. } => f.write_str(" inbounds")?,
                    _ => {}
                }
                f.write_str(" (")?;
                if let InstDetail::GetElementPtr { source_element_type, .. } = expr.detail() {
                    write!(f, "{source_element_type}, ")?;
                }
                self.write_operand_list(f, &operands)?;
                if expr.opcode().is_cast() {
                    write!(f, " to {}", value.ty())?;
                }
                f.write_char(')')
            }
            ValueDef::ConstantPointerNull => f.write_str("null"),
            ValueDef::Undef => f.write_str("undef"),
            ValueDef::Poison => f.write_str("poison"),
            _ => self.write_ref(f, value.id()),
        }
    }

    /// One instruction, without indentation or trailing newline
    pub fn write_instruction(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        let value = self.module.value(id);
        let Some(inst) = value.as_instruction() else {
            return self.write_operand(f, id);
        };
        let ops = value.operand_values();
        let ty = value.ty();

        if !ty.is_void() {
            self.write_ref(f, id)?;
            f.write_str(" = ")?;
        }

        let opcode = inst.opcode();
        match opcode {
            Opcode::Ret if ops.is_empty() => f.write_str("ret void"),
            Opcode::Unreachable => f.write_str("unreachable"),
            Opcode::Alloca => match inst.detail() {
                InstDetail::Alloca { allocated_type } => write!(f, "alloca {allocated_type}"),
                _ => f.write_str("alloca"),
            },
            Opcode::Load => {
                write!(f, "load {ty}, ")?;
                self.write_operand_list(f, &ops)
            }
            Opcode::GetElementPtr => {
                f.write_str("getelementptr ")?;
                if let InstDetail::GetElementPtr { source_element_type, inbounds } = inst.detail() {
                    if *inbounds {
                        f.write_str("inbounds ")?;
                    }
                    write!(f, "{source_element_type}, ")?;
                }
                self.write_operand_list(f, &ops)
            }
            Opcode::ICmp => {
                f.write_str("icmp ")?;
                if let InstDetail::ICmp(predicate) = inst.detail() {
                    write!(f, "{predicate} ")?;
                }
                self.write_binary_operands(f, &ops)
            }
            Opcode::Phi => {
                write!(f, "phi {ty} ")?;
                let blocks = inst.incoming_blocks().map(|b| b.to_vec()).unwrap_or_default();
                for (i, (incoming, block)) in ops.iter().zip(&blocks).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("[ ")?;
                    self.write_ref(f, *incoming)?;
                    f.write_str(", ")?;
                    self.write_ref(f, *block)?;
                    f.write_str(" ]")?;
                }
                Ok(())
            }
            Opcode::Call => {
                let Some((callee, args)) = ops.split_last() else {
                    return f.write_str("call");
                };
                match inst.detail() {
                    InstDetail::Call {
                        function_type: fn_ty @ IrType::Function { is_vararg: true, .. },
                    } => write!(f, "call {fn_ty} ")?,
                    _ => write!(f, "call {ty} ")?,
                }
                self.write_ref(f, *callee)?;
                f.write_char('(')?;
                self.write_operand_list(f, args)?;
                f.write_char(')')
            }
            op if op.is_binary() || op == Opcode::FNeg => {
                write!(f, "{op} ")?;
                self.write_binary_operands(f, &ops)
            }
            op if op.is_cast() => {
                write!(f, "{op} ")?;
                self.write_operand_list(f, &ops)?;
                write!(f, " to {ty}")
            }
            op => {
                write!(f, "{op} ")?;
                self.write_operand_list(f, &ops)
            }
        }
    }

    /// Operands sharing one type: `i32 %a, %b`
    fn write_binary_operands(&self, f: &mut dyn Write, ops: &[ValueId]) -> fmt::Result {
        let Some(first) = ops.first() else {
            return Ok(());
        };
        self.write_operand(f, *first)?;
        for id in &ops[1..] {
            f.write_str(", ")?;
            self.write_ref(f, *id)?;
        }
        Ok(())
    }

    pub fn write_block(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        let value = self.module.value(id);
        if value.has_name() {
            write_ident(f, None, value.name_cstr().to_bytes())?;
        } else if let Some(slot) = self.locals.get(&id) {
            write!(f, "{slot}")?;
        } else {
            f.write_str("<badref>")?;
        }
        f.write_str(":\n")?;
        if let Some(block) = value.as_block() {
            for inst in block.instructions().iter() {
                f.write_str("  ")?;
                self.write_instruction(f, *inst)?;
                f.write_char('\n')?;
            }
        }
        Ok(())
    }

    pub fn write_function(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        let value = self.module.value(id);
        let Some(data) = value.as_function() else {
            return self.write_operand(f, id);
        };
        let declaration = value.is_declaration();
        f.write_str(if declaration { "declare " } else { "define " })?;
        write_attrs(f, data.attrs())?;
        write!(f, "{} ", data.return_type())?;
        self.write_ref(f, id)?;

        f.write_char('(')?;
        let arguments = data.arguments();
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if declaration {
                write!(f, "{}", self.module.value(*arg).ty())?;
            } else {
                self.write_operand(f, *arg)?;
            }
        }
        if data.is_vararg() {
            f.write_str(if arguments.is_empty() { "..." } else { ", ..." })?;
        }
        f.write_char(')')?;

        if declaration {
            return Ok(());
        }
        f.write_str(" {\n")?;
        for block in data.blocks().iter() {
            self.write_block(f, *block)?;
        }
        f.write_char('}')
    }

    pub fn write_global(&self, f: &mut dyn Write, id: ValueId) -> fmt::Result {
        let value = self.module.value(id);
        let Some(data) = value.as_global_variable() else {
            return self.write_operand(f, id);
        };
        self.write_ref(f, id)?;
        f.write_str(" = ")?;
        let initializer = data.initializer();
        if initializer.is_none() && data.attrs().linkage() == irlens_common::Linkage::External {
            f.write_str("external ")?;
        }
        write_attrs(f, data.attrs())?;
        let keyword = if data.is_constant() { "constant" } else { "global" };
        write!(f, "{keyword} {}", data.value_type())?;
        if let Some(init) = initializer {
            f.write_char(' ')?;
            self.write_ref(f, init)?;
        }
        Ok(())
    }

    /// Any value in its standalone form
    pub fn write_value(&mut self, f: &mut dyn Write, value: &Value) -> fmt::Result {
        match value.def() {
            ValueDef::Function(_) => {
                self.incorporate_function(value.id());
                self.write_function(f, value.id())
            }
            ValueDef::GlobalVariable(_) => self.write_global(f, value.id()),
            ValueDef::BasicBlock(_) | ValueDef::Instruction(_) | ValueDef::Argument { .. } => {
                if let Some(function) = value.parent_function() {
                    self.incorporate_function(function);
                }
                match value.def() {
                    ValueDef::BasicBlock(_) => self.write_block(f, value.id()),
                    ValueDef::Instruction(_) => {
                        f.write_str("  ")?;
                        self.write_instruction(f, value.id())
                    }
                    _ => self.write_operand(f, value.id()),
                }
            }
            _ => self.write_operand(f, value.id()),
        }
    }

    pub fn write_module(&mut self, f: &mut dyn Write) -> fmt::Result {
        f.write_str("; ModuleID = '")?;
        write_escaped(f, self.module.name_cstr().to_bytes())?;
        f.write_str("'\n")?;

        let globals = self.module.globals();
        if !globals.is_empty() {
            f.write_char('\n')?;
        }
        for global in globals {
            self.write_global(f, global)?;
            f.write_char('\n')?;
        }
        for function in self.module.functions() {
            f.write_char('\n')?;
            self.incorporate_function(function);
            self.write_function(f, function)?;
            f.write_char('\n')?;
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AsmWriter::new(self.module()).write_value(f, self)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AsmWriter::new(self).write_module(f)
    }
}

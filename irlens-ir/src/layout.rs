//! Data layout
//!
//! Parses a data layout string (`e-p:64:64-i64:64-f80:128-n8:16:32:64-S128`)
//! and answers ABI size, alignment and struct offset queries. Sizes and
//! alignments are in bytes; the string itself uses bits.

use irlens_common::{IrError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::IrType;

/// ABI and preferred alignment for one bit width, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct AlignEntry {
    bits: u32,
    abi: u64,
    preferred: u64,
}

/// Target data layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    rep: String,
    big_endian: bool,
    pointer_size: u64,
    pointer_align: u64,
    int_aligns: Vec<AlignEntry>,
    float_aligns: Vec<AlignEntry>,
    vector_aligns: Vec<AlignEntry>,
    aggregate_align: u64,
    native_ints: Vec<u32>,
    stack_align: Option<u64>,
    mangling: Option<char>,
}

impl Default for DataLayout {
    fn default() -> Self {
        let entry = |bits, abi, preferred| AlignEntry { bits, abi, preferred };
        Self {
            rep: String::new(),
            big_endian: false,
            pointer_size: 8,
            pointer_align: 8,
            int_aligns: vec![
                entry(1, 1, 1),
                entry(8, 1, 1),
                entry(16, 2, 2),
                entry(32, 4, 4),
                entry(64, 4, 8),
            ],
            float_aligns: vec![
                entry(16, 2, 2),
                entry(32, 4, 4),
                entry(64, 8, 8),
                entry(128, 16, 16),
            ],
            vector_aligns: vec![entry(64, 8, 8), entry(128, 16, 16)],
            aggregate_align: 1,
            native_ints: Vec::new(),
            stack_align: None,
            mangling: None,
        }
    }
}

/// `value` rounded up to a multiple of `align`; `None` on overflow
fn align_to(value: u64, align: u64) -> Option<u64> {
    let align = align.max(1);
    value.div_ceil(align).checked_mul(align)
}

fn parse_number(rep: &str, field: &str) -> Result<u64> {
    field
        .parse::<u64>()
        .map_err(|_| IrError::layout(rep, format!("'{field}' is not a number")))
}

/// A bit alignment from the string, converted to bytes
fn parse_align(rep: &str, field: &str) -> Result<u64> {
    let bits = parse_number(rep, field)?;
    if bits % 8 != 0 {
        let message = format!("alignment {bits} is not a whole number of bytes");
        return Err(IrError::layout(rep, message));
    }
    let bytes = bits / 8;
    if bytes != 0 && !bytes.is_power_of_two() {
        return Err(IrError::layout(rep, format!("alignment {bits} is neither 0 nor a power of 2")));
    }
    Ok(bytes)
}

fn upsert(entries: &mut Vec<AlignEntry>, entry: AlignEntry) {
    match entries.binary_search_by_key(&entry.bits, |e| e.bits) {
        Ok(index) => entries[index] = entry,
        Err(index) => entries.insert(index, entry),
    }
}

impl DataLayout {
    /// Parse a layout string; an empty string yields the defaults
    pub fn parse(rep: &str) -> Result<Self> {
        let mut layout = DataLayout { rep: rep.to_string(), ..DataLayout::default() };
        if rep.is_empty() {
            return Ok(layout);
        }

        for token in rep.split('-') {
            let mut fields = token.split(':');
            let head = fields.next().unwrap_or_default();
            let rest: Vec<&str> = fields.collect();
            let (kind, suffix) = head.split_at(head.chars().next().map_or(0, char::len_utf8));

            match kind {
                "e" | "E" if suffix.is_empty() && rest.is_empty() => {
                    layout.big_endian = kind == "E";
                }
                "m" if rest.len() == 1 && rest[0].len() == 1 => {
                    layout.mangling = rest[0].chars().next();
                }
                "p" => {
                    let address_space =
                        if suffix.is_empty() { 0 } else { parse_number(rep, suffix)? };
                    if rest.len() < 2 {
                        let message = "pointer entry needs a size and an alignment";
                        return Err(IrError::layout(rep, message));
                    }
                    let size = parse_number(rep, rest[0])?;
                    if size == 0 || size % 8 != 0 {
                        return Err(IrError::layout(rep, format!("invalid pointer size {size}")));
                    }
                    let abi = parse_align(rep, rest[1])?;
                    if address_space == 0 {
                        layout.pointer_size = size / 8;
                        layout.pointer_align = abi.max(1);
                    }
                }
                "i" | "f" | "v" => {
                    let bits = parse_number(rep, suffix)?;
                    if bits == 0 || bits > u32::MAX as u64 {
                        return Err(IrError::layout(rep, format!("invalid {kind} size {bits}")));
                    }
                    let abi_field = rest
                        .first()
                        .ok_or_else(|| {
                            IrError::layout(rep, format!("'{token}' needs an alignment"))
                        })?;
                    let abi = parse_align(rep, abi_field)?;
                    let preferred = match rest.get(1) {
                        Some(field) => parse_align(rep, field)?,
                        None => abi,
                    };
                    let entry =
                        AlignEntry { bits: bits as u32, abi, preferred: preferred.max(abi) };
                    let table = match kind {
                        "i" => &mut layout.int_aligns,
                        "f" => &mut layout.float_aligns,
                        _ => &mut layout.vector_aligns,
                    };
                    upsert(table, entry);
                }
                "a" => {
                    let abi_field = rest
                        .first()
                        .ok_or_else(|| IrError::layout(rep, "aggregate entry needs an alignment"))?;
                    layout.aggregate_align = parse_align(rep, abi_field)?.max(1);
                }
                "n" => {
                    let mut widths = vec![parse_number(rep, suffix)? as u32];
                    for field in &rest {
                        widths.push(parse_number(rep, field)? as u32);
                    }
                    layout.native_ints = widths;
                }
                "S" => {
                    let align = parse_align(rep, suffix)?;
                    layout.stack_align = (align != 0).then_some(align);
                }
                "A" | "P" | "G" => {
                    parse_number(rep, suffix)?;
                }
                "F" => {
                    // Function pointer alignment: `i` or `n`, then the bits
                    let bits = suffix
                        .strip_prefix(['i', 'n'])
                        .filter(|bits| !bits.is_empty())
                        .ok_or_else(|| {
                            let message = format!("invalid function pointer spec '{token}'");
                            IrError::layout(rep, message)
                        })?;
                    parse_align(rep, bits)?;
                }
                _ => {
                    return Err(IrError::layout(rep, format!("unknown specifier '{token}'")));
                }
            }
        }

        debug!("parsed data layout '{rep}'");
        Ok(layout)
    }

    /// The string this layout was parsed from
    pub fn string_rep(&self) -> &str {
        &self.rep
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn native_int_widths(&self) -> &[u32] {
        &self.native_ints
    }

    pub fn stack_alignment(&self) -> Option<u64> {
        self.stack_align
    }

    pub fn mangling(&self) -> Option<char> {
        self.mangling
    }

    /// Smallest entry at least `bits` wide, falling back to the widest one
    fn int_alignment(&self, bits: u32) -> u64 {
        self.int_aligns
            .iter()
            .find(|e| e.bits >= bits)
            .or_else(|| self.int_aligns.last())
            .map_or(1, |e| e.abi)
    }

    /// Exact match, else the store size rounded up to a power of two
    fn exact_or_natural(entries: &[AlignEntry], bits: u32, store_size: u64) -> Option<u64> {
        match entries.iter().find(|e| e.bits == bits) {
            Some(entry) => Some(entry.abi),
            None => store_size.max(1).checked_next_power_of_two(),
        }
    }

    /// Bytes needed to store a value, without tail padding
    pub fn store_size_of(&self, ty: &IrType) -> Option<u64> {
        match ty {
            IrType::Int(_) | IrType::Half | IrType::Float | IrType::Double | IrType::X86Fp80
            | IrType::Fp128 => ty.primitive_bits().map(|bits| bits.div_ceil(8)),
            IrType::Ptr => Some(self.pointer_size),
            IrType::Vector { size, element_type } => {
                let bits = element_type.primitive_bits().or_else(|| {
                    element_type.is_pointer().then_some(self.pointer_size * 8)
                })?;
                Some(bits.checked_mul(*size)?.div_ceil(8))
            }
            _ => self.abi_size_of(ty),
        }
    }

    /// Allocation size including tail padding; `None` for unsized types
    pub fn abi_size_of(&self, ty: &IrType) -> Option<u64> {
        if !ty.is_sized() {
            return None;
        }
        match ty {
            IrType::Array { size, element_type } => {
                self.abi_size_of(element_type)?.checked_mul(*size)
            }
            IrType::Struct { fields, packed, .. } => {
                let (size, align) = self.struct_layout(fields, *packed)?;
                align_to(size, align)
            }
            _ => {
                let store = self.store_size_of(ty)?;
                align_to(store, self.abi_alignment_of(ty)?)
            }
        }
    }

    /// ABI alignment; `None` for unsized types
    pub fn abi_alignment_of(&self, ty: &IrType) -> Option<u64> {
        if !ty.is_sized() {
            return None;
        }
        match ty {
            IrType::Int(bits) => Some(self.int_alignment(*bits)),
            IrType::Ptr => Some(self.pointer_align),
            IrType::Half | IrType::Float | IrType::Double | IrType::X86Fp80 | IrType::Fp128 => {
                let bits = ty.primitive_bits()? as u32;
                Self::exact_or_natural(&self.float_aligns, bits, bits.div_ceil(8) as u64)
            }
            IrType::Vector { .. } => {
                let store = self.store_size_of(ty)?;
                let bits = u32::try_from(store.checked_mul(8)?).ok()?;
                Self::exact_or_natural(&self.vector_aligns, bits, store)
            }
            IrType::Array { element_type, .. } => self.abi_alignment_of(element_type),
            IrType::Struct { fields, packed, .. } => {
                self.struct_layout(fields, *packed).map(|(_, align)| align)
            }
            _ => None,
        }
    }

    /// Offset of every field, then the unpadded size and the struct alignment
    fn field_offsets(&self, fields: &[IrType], packed: bool) -> Option<(Vec<u64>, u64, u64)> {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut offset = 0u64;
        let mut struct_align = if packed { 1 } else { self.aggregate_align };
        for field in fields {
            let align = if packed { 1 } else { self.abi_alignment_of(field)? };
            offset = align_to(offset, align)?;
            offsets.push(offset);
            offset = offset.checked_add(self.abi_size_of(field)?)?;
            struct_align = struct_align.max(align);
        }
        Some((offsets, offset, struct_align))
    }

    fn struct_layout(&self, fields: &[IrType], packed: bool) -> Option<(u64, u64)> {
        self.field_offsets(fields, packed).map(|(_, size, align)| (size, align))
    }

    /// Byte offset of field `index` of a struct type
    pub fn offset_of_element(&self, ty: &IrType, index: usize) -> Option<u64> {
        match ty {
            IrType::Struct { fields, packed, .. } => {
                let (offsets, _, _) = self.field_offsets(fields, *packed)?;
                offsets.get(index).copied()
            }
            _ => None,
        }
    }
}

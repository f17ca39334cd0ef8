//! Binary floating point constants in several formats
//!
//! A finite `ApFloat` holds its value exactly as `significand * 2^exponent`,
//! with the significand narrow enough for the format's precision. Converting
//! between formats rounds to nearest, ties to even, and reports whether any
//! information was lost. A NaN keeps its fraction field (quiet bit and
//! payload) in `significand`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported floating point formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatSemantics {
    Half,
    Single,
    Double,
    X87DoubleExtended,
    Quad,
}

impl FloatSemantics {
    /// Significand bits, including the leading integer bit
    pub fn precision(self) -> u32 {
        match self {
            FloatSemantics::Half => 11,
            FloatSemantics::Single => 24,
            FloatSemantics::Double => 53,
            FloatSemantics::X87DoubleExtended => 64,
            FloatSemantics::Quad => 113,
        }
    }

    /// Largest unbiased exponent; also the exponent bias
    pub fn max_exponent(self) -> i32 {
        match self {
            FloatSemantics::Half => 15,
            FloatSemantics::Single => 127,
            FloatSemantics::Double => 1023,
            FloatSemantics::X87DoubleExtended | FloatSemantics::Quad => 16383,
        }
    }

    pub fn min_exponent(self) -> i32 {
        1 - self.max_exponent()
    }

    fn exponent_bits(self) -> u32 {
        match self {
            FloatSemantics::Half => 5,
            FloatSemantics::Single => 8,
            FloatSemantics::Double => 11,
            FloatSemantics::X87DoubleExtended | FloatSemantics::Quad => 15,
        }
    }

    /// Stored significand bits; x87 stores its integer bit explicitly
    fn mantissa_bits(self) -> u32 {
        match self {
            FloatSemantics::X87DoubleExtended => 64,
            other => other.precision() - 1,
        }
    }

    /// Width of the fraction field, excluding any explicit integer bit
    fn fraction_bits(self) -> u32 {
        self.precision() - 1
    }

    fn explicit_integer_bit(self) -> bool {
        matches!(self, FloatSemantics::X87DoubleExtended)
    }

    pub fn storage_bits(self) -> u32 {
        1 + self.exponent_bits() + self.mantissa_bits()
    }

    /// Exponent of the least significant representable bit (smallest denormal)
    fn min_lsb_exponent(self) -> i32 {
        self.min_exponent() - (self.precision() as i32 - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Category {
    Zero,
    Normal,
    Infinity,
    NaN,
}

/// Floating point value in a specific format
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApFloat {
    semantics: FloatSemantics,
    category: Category,
    negative: bool,
    significand: u128,
    exponent: i32,
}

/// Outcome of rounding an exact value into a format
struct Rounded {
    category: Category,
    significand: u128,
    exponent: i32,
    inexact: bool,
}

fn round_into(semantics: FloatSemantics, significand: u128, exponent: i32) -> Rounded {
    let overflow =
        Rounded { category: Category::Infinity, significand: 0, exponent: 0, inexact: true };
    if significand == 0 {
        return Rounded { category: Category::Zero, significand: 0, exponent: 0, inexact: false };
    }

    let precision = semantics.precision() as i32;
    let width = 128 - significand.leading_zeros() as i32;
    let top = exponent.saturating_add(width - 1);
    if top > semantics.max_exponent() {
        return overflow;
    }

    let lsb = (top - (precision - 1)).max(semantics.min_lsb_exponent());
    if exponent >= lsb {
        return Rounded { category: Category::Normal, significand, exponent, inexact: false };
    }

    let shift = (lsb as i64 - exponent as i64) as u64;
    let (mut kept, round_up, inexact) = if shift > 128 {
        (0u128, false, true)
    } else if shift == 128 {
        (0u128, significand > 1u128 << 127, true)
    } else {
        let kept = significand >> shift;
        let rem = significand & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        let up = rem > half || (rem == half && kept & 1 == 1);
        (kept, up, rem != 0)
    };
    let mut lsb = lsb;
    if round_up {
        kept += 1;
        if kept == 1u128 << precision {
            kept >>= 1;
            lsb += 1;
            if lsb + (precision - 1) > semantics.max_exponent() {
                return overflow;
            }
        }
    }

    if kept == 0 {
        Rounded { category: Category::Zero, significand: 0, exponent: 0, inexact }
    } else {
        Rounded { category: Category::Normal, significand: kept, exponent: lsb, inexact }
    }
}

impl ApFloat {
    pub fn zero(semantics: FloatSemantics, negative: bool) -> Self {
        Self { semantics, category: Category::Zero, negative, significand: 0, exponent: 0 }
    }

    pub fn infinity(semantics: FloatSemantics, negative: bool) -> Self {
        Self { semantics, category: Category::Infinity, negative, significand: 0, exponent: 0 }
    }

    /// The default quiet NaN
    pub fn nan(semantics: FloatSemantics) -> Self {
        let quiet = 1u128 << (semantics.fraction_bits() - 1);
        Self {
            semantics,
            category: Category::NaN,
            negative: false,
            significand: quiet,
            exponent: 0,
        }
    }

    /// Round `significand * 2^exponent` into the format; the flag is true when rounding changed
    /// the value
    pub fn from_parts(
        semantics: FloatSemantics,
        negative: bool,
        significand: u128,
        exponent: i32,
    ) -> (Self, bool) {
        let rounded = round_into(semantics, significand, exponent);
        let value = Self {
            semantics,
            category: rounded.category,
            negative,
            significand: rounded.significand,
            exponent: rounded.exponent,
        };
        (value, rounded.inexact)
    }

    /// Convert a host double; the flag reports a lossy narrowing
    pub fn from_f64(semantics: FloatSemantics, value: f64) -> (Self, bool) {
        Self::from_bits(FloatSemantics::Double, value.to_bits() as u128).convert(semantics)
    }

    /// Decode an IEEE (or x87) bit pattern
    pub fn from_bits(semantics: FloatSemantics, bits: u128) -> Self {
        let mantissa_bits = semantics.mantissa_bits();
        let exponent_bits = semantics.exponent_bits();
        let negative = (bits >> (mantissa_bits + exponent_bits)) & 1 == 1;
        let biased = ((bits >> mantissa_bits) & ((1u128 << exponent_bits) - 1)) as i32;
        let field = bits & ((1u128 << mantissa_bits) - 1);
        let all_ones = (1i32 << exponent_bits) - 1;

        let fraction = if semantics.explicit_integer_bit() {
            field & ((1u128 << (mantissa_bits - 1)) - 1)
        } else {
            field
        };
        let precision = semantics.precision() as i32;

        if biased == all_ones {
            return if fraction == 0 {
                Self::infinity(semantics, negative)
            } else {
                Self {
                    semantics,
                    category: Category::NaN,
                    negative,
                    significand: fraction,
                    exponent: 0,
                }
            };
        }
        if biased == 0 {
            if field == 0 {
                return Self::zero(semantics, negative);
            }
            return Self {
                semantics,
                category: Category::Normal,
                negative,
                significand: field,
                exponent: semantics.min_lsb_exponent(),
            };
        }

        let significand = if semantics.explicit_integer_bit() {
            field
        } else {
            field | (1u128 << (precision - 1))
        };
        Self {
            semantics,
            category: Category::Normal,
            negative,
            significand,
            exponent: biased - semantics.max_exponent() - (precision - 1),
        }
    }

    /// Encode to the format's bit pattern (low `storage_bits` bits)
    pub fn to_bits(&self) -> u128 {
        let semantics = self.semantics;
        let mantissa_bits = semantics.mantissa_bits();
        let exponent_bits = semantics.exponent_bits();
        let all_ones = (1u128 << exponent_bits) - 1;
        let integer_bit =
            if semantics.explicit_integer_bit() { 1u128 << (mantissa_bits - 1) } else { 0 };

        let (biased, field) = match self.category {
            Category::Zero => (0u128, 0u128),
            Category::Infinity => (all_ones, integer_bit),
            Category::NaN => (all_ones, integer_bit | self.significand),
            Category::Normal => {
                let precision = semantics.precision() as i32;
                let width = 128 - self.significand.leading_zeros() as i32;
                let top = self.exponent + width - 1;
                if top >= semantics.min_exponent() {
                    let normalized = self.significand << (precision - width);
                    let biased = (top + semantics.max_exponent()) as u128;
                    let field = if semantics.explicit_integer_bit() {
                        normalized
                    } else {
                        normalized & ((1u128 << (precision - 1)) - 1)
                    };
                    (biased, field)
                } else {
                    let shift = self.exponent - semantics.min_lsb_exponent();
                    (0, self.significand << shift)
                }
            }
        };

        let sign = if self.negative { 1u128 } else { 0 };
        (sign << (mantissa_bits + exponent_bits)) | (biased << mantissa_bits) | field
    }

    /// Convert to another format; the flag is true when the value changed
    pub fn convert(&self, semantics: FloatSemantics) -> (Self, bool) {
        match self.category {
            Category::Normal => {
                Self::from_parts(semantics, self.negative, self.significand, self.exponent)
            }
            Category::Zero => (Self::zero(semantics, self.negative), false),
            Category::Infinity => (Self::infinity(semantics, self.negative), false),
            Category::NaN => self.convert_nan(semantics),
        }
    }

    /// Move the NaN fraction into the new width, top bits aligned
    fn convert_nan(&self, semantics: FloatSemantics) -> (Self, bool) {
        let from = self.semantics.fraction_bits();
        let to = semantics.fraction_bits();
        let (mut payload, mut lossy) = if to >= from {
            (self.significand << (to - from), false)
        } else {
            let shift = from - to;
            (self.significand >> shift, self.significand & ((1u128 << shift) - 1) != 0)
        };
        if payload == 0 {
            // Only the dropped low bits were set; stay a NaN rather than become infinity
            payload = 1u128 << (to - 1);
            lossy = true;
        }
        let value = Self {
            semantics,
            category: Category::NaN,
            negative: self.negative,
            significand: payload,
            exponent: 0,
        };
        (value, lossy)
    }

    /// Convert to a host double; the flag is true when the conversion was not exact
    pub fn to_f64(&self) -> (f64, bool) {
        let (double, loses_info) = self.convert(FloatSemantics::Double);
        (f64::from_bits(double.to_bits() as u64), loses_info)
    }

    pub fn semantics(&self) -> FloatSemantics {
        self.semantics
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.category == Category::Zero
    }

    pub fn is_nan(&self) -> bool {
        self.category == Category::NaN
    }

    pub fn is_infinite(&self) -> bool {
        self.category == Category::Infinity
    }
}

/// Decimal with a six digit mantissa and a signed two digit exponent, e.g. `1.500000e+00`
fn format_scientific(value: f64) -> String {
    let raw = format!("{value:.6e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

impl fmt::Display for ApFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (double, lossy) = self.to_f64();
        match self.semantics {
            FloatSemantics::Single | FloatSemantics::Double => {
                let printable = !lossy && double.is_finite();
                let round_trips =
                    printable && format_scientific(double).parse::<f64>().ok() == Some(double);
                if round_trips {
                    write!(f, "{}", format_scientific(double))
                } else {
                    write!(f, "0x{:016X}", double.to_bits())
                }
            }
            FloatSemantics::Half => write!(f, "0xH{:04X}", self.to_bits()),
            FloatSemantics::X87DoubleExtended => write!(f, "0xK{:020X}", self.to_bits()),
            FloatSemantics::Quad => write!(f, "0xL{:032X}", self.to_bits()),
        }
    }
}

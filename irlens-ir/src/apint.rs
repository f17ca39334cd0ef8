//! Arbitrary-width integers
//!
//! `ApInt` stores an integer of any bit width as a little-endian sequence of
//! 64-bit words (word 0 is the least significant). The words themselves are
//! native integers, so their byte order is the host's. Bits above the width in
//! the last word are always zero.

use irlens_common::{IrError, Result};
use std::fmt;

use crate::apfloat::{ApFloat, FloatSemantics};

pub const WORD_BITS: u32 = 64;

fn words_for(bit_width: u32) -> usize {
    (bit_width.div_ceil(WORD_BITS) as usize).max(1)
}

/// Fixed-width big integer with two's complement semantics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApInt {
    bit_width: u32,
    words: Vec<u64>,
}

impl ApInt {
    /// Build from little-endian words, truncating or zero extending to `bit_width`
    pub fn from_words(bit_width: u32, words: &[u64]) -> Self {
        let mut storage = vec![0u64; words_for(bit_width)];
        for (dst, src) in storage.iter_mut().zip(words) {
            *dst = *src;
        }
        let mut value = Self { bit_width, words: storage };
        value.clear_unused_bits();
        value
    }

    pub fn from_u64(bit_width: u32, value: u64) -> Self {
        Self::from_words(bit_width, &[value])
    }

    /// Sign extends `value` across every word before truncating to the width
    pub fn from_i64(bit_width: u32, value: i64) -> Self {
        let fill = if value < 0 { u64::MAX } else { 0 };
        let mut words = vec![fill; words_for(bit_width)];
        words[0] = value as u64;
        let mut value = Self { bit_width, words };
        value.clear_unused_bits();
        value
    }

    /// Parse a literal in the given radix; a leading '-' yields the two's complement
    pub fn from_str_radix(bit_width: u32, literal: &str, radix: u32) -> Result<Self> {
        let error = || IrError::IntegerLiteral {
            literal: literal.to_string(),
            bit_width,
        };

        let (negative, digits) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        if digits.is_empty() || !(2..=36).contains(&radix) {
            return Err(error());
        }

        let mut value = Self::from_u64(bit_width, 0);
        for ch in digits.chars() {
            if ch == '_' {
                continue;
            }
            let digit = ch.to_digit(radix).ok_or_else(error)?;
            if value.mul_add_small(radix as u64, digit as u64) {
                return Err(error());
            }
        }

        Ok(if negative { value.negated() } else { value })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// The internal word array, least significant word first
    pub fn raw_data(&self) -> &[u64] {
        &self.words
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Whether the sign bit is set
    pub fn is_negative(&self) -> bool {
        let bit = self.bit_width.saturating_sub(1);
        (self.words[(bit / WORD_BITS) as usize] >> (bit % WORD_BITS)) & 1 == 1
    }

    /// Value as an unsigned 64-bit integer, if it fits
    pub fn zext_value(&self) -> Option<u64> {
        if self.words[1..].iter().all(|w| *w == 0) {
            Some(self.words[0])
        } else {
            None
        }
    }

    /// Value as a signed 64-bit integer, if it fits
    pub fn sext_value(&self) -> Option<i64> {
        if self.bit_width <= WORD_BITS {
            let shift = WORD_BITS - self.bit_width;
            return Some(((self.words[0] << shift) as i64) >> shift);
        }
        if self.is_negative() {
            let magnitude = self.negated().zext_value()?;
            if magnitude <= 1u64 << 63 {
                Some((magnitude as i64).wrapping_neg())
            } else {
                None
            }
        } else {
            self.zext_value()
                .filter(|v| *v <= i64::MAX as u64)
                .map(|v| v as i64)
        }
    }

    /// Two's complement negation, wrapping at the bit width
    pub fn negated(&self) -> Self {
        let mut words: Vec<u64> = self.words.iter().map(|w| !w).collect();
        for word in words.iter_mut() {
            let (sum, carry) = word.overflowing_add(1);
            *word = sum;
            if !carry {
                break;
            }
        }
        let mut value = Self { bit_width: self.bit_width, words };
        value.clear_unused_bits();
        value
    }

    /// Signed conversion to a double, with `true` when the result is exact
    pub fn to_f64_signed(&self) -> (f64, bool) {
        let negative = self.is_negative();
        let magnitude = if negative { self.negated() } else { self.clone() };

        // Keep the top 128 significant bits; anything below only matters as "inexact".
        let top_bit = match magnitude.highest_set_bit() {
            Some(bit) => bit,
            None => return (0.0, true),
        };
        let shift = top_bit.saturating_sub(127);
        let window = magnitude.bits_from(shift);
        let truncated = shift > 0 && magnitude.any_bits_below(shift);

        let (value, lossy) =
            ApFloat::from_parts(FloatSemantics::Double, negative, window, shift as i32);
        let (result, convert_lossy) = value.to_f64();
        (result, !(lossy || convert_lossy || truncated))
    }

    /// Signed decimal representation
    pub fn to_string_signed(&self) -> String {
        if self.is_negative() && self.bit_width > 1 {
            format!("-{}", self.negated().to_string_unsigned())
        } else {
            self.to_string_unsigned()
        }
    }

    /// Unsigned decimal representation
    pub fn to_string_unsigned(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut scratch = self.words.clone();
        let mut digits = Vec::new();
        while scratch.iter().any(|w| *w != 0) {
            let rem = divmod_small(&mut scratch, 10);
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        String::from_utf8(digits).unwrap_or_default()
    }

    /// Multiply by `mul` and add `add` in place; returns true on overflow of the width
    fn mul_add_small(&mut self, mul: u64, add: u64) -> bool {
        let mut carry = add as u128;
        for word in self.words.iter_mut() {
            let wide = (*word as u128) * (mul as u128) + carry;
            *word = wide as u64;
            carry = wide >> 64;
        }
        let before = self.words.clone();
        self.clear_unused_bits();
        carry != 0 || before != self.words
    }

    fn clear_unused_bits(&mut self) {
        let rem = self.bit_width % WORD_BITS;
        if rem != 0 {
            let last = self.words.len() - 1;
            self.words[last] &= (1u64 << rem) - 1;
        }
    }

    fn highest_set_bit(&self) -> Option<u32> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i as u32 * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros()))
    }

    /// 128 bits starting at bit `shift`
    fn bits_from(&self, shift: u32) -> u128 {
        let mut out = 0u128;
        for i in 0..128u32 {
            let bit = shift + i;
            let word = (bit / WORD_BITS) as usize;
            if word >= self.words.len() {
                break;
            }
            if (self.words[word] >> (bit % WORD_BITS)) & 1 == 1 {
                out |= 1u128 << i;
            }
        }
        out
    }

    fn any_bits_below(&self, bit: u32) -> bool {
        (0..bit).any(|b| (self.words[(b / WORD_BITS) as usize] >> (b % WORD_BITS)) & 1 == 1)
    }
}

/// Divide the little-endian word vector by `div` in place, returning the remainder
fn divmod_small(words: &mut [u64], div: u64) -> u64 {
    let mut rem = 0u128;
    for word in words.iter_mut().rev() {
        let cur = (rem << 64) | *word as u128;
        *word = (cur / div as u128) as u64;
        rem = cur % div as u128;
    }
    rem as u64
}

impl fmt::Display for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_signed())
    }
}

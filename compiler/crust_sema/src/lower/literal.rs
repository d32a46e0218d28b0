//! C literal decoding.
//!
//! The parser hands literals through as lexemes; this module applies
//! C99's base, suffix, and escape rules. A lexeme the lexer should never
//! have produced is a malformed AST and aborts.

use crust_ast::types::{CType, FloatRank, IntRank};
use crust_ast::Token;
use crust_ir::{IrConst, IrValue};

use crate::context::Sema;
use crate::lower::expr::ExprResult;
use crate::types::fold_int;

/// Decoded integer-literal suffix.
#[derive(Copy, Clone, Default, Debug)]
struct IntSuffix {
    unsigned: bool,
    longs: u8,
}

fn split_int_suffix(text: &str) -> (&str, IntSuffix) {
    let mut suffix = IntSuffix::default();
    let mut end = text.len();
    let bytes = text.as_bytes();
    loop {
        if end >= 2 && (bytes[end - 2..end].eq_ignore_ascii_case(b"ll")) {
            suffix.longs = 2;
            end -= 2;
        } else if end >= 1 && (bytes[end - 1] == b'l' || bytes[end - 1] == b'L') {
            suffix.longs = suffix.longs.max(1);
            end -= 1;
        } else if end >= 1 && (bytes[end - 1] == b'u' || bytes[end - 1] == b'U') {
            suffix.unsigned = true;
            end -= 1;
        } else {
            break;
        }
    }
    (&text[..end], suffix)
}

/// Decode an integer literal lexeme into its value, suffix, and base.
fn decode_int(text: &str) -> Option<(u64, IntSuffix, bool)> {
    let (digits, suffix) = split_int_suffix(text);
    if digits.is_empty() {
        return None;
    }
    let (value, decimal) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (u64::from_str_radix(hex, 16).ok()?, false)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (u64::from_str_radix(&digits[1..], 8).ok()?, false)
    } else {
        (digits.parse::<u64>().ok()?, true)
    };
    Some((value, suffix, decimal))
}

/// Decode a floating literal lexeme into its value and rank.
fn decode_float(text: &str) -> Option<(f64, FloatRank)> {
    let (digits, rank) = match text.as_bytes().last() {
        Some(b'f' | b'F') => (&text[..text.len() - 1], FloatRank::Float),
        Some(b'l' | b'L') => (&text[..text.len() - 1], FloatRank::LongDouble),
        _ => (text, FloatRank::Double),
    };
    digits.parse::<f64>().ok().map(|v| (v, rank))
}

/// Decode one escape sequence starting after the backslash; returns the
/// byte value and how many input bytes were consumed.
fn decode_escape(rest: &[u8]) -> Option<(u8, usize)> {
    match rest.first()? {
        b'n' => Some((b'\n', 1)),
        b't' => Some((b'\t', 1)),
        b'r' => Some((b'\r', 1)),
        b'a' => Some((0x07, 1)),
        b'b' => Some((0x08, 1)),
        b'f' => Some((0x0c, 1)),
        b'v' => Some((0x0b, 1)),
        b'\\' => Some((b'\\', 1)),
        b'\'' => Some((b'\'', 1)),
        b'"' => Some((b'"', 1)),
        b'?' => Some((b'?', 1)),
        b'x' => {
            let mut value: u32 = 0;
            let mut used = 0;
            for &b in &rest[1..] {
                let d = (b as char).to_digit(16)?;
                value = value * 16 + d;
                used += 1;
                if used == 2 {
                    break;
                }
            }
            if used == 0 {
                return None;
            }
            #[expect(clippy::cast_possible_truncation, reason = "two hex digits max")]
            Some((value as u8, 1 + used))
        }
        b'0'..=b'7' => {
            let mut value: u32 = 0;
            let mut used = 0;
            for &b in rest {
                let Some(d) = (b as char).to_digit(8) else { break };
                value = value * 8 + d;
                used += 1;
                if used == 3 {
                    break;
                }
            }
            #[expect(clippy::cast_possible_truncation, reason = "three octal digits max")]
            Some((value as u8, used))
        }
        _ => None,
    }
}

/// Decode a quoted string literal lexeme into its bytes (no terminator).
fn decode_string(text: &str) -> Option<Vec<u8>> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let (b, used) = decode_escape(&bytes[i + 1..])?;
            out.push(b);
            i += 1 + used;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// Decode a quoted character literal lexeme.
fn decode_char(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let bytes = inner.as_bytes();
    if bytes.first()? == &b'\\' {
        let (b, used) = decode_escape(&bytes[1..])?;
        if 1 + used != bytes.len() {
            return None;
        }
        Some(i64::from(b))
    } else if bytes.len() == 1 {
        Some(i64::from(bytes[0]))
    } else {
        None
    }
}

impl Sema<'_> {
    /// Lower an integer literal, choosing its type per C99 §6.4.4.1.
    pub(crate) fn lower_int_literal(&mut self, tok: Token) -> ExprResult {
        let text = self.text(tok);
        let Some((value, suffix, decimal)) = decode_int(text) else {
            panic!("malformed integer literal `{text}` at {:?}", tok.pos);
        };

        let candidates: &[(IntRank, bool)] = match (suffix.unsigned, suffix.longs, decimal) {
            (false, 0, true) => &[(IntRank::Int, true), (IntRank::Long, true), (IntRank::LongLong, true)],
            (false, 0, false) => &[
                (IntRank::Int, true),
                (IntRank::Int, false),
                (IntRank::Long, true),
                (IntRank::Long, false),
                (IntRank::LongLong, true),
                (IntRank::LongLong, false),
            ],
            (true, 0, _) => &[(IntRank::Int, false), (IntRank::Long, false), (IntRank::LongLong, false)],
            (false, 1, true) => &[(IntRank::Long, true), (IntRank::LongLong, true)],
            (false, 1, false) => &[
                (IntRank::Long, true),
                (IntRank::Long, false),
                (IntRank::LongLong, true),
                (IntRank::LongLong, false),
            ],
            (true, 1, _) => &[(IntRank::Long, false), (IntRank::LongLong, false)],
            (false, _, true) => &[(IntRank::LongLong, true)],
            (false, _, false) => &[(IntRank::LongLong, true), (IntRank::LongLong, false)],
            (true, _, _) => &[(IntRank::LongLong, false)],
        };

        let (rank, signed) = candidates
            .iter()
            .copied()
            .find(|&(rank, signed)| {
                let bits = self.target.int_type(rank, signed).int_bits();
                if signed {
                    value <= (1u64 << (bits - 1)) - 1
                } else if bits >= 64 {
                    true
                } else {
                    value < (1u64 << bits)
                }
            })
            .unwrap_or((IntRank::LongLong, false));

        let cty = CType::new(crust_ast::TypeKind::Int { rank, signed });
        let ir = self.target.int_type(rank, signed);
        #[expect(clippy::cast_possible_wrap, reason = "bit reinterpretation")]
        let stored = fold_int(value as i64, &ir);
        ExprResult::rvalue(cty, IrValue::Const(IrConst::int(stored, ir)))
    }

    /// Lower a floating literal.
    pub(crate) fn lower_float_literal(&mut self, tok: Token) -> ExprResult {
        let text = self.text(tok);
        let Some((value, rank)) = decode_float(text) else {
            panic!("malformed floating literal `{text}` at {:?}", tok.pos);
        };
        let cty = CType::float(rank);
        let ir = self.target.float_type(rank);
        ExprResult::rvalue(cty, IrValue::Const(IrConst::float(value, ir)))
    }

    /// Lower a character literal; its C type is `int`.
    pub(crate) fn lower_char_literal(&mut self, tok: Token) -> ExprResult {
        let text = self.text(tok);
        let Some(value) = decode_char(text) else {
            panic!("malformed character literal `{text}` at {:?}", tok.pos);
        };
        ExprResult::rvalue(
            CType::int(),
            IrValue::Const(IrConst::int(value, self.target.sint.clone())),
        )
    }

    /// Decode a string literal's bytes (without the NUL terminator).
    pub(crate) fn string_bytes(&mut self, tok: Token) -> Vec<u8> {
        let text = self.text(tok);
        decode_string(text)
            .unwrap_or_else(|| panic!("malformed string literal `{text}` at {:?}", tok.pos))
    }
}

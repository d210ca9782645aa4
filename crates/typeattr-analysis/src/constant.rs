//! Exact constant values.
//!
//! Constants are folded at arbitrary precision: integers and runes as
//! [`BigInt`], floats as [`BigRational`], complex numbers as a pair of
//! rationals. Values are only rounded when they are converted into a sized
//! kind (see [`Value::round_to`]).

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{Num, One, Signed, ToPrimitive, Zero};
use thiserror::Error;
use typeattr_syntax::ast::{BinaryOp, UnaryOp};

use crate::typ::BasicType;

// ============================================================================
// Part 1: Values and errors
// ============================================================================

/// Largest decimal exponent accepted in a float literal.
const MAX_EXP10: u32 = 100_000;

#[derive(Clone, Debug, Default)]
pub enum Value {
    /// The result of a fold that failed; never reported twice.
    #[default]
    Unknown,
    Bool(bool),
    Str(String),
    Int(BigInt),
    Rune(BigInt),
    Float(BigRational),
    Complex(BigRational, BigRational),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConstError {
    #[error("malformed constant literal {0}")]
    Malformed(String),
    #[error("constant overflow")]
    Overflow,
    #[error("constant truncated")]
    Truncated,
    #[error("constant of this kind cannot represent the value")]
    Mismatch,
    #[error("division by zero")]
    DivisionByZero,
}

/// Numeric rank used to bring mixed operands to a common representation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Int,
    Rune,
    Float,
    Complex,
}

impl Value {
    pub fn with_i64(i: i64) -> Value {
        Value::Int(BigInt::from(i))
    }

    pub fn with_u64(u: u64) -> Value {
        Value::Int(BigInt::from(u))
    }

    /// A float value holding `f` exactly; non-finite inputs are unknown.
    pub fn with_f64(f: f64) -> Value {
        match BigRational::from_float(f) {
            Some(r) => Value::Float(r),
            None => Value::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        self.rank().is_some()
    }

    fn rank(&self) -> Option<Rank> {
        match self {
            Value::Int(_) => Some(Rank::Int),
            Value::Rune(_) => Some(Rank::Rune),
            Value::Float(_) => Some(Rank::Float),
            Value::Complex(..) => Some(Rank::Complex),
            _ => None,
        }
    }

    pub fn bool_as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn str_as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if the value is integral.
    pub fn to_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) | Value::Rune(i) => Some(i.clone()),
            Value::Float(r) if r.is_integer() => Some(r.to_integer()),
            Value::Complex(re, im) if im.is_zero() && re.is_integer() => Some(re.to_integer()),
            _ => None,
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_int().and_then(|i| i.to_i64())
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_int().and_then(|i| i.to_u64())
    }

    /// The value as a rational, if it has no imaginary part.
    pub fn to_rat(&self) -> Option<BigRational> {
        match self {
            Value::Int(i) | Value::Rune(i) => Some(BigRational::from_integer(i.clone())),
            Value::Float(r) => Some(r.clone()),
            Value::Complex(re, im) if im.is_zero() => Some(re.clone()),
            _ => None,
        }
    }

    pub fn to_complex(&self) -> Option<(BigRational, BigRational)> {
        match self {
            Value::Complex(re, im) => Some((re.clone(), im.clone())),
            _ => self.to_rat().map(|r| (r, BigRational::zero())),
        }
    }

    /// -1, 0 or 1; unknown values count as positive so that no division by
    /// zero is reported for them.
    pub fn sign(&self) -> i32 {
        let sign_of = |r: &BigRational| match r.cmp(&BigRational::zero()) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        match self {
            Value::Int(i) | Value::Rune(i) => match i.sign() {
                Sign::Minus => -1,
                Sign::NoSign => 0,
                Sign::Plus => 1,
            },
            Value::Float(r) => sign_of(r),
            Value::Complex(re, im) => (sign_of(re) != 0 || sign_of(im) != 0) as i32,
            _ => 1,
        }
    }

    /// Nearest `f64` to a real value.
    pub fn to_f64(&self) -> Option<f64> {
        self.to_rat().map(|r| rat_to_f64(&r))
    }
}

// ============================================================================
// Part 2: Rounding
// ============================================================================

/// A binary floating-point format: significand width in bits and the
/// range of the exponent of its least significant bit.
#[derive(Clone, Copy, Debug)]
struct FloatFormat {
    mant: u64,
    min_exp: i64,
    max_exp: i64,
}

const FLOAT32: FloatFormat = FloatFormat {
    mant: 24,
    min_exp: -149,
    max_exp: 104,
};

const FLOAT64: FloatFormat = FloatFormat {
    mant: 53,
    min_exp: -1074,
    max_exp: 971,
};

/// Rounds `x` to the nearest value of `format`, ties to even, as
/// `m * 2^e`. Magnitudes below half the smallest subnormal become zero;
/// `None` means the magnitude overflows.
fn round_binary(x: &BigRational, format: FloatFormat) -> Option<(BigInt, i64)> {
    if x.is_zero() {
        return Some((BigInt::zero(), 0));
    }
    let n = x.numer().abs();
    let d = x.denom().abs();
    // floor(|x| / 2^e) and the remainder over its divisor
    let divide = |e: i64| {
        let (num, den) = if e <= 0 {
            (&n << (-e) as usize, d.clone())
        } else {
            (n.clone(), &d << e as usize)
        };
        (&num / &den, &num % &den, den)
    };

    // |x| / 2^e lies in (2^(mant-1), 2^(mant+1))
    let mut e = n.bits() as i64 - d.bits() as i64 - format.mant as i64;
    let (mut q, mut r, mut den) = divide(e);
    if q.bits() > format.mant {
        e += 1;
        (q, r, den) = divide(e);
    }
    if e < format.min_exp {
        e = format.min_exp;
        (q, r, den) = divide(e);
    }

    let round_up = match (&r << 1usize).cmp(&den) {
        Ordering::Greater => true,
        Ordering::Equal => !(&q & &BigInt::one()).is_zero(),
        Ordering::Less => false,
    };
    if round_up {
        q += 1u32;
        if q.bits() > format.mant {
            q >>= 1usize;
            e += 1;
        }
    }
    if e > format.max_exp {
        return None;
    }
    if x.is_negative() {
        q = -q;
    }
    Some((q, e))
}

fn binary_to_rat(m: BigInt, e: i64) -> BigRational {
    if e >= 0 {
        BigRational::from_integer(m << e as usize)
    } else {
        BigRational::new(m, BigInt::one() << (-e) as usize)
    }
}

/// Nearest `f64` to `x`. Magnitudes too large become infinite, those below
/// the smallest subnormal become zero.
fn rat_to_f64(x: &BigRational) -> f64 {
    match round_binary(x, FLOAT64) {
        // the significand has at most 53 bits, so both steps are exact
        Some((m, e)) => ldexp(m.to_f64().unwrap_or(f64::NAN), e),
        None if x.is_negative() => f64::NEG_INFINITY,
        None => f64::INFINITY,
    }
}

fn ldexp(mut f: f64, mut exp: i64) -> f64 {
    while exp > 1000 {
        f *= 2f64.powi(1000);
        exp -= 1000;
        if f.is_infinite() {
            return f;
        }
    }
    while exp < -1000 {
        f *= 2f64.powi(-1000);
        exp += 1000;
        if f == 0.0 {
            return f;
        }
    }
    f * 2f64.powi(exp as i32)
}

fn round_f64(x: &BigRational) -> Option<BigRational> {
    round_binary(x, FLOAT64).map(|(m, e)| binary_to_rat(m, e))
}

fn round_f32(x: &BigRational) -> Option<BigRational> {
    round_binary(x, FLOAT32).map(|(m, e)| binary_to_rat(m, e))
}

/// Bit width and signedness of a sized integer kind, or `None` for untyped
/// integers.
fn int_width(kind: BasicType, word_size: u8) -> Option<(u64, bool)> {
    let word = word_size as u64 * 8;
    match kind.real_type() {
        BasicType::Int8 => Some((8, false)),
        BasicType::Int16 => Some((16, false)),
        BasicType::Int32 => Some((32, false)),
        BasicType::Int64 => Some((64, false)),
        BasicType::Int => Some((word, false)),
        BasicType::Uint8 => Some((8, true)),
        BasicType::Uint16 => Some((16, true)),
        BasicType::Uint32 => Some((32, true)),
        BasicType::Uint64 => Some((64, true)),
        BasicType::Uint | BasicType::Uintptr => Some((word, true)),
        _ => None,
    }
}

fn int_fits(x: &BigInt, bits: u64, unsigned: bool) -> bool {
    if unsigned {
        return x.sign() != Sign::Minus && x.bits() <= bits;
    }
    let limit = BigInt::one() << (bits - 1) as usize;
    let min = -limit.clone();
    let max = limit - 1;
    &min <= x && x <= &max
}

fn is_integer_kind(kind: BasicType) -> bool {
    matches!(kind, BasicType::UntypedInt | BasicType::UntypedRune) || int_width(kind, 8).is_some()
}

fn is_float_kind(kind: BasicType) -> bool {
    matches!(
        kind,
        BasicType::Float32 | BasicType::Float64 | BasicType::UntypedFloat
    )
}

fn is_complex_kind(kind: BasicType) -> bool {
    matches!(
        kind,
        BasicType::Complex64 | BasicType::Complex128 | BasicType::UntypedComplex
    )
}

impl Value {
    /// Reports whether the value can be represented in `kind`, storing the
    /// value rounded into that kind in `rounded`.
    pub fn representable(&self, kind: BasicType, word_size: u8, rounded: Option<&mut Value>) -> bool {
        if self.is_unknown() {
            return true;
        }
        let result = match kind {
            BasicType::Bool | BasicType::UntypedBool => {
                matches!(self, Value::Bool(_)).then(|| self.clone())
            }
            BasicType::Str | BasicType::UntypedString => {
                matches!(self, Value::Str(_)).then(|| self.clone())
            }
            k if is_integer_kind(k) => self.to_int().and_then(|i| {
                let fits = match int_width(k, word_size) {
                    Some((bits, unsigned)) => int_fits(&i, bits, unsigned),
                    None => true,
                };
                fits.then(|| match self {
                    Value::Rune(_) => Value::Rune(i),
                    _ => Value::Int(i),
                })
            }),
            k if is_float_kind(k) => self.to_rat().and_then(|r| {
                let r = match k {
                    BasicType::Float32 => round_f32(&r)?,
                    BasicType::Float64 => round_f64(&r)?,
                    _ => r,
                };
                Some(Value::Float(r))
            }),
            k if is_complex_kind(k) => self.to_complex().and_then(|(re, im)| {
                let (re, im) = match k {
                    BasicType::Complex64 => (round_f32(&re)?, round_f32(&im)?),
                    BasicType::Complex128 => (round_f64(&re)?, round_f64(&im)?),
                    _ => (re, im),
                };
                Some(Value::Complex(re, im))
            }),
            _ => None,
        };
        match result {
            Some(v) => {
                if let Some(r) = rounded {
                    *r = v;
                }
                true
            }
            None => false,
        }
    }

    /// Converts the value into `kind`, rounding floats to the kind's
    /// precision.
    pub fn round_to(&self, kind: BasicType, word_size: u8) -> Result<Value, ConstError> {
        let mut rounded = self.clone();
        if self.representable(kind, word_size, Some(&mut rounded)) {
            return Ok(rounded);
        }
        let numeric_kind = is_integer_kind(kind) || is_float_kind(kind) || is_complex_kind(kind);
        if !self.is_numeric() || !numeric_kind {
            return Err(ConstError::Mismatch);
        }
        if is_integer_kind(kind) && self.to_int().is_none() {
            Err(ConstError::Truncated)
        } else {
            Err(ConstError::Overflow)
        }
    }
}

// ============================================================================
// Part 3: Literals
// ============================================================================

fn radix_prefix(lit: &str) -> (u32, &str) {
    let b = lit.as_bytes();
    if b.len() > 2 && b[0] == b'0' {
        match b[1] {
            b'x' | b'X' => return (16, &lit[2..]),
            b'o' | b'O' => return (8, &lit[2..]),
            b'b' | b'B' => return (2, &lit[2..]),
            _ => {}
        }
    }
    if b.len() > 1 && b[0] == b'0' {
        return (8, &lit[1..]);
    }
    (10, lit)
}

/// Parses an integer literal: decimal, `0x`, `0o`, `0b` or a leading-zero
/// octal, with `_` separators.
pub fn int_from_literal(lit: &str) -> Result<Value, ConstError> {
    let clean = lit.replace('_', "");
    let (radix, digits) = radix_prefix(&clean);
    BigInt::from_str_radix(digits, radix)
        .map(Value::Int)
        .map_err(|_| ConstError::Malformed(lit.to_string()))
}

/// Parses a float literal exactly, including hexadecimal mantissas with a
/// binary `p` exponent.
pub fn float_from_literal(lit: &str) -> Result<Value, ConstError> {
    let malformed = || ConstError::Malformed(lit.to_string());
    let clean = lit.replace('_', "");
    if clean.starts_with("0x") || clean.starts_with("0X") {
        return hex_float(&clean[2..]).map(Value::Float).ok_or_else(malformed);
    }
    let (mant, exp) = match clean.find(['e', 'E']) {
        Some(i) => (&clean[..i], clean[i + 1..].parse::<i64>().map_err(|_| malformed())?),
        None => (clean.as_str(), 0),
    };
    let (int_part, frac_part) = match mant.find('.') {
        Some(i) => (&mant[..i], &mant[i + 1..]),
        None => (mant, ""),
    };
    let digits = format!("{}{}", int_part, frac_part);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let m = BigInt::from_str_radix(&digits, 10).map_err(|_| malformed())?;
    let exp10 = exp - frac_part.len() as i64;
    if exp10.unsigned_abs() > MAX_EXP10 as u64 {
        return Err(malformed());
    }
    let scale = BigInt::from(10u32).pow(exp10.unsigned_abs() as u32);
    let r = if exp10 >= 0 {
        BigRational::from_integer(m * scale)
    } else {
        BigRational::new(m, scale)
    };
    Ok(Value::Float(r))
}

fn hex_float(body: &str) -> Option<BigRational> {
    let (mant, exp) = match body.find(['p', 'P']) {
        Some(i) => (&body[..i], body[i + 1..].parse::<i64>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = match mant.find('.') {
        Some(i) => (&mant[..i], &mant[i + 1..]),
        None => (mant, ""),
    };
    let m = BigInt::from_str_radix(&format!("{}{}", int_part, frac_part), 16).ok()?;
    let exp2 = exp - 4 * frac_part.len() as i64;
    if exp2.unsigned_abs() > 4 * MAX_EXP10 as u64 {
        return None;
    }
    let scale = BigInt::one() << exp2.unsigned_abs() as usize;
    Some(if exp2 >= 0 {
        BigRational::from_integer(m * scale)
    } else {
        BigRational::new(m, scale)
    })
}

/// Parses an imaginary literal such as `0i` or `1.5e3i`.
pub fn imag_from_literal(lit: &str) -> Result<Value, ConstError> {
    let body = lit
        .strip_suffix('i')
        .ok_or_else(|| ConstError::Malformed(lit.to_string()))?;
    let is_prefixed = body.len() > 1
        && body.starts_with('0')
        && matches!(body.as_bytes()[1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B');
    // a leading zero is decimal here, not octal
    let im = if is_prefixed && !body.contains(['p', 'P', '.']) {
        int_from_literal(body)?.to_rat()
    } else {
        float_from_literal(body)?.to_rat()
    };
    im.map(|im| Value::Complex(BigRational::zero(), im))
        .ok_or_else(|| ConstError::Malformed(lit.to_string()))
}

/// Parses a quoted rune literal.
pub fn rune_from_literal(lit: &str) -> Result<Value, ConstError> {
    let malformed = || ConstError::Malformed(lit.to_string());
    let body = lit
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(malformed)?;
    let mut chars = body.chars().peekable();
    let c = match chars.next() {
        Some('\\') => unescape(&mut chars, '\'').ok_or_else(malformed)?,
        Some(c) => Unescaped::Char(c),
        None => return Err(malformed()),
    };
    if chars.next().is_some() {
        return Err(malformed());
    }
    let code = match c {
        Unescaped::Char(c) => c as u32,
        Unescaped::Byte(b) => b as u32,
    };
    Ok(Value::Rune(BigInt::from(code)))
}

/// Parses an interpreted (`"..."`) or raw (`` `...` ``) string literal.
pub fn string_from_literal(lit: &str) -> Result<Value, ConstError> {
    let malformed = || ConstError::Malformed(lit.to_string());
    if let Some(raw) = lit.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(Value::Str(raw.replace('\r', "")));
    }
    let body = lit
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(malformed)?;
    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        let u = if c == '\\' {
            unescape(&mut chars, '"').ok_or_else(malformed)?
        } else {
            Unescaped::Char(c)
        };
        match u {
            Unescaped::Char(c) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            Unescaped::Byte(b) => bytes.push(b),
        }
    }
    Ok(Value::Str(String::from_utf8_lossy(&bytes).into_owned()))
}

enum Unescaped {
    Char(char),
    Byte(u8),
}

/// Decodes one escape sequence; the backslash has been consumed.
fn unescape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> Option<Unescaped> {
    let esc = chars.next()?;
    let simple = |c: char| Some(Unescaped::Char(c));
    match esc {
        'a' => simple('\x07'),
        'b' => simple('\x08'),
        'f' => simple('\x0c'),
        'n' => simple('\n'),
        'r' => simple('\r'),
        't' => simple('\t'),
        'v' => simple('\x0b'),
        '\\' => simple('\\'),
        c if c == quote => simple(c),
        'x' => {
            let hi = chars.next()?.to_digit(16)?;
            let lo = chars.next()?.to_digit(16)?;
            Some(Unescaped::Byte((hi * 16 + lo) as u8))
        }
        'u' | 'U' => {
            let n = if esc == 'u' { 4 } else { 8 };
            let mut v = 0u32;
            for _ in 0..n {
                v = v * 16 + chars.next()?.to_digit(16)?;
            }
            char::from_u32(v).map(Unescaped::Char)
        }
        '0'..='7' => {
            let mut v = esc.to_digit(8)?;
            for _ in 0..2 {
                v = v * 8 + chars.next()?.to_digit(8)?;
            }
            u8::try_from(v).ok().map(Unescaped::Byte)
        }
        _ => None,
    }
}

// ============================================================================
// Part 4: Operations
// ============================================================================

/// Brings two numeric values to the higher of their ranks.
fn match_values(x: &Value, y: &Value) -> Option<(Value, Value, Rank)> {
    let rank = x.rank()?.max(y.rank()?);
    Some((x.promote(rank)?, y.promote(rank)?, rank))
}

impl Value {
    fn promote(&self, rank: Rank) -> Option<Value> {
        Some(match rank {
            Rank::Int => Value::Int(self.to_int()?),
            Rank::Rune => Value::Rune(self.to_int()?),
            Rank::Float => Value::Float(self.to_rat()?),
            Rank::Complex => {
                let (re, im) = self.to_complex()?;
                Value::Complex(re, im)
            }
        })
    }
}

/// `op y`. For `^` on unsigned kinds `prec` is the kind's bit width, so the
/// complement stays within it; it is 0 otherwise.
pub fn unary_op(op: UnaryOp, y: &Value, prec: u32) -> Value {
    match (op, y) {
        (_, Value::Unknown) => Value::Unknown,
        (UnaryOp::Pos, v) if v.is_numeric() => v.clone(),
        (UnaryOp::Neg, Value::Int(i)) => Value::Int(-i),
        (UnaryOp::Neg, Value::Rune(i)) => Value::Rune(-i),
        (UnaryOp::Neg, Value::Float(r)) => Value::Float(-r),
        (UnaryOp::Neg, Value::Complex(re, im)) => Value::Complex(-re, -im),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::BitNot, Value::Int(i) | Value::Rune(i)) => {
            let mut z = !i.clone();
            if prec > 0 {
                let mask = (BigInt::one() << prec as usize) - 1;
                z &= mask;
            }
            match y {
                Value::Rune(_) => Value::Rune(z),
                _ => Value::Int(z),
            }
        }
        _ => Value::Unknown,
    }
}

/// `x op y` for arithmetic and logical operators. Integer division
/// truncates toward zero.
pub fn binary_op(x: &Value, op: BinaryOp, y: &Value) -> Result<Value, ConstError> {
    if x.is_unknown() || y.is_unknown() {
        return Ok(Value::Unknown);
    }
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => {
            return Ok(match op {
                BinaryOp::LogAnd => Value::Bool(*a && *b),
                BinaryOp::LogOr => Value::Bool(*a || *b),
                _ => Value::Unknown,
            })
        }
        (Value::Str(a), Value::Str(b)) => {
            return Ok(match op {
                BinaryOp::Add => Value::Str(format!("{}{}", a, b)),
                _ => Value::Unknown,
            })
        }
        _ => {}
    }
    let Some((x, y, rank)) = match_values(x, y) else {
        return Ok(Value::Unknown);
    };
    let divides = matches!(op, BinaryOp::Div | BinaryOp::Rem);
    if divides && y.sign() == 0 {
        return Err(ConstError::DivisionByZero);
    }
    let v = match (x, y) {
        (Value::Int(a), Value::Int(b)) | (Value::Rune(a), Value::Rune(b)) => {
            let z = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                BinaryOp::Xor => a ^ b,
                BinaryOp::AndNot => a & !b,
                _ => return Ok(Value::Unknown),
            };
            if rank == Rank::Rune {
                Value::Rune(z)
            } else {
                Value::Int(z)
            }
        }
        (Value::Float(a), Value::Float(b)) => Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            _ => return Ok(Value::Unknown),
        }),
        (Value::Complex(a, b), Value::Complex(c, d)) => match op {
            BinaryOp::Add => Value::Complex(a + c, b + d),
            BinaryOp::Sub => Value::Complex(a - c, b - d),
            BinaryOp::Mul => Value::Complex(&a * &c - &b * &d, &b * &c + &a * &d),
            BinaryOp::Div => {
                let s = &c * &c + &d * &d;
                Value::Complex((&a * &c + &b * &d) / &s, (&b * &c - &a * &d) / &s)
            }
            _ => Value::Unknown,
        },
        _ => Value::Unknown,
    };
    Ok(v)
}

/// `x << s` or `x >> s` on an integer value.
pub fn shift(x: &Value, op: BinaryOp, s: u32) -> Value {
    let shifted = |i: &BigInt| match op {
        BinaryOp::Shl => Some(i << s as usize),
        BinaryOp::Shr => Some(i >> s as usize),
        _ => None,
    };
    match x {
        Value::Int(i) => shifted(i).map_or(Value::Unknown, Value::Int),
        Value::Rune(i) => shifted(i).map_or(Value::Unknown, Value::Rune),
        _ => Value::Unknown,
    }
}

/// `x op y` for comparison operators; false if either side is unknown.
pub fn compare(x: &Value, op: BinaryOp, y: &Value) -> bool {
    let ord = match (x, y) {
        (Value::Unknown, _) | (_, Value::Unknown) => return false,
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                BinaryOp::Eq => a == b,
                BinaryOp::NotEq => a != b,
                _ => false,
            }
        }
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match match_values(x, y) {
            Some((Value::Complex(a, b), Value::Complex(c, d), _)) => {
                let eq = a == c && b == d;
                return match op {
                    BinaryOp::Eq => eq,
                    BinaryOp::NotEq => !eq,
                    _ => false,
                };
            }
            Some((a, b, _)) => match (a.to_rat(), b.to_rat()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => return false,
            },
            None => return false,
        },
    };
    match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unknown, Value::Unknown) => true,
            _ => compare(self, BinaryOp::Eq, other),
        }
    }
}

// ============================================================================
// Part 5: Display
// ============================================================================

fn fmt_rat(r: &BigRational, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if r.is_integer() && r.numer().abs() < BigInt::from(10u128.pow(21)) {
        return write!(f, "{}", r.numer());
    }
    let v = rat_to_f64(r);
    // no negative zero
    let v = if v == 0.0 { 0.0 } else { v };
    let a = v.abs();
    if a != 0.0 && (a < 1e-4 || a >= 1e21) {
        write!(f, "{:e}", v)
    } else {
        write!(f, "{}", v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => f.write_str("unknown"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Int(i) | Value::Rune(i) => write!(f, "{}", i),
            Value::Float(r) => fmt_rat(r, f),
            Value::Complex(re, im) if im.is_zero() => fmt_rat(re, f),
            Value::Complex(re, im) => {
                f.write_str("(")?;
                fmt_rat(re, f)?;
                f.write_str(" + ")?;
                fmt_rat(im, f)?;
                f.write_str("i)")
            }
        }
    }
}

/// Writes `v` for messages and listings. Long string constants are cut
/// to at most `MAX_DISPLAY_LEN` characters, ending in `...`; use the
/// `Display` impl for the exact value.
pub fn fmt_value(v: &Value, f: &mut impl fmt::Write) -> fmt::Result {
    const MAX_DISPLAY_LEN: usize = 72;
    match v {
        Value::Str(s) => {
            let quoted = format!("{:?}", s);
            if quoted.chars().count() <= MAX_DISPLAY_LEN {
                return f.write_str(&quoted);
            }
            let cut: String = quoted.chars().take(MAX_DISPLAY_LEN - 3).collect();
            write!(f, "{}...", cut)
        }
        _ => write!(f, "{}", v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(lit: &str) -> Value {
        float_from_literal(lit).unwrap()
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(int_from_literal("42").unwrap(), Value::with_i64(42));
        assert_eq!(int_from_literal("0x_FF").unwrap(), Value::with_i64(255));
        assert_eq!(int_from_literal("0o17").unwrap(), Value::with_i64(15));
        assert_eq!(int_from_literal("017").unwrap(), Value::with_i64(15));
        assert_eq!(int_from_literal("0b101").unwrap(), Value::with_i64(5));
        assert_eq!(int_from_literal("1_000").unwrap(), Value::with_i64(1000));
        assert!(int_from_literal("09").is_err());
        let big = int_from_literal("123456789012345678901234567890").unwrap();
        assert_eq!(big.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_float_literals_are_exact() {
        assert_eq!(float("0."), Value::with_i64(0));
        assert_eq!(float("2.5e1"), Value::with_i64(25));
        assert_eq!(float(".5").to_string(), "0.5");
        assert_eq!(float("0x1p-2").to_string(), "0.25");
        let tiny = float("1e-2000");
        assert_eq!(tiny.sign(), 1);
        assert_eq!(tiny.to_string(), "0");
    }

    #[test]
    fn test_rune_and_string_literals() {
        assert_eq!(rune_from_literal("'A'").unwrap().to_string(), "65");
        assert_eq!(rune_from_literal("'\\n'").unwrap(), Value::with_i64(10));
        assert_eq!(rune_from_literal("'\\x41'").unwrap(), Value::with_i64(65));
        assert_eq!(rune_from_literal("'\\101'").unwrap(), Value::with_i64(65));
        assert_eq!(rune_from_literal("'\\u00e9'").unwrap(), Value::with_i64(0xe9));
        assert_eq!(rune_from_literal("'\\''").unwrap(), Value::with_i64(39));
        assert!(rune_from_literal("'ab'").is_err());

        let s = string_from_literal("\"foo\\tbar\"").unwrap();
        assert_eq!(s.str_as_str(), Some("foo\tbar"));
        let raw = string_from_literal("`a\\n`").unwrap();
        assert_eq!(raw.str_as_str(), Some("a\\n"));
        assert_eq!(s.to_string(), "\"foo\\tbar\"");
    }

    #[test]
    fn test_imaginary_literals() {
        let z = imag_from_literal("0i").unwrap();
        assert_eq!(z.to_string(), "0");
        let v = imag_from_literal("1.5i").unwrap();
        assert_eq!(v.to_string(), "(0 + 1.5i)");
        assert_eq!(imag_from_literal("012i").unwrap().to_string(), "(0 + 12i)");
    }

    #[test]
    fn test_value_equality_crosses_kinds() {
        assert_eq!(Value::Rune(BigInt::from(65)), Value::with_i64(65));
        assert_eq!(float("2.0"), Value::with_i64(2));
        assert_eq!(
            Value::Complex(BigRational::from_integer(3.into()), BigRational::zero()),
            Value::with_i64(3)
        );
        assert_ne!(Value::Str("a".into()), Value::with_i64(1));
    }

    #[test]
    fn test_arithmetic() {
        let seven = Value::with_i64(7);
        let two = Value::with_i64(2);
        assert_eq!(binary_op(&seven, BinaryOp::Div, &two).unwrap(), Value::with_i64(3));
        assert_eq!(binary_op(&seven, BinaryOp::Rem, &two).unwrap(), Value::with_i64(1));
        let half = binary_op(&float("1.0"), BinaryOp::Div, &two).unwrap();
        assert_eq!(half.to_string(), "0.5");
        assert_eq!(
            binary_op(&seven, BinaryOp::Div, &Value::with_i64(0)),
            Err(ConstError::DivisionByZero)
        );
        let r = binary_op(&Value::Rune(BigInt::from(65)), BinaryOp::Add, &Value::with_i64(1)).unwrap();
        assert!(matches!(r, Value::Rune(_)));
        assert_eq!(shift(&Value::with_i64(1), BinaryOp::Shl, 70).to_string(), "1180591620717411303424");
        assert_eq!(unary_op(UnaryOp::BitNot, &Value::with_i64(0), 8), Value::with_i64(255));
        assert_eq!(unary_op(UnaryOp::BitNot, &Value::with_i64(0), 0), Value::with_i64(-1));
        assert!(compare(&two, BinaryOp::Lt, &float("2.5")));
        assert!(compare(&Value::Str("a".into()), BinaryOp::Lt, &Value::Str("b".into())));
    }

    #[test]
    fn test_rounding_into_sized_kinds() {
        let tiny = float("1e-200");
        assert_eq!(tiny.round_to(BasicType::Float32, 8).unwrap().to_string(), "0");
        assert_eq!(tiny.round_to(BasicType::Float64, 8).unwrap().to_string(), "1e-200");
        let neg = unary_op(UnaryOp::Neg, &float("1e-2000"), 0);
        assert_eq!(neg.sign(), -1);
        assert_eq!(neg.round_to(BasicType::Float64, 8).unwrap(), Value::with_i64(0));
        assert_eq!(
            float("1e-200").round_to(BasicType::Complex64, 8).unwrap().to_string(),
            "0"
        );
        assert_eq!(float("1e400").round_to(BasicType::Float64, 8), Err(ConstError::Overflow));

        assert_eq!(Value::with_i64(256).round_to(BasicType::Uint8, 8), Err(ConstError::Overflow));
        assert_eq!(Value::with_i64(-1).round_to(BasicType::Uint, 8), Err(ConstError::Overflow));
        assert_eq!(float("1.5").round_to(BasicType::Int, 8), Err(ConstError::Truncated));
        assert_eq!(float("3.0").round_to(BasicType::Int8, 8).unwrap(), Value::with_i64(3));
        let big = Value::with_u64(1 << 40);
        assert!(big.round_to(BasicType::Int, 8).is_ok());
        assert_eq!(big.round_to(BasicType::Int, 4), Err(ConstError::Overflow));
        assert_eq!(
            Value::Str("foo".into()).round_to(BasicType::Int, 8),
            Err(ConstError::Mismatch)
        );
    }

    #[test]
    fn test_f64_rounding_is_nearest() {
        for f in [0.1f64, 1.0 / 3.0, 123456.789, 5e-324, 1.7976931348623157e308] {
            let v = Value::with_f64(f);
            assert_eq!(v.to_f64(), Some(f));
        }
        let third = binary_op(&Value::with_i64(1), BinaryOp::Div, &float("3.0")).unwrap();
        assert_eq!(third.to_f64(), Some(1.0 / 3.0));
    }

    #[test]
    fn test_f32_rounding_is_nearest() {
        // 1 + 2^-24 + 2^-60 lies just above the float32 halfway point
        let x = float("1.000000059604644776257986737988403547205962240695953369140625");
        let r = x.round_to(BasicType::Float32, 8).unwrap();
        assert_eq!(r.to_f64(), Some(1.0000001192092896));
        assert_eq!(r.to_f64().map(|f| f as f32), Some(1.0000001f32));

        // exact halfway ties to even
        let tie = float("1.000000059604644775390625");
        assert_eq!(tie.round_to(BasicType::Float32, 8).unwrap().to_f64(), Some(1.0));

        let min = float("1.40129846432481707092372958328991613128026194187651577175706828388979108268586060148663818836212158203125e-45");
        assert_eq!(min.round_to(BasicType::Float32, 8).unwrap().to_f64(), Some(f32::from_bits(1) as f64));
        let max = Value::with_f64(f32::MAX as f64);
        assert_eq!(max.round_to(BasicType::Float32, 8).unwrap().to_f64(), Some(f32::MAX as f64));
        assert_eq!(float("1e39").round_to(BasicType::Float32, 8), Err(ConstError::Overflow));
    }

    #[test]
    fn test_large_values_print_in_exponent_form() {
        assert_eq!(float("1e300").to_string(), "1e300");
        assert_eq!(float("1e20").to_string(), "100000000000000000000");
        assert_eq!(Value::Complex(BigRational::zero(), float("1e30").to_rat().unwrap()).to_string(), "(0 + 1e30i)");
    }

    #[test]
    fn test_fmt_value_shortens_long_strings() {
        let mut out = String::new();
        fmt_value(&Value::Str("x".repeat(100)), &mut out).unwrap();
        assert_eq!(out.chars().count(), 72);
        assert!(out.starts_with("\"xxx") && out.ends_with("x..."));

        let mut out = String::new();
        fmt_value(&Value::Str("short".into()), &mut out).unwrap();
        assert_eq!(out, "\"short\"");

        let mut out = String::new();
        fmt_value(&float("2.5"), &mut out).unwrap();
        assert_eq!(out, "2.5");
    }
}

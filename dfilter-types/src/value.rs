use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::num::IntErrorKind;

use itertools::Itertools;
use regex::bytes::Regex;
use thiserror::Error;

use crate::{DRange, FType};

/// Failure to interpret a literal as a value of a requested field type.
///
/// The message is user-facing; the semantic checker forwards it verbatim
/// when no value-string fallback applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValueError {
    message: String,
}

impl ValueError {
    fn new(message: impl Into<String>) -> Self {
        ValueError { message: message.into() }
    }
}

/// A typed scalar value.
///
/// Carries the field type it was parsed for plus a representation drawn from
/// a small set of storage classes. Cross-type comparisons are resolved by
/// storage class (all integer widths share one class, the byte-like types
/// another), which is exactly the granularity at which the semantic checker
/// allows operands to meet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Value {
    ftype: FType,
    repr: Repr,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Repr {
    Unsigned(u64),
    Signed(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Str(String),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Time { secs: i64, nanos: u32 },
}

impl Value {
    /// An unsigned integer value tagged with `ftype`.
    pub fn uint(ftype: FType, value: u64) -> Self {
        Value { ftype, repr: Repr::Unsigned(value) }
    }

    /// A signed integer value tagged with `ftype`.
    pub fn sint(ftype: FType, value: i64) -> Self {
        Value { ftype, repr: Repr::Signed(value) }
    }

    /// A floating-point value tagged with `ftype`.
    pub fn double(ftype: FType, value: f64) -> Self {
        Value { ftype, repr: Repr::Double(value) }
    }

    pub fn boolean(value: bool) -> Self {
        Value { ftype: FType::Boolean, repr: Repr::Unsigned(value as u64) }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value { ftype: FType::String, repr: Repr::Str(value.into()) }
    }

    pub fn bytes(data: Vec<u8>) -> Self {
        Value { ftype: FType::Bytes, repr: Repr::Bytes(data) }
    }

    /// A byte-sequence value tagged with another byte-like `ftype`
    /// (e.g. `FT_ETHER`, `FT_PROTOCOL`).
    pub fn bytes_typed(ftype: FType, data: Vec<u8>) -> Self {
        Value { ftype, repr: Repr::Bytes(data) }
    }

    pub fn ipv4(addr: Ipv4Addr) -> Self {
        Value { ftype: FType::Ipv4, repr: Repr::Ipv4(addr) }
    }

    pub fn ipv6(addr: Ipv6Addr) -> Self {
        Value { ftype: FType::Ipv6, repr: Repr::Ipv6(addr) }
    }

    pub fn absolute_time(secs: i64, nanos: u32) -> Self {
        Value { ftype: FType::AbsoluteTime, repr: Repr::Time { secs, nanos } }
    }

    pub fn relative_time(secs: i64, nanos: u32) -> Self {
        Value { ftype: FType::RelativeTime, repr: Repr::Time { secs, nanos } }
    }

    pub fn ftype(&self) -> FType {
        self.ftype
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.repr {
            Repr::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse an unquoted literal as a value of `ftype`.
    ///
    /// With `allow_partial` set (the `contains` and `matches` relations), a
    /// literal that does not parse as the exact type may still be accepted as
    /// a plain byte string, provided the type has a byte view to compare it
    /// against. This is what lets `ip.src contains fc` compile: `fc` becomes
    /// the one-byte sequence `fc` rather than a (failed) IPv4 address.
    pub fn from_unparsed(ftype: FType, s: &str, allow_partial: bool) -> Result<Self, ValueError> {
        match Self::parse_exact(ftype, s) {
            Ok(v) => Ok(v),
            Err(e) => {
                if allow_partial && ftype.can_slice() {
                    if let Some(data) = parse_byte_string(s) {
                        return Ok(Value::bytes(data));
                    }
                }
                Err(e)
            }
        }
    }

    /// Parse a double-quoted string literal as a value of `ftype`.
    ///
    /// String-typed fields take the text verbatim; for any other type the
    /// text is parsed the same way an unquoted literal would be.
    pub fn from_string(ftype: FType, s: &str) -> Result<Self, ValueError> {
        if ftype.is_string_family() {
            Ok(Value { ftype, repr: Repr::Str(s.to_owned()) })
        } else {
            Self::parse_exact(ftype, s)
        }
    }

    /// Decode a single-quoted character constant to its byte value.
    pub fn parse_char_literal(s: &str) -> Result<u8, ValueError> {
        parse_char_literal(s)
    }

    fn parse_exact(ftype: FType, s: &str) -> Result<Self, ValueError> {
        let repr = match ftype {
            FType::None => {
                return Err(ValueError::new(format!(
                    "\"{s}\" cannot be converted to {}.",
                    ftype.pretty_name()
                )))
            }
            FType::Protocol | FType::Bytes | FType::UintBytes | FType::SystemId => {
                Repr::Bytes(parse_byte_string(s).ok_or_else(|| {
                    ValueError::new(format!("\"{s}\" is not a valid byte string."))
                })?)
            }
            FType::Boolean => Repr::Unsigned(parse_boolean(s)?),
            FType::Char => {
                let v = parse_char_or_number(s)?;
                if v > u8::MAX as u64 {
                    return Err(too_large(s));
                }
                Repr::Unsigned(v)
            }
            FType::Uint8
            | FType::Uint16
            | FType::Uint24
            | FType::Uint32
            | FType::Uint40
            | FType::Uint48
            | FType::Uint56
            | FType::Uint64
            | FType::FrameNum => {
                let v = parse_char_or_number(s)?;
                if v > uint_max(ftype) {
                    return Err(too_large(s));
                }
                Repr::Unsigned(v)
            }
            FType::Int8 | FType::Int16 | FType::Int24 | FType::Int32 | FType::Int40
            | FType::Int48 | FType::Int56 | FType::Int64 => {
                let v = parse_signed(s)?;
                let (min, max) = int_bounds(ftype);
                if v < min || v > max {
                    return Err(too_large(s));
                }
                Repr::Signed(v)
            }
            FType::IpxNet => {
                let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
                let v = u32::from_str_radix(digits, 16).map_err(|_| {
                    ValueError::new(format!("\"{s}\" is not a valid IPX network number."))
                })?;
                Repr::Unsigned(u64::from(v))
            }
            FType::Float | FType::Double | FType::Ieee11073SFloat | FType::Ieee11073Float => {
                Repr::Double(s.parse::<f64>().map_err(|_| {
                    ValueError::new(format!("\"{s}\" is not a valid floating-point number."))
                })?)
            }
            FType::AbsoluteTime | FType::RelativeTime => {
                let (secs, nanos) = parse_time(s)
                    .ok_or_else(|| ValueError::new(format!("\"{s}\" is not a valid time value.")))?;
                Repr::Time { secs, nanos }
            }
            FType::Ipv4 => Repr::Ipv4(s.parse::<Ipv4Addr>().map_err(|_| {
                ValueError::new(format!("\"{s}\" is not a valid hostname or IPv4 address."))
            })?),
            FType::Ipv6 => Repr::Ipv6(s.parse::<Ipv6Addr>().map_err(|_| {
                ValueError::new(format!("\"{s}\" is not a valid IPv6 address."))
            })?),
            FType::Ether => Repr::Bytes(parse_fixed_bytes(s, 6).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid Ethernet address."))
            })?),
            FType::Vines => Repr::Bytes(parse_fixed_bytes(s, 6).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid VINES address."))
            })?),
            FType::Ax25 => Repr::Bytes(parse_fixed_bytes(s, 7).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid AX.25 address."))
            })?),
            FType::FcWwn => Repr::Bytes(parse_fixed_bytes(s, 8).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid Fibre Channel WWN."))
            })?),
            FType::Eui64 => {
                let data = parse_fixed_bytes(s, 8).ok_or_else(|| {
                    ValueError::new(format!("\"{s}\" is not a valid EUI64 address."))
                })?;
                let mut be = [0u8; 8];
                be.copy_from_slice(&data);
                Repr::Unsigned(u64::from_be_bytes(be))
            }
            FType::Guid => Repr::Bytes(parse_guid(s).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid GUID."))
            })?),
            FType::Oid => Repr::Bytes(parse_oid(s, false).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid OBJECT IDENTIFIER."))
            })?),
            FType::RelOid => Repr::Bytes(parse_oid(s, true).ok_or_else(|| {
                ValueError::new(format!("\"{s}\" is not a valid relative OBJECT IDENTIFIER."))
            })?),
            FType::String
            | FType::Stringz
            | FType::UintString
            | FType::StringzPad
            | FType::StringzTrunc => Repr::Str(s.to_owned()),
        };
        Ok(Value { ftype, repr })
    }

    fn order(&self, other: &Value) -> Option<Ordering> {
        match (&self.repr, &other.repr) {
            (Repr::Unsigned(a), Repr::Unsigned(b)) => Some(a.cmp(b)),
            (Repr::Signed(a), Repr::Signed(b)) => Some(a.cmp(b)),
            (Repr::Unsigned(a), Repr::Signed(b)) => Some(cmp_unsigned_signed(*a, *b)),
            (Repr::Signed(a), Repr::Unsigned(b)) => {
                Some(cmp_unsigned_signed(*b, *a).reverse())
            }
            (Repr::Double(a), Repr::Double(b)) => a.partial_cmp(b),
            (Repr::Time { secs: s1, nanos: n1 }, Repr::Time { secs: s2, nanos: n2 }) => {
                Some((s1, n1).cmp(&(s2, n2)))
            }
            (Repr::Ipv4(a), Repr::Ipv4(b)) => Some(u32::from(*a).cmp(&u32::from(*b))),
            (Repr::Ipv6(a), Repr::Ipv6(b)) => Some(a.octets().cmp(&b.octets())),
            _ => {
                let a = self.byte_view()?;
                let b = other.byte_view()?;
                Some(a.as_ref().cmp(b.as_ref()))
            }
        }
    }

    pub fn cmp_eq(&self, other: &Value) -> bool {
        self.order(other) == Some(Ordering::Equal)
    }

    pub fn cmp_ne(&self, other: &Value) -> bool {
        matches!(self.order(other), Some(ord) if ord != Ordering::Equal)
    }

    pub fn cmp_gt(&self, other: &Value) -> bool {
        self.order(other) == Some(Ordering::Greater)
    }

    pub fn cmp_ge(&self, other: &Value) -> bool {
        matches!(self.order(other), Some(Ordering::Greater | Ordering::Equal))
    }

    pub fn cmp_lt(&self, other: &Value) -> bool {
        self.order(other) == Some(Ordering::Less)
    }

    pub fn cmp_le(&self, other: &Value) -> bool {
        matches!(self.order(other), Some(Ordering::Less | Ordering::Equal))
    }

    /// True when `self & other` has any bit set.
    pub fn bitwise_and(&self, other: &Value) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Unsigned(a), Repr::Unsigned(b)) => a & b != 0,
            (Repr::Signed(a), Repr::Signed(b)) => a & b != 0,
            (Repr::Unsigned(a), Repr::Signed(b)) => a & (*b as u64) != 0,
            (Repr::Signed(a), Repr::Unsigned(b)) => (*a as u64) & b != 0,
            (Repr::Ipv4(a), Repr::Ipv4(b)) => u32::from(*a) & u32::from(*b) != 0,
            _ => match (self.byte_view(), other.byte_view()) {
                (Some(a), Some(b)) => a.iter().zip(b.iter()).any(|(x, y)| x & y != 0),
                _ => false,
            },
        }
    }

    /// Subsequence search over the byte views of both values.
    pub fn contains(&self, needle: &Value) -> bool {
        let (Some(hay), Some(needle)) = (self.byte_view(), needle.byte_view()) else {
            return false;
        };
        if needle.is_empty() {
            return true;
        }
        if needle.len() > hay.len() {
            return false;
        }
        hay.windows(needle.len()).any(|w| w == needle.as_ref())
    }

    /// Regex match against the byte view.
    pub fn matches(&self, pattern: &Regex) -> bool {
        match self.byte_view() {
            Some(data) => pattern.is_match(&data),
            None => false,
        }
    }

    /// Slice the byte view by `range`, producing a byte-sequence value.
    ///
    /// `None` when the type has no byte view; the checker refuses slices on
    /// such types so the evaluator treats that as a program bug.
    pub fn slice(&self, range: &DRange) -> Option<Value> {
        let data = self.byte_view()?;
        Some(Value::bytes(range.select(&data)))
    }

    /// Length of the byte view, for types that have one.
    pub fn byte_len(&self) -> Option<usize> {
        self.byte_view().map(|data| data.len())
    }

    fn byte_view(&self) -> Option<Cow<'_, [u8]>> {
        match &self.repr {
            Repr::Bytes(b) => Some(Cow::Borrowed(b.as_slice())),
            Repr::Str(s) => Some(Cow::Borrowed(s.as_bytes())),
            Repr::Ipv4(a) => Some(Cow::Owned(a.octets().to_vec())),
            Repr::Ipv6(a) => Some(Cow::Owned(a.octets().to_vec())),
            Repr::Unsigned(v) if self.ftype == FType::Eui64 => {
                Some(Cow::Owned(v.to_be_bytes().to_vec()))
            }
            _ => None,
        }
    }
}

/// Renders the value in display-filter syntax, as shown by the disassembler.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Unsigned(v) => match self.ftype {
                FType::Boolean => write!(f, "{}", u64::from(*v != 0)),
                FType::Char => {
                    let c = *v as u32;
                    match char::from_u32(c) {
                        Some(c) if c.is_ascii_graphic() => write!(f, "'{c}'"),
                        _ => write!(f, "'\\x{c:02x}'"),
                    }
                }
                FType::IpxNet => write!(f, "0x{v:08x}"),
                FType::Eui64 => {
                    write!(f, "{}", v.to_be_bytes().iter().map(|b| format!("{b:02x}")).join(":"))
                }
                _ => write!(f, "{v}"),
            },
            Repr::Signed(v) => write!(f, "{v}"),
            Repr::Double(v) => write!(f, "{v}"),
            Repr::Bytes(data) => {
                write!(f, "{}", data.iter().map(|b| format!("{b:02x}")).join(":"))
            }
            Repr::Str(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Repr::Ipv4(a) => write!(f, "{a}"),
            Repr::Ipv6(a) => write!(f, "{a}"),
            Repr::Time { secs, nanos } => {
                if *nanos == 0 {
                    write!(f, "{secs}")
                } else {
                    let frac = format!("{nanos:09}");
                    write!(f, "{secs}.{}", frac.trim_end_matches('0'))
                }
            }
        }
    }
}

fn cmp_unsigned_signed(a: u64, b: i64) -> Ordering {
    if b < 0 {
        Ordering::Greater
    } else {
        a.cmp(&(b as u64))
    }
}

fn too_large(s: &str) -> ValueError {
    ValueError::new(format!("\"{s}\" is too large for this field type."))
}

fn parse_boolean(s: &str) -> Result<u64, ValueError> {
    if s.eq_ignore_ascii_case("true") {
        return Ok(1);
    }
    if s.eq_ignore_ascii_case("false") {
        return Ok(0);
    }
    parse_u64_literal(s)
        .map(|v| u64::from(v != 0))
        .map_err(|_| ValueError::new(format!("\"{s}\" is not a valid boolean.")))
}

fn parse_char_or_number(s: &str) -> Result<u64, ValueError> {
    if s.starts_with('\'') {
        return parse_char_literal(s).map(u64::from);
    }
    parse_u64_literal(s)
}

fn parse_signed(s: &str) -> Result<i64, ValueError> {
    if s.starts_with('\'') {
        return parse_char_literal(s).map(i64::from);
    }
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = parse_u64_literal_raw(digits, s)?;
    if neg {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(too_large(s));
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(too_large(s));
        }
        Ok(magnitude as i64)
    }
}

fn parse_u64_literal(s: &str) -> Result<u64, ValueError> {
    parse_u64_literal_raw(s, s)
}

/// Decimal, `0x` hex, or `0`-prefixed octal, mirroring `strtoul` with base 0.
fn parse_u64_literal_raw(digits: &str, original: &str) -> Result<u64, ValueError> {
    let invalid = || ValueError::new(format!("\"{original}\" is not a valid number."));
    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if digits.is_empty() {
        return Err(invalid());
    }
    u64::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => too_large(original),
        _ => invalid(),
    })
}

fn parse_char_literal(s: &str) -> Result<u8, ValueError> {
    let invalid = || ValueError::new(format!("\"{s}\" is not a valid character constant."));
    let inner = s
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(invalid)?;
    let mut chars = inner.chars();
    let code = match chars.next().ok_or_else(invalid)? {
        '\\' => match chars.next().ok_or_else(invalid)? {
            '\'' => b'\'',
            '"' => b'"',
            '\\' => b'\\',
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'v' => 0x0b,
            'x' => {
                let digits: String = chars.by_ref().collect();
                if digits.is_empty() || digits.len() > 2 {
                    return Err(invalid());
                }
                return u8::from_str_radix(&digits, 16).map_err(|_| invalid());
            }
            d @ '0'..='7' => {
                let mut digits = String::from(d);
                digits.extend(chars.by_ref());
                if digits.len() > 3 {
                    return Err(invalid());
                }
                return u16::from_str_radix(&digits, 8)
                    .ok()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(invalid);
            }
            _ => return Err(invalid()),
        },
        c if c.is_ascii() && c != '\'' => c as u8,
        _ => return Err(invalid()),
    };
    if chars.next().is_some() {
        return Err(invalid());
    }
    Ok(code)
}

/// Hex byte pairs, either separated by `:`, `-` or `.`, or run together with
/// an even number of digits.
fn parse_byte_string(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() {
        return None;
    }
    if s.contains([':', '-', '.']) {
        s.split([':', '-', '.'])
            .map(|part| match part.len() {
                1 | 2 => u8::from_str_radix(part, 16).ok(),
                _ => None,
            })
            .collect()
    } else if s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    } else {
        None
    }
}

fn parse_fixed_bytes(s: &str, len: usize) -> Option<Vec<u8>> {
    parse_byte_string(s).filter(|data| data.len() == len)
}

fn parse_guid(s: &str) -> Option<Vec<u8>> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() == 5 {
        let lens = [8, 4, 4, 4, 12];
        let mut out = Vec::with_capacity(16);
        for (part, len) in parts.iter().zip(lens) {
            if part.len() != len || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            for i in (0..part.len()).step_by(2) {
                out.push(u8::from_str_radix(&part[i..i + 2], 16).ok()?);
            }
        }
        return Some(out);
    }
    parse_fixed_bytes(s, 16)
}

/// Dotted-decimal object identifier, BER-encoded.
fn parse_oid(s: &str, relative: bool) -> Option<Vec<u8>> {
    let components: Vec<u64> = s.split('.').map(|c| c.parse().ok()).collect::<Option<_>>()?;
    let mut out = Vec::new();
    let rest = if relative {
        if components.is_empty() {
            return None;
        }
        &components[..]
    } else {
        let (&first, &second) = (components.first()?, components.get(1)?);
        if first > 2 || (first < 2 && second > 39) {
            return None;
        }
        push_base128(&mut out, first * 40 + second);
        &components[2..]
    };
    for &c in rest {
        push_base128(&mut out, c);
    }
    Some(out)
}

fn push_base128(out: &mut Vec<u8>, mut v: u64) {
    let mut stack = [0u8; 10];
    let mut n = 0;
    loop {
        stack[n] = (v & 0x7f) as u8;
        v >>= 7;
        n += 1;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let mut b = stack[i];
        if i != 0 {
            b |= 0x80;
        }
        out.push(b);
    }
}

/// `[-]secs[.frac]` with up to nanosecond precision.
fn parse_time(s: &str) -> Option<(i64, u32)> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (secs_str, frac_str) = match body.split_once('.') {
        Some((a, b)) => (a, Some(b)),
        None => (body, None),
    };
    if secs_str.is_empty() || !secs_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut secs: i64 = secs_str.parse().ok()?;
    let mut nanos = 0u32;
    if let Some(frac) = frac_str {
        if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut padded = frac.to_owned();
        while padded.len() < 9 {
            padded.push('0');
        }
        nanos = padded.parse().ok()?;
    }
    if neg {
        secs = -secs;
        // Keep the fraction as a magnitude alongside negative seconds.
    }
    Some((secs, nanos))
}

fn uint_max(ftype: FType) -> u64 {
    match ftype {
        FType::Uint8 => u8::MAX as u64,
        FType::Uint16 => u16::MAX as u64,
        FType::Uint24 => 0xff_ffff,
        FType::Uint32 | FType::FrameNum => u32::MAX as u64,
        FType::Uint40 => 0xff_ffff_ffff,
        FType::Uint48 => 0xffff_ffff_ffff,
        FType::Uint56 => 0xff_ffff_ffff_ffff,
        _ => u64::MAX,
    }
}

fn int_bounds(ftype: FType) -> (i64, i64) {
    match ftype {
        FType::Int8 => (i8::MIN as i64, i8::MAX as i64),
        FType::Int16 => (i16::MIN as i64, i16::MAX as i64),
        FType::Int24 => (-0x80_0000, 0x7f_ffff),
        FType::Int32 => (i32::MIN as i64, i32::MAX as i64),
        FType::Int40 => (-0x80_0000_0000, 0x7f_ffff_ffff),
        FType::Int48 => (-0x8000_0000_0000, 0x7fff_ffff_ffff),
        FType::Int56 => (-0x80_0000_0000_0000, 0x7f_ffff_ffff_ffff),
        _ => (i64::MIN, i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unsigned_literals() {
        assert_eq!(Value::from_unparsed(FType::Uint16, "80", false).unwrap().as_uint(), Some(80));
        assert_eq!(Value::from_unparsed(FType::Uint16, "0x50", false).unwrap().as_uint(), Some(0x50));
        assert_eq!(Value::from_unparsed(FType::Uint16, "010", false).unwrap().as_uint(), Some(8));
        assert!(Value::from_unparsed(FType::Uint8, "256", false).is_err());
        assert!(Value::from_unparsed(FType::Uint16, "ten", false).is_err());
    }

    #[test]
    fn signed_literals() {
        let v = Value::from_unparsed(FType::Int32, "-42", false).unwrap();
        assert!(v.cmp_lt(&Value::sint(FType::Int32, 0)));
        assert!(Value::from_unparsed(FType::Int8, "-129", false).is_err());
    }

    #[test]
    fn char_constants() {
        assert_eq!(Value::parse_char_literal("'A'").unwrap(), 0x41);
        assert_eq!(Value::parse_char_literal("'\\n'").unwrap(), b'\n');
        assert_eq!(Value::parse_char_literal("'\\x41'").unwrap(), 0x41);
        assert_eq!(Value::parse_char_literal("'\\101'").unwrap(), 0x41);
        assert!(Value::parse_char_literal("'ab'").is_err());
        // Integer fields accept character constants directly.
        assert_eq!(Value::from_unparsed(FType::Uint8, "'a'", false).unwrap().as_uint(), Some(97));
    }

    #[test]
    fn byte_strings() {
        let v = Value::from_unparsed(FType::Bytes, "0a:00", false).unwrap();
        assert_eq!(v.to_string(), "0a:00");
        let v = Value::from_unparsed(FType::Bytes, "fc", false).unwrap();
        assert_eq!(v.to_string(), "fc");
        let v = Value::from_unparsed(FType::Bytes, "0a00ff", false).unwrap();
        assert_eq!(v.to_string(), "0a:00:ff");
        assert!(Value::from_unparsed(FType::Bytes, "f", false).is_err());
        assert!(Value::from_unparsed(FType::Bytes, "xyz", false).is_err());
    }

    #[test]
    fn ether_requires_six_bytes_unless_partial() {
        assert!(Value::from_unparsed(FType::Ether, "00:11:22:33:44:55", false).is_ok());
        assert!(Value::from_unparsed(FType::Ether, "00:11", false).is_err());
        let partial = Value::from_unparsed(FType::Ether, "00:11", true).unwrap();
        assert_eq!(partial.ftype(), FType::Bytes);
    }

    #[test]
    fn ipv4_partial_fallback() {
        assert!(Value::from_unparsed(FType::Ipv4, "fc", false).is_err());
        let v = Value::from_unparsed(FType::Ipv4, "fc", true).unwrap();
        assert_eq!(v.ftype(), FType::Bytes);
        let addr = Value::from_unparsed(FType::Ipv4, "10.0.0.1", false).unwrap();
        assert!(!addr.contains(&v));
        assert!(addr.contains(&Value::bytes(vec![0, 0])));
    }

    #[test]
    fn ipv4_ordering() {
        let a = Value::from_unparsed(FType::Ipv4, "10.0.0.1", false).unwrap();
        let b = Value::from_unparsed(FType::Ipv4, "10.0.0.2", false).unwrap();
        assert!(a.cmp_lt(&b));
        assert!(a.cmp_eq(&a));
        assert!(a.cmp_ne(&b));
    }

    #[test]
    fn cross_width_integer_comparison() {
        let a = Value::uint(FType::Uint8, 7);
        let b = Value::uint(FType::Uint32, 7);
        assert!(a.cmp_eq(&b));
        let neg = Value::sint(FType::Int32, -1);
        assert!(a.cmp_gt(&neg));
        assert!(neg.cmp_lt(&a));
    }

    #[test]
    fn time_values() {
        let a = Value::from_unparsed(FType::RelativeTime, "1.5", false).unwrap();
        let b = Value::from_unparsed(FType::RelativeTime, "2", false).unwrap();
        assert!(a.cmp_lt(&b));
        assert_eq!(a.to_string(), "1.5");
        assert_eq!(b.to_string(), "2");
    }

    #[test]
    fn string_contains_and_matches() {
        let host = Value::string("www.example.com");
        assert!(host.contains(&Value::string("example")));
        assert!(!host.contains(&Value::string("nope")));
        let re = Regex::new("ex.mple").unwrap();
        assert!(host.matches(&re));
        // Byte values are matchable too.
        let data = Value::bytes(vec![0x66, 0x6f, 0x6f]);
        assert!(data.matches(&Regex::new("foo").unwrap()));
    }

    #[test]
    fn bytes_contains_subsequence() {
        let hay = Value::bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(hay.contains(&Value::bytes(vec![0xad, 0xbe])));
        assert!(!hay.contains(&Value::bytes(vec![0xbe, 0xad])));
        assert!(hay.contains(&Value::bytes(vec![])));
    }

    #[test]
    fn slicing() {
        use crate::DRangeNode;
        let addr = Value::from_unparsed(FType::Ipv4, "10.0.0.1", false).unwrap();
        let range = DRange::new(vec![DRangeNode::Length { start: 0, length: 2 }]);
        let slice = addr.slice(&range).unwrap();
        assert_eq!(slice, Value::bytes(vec![0x0a, 0x00]));
        // Integers have no byte view.
        assert!(Value::uint(FType::Uint16, 80).slice(&range).is_none());
    }

    #[test]
    fn bitwise_and_tests_for_any_set_bit() {
        let flags = Value::uint(FType::Uint8, 0b0001_0010);
        assert!(flags.bitwise_and(&Value::uint(FType::Uint8, 0b0000_0010)));
        assert!(!flags.bitwise_and(&Value::uint(FType::Uint8, 0b0000_0001)));
    }

    #[test]
    fn guid_and_oid_literals() {
        let guid = Value::from_unparsed(FType::Guid, "12345678-1234-5678-1234-567812345678", false);
        assert!(guid.is_ok());
        let oid = Value::from_unparsed(FType::Oid, "1.3.6.1", false).unwrap();
        assert_eq!(oid, Value::bytes_typed(FType::Oid, vec![0x2b, 0x06, 0x01]));
        assert!(Value::from_unparsed(FType::Oid, "1", false).is_err());
    }

    #[test]
    fn rendering() {
        assert_eq!(Value::boolean(true).to_string(), "1");
        assert_eq!(Value::string("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(Value::uint(FType::Char, 0x41).to_string(), "'A'");
        assert_eq!(Value::uint(FType::Char, 0x01).to_string(), "'\\x01'");
        assert_eq!(
            Value::from_unparsed(FType::Ipv4, "10.0.0.1", false).unwrap().to_string(),
            "10.0.0.1"
        );
    }
}

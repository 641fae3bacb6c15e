//! Numeric conversions shared by the stores
//!
//! These follow the script language's conversion rules rather than Rust's `as`
//! casts: ToInt32 wraps modulo 2^32, ToNumber on strings accepts only decimal,
//! hexadecimal and `Infinity` forms, and so on.
#![allow(clippy::float_cmp)]

const TWO_POW_32: f64 = 4_294_967_296.0;
const TWO_POW_31: f64 = 2_147_483_648.0;
// Largest magnitude where every integer is representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Returns `true` if `value` is exactly an `i32`. Negative zero is not, since
/// storing it in an integer slot would lose its sign.
#[must_use]
pub fn is_representable_as_int(value: f64) -> bool {
    value as i32 as f64 == value && !(value == 0.0 && value.is_sign_negative())
}

/// Returns `true` if `value` is an integer that an `f64` holds exactly.
#[must_use]
pub fn is_representable_as_long(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER
}

/// The ToInt32 conversion: truncate toward zero, then wrap modulo 2^32.
/// Non-finite values convert to zero.
#[must_use]
pub fn to_int32(value: f64) -> i32 {
    if is_representable_as_int(value) {
        return value as i32;
    }
    if !value.is_finite() {
        return 0;
    }
    let wrapped = value.trunc().rem_euclid(TWO_POW_32);
    if wrapped >= TWO_POW_31 {
        (wrapped - TWO_POW_32) as i32
    } else {
        wrapped as i32
    }
}

/// The ToUint32 conversion.
#[must_use]
pub fn to_uint32(value: f64) -> u32 {
    to_int32(value) as u32
}

/// The ToUint8Clamp conversion used by clamped byte arrays: saturate to
/// `0..=255` and round half to even.
#[must_use]
pub fn to_uint8_clamp(value: f64) -> u8 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= 255.0 {
        return 255;
    }
    let floor = value.floor();
    let rounded = if value - floor > 0.5 {
        floor + 1.0
    } else if value - floor < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    rounded as u8
}

/// The ToNumber conversion for strings.
#[must_use]
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let (sign, digits) = match s.as_bytes()[0] {
        b'-' => (-1.0, &s[1..]),
        b'+' => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if digits == "Infinity" {
        return sign * f64::INFINITY;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return parse_radix(hex, 16);
    }
    if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        return parse_radix(oct, 8);
    }
    if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        return parse_radix(bin, 2);
    }
    // Rust accepts "inf" and "nan", the script language does not
    if !digits
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut result = 0.0;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => result = result * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_detect_int_representation() {
        assert!(is_representable_as_int(0.0));
        assert!(is_representable_as_int(-17.0));
        assert!(is_representable_as_int(2_147_483_647.0));
        assert!(!is_representable_as_int(2_147_483_648.0));
        assert!(!is_representable_as_int(-0.0));
        assert!(!is_representable_as_int(1.5));
        assert!(!is_representable_as_int(f64::NAN));
        assert!(!is_representable_as_int(f64::INFINITY));

        assert!(is_representable_as_long(4_294_967_296.0));
        assert!(is_representable_as_long(MAX_SAFE_INTEGER));
        assert!(!is_representable_as_long(MAX_SAFE_INTEGER * 4.0));
        assert!(!is_representable_as_long(0.25));
    }

    #[test]
    fn converts_to_int32() {
        assert_eq!(to_int32(2.9), 2);
        assert_eq!(to_int32(-2.9), -2);
        assert_eq!(to_int32(4_294_967_296.0), 0);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(-2_147_483_649.0), i32::MAX);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::NEG_INFINITY), 0);
        assert_eq!(to_uint32(-1.0), u32::MAX);
    }

    #[test]
    fn clamps_bytes() {
        assert_eq!(to_uint8_clamp(-5.0), 0);
        assert_eq!(to_uint8_clamp(300.0), 255);
        assert_eq!(to_uint8_clamp(1.5), 2);
        assert_eq!(to_uint8_clamp(2.5), 2);
        assert_eq!(to_uint8_clamp(2.6), 3);
        assert_eq!(to_uint8_clamp(f64::NAN), 0);
    }

    #[test]
    fn parses_strings() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number("-1.5e3"), -1500.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("nan").is_nan());
        assert!(string_to_number("12abc").is_nan());
    }
}

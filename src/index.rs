//! Conversion of property keys to array indices and back
//!
//! An array index is an integer in `0..=MAX_ARRAY_INDEX`. Every key the language
//! can use to address an element passes through [`ToArrayIndex`], which yields
//! `None` for anything that is not a valid index: such keys are plain
//! properties and never reach a store.

use std::borrow::Cow;

use lazy_static::lazy_static;

use crate::number::{is_representable_as_int, is_representable_as_long};
use crate::value::Value;

/// Largest valid array index. One less than `u32::MAX`, so that the length of
/// an array always fits in a `u32`.
pub const MAX_ARRAY_INDEX: u32 = 0xFFFF_FFFE;

const CACHED_KEYS: usize = 1024;

lazy_static! {
    static ref KEY_STRINGS: Vec<String> = (0..CACHED_KEYS).map(|i| i.to_string()).collect();
}

/// Types that can be interpreted as an array index.
pub trait ToArrayIndex {
    /// Returns the index this key denotes, or `None` if it is not an index.
    fn to_array_index(&self) -> Option<u32>;
}

/// Returns the array index `key` denotes, if any.
pub fn index_of(key: impl ToArrayIndex) -> Option<u32> {
    key.to_array_index()
}

/// Returns the canonical property key for `index`. Small keys are served from
/// a shared table.
#[must_use]
pub fn to_key_string(index: u32) -> Cow<'static, str> {
    match KEY_STRINGS.get(index as usize) {
        Some(s) => Cow::Borrowed(s.as_str()),
        None => Cow::Owned(index.to_string()),
    }
}

/// Reinterprets a raw 32-bit index, as produced by integer arithmetic in
/// compiled code, as an unsigned index.
#[must_use]
pub fn to_long_index(raw: i32) -> u64 {
    u64::from(raw as u32)
}

fn from_u64(value: u64) -> Option<u32> {
    if value <= u64::from(MAX_ARRAY_INDEX) {
        Some(value as u32)
    } else {
        None
    }
}

macro_rules! integer_impl {
    ($($ty:ty),*) => {
        $(impl ToArrayIndex for $ty {
            fn to_array_index(&self) -> Option<u32> {
                u64::try_from(*self).ok().and_then(from_u64)
            }
        })*
    };
}

integer_impl!(i32, i64, u32, u64, usize);

impl ToArrayIndex for f64 {
    fn to_array_index(&self) -> Option<u32> {
        let value = *self;
        if value == 0.0 {
            // Covers -0.0 as well
            return Some(0);
        }
        if is_representable_as_int(value) {
            return (value as i32).to_array_index();
        }
        if is_representable_as_long(value) && value > 0.0 {
            return from_u64(value as u64);
        }
        None
    }
}

impl ToArrayIndex for f32 {
    fn to_array_index(&self) -> Option<u32> {
        f64::from(*self).to_array_index()
    }
}

impl ToArrayIndex for str {
    fn to_array_index(&self) -> Option<u32> {
        let bytes = self.as_bytes();
        match bytes {
            [] => None,
            [b'0'] => Some(0),
            [b'0', ..] => None,
            _ => {
                let mut value: u64 = 0;
                for &b in bytes {
                    if !b.is_ascii_digit() {
                        return None;
                    }
                    value = value * 10 + u64::from(b - b'0');
                    if value > u64::from(MAX_ARRAY_INDEX) {
                        return None;
                    }
                }
                Some(value as u32)
            }
        }
    }
}

impl ToArrayIndex for String {
    fn to_array_index(&self) -> Option<u32> {
        self.as_str().to_array_index()
    }
}

impl ToArrayIndex for Value {
    fn to_array_index(&self) -> Option<u32> {
        match self {
            Value::Int(i) => i.to_array_index(),
            Value::Double(d) => d.to_array_index(),
            Value::String(s) => s.to_array_index(),
            _ => None,
        }
    }
}

impl<T: ToArrayIndex + ?Sized> ToArrayIndex for &T {
    fn to_array_index(&self) -> Option<u32> {
        (**self).to_array_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_integer_keys() {
        assert_eq!(index_of(0i32), Some(0));
        assert_eq!(index_of(-1i32), None);
        assert_eq!(index_of(4_294_967_294u64), Some(MAX_ARRAY_INDEX));
        assert_eq!(index_of(4_294_967_295u64), None);
        assert_eq!(index_of(u32::MAX), None);
        assert_eq!(index_of(-5i64), None);
        assert_eq!(index_of(17usize), Some(17));
    }

    #[test]
    fn accepts_integral_floats() {
        assert_eq!(index_of(3.0), Some(3));
        assert_eq!(index_of(-0.0), Some(0));
        assert_eq!(index_of(4_294_967_294.0), Some(MAX_ARRAY_INDEX));
        assert_eq!(index_of(4_294_967_295.0), None);
        assert_eq!(index_of(1.5), None);
        assert_eq!(index_of(-1.0), None);
        assert_eq!(index_of(f64::NAN), None);
        assert_eq!(index_of(f64::INFINITY), None);
        assert_eq!(index_of(2.0f32), Some(2));
    }

    #[test]
    fn accepts_canonical_strings() {
        assert_eq!(index_of("0"), Some(0));
        assert_eq!(index_of("123"), Some(123));
        assert_eq!(index_of("4294967294"), Some(MAX_ARRAY_INDEX));
        assert_eq!(index_of("4294967295"), None);
        assert_eq!(index_of("99999999999999999999"), None);
        assert_eq!(index_of("007"), None);
        assert_eq!(index_of(""), None);
        assert_eq!(index_of("1a"), None);
        assert_eq!(index_of("-1"), None);
        assert_eq!(index_of("+1"), None);
        assert_eq!(index_of(" 1"), None);
        assert_eq!(index_of(String::from("42")), Some(42));
    }

    #[test]
    fn accepts_values() {
        assert_eq!(index_of(Value::Int(9)), Some(9));
        assert_eq!(index_of(Value::from("9")), Some(9));
        assert_eq!(index_of(Value::Double(9.5)), None);
        assert_eq!(index_of(Value::TRUE), None);
        assert_eq!(index_of(&Value::Int(-1)), None);
    }

    #[test]
    fn round_trips_key_strings() {
        for i in (0..5000).chain([MAX_ARRAY_INDEX - 1, MAX_ARRAY_INDEX]) {
            let key = to_key_string(i);
            assert_eq!(key, i.to_string());
            assert_eq!(index_of(&*key), Some(i));
        }
        assert!(matches!(to_key_string(7), Cow::Borrowed(_)));
        assert!(matches!(to_key_string(100_000), Cow::Owned(_)));
    }

    #[test]
    fn widens_raw_indices() {
        assert_eq!(to_long_index(5), 5);
        assert_eq!(to_long_index(-1), 0xFFFF_FFFF);
        assert_eq!(to_long_index(i32::MIN), 0x8000_0000);
    }
}

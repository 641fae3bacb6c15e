//! Script values as seen by the array storage layer

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::number::{is_representable_as_int, string_to_number, to_int32};

/// Opaque handle to an object owned by the host object model.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjectId(pub u64);

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// A script value. Integers and doubles are kept apart so that stores can pick
/// the narrowest representation; everything else is boxed into object stores.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    /// The language's `undefined`
    #[default]
    Undefined,
    /// The language's `null`
    Null,
    /// A boolean
    Bool(bool),
    /// A number known to be a 32-bit integer
    Int(i32),
    /// Any other number
    Double(f64),
    /// An immutable string
    String(Arc<str>),
    /// A reference to a host object
    Object(ObjectId),
}

impl Value {
    /// The `undefined` value
    pub const UNDEFINED: Self = Self::Undefined;
    /// The `null` value
    pub const NULL: Self = Self::Null;
    /// The `true` value
    pub const TRUE: Self = Self::Bool(true);
    /// The `false` value
    pub const FALSE: Self = Self::Bool(false);

    /// Returns a number value, using the integer form when it is exact.
    #[must_use]
    pub fn number(value: f64) -> Self {
        if is_representable_as_int(value) {
            Self::Int(value as i32)
        } else {
            Self::Double(value)
        }
    }

    /// Returns `true` if this is `undefined`.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` if this is a number of either form.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Double(_))
    }

    /// The ToNumber conversion. Host objects convert to NaN: calling their
    /// `valueOf` is the object model's business.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Object(_) => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Int(i) => f64::from(*i),
            Self::Double(d) => *d,
            Self::String(s) => string_to_number(s),
        }
    }

    /// The ToInt32 conversion.
    #[must_use]
    pub fn to_int32(&self) -> i32 {
        match self {
            Self::Int(i) => *i,
            other => to_int32(other.to_number()),
        }
    }

    /// Returns the value as an `i32` only if it is exactly one.
    #[must_use]
    pub fn as_exact_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Double(d) if is_representable_as_int(*d) => Some(*d as i32),
            _ => None,
        }
    }

    /// Returns the value as an `f64` only if it is a number.
    #[must_use]
    pub fn as_exact_double(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => Debug::fmt(b, f),
            Self::Int(i) => Debug::fmt(i, f),
            Self::Double(d) => Debug::fmt(d, f),
            Self::String(s) => Debug::fmt(s, f),
            Self::Object(id) => Display::fmt(id, f),
        }
    }
}

macro_rules! from_impl {
    ($(($ty:ty, $variant:ident, $conv:expr)),*) => {
        $(impl From<$ty> for Value {
            fn from(other: $ty) -> Self {
                Value::$variant($conv(other))
            }
        })*
    };
}

from_impl!(
    (bool, Bool, |v| v),
    (i8, Int, i32::from),
    (u8, Int, i32::from),
    (i16, Int, i32::from),
    (u16, Int, i32::from),
    (i32, Int, |v| v),
    (f32, Double, f64::from),
    (f64, Double, |v| v),
    (&str, String, Arc::from),
    (String, String, Arc::from),
    (Arc<str>, String, |v| v),
    (ObjectId, Object, |v| v)
);

impl From<u32> for Value {
    fn from(other: u32) -> Self {
        match i32::try_from(other) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Double(f64::from(other)),
        }
    }
}

impl From<i64> for Value {
    fn from(other: i64) -> Self {
        match i32::try_from(other) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Double(other as f64),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(other: Option<T>) -> Self {
        other.map_or(Value::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    /// Converts a JSON scalar. Nested arrays and objects belong to the host
    /// object model and become `undefined` here.
    fn from(other: serde_json::Value) -> Self {
        match other {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.into()
                } else {
                    Value::number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Undefined,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i32(*i),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(id) => serializer.serialize_newtype_struct("ObjectId", &id.0),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("a scalar script value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(match i32::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Double(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

//! Fixed-length stores over a host-supplied byte buffer

use std::any::Any;
use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::mem::size_of;

use tracing::trace;

use crate::continuous::{
    read_double, read_int, read_object, ContinuousArrayData, ElementGetter, ElementSetter,
};
use crate::data::{ArrayData, CallSite, ElementKind, Store, StoreKind, StoreResult};
use crate::error::{AccessError, ArrayError};
use crate::number::{to_int32, to_uint32, to_uint8_clamp};
use crate::value::Value;

/// Element type of a typed store.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypedKind {
    /// Buffer contains i8 values
    I8,
    /// Buffer contains u8 values, wrapping on write
    U8,
    /// Buffer contains u8 values, clamping on write
    U8Clamped,
    /// Buffer contains i16 values
    I16,
    /// Buffer contains u16 values
    U16,
    /// Buffer contains i32 values
    I32,
    /// Buffer contains u32 values
    U32,
    /// Buffer contains f32 values
    F32,
    /// Buffer contains f64 values
    F64,
}

impl TypedKind {
    /// Size of one element in bytes
    #[must_use]
    pub fn element_size(self) -> usize {
        use TypedKind::*;
        match self {
            I8 | U8 | U8Clamped => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            F64 => 8,
        }
    }

    /// Returns `true` if every element reads back as an `i32`
    #[must_use]
    pub fn fits_int(self) -> bool {
        use TypedKind::*;
        matches!(self, I8 | U8 | U8Clamped | I16 | U16 | I32)
    }

    fn element_kind(self) -> ElementKind {
        if self.fits_int() {
            ElementKind::Int
        } else {
            ElementKind::Double
        }
    }
}

/// Byte order of the elements in a typed store's buffer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
    /// The byte order of the host
    #[default]
    Native,
}

macro_rules! read_as {
    ($bytes:expr, $order:expr, $t:ty) => {{
        let mut raw = [0u8; size_of::<$t>()];
        raw.copy_from_slice($bytes);
        match $order {
            ByteOrder::Little => <$t>::from_le_bytes(raw),
            ByteOrder::Big => <$t>::from_be_bytes(raw),
            ByteOrder::Native => <$t>::from_ne_bytes(raw),
        }
    }};
}

macro_rules! write_as {
    ($bytes:expr, $order:expr, $v:expr) => {{
        let raw = match $order {
            ByteOrder::Little => $v.to_le_bytes(),
            ByteOrder::Big => $v.to_be_bytes(),
            ByteOrder::Native => $v.to_ne_bytes(),
        };
        $bytes.copy_from_slice(&raw);
    }};
}

/// A fixed-length store over an owned byte buffer.
#[derive(Clone, PartialEq)]
pub struct TypedStore {
    bytes: Vec<u8>,
    kind: TypedKind,
    order: ByteOrder,
}

impl TypedStore {
    /// Creates a store over `bytes`. Trailing bytes that do not make up a
    /// whole element are kept but not addressable.
    #[must_use]
    pub fn new(bytes: Vec<u8>, kind: TypedKind, order: ByteOrder) -> Self {
        Self { bytes, kind, order }
    }

    /// The element type
    #[must_use]
    pub fn typed_kind(&self) -> TypedKind {
        self.kind
    }

    /// The underlying bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn len(&self) -> u64 {
        (self.bytes.len() / self.kind.element_size()) as u64
    }

    fn element_bytes(&self, index: u64) -> Option<&[u8]> {
        if index >= self.len() {
            return None;
        }
        let size = self.kind.element_size();
        let start = index as usize * size;
        Some(&self.bytes[start..start + size])
    }

    fn read(&self, index: u64) -> Option<Value> {
        use TypedKind::*;
        let bytes = self.element_bytes(index)?;
        let order = self.order;
        Some(match self.kind {
            I8 => Value::from(read_as!(bytes, order, i8)),
            U8 | U8Clamped => Value::from(read_as!(bytes, order, u8)),
            I16 => Value::from(read_as!(bytes, order, i16)),
            U16 => Value::from(read_as!(bytes, order, u16)),
            I32 => Value::from(read_as!(bytes, order, i32)),
            U32 => Value::from(read_as!(bytes, order, u32)),
            F32 => Value::from(read_as!(bytes, order, f32)),
            F64 => Value::from(read_as!(bytes, order, f64)),
        })
    }

    /// Stores `number` at `index`, coerced to the element type.
    fn write(&mut self, index: u64, number: f64) -> bool {
        use TypedKind::*;
        if index >= self.len() {
            return false;
        }
        let size = self.kind.element_size();
        let start = index as usize * size;
        let order = self.order;
        let bytes = &mut self.bytes[start..start + size];
        match self.kind {
            I8 => write_as!(bytes, order, to_int32(number) as i8),
            U8 => write_as!(bytes, order, to_uint32(number) as u8),
            U8Clamped => write_as!(bytes, order, to_uint8_clamp(number)),
            I16 => write_as!(bytes, order, to_int32(number) as i16),
            U16 => write_as!(bytes, order, to_uint32(number) as u16),
            I32 => write_as!(bytes, order, to_int32(number)),
            U32 => write_as!(bytes, order, to_uint32(number)),
            F32 => write_as!(bytes, order, number as f32),
            F64 => write_as!(bytes, order, number),
        }
        true
    }
}

impl Debug for TypedStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Store", self.kind)?;
        f.debug_list()
            .entries((0..self.len()).filter_map(|i| self.read(i)))
            .finish()
    }
}

impl ArrayData for TypedStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Typed(self.kind)
    }

    fn optimistic_kind(&self) -> ElementKind {
        self.kind.element_kind()
    }

    fn length(&self) -> u64 {
        self.len()
    }

    fn set_length(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn has(&self, index: u64) -> bool {
        index < self.len()
    }

    fn get_int(&self, index: u64) -> i32 {
        self.read(index).map_or(0, |v| v.to_int32())
    }

    fn get_double(&self, index: u64) -> f64 {
        self.read(index).map_or(f64::NAN, |v| v.to_number())
    }

    fn get_object(&self, index: u64) -> Value {
        self.read(index).unwrap_or_default()
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        let value = self.read(index).ok_or(AccessError::OutOfBounds {
            index,
            length: self.len(),
        })?;
        value
            .as_exact_int()
            .ok_or_else(|| AccessError::deoptimize(value, site))
    }

    fn get_double_optimistic(&self, index: u64, _: CallSite) -> Result<f64, AccessError> {
        self.read(index)
            .map(|v| v.to_number())
            .ok_or(AccessError::OutOfBounds {
                index,
                length: self.len(),
            })
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, _: bool) -> StoreResult {
        if !self.write(index, value.to_number()) {
            trace!(index, length = self.len(), "ignoring write past typed store");
        }
        Ok(self)
    }

    fn ensure(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn can_delete(&self, index: u64, strict: bool) -> Result<bool, ArrayError> {
        if index >= self.len() {
            Ok(true)
        } else if strict {
            Err(ArrayError::NotConfigurable { index, array: None })
        } else {
            Ok(false)
        }
    }

    fn can_delete_range(&self, from: u64, to: u64, strict: bool) -> Result<bool, ArrayError> {
        if from > to {
            return Ok(true);
        }
        self.can_delete(from, strict)
    }

    fn delete(self: Box<Self>, _: u64) -> Store {
        self
    }

    fn delete_range(self: Box<Self>, _: u64, _: u64) -> Store {
        self
    }

    fn shrink(self: Box<Self>, _: u64) -> Store {
        self
    }

    fn shift_left(self: Box<Self>, _: u64) -> Store {
        self
    }

    fn shift_right(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn pop(&mut self) -> Value {
        self.len()
            .checked_sub(1)
            .and_then(|last| self.read(last))
            .unwrap_or_default()
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = cmp::min(to, self.len());
        let from = cmp::min(from, to);
        let size = self.kind.element_size();
        let bytes = self.bytes[from as usize * size..to as usize * size].to_vec();
        Box::new(Self::new(bytes, self.kind, self.order))
    }

    fn convert(self: Box<Self>, _: ElementKind) -> Store {
        self
    }

    fn as_continuous(&self) -> Option<&dyn ContinuousArrayData> {
        Some(self)
    }

    fn as_continuous_mut(&mut self) -> Option<&mut dyn ContinuousArrayData> {
        Some(self)
    }
}

fn write_typed<E: Into<Value>>(store: &mut dyn Any, index: u64, value: E) -> Result<(), AccessError> {
    let store = store
        .downcast_mut::<TypedStore>()
        .ok_or(AccessError::GuardFailed)?;
    let length = store.len();
    if store.write(index, value.into().to_number()) {
        Ok(())
    } else {
        Err(AccessError::OutOfBounds { index, length })
    }
}

impl ContinuousArrayData for TypedStore {
    fn capacity(&self) -> u64 {
        self.len()
    }

    fn has_room_for(&self, index: u64) -> bool {
        index < self.len()
    }

    fn element_kind(&self) -> ElementKind {
        self.kind.element_kind()
    }

    fn fast_push(&mut self, _: &Value) -> Result<u64, AccessError> {
        Err(AccessError::Unsupported)
    }

    fn fast_pop(&mut self) -> Result<Value, AccessError> {
        Err(AccessError::Unsupported)
    }

    fn fast_concat(&self, _: &dyn ContinuousArrayData) -> Option<Store> {
        None
    }

    fn fast_splice(&mut self, _: u64, _: u64, _: u64) -> Result<Store, AccessError> {
        Err(AccessError::Unsupported)
    }

    fn int_getter(&self, site: CallSite) -> Option<ElementGetter<i32>> {
        self.kind
            .fits_int()
            .then(|| ElementGetter::new::<Self>(site, read_int::<Self>))
    }

    fn double_getter(&self, site: CallSite) -> Option<ElementGetter<f64>> {
        Some(ElementGetter::new::<Self>(site, read_double::<Self>))
    }

    fn object_getter(&self, site: CallSite) -> Option<ElementGetter<Value>> {
        Some(ElementGetter::new::<Self>(site, read_object::<Self>))
    }

    fn int_setter(&self) -> Option<ElementSetter<i32>> {
        Some(ElementSetter::new::<Self>(write_typed::<i32>))
    }

    fn double_setter(&self) -> Option<ElementSetter<f64>> {
        Some(ElementSetter::new::<Self>(write_typed::<f64>))
    }

    fn object_setter(&self) -> Option<ElementSetter<Value>> {
        Some(ElementSetter::new::<Self>(write_typed::<Value>))
    }
}

//! Dense stores backed by one flat buffer
//!
//! The three dense kinds share [`DenseStore`], parameterised by the element
//! type. The buffer's length is the store's capacity: slots past the array
//! length always hold the element type's filler.

use std::any::Any;
use std::cmp;
use std::fmt::{self, Debug, Formatter};
use std::iter;
use std::mem;

use tracing::debug;

use crate::alloc::{align_up, grow_for_index, next_size};
use crate::continuous::{
    read_double, read_int, read_object, ContinuousArrayData, ElementGetter, ElementSetter,
};
use crate::data::{
    set_past_length, ArrayData, CallSite, ElementKind, Store, StoreKind,
    StoreResult, MAX_DENSE_LENGTH,
};
use crate::deleted::DeletedRangeFilter;
use crate::empty::EmptyStore;
use crate::error::{AccessError, StoreError};
use crate::number::{is_representable_as_int, to_int32};
use crate::sparse::{exceeds_dense, SparseStore};
use crate::undefined::UndefinedTrackingView;
use crate::value::Value;

/// Element types a [`DenseStore`] can hold.
pub trait DenseElement: Clone + PartialEq + Debug + 'static {
    /// The element kind this type represents
    const KIND: ElementKind;
    /// The store kind of a buffer of this type
    const STORE_KIND: StoreKind;
    /// Whether the filler doubles as an "empty slot" marker
    const NULLABLE: bool;

    /// Value of slots that were never written
    fn filler() -> Self;
    /// Converts a value if it fits without loss
    fn try_from_value(value: &Value) -> Option<Self>;
    /// Converts back to a value
    fn to_value(&self) -> Value;
    /// ToInt32
    fn to_int(&self) -> i32;
    /// ToNumber
    fn to_double(&self) -> f64;
    /// The element as an exact `i32`, or the element itself on failure
    fn to_int_optimistic(&self) -> Result<i32, Value>;
    /// The element as a number, or the element itself on failure
    fn to_double_optimistic(&self) -> Result<f64, Value>;
    /// Returns `false` for empty slots
    fn is_present(&self) -> bool {
        true
    }
}

impl DenseElement for i32 {
    const KIND: ElementKind = ElementKind::Int;
    const STORE_KIND: StoreKind = StoreKind::Int;
    const NULLABLE: bool = false;

    fn filler() -> Self {
        0
    }
    fn try_from_value(value: &Value) -> Option<Self> {
        value.as_exact_int()
    }
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
    fn to_int(&self) -> i32 {
        *self
    }
    fn to_double(&self) -> f64 {
        f64::from(*self)
    }
    fn to_int_optimistic(&self) -> Result<i32, Value> {
        Ok(*self)
    }
    fn to_double_optimistic(&self) -> Result<f64, Value> {
        Ok(f64::from(*self))
    }
}

impl DenseElement for f64 {
    const KIND: ElementKind = ElementKind::Double;
    const STORE_KIND: StoreKind = StoreKind::Double;
    const NULLABLE: bool = false;

    fn filler() -> Self {
        0.0
    }
    fn try_from_value(value: &Value) -> Option<Self> {
        value.as_exact_double()
    }
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
    fn to_int(&self) -> i32 {
        to_int32(*self)
    }
    fn to_double(&self) -> f64 {
        *self
    }
    fn to_int_optimistic(&self) -> Result<i32, Value> {
        if is_representable_as_int(*self) {
            Ok(*self as i32)
        } else {
            Err(Value::Double(*self))
        }
    }
    fn to_double_optimistic(&self) -> Result<f64, Value> {
        Ok(*self)
    }
}

impl DenseElement for Option<Value> {
    const KIND: ElementKind = ElementKind::Object;
    const STORE_KIND: StoreKind = StoreKind::Object;
    const NULLABLE: bool = true;

    fn filler() -> Self {
        None
    }
    fn try_from_value(value: &Value) -> Option<Self> {
        Some(Some(value.clone()))
    }
    fn to_value(&self) -> Value {
        self.clone().unwrap_or_default()
    }
    fn to_int(&self) -> i32 {
        self.as_ref().map_or(0, Value::to_int32)
    }
    fn to_double(&self) -> f64 {
        self.as_ref().map_or(f64::NAN, Value::to_number)
    }
    fn to_int_optimistic(&self) -> Result<i32, Value> {
        match self {
            Some(value) => value.as_exact_int().ok_or_else(|| value.clone()),
            None => Err(Value::Undefined),
        }
    }
    fn to_double_optimistic(&self) -> Result<f64, Value> {
        match self {
            Some(value) => value.as_exact_double().ok_or_else(|| value.clone()),
            None => Err(Value::Undefined),
        }
    }
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

/// A dense store of `T` elements.
#[derive(Clone, PartialEq)]
pub struct DenseStore<T: DenseElement> {
    array: Vec<T>,
    length: u64,
}

/// Dense store of 32-bit integers
pub type IntStore = DenseStore<i32>;
/// Dense store of doubles
pub type FloatStore = DenseStore<f64>;
/// Dense store of arbitrary values. `None` marks a released slot.
pub type ObjectStore = DenseStore<Option<Value>>;

impl<T: DenseElement> DenseStore<T> {
    /// Creates an empty store without allocating.
    #[must_use]
    pub fn new() -> Self {
        Self {
            array: Vec::new(),
            length: 0,
        }
    }

    /// Creates a store of `length` filler elements.
    #[must_use]
    pub fn with_length(length: u64) -> Self {
        debug_assert!(length <= MAX_DENSE_LENGTH);
        Self {
            array: vec![T::filler(); align_up(length as usize)],
            length,
        }
    }

    fn from_vec(mut array: Vec<T>) -> Self {
        let length = array.len() as u64;
        array.resize(align_up(array.len()), T::filler());
        Self { array, length }
    }

    /// The elements in `0..length`
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.array[..self.length as usize]
    }

    fn element(&self, index: u64) -> Option<&T> {
        if index < self.length {
            self.array.get(index as usize)
        } else {
            None
        }
    }

    // Every length change goes through here. Dropped slots go back to filler.
    fn write_length(&mut self, length: u64) {
        if length < self.length {
            self.array[length as usize..self.length as usize].fill(T::filler());
        } else if length as usize > self.array.len() {
            self.array.resize(align_up(length as usize), T::filler());
        }
        self.length = length;
    }

    fn out_of_bounds(&self, index: u64) -> AccessError {
        AccessError::OutOfBounds {
            index,
            length: self.length,
        }
    }

    fn widen<U: DenseElement>(self) -> DenseStore<U> {
        let length = self.length as usize;
        let array = self
            .array
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if i < length {
                    U::try_from_value(&e.to_value())
                } else {
                    Some(U::filler())
                }
            })
            .collect::<Option<Vec<U>>>();
        match array {
            Some(array) => DenseStore {
                array,
                length: self.length,
            },
            None => panic!("cannot narrow a {:?} store to {:?}", T::KIND, U::KIND),
        }
    }
}

impl<T: DenseElement> Default for DenseStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DenseElement> Debug for DenseStore<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Store", T::KIND)?;
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: DenseElement> From<Vec<T>> for DenseStore<T> {
    fn from(other: Vec<T>) -> Self {
        Self::from_vec(other)
    }
}

impl<T: DenseElement> From<&[T]> for DenseStore<T> {
    fn from(other: &[T]) -> Self {
        Self::from_vec(other.to_vec())
    }
}

impl From<Vec<Value>> for ObjectStore {
    fn from(other: Vec<Value>) -> Self {
        Self::from_vec(other.into_iter().map(Some).collect())
    }
}

impl From<&[Value]> for ObjectStore {
    fn from(other: &[Value]) -> Self {
        Self::from_vec(other.iter().cloned().map(Some).collect())
    }
}

impl<T: DenseElement> ArrayData for DenseStore<T> {
    fn kind(&self) -> StoreKind {
        T::STORE_KIND
    }

    fn optimistic_kind(&self) -> ElementKind {
        T::KIND
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn has(&self, index: u64) -> bool {
        self.element(index).map_or(false, T::is_present)
    }

    fn get_int(&self, index: u64) -> i32 {
        self.element(index).map_or(0, T::to_int)
    }

    fn get_double(&self, index: u64) -> f64 {
        self.element(index).map_or(f64::NAN, T::to_double)
    }

    fn get_object(&self, index: u64) -> Value {
        self.element(index).map_or(Value::Undefined, T::to_value)
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        self.element(index)
            .ok_or_else(|| self.out_of_bounds(index))?
            .to_int_optimistic()
            .map_err(|value| AccessError::deoptimize(value, site))
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        self.element(index)
            .ok_or_else(|| self.out_of_bounds(index))?
            .to_double_optimistic()
            .map_err(|value| AccessError::deoptimize(value, site))
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if !self.has_room_for(index) {
            return set_past_length(self, index, value, strict);
        }
        match T::try_from_value(&value) {
            Some(element) => {
                self.array[index as usize] = element;
                if index == self.length {
                    self.write_length(index + 1);
                }
                Ok(self)
            }
            None if value.is_undefined() => {
                UndefinedTrackingView::wrap(self).set(index, value, strict)
            }
            None => self
                .convert(ElementKind::of(&value))
                .set(index, value, strict),
        }
    }

    fn ensure(mut self: Box<Self>, index: u64) -> StoreResult {
        if exceeds_dense(&*self, index) {
            return SparseStore::promote_for(self, index);
        }
        if let Err(e) = grow_for_index(&mut self.array, index as usize, T::filler()) {
            return Err(StoreError::new(e, self));
        }
        if index >= self.length {
            self.write_length(index + 1);
        }
        Ok(self)
    }

    fn delete(self: Box<Self>, index: u64) -> Store {
        if index >= self.length {
            return self;
        }
        DeletedRangeFilter::wrap(self, index, index)
    }

    fn delete_range(self: Box<Self>, from: u64, to: u64) -> Store {
        if from > to || from >= self.length {
            return self;
        }
        let to = cmp::min(to, self.length - 1);
        DeletedRangeFilter::wrap(self, from, to)
    }

    fn set_empty(&mut self, from: u64, to: u64) {
        if !T::NULLABLE || from > to || from >= self.length {
            return;
        }
        let to = cmp::min(to, self.length - 1);
        self.array[from as usize..=to as usize].fill(T::filler());
    }

    fn shrink(mut self: Box<Self>, new_length: u64) -> Store {
        if new_length < self.length {
            self.write_length(new_length);
        }
        self
    }

    fn shift_left(mut self: Box<Self>, by: u64) -> Store {
        let len = self.length as usize;
        let by = cmp::min(by, self.length) as usize;
        self.array[..len].rotate_left(by);
        self.write_length((len - by) as u64);
        self
    }

    fn shift_right(mut self: Box<Self>, by: u64) -> StoreResult {
        if by == 0 {
            return Ok(self);
        }
        let new_length = self.length.saturating_add(by);
        if new_length > MAX_DENSE_LENGTH {
            let length = self.length;
            return SparseStore::promote(self, length).shift_right(by);
        }
        if let Err(e) = grow_for_index(&mut self.array, new_length as usize - 1, T::filler()) {
            return Err(StoreError::new(e, self));
        }
        // Slots past the length hold filler, so they rotate in as the new prefix
        self.array[..new_length as usize].rotate_right(by as usize);
        self.write_length(new_length);
        Ok(self)
    }

    fn pop(&mut self) -> Value {
        if self.length == 0 {
            return Value::Undefined;
        }
        let last = self.length - 1;
        let value = mem::replace(&mut self.array[last as usize], T::filler());
        self.write_length(last);
        value.to_value()
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = cmp::min(to, self.length);
        let from = cmp::min(from, to);
        Box::new(Self::from_vec(
            self.array[from as usize..to as usize].to_vec(),
        ))
    }

    fn convert(self: Box<Self>, kind: ElementKind) -> Store {
        if kind == T::KIND {
            return self;
        }
        assert!(
            kind > T::KIND,
            "cannot narrow a {:?} store to {:?}",
            T::KIND,
            kind
        );
        debug!(from = ?T::KIND, to = ?kind, length = self.length, "widening dense store");
        if kind == ElementKind::Double {
            Box::new((*self).widen::<f64>())
        } else {
            Box::new((*self).widen::<Option<Value>>())
        }
    }

    fn as_object_array(&self) -> Vec<Value> {
        self.as_slice().iter().map(T::to_value).collect()
    }

    fn as_continuous(&self) -> Option<&dyn ContinuousArrayData> {
        Some(self)
    }

    fn as_continuous_mut(&mut self) -> Option<&mut dyn ContinuousArrayData> {
        Some(self)
    }
}

fn write_dense<T: DenseElement, E: Into<Value>>(
    store: &mut dyn Any,
    index: u64,
    value: E,
) -> Result<(), AccessError> {
    let store = store
        .downcast_mut::<DenseStore<T>>()
        .ok_or(AccessError::GuardFailed)?;
    if !store.has_room_for(index) {
        return Err(store.out_of_bounds(index));
    }
    let element = T::try_from_value(&value.into()).ok_or(AccessError::Unsupported)?;
    store.array[index as usize] = element;
    if index == store.length {
        store.write_length(index + 1);
    }
    Ok(())
}

fn concat<U: DenseElement>(parts: [&dyn ContinuousArrayData; 2]) -> Option<DenseStore<U>> {
    let length = parts[0].length() + parts[1].length();
    if length > MAX_DENSE_LENGTH {
        return None;
    }
    let mut array = Vec::with_capacity(align_up(length as usize));
    for part in parts {
        for i in 0..part.length() {
            array.push(U::try_from_value(&part.get_object(i))?);
        }
    }
    array.resize(align_up(length as usize), U::filler());
    Some(DenseStore { array, length })
}

impl<T: DenseElement> ContinuousArrayData for DenseStore<T> {
    fn capacity(&self) -> u64 {
        self.array.len() as u64
    }

    fn element_kind(&self) -> ElementKind {
        T::KIND
    }

    fn fast_push(&mut self, value: &Value) -> Result<u64, AccessError> {
        let element = T::try_from_value(value).ok_or(AccessError::Unsupported)?;
        if self.length >= MAX_DENSE_LENGTH {
            return Err(AccessError::Unsupported);
        }
        let index = self.length as usize;
        grow_for_index(&mut self.array, index, T::filler())
            .map_err(|_| AccessError::Unsupported)?;
        self.array[index] = element;
        self.write_length(index as u64 + 1);
        Ok(self.length)
    }

    fn fast_pop(&mut self) -> Result<Value, AccessError> {
        if self.length == 0 {
            return Err(self.out_of_bounds(0));
        }
        Ok(self.pop())
    }

    fn fast_concat(&self, other: &dyn ContinuousArrayData) -> Option<Store> {
        if matches!(other.kind(), StoreKind::Typed(_)) {
            return None;
        }
        let parts: [&dyn ContinuousArrayData; 2] = [self, other];
        Some(match T::KIND.widest(other.element_kind()) {
            ElementKind::Int => Box::new(concat::<i32>(parts)?),
            ElementKind::Double => Box::new(concat::<f64>(parts)?),
            ElementKind::Object => Box::new(concat::<Option<Value>>(parts)?),
        })
    }

    fn fast_splice(&mut self, start: u64, removed: u64, added: u64) -> Result<Store, AccessError> {
        let old_length = self.length;
        if start > old_length || removed > old_length - start {
            return Err(self.out_of_bounds(start.saturating_add(removed)));
        }
        let new_length = (old_length - removed)
            .checked_add(added)
            .filter(|&n| n <= MAX_DENSE_LENGTH)
            .ok_or(AccessError::Unsupported)?;
        let capacity = if new_length as usize > self.array.len() {
            next_size(new_length as usize)
        } else {
            self.array.len()
        };
        let start = start as usize;
        self.array.truncate(old_length as usize);
        let removed_elements: Vec<T> = self
            .array
            .splice(
                start..start + removed as usize,
                iter::repeat(T::filler()).take(added as usize),
            )
            .collect();
        self.array.resize(capacity, T::filler());
        self.write_length(new_length);
        Ok(if removed_elements.is_empty() {
            Box::new(EmptyStore)
        } else {
            Box::new(Self::from_vec(removed_elements))
        })
    }

    fn int_getter(&self, site: CallSite) -> Option<ElementGetter<i32>> {
        Some(ElementGetter::new::<Self>(site, read_int::<Self>))
    }

    fn double_getter(&self, site: CallSite) -> Option<ElementGetter<f64>> {
        Some(ElementGetter::new::<Self>(site, read_double::<Self>))
    }

    fn object_getter(&self, site: CallSite) -> Option<ElementGetter<Value>> {
        Some(ElementGetter::new::<Self>(site, read_object::<Self>))
    }

    fn int_setter(&self) -> Option<ElementSetter<i32>> {
        Some(ElementSetter::new::<Self>(write_dense::<T, i32>))
    }

    fn double_setter(&self) -> Option<ElementSetter<f64>> {
        (T::KIND >= ElementKind::Double).then(|| ElementSetter::new::<Self>(write_dense::<T, f64>))
    }

    fn object_setter(&self) -> Option<ElementSetter<Value>> {
        (T::KIND == ElementKind::Object)
            .then(|| ElementSetter::new::<Self>(write_dense::<T, Value>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MAX_LENGTH;
    use crate::error::ArrayError;
    use crate::test_utils::init_test_logging;

    fn store<T: DenseElement>(elements: Vec<T>) -> Store {
        Box::new(DenseStore::from(elements))
    }

    #[mockalloc::test]
    fn can_create() {
        let x = IntStore::new();
        assert_eq!(x.length(), 0);
        assert_eq!(x.capacity(), 0);

        let x = IntStore::with_length(3);
        assert_eq!(x.as_slice(), &[0, 0, 0]);
        assert_eq!(x.capacity(), 32);

        let x = ObjectStore::from(vec![Value::TRUE, Value::NULL]);
        assert_eq!(x.get_object(0), Value::TRUE);
        assert_eq!(x.get_object(2), Value::Undefined);
    }

    #[mockalloc::test]
    fn widens_on_write() {
        init_test_logging();
        let x = store(vec![1, 2, 3]);
        let x = x.set(1, Value::Double(2.5), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Double);
        assert_eq!(
            x.as_object_array(),
            vec![Value::Double(1.0), Value::Double(2.5), Value::Double(3.0)]
        );

        let x = x.set(0, Value::Int(4), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Double);

        let x = x.set(2, Value::from("s"), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Object);
        assert_eq!(x.get_object(2), Value::from("s"));
        assert_eq!(x.get_double(0), 4.0);
    }

    #[mockalloc::test]
    fn keeps_negative_zero() {
        let x = store(vec![1]);
        let x = x.set(0, Value::Double(-0.0), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Double);
        assert!(x.get_double(0).is_sign_negative());
    }

    #[mockalloc::test]
    fn tracks_undefined() {
        let x = store(vec![1, 2]);
        let x = x.set(1, Value::Undefined, false).unwrap();
        assert_eq!(x.kind(), StoreKind::Int);
        assert!(x.has(1));
        assert_eq!(x.get_object(1), Value::Undefined);
        assert_eq!(x.get_int(1), 0);
        assert!(x.get_double(1).is_nan());
    }

    #[mockalloc::test]
    fn reads_soft_and_optimistic() {
        let x = store(vec![1.5, 2.0]);
        assert_eq!(x.get_int(0), 1);
        assert_eq!(x.get_int(5), 0);
        assert!(x.get_double(5).is_nan());
        assert_eq!(x.get_int_optimistic(1, CallSite(0)), Ok(2));
        assert_eq!(
            x.get_int_optimistic(0, CallSite(0)),
            Err(AccessError::deoptimize(Value::Double(1.5), CallSite(0)))
        );
        assert_eq!(
            x.get_double_optimistic(2, CallSite(0)),
            Err(AccessError::OutOfBounds {
                index: 2,
                length: 2
            })
        );
    }

    #[mockalloc::test]
    fn creates_holes_past_length() {
        let x = store(vec![1, 2, 3]);
        let x = x.set(6, Value::Int(7), false).unwrap();
        assert_eq!(x.length(), 7);
        assert!(x.has(2));
        assert!(!x.has(3));
        assert!(!x.has(5));
        assert!(x.has(6));
        assert_eq!(x.get_object(4), Value::Undefined);
        assert_eq!(x.get_int(6), 7);
    }

    #[mockalloc::test]
    fn appends_in_place() {
        let mut x = store(Vec::<i32>::new());
        for i in 0..100 {
            x = x.push(Value::Int(i), false).unwrap();
            let c = x.as_continuous().unwrap();
            assert!(c.capacity() >= c.length());
        }
        assert_eq!(x.kind(), StoreKind::Int);
        assert_eq!(x.length(), 100);
        assert_eq!(x.get_int(99), 99);
        assert!((0..100).all(|i| x.has(i)));
    }

    #[mockalloc::test]
    fn promotes_to_sparse() {
        let x = store(vec![1, 2, 3]);
        let x = x.ensure(MAX_DENSE_LENGTH - 1).unwrap();
        assert_eq!(x.kind(), StoreKind::Int);
        let x = x.ensure(MAX_DENSE_LENGTH).unwrap();
        assert_eq!(x.kind(), StoreKind::Sparse);
        assert_eq!(x.length(), MAX_DENSE_LENGTH + 1);
    }

    #[mockalloc::test]
    fn can_pop_and_shrink() {
        let mut x = store(vec![Some(Value::Int(1)), Some(Value::from("a"))]);
        assert_eq!(x.pop(), Value::from("a"));
        assert_eq!(x.pop(), Value::Int(1));
        assert_eq!(x.pop(), Value::Undefined);
        assert_eq!(x.length(), 0);

        let x = store(vec![1, 2, 3, 4]);
        let x = x.shrink(2);
        assert_eq!(x.as_object_array(), vec![Value::Int(1), Value::Int(2)]);
        let x = x.ensure(3).unwrap();
        assert_eq!(x.get_int(3), 0);
    }

    #[mockalloc::test]
    fn can_shift() {
        let x = store(vec![1, 2, 3, 4]);
        let x = x.shift_left(1);
        assert_eq!(x.as_object_array(), vec![Value::Int(2), Value::Int(3), Value::Int(4)]);
        let x = x.shift_right(2).unwrap();
        assert_eq!(x.length(), 5);
        assert_eq!(x.get_int(0), 0);
        assert_eq!(x.get_int(2), 2);
        assert_eq!(x.get_int(4), 4);
        let x = x.shift_left(10);
        assert_eq!(x.length(), 0);
    }

    #[mockalloc::test]
    fn can_slice() {
        let x = store(vec![1.0, 2.0, 3.0]);
        let y = x.slice(1, 10);
        assert_eq!(y.kind(), StoreKind::Double);
        assert_eq!(y.as_object_array(), vec![Value::Double(2.0), Value::Double(3.0)]);
        assert_eq!(x.slice(2, 1).length(), 0);
    }

    #[mockalloc::test]
    fn releases_deleted_objects() {
        let x = store(vec![Some(Value::from("a")), Some(Value::from("b"))]);
        let x = x.delete(0);
        assert!(!x.has(0));
        assert_eq!(x.get_object(0), Value::Undefined);
        assert_eq!(x.get_object(1), Value::from("b"));
    }

    #[test]
    #[should_panic(expected = "cannot narrow")]
    fn refuses_to_narrow() {
        let x = store(vec![1.5]);
        let _ = x.convert(ElementKind::Int);
    }

    #[mockalloc::test]
    fn can_fast_push_and_pop() {
        let mut x = IntStore::from(vec![1]);
        assert_eq!(x.fast_push(&Value::Int(2)), Ok(2));
        assert_eq!(x.fast_push(&Value::Double(0.5)), Err(AccessError::Unsupported));
        assert_eq!(x.fast_pop(), Ok(Value::Int(2)));
        assert_eq!(x.fast_pop(), Ok(Value::Int(1)));
        assert!(matches!(x.fast_pop(), Err(AccessError::OutOfBounds { .. })));
    }

    #[mockalloc::test]
    fn can_fast_concat() {
        let a = IntStore::from(vec![1, 2]);
        let b = FloatStore::from(vec![0.5]);
        let c = a.fast_concat(&b).unwrap();
        assert_eq!(c.kind(), StoreKind::Double);
        assert_eq!(
            c.as_object_array(),
            vec![Value::Double(1.0), Value::Double(2.0), Value::Double(0.5)]
        );
        assert_eq!(c.as_continuous().unwrap().capacity(), 32);

        let d = ObjectStore::from(vec![Value::NULL]);
        let e = b.fast_concat(&d).unwrap();
        assert_eq!(e.kind(), StoreKind::Object);
        assert_eq!(e.length(), 2);
    }

    #[mockalloc::test]
    fn can_fast_splice() {
        let mut x = IntStore::from(vec![1, 2, 3, 4, 5]);
        let removed = x.fast_splice(1, 2, 3).unwrap();
        assert_eq!(removed.as_object_array(), vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(x.as_slice(), &[1, 0, 0, 0, 4, 5]);

        let removed = x.fast_splice(0, 0, 0).unwrap();
        assert_eq!(removed.kind(), StoreKind::Empty);
        assert!(x.fast_splice(5, 2, 0).is_err());

        let mut y = IntStore::from(vec![1; 32]);
        y.fast_splice(32, 0, 1).unwrap();
        assert_eq!(y.length(), 33);
        assert!(y.capacity() >= 33);
    }

    #[mockalloc::test]
    fn grows_through_set_length() {
        let x = store(vec![1]).set_length(3).unwrap();
        assert_eq!(x.kind(), StoreKind::Int);
        assert_eq!(x.length(), 3);
        assert!(x.has(0));
        assert!(!x.has(1));
        assert!(!x.has(2));

        let x = x.set_length(MAX_DENSE_LENGTH * 4).unwrap();
        assert_eq!(x.kind(), StoreKind::Sparse);
        assert_eq!(x.length(), MAX_DENSE_LENGTH * 4);
        assert_eq!(x.get_int(0), 1);
        assert!(!x.has(MAX_DENSE_LENGTH));

        let x = x.set_length(1).unwrap();
        assert_eq!(x.length(), 1);
        assert_eq!(x.get_int(0), 1);

        let e = store(vec![1]).set_length(MAX_LENGTH + 1).unwrap_err();
        assert!(matches!(e.error(), ArrayError::CapacityOverflow { .. }));
        assert_eq!(e.into_store().length(), 1);
    }

    #[mockalloc::test]
    fn shifts_past_the_dense_limit() {
        for by in [MAX_DENSE_LENGTH, MAX_DENSE_LENGTH + 1, MAX_DENSE_LENGTH * 3] {
            let x = store(vec![1, 2, 3]).shift_right(by).unwrap();
            assert_eq!(x.kind(), StoreKind::Sparse);
            assert_eq!(x.length(), by + 3);
            assert!(!x.has(0));
            assert!(!x.has(by - 1));
            assert_eq!(x.get_object(by), Value::Int(1));
            assert_eq!(x.get_object(by + 2), Value::Int(3));
        }
    }

    #[mockalloc::test]
    fn refuses_oversized_growth() {
        let e = store(vec![1]).ensure(u64::MAX).unwrap_err();
        assert!(matches!(e.error(), ArrayError::CapacityOverflow { .. }));
        assert_eq!(e.into_store().kind(), StoreKind::Int);

        let e = store(vec![1]).shift_right(u64::MAX).unwrap_err();
        assert!(matches!(e.error(), ArrayError::CapacityOverflow { .. }));

        let mut x = IntStore::from(vec![1, 2, 3]);
        assert_eq!(x.fast_splice(0, 0, u64::MAX).unwrap_err(), AccessError::Unsupported);
        assert_eq!(x.fast_splice(1, 1, MAX_DENSE_LENGTH).unwrap_err(), AccessError::Unsupported);
        assert_eq!(x.as_slice(), &[1, 2, 3]);
    }
}

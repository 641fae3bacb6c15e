//! The store of an array before its first element
//!
//! It allocates nothing. The first write or length change picks a real
//! representation: dense below [`MAX_DENSE_LENGTH`], sparse beyond.
//!
//! [`MAX_DENSE_LENGTH`]: crate::MAX_DENSE_LENGTH

use tracing::debug;

use crate::data::{ArrayData, CallSite, ElementKind, Store, StoreKind, StoreResult};
use crate::dense::{FloatStore, IntStore, ObjectStore};
use crate::error::AccessError;
use crate::storage::allocate;
use crate::value::Value;

/// The store of an array that has never held an element. It allocates
/// nothing: the first write picks a real representation.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct EmptyStore;

impl EmptyStore {
    fn first_store(value: &Value) -> Store {
        // Undefined goes through an int store so it is tracked, not boxed
        if value.is_undefined() {
            return Box::new(IntStore::new());
        }
        match ElementKind::of(value) {
            ElementKind::Int => Box::new(IntStore::new()),
            ElementKind::Double => Box::new(FloatStore::new()),
            ElementKind::Object => Box::new(ObjectStore::new()),
        }
    }

    fn out_of_bounds(index: u64) -> AccessError {
        AccessError::OutOfBounds { index, length: 0 }
    }
}

impl ArrayData for EmptyStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Empty
    }

    fn optimistic_kind(&self) -> ElementKind {
        ElementKind::Int
    }

    fn length(&self) -> u64 {
        0
    }

    fn has(&self, _: u64) -> bool {
        false
    }

    fn get_int(&self, _: u64) -> i32 {
        0
    }

    fn get_double(&self, _: u64) -> f64 {
        f64::NAN
    }

    fn get_object(&self, _: u64) -> Value {
        Value::Undefined
    }

    fn get_int_optimistic(&self, index: u64, _: CallSite) -> Result<i32, AccessError> {
        Err(Self::out_of_bounds(index))
    }

    fn get_double_optimistic(&self, index: u64, _: CallSite) -> Result<f64, AccessError> {
        Err(Self::out_of_bounds(index))
    }

    fn set(self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        let store = Self::first_store(&value);
        debug!(kind = ?store.kind(), index, "allocating store on first write");
        store.set(index, value, strict)
    }

    fn ensure(self: Box<Self>, index: u64) -> StoreResult {
        let store: Store = Box::new(IntStore::new());
        store.ensure(index)
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

    fn shift_right(self: Box<Self>, by: u64) -> StoreResult {
        if by == 0 {
            return Ok(self);
        }
        Ok(allocate(by))
    }

    fn pop(&mut self) -> Value {
        Value::Undefined
    }

    fn slice(&self, _: u64, _: u64) -> Store {
        Box::new(EmptyStore)
    }

    fn convert(self: Box<Self>, _: ElementKind) -> Store {
        self
    }

    fn as_object_array(&self) -> Vec<Value> {
        Vec::new()
    }
}

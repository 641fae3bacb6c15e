//! Numeric stores that can also hold `undefined`

use tracing::debug;

use crate::bits::BitVector;
use crate::data::{ArrayData, CallSite, ElementKind, Store, StoreResult, MAX_DENSE_LENGTH};
use crate::error::AccessError;
use crate::filter::{forward, Wrapper};
use crate::sparse::{exceeds_dense, SparseStore};
use crate::value::Value;

/// Lets a numeric store hold `undefined` without widening to objects.
///
/// Each `undefined` is written to the inner store as `0` and flagged here.
/// Flagged slots are present elements that read as `undefined`.
#[derive(Debug)]
pub struct UndefinedTrackingView {
    inner: Store,
    undefined: BitVector,
}

impl UndefinedTrackingView {
    pub(crate) fn wrap(inner: Store) -> Box<Self> {
        debug!(kind = ?inner.kind(), length = inner.length(), "tracking undefined elements");
        let undefined = BitVector::new(inner.length());
        Box::new(Self { inner, undefined })
    }

    fn is_undefined(&self, index: u64) -> bool {
        self.undefined.is_set(index)
    }

    /// Returns `true` if the inner store would accept a write at `index`.
    fn accepts(&self, index: u64) -> bool {
        let inner = &self.inner;
        !inner.is_frozen()
            && (inner.is_extensible() || inner.has(index))
            && (inner.is_length_writable() || index < inner.length())
    }

    fn sync(&mut self) {
        let length = self.inner.length();
        if self.undefined.len() != length {
            self.undefined.resize(length);
        }
    }
}

impl Wrapper for UndefinedTrackingView {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for UndefinedTrackingView {
    forward!(
        kind,
        length,
        upper_bound,
        is_frozen,
        is_sealed,
        is_extensible,
        is_length_writable,
        has,
        next_index,
        can_delete,
        can_delete_range,
        set_empty,
        convert,
    );

    fn optimistic_kind(&self) -> ElementKind {
        ElementKind::Object
    }

    fn get_int(&self, index: u64) -> i32 {
        if self.is_undefined(index) {
            0
        } else {
            self.inner.get_int(index)
        }
    }

    fn get_double(&self, index: u64) -> f64 {
        if self.is_undefined(index) {
            f64::NAN
        } else {
            self.inner.get_double(index)
        }
    }

    fn get_object(&self, index: u64) -> Value {
        if self.is_undefined(index) {
            Value::Undefined
        } else {
            self.inner.get_object(index)
        }
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        if self.is_undefined(index) {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_int_optimistic(index, site)
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        if self.is_undefined(index) {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_double_optimistic(index, site)
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if exceeds_dense(&*self, index) {
            return SparseStore::promote_for(self, index)?.set(index, value, strict);
        }
        if value.is_undefined() && self.accepts(index) {
            let mut this = self.try_map_inner(|inner| inner.set(index, Value::Int(0), strict))?;
            this.sync();
            this.undefined.set(index);
            return Ok(this);
        }
        self.undefined.clear(index);
        let mut this = self.try_map_inner(|inner| inner.set(index, value, strict))?;
        this.sync();
        Ok(this)
    }

    fn ensure(self: Box<Self>, index: u64) -> StoreResult {
        if exceeds_dense(&*self, index) {
            return SparseStore::promote_for(self, index);
        }
        let mut this = self.try_map_inner(|inner| inner.ensure(index))?;
        this.sync();
        Ok(this)
    }

    fn delete(mut self: Box<Self>, index: u64) -> Store {
        self.undefined.clear(index);
        self.map_inner(|inner| inner.delete(index))
    }

    fn delete_range(mut self: Box<Self>, from: u64, to: u64) -> Store {
        let last = to.min(self.undefined.len().saturating_sub(1));
        for index in from..=last {
            self.undefined.clear(index);
        }
        self.map_inner(|inner| inner.delete_range(from, to))
    }

    fn shrink(self: Box<Self>, new_length: u64) -> Store {
        let mut this = self.map_inner(|inner| inner.shrink(new_length));
        this.sync();
        this
    }

    fn shift_left(self: Box<Self>, by: u64) -> Store {
        let mut this = self.map_inner(|inner| inner.shift_left(by));
        this.undefined.shift_left(by);
        this.sync();
        this
    }

    fn shift_right(self: Box<Self>, by: u64) -> StoreResult {
        let length = self.length();
        if length.saturating_add(by) > MAX_DENSE_LENGTH {
            return SparseStore::promote(self, length).shift_right(by);
        }
        let mut this = self.try_map_inner(|inner| inner.shift_right(by))?;
        this.undefined.shift_right(by);
        this.sync();
        Ok(this)
    }

    fn pop(&mut self) -> Value {
        let length = self.length();
        if length == 0 {
            return Value::Undefined;
        }
        let was_undefined = self.is_undefined(length - 1);
        let value = self.inner.pop();
        self.sync();
        if was_undefined {
            Value::Undefined
        } else {
            value
        }
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = to.min(self.length());
        let sliced = self.inner.slice(from, to);
        let undefined = self.undefined.slice(from, to);
        if !undefined.any() {
            return sliced;
        }
        Box::new(Self {
            inner: sliced,
            undefined,
        })
    }

    fn as_object_array(&self) -> Vec<Value> {
        let mut values = self.inner.as_object_array();
        for (index, value) in values.iter_mut().enumerate() {
            if self.is_undefined(index as u64) {
                *value = Value::Undefined;
            }
        }
        values
    }
}

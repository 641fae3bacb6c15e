//! A view that keeps the length fixed while still accepting writes past it

use std::cmp;
use std::collections::BTreeMap;

use crate::data::{ArrayData, CallSite, Store, StoreResult};
use crate::error::AccessError;
use crate::filter::{forward, Wrapper};
use crate::value::Value;

/// An array whose length is read-only.
///
/// Writes at or past the locked length cannot extend the inner store, so
/// they are kept in `extra_elements` instead. They are visible to reads and
/// iteration but do not count towards the length.
#[derive(Debug)]
pub struct LengthLockedView {
    inner: Store,
    extra_elements: BTreeMap<u64, Value>,
}

impl LengthLockedView {
    pub(crate) fn new(inner: Store) -> Self {
        Self {
            inner,
            extra_elements: BTreeMap::new(),
        }
    }

    fn is_extra(&self, index: u64) -> bool {
        index >= self.inner.length()
    }

    fn out_of_bounds(&self, index: u64) -> AccessError {
        AccessError::OutOfBounds {
            index,
            length: self.inner.length(),
        }
    }

    fn remove_extras(&mut self, from: u64, to: u64) {
        let keys: Vec<u64> = self
            .extra_elements
            .range(from..=to)
            .map(|(&k, _)| k)
            .collect();
        for key in keys {
            self.extra_elements.remove(&key);
        }
    }
}

impl Wrapper for LengthLockedView {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for LengthLockedView {
    forward!(
        kind,
        optimistic_kind,
        length,
        is_frozen,
        is_sealed,
        is_extensible,
        can_delete,
        can_delete_range,
        set_empty,
        convert,
        as_object_array,
    );

    fn set_length(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn upper_bound(&self) -> u64 {
        let last_extra = self.extra_elements.keys().next_back().map_or(0, |&k| k + 1);
        cmp::max(self.inner.upper_bound(), last_extra)
    }

    fn is_length_writable(&self) -> bool {
        false
    }

    fn has(&self, index: u64) -> bool {
        if self.is_extra(index) {
            self.extra_elements.contains_key(&index)
        } else {
            self.inner.has(index)
        }
    }

    fn next_index(&self, index: u64) -> u64 {
        if index + 1 < self.inner.length() {
            return self.inner.next_index(index);
        }
        self.extra_elements
            .range(index + 1..)
            .next()
            .map_or_else(|| self.upper_bound(), |(&k, _)| k)
    }

    fn get_int(&self, index: u64) -> i32 {
        if self.is_extra(index) {
            self.extra_elements.get(&index).map_or(0, Value::to_int32)
        } else {
            self.inner.get_int(index)
        }
    }

    fn get_double(&self, index: u64) -> f64 {
        if self.is_extra(index) {
            self.extra_elements.get(&index).map_or(f64::NAN, Value::to_number)
        } else {
            self.inner.get_double(index)
        }
    }

    fn get_object(&self, index: u64) -> Value {
        if self.is_extra(index) {
            self.extra_elements.get(&index).cloned().unwrap_or_default()
        } else {
            self.inner.get_object(index)
        }
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        if !self.is_extra(index) {
            return self.inner.get_int_optimistic(index, site);
        }
        let value = self
            .extra_elements
            .get(&index)
            .ok_or_else(|| self.out_of_bounds(index))?;
        value
            .as_exact_int()
            .ok_or_else(|| AccessError::deoptimize(value.clone(), site))
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        if !self.is_extra(index) {
            return self.inner.get_double_optimistic(index, site);
        }
        let value = self
            .extra_elements
            .get(&index)
            .ok_or_else(|| self.out_of_bounds(index))?;
        value
            .as_exact_double()
            .ok_or_else(|| AccessError::deoptimize(value.clone(), site))
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if self.is_extra(index) {
            self.extra_elements.insert(index, value);
            return Ok(self);
        }
        Ok(self.try_map_inner(|inner| inner.set(index, value, strict))?)
    }

    fn ensure(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn delete(mut self: Box<Self>, index: u64) -> Store {
        if self.is_extra(index) {
            self.extra_elements.remove(&index);
            return self;
        }
        self.map_inner(|inner| inner.delete(index))
    }

    fn delete_range(mut self: Box<Self>, from: u64, to: u64) -> Store {
        if from > to {
            return self;
        }
        self.remove_extras(from, to);
        let length = self.inner.length();
        if from < length {
            return self.map_inner(|inner| inner.delete_range(from, cmp::min(to, length - 1)));
        }
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
        match self.length().checked_sub(1) {
            Some(last) => self.inner.get_object(last),
            None => Value::Undefined,
        }
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let mut sliced = self.inner.slice(from, to);
        if from >= to {
            return sliced;
        }
        for (&index, value) in self.extra_elements.range(from..to) {
            sliced = match sliced.set(index - from, value.clone(), false) {
                Ok(store) => store,
                Err(e) => e.into_store(),
            };
        }
        sliced
    }
}

//! Sparse storage for arrays too long to keep in one buffer
//!
//! A sparse store keeps the dense store it was promoted from as a prefix and
//! puts every element past that prefix in an ordered map, so iteration visits
//! indices in ascending order and skips the gaps between them.

use std::cmp;
use std::collections::BTreeMap;
use std::mem;

use tracing::debug;

use crate::data::{
    check_index, ArrayData, CallSite, ElementKind, Store, StoreKind, StoreResult, MAX_DENSE_LENGTH,
};
use crate::empty::EmptyStore;
use crate::error::{AccessError, StoreError};
use crate::filter::Wrapper;
use crate::storage::allocate;
use crate::value::Value;

/// Returns `true` if making `index` writable must go through sparse storage
/// rather than growing `store` in place.
pub(crate) fn exceeds_dense(store: &dyn ArrayData, index: u64) -> bool {
    index >= MAX_DENSE_LENGTH && index >= store.length()
}

/// A dense prefix followed by an ordered map of the remaining elements.
#[derive(Debug)]
pub struct SparseStore {
    underlying: Store,
    max_dense_length: u64,
    sparse_map: BTreeMap<u64, Value>,
    length: u64,
}

impl SparseStore {
    pub(crate) fn new(underlying: Store, length: u64) -> Self {
        let underlying_length = underlying.length();
        let max_dense_length = cmp::max(MAX_DENSE_LENGTH, underlying.length());
        Self {
            underlying,
            max_dense_length,
            sparse_map: BTreeMap::new(),
            length: cmp::max(length, underlying_length),
        }
    }

    /// Wraps `underlying` in a sparse store of `length`.
    pub(crate) fn promote(underlying: Store, length: u64) -> Store {
        debug!(
            dense_length = underlying.length(),
            length, "promoting to sparse store"
        );
        Box::new(Self::new(underlying, length))
    }

    /// Promotes `store` so that `index` becomes writable.
    pub(crate) fn promote_for(store: Store, index: u64) -> StoreResult {
        if let Err(e) = check_index(index) {
            return Err(StoreError::new(e, store));
        }
        Ok(Self::promote(store, index + 1))
    }

    /// Number of elements held in the map
    #[must_use]
    pub fn sparse_len(&self) -> usize {
        self.sparse_map.len()
    }

    fn is_dense(&self, index: u64) -> bool {
        index < self.max_dense_length
    }

    fn remove_keys(&mut self, from: u64, to: u64) {
        let keys: Vec<u64> = self.sparse_map.range(from..=to).map(|(&k, _)| k).collect();
        for key in keys {
            self.sparse_map.remove(&key);
        }
    }

    // Every length change goes through here.
    fn write_length(&mut self, length: u64) {
        self.length = length;
    }

    /// Returns `true` if `index` is inside the dense prefix's current length.
    fn in_prefix(&self, index: u64) -> bool {
        self.is_dense(index) && index < self.underlying.length()
    }

    fn read_optimistic<T>(
        &self,
        index: u64,
        site: CallSite,
        exact: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, AccessError> {
        if index >= self.length {
            return Err(AccessError::OutOfBounds {
                index,
                length: self.length,
            });
        }
        let value = self.get_object(index);
        exact(&value).ok_or_else(|| AccessError::deoptimize(value, site))
    }

    fn take_underlying(&mut self) -> Store {
        mem::replace(&mut self.underlying, Box::new(EmptyStore))
    }
}

impl Wrapper for SparseStore {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.underlying
    }
}

impl ArrayData for SparseStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sparse
    }

    fn optimistic_kind(&self) -> ElementKind {
        ElementKind::Object
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn has(&self, index: u64) -> bool {
        if self.is_dense(index) {
            self.underlying.has(index)
        } else {
            self.sparse_map.contains_key(&index)
        }
    }

    fn next_index(&self, index: u64) -> u64 {
        if index + 1 < self.underlying.length() {
            return self.underlying.next_index(index);
        }
        self.sparse_map
            .range(index + 1..)
            .next()
            .map_or(self.length, |(&k, _)| k)
    }

    fn get_int(&self, index: u64) -> i32 {
        if self.is_dense(index) {
            self.underlying.get_int(index)
        } else {
            self.sparse_map.get(&index).map_or(0, Value::to_int32)
        }
    }

    fn get_double(&self, index: u64) -> f64 {
        if self.is_dense(index) {
            self.underlying.get_double(index)
        } else {
            self.sparse_map.get(&index).map_or(f64::NAN, Value::to_number)
        }
    }

    fn get_object(&self, index: u64) -> Value {
        if self.is_dense(index) {
            self.underlying.get_object(index)
        } else {
            self.sparse_map.get(&index).cloned().unwrap_or_default()
        }
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        if self.in_prefix(index) {
            return self.underlying.get_int_optimistic(index, site);
        }
        self.read_optimistic(index, site, Value::as_exact_int)
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        if self.in_prefix(index) {
            return self.underlying.get_double_optimistic(index, site);
        }
        self.read_optimistic(index, site, Value::as_exact_double)
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if self.is_dense(index) {
            let mut this = self.try_map_inner(|u| u.set(index, value, strict))?;
            let length = cmp::max(this.length, this.underlying.length());
            this.write_length(length);
            return Ok(this);
        }
        if let Err(e) = check_index(index) {
            return Err(StoreError::new(e, self));
        }
        self.sparse_map.insert(index, value);
        if index >= self.length {
            self.write_length(index + 1);
        }
        Ok(self)
    }

    fn ensure(mut self: Box<Self>, index: u64) -> StoreResult {
        if let Err(e) = check_index(index) {
            return Err(StoreError::new(e, self));
        }
        if index >= self.length {
            self.write_length(index + 1);
        }
        Ok(self)
    }

    fn delete(mut self: Box<Self>, index: u64) -> Store {
        if self.is_dense(index) {
            if index < self.underlying.length() {
                return self.map_inner(|u| u.delete(index));
            }
        } else {
            self.sparse_map.remove(&index);
        }
        self
    }

    fn delete_range(mut self: Box<Self>, from: u64, to: u64) -> Store {
        if from > to {
            return self;
        }
        if self.is_dense(from) {
            let dense_to = cmp::min(to, self.max_dense_length - 1);
            self = self.map_inner(|u| u.delete_range(from, dense_to));
        }
        self.remove_keys(from, to);
        self
    }

    fn set_empty(&mut self, from: u64, to: u64) {
        self.underlying.set_empty(from, to);
    }

    fn shrink(mut self: Box<Self>, new_length: u64) -> Store {
        if new_length < self.underlying.length() {
            self = self.map_inner(|u| u.shrink(new_length));
            self.sparse_map.clear();
        } else {
            drop(self.sparse_map.split_off(&new_length));
        }
        self.write_length(new_length);
        self
    }

    fn shift_left(mut self: Box<Self>, by: u64) -> Store {
        if by == 0 {
            return self;
        }
        let dense_length = self.underlying.length();
        self = self.map_inner(|u| u.shift_left(by));

        let old_map = mem::take(&mut self.sparse_map);
        let mut underlying = self.take_underlying();
        for (key, value) in old_map {
            if key < by {
                continue;
            }
            let new_key = key - by;
            if new_key < self.max_dense_length {
                // The prefix grows to cover it
                underlying = match underlying.set(new_key, value, false) {
                    Ok(store) => store,
                    Err(e) => e.into_store(),
                };
            } else {
                self.sparse_map.insert(new_key, value);
            }
        }
        self.underlying = underlying;
        let length = self.length.saturating_sub(by);
        self.write_length(length);
        if self.sparse_map.is_empty() && self.underlying.length() == self.length {
            debug!(length = self.length, dense_length, "sparse store fits its dense prefix again");
            return self.take_underlying();
        }
        self
    }

    fn shift_right(mut self: Box<Self>, by: u64) -> StoreResult {
        if by == 0 {
            return Ok(self);
        }
        if let Err(e) = check_index(self.length.saturating_add(by).saturating_sub(1)) {
            return Err(StoreError::new(e, self));
        }
        // Elements that would move past the dense prefix go to the map
        let dense_length = self.underlying.length();
        let keep = self.max_dense_length.saturating_sub(by);
        let mut moved = BTreeMap::new();
        let mut index = keep;
        while index < dense_length {
            if self.underlying.has(index) {
                moved.insert(index + by, self.underlying.get_object(index));
            }
            index = cmp::max(self.underlying.next_index(index), index + 1);
        }
        if keep < dense_length {
            self = self.map_inner(|u| u.shrink(keep));
        }
        // Nothing is left to shift when the whole prefix moved out
        let mut this = if keep == 0 {
            self
        } else {
            self.try_map_inner(|u| u.shift_right(by))?
        };
        let old_map = mem::take(&mut this.sparse_map);
        this.sparse_map = old_map.into_iter().map(|(k, v)| (k + by, v)).collect();
        this.sparse_map.append(&mut moved);
        let length = this.length + by;
        this.write_length(length);
        Ok(this)
    }

    fn pop(&mut self) -> Value {
        if self.length == 0 {
            return Value::Undefined;
        }
        let last = self.length - 1;
        self.write_length(last);
        if last + 1 == self.underlying.length() {
            return self.underlying.pop();
        }
        self.sparse_map.remove(&last).unwrap_or_default()
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = cmp::min(to, self.length);
        let from = cmp::min(from, to);
        if to <= self.underlying.length() {
            return self.underlying.slice(from, to);
        }
        let mut sliced = allocate(to - from);
        let mut index = from;
        while index < to {
            if self.has(index) {
                sliced = match sliced.set(index - from, self.get_object(index), false) {
                    Ok(store) => store,
                    Err(e) => e.into_store(),
                };
            }
            index = cmp::max(self.next_index(index), index + 1);
        }
        sliced
    }

    fn convert(self: Box<Self>, kind: ElementKind) -> Store {
        self.map_inner(|u| u.convert(kind))
    }
}

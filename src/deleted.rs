//! Filters that turn elements of an inner store into holes
//!
//! Deleting never touches the inner store's representation. The common case of
//! one contiguous run of holes is tracked as a range; anything else falls back
//! to one flag per index.

use std::cmp;

use tracing::debug;

use crate::bits::BitVector;
use crate::data::{
    set_past_length, ArrayData, CallSite, ElementKind, Store, StoreResult, MAX_DENSE_LENGTH,
};
use crate::error::AccessError;
use crate::filter::{forward, Wrapper};
use crate::sparse::{exceeds_dense, SparseStore};
use crate::value::Value;

/// Holes in one contiguous run `lo..=hi` of the inner store.
#[derive(Debug)]
pub struct DeletedRangeFilter {
    inner: Store,
    lo: u64,
    hi: u64,
}

impl DeletedRangeFilter {
    /// Wraps `inner` with `lo..=hi` deleted.
    pub(crate) fn wrap(mut inner: Store, lo: u64, hi: u64) -> Store {
        inner.set_empty(lo, hi);
        Box::new(Self { inner, lo, hi })
    }

    fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    fn is_deleted(&self, index: u64) -> bool {
        self.lo <= index && index <= self.hi
    }

    fn into_bits(self: Box<Self>) -> Box<DeletedFilter> {
        let Self { inner, lo, hi } = *self;
        debug!(lo, hi, "switching to per-index deletion flags");
        let mut filter = DeletedFilter::new(inner);
        filter.mark(lo, hi);
        Box::new(filter)
    }

    fn unwrap_if_empty(self: Box<Self>) -> Store {
        if self.is_empty() {
            self.inner
        } else {
            self
        }
    }
}

impl Wrapper for DeletedRangeFilter {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for DeletedRangeFilter {
    forward!(
        kind,
        length,
        is_frozen,
        is_sealed,
        is_extensible,
        is_length_writable,
        can_delete,
        can_delete_range,
        set_empty,
        convert,
    );

    fn optimistic_kind(&self) -> ElementKind {
        ElementKind::Object
    }

    fn has(&self, index: u64) -> bool {
        !self.is_deleted(index) && self.inner.has(index)
    }

    fn next_index(&self, index: u64) -> u64 {
        let next = index + 1;
        if self.is_deleted(next) {
            self.hi + 1
        } else {
            self.inner.next_index(index)
        }
    }

    fn get_int(&self, index: u64) -> i32 {
        if self.is_deleted(index) {
            0
        } else {
            self.inner.get_int(index)
        }
    }

    fn get_double(&self, index: u64) -> f64 {
        if self.is_deleted(index) {
            f64::NAN
        } else {
            self.inner.get_double(index)
        }
    }

    fn get_object(&self, index: u64) -> Value {
        if self.is_deleted(index) {
            Value::Undefined
        } else {
            self.inner.get_object(index)
        }
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        if self.is_deleted(index) && index < self.length() {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_int_optimistic(index, site)
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        if self.is_deleted(index) && index < self.length() {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_double_optimistic(index, site)
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if index > self.length() {
            return set_past_length(self, index, value, strict);
        }
        if self.is_deleted(index) {
            if self.lo < index && index < self.hi {
                return self.into_bits().set(index, value, strict);
            }
            if index == self.lo {
                self.lo += 1;
            } else {
                self.hi -= 1;
            }
            if self.is_empty() {
                return self.inner.set(index, value, strict);
            }
        }
        Ok(self.try_map_inner(|inner| inner.set(index, value, strict))?)
    }

    fn ensure(self: Box<Self>, index: u64) -> StoreResult {
        if exceeds_dense(&*self, index) {
            return SparseStore::promote_for(self, index);
        }
        Ok(self.try_map_inner(|inner| inner.ensure(index))?)
    }

    fn delete(mut self: Box<Self>, index: u64) -> Store {
        if index >= self.length() || self.is_deleted(index) {
            return self;
        }
        if index + 1 == self.lo {
            self.lo = index;
        } else if index == self.hi + 1 {
            self.hi = index;
        } else {
            return self.into_bits().delete(index);
        }
        self.inner.set_empty(index, index);
        self
    }

    fn delete_range(mut self: Box<Self>, from: u64, to: u64) -> Store {
        let length = self.length();
        if from > to || from >= length {
            return self;
        }
        let to = cmp::min(to, length - 1);
        if from > self.hi.saturating_add(1) || to.saturating_add(1) < self.lo {
            return self.into_bits().delete_range(from, to);
        }
        self.lo = cmp::min(self.lo, from);
        self.hi = cmp::max(self.hi, to);
        self.inner.set_empty(self.lo, self.hi);
        self
    }

    fn shrink(mut self: Box<Self>, new_length: u64) -> Store {
        if new_length <= self.lo {
            return self.inner.shrink(new_length);
        }
        self.hi = cmp::min(self.hi, new_length - 1);
        self.map_inner(|inner| inner.shrink(new_length))
    }

    fn shift_left(mut self: Box<Self>, by: u64) -> Store {
        if self.hi < by {
            return self.inner.shift_left(by);
        }
        self.lo = self.lo.saturating_sub(by);
        self.hi -= by;
        self.map_inner(|inner| inner.shift_left(by))
    }

    fn shift_right(self: Box<Self>, by: u64) -> StoreResult {
        let mut this = self.try_map_inner(|inner| inner.shift_right(by))?;
        let length = this.length();
        this.lo = cmp::min(length, this.lo + by);
        this.hi = cmp::min(length.saturating_sub(1), this.hi + by);
        Ok(this.unwrap_if_empty())
    }

    fn pop(&mut self) -> Value {
        let length = self.length();
        if length == 0 {
            return Value::Undefined;
        }
        let last = length - 1;
        let was_deleted = self.is_deleted(last);
        let value = self.inner.pop();
        if self.hi == last {
            if self.lo == last {
                // Leaves an empty range; lo > hi
                self.lo = length;
            } else {
                self.hi -= 1;
            }
        }
        if was_deleted {
            Value::Undefined
        } else {
            value
        }
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = cmp::min(to, self.length());
        let from = cmp::min(from, to);
        let sliced = self.inner.slice(from, to);
        if self.is_empty() || self.hi < from || self.lo >= to {
            return sliced;
        }
        let lo = self.lo.saturating_sub(from);
        let hi = cmp::min(self.hi, to - 1) - from;
        DeletedRangeFilter::wrap(sliced, lo, hi)
    }

    fn as_object_array(&self) -> Vec<Value> {
        let mut values = self.inner.as_object_array();
        for (index, value) in values.iter_mut().enumerate() {
            if self.is_deleted(index as u64) {
                *value = Value::Undefined;
            }
        }
        values
    }
}

/// Holes anywhere in the inner store, one flag per index.
#[derive(Debug)]
pub struct DeletedFilter {
    inner: Store,
    deleted: BitVector,
}

impl DeletedFilter {
    fn new(inner: Store) -> Self {
        let deleted = BitVector::new(inner.length());
        Self { inner, deleted }
    }

    fn mark(&mut self, from: u64, to: u64) {
        self.deleted.set_range(from, to + 1);
        self.inner.set_empty(from, to);
    }

    fn sync(&mut self) {
        let length = self.inner.length();
        if self.deleted.len() != length {
            self.deleted.resize(length);
        }
    }

    fn unwrap_if_empty(self: Box<Self>) -> Store {
        if self.deleted.any() {
            self
        } else {
            self.inner
        }
    }
}

impl Wrapper for DeletedFilter {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for DeletedFilter {
    forward!(
        kind,
        length,
        is_frozen,
        is_sealed,
        is_extensible,
        is_length_writable,
        can_delete,
        can_delete_range,
        set_empty,
        convert,
    );

    fn optimistic_kind(&self) -> ElementKind {
        ElementKind::Object
    }

    fn has(&self, index: u64) -> bool {
        !self.deleted.is_set(index) && self.inner.has(index)
    }

    fn get_int(&self, index: u64) -> i32 {
        if self.deleted.is_set(index) {
            0
        } else {
            self.inner.get_int(index)
        }
    }

    fn get_double(&self, index: u64) -> f64 {
        if self.deleted.is_set(index) {
            f64::NAN
        } else {
            self.inner.get_double(index)
        }
    }

    fn get_object(&self, index: u64) -> Value {
        if self.deleted.is_set(index) {
            Value::Undefined
        } else {
            self.inner.get_object(index)
        }
    }

    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        if self.deleted.is_set(index) {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_int_optimistic(index, site)
    }

    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        if self.deleted.is_set(index) {
            return Err(AccessError::deoptimize(Value::Undefined, site));
        }
        self.inner.get_double_optimistic(index, site)
    }

    fn set(mut self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if index > self.length() {
            return set_past_length(self, index, value, strict);
        }
        self.deleted.clear(index);
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
        if index < self.length() {
            self.mark(index, index);
        }
        self
    }

    fn delete_range(mut self: Box<Self>, from: u64, to: u64) -> Store {
        let length = self.length();
        if from <= to && from < length {
            self.mark(from, cmp::min(to, length - 1));
        }
        self
    }

    fn shrink(self: Box<Self>, new_length: u64) -> Store {
        let mut this = self.map_inner(|inner| inner.shrink(new_length));
        this.sync();
        this.unwrap_if_empty()
    }

    fn shift_left(self: Box<Self>, by: u64) -> Store {
        let mut this = self.map_inner(|inner| inner.shift_left(by));
        this.deleted.shift_left(by);
        this.sync();
        this.unwrap_if_empty()
    }

    fn shift_right(self: Box<Self>, by: u64) -> StoreResult {
        let length = self.length();
        if length.saturating_add(by) > MAX_DENSE_LENGTH {
            return SparseStore::promote(self, length).shift_right(by);
        }
        let mut this = self.try_map_inner(|inner| inner.shift_right(by))?;
        this.deleted.shift_right(by);
        this.sync();
        Ok(this)
    }

    fn pop(&mut self) -> Value {
        let length = self.length();
        if length == 0 {
            return Value::Undefined;
        }
        let was_deleted = self.deleted.is_set(length - 1);
        let value = self.inner.pop();
        self.sync();
        if was_deleted {
            Value::Undefined
        } else {
            value
        }
    }

    fn slice(&self, from: u64, to: u64) -> Store {
        let to = cmp::min(to, self.length());
        let sliced = self.inner.slice(from, to);
        let deleted = self.deleted.slice(from, to);
        if !deleted.any() {
            return sliced;
        }
        Box::new(Self {
            inner: sliced,
            deleted,
        })
    }

    fn as_object_array(&self) -> Vec<Value> {
        let mut values = self.inner.as_object_array();
        for (index, value) in values.iter_mut().enumerate() {
            if self.deleted.is_set(index as u64) {
                *value = Value::Undefined;
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StoreKind;
    use crate::dense::{IntStore, ObjectStore};

    fn ints(n: i32) -> Store {
        Box::new(IntStore::from((0..n).collect::<Vec<_>>()))
    }

    fn holes(store: &dyn ArrayData) -> Vec<u64> {
        (0..store.length()).filter(|&i| !store.has(i)).collect()
    }

    #[mockalloc::test]
    fn tracks_a_range() {
        let x = ints(10).delete(4).delete(5).delete(3);
        assert!(x.is::<DeletedRangeFilter>());
        assert_eq!(holes(&*x), vec![3, 4, 5]);
        assert_eq!(x.length(), 10);
        assert_eq!(x.get_object(4), Value::Undefined);
        assert_eq!(x.get_int(4), 0);
        assert!(x.get_double(4).is_nan());
        assert_eq!(x.get_int(6), 6);
        assert_eq!(x.optimistic_kind(), ElementKind::Object);
        assert_eq!(
            x.get_int_optimistic(4, CallSite(2)),
            Err(AccessError::deoptimize(Value::Undefined, CallSite(2)))
        );
    }

    #[mockalloc::test]
    fn skips_the_range_when_iterating() {
        let x = ints(10).delete_range(2, 6);
        assert_eq!(x.next_index(0), 1);
        assert_eq!(x.next_index(1), 7);
        assert_eq!(x.next_index(7), 8);
    }

    #[mockalloc::test]
    fn switches_to_flags() {
        let x = ints(10).delete(2).delete(7);
        assert!(x.is::<DeletedFilter>());
        assert_eq!(holes(&*x), vec![2, 7]);

        let x = ints(10).delete_range(2, 6);
        let x = x.set(4, Value::Int(40), false).unwrap();
        assert!(x.is::<DeletedFilter>());
        assert_eq!(holes(&*x), vec![2, 3, 5, 6]);
        assert_eq!(x.get_int(4), 40);
    }

    #[mockalloc::test]
    fn narrows_on_edge_writes() {
        let x = ints(10).delete_range(2, 4);
        let x = x.set(2, Value::Int(20), false).unwrap();
        let x = x.set(4, Value::Int(40), false).unwrap();
        assert!(x.is::<DeletedRangeFilter>());
        assert_eq!(holes(&*x), vec![3]);
        let x = x.set(3, Value::Int(30), false).unwrap();
        assert!(x.is::<IntStore>());
        assert_eq!(x.get_int(3), 30);
    }

    #[mockalloc::test]
    fn extends_holes_past_length() {
        let x = ints(3).delete(2);
        let x = x.set(6, Value::Int(6), false).unwrap();
        assert_eq!(x.length(), 7);
        assert_eq!(holes(&*x), vec![2, 3, 4, 5]);
        assert!(x.is::<DeletedRangeFilter>());

        let x = ints(5).delete(1);
        let x = x.set(7, Value::Int(7), false).unwrap();
        assert_eq!(holes(&*x), vec![1, 5, 6]);
    }

    #[mockalloc::test]
    fn unwraps_when_shrunk() {
        let x = ints(10).delete_range(5, 7);
        let x = x.shrink(6);
        assert_eq!(holes(&*x), vec![5]);
        let x = x.shrink(5);
        assert!(x.is::<IntStore>());

        let x = ints(10).delete(2).delete(7).shrink(5);
        assert!(x.is::<DeletedFilter>());
        let x = x.shrink(2);
        assert!(x.is::<IntStore>());
    }

    #[mockalloc::test]
    fn shifts_the_range() {
        let x = ints(10).delete_range(3, 4);
        let x = x.shift_left(2);
        assert_eq!(x.length(), 8);
        assert_eq!(holes(&*x), vec![1, 2]);
        let x = x.shift_right(3).unwrap();
        assert_eq!(holes(&*x), vec![4, 5]);
        let x = x.shift_left(6);
        assert!(x.is::<IntStore>());
        assert_eq!(x.get_int(0), 5);
    }

    #[mockalloc::test]
    fn shifts_the_flags() {
        let x = ints(10).delete(1).delete(8);
        let x = x.shift_right(2).unwrap();
        assert_eq!(holes(&*x), vec![3, 10]);
        let x = x.shift_left(4);
        assert_eq!(holes(&*x), vec![6]);
        let x = x.shift_left(7);
        assert!(x.is::<IntStore>());
    }

    #[mockalloc::test]
    fn pops_holes_as_undefined() {
        let mut x = ints(4).delete(3);
        assert_eq!(x.pop(), Value::Undefined);
        assert_eq!(x.pop(), Value::Int(2));
        assert_eq!(x.length(), 2);
        assert!(!x.has(2));

        let mut y = ints(6).delete(1).delete(5);
        assert_eq!(y.pop(), Value::Undefined);
        assert_eq!(y.pop(), Value::Int(4));
        assert_eq!(holes(&*y), vec![1]);
    }

    #[mockalloc::test]
    fn slices_keep_holes() {
        let x = ints(10).delete_range(3, 5);
        let y = x.slice(4, 8);
        assert_eq!(y.length(), 4);
        assert_eq!(holes(&*y), vec![0, 1]);
        let z = x.slice(6, 10);
        assert!(z.is::<IntStore>());

        let x = ints(10).delete(2).delete(7);
        let y = x.slice(5, 9);
        assert_eq!(holes(&*y), vec![2]);
    }

    #[mockalloc::test]
    fn releases_object_slots() {
        let x: Store = Box::new(ObjectStore::from(vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c"),
        ]));
        let x = x.delete(1);
        let x = x.set(1, Value::from("d"), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Object);
        assert_eq!(
            x.as_object_array(),
            vec![Value::from("a"), Value::from("d"), Value::from("c")]
        );
    }

    #[mockalloc::test]
    fn promotes_instead_of_growing() {
        let x = ints(4).delete(1);
        let x = x.set(MAX_DENSE_LENGTH + 5, Value::Int(1), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Sparse);
        assert!(!x.has(1));
        assert!(!x.has(4));
        assert!(x.has(3));
        assert!(x.has(MAX_DENSE_LENGTH + 5));
    }

    #[mockalloc::test]
    fn grows_through_set_length() {
        let x = ints(4).delete(1);
        let x = x.set_length(7).unwrap();
        assert_eq!(x.length(), 7);
        assert_eq!(holes(&*x), vec![1, 4, 5, 6]);

        let x = ints(6).delete(1).delete(4).set_length(8).unwrap();
        assert!(x.is::<DeletedFilter>());
        assert_eq!(holes(&*x), vec![1, 4, 6, 7]);
        let x = x.set_length(2).unwrap();
        assert_eq!(holes(&*x), vec![1]);
    }

    #[mockalloc::test]
    fn shifts_past_the_dense_limit() {
        let by = MAX_DENSE_LENGTH + 1;
        let cases = [
            (ints(4).delete(1), vec![by + 1]),
            (ints(4).delete(0).delete(2), vec![by, by + 2]),
        ];
        for (x, expected) in cases {
            let x = x.shift_right(by).unwrap();
            assert_eq!(x.kind(), StoreKind::Sparse);
            assert_eq!(x.length(), by + 4);
            assert!(!x.has(0));
            let shifted: Vec<u64> = (by..by + 4).filter(|&i| !x.has(i)).collect();
            assert_eq!(shifted, expected);
            assert_eq!(x.get_object(by + 3), Value::Int(3));
        }
    }
}

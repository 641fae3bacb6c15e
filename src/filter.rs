//! Delegation shared by every store that wraps another store

use std::mem;

use crate::data::{ArrayData, Store, StoreResult};
use crate::empty::EmptyStore;
use crate::error::StoreError;

/// A store layered over an `inner` store.
pub(crate) trait Wrapper: ArrayData + Sized {
    fn inner_mut(&mut self) -> &mut Store;

    /// Replaces the inner store with the result of `f`.
    fn map_inner(mut self: Box<Self>, f: impl FnOnce(Store) -> Store) -> Box<Self> {
        let inner = mem::replace(self.inner_mut(), Box::new(EmptyStore));
        *self.inner_mut() = f(inner);
        self
    }

    /// Replaces the inner store with the result of `f`. On failure the inner
    /// store handed back by `f` is reinstalled and the error carries `self`.
    fn try_map_inner(
        mut self: Box<Self>,
        f: impl FnOnce(Store) -> StoreResult,
    ) -> Result<Box<Self>, StoreError> {
        let inner = mem::replace(self.inner_mut(), Box::new(EmptyStore));
        match f(inner) {
            Ok(inner) => {
                *self.inner_mut() = inner;
                Ok(self)
            }
            Err(e) => {
                let (error, inner) = e.into_parts();
                *self.inner_mut() = inner;
                Err(StoreError::new(error, self))
            }
        }
    }
}

/// Implements [`ArrayData`] methods by forwarding them to `self.inner`.
macro_rules! forward {
    (kind) => {
        fn kind(&self) -> $crate::data::StoreKind {
            self.inner.kind()
        }
    };
    (optimistic_kind) => {
        fn optimistic_kind(&self) -> $crate::data::ElementKind {
            self.inner.optimistic_kind()
        }
    };
    (length) => {
        fn length(&self) -> u64 {
            self.inner.length()
        }
    };
    (upper_bound) => {
        fn upper_bound(&self) -> u64 {
            self.inner.upper_bound()
        }
    };
    (is_frozen) => {
        fn is_frozen(&self) -> bool {
            self.inner.is_frozen()
        }
    };
    (is_sealed) => {
        fn is_sealed(&self) -> bool {
            self.inner.is_sealed()
        }
    };
    (is_extensible) => {
        fn is_extensible(&self) -> bool {
            self.inner.is_extensible()
        }
    };
    (is_length_writable) => {
        fn is_length_writable(&self) -> bool {
            self.inner.is_length_writable()
        }
    };
    (has) => {
        fn has(&self, index: u64) -> bool {
            self.inner.has(index)
        }
    };
    (next_index) => {
        fn next_index(&self, index: u64) -> u64 {
            self.inner.next_index(index)
        }
    };
    (get_int) => {
        fn get_int(&self, index: u64) -> i32 {
            self.inner.get_int(index)
        }
    };
    (get_double) => {
        fn get_double(&self, index: u64) -> f64 {
            self.inner.get_double(index)
        }
    };
    (get_object) => {
        fn get_object(&self, index: u64) -> $crate::value::Value {
            self.inner.get_object(index)
        }
    };
    (get_int_optimistic) => {
        fn get_int_optimistic(
            &self,
            index: u64,
            site: $crate::data::CallSite,
        ) -> Result<i32, $crate::error::AccessError> {
            self.inner.get_int_optimistic(index, site)
        }
    };
    (get_double_optimistic) => {
        fn get_double_optimistic(
            &self,
            index: u64,
            site: $crate::data::CallSite,
        ) -> Result<f64, $crate::error::AccessError> {
            self.inner.get_double_optimistic(index, site)
        }
    };
    (set) => {
        fn set(
            self: Box<Self>,
            index: u64,
            value: $crate::value::Value,
            strict: bool,
        ) -> $crate::data::StoreResult {
            Ok(<Self as $crate::filter::Wrapper>::try_map_inner(self, |inner| {
                inner.set(index, value, strict)
            })?)
        }
    };
    (ensure) => {
        fn ensure(self: Box<Self>, index: u64) -> $crate::data::StoreResult {
            Ok(<Self as $crate::filter::Wrapper>::try_map_inner(self, |inner| {
                inner.ensure(index)
            })?)
        }
    };
    (can_delete) => {
        fn can_delete(&self, index: u64, strict: bool) -> Result<bool, $crate::error::ArrayError> {
            self.inner.can_delete(index, strict)
        }
    };
    (can_delete_range) => {
        fn can_delete_range(
            &self,
            from: u64,
            to: u64,
            strict: bool,
        ) -> Result<bool, $crate::error::ArrayError> {
            self.inner.can_delete_range(from, to, strict)
        }
    };
    (delete) => {
        fn delete(self: Box<Self>, index: u64) -> $crate::data::Store {
            <Self as $crate::filter::Wrapper>::map_inner(self, |inner| inner.delete(index))
        }
    };
    (delete_range) => {
        fn delete_range(self: Box<Self>, from: u64, to: u64) -> $crate::data::Store {
            <Self as $crate::filter::Wrapper>::map_inner(self, |inner| {
                inner.delete_range(from, to)
            })
        }
    };
    (set_empty) => {
        fn set_empty(&mut self, from: u64, to: u64) {
            self.inner.set_empty(from, to)
        }
    };
    (shrink) => {
        fn shrink(self: Box<Self>, new_length: u64) -> $crate::data::Store {
            <Self as $crate::filter::Wrapper>::map_inner(self, |inner| inner.shrink(new_length))
        }
    };
    (shift_left) => {
        fn shift_left(self: Box<Self>, by: u64) -> $crate::data::Store {
            <Self as $crate::filter::Wrapper>::map_inner(self, |inner| inner.shift_left(by))
        }
    };
    (shift_right) => {
        fn shift_right(self: Box<Self>, by: u64) -> $crate::data::StoreResult {
            Ok(<Self as $crate::filter::Wrapper>::try_map_inner(self, |inner| {
                inner.shift_right(by)
            })?)
        }
    };
    (pop) => {
        fn pop(&mut self) -> $crate::value::Value {
            self.inner.pop()
        }
    };
    (slice) => {
        fn slice(&self, from: u64, to: u64) -> $crate::data::Store {
            self.inner.slice(from, to)
        }
    };
    (convert) => {
        fn convert(self: Box<Self>, kind: $crate::data::ElementKind) -> $crate::data::Store {
            <Self as $crate::filter::Wrapper>::map_inner(self, |inner| inner.convert(kind))
        }
    };
    (as_object_array) => {
        fn as_object_array(&self) -> Vec<$crate::value::Value> {
            self.inner.as_object_array()
        }
    };
    ($($name:ident),+ $(,)?) => {
        $($crate::filter::forward!($name);)+
    };
}

pub(crate) use forward;

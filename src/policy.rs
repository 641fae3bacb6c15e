//! Views enforcing the integrity levels of an array
//!
//! [`NonExtensibleView`] refuses new indices, [`SealedView`] additionally
//! refuses deleting occupied indices and [`FrozenView`] refuses every change.
//! Refusals are silent unless the caller is strict.

use tracing::trace;

use crate::data::{ArrayData, ElementKind, Store, StoreResult};
use crate::error::{ArrayError, StoreError};
use crate::filter::{forward, Wrapper};
use crate::value::Value;

/// The lowest occupied index in `from..=to`.
fn first_occupied(store: &dyn ArrayData, from: u64, to: u64) -> Option<u64> {
    let end = to.min(store.upper_bound().saturating_sub(1));
    let mut index = from;
    while index <= end {
        if store.has(index) {
            return Some(index);
        }
        index = store.next_index(index).max(index + 1);
    }
    None
}

/// The highest occupied index in `from..to`.
fn last_occupied(store: &dyn ArrayData, from: u64, to: u64) -> Option<u64> {
    let mut last = None;
    let mut index = from;
    while index < to {
        if store.has(index) {
            last = Some(index);
        }
        index = store.next_index(index).max(index + 1);
    }
    last
}

fn refuse_delete(store: &dyn ArrayData, from: u64, to: u64, strict: bool) -> Result<bool, ArrayError> {
    match first_occupied(store, from, to) {
        None => Ok(true),
        Some(index) if strict => Err(ArrayError::NotConfigurable { index, array: None }),
        Some(index) => {
            trace!(index, "refusing to delete non-configurable element");
            Ok(false)
        }
    }
}

/// Refuses a write to an unoccupied index of a non-extensible array.
fn refuse_new_index<S: ArrayData>(store: Box<S>, index: u64, strict: bool) -> StoreResult {
    if strict {
        return Err(StoreError::new(
            ArrayError::NonExtensible { index, array: None },
            store,
        ));
    }
    trace!(index, "ignoring write to non-extensible array");
    Ok(store)
}

/// Makes `index` writable by adding holes only.
fn grow_with_holes<W: Wrapper>(this: Box<W>, index: u64) -> StoreResult {
    let old_length = this.length();
    if index < old_length {
        return Ok(this);
    }
    let this = this.try_map_inner(|inner| inner.ensure(index))?;
    Ok(this.map_inner(|inner| inner.delete_range(old_length, index)))
}

/// An array that may not gain new indices.
#[derive(Debug)]
pub struct NonExtensibleView {
    inner: Store,
}

impl NonExtensibleView {
    pub(crate) fn new(inner: Store) -> Self {
        Self { inner }
    }
}

impl Wrapper for NonExtensibleView {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for NonExtensibleView {
    forward!(
        kind,
        optimistic_kind,
        length,
        upper_bound,
        is_frozen,
        is_sealed,
        is_length_writable,
        has,
        next_index,
        get_int,
        get_double,
        get_object,
        get_int_optimistic,
        get_double_optimistic,
        can_delete,
        can_delete_range,
        delete,
        delete_range,
        set_empty,
        shrink,
        shift_left,
        shift_right,
        pop,
        slice,
        convert,
        as_object_array,
    );

    fn is_extensible(&self) -> bool {
        false
    }

    fn set(self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if !self.inner.has(index) {
            return refuse_new_index(self, index, strict);
        }
        Ok(self.try_map_inner(|inner| inner.set(index, value, strict))?)
    }

    fn ensure(self: Box<Self>, index: u64) -> StoreResult {
        grow_with_holes(self, index)
    }
}

/// An array that may neither gain indices nor lose occupied ones.
#[derive(Debug)]
pub struct SealedView {
    inner: Store,
}

impl SealedView {
    pub(crate) fn new(inner: Store) -> Self {
        Self { inner }
    }
}

impl Wrapper for SealedView {
    fn inner_mut(&mut self) -> &mut Store {
        &mut self.inner
    }
}

impl ArrayData for SealedView {
    forward!(
        kind,
        optimistic_kind,
        length,
        upper_bound,
        is_frozen,
        is_length_writable,
        has,
        next_index,
        get_int,
        get_double,
        get_object,
        get_int_optimistic,
        get_double_optimistic,
        set_empty,
        slice,
        convert,
        as_object_array,
    );

    fn is_sealed(&self) -> bool {
        true
    }

    fn is_extensible(&self) -> bool {
        false
    }

    fn set(self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult {
        if !self.inner.has(index) {
            return refuse_new_index(self, index, strict);
        }
        Ok(self.try_map_inner(|inner| inner.set(index, value, strict))?)
    }

    fn ensure(self: Box<Self>, index: u64) -> StoreResult {
        grow_with_holes(self, index)
    }

    fn can_delete(&self, index: u64, strict: bool) -> Result<bool, ArrayError> {
        refuse_delete(&*self.inner, index, index, strict)
    }

    fn can_delete_range(&self, from: u64, to: u64, strict: bool) -> Result<bool, ArrayError> {
        refuse_delete(&*self.inner, from, to, strict)
    }

    fn delete(self: Box<Self>, index: u64) -> Store {
        self.delete_range(index, index)
    }

    fn delete_range(self: Box<Self>, from: u64, to: u64) -> Store {
        if first_occupied(&*self.inner, from, to).is_some() {
            trace!(from, to, "ignoring delete on sealed array");
            return self;
        }
        self.map_inner(|inner| inner.delete_range(from, to))
    }

    fn shrink(self: Box<Self>, new_length: u64) -> Store {
        let length = self.length();
        let floor = last_occupied(&*self.inner, new_length, length).map_or(new_length, |i| i + 1);
        self.map_inner(|inner| inner.shrink(floor))
    }

    fn shift_left(self: Box<Self>, _: u64) -> Store {
        self
    }

    fn shift_right(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn pop(&mut self) -> Value {
        let length = self.length();
        if length == 0 {
            return Value::Undefined;
        }
        if self.inner.has(length - 1) {
            return self.inner.get_object(length - 1);
        }
        self.inner.pop()
    }
}

/// An array whose elements and length are read-only.
#[derive(Debug)]
pub struct FrozenView {
    inner: Store,
}

impl FrozenView {
    pub(crate) fn new(inner: Store) -> Self {
        Self { inner }
    }
}

impl ArrayData for FrozenView {
    forward!(
        kind,
        optimistic_kind,
        length,
        upper_bound,
        has,
        next_index,
        get_int,
        get_double,
        get_object,
        get_int_optimistic,
        get_double_optimistic,
        slice,
        as_object_array,
    );

    fn is_frozen(&self) -> bool {
        true
    }

    fn is_sealed(&self) -> bool {
        true
    }

    fn is_extensible(&self) -> bool {
        false
    }

    fn is_length_writable(&self) -> bool {
        false
    }

    fn set_length(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn set(self: Box<Self>, index: u64, _: Value, strict: bool) -> StoreResult {
        if strict {
            return Err(StoreError::new(
                ArrayError::ReadOnly { index, array: None },
                self,
            ));
        }
        trace!(index, "ignoring write to frozen array");
        Ok(self)
    }

    fn ensure(self: Box<Self>, _: u64) -> StoreResult {
        Ok(self)
    }

    fn can_delete(&self, index: u64, strict: bool) -> Result<bool, ArrayError> {
        refuse_delete(&*self.inner, index, index, strict)
    }

    fn can_delete_range(&self, from: u64, to: u64, strict: bool) -> Result<bool, ArrayError> {
        refuse_delete(&*self.inner, from, to, strict)
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
        match self.length().checked_sub(1) {
            Some(last) => self.inner.get_object(last),
            None => Value::Undefined,
        }
    }

    fn convert(self: Box<Self>, _: ElementKind) -> Store {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StoreKind;
    use crate::dense::IntStore;

    fn ints(elements: Vec<i32>) -> Store {
        Box::new(IntStore::from(elements))
    }

    #[mockalloc::test]
    fn frozen_ignores_changes() {
        let x: Store = Box::new(FrozenView::new(ints(vec![1, 2])));
        assert!(x.is_frozen() && x.is_sealed());
        assert!(!x.is_extensible() && !x.is_length_writable());

        let x = x.set(0, Value::Int(9), false).unwrap();
        let x = x.push(Value::Int(3), false).unwrap();
        let x = x.delete(1).shrink(0).shift_left(1).shift_right(1).unwrap();
        let x = x.set_length(0).unwrap().set_length(9).unwrap();
        let mut x = x.ensure(10).unwrap();
        assert_eq!(x.pop(), Value::Int(2));
        assert_eq!(x.length(), 2);
        assert_eq!(x.as_object_array(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(x.get_object(2), Value::Undefined);
    }

    #[mockalloc::test]
    fn frozen_rejects_strict_writes() {
        let x: Store = Box::new(FrozenView::new(ints(vec![1])));
        let e = x.set(0, Value::Int(2), true).unwrap_err();
        assert_eq!(
            e.error(),
            &ArrayError::ReadOnly {
                index: 0,
                array: None
            }
        );
        let x = e.into_store();
        assert_eq!(x.get_int(0), 1);
        assert_eq!(x.can_delete(0, false), Ok(false));
        assert!(x.can_delete(0, true).is_err());
        assert_eq!(x.can_delete(4, true), Ok(true));
    }

    #[mockalloc::test]
    fn frozen_slice_is_writable() {
        let x: Store = Box::new(FrozenView::new(ints(vec![1, 2, 3])));
        let y = x.slice(1, 3);
        assert!(!y.is_frozen());
        let y = y.set(0, Value::Int(7), false).unwrap();
        assert_eq!(y.get_int(0), 7);
    }

    #[mockalloc::test]
    fn sealed_keeps_indices() {
        let x: Store = Box::new(SealedView::new(ints(vec![1, 2, 3])));
        assert!(x.is_sealed() && !x.is_frozen());
        let x = x.set(1, Value::Double(2.5), false).unwrap();
        assert_eq!(x.kind(), StoreKind::Double);
        assert_eq!(x.get_double(1), 2.5);

        let x = x.set(3, Value::Int(4), false).unwrap();
        assert_eq!(x.length(), 3);
        let e = x.set(3, Value::Int(4), true).unwrap_err();
        assert!(matches!(e.error(), ArrayError::NonExtensible { index: 3, .. }));
        let x = e.into_store();

        assert_eq!(x.can_delete(0, false), Ok(false));
        assert!(matches!(
            x.can_delete_range(0, 2, true),
            Err(ArrayError::NotConfigurable { index: 0, .. })
        ));
        let x = x.delete(0);
        assert!(x.has(0));
    }

    #[mockalloc::test]
    fn sealed_length_changes() {
        let x: Store = Box::new(SealedView::new(ints(vec![1, 2, 3])));
        let x = x.ensure(5).unwrap();
        assert_eq!(x.length(), 6);
        assert!(!x.has(3));
        assert!(!x.has(5));
        assert_eq!(x.can_delete_range(3, 5, true), Ok(true));

        let x = x.shrink(1);
        assert_eq!(x.length(), 3);
        let x = x.set_length(2).unwrap();
        assert_eq!(x.length(), 3);
        let x = x.set_length(5).unwrap();
        assert_eq!(x.length(), 5);
        assert!(!x.has(4));
        let mut x = x.shrink(3);
        assert_eq!(x.pop(), Value::Int(3));
        assert_eq!(x.length(), 3);
    }

    #[mockalloc::test]
    fn non_extensible_refuses_new_indices() {
        let x: Store = Box::new(NonExtensibleView::new(ints(vec![1, 2])));
        assert!(!x.is_extensible() && !x.is_sealed());
        let x = x.set(0, Value::from("a"), false).unwrap();
        assert_eq!(x.get_object(0), Value::from("a"));
        let x = x.push(Value::Int(3), false).unwrap();
        assert_eq!(x.length(), 2);
        let e = x.push(Value::Int(3), true).unwrap_err();
        assert_eq!(
            e.error(),
            &ArrayError::NonExtensible {
                index: 2,
                array: None
            }
        );

        let x = e.into_store().delete(1);
        assert!(!x.has(1));
        let x = x.set(1, Value::Int(5), false).unwrap();
        assert!(!x.has(1));
        let mut x = x.ensure(3).unwrap();
        assert_eq!(x.length(), 4);
        assert!(!x.has(3));
        assert_eq!(x.pop(), Value::Undefined);
        assert_eq!(x.length(), 3);
    }
}

//! Guarded fast paths for stores backed by one flat buffer
//!
//! A compiled call site asks a store for an accessor once, then keeps using it
//! for as long as the accessor's guard holds. The guard is the exact concrete
//! type of the store it was created for: once a write widens or wraps the
//! store, the guard fails and the caller re-links through the generic
//! [`ArrayData`] operations.

use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};

use crate::data::{ArrayData, CallSite, ElementKind, Store};
use crate::error::AccessError;
use crate::value::Value;

/// A store with a single type-homogeneous buffer and no holes.
pub trait ContinuousArrayData: ArrayData {
    /// Number of elements the buffer holds without reallocating
    fn capacity(&self) -> u64;

    /// Returns `true` if `index` can be written without reallocating: it is
    /// inside the buffer and does not leave a gap after the last element.
    fn has_room_for(&self, index: u64) -> bool {
        index < self.capacity() && index <= self.length()
    }

    /// The element type of the buffer
    fn element_kind(&self) -> ElementKind;

    /// Appends `value` if it fits the buffer's element type, returning the
    /// new length.
    fn fast_push(&mut self, value: &Value) -> Result<u64, AccessError>;

    /// Removes and returns the last element.
    fn fast_pop(&mut self) -> Result<Value, AccessError>;

    /// Concatenates two continuous stores into a new one of the wider kind.
    fn fast_concat(&self, other: &dyn ContinuousArrayData) -> Option<Store>;

    /// Removes `removed` elements at `start` and opens `added` filler slots in
    /// their place. Returns the removed elements as a new store.
    fn fast_splice(&mut self, start: u64, removed: u64, added: u64)
        -> Result<Store, AccessError>;

    /// An accessor reading exact `i32` elements
    fn int_getter(&self, site: CallSite) -> Option<ElementGetter<i32>>;

    /// An accessor reading numeric elements
    fn double_getter(&self, site: CallSite) -> Option<ElementGetter<f64>>;

    /// An accessor reading any element
    fn object_getter(&self, site: CallSite) -> Option<ElementGetter<Value>>;

    /// An accessor writing `i32` elements in place
    fn int_setter(&self) -> Option<ElementSetter<i32>>;

    /// An accessor writing `f64` elements in place
    fn double_setter(&self) -> Option<ElementSetter<f64>>;

    /// An accessor writing any element in place
    fn object_setter(&self) -> Option<ElementSetter<Value>>;
}

type ReadFn<T> = fn(&dyn Any, u64, CallSite) -> Result<T, AccessError>;
type WriteFn<T> = fn(&mut dyn Any, u64, T) -> Result<(), AccessError>;

/// A guarded, specialized element reader.
pub struct ElementGetter<T> {
    guard: TypeId,
    site: CallSite,
    read: ReadFn<T>,
}

impl<T> ElementGetter<T> {
    pub(crate) fn new<S: ArrayData>(site: CallSite, read: ReadFn<T>) -> Self {
        Self {
            guard: TypeId::of::<S>(),
            site,
            read,
        }
    }

    /// The call site this accessor was linked for
    #[must_use]
    pub fn site(&self) -> CallSite {
        self.site
    }

    /// Returns `true` if `store` still has the representation this accessor
    /// was created for.
    #[must_use]
    pub fn applies_to(&self, store: &dyn ArrayData) -> bool {
        store.as_any().type_id() == self.guard
    }

    /// Reads the element at `index`.
    pub fn get(&self, store: &dyn ArrayData, index: u64) -> Result<T, AccessError> {
        if !self.applies_to(store) {
            return Err(AccessError::GuardFailed);
        }
        (self.read)(store.as_any(), index, self.site)
    }
}

impl<T> Clone for ElementGetter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ElementGetter<T> {}

impl<T> Debug for ElementGetter<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementGetter")
            .field("element", &std::any::type_name::<T>())
            .field("site", &self.site)
            .finish()
    }
}

/// A guarded, specialized element writer. Writes only where the store has
/// room, otherwise the caller takes the generic path.
pub struct ElementSetter<T> {
    guard: TypeId,
    write: WriteFn<T>,
}

impl<T> ElementSetter<T> {
    pub(crate) fn new<S: ArrayData>(write: WriteFn<T>) -> Self {
        Self {
            guard: TypeId::of::<S>(),
            write,
        }
    }

    /// Returns `true` if `store` still has the representation this accessor
    /// was created for.
    #[must_use]
    pub fn applies_to(&self, store: &dyn ArrayData) -> bool {
        store.as_any().type_id() == self.guard
    }

    /// Writes `value` at `index`.
    pub fn set(&self, store: &mut dyn ArrayData, index: u64, value: T) -> Result<(), AccessError> {
        if !self.applies_to(store) {
            return Err(AccessError::GuardFailed);
        }
        (self.write)(store.as_any_mut(), index, value)
    }
}

impl<T> Clone for ElementSetter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ElementSetter<T> {}

impl<T> Debug for ElementSetter<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSetter")
            .field("element", &std::any::type_name::<T>())
            .finish()
    }
}

fn downcast<S: ArrayData>(store: &dyn Any) -> Result<&S, AccessError> {
    store.downcast_ref::<S>().ok_or(AccessError::GuardFailed)
}

fn check_bounds(store: &dyn ArrayData, index: u64) -> Result<(), AccessError> {
    if index < store.length() {
        Ok(())
    } else {
        Err(AccessError::OutOfBounds {
            index,
            length: store.length(),
        })
    }
}

pub(crate) fn read_int<S: ArrayData>(store: &dyn Any, index: u64, site: CallSite) -> Result<i32, AccessError> {
    downcast::<S>(store)?.get_int_optimistic(index, site)
}

pub(crate) fn read_double<S: ArrayData>(store: &dyn Any, index: u64, site: CallSite) -> Result<f64, AccessError> {
    downcast::<S>(store)?.get_double_optimistic(index, site)
}

pub(crate) fn read_object<S: ArrayData>(store: &dyn Any, index: u64, _: CallSite) -> Result<Value, AccessError> {
    let store = downcast::<S>(store)?;
    check_bounds(store, index)?;
    Ok(store.get_object(index))
}

/// Element types with a specialized accessor.
pub trait Element: Sized + 'static {
    /// Asks `store` for a reader of this element type
    fn getter(store: &dyn ContinuousArrayData, site: CallSite) -> Option<ElementGetter<Self>>;
    /// Asks `store` for a writer of this element type
    fn setter(store: &dyn ContinuousArrayData) -> Option<ElementSetter<Self>>;
}

impl Element for i32 {
    fn getter(store: &dyn ContinuousArrayData, site: CallSite) -> Option<ElementGetter<Self>> {
        store.int_getter(site)
    }
    fn setter(store: &dyn ContinuousArrayData) -> Option<ElementSetter<Self>> {
        store.int_setter()
    }
}

impl Element for f64 {
    fn getter(store: &dyn ContinuousArrayData, site: CallSite) -> Option<ElementGetter<Self>> {
        store.double_getter(site)
    }
    fn setter(store: &dyn ContinuousArrayData) -> Option<ElementSetter<Self>> {
        store.double_setter()
    }
}

impl Element for Value {
    fn getter(store: &dyn ContinuousArrayData, site: CallSite) -> Option<ElementGetter<Self>> {
        store.object_getter(site)
    }
    fn setter(store: &dyn ContinuousArrayData) -> Option<ElementSetter<Self>> {
        store.object_setter()
    }
}

/// Returns a reader for `T` elements of `store`, if its representation offers
/// one. `None` means the caller must use the generic getters.
pub fn element_getter<T: Element>(store: &dyn ArrayData, site: CallSite) -> Option<ElementGetter<T>> {
    T::getter(store.as_continuous()?, site)
}

/// Returns a writer for `T` elements of `store`, if its representation offers
/// one. `None` means the caller must use the generic setter.
pub fn element_setter<T: Element>(store: &dyn ArrayData) -> Option<ElementSetter<T>> {
    T::setter(store.as_continuous()?)
}

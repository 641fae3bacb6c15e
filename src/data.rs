//! The backing-store contract shared by every array representation
//!
//! A store is always handled through a [`Store`] box. Operations that may
//! change the representation consume the box and return the store to use from
//! then on, which is frequently the same allocation. Callers must reinstall
//! whatever is returned.

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};

use crate::continuous::ContinuousArrayData;
use crate::error::{AccessError, ArrayError, StoreError};
use crate::typed::TypedKind;
use crate::value::Value;

/// Writes at or beyond this index turn a dense store into a sparse one.
pub const MAX_DENSE_LENGTH: u64 = 1 << 20;

/// The largest length an array-like object may report (2^53 - 1).
pub const MAX_LENGTH: u64 = (1 << 53) - 1;

/// An owned, type-erased backing store.
pub type Store = Box<dyn ArrayData>;

/// The outcome of an operation that may replace the store.
pub type StoreResult = Result<Store, StoreError>;

/// Opaque identity of the program point that requested an access.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CallSite(pub u32);

impl Display for CallSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "site#{}", self.0)
    }
}

/// The kind of element a store hands out without boxing. Ordered by width,
/// so the wider of two kinds is their maximum.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum ElementKind {
    /// 32-bit integers
    Int,
    /// Doubles
    Double,
    /// Arbitrary values
    Object,
}

impl ElementKind {
    /// The narrowest kind able to hold `value`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Int(_) => Self::Int,
            Value::Double(_) if value.as_exact_int().is_some() => Self::Int,
            Value::Double(_) => Self::Double,
            _ => Self::Object,
        }
    }

    /// The narrowest kind able to hold both.
    #[must_use]
    pub fn widest(self, other: Self) -> Self {
        self.max(other)
    }
}

/// The representation a store chain bottoms out in.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StoreKind {
    /// Untouched zero-length placeholder
    Empty,
    /// Dense `i32` buffer
    Int,
    /// Dense `f64` buffer
    Double,
    /// Dense buffer of arbitrary values
    Object,
    /// Dense prefix plus an ordered map
    Sparse,
    /// Fixed-length view over a byte buffer
    Typed(TypedKind),
}

/// Blanket access to [`Any`] for every store.
pub trait AsAny: Any {
    /// Returns `self` as [`Any`]
    fn as_any(&self) -> &dyn Any;
    /// Returns `self` as mutable [`Any`]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The contract every backing store and every view over one implements.
///
/// Generic getters never fail: indices that are absent or out of range read as
/// `undefined`, converted to the requested type. Optimistic getters fail
/// instead, so that speculating callers can fall back.
pub trait ArrayData: Debug + AsAny {
    /// The representation this chain bottoms out in
    fn kind(&self) -> StoreKind;

    /// The element type a caller may speculate on when reading
    fn optimistic_kind(&self) -> ElementKind;

    /// The array length. Independent of how many elements are present.
    fn length(&self) -> u64;

    /// Sets the length. Growing opens holes up to the new length and
    /// promotes the store where [`ArrayData::ensure`] would; shrinking drops
    /// the elements past it. Views with a read-only length return unchanged.
    fn set_length(self: Box<Self>, length: u64) -> StoreResult {
        let old_length = self.length();
        if length <= old_length {
            return Ok(self.shrink(length));
        }
        let last = length - 1;
        Ok(self.ensure(last)?.delete_range(old_length, last))
    }

    /// Exclusive upper bound of the indices that may be present. Equal to the
    /// length except for views that keep elements past it.
    fn upper_bound(&self) -> u64 {
        self.length()
    }

    /// Returns `true` if elements can be neither written nor removed
    fn is_frozen(&self) -> bool {
        false
    }

    /// Returns `true` if elements cannot be removed or added
    fn is_sealed(&self) -> bool {
        false
    }

    /// Returns `true` if new indices may be added
    fn is_extensible(&self) -> bool {
        true
    }

    /// Returns `true` if the length may be changed
    fn is_length_writable(&self) -> bool {
        true
    }

    /// Returns `true` if an element is present at `index`
    fn has(&self, index: u64) -> bool;

    /// The next index after `index` that may hold an element. Stores with gaps
    /// skip them; the length is returned once nothing follows.
    fn next_index(&self, index: u64) -> u64 {
        index + 1
    }

    /// Reads an element converted with ToInt32
    fn get_int(&self, index: u64) -> i32;

    /// Reads an element converted with ToNumber
    fn get_double(&self, index: u64) -> f64;

    /// Reads an element
    fn get_object(&self, index: u64) -> Value;

    /// Reads an element that must be an `i32` exactly.
    fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError>;

    /// Reads an element that must be a number.
    fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError>;

    /// Writes an element, widening the representation if it does not fit.
    /// Writing past the length extends it, and the skipped slots are holes.
    fn set(self: Box<Self>, index: u64, value: Value, strict: bool) -> StoreResult;

    /// Makes `index` writable without reallocation and extends the length to
    /// cover it. New slots hold filler, not holes.
    fn ensure(self: Box<Self>, index: u64) -> StoreResult;

    /// Returns whether the element at `index` may be deleted. Strict callers
    /// get an error instead of `false`.
    fn can_delete(&self, index: u64, strict: bool) -> Result<bool, ArrayError> {
        let _ = (index, strict);
        Ok(true)
    }

    /// Returns whether every element in `from..=to` may be deleted.
    fn can_delete_range(&self, from: u64, to: u64, strict: bool) -> Result<bool, ArrayError> {
        let _ = (from, to, strict);
        Ok(true)
    }

    /// Turns the element at `index` into a hole. The length is unchanged.
    fn delete(self: Box<Self>, index: u64) -> Store;

    /// Turns every element in `from..=to` into a hole.
    fn delete_range(self: Box<Self>, from: u64, to: u64) -> Store;

    /// Releases the elements in `from..=to` where the representation can
    /// express an empty slot.
    fn set_empty(&mut self, from: u64, to: u64) {
        let _ = (from, to);
    }

    /// Drops every element at or past `new_length` and sets the length.
    fn shrink(self: Box<Self>, new_length: u64) -> Store;

    /// Moves elements `by` positions toward zero, dropping the first `by`.
    fn shift_left(self: Box<Self>, by: u64) -> Store;

    /// Moves elements `by` positions away from zero. The length grows by `by`.
    fn shift_right(self: Box<Self>, by: u64) -> StoreResult;

    /// Appends an element
    fn push(self: Box<Self>, value: Value, strict: bool) -> StoreResult {
        let index = self.length();
        self.set(index, value, strict)
    }

    /// Removes and returns the last element; `undefined` when empty.
    fn pop(&mut self) -> Value;

    /// Copies `from..to` into a fresh store
    fn slice(&self, from: u64, to: u64) -> Store;

    /// Widens the representation to hold elements of `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is narrower than what the store already holds.
    fn convert(self: Box<Self>, kind: ElementKind) -> Store;

    /// Snapshot of `0..length` with holes read as `undefined`
    fn as_object_array(&self) -> Vec<Value> {
        (0..self.length()).map(|i| self.get_object(i)).collect()
    }

    /// Returns the store as a continuous store, if it is one
    fn as_continuous(&self) -> Option<&dyn ContinuousArrayData> {
        None
    }

    /// Returns the store as a mutable continuous store, if it is one
    fn as_continuous_mut(&mut self) -> Option<&mut dyn ContinuousArrayData> {
        None
    }
}

impl dyn ArrayData {
    /// Returns `true` if the outermost store is a `T`
    #[must_use]
    pub fn is<T: ArrayData>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Returns the outermost store as a `T`, if it is one
    #[must_use]
    pub fn downcast_ref<T: ArrayData>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

pub(crate) fn check_index(index: u64) -> Result<(), ArrayError> {
    if index >= MAX_LENGTH {
        Err(ArrayError::CapacityOverflow {
            requested: index.saturating_add(1),
        })
    } else {
        Ok(())
    }
}

/// Writes at `index >= store.length()`: makes room, writes, then turns the
/// slots between the old length and `index` into holes.
pub(crate) fn set_past_length(store: Store, index: u64, value: Value, strict: bool) -> StoreResult {
    if let Err(e) = check_index(index) {
        return Err(StoreError::new(e, store));
    }
    let old_length = store.length();
    let store = store.ensure(index)?.set(index, value, strict)?;
    Ok(if index > old_length {
        store.delete_range(old_length, index - 1)
    } else {
        store
    })
}

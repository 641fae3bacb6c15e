//! Store factories and the owner used by the object model
//!
//! Every store operation that can change the representation consumes the
//! store and returns its replacement. [`ArrayStorage`] hides that protocol:
//! it always reinstalls whatever came back, including on failure.

use std::fmt::{self, Debug, Formatter};
use std::mem;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use tracing::debug;

use crate::continuous::{self, Element, ElementGetter, ElementSetter};
use crate::data::{ArrayData, CallSite, ElementKind, Store, StoreKind, StoreResult, MAX_DENSE_LENGTH};
use crate::deleted::DeletedRangeFilter;
use crate::dense::{FloatStore, IntStore, ObjectStore};
use crate::empty::EmptyStore;
use crate::error::{AccessError, ArrayError};
use crate::length_locked::LengthLockedView;
use crate::policy::{FrozenView, NonExtensibleView, SealedView};
use crate::sparse::SparseStore;
use crate::typed::{ByteOrder, TypedKind, TypedStore};
use crate::undefined::UndefinedTrackingView;
use crate::value::{ObjectId, Value};

/// Allocates a store of `initial_length` holes.
#[must_use]
pub fn allocate(initial_length: u64) -> Store {
    if initial_length == 0 {
        Box::new(EmptyStore)
    } else if initial_length >= MAX_DENSE_LENGTH {
        SparseStore::promote(Box::new(EmptyStore), initial_length)
    } else {
        DeletedRangeFilter::wrap(
            Box::new(IntStore::with_length(initial_length)),
            0,
            initial_length - 1,
        )
    }
}

/// Element collections a store can be built from.
pub trait IntoStore {
    /// Builds the narrowest dense store holding the elements
    fn into_store(self) -> Store;
}

impl IntoStore for Vec<i32> {
    fn into_store(self) -> Store {
        Box::new(IntStore::from(self))
    }
}

impl IntoStore for &[i32] {
    fn into_store(self) -> Store {
        Box::new(IntStore::from(self))
    }
}

impl IntoStore for Vec<f64> {
    fn into_store(self) -> Store {
        Box::new(FloatStore::from(self))
    }
}

impl IntoStore for &[f64] {
    fn into_store(self) -> Store {
        Box::new(FloatStore::from(self))
    }
}

impl IntoStore for Vec<Value> {
    fn into_store(self) -> Store {
        Box::new(ObjectStore::from(self))
    }
}

impl IntoStore for &[Value] {
    fn into_store(self) -> Store {
        Box::new(ObjectStore::from(self))
    }
}

/// Allocates a dense store holding `elements`.
pub fn allocate_from(elements: impl IntoStore) -> Store {
    elements.into_store()
}

/// Allocates a fixed-length store over `bytes`.
#[must_use]
pub fn allocate_typed(bytes: Vec<u8>, kind: TypedKind, order: ByteOrder) -> Store {
    Box::new(TypedStore::new(bytes, kind, order))
}

/// Makes every element and the length read-only.
#[must_use]
pub fn freeze(store: Store) -> Store {
    if store.is_frozen() {
        return store;
    }
    debug!(kind = ?store.kind(), "freezing array");
    Box::new(FrozenView::new(store))
}

/// Prevents adding indices and deleting occupied ones.
#[must_use]
pub fn seal(store: Store) -> Store {
    if store.is_sealed() {
        return store;
    }
    debug!(kind = ?store.kind(), "sealing array");
    Box::new(SealedView::new(store))
}

/// Prevents adding indices.
#[must_use]
pub fn prevent_extension(store: Store) -> Store {
    if !store.is_extensible() {
        return store;
    }
    debug!(kind = ?store.kind(), "preventing extensions");
    Box::new(NonExtensibleView::new(store))
}

/// Makes the length read-only.
#[must_use]
pub fn lock_length(store: Store) -> Store {
    if !store.is_length_writable() {
        return store;
    }
    debug!(kind = ?store.kind(), length = store.length(), "locking length");
    Box::new(LengthLockedView::new(store))
}

/// Lets a numeric store hold `undefined` without widening. Object, sparse and
/// typed stores are returned unchanged.
#[must_use]
pub fn track_undefined(store: Store) -> Store {
    let numeric = matches!(
        store.kind(),
        StoreKind::Empty | StoreKind::Int | StoreKind::Double
    );
    if !numeric || store.is::<UndefinedTrackingView>() {
        return store;
    }
    UndefinedTrackingView::wrap(store)
}

impl Serialize for dyn ArrayData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let length = self.length();
        let mut s = serializer.serialize_seq(usize::try_from(length).ok())?;
        for index in 0..length {
            if self.has(index) {
                s.serialize_element(&self.get_object(index))?;
            } else {
                s.serialize_element(&())?;
            }
        }
        s.end()
    }
}

/// Present elements of an array in ascending index order.
pub struct Iter<'a> {
    store: &'a dyn ArrayData,
    next: u64,
    end: u64,
}

impl Iterator for Iter<'_> {
    type Item = (u64, Value);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let index = self.next;
            self.next = self.store.next_index(index).max(index + 1);
            if self.store.has(index) {
                return Some((index, self.store.get_object(index)));
            }
        }
        None
    }
}

/// The current store of one array.
pub struct ArrayStorage {
    store: Store,
    id: Option<ObjectId>,
}

impl ArrayStorage {
    /// Creates an empty array without allocating.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(Box::new(EmptyStore))
    }

    /// Creates an array of `length` holes.
    #[must_use]
    pub fn with_length(length: u64) -> Self {
        Self::from_store(allocate(length))
    }

    /// Takes ownership of `store`.
    #[must_use]
    pub fn from_store(store: Store) -> Self {
        Self { store, id: None }
    }

    /// Attaches the identity reported in policy errors.
    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    /// The identity reported in policy errors
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    /// The current store
    #[must_use]
    pub fn store(&self) -> &dyn ArrayData {
        &*self.store
    }

    /// The current store, for fast-path writes
    pub fn store_mut(&mut self) -> &mut dyn ArrayData {
        &mut *self.store
    }

    /// Releases the current store
    #[must_use]
    pub fn into_store(self) -> Store {
        self.store
    }

    fn attach(&self, error: ArrayError) -> ArrayError {
        match self.id {
            Some(id) => error.with_array(id),
            None => error,
        }
    }

    fn replace(&mut self, f: impl FnOnce(Store) -> Store) {
        let store = mem::replace(&mut self.store, Box::new(EmptyStore));
        self.store = f(store);
    }

    fn update(&mut self, f: impl FnOnce(Store) -> StoreResult) -> Result<(), ArrayError> {
        let store = mem::replace(&mut self.store, Box::new(EmptyStore));
        match f(store) {
            Ok(store) => {
                self.store = store;
                Ok(())
            }
            Err(e) => {
                let (error, store) = e.into_parts();
                self.store = store;
                Err(self.attach(error))
            }
        }
    }

    /// The representation the store chain bottoms out in
    #[must_use]
    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// The element type a caller may speculate on
    #[must_use]
    pub fn optimistic_kind(&self) -> ElementKind {
        self.store.optimistic_kind()
    }

    /// The array length, holes included
    #[must_use]
    pub fn length(&self) -> u64 {
        self.store.length()
    }

    /// Sets the length. Growing adds holes, shrinking drops elements. Arrays
    /// with a read-only length are left unchanged, sealed arrays keep their
    /// occupied elements.
    pub fn set_length(&mut self, length: u64) -> Result<(), ArrayError> {
        self.update(|store| store.set_length(length))
    }

    /// Returns `true` if `index` holds an element rather than a hole
    #[must_use]
    pub fn has(&self, index: u64) -> bool {
        self.store.has(index)
    }

    /// Reads an element converted with ToInt32
    #[must_use]
    pub fn get_int(&self, index: u64) -> i32 {
        self.store.get_int(index)
    }

    /// Reads an element converted with ToNumber
    #[must_use]
    pub fn get_double(&self, index: u64) -> f64 {
        self.store.get_double(index)
    }

    /// Reads an element; holes read as `undefined`
    #[must_use]
    pub fn get(&self, index: u64) -> Value {
        self.store.get_object(index)
    }

    /// Reads an exact `i32`, failing on holes, other types and indices past
    /// the length.
    pub fn get_int_optimistic(&self, index: u64, site: CallSite) -> Result<i32, AccessError> {
        self.store.get_int_optimistic(index, site)
    }

    /// Reads a number, failing on non-numeric elements and indices past the
    /// length.
    pub fn get_double_optimistic(&self, index: u64, site: CallSite) -> Result<f64, AccessError> {
        self.store.get_double_optimistic(index, site)
    }

    /// Writes an element.
    pub fn set(&mut self, index: u64, value: impl Into<Value>, strict: bool) -> Result<(), ArrayError> {
        let value = value.into();
        self.update(|store| store.set(index, value, strict))
    }

    /// Deletes an element, returning `false` if it may not be deleted.
    pub fn delete(&mut self, index: u64, strict: bool) -> Result<bool, ArrayError> {
        let allowed = self
            .store
            .can_delete(index, strict)
            .map_err(|e| self.attach(e))?;
        if allowed {
            self.replace(|store| store.delete(index));
        }
        Ok(allowed)
    }

    /// Appends an element, returning the new length.
    pub fn push(&mut self, value: impl Into<Value>, strict: bool) -> Result<u64, ArrayError> {
        let value = value.into();
        if let Some(store) = self.store.as_continuous_mut() {
            if let Ok(length) = store.fast_push(&value) {
                return Ok(length);
            }
        }
        self.update(|store| store.push(value, strict))?;
        Ok(self.length())
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Value {
        if let Some(store) = self.store.as_continuous_mut() {
            if let Ok(value) = store.fast_pop() {
                return value;
            }
        }
        self.store.pop()
    }

    /// Copies `from..to` into a new array.
    #[must_use]
    pub fn slice(&self, from: u64, to: u64) -> ArrayStorage {
        Self::from_store(self.store.slice(from, to))
    }

    /// Concatenates two arrays into a new one. Holes are kept.
    pub fn concat(&self, other: &ArrayStorage) -> Result<ArrayStorage, ArrayError> {
        if let (Some(a), Some(b)) = (self.store.as_continuous(), other.store.as_continuous()) {
            if let Some(store) = a.fast_concat(b) {
                return Ok(Self::from_store(store));
            }
        }
        let offset = self.length();
        let tail = other.length();
        let elements = self
            .iter()
            .take_while(|&(index, _)| index < offset)
            .chain(
                other
                    .iter()
                    .take_while(|&(index, _)| index < tail)
                    .map(|(index, value)| (offset + index, value)),
            );
        let mut result = Self::new();
        for (index, value) in elements {
            result.set(index, value, false)?;
        }
        result.set_length(offset + tail)?;
        Ok(result)
    }

    /// Present `(index, element)` pairs in ascending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: &*self.store,
            next: 0,
            end: self.store.upper_bound(),
        }
    }

    /// Snapshot of `0..length`, holes read as `undefined`
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.store.as_object_array()
    }

    /// Makes every element and the length read-only.
    pub fn freeze(&mut self) {
        self.replace(freeze);
    }

    /// Prevents adding indices and deleting occupied ones.
    pub fn seal(&mut self) {
        self.replace(seal);
    }

    /// Prevents adding indices.
    pub fn prevent_extension(&mut self) {
        self.replace(prevent_extension);
    }

    /// Makes the length read-only.
    pub fn lock_length(&mut self) {
        self.replace(lock_length);
    }

    /// Lets numeric stores hold `undefined` without widening.
    pub fn track_undefined(&mut self) {
        self.replace(track_undefined);
    }

    /// Returns `true` once [`ArrayStorage::freeze`] was called
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.store.is_frozen()
    }

    /// Returns `true` for sealed and frozen arrays
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.store.is_sealed()
    }

    /// Returns `false` once new indices are refused
    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.store.is_extensible()
    }

    /// Returns `false` for frozen, length-locked and typed arrays
    #[must_use]
    pub fn is_length_writable(&self) -> bool {
        self.store.is_length_writable()
    }

    /// A guarded reader for `T` elements, if the current store offers one
    #[must_use]
    pub fn element_getter<T: Element>(&self, site: CallSite) -> Option<ElementGetter<T>> {
        continuous::element_getter(&*self.store, site)
    }

    /// A guarded writer for `T` elements, if the current store offers one
    #[must_use]
    pub fn element_setter<T: Element>(&self) -> Option<ElementSetter<T>> {
        continuous::element_setter(&*self.store)
    }
}

impl Default for ArrayStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Store> for ArrayStorage {
    fn from(store: Store) -> Self {
        Self::from_store(store)
    }
}

impl FromIterator<Value> for ArrayStorage {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut storage = Self::new();
        for value in iter {
            // Only capacity overflow can fail here, which an iterator cannot reach
            let _ = storage.push(value, false);
        }
        storage
    }
}

impl<'a> IntoIterator for &'a ArrayStorage {
    type Item = (u64, Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Debug for ArrayStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayStorage")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish()
    }
}

impl Serialize for ArrayStorage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.store.serialize(serializer)
    }
}

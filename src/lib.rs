//! Backing storage for the indexed elements of script-engine arrays.
//!
//! An array starts out with no storage at all and picks a representation
//! from the first element written to it: a flat buffer of `i32`, of `f64`,
//! or of arbitrary [`Value`]s. Writes that do not fit the current
//! representation widen it, indices past [`MAX_DENSE_LENGTH`] move the
//! overflow into an ordered map, and policy views such as [`FrozenView`]
//! layer access restrictions over any of them.
//!
//! Store operations that can change the representation consume the store and
//! return its replacement. [`ArrayStorage`] wraps that protocol for owners:
//!
//! ```
//! use iarray::{ArrayStorage, StoreKind, Value};
//!
//! let mut array = ArrayStorage::new();
//! array.push(1, false).unwrap();
//! array.push(2, false).unwrap();
//! assert_eq!(array.kind(), StoreKind::Int);
//!
//! array.set(1, 2.5, false).unwrap();
//! assert_eq!(array.kind(), StoreKind::Double);
//! assert_eq!(array.get(1), Value::Double(2.5));
//! ```
//!
//! Hot paths can ask a store for a guarded accessor and fall back to the
//! generic operations when none is offered or the guard fails:
//!
//! ```
//! use iarray::{allocate_from, CallSite};
//!
//! let store = allocate_from(vec![1, 2, 3]);
//! let getter = iarray::element_getter::<i32>(&*store, CallSite(0)).unwrap();
//! assert_eq!(getter.get(&*store, 2), Ok(3));
//! ```
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::float_cmp,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::return_self_not_must_use
)]

mod alloc;
mod bits;
mod filter;
mod number;

pub mod continuous;
pub mod data;
pub mod deleted;
pub mod dense;
pub mod empty;
pub mod error;
pub mod index;
pub mod length_locked;
pub mod policy;
pub mod sparse;
pub mod storage;
pub mod typed;
pub mod undefined;
pub mod value;

pub use alloc::CHUNK_SIZE;
pub use continuous::{element_getter, element_setter, ContinuousArrayData, Element, ElementGetter, ElementSetter};
pub use data::{ArrayData, CallSite, ElementKind, Store, StoreKind, StoreResult, MAX_DENSE_LENGTH, MAX_LENGTH};
pub use deleted::{DeletedFilter, DeletedRangeFilter};
pub use dense::{DenseStore, FloatStore, IntStore, ObjectStore};
pub use empty::EmptyStore;
pub use error::{AccessError, AllocError, ArrayError, StoreError, UnwarrantedOptimism};
pub use index::{index_of, to_key_string, to_long_index, ToArrayIndex, MAX_ARRAY_INDEX};
pub use length_locked::LengthLockedView;
pub use number::{to_int32, to_uint32};
pub use policy::{FrozenView, NonExtensibleView, SealedView};
pub use sparse::SparseStore;
pub use storage::{
    allocate, allocate_from, allocate_typed, freeze, lock_length, prevent_extension, seal,
    track_undefined, ArrayStorage, IntoStore, Iter,
};
pub use typed::{ByteOrder, TypedKind, TypedStore};
pub use undefined::UndefinedTrackingView;
pub use value::{ObjectId, Value};

#[cfg(test)]
#[global_allocator]
static ALLOCATOR: mockalloc::Mockalloc<std::alloc::System> = mockalloc::Mockalloc(std::alloc::System);

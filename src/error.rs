//! Error types for array storage

use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;

use crate::data::{CallSite, Store};
use crate::value::{ObjectId, Value};

/// Error type for fallible allocation
/// This error is returned when an allocation fails.
/// It does not contain any additional information.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AllocError;

impl Error for AllocError {}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

fn describe(array: &Option<ObjectId>) -> String {
    match array {
        Some(id) => id.to_string(),
        None => "array".to_owned(),
    }
}

/// Conditions that surface to script code, or to the host as resource exhaustion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// A new index was written to a non-extensible array in strict mode
    #[error("cannot add index {index} to non-extensible {}", describe(.array))]
    NonExtensible {
        /// The index that was written
        index: u64,
        /// Identity of the array, when the owner attached one
        array: Option<ObjectId>,
    },
    /// An element of a frozen array was written in strict mode
    #[error("cannot assign to read-only index {index} of {}", describe(.array))]
    ReadOnly {
        /// The index that was written
        index: u64,
        /// Identity of the array, when the owner attached one
        array: Option<ObjectId>,
    },
    /// An element of a sealed or frozen array was deleted in strict mode
    #[error("cannot delete non-configurable index {index} of {}", describe(.array))]
    NotConfigurable {
        /// The index that was deleted
        index: u64,
        /// Identity of the array, when the owner attached one
        array: Option<ObjectId>,
    },
    /// A length or capacity beyond what the engine can address
    #[error("array capacity overflow (requested {requested})")]
    CapacityOverflow {
        /// The length or element count that could not be represented
        requested: u64,
    },
    /// Memory allocation failed
    #[error("memory allocation failed")]
    Alloc(#[from] AllocError),
}

impl ArrayError {
    /// Attaches the identity of the owning array to a policy error. Other
    /// errors are returned unchanged.
    #[must_use]
    pub fn with_array(self, id: ObjectId) -> Self {
        match self {
            Self::NonExtensible { index, .. } => Self::NonExtensible {
                index,
                array: Some(id),
            },
            Self::ReadOnly { index, .. } => Self::ReadOnly {
                index,
                array: Some(id),
            },
            Self::NotConfigurable { index, .. } => Self::NotConfigurable {
                index,
                array: Some(id),
            },
            other => other,
        }
    }

    /// Returns `true` for conditions that must be reported to the script as a
    /// type error, rather than to the host as resource exhaustion.
    #[must_use]
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::NonExtensible { .. } | Self::ReadOnly { .. } | Self::NotConfigurable { .. }
        )
    }
}

/// A rejected store operation. The store that was passed in is handed back
/// untouched, so a failed write never loses the array.
pub struct StoreError {
    error: ArrayError,
    store: Store,
}

impl StoreError {
    pub(crate) fn new(error: ArrayError, store: Store) -> Self {
        Self { error, store }
    }

    /// The reason the operation was rejected
    #[must_use]
    pub fn error(&self) -> &ArrayError {
        &self.error
    }

    /// Recovers the store, discarding the error
    #[must_use]
    pub fn into_store(self) -> Store {
        self.store
    }

    /// Splits into the error and the store
    #[must_use]
    pub fn into_parts(self) -> (ArrayError, Store) {
        (self.error, self.store)
    }
}

impl Debug for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreError")
            .field("error", &self.error)
            .field("kind", &self.store.kind())
            .field("length", &self.store.length())
            .finish()
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<StoreError> for ArrayError {
    fn from(other: StoreError) -> Self {
        other.error
    }
}

/// Signal raised by an optimistic accessor when the stored element cannot be
/// returned as the type the call site speculated on. The caller recovers by
/// re-reading generically.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("element {value:?} does not fit the type expected at {site}")]
pub struct UnwarrantedOptimism {
    /// The element actually stored
    pub value: Value,
    /// The call site that speculated
    pub site: CallSite,
}

/// Failure of a fast or optimistic access. Never user visible: every variant
/// means "use the generic path".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// The index is outside the store's bounds
    #[error("index {index} is out of bounds for length {length}")]
    OutOfBounds {
        /// The index accessed
        index: u64,
        /// The store length at the time of access
        length: u64,
    },
    /// The element is not of the speculated type
    #[error(transparent)]
    Deoptimize(#[from] UnwarrantedOptimism),
    /// The store no longer has the representation the accessor was built for
    #[error("store representation no longer matches the accessor guard")]
    GuardFailed,
    /// The representation cannot perform this operation on the fast path
    #[error("operation not supported by this representation")]
    Unsupported,
}

impl AccessError {
    pub(crate) fn deoptimize(value: Value, site: CallSite) -> Self {
        Self::Deoptimize(UnwarrantedOptimism { value, site })
    }
}

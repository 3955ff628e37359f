#![forbid(unsafe_code)]

//! Error types.
//!
//! Only wiring problems are errors. Validation failures are reported as
//! [`ValidationChanged`](crate::ValidationChanged) events and a destroyed
//! control silently turns its binding [`Invalid`](crate::BindingStatus::Invalid).

use std::fmt;

/// A `bind_*` call could not be wired to a control.
///
/// The registration call logs the error and creates no binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    /// No control exists at the given scene path.
    ControlNotFound { path: String },
    /// No registered [`ControlBinder`](crate::ControlBinder) handles the control.
    UnsupportedControl { path: String, kind: String },
    /// A list binding targeted a control that cannot display items.
    NotAListControl { path: String, kind: String },
    /// An enum binding asked for a selected-value path but the control has
    /// no selection property.
    MissingSelection { path: String, kind: String },
    /// The source path was empty and no target collection was supplied.
    EmptySourcePath,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlNotFound { path } => write!(f, "unable to find control at '{path}'"),
            Self::UnsupportedControl { path, kind } => {
                write!(f, "no binder supports control '{path}' of kind {kind}")
            }
            Self::NotAListControl { path, kind } => {
                write!(f, "control '{path}' of kind {kind} cannot display a list")
            }
            Self::MissingSelection { path, kind } => {
                write!(f, "control '{path}' of kind {kind} has no selection to bind")
            }
            Self::EmptySourcePath => write!(f, "source path is empty"),
        }
    }
}

impl std::error::Error for ResolutionError {}

/// A source object refused a property write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyError {
    Unknown { name: String },
    TypeMismatch { name: String, expected: &'static str },
    ReadOnly { name: String },
}

impl PropertyError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    pub fn type_mismatch(name: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
        }
    }

    pub fn read_only(name: impl Into<String>) -> Self {
        Self::ReadOnly { name: name.into() }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { name } => write!(f, "unknown property '{name}'"),
            Self::TypeMismatch { name, expected } => {
                write!(f, "property '{name}' expects a {expected} value")
            }
            Self::ReadOnly { name } => write!(f, "property '{name}' is read-only"),
        }
    }
}

impl std::error::Error for PropertyError {}

/// An [`ObservableList`](crate::ObservableList) index was past the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub len: usize,
}

impl fmt::Display for IndexOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of bounds for list of length {}", self.index, self.len)
    }
}

impl std::error::Error for IndexOutOfBounds {}

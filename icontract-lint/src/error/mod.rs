//! Linter error model
//!
//! A lint run produces a flat, ordered list of [`Error`] records. The record
//! is immutable once constructed; its wire representation (both the verbose
//! identifier in parentheses and the JSON `identifier` key) is the kebab-case
//! string of [`ErrorId`].

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Error identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorId {
    /// The file could not be read
    Unreadable,
    /// The file could not be parsed as Python
    InvalidSyntax,
    /// A contract decorator lacks the condition argument
    NoCondition,
    /// Precondition arguments missing in the function signature
    PreInvalidArg,
    /// Postcondition arguments missing in the function signature
    PostInvalidArg,
    /// Postcondition expects a result, but the function returns None
    PostResultNone,
    /// Function argument `result` conflicts with the postcondition
    PostResultConflict,
    /// Function argument `OLD` conflicts with the postcondition
    PostOldConflict,
    /// Snapshot arguments missing in the function signature
    SnapshotInvalidArg,
    /// A snapshot decorator lacks the capture function
    SnapshotWoCapture,
    /// A multi-argument snapshot lacks an explicit name
    SnapshotWoName,
    /// A snapshot on a function without any postcondition
    SnapshotWoPost,
    /// An invariant condition does not take exactly `self`
    InvInvalidArg,
}

impl ErrorId {
    /// Wire string of the identifier
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorId::Unreadable => "unreadable",
            ErrorId::InvalidSyntax => "invalid-syntax",
            ErrorId::NoCondition => "no-condition",
            ErrorId::PreInvalidArg => "pre-invalid-arg",
            ErrorId::PostInvalidArg => "post-invalid-arg",
            ErrorId::PostResultNone => "post-result-none",
            ErrorId::PostResultConflict => "post-result-conflict",
            ErrorId::PostOldConflict => "post-old-conflict",
            ErrorId::SnapshotInvalidArg => "snapshot-invalid-arg",
            ErrorId::SnapshotWoCapture => "snapshot-wo-capture",
            ErrorId::SnapshotWoName => "snapshot-wo-name",
            ErrorId::SnapshotWoPost => "snapshot-wo-post",
            ErrorId::InvInvalidArg => "inv-invalid-arg",
        }
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A linter error
///
/// Invariants: `description` and `filename` are never empty; `lineno`, when
/// present, is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    identifier: ErrorId,
    description: String,
    filename: String,
    lineno: Option<usize>,
}

impl Error {
    /// Create the error with the given values
    pub fn new(
        identifier: ErrorId,
        description: impl Into<String>,
        filename: impl Into<String>,
        lineno: Option<usize>,
    ) -> Self {
        let description = description.into();
        let filename = filename.into();
        debug_assert!(!description.is_empty());
        debug_assert!(!filename.is_empty());
        debug_assert!(lineno.map_or(true, |lineno| lineno >= 1));
        Self { identifier, description, filename, lineno }
    }

    /// Identifier of the error
    pub fn identifier(&self) -> ErrorId {
        self.identifier
    }

    /// Verbose description, including details such as the offending argument names
    pub fn description(&self) -> &str {
        &self.description
    }

    /// File name of the linted module
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Line of the offending decorator or function, if the error has one
    pub fn lineno(&self) -> Option<usize> {
        self.lineno
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.lineno.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("Error", fields)?;
        state.serialize_field("identifier", &self.identifier)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("filename", &self.filename)?;
        if let Some(lineno) = self.lineno {
            state.serialize_field("lineno", &lineno)?;
        }
        state.end()
    }
}

//! The error type for zone queries.

use core::fmt;

/// The category of a [`ZoneError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The requested year lies outside the zone database's coverage.
    ///
    /// A well-behaved caller can avoid this by checking the
    /// [`ZoneContext`][crate::types::ZoneContext] window first.
    OutOfRange,
    /// The requested zone name is not in the registry.
    ///
    /// Registry lookups return `Option` instead of raising this; the
    /// kind exists for callers that need to surface the miss as an
    /// error.
    NotFound,
    /// A compiled zone record broke an invariant at runtime.
    ///
    /// Non-monotonic eras, a rule referencing a missing policy, or an
    /// exceeded transition buffer all indicate a compiler regression or
    /// a handcrafted record bug. Fatal and non-retryable.
    BadZoneData,
}

/// The error returned by zone processors and adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneError {
    kind: ErrorKind,
    message: Option<&'static str>,
}

impl ZoneError {
    /// Create an `OutOfRange` error.
    pub const fn out_of_range() -> Self {
        Self {
            kind: ErrorKind::OutOfRange,
            message: None,
        }
    }

    /// Create a `NotFound` error.
    pub const fn not_found() -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: None,
        }
    }

    /// Create a `BadZoneData` error.
    pub const fn bad_zone_data() -> Self {
        Self {
            kind: ErrorKind::BadZoneData,
            message: None,
        }
    }

    /// Attach a static message to this error.
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Returns this error's kind.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the attached message, if any.
    pub const fn message(&self) -> Option<&'static str> {
        self.message
    }
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::OutOfRange => "year out of range",
            ErrorKind::NotFound => "zone not found",
            ErrorKind::BadZoneData => "malformed zone data",
        };
        f.write_str(kind)?;
        if let Some(message) = self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ZoneError {}

//! Error types shared by every repobridge crate.
//!
//! The variants follow the failure classes callers can observe:
//! configuration problems surface when an entity model is built, translation
//! problems before anything reaches the store, and primary transaction
//! failures from the coordinator. Cache and secondary-transaction failures
//! are logged where they happen and never travel through this type to a
//! facade caller.

use std::fmt;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid mapping metadata, detected when an entity model is built or
    /// when a type is used as an aggregate root.
    #[error("configuration error for entity `{entity}`: {message}")]
    Configuration { entity: String, message: String },

    /// A query descriptor could not be translated.
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// The connection-level transaction or the native begin failed.
    #[error("transaction {phase} failed: {message}")]
    Transaction { phase: TxPhase, message: String },

    /// An operation was attempted in the wrong transaction state.
    #[error("illegal transaction state: expected {expected}, found {actual}")]
    IllegalTransactionState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(String),

    /// A row could not be turned back into an entity.
    #[error("cannot convert `{entity}.{property}`: {message}")]
    Conversion {
        entity: String,
        property: String,
        message: String,
    },

    /// A cache backend failed. Only seen by code that talks to a backend directly.
    #[error("cache backend error: {0}")]
    Cache(String),

    /// The API was called with arguments that can never be valid.
    #[error("usage error: {0}")]
    Usage(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn configuration(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a transaction error.
    pub fn transaction(phase: TxPhase, message: impl Into<String>) -> Self {
        Error::Transaction {
            phase,
            message: message.into(),
        }
    }

    /// Shorthand for a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store(message.into())
    }

    /// Shorthand for a conversion error.
    pub fn conversion(
        entity: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Conversion {
            entity: entity.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// True for translation failures.
    pub const fn is_translation(&self) -> bool {
        matches!(self, Error::Translation(_))
    }

    /// True for configuration failures.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

/// Transaction phase named in `Error::Transaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Begin,
    Commit,
    Rollback,
    Suspend,
    Resume,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxPhase::Begin => "begin",
            TxPhase::Commit => "commit",
            TxPhase::Rollback => "rollback",
            TxPhase::Suspend => "suspend",
            TxPhase::Resume => "resume",
        })
    }
}

/// A descriptor referenced something the entity model cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot translate {descriptor} for `{entity}`: {kind}")]
pub struct TranslationError {
    /// Entity the descriptor was applied to.
    pub entity: String,
    /// Which descriptor failed (`sort`, `page`, `example`, ...).
    pub descriptor: &'static str,
    /// What went wrong.
    pub kind: TranslationErrorKind,
}

impl TranslationError {
    pub fn new(
        entity: impl Into<String>,
        descriptor: &'static str,
        kind: TranslationErrorKind,
    ) -> Self {
        Self {
            entity: entity.into(),
            descriptor,
            kind,
        }
    }
}

/// Reason a translation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationErrorKind {
    /// No property with this name exists on the entity.
    UnknownProperty(String),
    /// The property exists but is not stored (transient).
    TransientProperty(String),
    /// A probe value does not fit the property's declared type.
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A text matcher was configured for a non-text property.
    MatcherNotApplicable { property: String, matcher: String },
    /// A regex matcher carried an invalid pattern.
    InvalidPattern { property: String, message: String },
    /// Pagination arithmetic overflowed.
    OffsetOverflow { page: u64, size: u64 },
}

impl fmt::Display for TranslationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationErrorKind::UnknownProperty(p) => write!(f, "no property named `{p}`"),
            TranslationErrorKind::TransientProperty(p) => {
                write!(f, "property `{p}` is transient and has no storage column")
            }
            TranslationErrorKind::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "property `{property}` expects {expected} but the probe holds {found}"
            ),
            TranslationErrorKind::MatcherNotApplicable { property, matcher } => write!(
                f,
                "matcher {matcher} cannot be used on non-text property `{property}`"
            ),
            TranslationErrorKind::InvalidPattern { property, message } => {
                write!(f, "invalid pattern for `{property}`: {message}")
            }
            TranslationErrorKind::OffsetOverflow { page, size } => {
                write!(f, "offset for page {page} of size {size} overflows")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_error_message() {
        let err: Error = TranslationError::new(
            "User",
            "sort",
            TranslationErrorKind::UnknownProperty("nickname".into()),
        )
        .into();
        assert!(err.is_translation());
        assert_eq!(
            err.to_string(),
            "cannot translate sort for `User`: no property named `nickname`"
        );
    }

    #[test]
    fn test_transaction_error_message() {
        let err = Error::transaction(TxPhase::Commit, "connection reset");
        assert_eq!(err.to_string(), "transaction commit failed: connection reset");
    }
}

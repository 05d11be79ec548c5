use thiserror::Error;

use crate::record::{Field, FieldKind};

/// Errors raised while building an [`IdentityParser`](crate::IdentityParser).
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A user-supplied ignore pattern is not a valid regular expression
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised when writing into a [`MetadataRecord`](crate::MetadataRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The value shape does not match the field (e.g. a list written to `title`)
    #[error("Field '{field}' expects a {expected} value")]
    KindMismatch { field: Field, expected: FieldKind },
}

use std::borrow::Cow;

use thiserror::Error;

/// Broad category of a failure, independent of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid field declaration. Raised once, at schema-definition time.
    Configuration,
    /// A required field received no value and no auto rule applied.
    Integrity,
    /// Malformed ISO-8601 text for a datetime field.
    Parse,
    /// A value of the wrong shape, or malformed text for a date/duration field.
    Value,
    /// Anything the storage side reports about itself.
    Storage,
}

/// Errors produced by the temporal field codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field declaration itself is invalid.
    #[error("{message}")]
    Configuration { message: Cow<'static, str> },

    /// No value supplied for a non-nullable field without an applicable auto rule.
    #[error("field is required but no value was supplied")]
    NotNull,

    /// The supplied text is not a valid ISO-8601 date or datetime.
    #[error("unable to parse '{text}': {reason}")]
    Parse { text: String, reason: String },

    /// The supplied value cannot be stored by this field.
    #[error("{message}")]
    InvalidValue { message: String },
}

impl FieldError {
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn parse(text: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FieldError::Configuration { .. } => ErrorKind::Configuration,
            FieldError::NotNull => ErrorKind::Integrity,
            FieldError::Parse { .. } => ErrorKind::Parse,
            FieldError::InvalidValue { .. } => ErrorKind::Value,
        }
    }

    /// True for both parse failures and value failures.
    ///
    /// Callers that only care that "the input was bad" should use this rather than
    /// matching a specific variant, since which one is raised depends on the field kind.
    pub fn is_value_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Parse | ErrorKind::Value)
    }
}

/// Top-level error type returned by the reference repository and schema layer.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Schema declaration was rejected.
    #[error("invalid configuration for '{field}': {source}")]
    Configuration {
        field: String,
        #[source]
        source: FieldError,
    },

    /// Not-null constraint violated; nothing was persisted.
    #[error("NOT NULL constraint failed: {model}.{field}")]
    Integrity { model: String, field: String },

    /// Encoding or decoding a single field failed.
    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: FieldError,
    },

    /// A record or predicate referenced a field the schema does not declare.
    #[error("unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// No record matched.
    #[error("record not found")]
    NotFound { record_id: Option<String> },

    /// A single-record lookup matched more than one record.
    #[error("expected one record, found {count}")]
    MultipleObjectsReturned { count: usize },

    /// Stored document could not be read back.
    #[error("storage error: {message}")]
    Storage { message: Cow<'static, str> },
}

impl RepoError {
    /// Attaches a field name to a codec error, promoting not-null failures to integrity errors.
    pub fn from_field(model: &str, field: &str, source: FieldError) -> Self {
        match source {
            FieldError::NotNull => RepoError::Integrity {
                model: model.to_string(),
                field: field.to_string(),
            },
            FieldError::Configuration { .. } => RepoError::Configuration {
                field: field.to_string(),
                source,
            },
            other => RepoError::Field {
                field: field.to_string(),
                source: other,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::Configuration { .. } => ErrorKind::Configuration,
            RepoError::Integrity { .. } => ErrorKind::Integrity,
            RepoError::Field { source, .. } => source.kind(),
            RepoError::UnknownField { .. } => ErrorKind::Value,
            RepoError::NotFound { .. }
            | RepoError::MultipleObjectsReturned { .. }
            | RepoError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// The codec error underneath, if this error came from a single field.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            RepoError::Configuration { source, .. } | RepoError::Field { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Storage {
            message: format!("failed to (de)serialize stored document: {err}").into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_null_is_promoted_to_integrity() {
        let err = RepoError::from_field("datetime_fields", "datetime", FieldError::NotNull);
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.to_string(), "NOT NULL constraint failed: datetime_fields.datetime");
    }

    #[test]
    fn parse_and_value_errors_are_both_value_errors() {
        assert!(FieldError::parse("2020-08-xx", "bad day").is_value_error());
        assert!(FieldError::invalid("nope").is_value_error());
        assert!(!FieldError::NotNull.is_value_error());
    }
}

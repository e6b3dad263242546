//! Decode error types.

/// Errors from decoding the schedule XML into model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The document is not well-formed XML (or not valid UTF-8).
    #[error("malformed document: {message}")]
    Malformed { message: String },

    /// A required tag is absent or has empty text.
    #[error("<{element}> is missing required tag <{tag}>")]
    MissingField {
        element: String,
        tag: &'static str,
    },

    /// An element carried a tag the target type does not declare.
    #[error("<{element}> has unrecognized tag <{tag}>")]
    UnknownField { element: String, tag: String },

    /// A tag's text could not be parsed as the expected scalar type.
    #[error("<{tag}> has invalid value {value:?}: expected {expected}")]
    InvalidValue {
        tag: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A time string could not be interpreted as a millisecond epoch.
    #[error("<{tag}> has invalid time {value:?}")]
    InvalidTime { tag: &'static str, value: String },
}

use thiserror::Error;

/// Problems found while parsing a printf-style speed format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("format {0:?} has no verb")]
    MissingVerb(String),
    #[error("format {format:?} ends with a dangling '%'")]
    DanglingPercent { format: String },
    #[error("unsupported verb '%{verb}' in format {format:?}")]
    UnknownVerb { verb: char, format: String },
    #[error("format {0:?} has more than one verb")]
    MultipleVerbs(String),
    #[error("width or precision {field} in format {format:?} is too large")]
    FieldTooLarge { field: usize, format: String },
}

/// Errors that can occur when decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A record did not split into the expected number of fields.
    #[error("malformed record: expected {expected} fields, got {got}")]
    FieldCount { expected: usize, got: usize },

    /// A numeric field held non-numeric content.
    #[error("malformed field {field}: {value:?}")]
    Field { field: &'static str, value: String },

    /// The datagram is not a discovery announcement.
    #[error("not a discovery announcement")]
    NotAnAnnouncement,

    /// A discovery announcement carried an unparseable address.
    #[error("invalid announcement address {0:?}")]
    InvalidAnnounceAddr(String),
}

pub type Result<T> = std::result::Result<T, WireError>;

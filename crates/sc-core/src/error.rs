/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the data model itself.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A property schema named a type token that is not part of the model.
    #[error("unknown property type: \"{0}\"")]
    UnknownPropertyType(String),

    /// A value was read through an accessor for a different type.
    #[error("value type mismatch: expected {expected}, found {found}")]
    ValueType {
        /// The type the caller asked for.
        expected: &'static str,
        /// The type the value actually holds.
        found: &'static str,
    },

    /// A value key requested by a consumer is not present.
    #[error("missing value: \"{0}\"")]
    MissingValue(String),
}

use std::path::PathBuf;

/// Alias for `Result<T, LoadError>`.
pub type LoadResult<T> = Result<T, LoadError>;

/// Fatal load errors. Anything recoverable (unknown module, dropped value)
/// is logged instead and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("invalid {document} document: {source}")]
    Json {
        /// Which document failed ("game", "module", "scene tree", ...).
        document: &'static str,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A template property names a type token outside the schema.
    #[error("unknown property type \"{token}\" on template \"{template}\"")]
    UnknownPropertyType {
        /// Template carrying the bad property.
        template: String,
        /// The unrecognized token.
        token: String,
    },

    /// A transform array has the wrong arity or a non-numeric component.
    #[error("malformed {field} on {owner}: {reason}")]
    MalformedTransform {
        /// Item id or mesh name owning the transform.
        owner: String,
        /// Field name (`position`, `rotation`, `tx`, ...).
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A required field is absent.
    #[error("missing field \"{field}\" in {context}")]
    MissingField {
        /// Field name.
        field: &'static str,
        /// Where it was expected.
        context: String,
    },

    /// A file or directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn json(document: &'static str, source: serde_json::Error) -> Self {
        Self::Json { document, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

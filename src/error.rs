use thiserror::Error;

/// Result type alias for document generation
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading descriptors or building the OpenAPI document.
///
/// Every variant is fatal: generation stops at the first one and nothing is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed annotation on {rpc}: {reason} (in `{line}`)")]
    MalformedAnnotation {
        rpc: String,
        line: String,
        reason: String,
    },

    #[error("unknown type `{type_name}` for path parameter `{name}` on {rpc} (expected `string` or `int`)")]
    UnknownParameterType {
        rpc: String,
        name: String,
        type_name: String,
    },

    #[error("path parameter `{name}` declared more than once on {rpc}")]
    DuplicateParameterName { rpc: String, name: String },

    #[error("field `{field}` of message {message} has unsupported type {type_name}")]
    UnsupportedFieldType {
        message: String,
        field: String,
        type_name: String,
    },

    #[error("{referrer} refers to unknown type {type_name}")]
    UnresolvedType { referrer: String, type_name: String },

    #[error("{method} {path} is produced by both {first} and {second}")]
    DuplicatePathOperation {
        path: String,
        method: String,
        first: String,
        second: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protoc failed: {0}")]
    Protoc(String),

    #[error("failed to decode FileDescriptorSet: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl Error {
    pub(crate) fn malformed(rpc: &str, line: &str, reason: impl Into<String>) -> Self {
        Error::MalformedAnnotation {
            rpc: rpc.to_string(),
            line: line.trim().to_string(),
            reason: reason.into(),
        }
    }
}

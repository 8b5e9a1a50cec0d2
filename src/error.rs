//! Error taxonomy for the invocation engine
//!
//! Every failure the engine can produce is a variant here, typed finely
//! enough for the control loop to branch on it: a 404 status, a not-found
//! search result, and a transport failure are all different things.

use thiserror::Error;

/// Errors produced by the invocation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A field-path expression could not be parsed.
    #[error("malformed path expression {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    /// The OpenAPI document has no such path.
    #[error("path {path:?} not found in the OpenAPI document")]
    PathNotFound { path: String },

    /// The OpenAPI path exists but declares no operation for this method.
    #[error("no {method} operation declared for path {path:?}")]
    OperationNotFound { method: String, path: String },

    /// A `$ref` that should have been resolved upstream was encountered.
    #[error("unresolved schema reference {reference:?}")]
    UnresolvedReference { reference: String },

    /// The OpenAPI document could not be parsed.
    #[error("parsing OpenAPI document: {0}")]
    Document(String),

    /// A descriptor names an HTTP method that does not exist.
    #[error("invalid HTTP method {method:?}")]
    InvalidMethod { method: String },

    /// No descriptor is declared for the requested action.
    #[error("no operation descriptor for action {action:?}")]
    UnsupportedAction { action: String },

    /// A required parameter declared by the OpenAPI operation is missing.
    #[error("missing required {location} parameter {name:?}")]
    MissingParameter { location: &'static str, name: String },

    /// Neither the operation nor the document declares a server URL.
    #[error("no server URL declared for path {path:?}")]
    NoServer { path: String },

    /// The assembled URL is invalid.
    #[error("building request URL: {0}")]
    Url(#[from] url::ParseError),

    /// Network-level failure.
    #[error("making request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response status is outside the operation's declared valid set.
    #[error("unexpected status code {code}: {reason}")]
    Status { code: u16, reason: String },

    /// A content-expecting status arrived with an empty body.
    #[error("response body unexpectedly empty at status {code}")]
    EmptyBody { code: u16 },

    /// The response body is not valid JSON.
    #[error("decoding response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response body has a shape the matching engine cannot process.
    #[error("unexpected response shape: {0}")]
    UnexpectedBody(String),

    /// Desired and observed values have incompatible kinds.
    #[error("type mismatch at {path:?}: {first} vs {second}")]
    TypeMismatch {
        path: String,
        first: String,
        second: String,
    },

    /// A search (single call or all pages) completed without a match.
    #[error("no item matched the resource identifiers")]
    NotFound,
}

impl Error {
    /// The HTTP status code carried by a [`Error::Status`], if any.
    ///
    /// Lets the control loop treat e.g. 404 as "resource absent" rather
    /// than "call failed".
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for the typed not-found outcome of a search.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_accessor() {
        let err = Error::Status {
            code: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.status_code(), Some(404));
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_distinguishable() {
        assert!(Error::NotFound.is_not_found());
        assert_eq!(Error::NotFound.status_code(), None);
    }
}

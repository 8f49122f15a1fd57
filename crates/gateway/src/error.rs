/// Errors from the collaborator gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The collaborator answered, and the record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The HTTP request itself failed (network, DNS, TLS, decode, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collaborator returned a non-2xx status code other than 404.
    #[error("Collaborator API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The collaborator answered without a field we depend on.
    #[error("Malformed collaborator response: missing {0}")]
    MissingField(&'static str),

    /// A configured collaborator base URL cannot carry record ids.
    #[error("Invalid collaborator URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The call did not complete within the configured bound.
    #[error("Collaborator call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

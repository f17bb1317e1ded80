use thiserror::Error;

/// Errors returned by the store API gateway. The sync loop treats every
/// variant as a transient transport failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The JSON envelope carried a `status` other than 200.
    #[error("API reported status {status}")]
    Api { status: u16 },

    /// The response body did not match the expected shape.
    #[error("malformed response for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL could not be parsed.
    #[error("invalid base URL '{0}'")]
    BaseUrl(String),
}

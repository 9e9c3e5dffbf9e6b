use thiserror::Error;

/// Top-level error type for the `mocolink-api` crate.
///
/// The link adapter service collapses every failure into a single
/// surface: the response envelope either carries a `message` (command
/// rejected) or the request never produced a decodable envelope at
/// all. `mocolink-core` treats all variants uniformly as a failed
/// request.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The envelope carried a `message`, i.e. the command was rejected.
    #[error("Link service error: {message}")]
    Api { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The command succeeded but the expected `data` payload was absent.
    #[error("Missing data payload in response to `{command}`")]
    MissingData { command: &'static str },
}

//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Callers mostly care about one distinction: whether the
//! requested resource was missing (`NotFound`) or the call failed for another reason.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::{EnvironmentClient, Error};
///
/// match client.list_environments("my-org", "my-repo").await {
///     Ok(environments) => println!("Found {} environments", environments.len()),
///     Err(Error::NotFound) => println!("Repository does not exist yet"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GitHub rejected the request.
    ///
    /// `status` is the HTTP status code when GitHub returned one. Requests that never
    /// reached GitHub (connection failures, URI problems) carry `None`.
    #[error("API request failed with status {status:?}: {message}")]
    ApiError {
        status: Option<u16>,
        message: String,
    },

    /// Authentication or GitHub client initialization failure.
    ///
    /// The contained string provides specific details about the authentication failure.
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A request path could not be built from the given owner, repository or
    /// environment name.
    #[error("Failed to build request path: {0}")]
    InvalidPath(String),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    ///
    /// This error occurs when a GitHub API request returns a 404 status code,
    /// indicating that the requested resource (repository, environment, variable, etc.)
    /// does not exist or is not accessible with the current authentication.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    ///
    /// Retrying is left to the caller.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Error {
    /// Returns `true` when the error represents a missing resource (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Maps an HTTP status code and GitHub message onto the matching error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Error::NotFound,
            429 => Error::RateLimitExceeded,
            403 if message.to_ascii_lowercase().contains("rate limit") => Error::RateLimitExceeded,
            _ => Error::ApiError {
                status: Some(status),
                message,
            },
        }
    }
}

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the envsync CLI application.
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication error occurred while building the GitHub client.
    ///
    /// Returned when no usable credentials were given, the private key cannot be read or
    /// GitHub refuses the credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration error occurred while loading or parsing the settings file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The existing environments could not be fetched, so nothing was changed.
    #[error("Failed to fetch existing environments: {0}")]
    Fetch(String),

    /// The reconciliation pass failed.
    #[error("Sync failed: {0}")]
    Sync(#[from] envsync_core::SyncError),

    /// The outcome could not be written.
    #[error("Failed to write output: {0}")]
    Output(String),
}

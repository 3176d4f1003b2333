//! Configuration module
//!
//! Handles CLI configuration including the server URL.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Stepwatch server
    pub server_url: String,
}

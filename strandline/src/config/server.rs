use serde::{Deserialize, Serialize};

use strandline_core::DEFAULT_MAX_ATTEMPTS;

fn default_max_retry_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

/// Transport configuration (`[server]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address to bind the server on.
    pub bind_address: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// Upper bound on retry driver attempts per mutation.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: usize,
}

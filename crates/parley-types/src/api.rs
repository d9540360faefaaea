use serde::{Deserialize, Serialize};

// -- Errors --

/// JSON body returned by the HTTP surface on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Health --

pub const HEALTH_MESSAGE: &str = "Parley chat server is running";

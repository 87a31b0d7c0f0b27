//! Request/response types for the HTTP API.

use serde::Serialize;

/// Error payload: a short machine-readable message, nothing more. Internal
/// detail stays in the server log.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response to a successful applet creation.
#[derive(Debug, Serialize)]
pub struct CreateAppletResponse {
    pub message: String,
    pub uuid: String,
    /// Server-generated filename the audio was stored under.
    pub file_name: String,
    pub index_file: String,
    pub index_timestamp_file: String,
}

/// Response to a successful applet change.
#[derive(Debug, Serialize)]
pub struct ChangeAppletResponse {
    pub message: String,
    pub uuid: String,
    pub file_name: String,
}

use serde::{Deserialize, Serialize};

/// A vote the client wishes to cast. IDs arrive as hex strings and are parsed
/// at the API boundary, so a malformed ID is a 400 rather than a 404.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub voter_id: String,
    #[serde(default)]
    pub candidate_id: String,
}

/// Bare acknowledgement: success carries no payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
}

impl Acknowledgement {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

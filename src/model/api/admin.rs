use serde::{Deserialize, Serialize};

/// Raw admin credentials, received from a user. Never stored directly, since
/// the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Successful admin login: the bearer token to present on admin endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub token: String,
    pub username: String,
}

impl AdminLoginResponse {
    pub fn new(token: String, username: String) -> Self {
        Self {
            success: true,
            token,
            username,
        }
    }
}

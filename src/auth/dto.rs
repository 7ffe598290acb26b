use serde::{Deserialize, Serialize};

/// Request body for admin login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "isLoggedIn")]
    pub is_logged_in: bool,
}

//! Wire types exchanged with the farm backend.

use serde::{Deserialize, Serialize};

/// A device attached to a farm, as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub serial: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A farm owned by the signed-in user. List responses may omit the
/// detail-only fields, which then decode to empty values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub detailed_address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Farm {
    /// Street address followed by the detailed address, if any.
    pub fn full_address(&self) -> String {
        let parts: Vec<&str> = [self.address.as_deref(), self.detailed_address.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// One device in a farm registration. The client-only `verified` flag is
/// never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePayload {
    pub serial: String,
    pub description: String,
}

/// Body of `POST /api/farms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmPayload {
    pub name: String,
    pub address: String,
    pub detailed_address: String,
    pub description: String,
    pub devices: Vec<DevicePayload>,
}

/// Outcome of `GET /api/devices/check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCheck {
    /// The serial exists and can be assigned to a new farm.
    Available,
    /// Unknown serial or already assigned; carries the server's reason if any.
    Unavailable { reason: Option<String> },
}

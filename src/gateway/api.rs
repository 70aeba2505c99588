//! Domain calls against the farm backend.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::ApiGateway;
use crate::errors::GatewayError;
use crate::models::{DeviceCheck, Farm, FarmPayload, LoginRequest, LoginResponse, SignupRequest};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const SIGNUP_PATH: &str = "/api/auth/signup";
pub const FARMS_PATH: &str = "/api/farms";
pub const DEVICE_CHECK_PATH: &str = "/api/devices/check";

/// Abstraction over the backend for testability.
/// Real implementation: `ApiGateway`. Test double: `ScriptedBackend`.
#[async_trait]
pub trait FarmBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GatewayError>;

    async fn signup(&self, request: &SignupRequest) -> Result<(), GatewayError>;

    async fn list_farms(&self) -> Result<Vec<Farm>, GatewayError>;

    async fn get_farm(&self, id: i64) -> Result<Farm, GatewayError>;

    /// Register a farm. The created farm is returned when the server echoes it.
    async fn create_farm(&self, payload: &FarmPayload) -> Result<Option<Farm>, GatewayError>;

    /// Read-only existence/assignability check for a device serial.
    async fn check_device(&self, serial: &str) -> Result<DeviceCheck, GatewayError>;
}

#[async_trait]
impl FarmBackend for ApiGateway {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GatewayError> {
        self.post(LOGIN_PATH, request).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<(), GatewayError> {
        self.post_raw(SIGNUP_PATH, request).await.map(|_| ())
    }

    async fn list_farms(&self) -> Result<Vec<Farm>, GatewayError> {
        self.get(FARMS_PATH).await
    }

    async fn get_farm(&self, id: i64) -> Result<Farm, GatewayError> {
        self.get(&format!("{}/{}", FARMS_PATH, id)).await
    }

    async fn create_farm(&self, payload: &FarmPayload) -> Result<Option<Farm>, GatewayError> {
        let raw = self.post_raw(FARMS_PATH, payload).await?;
        if raw.body.trim().is_empty() {
            debug!(status = raw.status, "Farm created without a response body");
            return Ok(None);
        }
        match serde_json::from_str::<Farm>(&raw.body) {
            Ok(farm) => Ok(Some(farm)),
            Err(e) => {
                warn!(status = raw.status, error = %e, "Farm created but the response body did not decode");
                Ok(None)
            }
        }
    }

    async fn check_device(&self, serial: &str) -> Result<DeviceCheck, GatewayError> {
        match self.get_raw(DEVICE_CHECK_PATH, &[("serial", serial)]).await {
            Ok(_) => Ok(DeviceCheck::Available),
            Err(err @ GatewayError::Http { .. }) => Ok(DeviceCheck::Unavailable {
                reason: err.server_message(),
            }),
            Err(err) => Err(err),
        }
    }
}

//! Per-row device verification.
//!
//! ```text
//! Unverified --check--> Checking --available--> Exists --confirm--> Verified
//!     ^                    |                      |
//!     |                    +--unavailable--> NotFound
//!     |                    |                      |
//!     +----cancel / acknowledge / failure / edit--+
//! ```
//!
//! A check never mutates server state. Only `confirm` marks a row verified,
//! and a verified row's serial and description are frozen.

use std::fmt;

use tracing::debug;

use crate::errors::{DraftError, GatewayError, MSG_SERVER_UNREACHABLE, ValidationError};
use crate::gateway::FarmBackend;
use crate::models::{DeviceCheck, DevicePayload};

/// Shown when the server rejected a serial without saying why.
pub const MSG_DEVICE_NOT_FOUND: &str = "해당 DEVICE가 존재하지 않습니다. 시리얼 번호를 확인해주세요.";

/// Stable identity of a device row, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(pub(crate) u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Unverified,
    Checking { generation: u64 },
    Exists,
    NotFound { message: String },
    Verified,
}

impl Verification {
    pub fn label(&self) -> &'static str {
        match self {
            Verification::Unverified => "unverified",
            Verification::Checking { .. } => "checking",
            Verification::Exists => "awaiting confirmation",
            Verification::NotFound { .. } => "not found",
            Verification::Verified => "verified",
        }
    }
}

/// Result of one device check, as applied to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Exists,
    NotFound { reason: Option<String> },
    /// The check itself failed; the row goes back to `Unverified`.
    Failed { message: String },
}

impl From<Result<DeviceCheck, GatewayError>> for CheckOutcome {
    fn from(result: Result<DeviceCheck, GatewayError>) -> Self {
        match result {
            Ok(DeviceCheck::Available) => CheckOutcome::Exists,
            Ok(DeviceCheck::Unavailable { reason }) => CheckOutcome::NotFound { reason },
            Err(err) => {
                debug!(error = %err, "Device check failed");
                CheckOutcome::Failed {
                    message: MSG_SERVER_UNREACHABLE.to_string(),
                }
            }
        }
    }
}

/// Handle for one in-flight check. Running it borrows nothing from the form,
/// so checks for different rows can be awaited together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub row: RowId,
    pub generation: u64,
    pub serial: String,
}

impl CheckTicket {
    pub async fn run(self, backend: &dyn FarmBackend) -> CheckResult {
        debug!(row = %self.row, serial = %self.serial, "Checking device serial");
        let outcome = CheckOutcome::from(backend.check_device(&self.serial).await);
        CheckResult {
            row: self.row,
            generation: self.generation,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub row: RowId,
    pub generation: u64,
    pub outcome: CheckOutcome,
}

/// One device row of a farm draft.
#[derive(Debug, Clone)]
pub struct DeviceDraft {
    id: RowId,
    serial: String,
    description: String,
    state: Verification,
    generation: u64,
}

impl DeviceDraft {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            serial: String::new(),
            description: String::new(),
            state: Verification::Unverified,
            generation: 0,
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> &Verification {
        &self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == Verification::Verified
    }

    /// Replace the serial. Any pending check or open result is abandoned.
    pub fn set_serial(&mut self, value: &str) -> Result<(), DraftError> {
        if self.is_verified() {
            return Err(DraftError::Locked);
        }
        if self.serial != value {
            self.serial = value.to_string();
            if self.state != Verification::Unverified {
                self.generation += 1;
                self.state = Verification::Unverified;
            }
        }
        Ok(())
    }

    pub fn set_description(&mut self, value: &str) -> Result<(), DraftError> {
        if self.is_verified() {
            return Err(DraftError::Locked);
        }
        self.description = value.to_string();
        Ok(())
    }

    /// Enter `Checking`. Empty serials fail before any request is made.
    pub fn begin_check(&mut self) -> Result<CheckTicket, DraftError> {
        let serial = self.serial.trim();
        if serial.is_empty() {
            return Err(ValidationError::EmptySerial.into());
        }
        if self.state != Verification::Unverified {
            return Err(self.invalid("check"));
        }
        self.generation += 1;
        self.state = Verification::Checking {
            generation: self.generation,
        };
        Ok(CheckTicket {
            row: self.id,
            generation: self.generation,
            serial: serial.to_string(),
        })
    }

    /// Apply a check result. Returns `false` when the result is stale.
    pub fn complete_check(&mut self, generation: u64, outcome: &CheckOutcome) -> bool {
        if self.state != (Verification::Checking { generation }) {
            debug!(row = %self.id, generation, "Discarding stale device check result");
            return false;
        }
        self.state = match outcome {
            CheckOutcome::Exists => Verification::Exists,
            CheckOutcome::NotFound { reason } => Verification::NotFound {
                message: reason
                    .clone()
                    .unwrap_or_else(|| MSG_DEVICE_NOT_FOUND.to_string()),
            },
            CheckOutcome::Failed { .. } => Verification::Unverified,
        };
        true
    }

    /// `Exists → Verified`.
    pub fn confirm(&mut self) -> Result<(), DraftError> {
        if self.state != Verification::Exists {
            return Err(self.invalid("confirm"));
        }
        self.state = Verification::Verified;
        Ok(())
    }

    /// `Exists → Unverified`.
    pub fn cancel(&mut self) -> Result<(), DraftError> {
        if self.state != Verification::Exists {
            return Err(self.invalid("cancel"));
        }
        self.state = Verification::Unverified;
        Ok(())
    }

    /// `NotFound → Unverified`.
    pub fn acknowledge(&mut self) -> Result<(), DraftError> {
        if !matches!(self.state, Verification::NotFound { .. }) {
            return Err(self.invalid("acknowledge"));
        }
        self.state = Verification::Unverified;
        Ok(())
    }

    pub fn to_payload(&self) -> DevicePayload {
        DevicePayload {
            serial: self.serial.trim().to_string(),
            description: self.description.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> DraftError {
        DraftError::InvalidTransition {
            action,
            state: self.state.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::api::mock::{ScriptedBackend, http_error};

    fn row(serial: &str) -> DeviceDraft {
        let mut draft = DeviceDraft::new(RowId(1));
        draft.set_serial(serial).unwrap();
        draft
    }

    #[test]
    fn test_empty_serial_never_enters_checking() {
        let mut draft = row("   ");
        let err = draft.begin_check().unwrap_err();
        assert_eq!(err, DraftError::Validation(ValidationError::EmptySerial));
        assert_eq!(draft.state(), &Verification::Unverified);
    }

    #[test]
    fn test_check_ticket_carries_trimmed_serial() {
        let mut draft = row("  ADMIN1 ");
        let ticket = draft.begin_check().unwrap();
        assert_eq!(ticket.serial, "ADMIN1");
        assert!(matches!(draft.state(), Verification::Checking { .. }));
    }

    #[test]
    fn test_exists_then_confirm_verifies_and_locks() {
        let mut draft = row("ADMIN1");
        let ticket = draft.begin_check().unwrap();
        assert!(draft.complete_check(ticket.generation, &CheckOutcome::Exists));
        assert_eq!(draft.state(), &Verification::Exists);

        draft.confirm().unwrap();
        assert!(draft.is_verified());
        assert_eq!(draft.set_serial("OTHER"), Err(DraftError::Locked));
        assert_eq!(draft.set_description("x"), Err(DraftError::Locked));
        assert_eq!(draft.serial(), "ADMIN1");
    }

    #[test]
    fn test_exists_then_cancel_returns_to_unverified() {
        let mut draft = row("ADMIN1");
        let ticket = draft.begin_check().unwrap();
        draft.complete_check(ticket.generation, &CheckOutcome::Exists);
        draft.cancel().unwrap();
        assert_eq!(draft.state(), &Verification::Unverified);
        assert!(draft.set_serial("ADMIN2").is_ok());
    }

    #[test]
    fn test_not_found_uses_fallback_message_and_acknowledge() {
        let mut draft = row("UNKNOWN");
        let ticket = draft.begin_check().unwrap();
        draft.complete_check(ticket.generation, &CheckOutcome::NotFound { reason: None });
        assert_eq!(
            draft.state(),
            &Verification::NotFound {
                message: MSG_DEVICE_NOT_FOUND.to_string()
            }
        );
        assert!(draft.confirm().is_err());

        draft.acknowledge().unwrap();
        assert_eq!(draft.state(), &Verification::Unverified);
        assert!(!draft.is_verified());
        draft.set_serial("ADMIN1").unwrap();
    }

    #[test]
    fn test_not_found_keeps_server_reason() {
        let mut draft = row("SN-9");
        let ticket = draft.begin_check().unwrap();
        draft.complete_check(
            ticket.generation,
            &CheckOutcome::NotFound {
                reason: Some("이미 다른 농장에 등록된 디바이스입니다.".into()),
            },
        );
        assert!(matches!(
            draft.state(),
            Verification::NotFound { message } if message == "이미 다른 농장에 등록된 디바이스입니다."
        ));
    }

    #[test]
    fn test_failed_check_returns_to_unverified() {
        let mut draft = row("ADMIN1");
        let ticket = draft.begin_check().unwrap();
        let applied = draft.complete_check(
            ticket.generation,
            &CheckOutcome::Failed {
                message: MSG_SERVER_UNREACHABLE.into(),
            },
        );
        assert!(applied);
        assert_eq!(draft.state(), &Verification::Unverified);
    }

    #[test]
    fn test_editing_serial_during_check_discards_result() {
        let mut draft = row("ADMIN1");
        let ticket = draft.begin_check().unwrap();
        draft.set_serial("ADMIN2").unwrap();

        assert!(!draft.complete_check(ticket.generation, &CheckOutcome::Exists));
        assert_eq!(draft.state(), &Verification::Unverified);
    }

    #[test]
    fn test_cannot_check_twice_or_recheck_verified() {
        let mut draft = row("ADMIN1");
        let ticket = draft.begin_check().unwrap();
        assert!(matches!(
            draft.begin_check(),
            Err(DraftError::InvalidTransition { action: "check", .. })
        ));
        draft.complete_check(ticket.generation, &CheckOutcome::Exists);
        draft.confirm().unwrap();
        assert!(matches!(
            draft.begin_check(),
            Err(DraftError::InvalidTransition { state: "verified", .. })
        ));
    }

    #[test]
    fn test_gateway_errors_map_to_outcomes() {
        let outcome = CheckOutcome::from(Err(http_error("/api/devices/check", 500, None)));
        assert!(matches!(outcome, CheckOutcome::Failed { .. }));
        assert_eq!(
            CheckOutcome::from(Ok(DeviceCheck::Available)),
            CheckOutcome::Exists
        );
    }

    #[tokio::test]
    async fn test_ticket_runs_against_backend() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut draft = row("ADMIN1");
        let result = draft.begin_check().unwrap().run(&backend).await;

        assert_eq!(result.row, RowId(1));
        assert_eq!(result.outcome, CheckOutcome::Exists);
        assert_eq!(backend.checked.lock().unwrap().as_slice(), ["ADMIN1"]);
    }
}

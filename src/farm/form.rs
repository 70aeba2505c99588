//! Add-farm form controller.
//!
//! Owns the [`FarmDraft`] and its device rows. Submission is gated on every
//! row being verified; on failure the draft is left untouched so the user can
//! retry.

use tracing::{debug, info, warn};

use super::address::AddressPicker;
use crate::device::{CheckOutcome, CheckResult, CheckTicket, DeviceDraft, RowId, Verification};
use crate::errors::{FormError, ValidationError};
use crate::gateway::FarmBackend;
use crate::models::{Farm, FarmPayload};

/// Generic failure shown when the server sent no text.
pub const MSG_SUBMIT_FAILED: &str = "농장 등록에 실패했습니다. 잠시 후 다시 시도해주세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmField {
    Name,
    Address,
    DetailedAddress,
    Description,
}

impl FarmField {
    pub fn label(self) -> &'static str {
        match self {
            FarmField::Name => "농장 이름",
            FarmField::Address => "주소",
            FarmField::DetailedAddress => "상세 주소",
            FarmField::Description => "설명",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    Serial,
    Description,
}

/// Farm fields plus a never-empty list of device rows.
#[derive(Debug, Clone)]
pub struct FarmDraft {
    pub name: String,
    pub address: String,
    pub detailed_address: String,
    pub description: String,
    devices: Vec<DeviceDraft>,
}

impl FarmDraft {
    pub fn devices(&self) -> &[DeviceDraft] {
        &self.devices
    }

    pub fn all_verified(&self) -> bool {
        self.devices.iter().all(DeviceDraft::is_verified)
    }

    /// Build the request body, enforcing the submission guards in order:
    /// verified devices first, then required fields.
    pub fn to_payload(&self) -> Result<FarmPayload, ValidationError> {
        if !self.all_verified() {
            return Err(ValidationError::UnverifiedDevices);
        }
        for (field, value) in [
            (FarmField::Name, &self.name),
            (FarmField::Address, &self.address),
            (FarmField::Description, &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    field: field.label(),
                });
            }
        }
        Ok(FarmPayload {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            detailed_address: self.detailed_address.trim().to_string(),
            description: self.description.trim().to_string(),
            devices: self.devices.iter().map(DeviceDraft::to_payload).collect(),
        })
    }
}

/// Verification dialog, derived from row states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Closed,
    Checking {
        index: usize,
    },
    Result {
        index: usize,
        exists: bool,
        message: Option<String>,
    },
}

/// What a completed check did to its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReport {
    /// The row was removed or edited while the check was in flight.
    Stale,
    Exists { index: usize },
    NotFound { index: usize, message: String },
    Failed { index: usize, message: String },
}

pub struct FarmForm {
    draft: FarmDraft,
    next_row: u64,
}

impl Default for FarmForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FarmForm {
    /// An empty form with a single device row.
    pub fn new() -> Self {
        let mut form = Self {
            draft: FarmDraft {
                name: String::new(),
                address: String::new(),
                detailed_address: String::new(),
                description: String::new(),
                devices: Vec::new(),
            },
            next_row: 0,
        };
        form.add_device_row();
        form
    }

    pub fn draft(&self) -> &FarmDraft {
        &self.draft
    }

    pub fn devices(&self) -> &[DeviceDraft] {
        &self.draft.devices
    }

    pub fn device(&self, index: usize) -> Result<&DeviceDraft, FormError> {
        self.draft
            .devices
            .get(index)
            .ok_or(FormError::RowOutOfRange { index })
    }

    fn device_mut(&mut self, index: usize) -> Result<&mut DeviceDraft, FormError> {
        self.draft
            .devices
            .get_mut(index)
            .ok_or(FormError::RowOutOfRange { index })
    }

    fn index_of(&self, row: RowId) -> Option<usize> {
        self.draft.devices.iter().position(|d| d.id() == row)
    }

    pub fn add_device_row(&mut self) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.draft.devices.push(DeviceDraft::new(id));
        id
    }

    /// Remove a row. Removing the only row is a no-op and returns `false`.
    pub fn remove_device_row(&mut self, index: usize) -> Result<bool, FormError> {
        if index >= self.draft.devices.len() {
            return Err(FormError::RowOutOfRange { index });
        }
        if self.draft.devices.len() == 1 {
            debug!("Refusing to remove the last device row");
            return Ok(false);
        }
        self.draft.devices.remove(index);
        Ok(true)
    }

    pub fn update_field(&mut self, field: FarmField, value: &str) {
        let slot = match field {
            FarmField::Name => &mut self.draft.name,
            FarmField::Address => &mut self.draft.address,
            FarmField::DetailedAddress => &mut self.draft.detailed_address,
            FarmField::Description => &mut self.draft.description,
        };
        *slot = value.to_string();
    }

    pub fn update_device(
        &mut self,
        index: usize,
        field: DeviceField,
        value: &str,
    ) -> Result<(), FormError> {
        let device = self.device_mut(index)?;
        let result = match field {
            DeviceField::Serial => device.set_serial(value),
            DeviceField::Description => device.set_description(value),
        };
        result.map_err(|e| FormError::for_row(index, e))
    }

    /// Ask the address picker for a street address. Returns `true` when the
    /// address changed.
    pub async fn pick_address(&mut self, picker: &dyn AddressPicker) -> Result<bool, FormError> {
        let picked = picker.pick().await.map_err(FormError::AddressLookup)?;
        match picked.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()) {
            Some(address) => {
                self.update_field(FarmField::Address, &address);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Put row `index` into `Checking` and hand back the ticket to run.
    pub fn begin_check(&mut self, index: usize) -> Result<CheckTicket, FormError> {
        self.device_mut(index)?
            .begin_check()
            .map_err(|e| FormError::for_row(index, e))
    }

    /// Apply a finished check to whichever row it belongs to now.
    pub fn complete_check(&mut self, result: CheckResult) -> CheckReport {
        let Some(index) = self.index_of(result.row) else {
            debug!(row = %result.row, "Check finished for a removed row");
            return CheckReport::Stale;
        };
        let device = &mut self.draft.devices[index];
        if !device.complete_check(result.generation, &result.outcome) {
            return CheckReport::Stale;
        }
        match (&result.outcome, device.state()) {
            (CheckOutcome::Failed { message }, _) => CheckReport::Failed {
                index,
                message: message.clone(),
            },
            (_, Verification::NotFound { message }) => CheckReport::NotFound {
                index,
                message: message.clone(),
            },
            _ => CheckReport::Exists { index },
        }
    }

    /// Begin, run and apply a check for one row.
    pub async fn check_device(
        &mut self,
        index: usize,
        backend: &dyn FarmBackend,
    ) -> Result<CheckReport, FormError> {
        let ticket = self.begin_check(index)?;
        let result = ticket.run(backend).await;
        Ok(self.complete_check(result))
    }

    pub fn confirm_device(&mut self, index: usize) -> Result<(), FormError> {
        self.device_mut(index)?
            .confirm()
            .map_err(|e| FormError::for_row(index, e))
    }

    pub fn cancel_device(&mut self, index: usize) -> Result<(), FormError> {
        self.device_mut(index)?
            .cancel()
            .map_err(|e| FormError::for_row(index, e))
    }

    pub fn acknowledge_device(&mut self, index: usize) -> Result<(), FormError> {
        self.device_mut(index)?
            .acknowledge()
            .map_err(|e| FormError::for_row(index, e))
    }

    /// The dialog to show: the first row awaiting a decision, else the first
    /// row being checked.
    pub fn dialog(&self) -> Dialog {
        let devices = &self.draft.devices;
        let decided = devices.iter().enumerate().find_map(|(index, d)| match d.state() {
            Verification::Exists => Some(Dialog::Result {
                index,
                exists: true,
                message: None,
            }),
            Verification::NotFound { message } => Some(Dialog::Result {
                index,
                exists: false,
                message: Some(message.clone()),
            }),
            _ => None,
        });
        if let Some(dialog) = decided {
            return dialog;
        }
        devices
            .iter()
            .position(|d| matches!(d.state(), Verification::Checking { .. }))
            .map(|index| Dialog::Checking { index })
            .unwrap_or(Dialog::Closed)
    }

    /// Validate and send the registration.
    ///
    /// Validation failures never reach the backend. Any failure leaves the
    /// draft as it was.
    pub async fn submit(&mut self, backend: &dyn FarmBackend) -> Result<Option<Farm>, FormError> {
        let payload = self.draft.to_payload()?;
        debug!(devices = payload.devices.len(), "Submitting farm");
        match backend.create_farm(&payload).await {
            Ok(farm) => {
                info!(name = %payload.name, "Farm registered");
                Ok(farm)
            }
            Err(err) => {
                warn!(error = %err, "Farm registration failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MSG_SERVER_UNREACHABLE;
    use crate::gateway::api::mock::{ScriptedBackend, http_error};
    use crate::models::DeviceCheck;

    fn filled_form() -> FarmForm {
        let mut form = FarmForm::new();
        form.update_field(FarmField::Name, "SEOUL FARM");
        form.update_field(FarmField::Address, "서울 강남구 테헤란로 1");
        form.update_field(FarmField::DetailedAddress, "3층");
        form.update_field(FarmField::Description, "수직농법 엽채류 농장");
        form
    }

    async fn verify(form: &mut FarmForm, index: usize, serial: &str, backend: &ScriptedBackend) {
        form.update_device(index, DeviceField::Serial, serial).unwrap();
        let report = form.check_device(index, backend).await.unwrap();
        assert_eq!(report, CheckReport::Exists { index });
        form.confirm_device(index).unwrap();
    }

    #[test]
    fn test_new_form_has_one_row() {
        let form = FarmForm::new();
        assert_eq!(form.devices().len(), 1);
        assert_eq!(form.dialog(), Dialog::Closed);
    }

    #[test]
    fn test_removing_last_row_is_noop() {
        let mut form = FarmForm::new();
        assert!(!form.remove_device_row(0).unwrap());
        assert_eq!(form.devices().len(), 1);

        form.add_device_row();
        form.add_device_row();
        assert!(form.remove_device_row(1).unwrap());
        assert!(form.remove_device_row(0).unwrap());
        assert!(!form.remove_device_row(0).unwrap());
        assert_eq!(form.devices().len(), 1);
    }

    #[test]
    fn test_remove_out_of_range_is_an_error() {
        let mut form = FarmForm::new();
        assert!(matches!(
            form.remove_device_row(5),
            Err(FormError::RowOutOfRange { index: 5 })
        ));
    }

    #[tokio::test]
    async fn test_check_admin1_confirm_makes_row_verified_and_immutable() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.update_device(0, DeviceField::Serial, "ADMIN1").unwrap();

        let report = form.check_device(0, &backend).await.unwrap();
        assert_eq!(report, CheckReport::Exists { index: 0 });
        assert_eq!(
            form.dialog(),
            Dialog::Result {
                index: 0,
                exists: true,
                message: None
            }
        );

        form.confirm_device(0).unwrap();
        assert!(form.device(0).unwrap().is_verified());
        assert_eq!(form.dialog(), Dialog::Closed);
        assert!(matches!(
            form.update_device(0, DeviceField::Serial, "X"),
            Err(FormError::RowLocked { index: 0 })
        ));
        assert!(matches!(
            form.update_device(0, DeviceField::Description, "X"),
            Err(FormError::RowLocked { index: 0 })
        ));
    }

    #[tokio::test]
    async fn test_check_unknown_acknowledge_leaves_row_editable() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.update_device(0, DeviceField::Serial, "UNKNOWN").unwrap();

        let report = form.check_device(0, &backend).await.unwrap();
        assert!(matches!(report, CheckReport::NotFound { index: 0, .. }));
        assert!(matches!(
            form.dialog(),
            Dialog::Result { index: 0, exists: false, .. }
        ));

        form.acknowledge_device(0).unwrap();
        assert!(!form.device(0).unwrap().is_verified());
        form.update_device(0, DeviceField::Serial, "ADMIN1").unwrap();
        assert_eq!(form.device(0).unwrap().serial(), "ADMIN1");
    }

    #[tokio::test]
    async fn test_empty_serial_check_never_calls_backend() {
        let backend = ScriptedBackend::new();
        let mut form = FarmForm::new();
        let err = form.check_device(0, &backend).await.unwrap_err();
        assert!(matches!(
            err,
            FormError::Validation(ValidationError::EmptySerial)
        ));
        assert!(backend.checked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verifying_one_row_leaves_others_alone() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1", "ADMIN2"]);
        let mut form = filled_form();
        form.add_device_row();
        form.add_device_row();
        form.update_device(2, DeviceField::Serial, "ADMIN2").unwrap();

        verify(&mut form, 1, "ADMIN1", &backend).await;

        let flags: Vec<bool> = form.devices().iter().map(DeviceDraft::is_verified).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_concurrent_checks_are_independent() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.add_device_row();
        form.update_device(0, DeviceField::Serial, "ADMIN1").unwrap();
        form.update_device(1, DeviceField::Serial, "UNKNOWN").unwrap();

        let first = form.begin_check(0).unwrap();
        let second = form.begin_check(1).unwrap();
        assert_eq!(form.dialog(), Dialog::Checking { index: 0 });

        let (r1, r2) = futures::join!(first.run(&backend), second.run(&backend));
        // Results may land in any order.
        assert!(matches!(form.complete_check(r2), CheckReport::NotFound { index: 1, .. }));
        assert_eq!(form.complete_check(r1), CheckReport::Exists { index: 0 });

        assert_eq!(form.device(0).unwrap().state(), &Verification::Exists);
        assert!(matches!(
            form.device(1).unwrap().state(),
            Verification::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_result_for_removed_row_is_stale() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.add_device_row();
        form.update_device(1, DeviceField::Serial, "ADMIN1").unwrap();

        let ticket = form.begin_check(1).unwrap();
        form.remove_device_row(1).unwrap();
        let result = ticket.run(&backend).await;
        assert_eq!(form.complete_check(result), CheckReport::Stale);
        assert_eq!(form.devices().len(), 1);
    }

    #[tokio::test]
    async fn test_result_follows_row_after_reindexing() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.add_device_row();
        form.update_device(1, DeviceField::Serial, "ADMIN1").unwrap();

        let ticket = form.begin_check(1).unwrap();
        form.remove_device_row(0).unwrap();
        let result = ticket.run(&backend).await;
        assert_eq!(form.complete_check(result), CheckReport::Exists { index: 0 });
    }

    #[test]
    fn test_failed_check_reports_message() {
        let mut form = filled_form();
        form.update_device(0, DeviceField::Serial, "ADMIN1").unwrap();
        let ticket = form.begin_check(0).unwrap();
        let result = CheckResult {
            row: ticket.row,
            generation: ticket.generation,
            outcome: CheckOutcome::from(Err::<DeviceCheck, _>(http_error(
                "/api/devices/check",
                502,
                None,
            ))),
        };
        assert_eq!(
            form.complete_check(result),
            CheckReport::Failed {
                index: 0,
                message: MSG_SERVER_UNREACHABLE.to_string()
            }
        );
        assert_eq!(form.device(0).unwrap().state(), &Verification::Unverified);
    }

    #[tokio::test]
    async fn test_submit_with_unverified_device_never_posts() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = filled_form();
        form.add_device_row();
        verify(&mut form, 0, "ADMIN1", &backend).await;
        form.update_device(1, DeviceField::Serial, "ADMIN2").unwrap();

        let err = form.submit(&backend).await.unwrap_err();
        assert_eq!(err.to_string(), "모든 디바이스를 조회하고 등록해주세요.");
        assert_eq!(backend.created_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_requires_farm_fields() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        let mut form = FarmForm::new();
        verify(&mut form, 0, "ADMIN1", &backend).await;

        let err = form.submit(&backend).await.unwrap_err();
        assert!(matches!(
            err,
            FormError::Validation(ValidationError::MissingField { field: "농장 이름" })
        ));
        assert_eq!(backend.created_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_sends_serial_and_description_only() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1", "ADMIN2"]);
        let mut form = filled_form();
        form.add_device_row();
        form.update_device(0, DeviceField::Description, "온실 A").unwrap();
        verify(&mut form, 0, " ADMIN1 ", &backend).await;
        verify(&mut form, 1, "ADMIN2", &backend).await;

        form.submit(&backend).await.unwrap();

        let created = backend.created.lock().unwrap();
        let payload = &created[0];
        assert_eq!(payload.name, "SEOUL FARM");
        assert_eq!(payload.detailed_address, "3층");
        assert_eq!(payload.devices.len(), 2);
        assert_eq!(payload.devices[0].serial, "ADMIN1");
        assert_eq!(payload.devices[0].description, "온실 A");
    }

    #[tokio::test]
    async fn test_failed_submit_preserves_draft() {
        let backend = ScriptedBackend::new().with_available(&["ADMIN1"]);
        backend.push_create(Err(http_error(
            "/api/farms",
            400,
            Some("이미 다른 농장에 등록된 디바이스입니다."),
        )));
        let mut form = filled_form();
        verify(&mut form, 0, "ADMIN1", &backend).await;

        let err = form.submit(&backend).await.unwrap_err();
        assert_eq!(
            err.user_message(MSG_SUBMIT_FAILED),
            "이미 다른 농장에 등록된 디바이스입니다."
        );
        assert_eq!(form.draft().name, "SEOUL FARM");
        assert!(form.device(0).unwrap().is_verified());

        // Retry goes through with the same draft.
        form.submit(&backend).await.unwrap();
        assert_eq!(backend.created_count(), 2);
    }

    #[tokio::test]
    async fn test_pick_address_updates_only_on_choice() {
        use crate::farm::address::FixedAddress;

        let mut form = FarmForm::new();
        let changed = form
            .pick_address(&FixedAddress(Some(" 서울 중구 세종대로 110 ".into())))
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(form.draft().address, "서울 중구 세종대로 110");

        let changed = form.pick_address(&FixedAddress(None)).await.unwrap();
        assert!(!changed);
        assert_eq!(form.draft().address, "서울 중구 세종대로 110");
    }
}

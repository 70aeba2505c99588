//! Plain-text rendering of screens and notices.
//!
//! Everything here returns a `String` so commands decide where it goes.

use std::fmt::Write as _;

use console::style;

use crate::app::{Notice, NoticeLevel};
use crate::device::{DeviceDraft, Verification};
use crate::farm::{Dialog, ViewState};
use crate::models::Farm;
use crate::ui::icons::{CHECK, CROSS, DEVICE, FARM, LOCK, PIN, SEARCH};

pub const MSG_LIST_LOADING: &str = "농장 목록을 불러오는 중...";
pub const MSG_DETAIL_LOADING: &str = "농장 정보를 불러오는 중...";
pub const MSG_NO_FARMS: &str = "등록된 농장이 없습니다. 새 농장을 추가해보세요!";
pub const MSG_NO_DEVICES: &str = "등록된 디바이스 없음";

pub fn notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => format!("{}{}", CHECK, style(&notice.message).green()),
        NoticeLevel::Error => format!("{}{}", CROSS, style(&notice.message).red()),
    }
}

pub fn farm_list(state: &ViewState<Vec<Farm>>) -> String {
    let farms = match state {
        ViewState::Loading => return MSG_LIST_LOADING.to_string(),
        ViewState::Error(message) => return format!("{}{}", CROSS, style(message).red()),
        ViewState::Loaded(farms) if farms.is_empty() => return MSG_NO_FARMS.to_string(),
        ViewState::Loaded(farms) => farms,
    };

    let mut out = format!("{}\n", style("내 농장 목록").bold());
    for farm in farms {
        let _ = write!(out, "{}{:>4}  {}", FARM, farm.id, style(&farm.name).cyan());
        let address = farm.full_address();
        if !address.is_empty() {
            let _ = write!(out, "  {}{}", PIN, style(address).dim());
        }
        out.push('\n');
    }
    out
}

pub fn farm_detail(state: &ViewState<Farm>) -> String {
    let farm = match state {
        ViewState::Loading => return MSG_DETAIL_LOADING.to_string(),
        ViewState::Error(message) => return format!("{}{}", CROSS, style(message).red()),
        ViewState::Loaded(farm) => farm,
    };

    let mut out = format!("{}{}\n", FARM, style(&farm.name).bold());
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "  주소: {}", field(&farm.address));
    let _ = writeln!(out, "  상세 주소: {}", field(&farm.detailed_address));
    let _ = writeln!(out, "  설명: {}", field(&farm.description));
    out.push('\n');

    if farm.devices.is_empty() {
        let _ = writeln!(out, "  {}", style(MSG_NO_DEVICES).dim());
        return out;
    }
    let _ = writeln!(out, "  디바이스 ({})", farm.devices.len());
    for device in &farm.devices {
        let _ = write!(out, "  {}{}", DEVICE, device.serial);
        if let Some(description) = device.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, "  {}", style(description).dim());
        }
        out.push('\n');
    }
    out
}

fn verification_label(state: &Verification) -> String {
    match state {
        Verification::Unverified => style("미확인").yellow().to_string(),
        Verification::Checking { .. } => style("조회 중").cyan().to_string(),
        Verification::Exists => style("확인 대기").cyan().to_string(),
        Verification::NotFound { .. } => style("없음").red().to_string(),
        Verification::Verified => format!("{}{}", LOCK, style("등록됨").green()),
    }
}

/// One line per device row, numbered from 1.
pub fn device_rows(devices: &[DeviceDraft]) -> String {
    let mut out = String::new();
    for (i, device) in devices.iter().enumerate() {
        let serial = if device.serial().trim().is_empty() {
            style("(비어 있음)").dim().to_string()
        } else {
            device.serial().to_string()
        };
        let _ = write!(
            out,
            "  {}. {}{}  [{}]",
            i + 1,
            DEVICE,
            serial,
            verification_label(device.state())
        );
        if !device.description().is_empty() {
            let _ = write!(out, "  {}", style(device.description()).dim());
        }
        out.push('\n');
    }
    out
}

/// Text of the modal dialog, if one is open.
pub fn dialog(dialog: &Dialog, devices: &[DeviceDraft]) -> Option<String> {
    let serial = |index: usize| {
        devices
            .get(index)
            .map(|d| d.serial().trim().to_string())
            .unwrap_or_default()
    };
    match dialog {
        Dialog::Closed => None,
        Dialog::Checking { index } => Some(format!(
            "{}{} 조회 중... 잠시만 기다려주세요.",
            SEARCH,
            serial(*index)
        )),
        Dialog::Result {
            index,
            exists: true,
            ..
        } => Some(format!(
            "디바이스 {}가 존재합니다. 등록하시겠습니까?",
            serial(*index)
        )),
        Dialog::Result {
            exists: false,
            message,
            ..
        } => Some(format!(
            "{}{}",
            CROSS,
            message.as_deref().unwrap_or(crate::device::MSG_DEVICE_NOT_FOUND)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RowId;
    use crate::models::Device;
    use console::strip_ansi_codes;

    fn farm(devices: Vec<Device>) -> Farm {
        Farm {
            id: 7,
            name: "SEOUL FARM".into(),
            address: Some("서울 강남구".into()),
            detailed_address: Some("101호".into()),
            description: None,
            devices,
        }
    }

    #[test]
    fn test_list_states() {
        assert_eq!(farm_list(&ViewState::Loading), MSG_LIST_LOADING);
        assert_eq!(farm_list(&ViewState::Loaded(Vec::new())), MSG_NO_FARMS);

        let error = farm_list(&ViewState::Error("실패".into()));
        assert!(strip_ansi_codes(&error).contains("실패"));
    }

    #[test]
    fn test_list_shows_name_and_full_address() {
        let out = farm_list(&ViewState::Loaded(vec![farm(Vec::new())]));
        let plain = strip_ansi_codes(&out);
        assert!(plain.contains("SEOUL FARM"));
        assert!(plain.contains("서울 강남구 101호"));
        assert!(plain.contains('7'));
    }

    #[test]
    fn test_detail_without_devices() {
        let out = farm_detail(&ViewState::Loaded(farm(Vec::new())));
        let plain = strip_ansi_codes(&out);
        assert!(plain.contains(MSG_NO_DEVICES));
        assert!(plain.contains("설명: -"));
    }

    #[test]
    fn test_detail_lists_devices() {
        let out = farm_detail(&ViewState::Loaded(farm(vec![Device {
            id: 1,
            serial: "ADMIN1".into(),
            description: Some("온도 센서".into()),
        }])));
        let plain = strip_ansi_codes(&out);
        assert!(plain.contains("ADMIN1"));
        assert!(plain.contains("온도 센서"));
        assert!(!plain.contains(MSG_NO_DEVICES));
    }

    #[test]
    fn test_dialog_text() {
        let mut device = DeviceDraft::new(RowId(0));
        device.set_serial(" ADMIN1 ").unwrap();
        let devices = vec![device];

        assert_eq!(dialog(&Dialog::Closed, &devices), None);
        let exists = dialog(
            &Dialog::Result {
                index: 0,
                exists: true,
                message: None,
            },
            &devices,
        )
        .unwrap();
        assert_eq!(exists, "디바이스 ADMIN1가 존재합니다. 등록하시겠습니까?");

        let missing = dialog(
            &Dialog::Result {
                index: 0,
                exists: false,
                message: Some("등록되지 않은 디바이스 시리얼입니다".into()),
            },
            &devices,
        )
        .unwrap();
        assert!(missing.contains("등록되지 않은 디바이스 시리얼입니다"));
    }

    #[test]
    fn test_device_rows_are_numbered() {
        let devices = vec![DeviceDraft::new(RowId(0)), DeviceDraft::new(RowId(1))];
        let plain = strip_ansi_codes(&device_rows(&devices)).to_string();
        assert!(plain.contains("1. "));
        assert!(plain.contains("2. "));
        assert!(plain.contains("미확인"));
    }
}

//! Farm commands: `smartfarm farms list|show|add`.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Input, Select};
use smartfarm::app::{App, MSG_LOGIN_REQUIRED, Route, Screen};
use smartfarm::config::ClientConfig;
use smartfarm::farm::{
    AddressPicker, CheckReport, DeviceField, FarmField, FarmForm, ViewState,
};
use smartfarm::ui::icons::{CROSS, SPARKLE};
use smartfarm::ui::progress::{Spinner, with_spinner};
use smartfarm::ui::render;
use tracing::debug;

use super::{flush_notices, open_app};

/// Reads the street address from the terminal in place of a postcode
/// search widget.
pub struct PromptAddressPicker;

#[async_trait]
impl AddressPicker for PromptAddressPicker {
    async fn pick(&self) -> Result<Option<String>> {
        let address = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("농장 주소 (도로명 또는 지번)")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .context("Address prompt panicked")?
        .context("Failed to read address")?;
        Ok(Some(address))
    }
}

fn require_login(app: &mut App, taken: Route) -> Result<()> {
    if taken == Route::Auth {
        // Drop the redirect notice; the error below says the same thing.
        app.take_notices();
        bail!("{} Run `smartfarm login` first.", MSG_LOGIN_REQUIRED);
    }
    Ok(())
}

pub async fn cmd_farms_list(config: &ClientConfig) -> Result<()> {
    let mut app = open_app(config)?;
    let taken = with_spinner(render::MSG_LIST_LOADING, app.open(Route::FarmList)).await;
    require_login(&mut app, taken)?;

    let Screen::FarmList(view) = app.screen() else {
        bail!("Farm list did not open");
    };
    if let ViewState::Error(message) = view.state() {
        bail!("{}", message);
    }
    println!("{}", render::farm_list(view.state()).trim_end());
    Ok(())
}

pub async fn cmd_farms_show(config: &ClientConfig, id: i64) -> Result<()> {
    let mut app = open_app(config)?;
    let taken = with_spinner(render::MSG_DETAIL_LOADING, app.open(Route::FarmDetail(id))).await;
    require_login(&mut app, taken)?;

    let Screen::FarmDetail(view) = app.screen() else {
        bail!("Farm detail did not open");
    };
    if let ViewState::Error(message) = view.state() {
        bail!("{}", message);
    }
    println!("{}", render::farm_detail(view.state()).trim_end());
    Ok(())
}

fn form(app: &mut App) -> Result<&mut FarmForm> {
    app.farm_form()
        .ok_or_else(|| anyhow!("The add-farm form is not open"))
}

fn prompt_text(prompt: &str, initial: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read {}", prompt))
}

fn pick_row(form: &FarmForm, prompt: &str) -> Result<usize> {
    if form.devices().len() == 1 {
        return Ok(0);
    }
    let items: Vec<String> = form
        .devices()
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let serial = d.serial().trim();
            format!("{}. {}", i + 1, if serial.is_empty() { "(비어 있음)" } else { serial })
        })
        .collect();
    Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to read device selection")
}

async fn fill_farm_fields(form: &mut FarmForm) -> Result<()> {
    let name = prompt_text("농장 이름", &form.draft().name)?;
    form.update_field(FarmField::Name, &name);
    form.pick_address(&PromptAddressPicker).await?;
    let detailed = prompt_text("상세 주소", &form.draft().detailed_address)?;
    form.update_field(FarmField::DetailedAddress, &detailed);
    let description = prompt_text("농장 설명", &form.draft().description)?;
    form.update_field(FarmField::Description, &description);
    Ok(())
}

fn edit_device(form: &mut FarmForm, index: usize) -> Result<()> {
    let device = form.device(index)?;
    if device.is_verified() {
        println!("{}등록된 디바이스는 수정할 수 없습니다. 삭제 후 다시 추가해주세요.", CROSS);
        return Ok(());
    }
    let serial = prompt_text("디바이스 시리얼", device.serial())?;
    let description = prompt_text("디바이스 설명", device.description())?;
    form.update_device(index, DeviceField::Serial, &serial)?;
    form.update_device(index, DeviceField::Description, &description)?;
    Ok(())
}

/// Run one device check and settle its dialog with the user.
async fn verify_device(app: &mut App, index: usize) -> Result<()> {
    let backend = app.backend();
    let form = form(app)?;

    let spinner = Spinner::start("디바이스 조회 중...");
    let report = match form.check_device(index, backend.as_ref()).await {
        Ok(report) => report,
        Err(err) => {
            spinner.fail(&err.to_string());
            return Ok(());
        }
    };
    spinner.clear();

    if let Some(text) = render::dialog(&form.dialog(), form.devices()) {
        println!("{}", text);
    }
    match report {
        CheckReport::Exists { index } => {
            let register = Confirm::new()
                .with_prompt("등록")
                .default(true)
                .interact()
                .context("Failed to read confirmation")?;
            if register {
                form.confirm_device(index)?;
            } else {
                form.cancel_device(index)?;
            }
        }
        CheckReport::NotFound { index, .. } => form.acknowledge_device(index)?,
        CheckReport::Failed { message, .. } => {
            println!("{}{}", CROSS, style(message).red());
        }
        CheckReport::Stale => debug!("Check result no longer applies"),
    }
    Ok(())
}

const MENU: &[&str] = &[
    "디바이스 추가",
    "디바이스 수정",
    "디바이스 조회",
    "디바이스 삭제",
    "농장 정보 수정",
    "농장 저장",
    "취소",
];

pub async fn cmd_farms_add(config: &ClientConfig) -> Result<()> {
    let mut app = open_app(config)?;
    let taken = app.navigate(Route::AddFarm);
    require_login(&mut app, taken)?;

    println!("{}{}", SPARKLE, style("농장 추가하기").bold());
    fill_farm_fields(form(&mut app)?).await?;
    edit_device(form(&mut app)?, 0)?;

    loop {
        let form_ref = form(&mut app)?;
        println!();
        println!("{}", style("디바이스").bold());
        print!("{}", render::device_rows(form_ref.devices()));

        let choice = Select::new()
            .with_prompt("작업 선택")
            .items(MENU)
            .default(2)
            .interact()
            .context("Failed to read menu selection")?;

        match choice {
            0 => {
                form_ref.add_device_row();
                let last = form_ref.devices().len() - 1;
                edit_device(form_ref, last)?;
            }
            1 => {
                let index = pick_row(form_ref, "수정할 디바이스")?;
                edit_device(form_ref, index)?;
            }
            2 => {
                let index = pick_row(form_ref, "조회할 디바이스")?;
                verify_device(&mut app, index).await?;
            }
            3 => {
                let index = pick_row(form_ref, "삭제할 디바이스")?;
                if !form_ref.remove_device_row(index)? {
                    println!("농장에 최소 하나 이상의 디바이스를 등록해야 합니다.");
                }
            }
            4 => fill_farm_fields(form_ref).await?,
            5 => {
                let saved = with_spinner("농장 저장 중...", app.submit_farm()).await;
                if saved {
                    flush_notices(&mut app)?;
                    if let Screen::FarmList(view) = app.screen() {
                        println!("{}", render::farm_list(view.state()).trim_end());
                    }
                    return Ok(());
                }
                // The form is kept; report and let the user fix it.
                if let Err(err) = flush_notices(&mut app) {
                    println!("{}{}", CROSS, style(err).red());
                }
            }
            _ => {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }
}

//! Session commands: `smartfarm login`, `signup`, `logout` and `status`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Password};
use smartfarm::auth::{LoginForm, SignupForm};
use smartfarm::config::ClientConfig;
use smartfarm::ui::icons::{CHECK, LOCK};
use smartfarm::ui::progress::with_spinner;

use super::{flush_notices, open_app};

pub async fn cmd_login(config: &ClientConfig, email: Option<String>) -> Result<()> {
    let mut app = open_app(config)?;

    let email = match email {
        Some(email) => email,
        None => Input::<String>::new()
            .with_prompt("이메일")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = Password::new()
        .with_prompt("비밀번호")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")?;

    let form = LoginForm { email, password };
    with_spinner("로그인 중...", app.login(&form)).await;
    flush_notices(&mut app)
}

pub async fn cmd_signup(config: &ClientConfig) -> Result<()> {
    let mut app = open_app(config)?;

    let name = Input::<String>::new()
        .with_prompt("이름")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read name")?;
    let email = Input::<String>::new()
        .with_prompt("이메일")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read email")?;
    let password = Password::new()
        .with_prompt("비밀번호 (8자 이상)")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")?;
    let confirm_password = Password::new()
        .with_prompt("비밀번호 확인")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password confirmation")?;

    let form = SignupForm {
        name,
        email,
        password,
        confirm_password,
    };
    let created = with_spinner("회원가입 중...", app.signup(&form)).await;
    flush_notices(&mut app)?;
    if created {
        println!("Run `smartfarm login` to sign in.");
    }
    Ok(())
}

pub fn cmd_logout(config: &ClientConfig) -> Result<()> {
    let mut app = open_app(config)?;
    if !app.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    app.logout();
    flush_notices(&mut app)
}

pub fn cmd_status(config: &ClientConfig) -> Result<()> {
    let app = open_app(config)?;

    println!("Server:  {}", config.base_url());
    match config.session_path() {
        Some(path) => println!("Session: {}", path.display()),
        None => println!("Session: (in memory)"),
    }
    if app.session().is_authenticated() {
        println!("{}{}", CHECK, style("Logged in").green());
    } else {
        println!("{}{}", LOCK, style("Not logged in").yellow());
        println!("Run `smartfarm login` to sign in.");
    }
    Ok(())
}

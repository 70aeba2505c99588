//! Login and signup forms.
//!
//! Validation runs entirely on the client; a form that fails it never
//! reaches the backend.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::{AuthError, GatewayError, ValidationError};
use crate::gateway::FarmBackend;
use crate::models::{LoginRequest, SignupRequest};
use crate::session::Session;

pub const MSG_LOGIN_SUCCESS: &str = "로그인 성공!";
pub const MSG_SIGNUP_SUCCESS: &str = "회원가입이 성공적으로 완료되었습니다. 로그인 해주세요.";
pub const MSG_SIGNUP_FAILED: &str = "회원가입에 실패했습니다.";

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid static regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Which half of the auth screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthTab {
    #[default]
    Login,
    Signup,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "이메일" });
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField { field: "비밀번호" });
        }
        Ok(LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Checks run in order: name, email, password length, confirmation.
    pub fn validate(&self) -> Result<SignupRequest, ValidationError> {
        let name = self.name.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::NameTooShort);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::MalformedEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(SignupRequest {
            username: name.to_string(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

/// Auth screen state. The forms themselves belong to whoever collects input.
#[derive(Debug, Clone, Default)]
pub struct AuthScreen {
    pub tab: AuthTab,
}

/// Log in and store the token in `session`.
///
/// Every server-side failure, including a 200 without a token, is reported
/// as invalid credentials.
pub async fn login(
    form: &LoginForm,
    backend: &dyn FarmBackend,
    session: &Session,
) -> Result<(), AuthError> {
    let request = form.validate()?;
    let response = match backend.login(&request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }
    };
    let Some(token) = response.token.filter(|t| !t.is_empty()) else {
        warn!("Login response carried no token");
        return Err(AuthError::InvalidCredentials);
    };
    session.login(&token)?;
    info!(email = %request.email, "Signed in");
    Ok(())
}

/// Create an account. Server text is surfaced verbatim when present.
pub async fn signup(form: &SignupForm, backend: &dyn FarmBackend) -> Result<(), AuthError> {
    let request = form.validate()?;
    match backend.signup(&request).await {
        Ok(()) => {
            info!(email = %request.email, "Account created");
            Ok(())
        }
        Err(err @ GatewayError::Http { .. }) => {
            debug!(status = ?err.status(), "Signup rejected");
            Err(AuthError::Rejected(err.user_message(MSG_SIGNUP_FAILED)))
        }
        Err(err) => {
            warn!(error = %err, "Signup request failed");
            Err(AuthError::Unreachable)
        }
    }
}

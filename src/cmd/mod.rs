//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                            |
//! |-----------|---------------------------------------------|
//! | `auth`    | `Login`, `Signup`, `Logout`, `Status`       |
//! | `farms`   | `Farms list`, `Farms show`, `Farms add`     |
//! | `config`  | `Config`                                    |

pub mod auth;
pub mod config;
pub mod farms;

pub use auth::{cmd_login, cmd_logout, cmd_signup, cmd_status};
pub use config::cmd_config;
pub use farms::{cmd_farms_add, cmd_farms_list, cmd_farms_show};

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use smartfarm::app::{App, NoticeLevel};
use smartfarm::config::ClientConfig;
use smartfarm::gateway::ApiGateway;
use smartfarm::session::{FileStore, KeyValueStore, MemoryStore, Session};
use smartfarm::ui::render;
use tracing::debug;

/// Restore the saved session and wire it to the HTTP backend.
pub(crate) fn open_app(config: &ClientConfig) -> Result<App> {
    let store: Arc<dyn KeyValueStore> = match config.session_path() {
        Some(path) => {
            debug!(path = %path.display(), "Using session file");
            Arc::new(FileStore::new(path))
        }
        None => {
            debug!("No data directory, session will not persist");
            Arc::new(MemoryStore::new())
        }
    };
    let session = Arc::new(Session::restore(store).context("Failed to restore session")?);
    let gateway = ApiGateway::from_config(config, session.clone())
        .context("Failed to set up the HTTP client")?;
    Ok(App::new(session, Arc::new(gateway)))
}

/// Print pending notices. Success notices go to stdout; the first error
/// notice becomes the command's error.
pub(crate) fn flush_notices(app: &mut App) -> Result<()> {
    let mut first_error = None;
    for notice in app.take_notices() {
        match notice.level {
            NoticeLevel::Success => println!("{}", render::notice(&notice)),
            NoticeLevel::Error if first_error.is_none() => first_error = Some(notice.message),
            NoticeLevel::Error => eprintln!("{}", render::notice(&notice)),
        }
    }
    match first_error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

//! Configuration view and validation commands: `smartfarm config`.

use anyhow::{Result, bail};
use smartfarm::config::{ClientConfig, SmartfarmToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &ClientConfig, command: Option<ConfigCommands>) -> Result<()> {
    let Some(config_path) = config.config_path.as_deref() else {
        bail!("No config directory available; pass --config <path>");
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Smartfarm Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No smartfarm.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let toml = &config.toml;
            println!("[server]");
            println!("  base_url = \"{}\"", toml.server.base_url);
            println!("  timeout_secs = {}", toml.server.timeout_secs);
            println!();
            if let Some(path) = &toml.session.path {
                println!("[session]");
                println!("  path = \"{}\"", path.display());
                println!();
            }

            println!("Effective values (with env/CLI overrides):");
            println!("  base_url = \"{}\"", config.base_url());
            println!("  timeout_secs = {}", config.timeout().as_secs());
            match config.session_path() {
                Some(path) => println!("  session = \"{}\"", path.display()),
                None => println!("  session = (in memory)"),
            }
            println!();

            if !config_path.exists() {
                println!("Run 'smartfarm config init' to create a smartfarm.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() && config.cli_base_url.is_none() {
                println!("No smartfarm.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("smartfarm.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            SmartfarmToml::default().save(config_path)?;

            println!("Created smartfarm.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] base_url, timeout_secs");
            println!("  - [session] path");
            println!();
        }
    }

    Ok(())
}

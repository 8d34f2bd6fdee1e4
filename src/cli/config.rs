//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "notify.admin_email")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
///
/// Works on the file only; environment overrides are not applied or saved.
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    if args.reset {
        Config::default().save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        (None, None) => {
            for line in render_all(&config) {
                println!("{}", line);
            }
        }

        (Some(key), None) => match config.get(key) {
            Some(value) => println!("{}", display_value(key, &value)),
            None => {
                eprintln!("Available keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        },

        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, display_value(key, value));
        }

        (None, Some(_)) => {
            return Err(Error::Config("Must specify a key to set a value".to_string()));
        }
    }

    Ok(())
}

/// Mask secrets; show whether they are set
fn display_value(key: &str, value: &str) -> String {
    if !Config::is_secret(key) {
        return value.to_string();
    }
    if value.trim().is_empty() {
        "\"\" # not configured".to_string()
    } else {
        "\"***\" # configured".to_string()
    }
}

/// Every key grouped by section, TOML-like
fn render_all(config: &Config) -> Vec<String> {
    let mut lines = Vec::new();
    let mut section = "";

    for key in Config::available_keys() {
        let Some((sec, name)) = key.split_once('.') else {
            continue;
        };
        if sec != section {
            if !section.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", sec));
            section = sec;
        }
        let value = config.get(key).unwrap_or_default();
        lines.push(format!("{} = {}", name, display_value(key, &value)));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_masked() {
        assert_eq!(display_value("notify.mail_api_key", "abc"), "\"***\" # configured");
        assert_eq!(display_value("notify.mail_api_key", ""), "\"\" # not configured");
        assert_eq!(display_value("server.port", "8081"), "8081");
    }

    #[test]
    fn test_render_all_sections() {
        let mut config = Config::default();
        config.geocoding.api_key = "maps-secret".to_string();

        let lines = render_all(&config);

        assert_eq!(lines[0], "[server]");
        assert!(lines.contains(&"[notify]".to_string()));
        assert!(lines.contains(&"port = 8081".to_string()));
        assert!(lines.contains(&"api_key = \"***\" # configured".to_string()));
        assert!(!lines.iter().any(|l| l.contains("maps-secret")));
    }
}

//! Driver command handler
//!
//! Maintains the registry the SOS endpoint resolves reporters against.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{NewDriver, SqliteStore};
use clap::{Args, Subcommand};

/// Driver command arguments
#[derive(Args)]
pub struct DriverArgs {
    #[command(subcommand)]
    pub command: DriverCommand,
}

/// Driver subcommands
#[derive(Subcommand)]
pub enum DriverCommand {
    /// Register a driver
    Add {
        /// Registration code (the driver ID the client sends)
        reg_no: String,

        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Contact phone, shown in alert notifications
        #[arg(long)]
        phone: String,
    },
    /// List registered drivers
    List,
    /// Remove a driver; past alerts are kept
    Remove {
        reg_no: String,
    },
}

/// Run the driver command
pub async fn run(args: DriverArgs) -> Result<()> {
    let config = Config::load_with_env()?;
    let store = SqliteStore::open(config.database_path()?).await?;

    match args.command {
        DriverCommand::Add {
            reg_no,
            first_name,
            last_name,
            phone,
        } => {
            let input = NewDriver {
                first_name,
                last_name,
                phone,
                reg_no,
            };
            validate(&input)?;
            let driver = store.add_driver(input).await?;
            println!("Registered {} ({})", driver.display_name(), driver.reg_no);
        }

        DriverCommand::List => {
            let drivers = store.list_drivers().await?;
            if drivers.is_empty() {
                println!("No drivers registered.");
            }
            for driver in drivers {
                println!("  {:<12} {:<24} {}", driver.reg_no, driver.display_name(), driver.phone);
            }
        }

        DriverCommand::Remove { reg_no } => {
            if store.remove_driver(&reg_no).await? {
                println!("Removed driver {}", reg_no);
            } else {
                return Err(Error::ActorNotFound(reg_no));
            }
        }
    }

    Ok(())
}

fn validate(input: &NewDriver) -> Result<()> {
    if input.reg_no.trim().is_empty() {
        return Err(Error::Config("Registration code must not be empty".to_string()));
    }
    if input.first_name.trim().is_empty() {
        return Err(Error::Config("First name must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(reg_no: &str, first_name: &str) -> NewDriver {
        NewDriver {
            first_name: first_name.to_string(),
            last_name: String::new(),
            phone: "+911234567890".to_string(),
            reg_no: reg_no.to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&input("DR100", "Ravi")).is_ok());
        assert!(validate(&input("  ", "Ravi")).is_err());
        assert!(validate(&input("DR100", "")).is_err());
    }
}

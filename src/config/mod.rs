#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::{LockerError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "parcel-locker")]
#[command(about = "Parcel locker network: slot availability, transfers and reports")]
pub struct CliConfig {
    /// Path to the network TOML file
    #[arg(short, long, default_value = "demos/network.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Availability date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Write a report bundle into this directory
    #[arg(long)]
    pub report: Option<String>,

    /// Run a sample register, pay, drop-off and transfer flow before reporting
    #[arg(long)]
    pub demo: bool,

    /// Validate the configuration and print a summary without building anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("config", &self.config)?;
        if let Some(dir) = &self.report {
            validation::validate_non_empty_string("report", dir)?;
        }
        if self.demo && self.dry_run {
            return Err(LockerError::InvalidConfigValueError {
                field: "demo".to_string(),
                value: "true".to_string(),
                reason: "--demo cannot be combined with --dry-run".to_string(),
            });
        }
        Ok(())
    }
}

//! Configuration module for ovh-invoice.
//!
//! Handles reading configuration from CLI arguments, environment variables and the user config file.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::Deserialize;

use crate::OvhInvoiceArgs;
use crate::ovh::Credentials;
use crate::period::BillingPeriod;

/// Default API endpoint alias.
pub const DEFAULT_ENDPOINT: &str = "ovh-eu";

/// Default invoice directory, relative to the current working directory.
pub const DEFAULT_DIR: &str = "invoices";

/// Load variables from a `.env` file in the current directory or one of its parents.
///
/// Variables already set in the environment are not overwritten.
/// A missing file is not an error.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_env_file() -> Result<()> {
    check_env_file(dotenvy::dotenv().map(|_| ()))
}

fn check_env_file(result: dotenvy::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(error) if error.not_found() => Ok(()),
        Err(error) => Err(anyhow!("Failed to load .env file: {error}")),
    }
}

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct OvhInvoiceConfig {
    /// API endpoint alias or url.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API application key.
    #[serde(default)]
    pub application_key: Option<String>,
    /// API application secret.
    #[serde(default)]
    pub application_secret: Option<String>,
    /// API consumer key.
    #[serde(default)]
    pub consumer_key: Option<String>,
    /// Invoice directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Print verbose output.
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    ovh_invoice: OvhInvoiceConfig,
}

impl OvhInvoiceConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        let Some(path) = ovh_invoice::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow!("Failed to read config file {}: {error}", path.display())),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.ovh_invoice)
            .map_err(|e| anyhow!("Failed to parse config: {e}"))
    }
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    /// API endpoint alias or url.
    pub endpoint: String,
    /// API credentials.
    pub credentials: Credentials,
    /// Base invoice directory.
    pub dir: PathBuf,
    /// Month to download.
    pub period: BillingPeriod,
    /// Print verbose output.
    pub verbose: bool,
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file is invalid or the year and month are out of range.
    pub fn from_args(args: &OvhInvoiceArgs) -> Result<Self> {
        Self::from_args_and_config(args, OvhInvoiceConfig::get_user_config()?)
    }

    /// Create config from given command line args and explicit user config.
    /// This is useful for testing without reading from the config file.
    ///
    /// # Errors
    /// Returns an error if the year and month are out of range.
    pub fn from_args_and_config(args: &OvhInvoiceArgs, user_config: OvhInvoiceConfig) -> Result<Self> {
        // CLI args and environment take priority over user config
        let endpoint = args
            .endpoint
            .clone()
            .or(user_config.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let credentials = Credentials {
            application_key: args
                .application_key
                .clone()
                .or(user_config.application_key)
                .unwrap_or_default(),
            application_secret: args
                .application_secret
                .clone()
                .or(user_config.application_secret)
                .unwrap_or_default(),
            consumer_key: args
                .consumer_key
                .clone()
                .or(user_config.consumer_key)
                .unwrap_or_default(),
        };

        let dir = args
            .dir
            .clone()
            .or(user_config.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));

        let period = match (args.year.as_deref(), args.month.as_deref()) {
            (None, None) => BillingPeriod::current()?,
            (year, month) => {
                let current = BillingPeriod::current()?;
                BillingPeriod::parse(
                    year.unwrap_or(&current.year_dir()),
                    month.unwrap_or(&current.month_dir()),
                )?
            }
        };

        let verbose = args.verbose || user_config.verbose;

        Ok(Self {
            endpoint,
            credentials,
            dir,
            period,
            verbose,
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endpoint: {}", self.endpoint)?;
        writeln!(f, "Directory: {}", self.dir.display())?;
        write!(f, "Period: {}", self.period)
    }
}

#[cfg(test)]
mod test_ovh_invoice_config {
    use super::*;

    use clap::Parser;

    fn args(arguments: &[&str]) -> OvhInvoiceArgs {
        let mut all = vec!["ovh-invoice"];
        all.extend_from_slice(arguments);
        OvhInvoiceArgs::try_parse_from(all).expect("should parse args")
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_env_file(dotenvy::from_path(dir.path().join(".env")));
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "OVH_INVOICE_TEST_KEY missing equals sign\n").unwrap();

        let error = check_env_file(dotenvy::from_path(&path)).unwrap_err();
        assert!(error.to_string().starts_with("Failed to load .env file"));
    }

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = OvhInvoiceConfig::from_toml_str("").expect("should parse empty config");
        assert!(config.endpoint.is_none());
        assert!(config.dir.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn from_toml_str_parses_section() {
        let toml = r#"
[ovh_invoice]
endpoint = "ovh-ca"
application_key = "ak"
application_secret = "as"
consumer_key = "ck"
dir = "bookkeeping/ovh"
verbose = true
"#;
        let config = OvhInvoiceConfig::from_toml_str(toml).expect("should parse config");
        assert_eq!(config.endpoint.as_deref(), Some("ovh-ca"));
        assert_eq!(config.application_key.as_deref(), Some("ak"));
        assert_eq!(config.application_secret.as_deref(), Some("as"));
        assert_eq!(config.consumer_key.as_deref(), Some("ck"));
        assert_eq!(config.dir, Some(PathBuf::from("bookkeeping/ovh")));
        assert!(config.verbose);
    }

    #[test]
    fn from_toml_str_parses_sample_config() {
        let toml = include_str!("../../../tests/fixtures/sample_config.toml");
        let config = OvhInvoiceConfig::from_toml_str(toml).expect("should parse sample config");
        assert_eq!(config.endpoint.as_deref(), Some(DEFAULT_ENDPOINT));
        assert_eq!(config.dir, Some(PathBuf::from(DEFAULT_DIR)));
        assert!(config.consumer_key.is_some());
    }

    #[test]
    fn from_toml_str_ignores_other_sections() {
        let toml = r"
[qtorrent]
host = 'localhost'
";
        let config = OvhInvoiceConfig::from_toml_str(toml).expect("should parse config");
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn from_toml_str_rejects_invalid_toml() {
        assert!(OvhInvoiceConfig::from_toml_str("[ovh_invoice\nendpoint =").is_err());
    }

    #[test]
    fn args_take_priority_over_user_config() {
        let user_config = OvhInvoiceConfig {
            endpoint: Some("ovh-ca".to_string()),
            application_key: Some("config-ak".to_string()),
            dir: Some(PathBuf::from("from-config")),
            ..Default::default()
        };
        let config = Config::from_args_and_config(
            &args(&["download", "--endpoint", "ovh-us", "--dir", "from-args", "--year", "2024", "--month", "02"]),
            user_config,
        )
        .unwrap();

        assert_eq!(config.endpoint, "ovh-us");
        assert_eq!(config.credentials.application_key, "config-ak");
        assert_eq!(config.dir, PathBuf::from("from-args"));
        assert_eq!(config.period, BillingPeriod::new(2024, 2).unwrap());
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_args_and_config(&args(&["--year", "2023", "--month", "12"]), OvhInvoiceConfig::default())
            .unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.dir, PathBuf::from(DEFAULT_DIR));
        assert!(!config.verbose);
    }

    #[test]
    fn missing_month_defaults_to_current() {
        let current = BillingPeriod::current().unwrap();
        let config = Config::from_args_and_config(&args(&["--year", "2022"]), OvhInvoiceConfig::default()).unwrap();
        assert_eq!(config.period.year(), 2022);
        assert_eq!(config.period.month(), current.month());
    }

    #[test]
    fn invalid_month_is_an_error() {
        let result = Config::from_args_and_config(&args(&["--year", "2024", "--month", "13"]), OvhInvoiceConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn verbose_from_config() {
        let user_config = OvhInvoiceConfig {
            verbose: true,
            ..Default::default()
        };
        let config = Config::from_args_and_config(&args(&["--year", "2024", "--month", "1"]), user_config).unwrap();
        assert!(config.verbose);
    }
}

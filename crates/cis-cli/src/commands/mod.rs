//! Command handler modules for the `cis` CLI.
//!
//! Shared utilities used by multiple command paths live here.

pub mod power;
pub mod reconcile;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cis_client::CisClient;
use cis_config::{ClientConfig, UnusedKeyPolicy};
use clap::Args;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Layered config paths in merge order
    #[arg(long = "config", required = true)]
    pub config_paths: Vec<String>,

    /// Refuse config keys the client does not read
    #[arg(long, default_value_t = false)]
    pub strict_keys: bool,
}

pub fn load_config(args: &ConfigArgs) -> Result<ClientConfig> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = cis_config::load_layered_yaml(&path_refs)?;

    let policy = if args.strict_keys {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = cis_config::report_unused_keys(&loaded.config_json, policy)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key is not used by the client");
    }

    ClientConfig::from_loaded(&loaded)
}

pub fn load_client(args: &ConfigArgs) -> Result<CisClient> {
    let config = load_config(args)?;
    CisClient::from_config(&config).context("client construction failed")
}

/// Parse a wire label (`MN`, `PREPAY`, `bankteller`, ...) into its enum.
pub fn parse_wire<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| format!("unrecognised value '{raw}'"))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .with_context(|| format!("invalid date '{raw}', expected yyyyMMdd"))
}

pub fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("render json output")?
    );
    Ok(())
}

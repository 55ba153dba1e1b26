//! Configuration management for the fleet runner
//!
//! Loads configuration from a TOML file with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{Address, Bytes};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "FLEET_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub runner: RunnerConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    pub network: NetworkConfig,
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Accounts processed at the same time
    pub max_concurrent_accounts: usize,
    /// Tries per transaction build; transient failures swap the endpoint in between
    #[serde(default = "default_build_attempts")]
    pub build_attempts: u32,
    /// Fresh-nonce resubmissions after a transient broadcast failure
    #[serde(default)]
    pub max_resends: u32,
    /// Consecutive read errors tolerated before asking for another endpoint
    #[serde(default = "default_swap_after_failures")]
    pub swap_after_failures: u32,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Route chain RPC traffic through each account's proxy
    #[serde(default)]
    pub rpc_via_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            timeout_secs: 360,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub native_symbol: String,
    /// Whether the network prices transactions with base fee + priority fee
    pub fee_market: bool,
    pub rpc_urls: Vec<String>,
    pub explorer_url: String,
    /// Replaces `confirmation.timeout_secs` on slow-finality networks
    pub confirmation_timeout_secs: Option<u64>,
    /// Treat a confirmation timeout as success (slow-indexing networks only)
    #[serde(default)]
    pub assume_success_on_timeout: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    pub private_keys_path: PathBuf,
    pub proxies_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    pub path: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("result.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Per-protocol settings; a module can only be selected when its section exists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModulesConfig {
    pub apriori: Option<AprioriConfig>,
    pub kintsu: Option<KintsuConfig>,
    pub magic_eden: Option<MagicEdenConfig>,
    pub owlto: Option<OwltoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AprioriConfig {
    pub contract: Address,
    pub stake_range: AmountRange,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KintsuConfig {
    pub contract: Address,
    /// Liquid staking token; the staking contract itself when omitted
    pub smon_token: Option<Address>,
    pub stake_range: AmountRange,
    #[serde(default)]
    pub unstake_all: bool,
    #[serde(default = "default_unstake_percent")]
    pub unstake_percent: u32,
}

impl KintsuConfig {
    pub fn share_token(&self) -> Address {
        self.smon_token.unwrap_or(self.contract)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagicEdenConfig {
    pub contract: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwltoConfig {
    /// Contract creation code, hex encoded
    pub bytecode: Bytes,
}

/// Inclusive `[min, max]` range of native-token amounts, written as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(f64, f64)")]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl From<(f64, f64)> for AmountRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl AmountRange {
    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            anyhow::bail!("{} must contain finite numbers", name);
        }
        if self.min <= 0.0 {
            anyhow::bail!("{} lower bound must be positive, got {}", name, self.min);
        }
        if self.min > self.max {
            anyhow::bail!("{} is inverted: [{}, {}]", name, self.min, self.max);
        }
        Ok(())
    }
}

fn default_build_attempts() -> u32 {
    3
}

fn default_swap_after_failures() -> u32 {
    3
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_metrics_port() -> u16 {
    9100
}

fn default_unstake_percent() -> u32 {
    100
}

impl Settings {
    /// Load settings from the file named by `FLEET_CONFIG` (or `config/default.toml`)
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.runner.max_concurrent_accounts == 0 {
            anyhow::bail!("runner.max_concurrent_accounts must be at least 1");
        }
        if self.runner.build_attempts == 0 {
            anyhow::bail!("runner.build_attempts must be at least 1");
        }
        if self.runner.swap_after_failures == 0 {
            anyhow::bail!("runner.swap_after_failures must be at least 1");
        }
        if self.runner.rpc_timeout_secs == 0 {
            anyhow::bail!("runner.rpc_timeout_secs must be at least 1");
        }

        if self.confirmation.poll_interval_secs == 0 {
            anyhow::bail!("confirmation.poll_interval_secs must be at least 1");
        }
        let timeout = self.confirmation_timeout_secs();
        if timeout < self.confirmation.poll_interval_secs {
            anyhow::bail!(
                "confirmation timeout ({}s) is shorter than the poll interval ({}s)",
                timeout,
                self.confirmation.poll_interval_secs
            );
        }

        if self.network.rpc_urls.is_empty() {
            anyhow::bail!("Network {} has no RPC URLs configured", self.network.name);
        }
        for url in &self.network.rpc_urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("RPC URL {} must be http(s)", url);
            }
        }

        if let Some(apriori) = &self.modules.apriori {
            apriori.stake_range.validate("modules.apriori.stake_range")?;
        }
        if let Some(kintsu) = &self.modules.kintsu {
            kintsu.stake_range.validate("modules.kintsu.stake_range")?;
            if kintsu.unstake_percent == 0 || kintsu.unstake_percent > 100 {
                anyhow::bail!(
                    "modules.kintsu.unstake_percent must be within 1..=100, got {}",
                    kintsu.unstake_percent
                );
            }
        }
        if let Some(owlto) = &self.modules.owlto {
            if owlto.bytecode.is_empty() {
                anyhow::bail!("modules.owlto.bytecode is empty");
            }
        }

        Ok(())
    }

    /// Effective confirmation timeout after the network override
    pub fn confirmation_timeout_secs(&self) -> u64 {
        self.network
            .confirmation_timeout_secs
            .unwrap_or(self.confirmation.timeout_secs)
    }
}

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

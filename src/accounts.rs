//! Account credentials loaded from the key and proxy files

use crate::config::AccountsConfig;
use crate::error::{FleetError, FleetResult};

use std::fmt;
use std::path::Path;

/// Hex private key. Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key material, for constructing the signer only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// One independently keyed account
#[derive(Debug, Clone)]
pub struct Account {
    /// 1-based position in the key file
    pub id: usize,
    pub private_key: PrivateKey,
    /// `user:pass@host:port`
    pub proxy: Option<String>,
}

impl Account {
    /// Second column of a result line
    pub fn reference(&self) -> String {
        match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => format!("#{}", self.id),
        }
    }
}

fn read_lines(path: &Path) -> FleetResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FleetError::Accounts(format!("cannot read {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Load accounts in file order.
///
/// A missing or empty proxy file leaves every account without a proxy; any
/// other length mismatch between the two files is an error.
pub fn load_accounts(config: &AccountsConfig) -> FleetResult<Vec<Account>> {
    let keys = read_lines(&config.private_keys_path)?;
    if keys.is_empty() {
        return Err(FleetError::Accounts(format!(
            "no private keys in {}",
            config.private_keys_path.display()
        )));
    }

    let proxies = match &config.proxies_path {
        Some(path) if path.exists() => read_lines(path)?,
        _ => Vec::new(),
    };

    if !proxies.is_empty() && proxies.len() != keys.len() {
        return Err(FleetError::Accounts(format!(
            "{} private keys but {} proxies",
            keys.len(),
            proxies.len()
        )));
    }

    keys.into_iter()
        .enumerate()
        .map(|(i, key)| {
            let id = i + 1;
            let hex = key.strip_prefix("0x").unwrap_or(&key);
            if hex.len() != 64 || hex::decode(hex).is_err() {
                return Err(FleetError::Accounts(format!(
                    "line {} of {} is not a 32-byte hex private key",
                    id,
                    config.private_keys_path.display()
                )));
            }

            Ok(Account {
                id,
                private_key: PrivateKey::new(key),
                proxy: proxies.get(i).cloned(),
            })
        })
        .collect()
}

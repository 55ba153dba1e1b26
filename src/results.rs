//! Append-only result file, one line per completed action

use crate::accounts::Account;
use crate::error::FleetResult;

use ethers::types::Address;
use ethers::utils::to_checksum;
use std::fmt;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Action recorded in the third column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
    AprioriStake,
    KintsuStake,
    KintsuUnstakeRequest,
    KintsuStakeBalance,
    MagicEdenMint,
    OwltoDeployContract,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::AprioriStake => "APRIORI_STAKE",
            ActionTag::KintsuStake => "KINTSU_STAKE",
            ActionTag::KintsuUnstakeRequest => "KINTSU_UNSTAKE_REQUEST",
            ActionTag::KintsuStakeBalance => "KINTSU_STAKE_BALANCE",
            ActionTag::MagicEdenMint => "MAGICEDEN_MINT",
            ActionTag::OwltoDeployContract => "OWLTO_DEPLOY_CONTRACT",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<address> <proxy-or-#id> <TAG> <value>`
pub fn format_line(address: Address, account: &Account, tag: ActionTag, value: &str) -> String {
    format!(
        "{} {} {} {}\n",
        to_checksum(&address, None),
        account.reference(),
        tag,
        value
    )
}

/// Shared sink; appends are serialized so lines never interleave
pub struct ResultSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn record(
        &self,
        address: Address,
        account: &Account,
        tag: ActionTag,
        value: &str,
    ) -> FleetResult<()> {
        let line = format_line(address, account, tag, value);

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Recorded {} for account {}", tag, account.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::PrivateKey;
    use std::sync::Arc;
    use tempfile::tempdir;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn account(id: usize, proxy: Option<&str>) -> Account {
        Account {
            id,
            private_key: PrivateKey::new(KEY),
            proxy: proxy.map(str::to_string),
        }
    }

    #[test]
    fn test_line_format_never_contains_key() {
        let address: Address = "0x90f8bf6a478f320ead074411a4b0e7944ea8c9c1".parse().unwrap();

        let line = format_line(address, &account(3, None), ActionTag::KintsuStake, "0xabc");
        assert_eq!(
            line,
            "0x90f8Bf6a478f320EAD074411a4b0e7944Ea8c9C1 #3 KINTSU_STAKE 0xabc\n"
        );
        assert!(!line.contains(KEY));

        let line = format_line(
            address,
            &account(1, Some("u:p@1.2.3.4:80")),
            ActionTag::AprioriStake,
            "0xdef",
        );
        assert!(line.contains(" u:p@1.2.3.4:80 APRIORI_STAKE 0xdef"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let sink = Arc::new(ResultSink::new(&path));

        let handles: Vec<_> = (1..=20)
            .map(|id| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    sink.record(
                        Address::repeat_byte(id as u8),
                        &account(id, None),
                        ActionTag::MagicEdenMint,
                        &format!("0x{:02x}", id),
                    )
                    .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 20);
        assert!(lines
            .iter()
            .all(|l| l.split(' ').count() == 4 && l.contains(" MAGICEDEN_MINT ")));
    }
}

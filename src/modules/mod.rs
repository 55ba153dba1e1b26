//! Protocol tasks. Each builds one contract call for an account and hands it
//! to the account client; successful actions are written to the result sink.

pub mod amount;
pub mod apriori;
pub mod kintsu;
pub mod magic_eden;
pub mod owlto;

use crate::accounts::Account;
use crate::chain::{EndpointPool, NetworkProfile, RpcConnector};
use crate::client::{AccountClient, ClientOptions};
use crate::config::ModulesConfig;
use crate::error::{FleetError, FleetResult};
use crate::results::{ActionTag, ResultSink};

use std::fmt;
use std::sync::Arc;

/// One action run for every account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    AprioriStake,
    KintsuStake,
    KintsuUnstake,
    KintsuBalance,
    MagicEdenMint,
    OwltoDeploy,
}

impl Module {
    pub fn tag(&self) -> ActionTag {
        match self {
            Module::AprioriStake => ActionTag::AprioriStake,
            Module::KintsuStake => ActionTag::KintsuStake,
            Module::KintsuUnstake => ActionTag::KintsuUnstakeRequest,
            Module::KintsuBalance => ActionTag::KintsuStakeBalance,
            Module::MagicEdenMint => ActionTag::MagicEdenMint,
            Module::OwltoDeploy => ActionTag::OwltoDeployContract,
        }
    }

    /// Fail fast when the module's section is missing from the config
    pub fn ensure_configured(&self, modules: &ModulesConfig) -> FleetResult<()> {
        let present = match self {
            Module::AprioriStake => modules.apriori.is_some(),
            Module::KintsuStake | Module::KintsuUnstake | Module::KintsuBalance => {
                modules.kintsu.is_some()
            }
            Module::MagicEdenMint => modules.magic_eden.is_some(),
            Module::OwltoDeploy => modules.owlto.is_some(),
        };

        if present {
            Ok(())
        } else {
            Err(FleetError::Config(format!(
                "{} selected but its [modules] section is missing",
                self
            )))
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Module::AprioriStake => "Apriori stake",
            Module::KintsuStake => "Kintsu stake",
            Module::KintsuUnstake => "Kintsu unstake",
            Module::KintsuBalance => "Kintsu balance",
            Module::MagicEdenMint => "Magic Eden mint",
            Module::OwltoDeploy => "Owlto deploy",
        };
        f.write_str(name)
    }
}

/// Everything an account pipeline needs, shared read-only across tasks
pub struct RunContext {
    pub profile: Arc<NetworkProfile>,
    pub pool: Arc<EndpointPool>,
    pub connector: Arc<dyn RpcConnector>,
    pub options: ClientOptions,
    pub modules: ModulesConfig,
    pub sink: Arc<ResultSink>,
}

fn section<T>(config: &Option<T>, module: Module) -> FleetResult<&T> {
    config
        .as_ref()
        .ok_or_else(|| FleetError::Config(format!("{} is not configured", module)))
}

/// Full pipeline of `module` for one account
pub async fn run_account(ctx: Arc<RunContext>, module: Module, account: Account) -> FleetResult<()> {
    let mut client = AccountClient::connect(
        &account,
        ctx.profile.clone(),
        ctx.pool.clone(),
        ctx.connector.clone(),
        ctx.options,
    )?;

    let value = match module {
        Module::AprioriStake => {
            let config = section(&ctx.modules.apriori, module)?;
            let amount = amount::sample_amount(&config.stake_range, &mut rand::thread_rng());
            let hash = apriori::stake(&mut client, config, amount).await?;
            format!("{:?}", hash)
        }
        Module::KintsuStake => {
            let config = section(&ctx.modules.kintsu, module)?;
            let amount = amount::sample_amount(&config.stake_range, &mut rand::thread_rng());
            let hash = kintsu::stake(&mut client, config, amount).await?;
            format!("{:?}", hash)
        }
        Module::KintsuUnstake => {
            let config = section(&ctx.modules.kintsu, module)?;
            let hash = kintsu::unstake(&mut client, config).await?;
            format!("{:?}", hash)
        }
        Module::KintsuBalance => {
            let config = section(&ctx.modules.kintsu, module)?;
            kintsu::balance(&client, config).await?
        }
        Module::MagicEdenMint => {
            let config = section(&ctx.modules.magic_eden, module)?;
            let hash = magic_eden::mint(&mut client, config).await?;
            format!("{:?}", hash)
        }
        Module::OwltoDeploy => {
            let config = section(&ctx.modules.owlto, module)?;
            let hash = owlto::deploy(&mut client, config).await?;
            format!("{:?}", hash)
        }
    };

    ctx.sink
        .record(client.address(), &account, module.tag(), &value)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::PrivateKey;
    use crate::chain::provider::MockChainRpc;
    use crate::chain::session::testing::StaticConnector;
    use crate::config::{AprioriConfig, MagicEdenConfig};
    use crate::coordination::{AccountScheduler, TaskStatus};
    use crate::tx::fees::tests::{history, profile};
    use crate::tx::submitter::tests::TEST_KEY;
    use ethers::types::transaction::eip2718::TypedTransaction;
    use ethers::types::{H256, U256};
    use ethers::utils::parse_ether;
    use tempfile::tempdir;
    use tokio::sync::Semaphore;

    fn context(rpc: MockChainRpc, sink: Arc<ResultSink>, modules: ModulesConfig) -> Arc<RunContext> {
        let url = "https://rpc-a.example";
        Arc::new(RunContext {
            profile: Arc::new(profile(true)),
            pool: Arc::new(EndpointPool::new(&[url.to_string()]).unwrap()),
            connector: Arc::new(StaticConnector::new(vec![(url, rpc)])),
            options: ClientOptions::default(),
            modules,
            sink,
        })
    }

    fn account(id: usize) -> Account {
        Account {
            id,
            private_key: PrivateKey::new(TEST_KEY),
            proxy: None,
        }
    }

    #[test]
    fn test_missing_section_is_reported() {
        let modules = ModulesConfig::default();
        assert!(Module::OwltoDeploy.ensure_configured(&modules).is_err());

        let modules = ModulesConfig {
            magic_eden: Some(MagicEdenConfig {
                contract: ethers::types::Address::repeat_byte(1),
            }),
            ..ModulesConfig::default()
        };
        assert!(Module::MagicEdenMint.ensure_configured(&modules).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apriori_run_records_result_line() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_balance()
            .returning(|_| Ok(parse_ether("1").unwrap()));
        rpc.expect_get_pending_nonce().returning(|_| Ok(U256::zero()));
        rpc.expect_latest_base_fee()
            .returning(|| Ok(Some(U256::from(50_000_000_000u64))));
        rpc.expect_fee_history()
            .returning(|_, _| Ok(history(&[1_000_000_000])));
        rpc.expect_estimate_gas().returning(|_| Ok(U256::from(90_000)));
        let broadcast = Arc::new(std::sync::Mutex::new(None));
        let seen = broadcast.clone();
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(move |raw| {
                let rlp = ethers::utils::rlp::Rlp::new(raw.as_ref());
                let (tx, _) = TypedTransaction::decode_signed(&rlp).unwrap();
                let data = tx.data().cloned().unwrap_or_default();
                *seen.lock().unwrap() = Some((tx.value().copied(), data));
                Ok(H256::repeat_byte(0x44))
            });
        rpc.expect_get_transaction_receipt()
            .returning(|_| Ok(Some(crate::client::tests::receipt(1))));

        let dir = tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let sink = Arc::new(ResultSink::new(&path));
        let modules = ModulesConfig {
            apriori: Some(AprioriConfig {
                contract: "0xb2f82D0f38dc453D596Ad40A37799446Cc89274A".parse().unwrap(),
                stake_range: (0.01, 0.05).into(),
            }),
            ..ModulesConfig::default()
        };
        let ctx = context(rpc, sink, modules);

        run_account(ctx, Module::AprioriStake, account(1)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.trim_end();
        assert!(line.ends_with(&format!("#1 APRIORI_STAKE {:?}", H256::repeat_byte(0x44))));
        assert!(!line.contains(TEST_KEY));

        let (value, data) = broadcast.lock().unwrap().take().unwrap();
        let value = value.unwrap();
        assert!(value >= parse_ether("0.01").unwrap());
        assert!(value <= parse_ether("0.05").unwrap());
        assert!(value < parse_ether("1").unwrap());
        assert!((value % U256::from(amount::STEP_WEI)).is_zero());
        // deposit(assets, receiver): assets is the amount sent as value
        assert_eq!(U256::from_big_endian(&data[4..36]), value);
    }

    #[tokio::test]
    async fn test_scheduled_skips_write_no_result() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_balance().returning(|_| Ok(U256::zero()));
        rpc.expect_send_raw_transaction().never();

        let dir = tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let modules = ModulesConfig {
            apriori: Some(AprioriConfig {
                contract: "0xb2f82D0f38dc453D596Ad40A37799446Cc89274A".parse().unwrap(),
                stake_range: (0.01, 0.05).into(),
            }),
            ..ModulesConfig::default()
        };
        let ctx = context(rpc, Arc::new(ResultSink::new(&path)), modules);

        let scheduler = AccountScheduler::new(Arc::new(Semaphore::new(2)));
        let reports = scheduler
            .run_all(vec![account(1), account(2)], move |account| {
                run_account(ctx.clone(), Module::AprioriStake, account)
            })
            .await;

        assert!(reports
            .iter()
            .all(|r| matches!(r.status, TaskStatus::Skipped(_))));
        assert!(!path.exists());
    }
}

//! Bounded fan-out of one pipeline per account

use crate::accounts::Account;
use crate::error::FleetResult;

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Terminal status of one account's pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    /// A precondition did not hold; nothing was submitted
    Skipped(String),
    Failed(String),
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Skipped(_) => "skipped",
            TaskStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub account_id: usize,
    pub status: TaskStatus,
}

/// Runs one task per account with at most N in flight
pub struct AccountScheduler {
    limiter: Arc<Semaphore>,
}

impl AccountScheduler {
    /// `limiter` is created once per run by the caller; its permit count is
    /// the concurrency cap
    pub fn new(limiter: Arc<Semaphore>) -> Self {
        Self { limiter }
    }

    /// Spawn `task` for every account and wait until all of them reached a
    /// terminal status. Reports are returned in account order. An error or a
    /// panic in one task never affects the others.
    pub async fn run_all<F, Fut>(&self, accounts: Vec<Account>, task: F) -> Vec<AccountReport>
    where
        F: Fn(Account) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FleetResult<()>> + Send + 'static,
    {
        let task = Arc::new(task);
        let mut ids = Vec::with_capacity(accounts.len());
        let mut handles = Vec::with_capacity(accounts.len());

        for account in accounts {
            ids.push(account.id);
            let limiter = self.limiter.clone();
            let task = task.clone();

            handles.push(tokio::spawn(async move {
                // released on drop, including unwinding
                let _permit = match limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return TaskStatus::Failed("scheduler closed".to_string()),
                };

                let account_id = account.id;
                info!("Start [{}] account", account_id);

                match task(account).await {
                    Ok(()) => TaskStatus::Succeeded,
                    Err(e) if e.is_skip() => {
                        info!("[{}] Skipped: {}", account_id, e);
                        TaskStatus::Skipped(e.to_string())
                    }
                    Err(e) => {
                        error!("[{}] Failed: {}", account_id, e);
                        TaskStatus::Failed(e.to_string())
                    }
                }
            }));
        }

        let reports: Vec<AccountReport> = join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, account_id)| {
                let status = joined.unwrap_or_else(|e| {
                    warn!("[{}] Task aborted: {}", account_id, e);
                    TaskStatus::Failed(format!("task panicked: {}", e))
                });
                crate::metrics::record_account_finished(status.label());
                AccountReport { account_id, status }
            })
            .collect();

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::PrivateKey;
    use crate::error::{FleetError, LogicError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn accounts(n: usize) -> Vec<Account> {
        (1..=n)
            .map(|id| Account {
                id,
                private_key: PrivateKey::new(format!("{:064x}", id)),
                proxy: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_every_account_reaches_a_terminal_status() {
        let scheduler = AccountScheduler::new(Arc::new(Semaphore::new(3)));

        let reports = scheduler
            .run_all(accounts(10), |account| async move {
                match account.id {
                    3 => Err(FleetError::Internal("rpc down".to_string())),
                    5 => panic!("boom"),
                    7 => Err(LogicError::NothingToUnstake("zero sMON".to_string()).into()),
                    _ => Ok(()),
                }
            })
            .await;

        assert_eq!(reports.len(), 10);
        let ids: Vec<usize> = reports.iter().map(|r| r.account_id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        assert!(matches!(reports[2].status, TaskStatus::Failed(ref m) if m.contains("rpc down")));
        assert!(matches!(reports[4].status, TaskStatus::Failed(ref m) if m.contains("panicked")));
        assert!(matches!(reports[6].status, TaskStatus::Skipped(_)));
        assert_eq!(
            reports
                .iter()
                .filter(|r| r.status == TaskStatus::Succeeded)
                .count(),
            7
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_the_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = AccountScheduler::new(Arc::new(Semaphore::new(2)));

        let (counter, high) = (in_flight.clone(), peak.clone());
        let reports = scheduler
            .run_all(accounts(12), move |_| {
                let counter = counter.clone();
                let high = high.clone();
                async move {
                    let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(reports.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panics_release_their_permit() {
        let limiter = Arc::new(Semaphore::new(1));
        let scheduler = AccountScheduler::new(limiter.clone());

        let reports = scheduler
            .run_all(accounts(3), |account| async move {
                if account.id == 1 {
                    panic!("first account blows up");
                }
                Ok(())
            })
            .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(limiter.available_permits(), 1);
    }
}

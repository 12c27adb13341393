//! Periodic purge of expired OTP state.
//!
//! Runs independently of request handling; racing with issue/verify is
//! harmless because every store operation is last-write-wins.
//!
//! ```ignore
//! let runner = SweepRunner::new(vec![otp_manager, registrations], interval);
//! let shutdown = runner.start();
//! // on shutdown:
//! shutdown.cancel();
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use super::otp::OtpManager;
use super::registration::RegistrationManager;
use super::store::StoreError;

/// Something holding expiring state that can be purged.
#[async_trait]
pub trait Sweep: Send + Sync {
    fn label(&self) -> &'static str;

    async fn sweep_expired(&self) -> Result<usize, StoreError>;
}

/// An `OtpManager` tagged with the purpose it serves.
pub struct LabeledOtp {
    pub label: &'static str,
    pub manager: Arc<OtpManager>,
}

#[async_trait]
impl Sweep for LabeledOtp {
    fn label(&self) -> &'static str {
        self.label
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        self.manager.sweep_expired().await
    }
}

#[async_trait]
impl Sweep for RegistrationManager {
    fn label(&self) -> &'static str {
        "pending-registrations"
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        RegistrationManager::sweep_expired(self).await
    }
}

pub struct SweepRunner {
    targets: Vec<Arc<dyn Sweep>>,
    every: Duration,
}

impl SweepRunner {
    pub fn new(targets: Vec<Arc<dyn Sweep>>, every: Duration) -> Self {
        Self { targets, every }
    }

    /// Spawn the sweep loop; cancel the returned token to stop it.
    pub fn start(self) -> CancellationToken {
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        info!(
            "OTP sweep started: {} store(s) every {}s",
            self.targets.len(),
            self.every.as_secs()
        );

        tokio::spawn(async move {
            run_sweeps(self.targets, self.every, task_token).await;
        });

        cancel_token
    }
}

async fn run_sweeps(targets: Vec<Arc<dyn Sweep>>, every: Duration, cancel_token: CancellationToken) {
    let mut ticker = interval(every);

    // The first tick fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("OTP sweep stopping due to shutdown");
                break;
            }
            _ = ticker.tick() => {
                sweep_once(&targets).await;
            }
        }
    }
}

/// Run every target once; returns the total number of purged entries.
pub async fn sweep_once(targets: &[Arc<dyn Sweep>]) -> usize {
    let mut total = 0;

    for target in targets {
        match target.sweep_expired().await {
            Ok(0) => debug!("No expired entries in {}", target.label()),
            Ok(count) => {
                info!("Purged {} expired entries from {}", count, target.label());
                total += count;
            }
            Err(e) => error!("Failed to sweep {}: {}", target.label(), e),
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::otp::OtpRecord;
    use crate::verification::store::{InMemoryStore, OtpStore};
    use chrono::{Duration as ChronoDuration, Utc};

    async fn stale_store() -> Arc<InMemoryStore<OtpRecord>> {
        let store = Arc::new(InMemoryStore::new());
        store
            .put(
                "old@example.com",
                OtpRecord {
                    key: "old@example.com".into(),
                    code: "123456".into(),
                    expires_at: Utc::now() - ChronoDuration::minutes(1),
                },
            )
            .await
            .unwrap();
        store
    }

    fn target(store: Arc<InMemoryStore<OtpRecord>>) -> Arc<dyn Sweep> {
        Arc::new(LabeledOtp {
            label: "email-verification",
            manager: Arc::new(OtpManager::new(store, 6, 10)),
        })
    }

    #[actix_web::test]
    async fn sweep_once_counts_purged_entries() {
        let store = stale_store().await;
        let purged = sweep_once(&[target(store.clone())]).await;

        assert_eq!(purged, 1);
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn runner_sweeps_on_its_interval_until_cancelled() {
        let store = stale_store().await;
        let runner = SweepRunner::new(vec![target(store.clone())], Duration::from_millis(20));

        let token = runner.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        token.cancel();

        assert!(store.is_empty());
    }
}

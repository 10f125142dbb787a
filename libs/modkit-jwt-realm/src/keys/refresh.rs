//! Refresh bookkeeping and the background refresh task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::store::KeyStore;

/// Base delay for retries after a failed refresh.
const BACKOFF_BASE: Duration = Duration::from_secs(60);

/// Refresh history for one refreshable key set.
#[derive(Debug, Default)]
pub struct RefreshState {
    pub last_refresh: Option<Instant>,
    pub last_on_demand_refresh: Option<Instant>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Key ids still unknown after an on-demand refresh.
    pub failed_kids: HashSet<String>,
}

impl RefreshState {
    pub fn record_success(&mut self, now: Instant) {
        self.last_refresh = Some(now);
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, now: Instant, error: String) {
        self.last_refresh = Some(now);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
    }

    /// Whether a periodic refresh is due at `now`.
    pub fn is_due(&self, now: Instant, interval: Duration, max_backoff: Duration) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if self.consecutive_failures == 0 {
                    elapsed >= interval
                } else {
                    elapsed >= backoff(self.consecutive_failures, interval, max_backoff)
                }
            }
        }
    }

    /// Remaining on-demand cooldown, if one is active.
    pub fn cooldown_remaining(&self, now: Instant, cooldown: Duration) -> Option<Duration> {
        let last = self.last_on_demand_refresh?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < cooldown).then(|| cooldown.saturating_sub(elapsed))
    }
}

/// Delay before retrying after `failures` consecutive failures.
///
/// Doubles from `min(interval, 60s)` and never exceeds `max_backoff`.
pub fn backoff(failures: u32, interval: Duration, max_backoff: Duration) -> Duration {
    let base = interval.min(BACKOFF_BASE);
    base.saturating_mul(2u32.saturating_pow(failures.min(10)))
        .min(max_backoff)
}

/// Something that owns a [`KeyStore`] which may be replaced over time.
pub trait KeyStoreProvider: Send + Sync {
    fn key_store(&self) -> Arc<KeyStore>;
}

/// Periodically refresh the key store until `cancellation_token` fires.
///
/// The store is looked up again on every tick, so a realm reload is picked
/// up without restarting the task.
///
/// ```ignore
/// let cancel = CancellationToken::new();
/// let task = tokio::spawn(run_key_refresh_task(realm.clone(), cancel.clone()));
/// // On shutdown:
/// cancel.cancel();
/// task.await?;
/// ```
pub async fn run_key_refresh_task<P>(provider: Arc<P>, cancellation_token: CancellationToken)
where
    P: KeyStoreProvider + ?Sized,
{
    loop {
        let store = provider.key_store();
        let tick = store.poll_interval();

        tokio::select! {
            () = cancellation_token.cancelled() => {
                tracing::info!("JWK set refresh task shutting down");
                break;
            }
            () = tokio::time::sleep(tick) => {
                if let Err(e) = store.refresh_if_due().await {
                    tracing::warn!(error = %e, "JWK set refresh failed");
                }
            }
        }
    }
}

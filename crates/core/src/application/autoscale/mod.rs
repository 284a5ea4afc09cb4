//! Autoscaler
//!
//! A control loop that rightsizes the jury fleet against queue depth: every
//! tick it samples the claimable-job count, folds it into a moving-average
//! load index, and creates or destroys cloud instances within
//! `[1, MAX_JURIES]`. The fleet is never drained to zero while the loop
//! runs, and a process that starts against an empty fleet creates one jury
//! before the first tick.

mod bootstrap;
mod load_index;

pub use bootstrap::bootstrap_script;
pub use load_index::LoadIndex;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::NewApiKey;
use crate::error::Result;
use crate::port::{ApiKeyStore, Cloud, JobStore, TimeProvider, TokenProvider};

use super::shutdown::ShutdownToken;

/// Hard cap on the jury fleet.
pub const MAX_JURIES: u32 = 10;

/// Control loop cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Hex characters in a minted jury name suffix.
const JURY_NAME_HEX_CHARS: usize = 8;

#[derive(Debug, Clone)]
pub struct AutoscalerConfig {
    /// Coordinator URL baked into each jury's bootstrap script.
    pub judge_url: String,
    pub max_juries: u32,
    pub tick_interval: Duration,
}

impl AutoscalerConfig {
    pub fn new(judge_url: impl Into<String>) -> Self {
        Self {
            judge_url: judge_url.into(),
            max_juries: MAX_JURIES,
            tick_interval: TICK_INTERVAL,
        }
    }
}

/// What one tick decided to do with the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    Create(u32),
    Destroy(u32),
    Hold,
}

/// Bound a desired delta by the fleet cap and the never-zero floor.
pub fn plan_action(optimal_change: i64, jury_count: u32, max_juries: u32) -> ScaleAction {
    if optimal_change >= 1 {
        if jury_count >= max_juries {
            return ScaleAction::Hold;
        }
        let headroom = (max_juries - jury_count) as i64;
        ScaleAction::Create(optimal_change.min(headroom) as u32)
    } else if optimal_change <= -1 {
        if jury_count <= 1 {
            return ScaleAction::Hold;
        }
        let removable = (jury_count - 1) as i64;
        ScaleAction::Destroy((-optimal_change).min(removable) as u32)
    } else {
        ScaleAction::Hold
    }
}

pub struct Autoscaler {
    jobs: Arc<dyn JobStore>,
    api_keys: Arc<dyn ApiKeyStore>,
    cloud: Arc<dyn Cloud>,
    tokens: Arc<dyn TokenProvider>,
    clock: Arc<dyn TimeProvider>,
    config: AutoscalerConfig,
    index: LoadIndex,
    jury_count: u32,
}

impl Autoscaler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        api_keys: Arc<dyn ApiKeyStore>,
        cloud: Arc<dyn Cloud>,
        tokens: Arc<dyn TokenProvider>,
        clock: Arc<dyn TimeProvider>,
        config: AutoscalerConfig,
    ) -> Self {
        Self {
            jobs,
            api_keys,
            cloud,
            tokens,
            clock,
            config,
            index: LoadIndex::new(1),
            jury_count: 0,
        }
    }

    pub fn jury_count(&self) -> u32 {
        self.jury_count
    }

    /// Sync the believed fleet size from the provider and make sure at
    /// least one jury exists before the first tick.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.jury_count = self.cloud.current_count().await?;
        if self.jury_count == 0 {
            info!("Spinning up 1 jury because none previously existed");
            self.jury_count += self.spawn_juries(1).await;
        }
        Ok(())
    }

    /// One control step: sample, update the index, apply the bounded delta.
    pub async fn tick(&mut self) -> Result<()> {
        let enqueued = self.jobs.count_claimable(self.clock.now_millis()).await?;
        self.index.observe(enqueued);
        self.index.set_jury_count(self.jury_count);
        let optimal_change = self.index.optimal_change();

        info!(
            juries = self.jury_count,
            optimal_change, "Autoscaler tick"
        );

        match plan_action(optimal_change, self.jury_count, self.config.max_juries) {
            ScaleAction::Create(n) => {
                info!(count = n, "Spinning up juries");
                let created = self.spawn_juries(n).await;
                self.jury_count += created;
            }
            ScaleAction::Destroy(n) => {
                info!(count = n, "Destroying juries");
                let destroyed = self.cloud.destroy_juries(n).await?;
                self.jury_count = self.jury_count.saturating_sub(destroyed);
                info!(count = destroyed, "Destroyed juries");
            }
            ScaleAction::Hold => {
                if optimal_change >= 1 {
                    info!("Maximum jury count reached");
                } else if optimal_change <= -1 {
                    info!("Not enough juries to destroy");
                }
            }
        }

        Ok(())
    }

    /// Run until shutdown. Tick failures are logged and retried implicitly:
    /// the loop is self-correcting.
    pub async fn run(mut self, mut shutdown: ShutdownToken) {
        info!(
            max_juries = self.config.max_juries,
            tick_secs = self.config.tick_interval.as_secs(),
            "Autoscaler started"
        );

        if let Err(err) = self.bootstrap().await {
            error!(error = %err, "Autoscaler bootstrap failed");
        }

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            if let Err(err) = self.tick().await {
                error!(error = %err, "Autoscaler tick failed");
            }
            tokio::select! {
                _ = sleep(self.config.tick_interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Autoscaler stopped");
    }

    /// Provision `n` juries: mint a name and a jury-capability key for
    /// each, then hand the provider the rendered bootstrap script. Returns
    /// how many were actually created; a provider failure stops the batch
    /// and the next tick re-evaluates from scratch.
    async fn spawn_juries(&self, n: u32) -> u32 {
        let mut created = 0;
        for _ in 0..n {
            let name = format!("jury-{}", self.tokens.hex_string(JURY_NAME_HEX_CHARS));
            let key = self.tokens.api_key();

            let minted = self
                .api_keys
                .insert(NewApiKey {
                    name: Some(name.clone()),
                    key: key.clone(),
                    perm_jury: true,
                    perm_reader: false,
                    perm_master: false,
                })
                .await;
            if let Err(error) = minted {
                warn!(jury = %name, %error, "Failed to mint jury api key");
                break;
            }

            let user_data = bootstrap_script(&self.config.judge_url, &key);
            if let Err(error) = self.cloud.create_jury(&name, &user_data).await {
                warn!(jury = %name, %error, "Failed to create jury instance");
                break;
            }
            created += 1;
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_respects_cap_and_floor() {
        // index 200 with one jury: +10 wanted, capped to MAX_JURIES - 1 = 9.
        assert_eq!(plan_action(10, 1, MAX_JURIES), ScaleAction::Create(9));
        // At the cap nothing is created.
        assert_eq!(plan_action(3, MAX_JURIES, MAX_JURIES), ScaleAction::Hold);
        // Scale-down never drains the last jury.
        assert_eq!(plan_action(-1, 1, MAX_JURIES), ScaleAction::Hold);
        assert_eq!(plan_action(-1, 2, MAX_JURIES), ScaleAction::Destroy(1));
        assert_eq!(plan_action(-5, 3, MAX_JURIES), ScaleAction::Destroy(2));
        // Dead band.
        assert_eq!(plan_action(0, 5, MAX_JURIES), ScaleAction::Hold);
    }
}

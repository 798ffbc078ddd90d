//! Sequences the crawl pipeline: leaderboard -> top traders -> wallet
//! dashboards, with a durable staging-file handoff between stages. Each
//! stage commits its full record set before the next stage reads it, so
//! every intermediate result is independently inspectable and a stage can
//! be re-run from scratch on its own.

use chrono::{DateTime, Utc};
use config_manager::{ConfigurationError, SystemConfig};
use persistence_layer::{PersistenceError, StagingStore};
use render_client::{PageFetcher, RenderClient, RenderClientConfig, RenderError};
use retry_utils::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

mod driver;
pub mod stages;

pub use driver::{fetch_with_readiness, GatedFetch};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Render client error: {0}")]
    Render(#[from] RenderError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Invocable pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Stage A: token leaderboard
    TopGainers,
    /// Stage B: top traders per token
    TopTraders,
    /// Stage C: 7-day PnL dashboard per wallet
    WalletSevenDay,
    /// Stage C: realized/unrealized dashboard per wallet
    WalletFull,
}

impl Stage {
    pub fn parse(name: &str) -> Option<Stage> {
        match name {
            "top-gainers" => Some(Stage::TopGainers),
            "top-traders" => Some(Stage::TopTraders),
            "wallet-seven-day" => Some(Stage::WalletSevenDay),
            "wallet-full" => Some(Stage::WalletFull),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::TopGainers => "top-gainers",
            Stage::TopTraders => "top-traders",
            Stage::WalletSevenDay => "wallet-seven-day",
            Stage::WalletFull => "wallet-full",
        }
    }
}

/// Outcome of one stage run
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub run_id: Uuid,
    pub stage: Stage,
    pub records_written: usize,
    pub output_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Drives the three-stage crawl against the render collaborator
pub struct PipelineOrchestrator {
    config: SystemConfig,
    fetcher: Arc<dyn PageFetcher>,
    staging: StagingStore,
}

impl PipelineOrchestrator {
    pub fn new(config: SystemConfig) -> Result<Self> {
        let client = RenderClient::new(RenderClientConfig {
            api_url: config.render_api.api_url.clone(),
            api_key: config.render_api.api_key.clone(),
            request_timeout_seconds: config.render_api.request_timeout_seconds,
            retry_policy: RetryPolicy {
                max_attempts: config.render_api.max_transport_retries,
                ..RetryPolicy::default()
            },
        })?;

        Ok(Self::with_fetcher(config, Arc::new(client)))
    }

    /// Wire in an alternative fetcher (used by tests to script responses)
    pub fn with_fetcher(config: SystemConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let staging = StagingStore::new(config.system.staging_dir.clone());
        Self {
            config,
            fetcher,
            staging,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub async fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("🚀 Starting stage {} (run {})", stage.name(), run_id);

        let (records_written, output_path) = match stage {
            Stage::TopGainers => {
                stages::leaderboard::run(&self.config, self.fetcher.as_ref(), &self.staging).await?
            }
            Stage::TopTraders => {
                stages::top_traders::run(&self.config, self.fetcher.as_ref(), &self.staging).await?
            }
            Stage::WalletSevenDay => {
                stages::wallet_screener::run_seven_day(
                    &self.config,
                    self.fetcher.as_ref(),
                    &self.staging,
                )
                .await?
            }
            Stage::WalletFull => {
                stages::wallet_screener::run_full(&self.config, self.fetcher.as_ref(), &self.staging)
                    .await?
            }
        };

        let report = StageReport {
            run_id,
            stage,
            records_written,
            output_path,
            started_at,
            completed_at: Utc::now(),
        };
        info!(
            "✅ Stage {} completed: {} records -> {}",
            stage.name(),
            report.records_written,
            report.output_path.display()
        );
        Ok(report)
    }

    /// Run the full pipeline in order. Each stage's staging file is
    /// committed before the next stage starts reading.
    pub async fn run_pipeline(&self) -> Result<Vec<StageReport>> {
        let mut reports = Vec::new();
        for stage in [
            Stage::TopGainers,
            Stage::TopTraders,
            Stage::WalletSevenDay,
            Stage::WalletFull,
        ] {
            reports.push(self.run_stage(stage).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for stage in [
            Stage::TopGainers,
            Stage::TopTraders,
            Stage::WalletSevenDay,
            Stage::WalletFull,
        ] {
            assert_eq!(Stage::parse(stage.name()), Some(stage));
        }
        assert_eq!(Stage::parse("unknown"), None);
    }
}

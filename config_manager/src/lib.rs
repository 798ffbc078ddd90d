use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Fetch-and-render service configuration
    pub render_api: RenderApiConfig,

    /// Token leaderboard stage (stage A)
    pub leaderboard: LeaderboardConfig,

    /// Top traders stage (stage B)
    pub top_traders: TopTradersConfig,

    /// Wallet screener stages (stage C, one per dashboard site)
    pub wallet_screener: WalletScreenerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug mode
    pub debug_mode: bool,

    /// Directory holding the per-stage staging files
    pub staging_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderApiConfig {
    /// API key for the fetch-and-render service
    pub api_key: String,

    /// Service endpoint
    pub api_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Transport-level retry attempts (429/5xx/timeouts), on top of the
    /// page-readiness retry which is configured per stage
    pub max_transport_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Leaderboard page without query parameters
    pub base_url: String,

    /// Minimum 24h sell transactions filter
    pub min_24h_sells: u64,

    /// Minimum 24h total transactions filter
    pub min_24h_txns: u64,

    /// Minimum 24h volume filter (USD)
    pub min_24h_volume_usd: u64,

    /// Minimum liquidity filter (USD)
    pub min_liquidity_usd: u64,

    /// Minimum market cap filter (USD)
    pub min_market_cap_usd: u64,

    /// Staging file name for stage A output
    pub output_file: String,
}

impl LeaderboardConfig {
    /// Full crawl URL with the filter query applied, ranked by 24h price
    /// change descending
    pub fn url(&self) -> String {
        format!(
            "{}?min24HSells={}&min24HTxns={}&min24HVol={}&minLiq={}&minMarketCap={}&order=desc&rankBy=priceChangeH24",
            self.base_url,
            self.min_24h_sells,
            self.min_24h_txns,
            self.min_24h_volume_usd,
            self.min_liquidity_usd,
            self.min_market_cap_usd,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopTradersConfig {
    /// Seconds to wait for the top-traders panel to attach
    pub wait_timeout_seconds: u64,

    /// Re-fetches permitted per pair page after a failed readiness probe
    pub max_retries: u32,

    /// Staging file name for stage B output
    pub output_file: String,
}

/// Tie-breaking strategy for PnL ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMethod {
    /// Ties share a rank, next distinct value leaves a gap (1, 1, 3)
    Competition,
    /// Ties share a rank, no gap (1, 1, 2)
    Dense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletScreenerConfig {
    /// Re-fetches permitted per wallet page after a failed readiness probe
    pub max_retries: u32,

    /// Wallets whose percentage-PnL rank exceeds this are dropped from the
    /// worklist. Guardrail, effectively unbounded by default.
    pub pct_pnl_rank_cutoff: u64,

    /// Ranking tie strategy
    pub rank_method: RankMethod,

    /// 7-day PnL dashboard site
    pub seven_day: ScreenerSiteConfig,

    /// Full realized/unrealized dashboard site
    pub full: ScreenerSiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerSiteConfig {
    /// Dashboard URL prefix; the wallet address is appended
    pub base_url: String,

    /// Seconds to wait for the dashboard widgets to attach
    pub wait_timeout_seconds: u64,

    /// Staging file name for this site's stage C output
    pub output_file: String,
}

impl ScreenerSiteConfig {
    pub fn wallet_url(&self, wallet_address: &str) -> String {
        format!("{}{}", self.base_url, wallet_address)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings {
                debug_mode: false,
                staging_dir: ".".to_string(),
            },
            render_api: RenderApiConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_url: "https://api.renderfetch.dev/v1/render".to_string(),
                request_timeout_seconds: 120,
                max_transport_retries: 3,
            },
            leaderboard: LeaderboardConfig {
                base_url: "https://dexscreener.com/gainers/solana".to_string(),
                min_24h_sells: 30,
                min_24h_txns: 300,
                min_24h_volume_usd: 500_000,
                min_liquidity_usd: 250_000,
                min_market_cap_usd: 1_000_000,
                output_file: "top_gainers.json".to_string(),
            },
            top_traders: TopTradersConfig {
                wait_timeout_seconds: 10,
                max_retries: 1,
                output_file: "top_traders.json".to_string(),
            },
            wallet_screener: WalletScreenerConfig {
                max_retries: 1,
                pct_pnl_rank_cutoff: 1_000_000,
                rank_method: RankMethod::Competition,
                seven_day: ScreenerSiteConfig {
                    base_url: "https://gmgn.ai/sol/address/".to_string(),
                    wait_timeout_seconds: 10,
                    output_file: "wallet_stats_seven_day.json".to_string(),
                },
                full: ScreenerSiteConfig {
                    base_url: "https://dexcheck.ai/app/wallet-analyzer/".to_string(),
                    wait_timeout_seconds: 10,
                    output_file: "wallet_stats_full.json".to_string(),
                },
            },
        }
    }
}

impl RenderApiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Render service API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl WalletScreenerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pct_pnl_rank_cutoff == 0 {
            return Err(ConfigurationError::InvalidValue(
                "pct_pnl_rank_cutoff must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix
        config_builder = config_builder.add_source(
            Environment::with_prefix("WALLET_ANALYZER")
                .try_parsing(true)
                .separator("__"),
        );

        let config = config_builder.build()?;
        let system_config: SystemConfig = config.try_deserialize()?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate the full configuration
    pub fn validate(&self) -> Result<()> {
        self.render_api.validate()?;
        self.wallet_screener.validate()?;

        if self.system.staging_dir.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "staging_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

//! Record types staged between pipeline stages.
//!
//! Every numeric field keeps its raw scraped text alongside the normalized
//! value so the staging files stay auditable end to end. Records are
//! produced once by their extractor and never mutated; ranking produces
//! new derived records instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One leaderboard entry from the top-gainers page (stage A output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    /// Token ticker symbol
    pub token_symbol: Option<String>,

    /// Full token name
    pub token_name: Option<String>,

    /// Canonical pair page URL, crawl target for stage B
    pub pair_url: Option<String>,

    /// Chain the pair trades on
    pub network: Option<String>,

    /// DEX hosting the pair
    pub dex: Option<String>,

    pub gain_rank_raw: Option<String>,
    pub gain_rank: Option<i64>,

    pub price_usd_raw: Option<String>,
    pub price_usd: Option<f64>,

    /// Pair age as rendered ("3h", "2d"); kept as text
    pub pair_age: Option<String>,

    pub txns_24h_raw: Option<String>,
    pub txns_24h: Option<i64>,

    /// 24h volume, normalized to millions of USD
    pub volume_24h_mil_raw: Option<String>,
    pub volume_24h_mil: Option<f64>,

    pub makers_raw: Option<String>,
    pub makers: Option<i64>,

    pub price_change_m5_raw: Option<String>,
    pub price_change_m5: Option<f64>,

    pub price_change_h1_raw: Option<String>,
    pub price_change_h1: Option<f64>,

    pub price_change_h6_raw: Option<String>,
    pub price_change_h6: Option<f64>,

    pub price_change_h24_raw: Option<String>,
    pub price_change_h24: Option<f64>,

    /// Liquidity, normalized to millions of USD
    pub liquidity_mil_raw: Option<String>,
    pub liquidity_mil: Option<f64>,

    /// Market cap, normalized to millions of USD
    pub market_cap_mil_raw: Option<String>,
    pub market_cap_mil: Option<f64>,

    pub scraped_at: DateTime<Utc>,

    /// Field-level normalization failures; one bad field never drops the
    /// record or its siblings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
}

/// One top-trader row for a token (stage B output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraderRecord {
    /// Token this trader was ranked under
    pub token_symbol: Option<String>,

    /// Pair page the row was scraped from
    pub pair_url: Option<String>,

    pub bought_usd_raw: Option<String>,
    pub bought_usd: Option<f64>,

    pub bought_native_raw: Option<String>,
    pub bought_native: Option<f64>,

    pub buy_txns_raw: Option<String>,
    pub buy_txns: Option<i64>,

    pub sold_usd_raw: Option<String>,
    pub sold_usd: Option<f64>,

    pub sold_native_raw: Option<String>,
    pub sold_native: Option<f64>,

    pub sell_txns_raw: Option<String>,
    pub sell_txns: Option<i64>,

    /// Realized PnL as rendered on the trader row
    pub pnl_usd_raw: Option<String>,
    pub pnl_usd: Option<f64>,

    /// Block-explorer link for the trader
    pub explorer_url: Option<String>,

    /// Wallet address derived from the explorer link
    pub wallet_address: Option<String>,

    pub scraped_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
}

/// Trader row after ranking: a new derived record, the raw archive stays
/// untouched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedTraderRecord {
    pub token_symbol: Option<String>,
    pub pair_url: Option<String>,
    pub wallet_address: Option<String>,
    pub bought_usd: f64,
    pub sold_usd: f64,
    pub bought_native: Option<f64>,
    pub buy_txns: Option<i64>,
    pub sold_native: Option<f64>,
    pub sell_txns: Option<i64>,
    /// Null realized PnL is zero by convention (a trader who never sold)
    pub pnl_usd: f64,
    /// pnl / bought_usd * 100, rounded to 2 decimals
    pub pct_pnl: f64,
    pub abs_pnl_rank: u64,
    pub pct_pnl_rank: u64,
}

/// One wallet fetch-retry cycle. Ephemeral: discarded once a terminal
/// record is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletWorkItem {
    pub wallet_address: String,
    /// Number the next fetch attempt will carry; starts at 1
    pub attempt: u32,
    /// 1-based position in the current batch
    pub index: usize,
    /// Batch size, for progress reporting
    pub total: usize,
}

/// Per-wallet dashboard statistics (stage C output). The two source sites
/// expose incompatible schemas; each is a distinct variant sharing the
/// wallet-address key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WalletStatsRecord {
    SevenDay(SevenDayWalletStats),
    Full(FullWalletStats),
}

impl WalletStatsRecord {
    pub fn wallet_address(&self) -> &str {
        match self {
            WalletStatsRecord::SevenDay(stats) => &stats.wallet_address,
            WalletStatsRecord::Full(stats) => &stats.wallet_address,
        }
    }

    /// False when the readiness probe never matched and the record is a
    /// best-effort harvest of a partially rendered page
    pub fn page_ready(&self) -> bool {
        match self {
            WalletStatsRecord::SevenDay(stats) => stats.page_ready,
            WalletStatsRecord::Full(stats) => stats.page_ready,
        }
    }
}

/// Aggregate 7-day dashboard schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SevenDayWalletStats {
    pub wallet_address: String,

    pub total_pnl_raw: Option<String>,
    pub total_pnl: Option<f64>,

    pub last_7d_pnl_raw: Option<String>,
    pub last_7d_pnl: Option<f64>,

    pub win_rate_raw: Option<String>,
    pub win_rate: Option<f64>,

    /// Fetches it took to produce this record
    pub attempts: u32,
    pub page_ready: bool,
    pub scraped_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
}

/// Realized/unrealized dashboard schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FullWalletStats {
    pub wallet_address: String,

    pub gross_profit_raw: Option<String>,
    pub gross_profit: Option<f64>,

    pub realized_profit_raw: Option<String>,
    pub realized_profit: Option<f64>,

    pub unrealized_profit_raw: Option<String>,
    pub unrealized_profit: Option<f64>,

    pub roi_raw: Option<String>,
    pub roi: Option<f64>,

    pub realized_roi_raw: Option<String>,
    pub realized_roi: Option<f64>,

    pub unrealized_roi_raw: Option<String>,
    pub unrealized_roi: Option<f64>,

    pub win_rate_raw: Option<String>,
    pub win_rate: Option<f64>,

    pub wins_raw: Option<String>,
    pub wins: Option<i64>,

    pub losses_raw: Option<String>,
    pub losses: Option<i64>,

    pub trading_volume_raw: Option<String>,
    pub trading_volume: Option<f64>,

    pub trades_raw: Option<String>,
    pub trades: Option<i64>,

    pub avg_trade_size_raw: Option<String>,
    pub avg_trade_size: Option<f64>,

    pub attempts: u32,
    pub page_ready: bool,
    pub scraped_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_stats_variants_are_tagged_by_source() {
        let record = WalletStatsRecord::SevenDay(SevenDayWalletStats {
            wallet_address: "wallet-1".to_string(),
            total_pnl_raw: Some("$1.2K".to_string()),
            total_pnl: Some(1200.0),
            last_7d_pnl_raw: None,
            last_7d_pnl: None,
            win_rate_raw: Some("61%".to_string()),
            win_rate: Some(61.0),
            attempts: 1,
            page_ready: true,
            scraped_at: Utc::now(),
            parse_errors: vec![],
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "seven_day");
        assert_eq!(json["wallet_address"], "wallet-1");
        assert_eq!(record.wallet_address(), "wallet-1");

        let back: WalletStatsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn empty_parse_errors_are_not_serialized() {
        let record = WalletStatsRecord::SevenDay(SevenDayWalletStats {
            wallet_address: "wallet-2".to_string(),
            total_pnl_raw: None,
            total_pnl: None,
            last_7d_pnl_raw: None,
            last_7d_pnl: None,
            win_rate_raw: None,
            win_rate: None,
            attempts: 2,
            page_ready: false,
            scraped_at: Utc::now(),
            parse_errors: vec![],
        });

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("parse_errors").is_none());
    }
}

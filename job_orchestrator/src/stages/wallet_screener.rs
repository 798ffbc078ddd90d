//! Stage C: per-wallet dashboard statistics.
//!
//! Reads the stage B trader archive, ranks it down to a deduplicated
//! wallet worklist, then walks the worklist one gated fetch at a time.
//! Two dashboard sites are supported with incompatible schemas; each is
//! its own invocable stage writing its own staging file.
//!
//! The dashboards render their numbers asynchronously, which is where the
//! readiness gate earns its keep: a page that never showed the probe is
//! accepted after the retry budget and harvested as a degraded record.

use chrono::Utc;
use config_manager::{ScreenerSiteConfig, SystemConfig};
use persistence_layer::StagingStore;
use render_client::{ExtractQuery, PageAction, PageFetcher, RenderRequest};
use scrape_core::{
    build_worklist, rank_traders, Convention, FieldSpec, FullWalletStats, RankerConfig, RawRow,
    ReadinessGate, RowExtractor, SevenDayWalletStats, TraderRecord, WalletStatsRecord,
    WalletWorkItem,
};
use std::path::PathBuf;
use tracing::{error, info};

use crate::driver::fetch_with_readiness;
use crate::Result;

// ---- 7-day PnL dashboard ----

const SEVEN_DAY_PROBE: &str = "//div[text() = 'Last 7D PnL']";

/// Switch the dashboard to the longer period before harvesting
const SEVEN_DAY_PERIOD_TAB: &str = "//div[text() = '30d']";

const SEVEN_DAY_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "total_pnl",
        selector: "//div[text() = 'Total PnL']//following-sibling::div/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "last_7d_pnl",
        selector: "//div[text() = 'Last 7D PnL']//following-sibling::div/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "win_rate",
        selector: "//div[text() = 'Win Rate']//following-sibling::div/text()",
        convention: Convention::Percentage,
    },
];

fn build_seven_day_record(
    row: &RawRow,
    wallet_address: &str,
    attempts: u32,
    page_ready: bool,
) -> WalletStatsRecord {
    let mut extractor = RowExtractor::new(row);

    let total_pnl = extractor.number("total_pnl", Convention::Currency);
    let last_7d_pnl = extractor.number("last_7d_pnl", Convention::Currency);
    let win_rate = extractor.number("win_rate", Convention::Percentage);

    WalletStatsRecord::SevenDay(SevenDayWalletStats {
        wallet_address: wallet_address.to_string(),
        total_pnl_raw: total_pnl.raw,
        total_pnl: total_pnl.value,
        last_7d_pnl_raw: last_7d_pnl.raw,
        last_7d_pnl: last_7d_pnl.value,
        win_rate_raw: win_rate.raw,
        win_rate: win_rate.value,
        attempts,
        page_ready,
        scraped_at: Utc::now(),
        parse_errors: extractor.finish(),
    })
}

// ---- realized/unrealized dashboard ----

const FULL_PROBE: &str = "//button[text()='Gross Profit']/following-sibling::p/text()";

const FULL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "gross_profit",
        selector: "//button[text()='Gross Profit']/following-sibling::p/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "realized_profit",
        selector: "//button[text()='Gross Profit']/../div//p[text()='Realized']/following-sibling::p/span[1]/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "unrealized_profit",
        selector: "//button[text()='Gross Profit']/../div//p[text()='Unrealized']/following-sibling::p/span[1]/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "roi",
        selector: "//button[text()='Total ROI']/following-sibling::p/text()[1]",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "realized_roi",
        selector: "//button[text()='Total ROI']/../div//p[text()='Realized']/following-sibling::p/text()[1]",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "unrealized_roi",
        selector: "//button[text()='Total ROI']/../div//p[text()='Unrealized']/following-sibling::p/text()[1]",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "win_rate",
        selector: "//button[text()='Win Rate']/following-sibling::div/p/text()",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "wins",
        selector: "//button[text()='Win Rate']/following-sibling::div//p[text()='Win']/following-sibling::p/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "losses",
        selector: "//button[text()='Win Rate']/following-sibling::div//p[text()='Lose']/following-sibling::p/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "trading_volume",
        selector: "//button[text()='Trading Volume']/following-sibling::p/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "trades",
        selector: "//button[text()='Trades']/following-sibling::p/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "avg_trade_size",
        selector: "//button[text()='Avg. Trade Size']/following-sibling::p/span[1]/text()",
        convention: Convention::Currency,
    },
];

fn build_full_record(
    row: &RawRow,
    wallet_address: &str,
    attempts: u32,
    page_ready: bool,
) -> WalletStatsRecord {
    let mut extractor = RowExtractor::new(row);

    let gross_profit = extractor.number("gross_profit", Convention::Currency);
    let realized_profit = extractor.number("realized_profit", Convention::Currency);
    let unrealized_profit = extractor.number("unrealized_profit", Convention::Currency);
    let roi = extractor.number("roi", Convention::Percentage);
    let realized_roi = extractor.number("realized_roi", Convention::Percentage);
    let unrealized_roi = extractor.number("unrealized_roi", Convention::Percentage);
    let win_rate = extractor.number("win_rate", Convention::Percentage);
    let wins = extractor.count("wins");
    let losses = extractor.count("losses");
    let trading_volume = extractor.number("trading_volume", Convention::Currency);
    let trades = extractor.count("trades");
    let avg_trade_size = extractor.number("avg_trade_size", Convention::Currency);

    WalletStatsRecord::Full(FullWalletStats {
        wallet_address: wallet_address.to_string(),
        gross_profit_raw: gross_profit.raw,
        gross_profit: gross_profit.value,
        realized_profit_raw: realized_profit.raw,
        realized_profit: realized_profit.value,
        unrealized_profit_raw: unrealized_profit.raw,
        unrealized_profit: unrealized_profit.value,
        roi_raw: roi.raw,
        roi: roi.value,
        realized_roi_raw: realized_roi.raw,
        realized_roi: realized_roi.value,
        unrealized_roi_raw: unrealized_roi.raw,
        unrealized_roi: unrealized_roi.value,
        win_rate_raw: win_rate.raw,
        win_rate: win_rate.value,
        wins_raw: wins.raw,
        wins: wins.value,
        losses_raw: losses.raw,
        losses: losses.value,
        trading_volume_raw: trading_volume.raw,
        trading_volume: trading_volume.value,
        trades_raw: trades.raw,
        trades: trades.value,
        avg_trade_size_raw: avg_trade_size.raw,
        avg_trade_size: avg_trade_size.value,
        attempts,
        page_ready,
        scraped_at: Utc::now(),
        parse_errors: extractor.finish(),
    })
}

// ---- shared driver ----

/// Rank the trader archive and boil it down to the wallet worklist
async fn load_worklist(
    config: &SystemConfig,
    staging: &StagingStore,
) -> Result<Vec<WalletWorkItem>> {
    let traders: Vec<TraderRecord> = staging
        .read_records(&config.top_traders.output_file)
        .await?;
    info!("📖 Loaded {} trader records for ranking", traders.len());

    let ranker_config = RankerConfig {
        rank_method: config.wallet_screener.rank_method,
        pct_pnl_rank_cutoff: config.wallet_screener.pct_pnl_rank_cutoff,
    };
    let ranked = rank_traders(&traders, &ranker_config);
    let worklist = build_worklist(&ranked);
    info!(
        "🎯 {} of {} trader records qualified, {} unique wallets to screen",
        ranked.len(),
        traders.len(),
        worklist.len()
    );
    Ok(worklist)
}

type RecordBuilder = fn(&RawRow, &str, u32, bool) -> WalletStatsRecord;

async fn screen_wallets(
    config: &SystemConfig,
    fetcher: &dyn PageFetcher,
    staging: &StagingStore,
    site: &ScreenerSiteConfig,
    actions: Vec<PageAction>,
    probe: &str,
    fields: &[FieldSpec],
    build_record: RecordBuilder,
) -> Result<(usize, PathBuf)> {
    let worklist = load_worklist(config, staging).await?;
    let gate = ReadinessGate::new(config.wallet_screener.max_retries);
    let mut records: Vec<WalletStatsRecord> = Vec::with_capacity(worklist.len());

    for item in &worklist {
        info!(
            "🔍 Screening wallet {} ({} of {})",
            item.wallet_address, item.index, item.total
        );

        let request = RenderRequest::new(
            site.wallet_url(&item.wallet_address),
            ExtractQuery::from_specs(None, fields),
        )
        .with_actions(actions.clone())
        .with_readiness_probe(probe);

        let label = format!("wallet {} ({} of {})", item.wallet_address, item.index, item.total);
        let fetched = fetch_with_readiness(fetcher, &request, &gate, &label).await?;

        if !fetched.page.action_log.is_empty() {
            info!(
                "Raw action log for {} -> {}",
                label,
                serde_json::to_string(&fetched.page.action_log).unwrap_or_default()
            );
        }
        if !fetched.ready {
            error!(
                "Dashboard never finished rendering for {} after {} attempts; emitting a degraded record",
                label, fetched.attempts
            );
        }

        // single-row extraction: the document is the row
        let empty = RawRow::new();
        let row = fetched.page.rows.first().unwrap_or(&empty);
        records.push(build_record(
            row,
            &item.wallet_address,
            fetched.attempts,
            fetched.ready,
        ));
    }

    let path = staging.write_records(&site.output_file, &records).await?;
    Ok((records.len(), path))
}

pub async fn run_seven_day(
    config: &SystemConfig,
    fetcher: &dyn PageFetcher,
    staging: &StagingStore,
) -> Result<(usize, PathBuf)> {
    let site = config.wallet_screener.seven_day.clone();
    let actions = vec![
        PageAction::wait_for(SEVEN_DAY_PROBE, site.wait_timeout_seconds),
        PageAction::click(SEVEN_DAY_PERIOD_TAB),
    ];
    screen_wallets(
        config,
        fetcher,
        staging,
        &site,
        actions,
        SEVEN_DAY_PROBE,
        SEVEN_DAY_FIELDS,
        build_seven_day_record,
    )
    .await
}

pub async fn run_full(
    config: &SystemConfig,
    fetcher: &dyn PageFetcher,
    staging: &StagingStore,
) -> Result<(usize, PathBuf)> {
    let site = config.wallet_screener.full.clone();
    let actions = vec![PageAction::wait_for(FULL_PROBE, site.wait_timeout_seconds)];
    screen_wallets(
        config,
        fetcher,
        staging,
        &site,
        actions,
        FULL_PROBE,
        FULL_FIELDS,
        build_full_record,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, &str)]) -> RawRow {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[test]
    fn seven_day_record_normalizes_the_dashboard_numbers() {
        let row = row(&[
            ("total_pnl", "$12.4K"),
            ("last_7d_pnl", "-$230.5"),
            ("win_rate", "61.3%"),
        ]);

        let record = build_seven_day_record(&row, "wallet-1", 1, true);
        let WalletStatsRecord::SevenDay(stats) = record else {
            panic!("expected the seven-day variant");
        };

        assert_eq!(stats.total_pnl, Some(12_400.0));
        assert_eq!(stats.last_7d_pnl, Some(-230.5));
        assert_eq!(stats.win_rate, Some(61.3));
        assert_eq!(stats.total_pnl_raw.as_deref(), Some("$12.4K"));
        assert!(stats.page_ready);
    }

    #[test]
    fn degraded_page_still_yields_a_record() {
        let record = build_seven_day_record(&RawRow::new(), "wallet-2", 2, false);
        let WalletStatsRecord::SevenDay(stats) = record else {
            panic!("expected the seven-day variant");
        };

        assert_eq!(stats.wallet_address, "wallet-2");
        assert_eq!(stats.total_pnl, None);
        assert_eq!(stats.attempts, 2);
        assert!(!stats.page_ready);
    }

    #[test]
    fn full_record_covers_the_realized_unrealized_split() {
        let row = row(&[
            ("gross_profit", "$1.1M"),
            ("realized_profit", "$900K"),
            ("unrealized_profit", "$200K"),
            ("roi", "45%"),
            ("win_rate", "58%"),
            ("wins", "116"),
            ("losses", "84"),
            ("trading_volume", "$4.2M"),
            ("trades", "200"),
            ("avg_trade_size", "$21K"),
        ]);

        let record = build_full_record(&row, "wallet-3", 1, true);
        let WalletStatsRecord::Full(stats) = record else {
            panic!("expected the full variant");
        };

        assert_eq!(stats.gross_profit, Some(1_100_000.0));
        assert_eq!(stats.realized_profit, Some(900_000.0));
        assert_eq!(stats.unrealized_profit, Some(200_000.0));
        assert_eq!(stats.roi, Some(45.0));
        assert_eq!(stats.wins, Some(116));
        assert_eq!(stats.losses, Some(84));
        assert_eq!(stats.trades, Some(200));
        assert_eq!(stats.avg_trade_size, Some(21_000.0));
    }
}

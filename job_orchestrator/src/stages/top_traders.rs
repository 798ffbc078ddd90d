//! Stage B: top traders per leaderboard token.
//!
//! One gated fetch per token from the stage A staging file. The trader
//! panel is behind a tab, so the request carries wait-and-click actions;
//! readiness means at least the panel header rendered.

use chrono::Utc;
use config_manager::SystemConfig;
use persistence_layer::StagingStore;
use render_client::{ExtractQuery, PageAction, PageFetcher, RenderRequest};
use scrape_core::{
    wallet_address_from_explorer_url, Convention, FieldSpec, RawRow, ReadinessGate, RowExtractor,
    TokenRecord, TraderRecord,
};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::driver::fetch_with_readiness;
use crate::Result;

/// Tab that reveals the trader panel
const TOP_TRADERS_BUTTON: &str = "//button[text() = 'Top Traders']";

/// The panel header renders before the rows; its presence is the
/// readiness signal
const READINESS_PROBE: &str = "//span[text() = 'bought']";

const ROW_ROOT: &str = "//span[text() = 'bought']/../../following-sibling::div";

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "bought_usd",
        selector: ".//span[@class='chakra-text custom-rcecxm']/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "bought_native",
        selector: ".//span[@class='chakra-text custom-rcecxm']/following-sibling::span/span[1]/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "buy_txns",
        selector: ".//span[@class='chakra-text custom-rcecxm']/following-sibling::span/span[3]/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "sold_usd",
        selector: ".//span[@class='chakra-text custom-dv3t8y']/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "sold_native",
        selector: ".//span[@class='chakra-text custom-dv3t8y']/following-sibling::span/span[1]/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "sell_txns",
        selector: ".//span[@class='chakra-text custom-dv3t8y']/following-sibling::span/span[3]/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "pnl_usd",
        selector: ".//div[@class='custom-1e9y0rl']/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "explorer_url",
        selector: ".//a[@aria-label='Open in block explorer']/@href",
        convention: Convention::Text,
    },
];

/// Map one trader row to a TraderRecord, carrying the token context
pub fn build_trader_record(row: &RawRow, token: &TokenRecord) -> TraderRecord {
    let mut extractor = RowExtractor::new(row);

    let bought_usd = extractor.number("bought_usd", Convention::Currency);
    let bought_native = extractor.number("bought_native", Convention::Currency);
    let buy_txns = extractor.count("buy_txns");
    let sold_usd = extractor.number("sold_usd", Convention::Currency);
    let sold_native = extractor.number("sold_native", Convention::Currency);
    let sell_txns = extractor.count("sell_txns");
    let pnl_usd = extractor.number("pnl_usd", Convention::Currency);

    let explorer_url = extractor.text("explorer_url");
    let wallet_address = explorer_url
        .as_deref()
        .and_then(wallet_address_from_explorer_url);

    TraderRecord {
        token_symbol: token.token_symbol.clone(),
        pair_url: token.pair_url.clone(),
        bought_usd_raw: bought_usd.raw,
        bought_usd: bought_usd.value,
        bought_native_raw: bought_native.raw,
        bought_native: bought_native.value,
        buy_txns_raw: buy_txns.raw,
        buy_txns: buy_txns.value,
        sold_usd_raw: sold_usd.raw,
        sold_usd: sold_usd.value,
        sold_native_raw: sold_native.raw,
        sold_native: sold_native.value,
        sell_txns_raw: sell_txns.raw,
        sell_txns: sell_txns.value,
        pnl_usd_raw: pnl_usd.raw,
        pnl_usd: pnl_usd.value,
        explorer_url,
        wallet_address,
        scraped_at: Utc::now(),
        parse_errors: extractor.finish(),
    }
}

pub async fn run(
    config: &SystemConfig,
    fetcher: &dyn PageFetcher,
    staging: &StagingStore,
) -> Result<(usize, PathBuf)> {
    let tokens: Vec<TokenRecord> = staging
        .read_records(&config.leaderboard.output_file)
        .await?;
    info!("📖 Loaded {} leaderboard tokens for trader discovery", tokens.len());

    let gate = ReadinessGate::new(config.top_traders.max_retries);
    let wait_timeout = config.top_traders.wait_timeout_seconds;
    let mut records: Vec<TraderRecord> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Some(pair_url) = token.pair_url.clone() else {
            warn!("Token {:?} has no pair URL, skipping", token.token_symbol);
            continue;
        };

        let label = format!(
            "token {} ({} of {})",
            token.token_symbol.as_deref().unwrap_or("?"),
            i + 1,
            tokens.len()
        );
        info!("🔍 Fetching top traders for {}: {}", label, pair_url);

        let request = RenderRequest::new(pair_url, ExtractQuery::from_specs(Some(ROW_ROOT), FIELDS))
            .with_actions(vec![
                PageAction::wait_for(TOP_TRADERS_BUTTON, wait_timeout),
                PageAction::click(TOP_TRADERS_BUTTON),
            ])
            .with_readiness_probe(READINESS_PROBE);

        let fetched = fetch_with_readiness(fetcher, &request, &gate, &label).await?;
        if !fetched.ready {
            warn!(
                "Trader panel never rendered for {} after {} attempts; harvesting anyway",
                label, fetched.attempts
            );
        }

        records.extend(
            fetched
                .page
                .rows
                .iter()
                .map(|row| build_trader_record(row, token)),
        );
    }

    let path = staging
        .write_records(&config.top_traders.output_file, &records)
        .await?;
    Ok((records.len(), path))
}

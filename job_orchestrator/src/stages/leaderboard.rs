//! Stage A: the top-gainers leaderboard.
//!
//! One rendered fetch of the filtered leaderboard, one TokenRecord per
//! table row. The filter thresholds ride on the URL, so the page itself
//! is already bounded to liquid, actively traded tokens.

use chrono::Utc;
use config_manager::SystemConfig;
use persistence_layer::StagingStore;
use render_client::{ExtractQuery, PageFetcher, RenderRequest};
use scrape_core::{Convention, FieldSpec, RawRow, RowExtractor, TokenRecord};
use std::path::PathBuf;
use tracing::{info, warn};

use super::site_origin;
use crate::Result;

const ROW_ROOT: &str = "//div[@class='ds-dex-table ds-dex-table-top']/a";

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "token_symbol",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-token')]/span[contains(@class, 'ds-dex-table-row-base-token-symbol')]/text()",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "token_name",
        selector: ".//div[@class='ds-dex-table-row-base-token-name']/span/text()[1]",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "pair_href",
        selector: "./@href",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "gain_rank",
        selector: ".//span[@class='ds-dex-table-row-badge-pair-no']/text()[2]",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "network",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-token')]/img[@class='ds-dex-table-row-chain-icon']/@title",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "dex",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-token')]/img[@class='ds-dex-table-row-dex-icon']/@title",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "price_usd",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-price')]/text()[2]",
        convention: Convention::Price,
    },
    FieldSpec {
        name: "pair_age",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-pair-age')]/span/text()",
        convention: Convention::Text,
    },
    FieldSpec {
        name: "txns_24h",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-txns')]/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "volume_24h_mil",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-volume')]/text()[2]",
        convention: Convention::Magnitude,
    },
    FieldSpec {
        name: "makers",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-makers')]/text()",
        convention: Convention::Count,
    },
    FieldSpec {
        name: "price_change_m5",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-price-change-m5')]/span/text()",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "price_change_h1",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-price-change-h1')]/span/text()",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "price_change_h6",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-price-change-h6')]/span/text()",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "price_change_h24",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-price-change-h24')]/span/text()",
        convention: Convention::Percentage,
    },
    FieldSpec {
        name: "liquidity_mil",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-liquidity')]/text()[2]",
        convention: Convention::Magnitude,
    },
    FieldSpec {
        name: "market_cap_mil",
        selector: "./div[contains(@class, 'ds-dex-table-row-col-market-cap')]/text()[2]",
        convention: Convention::Magnitude,
    },
];

/// Map one leaderboard row to a TokenRecord
pub fn build_token_record(row: &RawRow, leaderboard_url: &str) -> TokenRecord {
    let mut extractor = RowExtractor::new(row);

    let pair_url = extractor.text("pair_href").map(|href| {
        if href.starts_with("http") {
            href
        } else {
            let origin = site_origin(leaderboard_url).unwrap_or_default();
            format!("{}{}", origin, href)
        }
    });

    let gain_rank = extractor.count("gain_rank");
    let price_usd = extractor.number("price_usd", Convention::Price);
    let txns_24h = extractor.count("txns_24h");
    let volume = extractor.number("volume_24h_mil", Convention::Magnitude);
    let makers = extractor.count("makers");
    let change_m5 = extractor.number("price_change_m5", Convention::Percentage);
    let change_h1 = extractor.number("price_change_h1", Convention::Percentage);
    let change_h6 = extractor.number("price_change_h6", Convention::Percentage);
    let change_h24 = extractor.number("price_change_h24", Convention::Percentage);
    let liquidity = extractor.number("liquidity_mil", Convention::Magnitude);
    let market_cap = extractor.number("market_cap_mil", Convention::Magnitude);

    TokenRecord {
        token_symbol: extractor.text("token_symbol"),
        token_name: extractor.text("token_name"),
        pair_url,
        network: extractor.text("network"),
        dex: extractor.text("dex"),
        gain_rank_raw: gain_rank.raw,
        gain_rank: gain_rank.value,
        price_usd_raw: price_usd.raw,
        price_usd: price_usd.value,
        pair_age: extractor.text("pair_age"),
        txns_24h_raw: txns_24h.raw,
        txns_24h: txns_24h.value,
        volume_24h_mil_raw: volume.raw,
        volume_24h_mil: volume.value,
        makers_raw: makers.raw,
        makers: makers.value,
        price_change_m5_raw: change_m5.raw,
        price_change_m5: change_m5.value,
        price_change_h1_raw: change_h1.raw,
        price_change_h1: change_h1.value,
        price_change_h6_raw: change_h6.raw,
        price_change_h6: change_h6.value,
        price_change_h24_raw: change_h24.raw,
        price_change_h24: change_h24.value,
        liquidity_mil_raw: liquidity.raw,
        liquidity_mil: liquidity.value,
        market_cap_mil_raw: market_cap.raw,
        market_cap_mil: market_cap.value,
        scraped_at: Utc::now(),
        parse_errors: extractor.finish(),
    }
}

pub async fn run(
    config: &SystemConfig,
    fetcher: &dyn PageFetcher,
    staging: &StagingStore,
) -> Result<(usize, PathBuf)> {
    let url = config.leaderboard.url();
    info!("📊 Fetching the top-gainers leaderboard: {}", url);

    let request = RenderRequest::new(url.clone(), ExtractQuery::from_specs(Some(ROW_ROOT), FIELDS));
    let page = fetcher.fetch(&request).await?;

    if page.rows.is_empty() {
        warn!("Leaderboard returned no rows; the page layout may have changed");
    }

    let records: Vec<TokenRecord> = page
        .rows
        .iter()
        .map(|row| build_token_record(row, &url))
        .collect();

    let path = staging
        .write_records(&config.leaderboard.output_file, &records)
        .await?;
    Ok((records.len(), path))
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
    fn token_record_keeps_raw_and_normalized_pairs() {
        let row = row(&[
            ("token_symbol", "WIF"),
            ("pair_href", "/solana/abcdef"),
            ("gain_rank", "1"),
            ("price_usd", "0.0425"),
            ("volume_24h_mil", "1.5M"),
            ("liquidity_mil", "750K"),
            ("market_cap_mil", "2.1B"),
            ("price_change_h24", "1,250%"),
            ("txns_24h", "4,512"),
        ]);

        let record = build_token_record(&row, "https://dexscreener.com/gainers/solana");

        assert_eq!(record.token_symbol.as_deref(), Some("WIF"));
        assert_eq!(
            record.pair_url.as_deref(),
            Some("https://dexscreener.com/solana/abcdef")
        );
        assert_eq!(record.gain_rank, Some(1));
        assert_eq!(record.price_usd, Some(0.0425));
        assert_eq!(record.volume_24h_mil_raw.as_deref(), Some("1.5M"));
        assert_eq!(record.volume_24h_mil, Some(1.5));
        assert_eq!(record.liquidity_mil, Some(0.75));
        assert_eq!(record.market_cap_mil, Some(2100.0));
        assert_eq!(record.price_change_h24, Some(1250.0));
        assert_eq!(record.txns_24h, Some(4512));
        assert!(record.parse_errors.is_empty());
    }

    #[test]
    fn sparse_rows_produce_partial_records() {
        let record = build_token_record(&RawRow::new(), "https://dexscreener.com/gainers/solana");
        assert_eq!(record.token_symbol, None);
        assert_eq!(record.volume_24h_mil, None);
        assert_eq!(record.volume_24h_mil_raw, None);
        assert!(record.parse_errors.is_empty());
    }
}

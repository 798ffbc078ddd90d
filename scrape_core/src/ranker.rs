//! Trader ranking and wallet worklist selection.
//!
//! Takes the full stage B trader population, computes percentage PnL,
//! ranks on absolute and percentage PnL, and boils the population down to
//! an ordered, deduplicated wallet list for stage C.

use std::cmp::Ordering;
use std::collections::HashSet;

use config_manager::RankMethod;
use tracing::{debug, info, warn};

use crate::records::{RankedTraderRecord, TraderRecord, WalletWorkItem};

#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub rank_method: RankMethod,
    /// Records whose percentage-PnL rank exceeds this are dropped from the
    /// worklist. A guardrail, effectively unbounded by default.
    pub pct_pnl_rank_cutoff: u64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            rank_method: RankMethod::Competition,
            pct_pnl_rank_cutoff: 1_000_000,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Descending ranks over `values`; ties share a rank under both methods,
/// competition leaves a gap after a tie and dense does not.
fn assign_ranks(values: &[f64], method: RankMethod) -> Vec<u64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0u64; values.len()];
    let mut previous: Option<f64> = None;
    let mut competition_rank = 0u64;
    let mut dense_rank = 0u64;

    for (position, &index) in order.iter().enumerate() {
        let value = values[index];
        if previous != Some(value) {
            competition_rank = position as u64 + 1;
            dense_rank += 1;
            previous = Some(value);
        }
        ranks[index] = match method {
            RankMethod::Competition => competition_rank,
            RankMethod::Dense => dense_rank,
        };
    }

    ranks
}

/// Rank the full trader population.
///
/// Records qualify only with both bought-USD and sold-USD present (and a
/// non-zero, finite bought amount, or percentage PnL is undefined);
/// disqualified records stay in the raw archive untouched. Null realized
/// PnL counts as zero. Arrival order carries no meaning, so the output is
/// explicitly re-sorted by absolute PnL descending.
pub fn rank_traders(records: &[TraderRecord], config: &RankerConfig) -> Vec<RankedTraderRecord> {
    let mut qualified: Vec<RankedTraderRecord> = records
        .iter()
        .filter_map(|record| {
            let bought_usd = record.bought_usd?;
            let sold_usd = record.sold_usd?;
            if bought_usd == 0.0 || !bought_usd.is_finite() || !sold_usd.is_finite() {
                debug!(
                    "Skipping trader {:?}: unusable bought/sold amounts",
                    record.wallet_address
                );
                return None;
            }
            let pnl_usd = round2(record.pnl_usd.unwrap_or(0.0));
            Some(RankedTraderRecord {
                token_symbol: record.token_symbol.clone(),
                pair_url: record.pair_url.clone(),
                wallet_address: record.wallet_address.clone(),
                bought_usd: round2(bought_usd),
                sold_usd: round2(sold_usd),
                bought_native: record.bought_native,
                buy_txns: record.buy_txns,
                sold_native: record.sold_native,
                sell_txns: record.sell_txns,
                pnl_usd,
                pct_pnl: round2(pnl_usd / bought_usd * 100.0),
                abs_pnl_rank: 0,
                pct_pnl_rank: 0,
            })
        })
        .collect();

    qualified.sort_by(|a, b| {
        b.pnl_usd
            .partial_cmp(&a.pnl_usd)
            .unwrap_or(Ordering::Equal)
    });

    let abs_values: Vec<f64> = qualified.iter().map(|r| r.pnl_usd).collect();
    let pct_values: Vec<f64> = qualified.iter().map(|r| r.pct_pnl).collect();
    let abs_ranks = assign_ranks(&abs_values, config.rank_method);
    let pct_ranks = assign_ranks(&pct_values, config.rank_method);

    for (record, (abs_rank, pct_rank)) in qualified
        .iter_mut()
        .zip(abs_ranks.into_iter().zip(pct_ranks))
    {
        record.abs_pnl_rank = abs_rank;
        record.pct_pnl_rank = pct_rank;
    }

    let before_cutoff = qualified.len();
    qualified.retain(|record| record.pct_pnl_rank <= config.pct_pnl_rank_cutoff);
    if qualified.len() < before_cutoff {
        info!(
            "Rank cutoff {} dropped {} of {} qualified traders",
            config.pct_pnl_rank_cutoff,
            before_cutoff - qualified.len(),
            before_cutoff
        );
    }

    qualified
}

/// Deduplicated wallet worklist: a wallet that traded several tokens keeps
/// the position of its first (highest-PnL) occurrence.
pub fn build_worklist(ranked: &[RankedTraderRecord]) -> Vec<WalletWorkItem> {
    let mut seen = HashSet::new();
    let wallets: Vec<String> = ranked
        .iter()
        .filter_map(|record| match &record.wallet_address {
            Some(address) => Some(address.clone()),
            None => {
                warn!("Ranked trader with no wallet address, skipping");
                None
            }
        })
        .filter(|address| seen.insert(address.clone()))
        .collect();

    let total = wallets.len();
    wallets
        .into_iter()
        .enumerate()
        .map(|(i, wallet_address)| WalletWorkItem {
            wallet_address,
            attempt: 1,
            index: i + 1,
            total,
        })
        .collect()
}

pub mod extract;
pub mod normalize;
pub mod ranker;
pub mod readiness;
pub mod records;

pub use extract::{
    wallet_address_from_explorer_url, Convention, CountField, FieldSpec, NumericField, RawRow,
    RowExtractor,
};
pub use normalize::{
    coerce_float, coerce_integer, normalize_magnitude, normalize_percentage, normalize_txn_amount,
    NormalizeError,
};
pub use ranker::{build_worklist, rank_traders, RankerConfig};
pub use readiness::{FetchState, ReadinessGate};
pub use records::{
    FullWalletStats, RankedTraderRecord, SevenDayWalletStats, TokenRecord, TraderRecord,
    WalletStatsRecord, WalletWorkItem,
};

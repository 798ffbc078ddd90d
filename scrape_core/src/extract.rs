//! Selector-table-driven field extraction.
//!
//! A stage declares its fields as data: name, selector expression and the
//! normalization convention to apply. The render collaborator evaluates the
//! selectors and hands back one raw-text row per scraped element; this
//! module turns a row into raw/normalized field pairs. Missing content is
//! absence, not an error, and a malformed value is recorded against the
//! field without touching its siblings.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::normalize;

/// Normalization convention applied to a field's raw text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// K/M/B/T suffix, normalized to millions (volume, liquidity, mcap)
    Magnitude,
    /// Percent sign and thousands separators, B/M/K scaled by powers of ten
    Percentage,
    /// Currency symbol, separators and "<" marker, B/M/K scaled
    Currency,
    /// Thousands separators only, parsed as a float
    Price,
    /// Currency-style cleanup, coerced to an integer count
    Count,
    /// Kept verbatim
    Text,
}

/// One field declaration: adding a field or a site is a table entry, not a
/// code branch
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub selector: &'static str,
    pub convention: Convention,
}

/// Raw extraction result for one element, as returned by the render
/// collaborator: field name to optional text
pub type RawRow = HashMap<String, Option<String>>;

/// A float field with its audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    pub raw: Option<String>,
    pub value: Option<f64>,
}

/// An integer field with its audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct CountField {
    pub raw: Option<String>,
    pub value: Option<i64>,
}

/// Stateless per-row extractor. Accumulates field-level normalization
/// failures so the caller can attach them to the finished record.
pub struct RowExtractor<'a> {
    row: &'a RawRow,
    errors: Vec<String>,
}

impl<'a> RowExtractor<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        Self {
            row,
            errors: Vec::new(),
        }
    }

    fn raw(&self, name: &str) -> Option<String> {
        self.row.get(name).and_then(|value| value.clone())
    }

    /// Verbatim text field; absent selector match stays absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.raw(name)
    }

    /// Normalized float field under the given convention. On malformed
    /// text the value is absent, the raw text is kept and the failure is
    /// recorded against the field name.
    pub fn number(&mut self, name: &str, convention: Convention) -> NumericField {
        let raw = self.raw(name);
        let value = match raw.as_deref() {
            None => None,
            Some(text) => {
                let result = match convention {
                    Convention::Magnitude => normalize::normalize_magnitude(text).map(Some),
                    Convention::Percentage => normalize::normalize_percentage(text).map(Some),
                    Convention::Currency => normalize::normalize_txn_amount(Some(text)),
                    Convention::Price => {
                        let cleaned: String = text.chars().filter(|c| *c != ',').collect();
                        normalize::coerce_float(Some(&cleaned))
                    }
                    Convention::Count | Convention::Text => {
                        self.errors
                            .push(format!("{}: convention not numeric", name));
                        Ok(None)
                    }
                };
                match result {
                    Ok(value) => value,
                    Err(e) => {
                        self.errors.push(format!("{}: {}", name, e));
                        None
                    }
                }
            }
        };
        NumericField { raw, value }
    }

    /// Normalized integer field: currency-style cleanup and B/M/K scaling,
    /// then coerced to an integer
    pub fn count(&mut self, name: &str) -> CountField {
        let raw = self.raw(name);
        let value = match raw.as_deref() {
            None => None,
            Some(text) => match normalize::normalize_txn_amount(Some(text)) {
                Ok(v) => v.map(|v| v.round() as i64),
                Err(e) => {
                    self.errors.push(format!("{}: {}", name, e));
                    None
                }
            },
        };
        CountField { raw, value }
    }

    /// Field-level failures collected while extracting this row
    pub fn finish(self) -> Vec<String> {
        self.errors
    }
}

static EXPLORER_ACCOUNT_RE: OnceLock<Regex> = OnceLock::new();

/// Wallet address from a block-explorer link
/// ("https://solscan.io/account/<address>")
pub fn wallet_address_from_explorer_url(url: &str) -> Option<String> {
    let re = EXPLORER_ACCOUNT_RE
        .get_or_init(|| Regex::new(r"account/([^/?#]+)").expect("static pattern"));
    re.captures(url).map(|caps| caps[1].to_string())
}

//! Text-to-number normalization for scraped values.
//!
//! The source pages render numbers inconsistently: magnitude suffixes
//! (K/M/B/T), percent signs, currency symbols, thousands separators and
//! "less than" markers ("<$0.01"). Each field family has its own
//! convention, and all of them reject malformed residual text instead of
//! silently returning zero.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("not a number: {raw:?}")]
    NotANumber { raw: String },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

fn parse_residual(residual: &str, raw: &str) -> Result<f64> {
    residual
        .trim()
        .parse::<f64>()
        .map_err(|_| NormalizeError::NotANumber {
            raw: raw.to_string(),
        })
}

/// Volume, liquidity and market-cap convention: the value is expressed in
/// millions. "1.5B" -> 1500.0, "750K" -> 0.75, a bare number is already in
/// millions.
pub fn normalize_magnitude(raw: &str) -> Result<f64> {
    let value = raw.trim();
    if let Some(rest) = value.strip_suffix('T') {
        Ok(parse_residual(rest, raw)? * 1_000_000.0)
    } else if let Some(rest) = value.strip_suffix('B') {
        Ok(parse_residual(rest, raw)? * 1_000.0)
    } else if let Some(rest) = value.strip_suffix('M') {
        parse_residual(rest, raw)
    } else if let Some(rest) = value.strip_suffix('K') {
        Ok(parse_residual(rest, raw)? / 1_000.0)
    } else {
        parse_residual(value, raw)
    }
}

/// Percentage-gain convention: strips "%" and thousands separators, scales
/// by 10^9/10^6/10^3 for a B/M/K suffix. A bare value stays as written
/// ("12.5%" -> 12.5), unlike the magnitude convention.
///
/// Absence is the caller's concern - check before calling; the signature
/// has no absent case on purpose.
pub fn normalize_percentage(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '%' | ','))
        .collect();
    let value = cleaned.trim();
    if let Some(rest) = value.strip_suffix('B') {
        Ok(parse_residual(rest, raw)? * 1e9)
    } else if let Some(rest) = value.strip_suffix('M') {
        Ok(parse_residual(rest, raw)? * 1e6)
    } else if let Some(rest) = value.strip_suffix('K') {
        Ok(parse_residual(rest, raw)? * 1e3)
    } else {
        parse_residual(value, raw)
    }
}

/// Transaction/currency convention: strips a currency symbol, thousands
/// separators and the "<" marker the pages use for dust amounts
/// ("<$0.01" -> 0.01), then applies B/M/K scaling as the percentage
/// convention does. Absent input stays absent - normalization is a no-op
/// on missing data, and callers must treat "no value" as a valid result.
pub fn normalize_txn_amount(raw: Option<&str>) -> Result<Option<f64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '<'))
        .collect();
    let value = cleaned.trim();
    let normalized = if let Some(rest) = value.strip_suffix('B') {
        parse_residual(rest, raw)? * 1e9
    } else if let Some(rest) = value.strip_suffix('M') {
        parse_residual(rest, raw)? * 1e6
    } else if let Some(rest) = value.strip_suffix('K') {
        parse_residual(rest, raw)? * 1e3
    } else {
        parse_residual(value, raw)?
    };
    Ok(Some(normalized))
}

/// Coerce a present text value to an integer; absent stays absent.
/// No cleanup is applied - callers strip separators first.
pub fn coerce_integer(raw: Option<&str>) -> Result<Option<i64>> {
    match raw {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| NormalizeError::NotANumber {
                raw: text.to_string(),
            }),
    }
}

/// Coerce a present text value to a float; absent stays absent.
pub fn coerce_float(raw: Option<&str>) -> Result<Option<f64>> {
    match raw {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| NormalizeError::NotANumber {
                raw: text.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_scales_are_monotonic() {
        // "1T" == 1_000_000 x "1M", "1B" == 1_000 x "1M", "1K" == "1M" / 1000
        let one_m = normalize_magnitude("1M").unwrap();
        assert_eq!(normalize_magnitude("1T").unwrap(), one_m * 1_000_000.0);
        assert_eq!(normalize_magnitude("1B").unwrap(), one_m * 1_000.0);
        assert_eq!(normalize_magnitude("1K").unwrap(), one_m / 1_000.0);
    }

    #[test]
    fn magnitude_bare_value_is_already_in_millions() {
        assert_eq!(normalize_magnitude("2.5").unwrap(), 2.5);
        assert_eq!(normalize_magnitude("750K").unwrap(), 0.75);
        assert_eq!(normalize_magnitude("1.5B").unwrap(), 1500.0);
    }

    #[test]
    fn magnitude_rejects_malformed_residual() {
        let err = normalize_magnitude("12.3.4M").unwrap_err();
        assert_eq!(
            err,
            NormalizeError::NotANumber {
                raw: "12.3.4M".to_string()
            }
        );
        assert!(normalize_magnitude("").is_err());
        assert!(normalize_magnitude("M").is_err());
    }

    #[test]
    fn percentage_bare_branch_is_unscaled() {
        assert_eq!(normalize_percentage("12.5%").unwrap(), 12.5);
        assert_eq!(normalize_percentage("-3.2%").unwrap(), -3.2);
        assert_eq!(normalize_percentage("1,250%").unwrap(), 1250.0);
    }

    #[test]
    fn percentage_suffixes_scale_by_powers_of_ten() {
        assert_eq!(normalize_percentage("1.2M%").unwrap(), 1_200_000.0);
        assert_eq!(normalize_percentage("3K%").unwrap(), 3_000.0);
        assert_eq!(normalize_percentage("2B%").unwrap(), 2_000_000_000.0);
    }

    #[test]
    fn txn_amount_strips_currency_markers() {
        assert_eq!(normalize_txn_amount(Some("<$0.01")).unwrap(), Some(0.01));
        assert_eq!(
            normalize_txn_amount(Some("$1,234.56")).unwrap(),
            Some(1234.56)
        );
        assert_eq!(normalize_txn_amount(Some("$1.2K")).unwrap(), Some(1200.0));
        assert_eq!(
            normalize_txn_amount(Some("$3.4M")).unwrap(),
            Some(3_400_000.0)
        );
    }

    #[test]
    fn txn_amount_is_a_no_op_on_absence() {
        assert_eq!(normalize_txn_amount(None).unwrap(), None);
    }

    #[test]
    fn txn_amount_rejects_garbage() {
        assert!(normalize_txn_amount(Some("n/a")).is_err());
        assert!(normalize_txn_amount(Some("$")).is_err());
    }

    #[test]
    fn coercion_leaves_absent_values_absent() {
        assert_eq!(coerce_integer(None).unwrap(), None);
        assert_eq!(coerce_float(None).unwrap(), None);
        assert_eq!(coerce_integer(Some("42")).unwrap(), Some(42));
        assert_eq!(coerce_float(Some("4.2")).unwrap(), Some(4.2));
        assert!(coerce_integer(Some("4.2")).is_err());
        assert!(coerce_float(Some("abc")).is_err());
    }
}

//! Currency token extraction and canonicalization
//!
//! The grounding ledger writer and the output guard reader both go through
//! this module. The central invariant — every narrated figure was certified
//! by a tool — only holds if both sides normalise identically, so there is
//! exactly one canonical form: no thousands separators, two decimal places.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// Grammar: <symbol><digits>[,<digits>]*[.<digits>{1,2}]
    static ref CURRENCY: Regex =
        Regex::new(r"[£$€]\d[\d,]*(?:\.\d{1,2})?").expect("invalid currency pattern");

    /// Anchored variant for whole-string matching inside fact bundles.
    static ref CURRENCY_EXACT: Regex =
        Regex::new(r"^[£$€]\d[\d,]*(?:\.\d{1,2})?$").expect("invalid currency pattern");
}

/// Scan arbitrary text for monetary tokens, in order of appearance.
/// Never fails; returns an empty vec when nothing matches.
pub fn extract_amounts(text: &str) -> Vec<String> {
    CURRENCY
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalise a currency token so that equivalent representations compare
/// equal: "£1,234.5", "£1234.50" and "£1234.5" all become "£1234.50".
/// Tokens that do not parse are returned unchanged.
pub fn canonicalize(token: &str) -> String {
    let mut chars = token.chars();
    let symbol = match chars.next() {
        Some(c @ ('£' | '$' | '€')) => c,
        _ => return token.to_string(),
    };
    let body: String = chars.collect();
    let cleaned = body.replace(',', "");

    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };

    if whole.is_empty()
        || frac.len() > 2
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return token.to_string();
    }

    let whole_val: i64 = match whole.parse() {
        Ok(v) => v,
        Err(_) => return token.to_string(),
    };
    let frac_val: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map(|v| v * 10).unwrap_or(0),
        _ => frac.parse().unwrap_or(0),
    };

    format!("{}{}.{:02}", symbol, whole_val, frac_val)
}

/// Format an amount of pence as a canonical currency string.
/// This is the single formatting path used by every tool, so tool output
/// is canonical by construction.
pub fn format_pence(pence: i64) -> String {
    let sign = if pence < 0 { "-" } else { "" };
    let p = pence.abs();
    format!("{}£{}.{:02}", sign, p / 100, p % 100)
}

/// Recursively collect every canonical monetary amount from a tool fact
/// bundle. Only string values that are entirely a currency token count —
/// figures embedded in prose inside facts are certified too, via the
/// non-anchored scan, since evidence strings legitimately carry amounts.
pub fn extract_from_facts(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if CURRENCY_EXACT.is_match(s) {
                out.push(canonicalize(s));
            } else {
                for token in extract_amounts(s) {
                    out.push(canonicalize(&token));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                walk(v, out);
            }
        }
        _ => {}
    }
}

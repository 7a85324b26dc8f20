// 💱 Scalar Normalizers
// Pure coercions for the unreliable scalars the upstream feeds us:
// years, currency codes, money amounts, "not available" markers.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display text for values the upstream did not provide.
pub const NOT_AVAILABLE: &str = "Not available";

// ============================================================================
// NOT-AVAILABLE DETECTION
// ============================================================================

/// True when a raw string is one of the upstream's many spellings of
/// "no value here": empty, dashes, n/a, null, none, not available.
pub fn is_not_available(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() || t == "-" || t == "--" {
        return true;
    }
    matches!(
        t.to_lowercase().as_str(),
        "n/a" | "na" | "null" | "none" | "not available"
    )
}

// ============================================================================
// YEAR EXTRACTION
// ============================================================================

/// Extract a 4-digit year from a raw date-ish string.
///
/// Tries the date formats the upstream has used over time, then a bare year,
/// then falls back to the first plausible 4-digit run embedded in free text.
pub fn extract_year(text: &str) -> Option<i32> {
    let t = text.trim();
    if is_not_available(t) {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(t, fmt) {
            return Some(date.year());
        }
    }

    if let Ok(year) = t.parse::<i32>() {
        if (1800..=2200).contains(&year) {
            return Some(year);
        }
    }

    // Last resort: scan for an embedded 4-digit run that reads as a year
    let digits: Vec<char> = t.chars().collect();
    for window in digits.windows(4) {
        if window.iter().all(|c| c.is_ascii_digit()) {
            let year: i32 = window.iter().collect::<String>().parse().ok()?;
            if (1800..=2200).contains(&year) {
                return Some(year);
            }
        }
    }

    None
}

/// Normalize a raw date string to ISO `YYYY-MM-DD` when one of the known
/// upstream formats parses; otherwise return the raw text untouched
/// (display-only degradation).
pub fn normalize_date(text: &str) -> String {
    let t = text.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(t, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    t.to_string()
}

// ============================================================================
// CURRENCY CODE EXTRACTION
// ============================================================================

/// Pull a 3-letter ISO-style currency code out of a raw money string
/// ("1,000 EUR" → "EUR", "usd 40" → "USD").
///
/// Any standalone 3-letter alphabetic token counts; validation of the code
/// against a currency registry is upstream's business, not ours.
pub fn extract_currency_code(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| token.len() == 3)
        .map(|token| token.to_ascii_uppercase())
        .next()
}

/// Parse the numeric portion of a raw money string, tolerating grouping
/// commas, currency symbols and surrounding text. `None` when no digits.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Format a numeric amount with thousands grouping: 1000000 → "1,000,000".
/// Fractional amounts keep two decimals; integral amounts render without one.
pub fn group_thousands(value: f64) -> String {
    let negative = value < 0.0;
    // Round to display precision first so a fraction that carries
    // (1234.999 → 1235) lands in the integral digits
    let abs = (value.abs() * 100.0).round() / 100.0;
    let integral = abs.trunc() as u64;
    let fraction = abs.fract();

    let digits = integral.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 1e-9 {
        out.push_str(&format!("{:.2}", fraction)[1..]);
    }
    out
}

// ============================================================================
// MONEY AMOUNT
// ============================================================================

/// Canonical currency-denominated amount.
///
/// `display` is always derivable from `(raw_value, currency_code)` when both
/// are present; with only one of them it falls back to the best available
/// raw text, and with neither it reads "Not available".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyAmount {
    pub raw_value: Option<f64>,
    pub currency_code: Option<String>,
    pub display: String,
}

impl MoneyAmount {
    /// Amount the upstream simply did not provide.
    pub fn not_available() -> Self {
        MoneyAmount {
            raw_value: None,
            currency_code: None,
            display: NOT_AVAILABLE.to_string(),
        }
    }

    /// Build from an already-numeric value plus an optional currency code.
    pub fn from_value(value: f64, currency_code: Option<&str>) -> Self {
        let grouped = group_thousands(value);
        let display = match currency_code {
            Some(code) => format!("{} {}", code.to_ascii_uppercase(), grouped),
            None => grouped,
        };
        MoneyAmount {
            raw_value: Some(value),
            currency_code: currency_code.map(|c| c.to_ascii_uppercase()),
            display,
        }
    }

    /// Build from a raw money string in any historical spelling:
    /// "1,000 EUR", "EUR 1,000", "40", "$2.5M text" are all tolerated.
    ///
    /// `fallback_code` covers payloads where the currency travels in a
    /// separate field from the amount.
    pub fn from_text(raw: &str, fallback_code: Option<&str>) -> Self {
        if is_not_available(raw) {
            return Self::not_available();
        }

        let code = extract_currency_code(raw)
            .or_else(|| fallback_code.map(|c| c.to_ascii_uppercase()));

        match parse_numeric(raw) {
            Some(value) => Self::from_value(value, code.as_deref()),
            None => MoneyAmount {
                raw_value: None,
                currency_code: code,
                // No usable number: pass the raw text through for display
                display: raw.trim().to_string(),
            },
        }
    }

    /// Build from a JSON field that may be a number, a string in any of the
    /// historical spellings, or absent entirely.
    pub fn from_json(value: Option<&Value>, fallback_code: Option<&str>) -> Self {
        match value {
            Some(Value::Number(n)) => match n.as_f64() {
                Some(v) => Self::from_value(v, fallback_code),
                None => Self::not_available(),
            },
            Some(Value::String(s)) => Self::from_text(s, fallback_code),
            _ => Self::not_available(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.raw_value.is_some() || self.display != NOT_AVAILABLE
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_available_markers() {
        assert!(is_not_available(""));
        assert!(is_not_available("  "));
        assert!(is_not_available("-"));
        assert!(is_not_available("N/A"));
        assert!(is_not_available("null"));
        assert!(is_not_available("Not Available"));
        assert!(!is_not_available("Acme Capital"));
        assert!(!is_not_available("0"));
    }

    #[test]
    fn test_extract_year_formats() {
        assert_eq!(extract_year("2021-03-15"), Some(2021));
        assert_eq!(extract_year("03/15/2021"), Some(2021));
        assert_eq!(extract_year("2019"), Some(2019));
        assert_eq!(extract_year("Founded in 1998, London"), Some(1998));
        assert_eq!(extract_year("n/a"), None);
        assert_eq!(extract_year("soon"), None);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("03/15/2021"), "2021-03-15");
        assert_eq!(normalize_date("2021-03-15"), "2021-03-15");
        // Unparseable text passes through for display
        assert_eq!(normalize_date("Q3 2021"), "Q3 2021");
    }

    #[test]
    fn test_extract_currency_code() {
        assert_eq!(extract_currency_code("1,000 EUR"), Some("EUR".to_string()));
        assert_eq!(extract_currency_code("usd 40"), Some("USD".to_string()));
        assert_eq!(extract_currency_code("1,000,000"), None);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(1_000_000.0), "1,000,000");
        assert_eq!(group_thousands(40.0), "40");
        assert_eq!(group_thousands(1234.5), "1,234.50");
        assert_eq!(group_thousands(-9_876.0), "-9,876");
    }

    #[test]
    fn test_group_thousands_fraction_carry() {
        // A fraction that rounds up must carry into the integral digits,
        // leaving an integral amount with no decimal part
        assert_eq!(group_thousands(1234.999), "1,235");
        assert_eq!(group_thousands(999.999), "1,000");
        assert_eq!(group_thousands(1234.991), "1,234.99");
        assert_eq!(group_thousands(-1234.999), "-1,235");
    }

    #[test]
    fn test_money_display_round_trip() {
        let amount = MoneyAmount::from_value(1_000_000.0, Some("USD"));

        assert!(amount.display.contains("USD"));
        assert!(amount.display.contains("1,000,000"));
        // Re-parsing the display's numeric portion recovers the value
        assert_eq!(parse_numeric(&amount.display), Some(1_000_000.0));
    }

    #[test]
    fn test_money_from_text_reorders_code() {
        let amount = MoneyAmount::from_text("1,000 EUR", None);
        assert_eq!(amount.display, "EUR 1,000");
        assert_eq!(amount.raw_value, Some(1000.0));
        assert_eq!(amount.currency_code.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_money_from_text_fallback_code() {
        let amount = MoneyAmount::from_text("40", Some("GBP"));
        assert_eq!(amount.display, "GBP 40");
    }

    #[test]
    fn test_money_from_text_not_available() {
        let amount = MoneyAmount::from_text("n/a", Some("USD"));
        assert_eq!(amount, MoneyAmount::not_available());
        assert!(!amount.is_available());
    }

    #[test]
    fn test_money_from_json_variants() {
        let number = json!(2500000);
        let string = json!("1,000 EUR");

        assert_eq!(
            MoneyAmount::from_json(Some(&number), Some("USD")).display,
            "USD 2,500,000"
        );
        assert_eq!(
            MoneyAmount::from_json(Some(&string), None).display,
            "EUR 1,000"
        );
        assert_eq!(
            MoneyAmount::from_json(None, Some("USD")),
            MoneyAmount::not_available()
        );
    }
}

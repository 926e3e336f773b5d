//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};

/// Money amount in minor units (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cents(pub i64);

impl Cents {
    pub fn new(amount: i64) -> Self {
        Cents(amount)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Major units with two decimals, e.g. `6000` -> `"60.00"`
    pub fn to_decimal_string(&self) -> String {
        format!("{:.2}", self.0 as f64 / 100.0)
    }

    /// Amount followed by the currency symbol, e.g. `"60.00 €"`
    pub fn format(&self, currency: &Currency) -> String {
        format!("{} {}", self.to_decimal_string(), currency.symbol())
    }
}

/// ISO currency code as reported by upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Currency(code.trim().to_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Symbol for well-known currencies, the upper-cased code otherwise
    pub fn symbol(&self) -> &str {
        match self.0.as_str() {
            "EUR" => "€",
            "USD" => "$",
            "GBP" => "£",
            other => other,
        }
    }
}

/// Parse ids from free text. Ids may be separated by commas and/or spaces;
/// anything that is not a number is skipped.
pub fn parse_id_list<T: std::str::FromStr>(text: &str) -> Vec<T> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<T>().ok())
        .collect()
}

//! Currency display formatting

use crate::config::DEFAULT_CURRENCY;
use rust_decimal::{Decimal, RoundingStrategy};

/// Display symbol for an ISO currency code. Unknown codes render as the code
/// followed by a space; an empty code means the default currency.
pub fn currency_symbol(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    let code = if code.is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        code
    };
    let symbol = match code.as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "INR" => "₹",
        "JPY" | "CNY" => "¥",
        "AUD" => "A$",
        "CAD" => "C$",
        "NGN" => "₦",
        "KES" => "KSh",
        "ZAR" => "R",
        "BDT" => "৳",
        "PKR" => "₨",
        "AED" => "د.إ",
        _ => return format!("{} ", code),
    };
    symbol.to_string()
}

/// Symbol followed by the amount at two decimal places. A missing amount
/// formats as zero.
pub fn format_price(amount: impl Into<Option<Decimal>>, code: &str) -> String {
    let amount = amount.into().unwrap_or(Decimal::ZERO);
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    let symbol = currency_symbol(code);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{}", symbol, rounded.abs())
    } else {
        format!("{}{}", symbol, rounded.abs())
    }
}

/// Formatter bound to the configured currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormatter {
    code: String,
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl CurrencyFormatter {
    pub fn new(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        Self {
            code: if code.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                code
            },
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn symbol(&self) -> String {
        currency_symbol(&self.code)
    }

    pub fn format(&self, amount: impl Into<Option<Decimal>>) -> String {
        format_price(amount, &self.code)
    }
}

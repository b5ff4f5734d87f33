use std::collections::HashMap;

use tera::{to_value, Value};

use crate::structs::short_ref;

/// Groups thousands and keeps at most two decimals: `1234567.5` → `1,234,567.50`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if fraction > 0 {
        grouped.push_str(&format!(".{:02}", fraction));
    }
    if amount < 0.0 && cents > 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn money_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_f64() {
        Some(amount) => Ok(to_value(format!("{} SYP", format_amount(amount)))?),
        None if value.is_null() => Ok(to_value("0 SYP")?),
        None => Err(tera::Error::msg(format!("money: expected a number, got {}", value))),
    }
}

pub fn short_ref_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_str() {
        Some(id) => Ok(to_value(short_ref(id))?),
        None => Err(tera::Error::msg("short_ref: expected a string id")),
    }
}

/// Empty form inputs mean "not given".
pub fn parse_optional<T: std::str::FromStr>(raw: &str, field: &str) -> Result<Option<T>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| format!("{} must be a number", field))
}

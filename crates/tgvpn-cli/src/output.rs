use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tgvpn_api::{GENERIC_MESSAGE, friendly_message};
use tgvpn_client::ApiError;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table<I, R>(headers: &[&str], rows: I, empty: &str)
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    let mut count = 0usize;
    for row in rows {
        builder.push_record(row);
        count += 1;
    }
    if count == 0 {
        println!("{empty}");
        return;
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
}

/// Aligned `label: value` lines; `None` values are skipped.
pub fn print_fields(fields: &[(&str, Option<String>)]) {
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", format!("{label:<width$}").cyan(), value);
        }
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_hint(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

pub fn format_price(price: f64, currency: &str) -> String {
    format!("{price:.2} {currency}").trim_end().to_string()
}

pub fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Message for the user. API failures go through the friendly-message
/// layer; anything else (config, IO) is already phrased for a human.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => friendly_api_message(api).to_string(),
        None => format!("{err:#}"),
    }
}

pub fn friendly_api_message(err: &ApiError) -> &'static str {
    match friendly_message(&err.to_string()) {
        GENERIC_MESSAGE => err.user_message(),
        specific => specific,
    }
}

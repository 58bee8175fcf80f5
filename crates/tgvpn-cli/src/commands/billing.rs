use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tgvpn_client::local_store::{TARIFF_PRICE_KEY, TARIFF_PRICE_TTL};
use tgvpn_client::models::{CreateOrder, Tariff};

use super::Session;
use crate::output::{
    format_price, or_dash, print_fields, print_hint, print_json, print_success, print_table,
};

/// Price shown at checkout, kept until the payment is confirmed.
#[derive(Debug, Serialize, Deserialize)]
struct PendingPrice {
    order_id: String,
    tariff: String,
    price: f64,
    currency: String,
}

pub async fn tariffs(session: &Session) -> Result<()> {
    let list = session.client.tariffs().await?;
    if session.json() {
        return print_json(&list);
    }
    print_table(
        &["ID", "Plan", "Days", "Price", "Discount"],
        list.tariffs.iter().map(|t| {
            [
                t.id.clone(),
                t.name.clone(),
                t.duration_days.to_string(),
                format_price(t.price, &t.currency),
                or_dash(t.discount_percent.map(|d| format!("{d}%"))),
            ]
        }),
        "No tariffs available.",
    );
    Ok(())
}

pub async fn buy(session: &mut Session, tariff_id: &str, promo: Option<String>) -> Result<()> {
    let list = session.client.tariffs().await?;
    let tariff: Option<&Tariff> = list.tariffs.iter().find(|t| t.id == tariff_id);
    if tariff.is_none() && !list.tariffs.is_empty() {
        anyhow::bail!("Unknown tariff `{tariff_id}`. Run `tgvpn tariffs` to list plans.");
    }

    let mut request = CreateOrder::new(tariff_id);
    request.promo_code = promo;
    let order = session.client.create_order(&request).await?;

    if let Some(tariff) = tariff {
        let pending = PendingPrice {
            order_id: order.order_id.clone(),
            tariff: tariff.name.clone(),
            price: order.amount.unwrap_or(tariff.price),
            currency: tariff.currency.clone(),
        };
        if let Err(e) = session
            .store
            .set(TARIFF_PRICE_KEY, &pending, Some(TARIFF_PRICE_TTL))
        {
            print_hint(&format!("could not save pending price: {e}"));
        }
    }

    if session.json() {
        return print_json(&order);
    }
    print_success(&format!("Order {} created", order.order_id.bold()));
    print_fields(&[
        ("Plan", tariff.map(|t| t.name.clone())),
        (
            "Amount",
            order
                .amount
                .or(tariff.map(|t| t.price))
                .map(|a| format_price(a, tariff.map(|t| t.currency.as_str()).unwrap_or(""))),
        ),
        ("Pay at", order.payment_url.clone()),
    ]);
    print_hint(&format!(
        "after paying, run `tgvpn check {}`",
        order.order_id
    ));
    Ok(())
}

pub async fn check(session: &mut Session, order_id: &str) -> Result<()> {
    let result = session.client.check_payment(order_id).await?;
    let pending = session
        .store
        .get::<PendingPrice>(TARIFF_PRICE_KEY)
        .filter(|p| p.order_id == order_id);

    if result.paid && pending.is_some() {
        let _ = session.store.remove(TARIFF_PRICE_KEY);
    }

    if session.json() {
        return print_json(&result);
    }
    if result.paid {
        let what = pending
            .map(|p| format!(" for {} ({})", p.tariff, format_price(p.price, &p.currency)))
            .unwrap_or_default();
        print_success(&format!("Payment received{what}"));
        if let Some(expires) = &result.expires_at {
            println!("Subscription active until {}", expires.green());
        }
    } else {
        println!(
            "Order {} is {}",
            order_id,
            result.status.as_deref().unwrap_or("pending").yellow()
        );
    }
    Ok(())
}

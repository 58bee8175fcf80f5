use anyhow::Result;
use colored::Colorize;
use tgvpn_client::local_store::{SUBSCRIPTION_KEY, SUBSCRIPTION_TTL};
use tgvpn_client::models::UserStatus;
use tgvpn_client::{ApiError, Subscription, SubscriptionStatus};
use time::OffsetDateTime;

use super::Session;
use crate::cli::Toggle;
use crate::output::{
    format_price, or_dash, print_fields, print_hint, print_json, print_success, print_table,
};

pub async fn status(session: &mut Session, refresh: bool) -> Result<()> {
    let fetched = if refresh {
        session.client.refresh_status().await
    } else {
        session.client.status().await
    };

    let status = match fetched {
        Ok(status) => {
            if let Err(e) = session
                .store
                .set(SUBSCRIPTION_KEY, &status, Some(SUBSCRIPTION_TTL))
            {
                print_hint(&format!("could not save status snapshot: {e}"));
            }
            status
        }
        // Offline: fall back to the last snapshot while it is fresh.
        Err(err @ (ApiError::Network { .. } | ApiError::Timeout { .. })) => {
            match session.store.get::<UserStatus>(SUBSCRIPTION_KEY) {
                Some(snapshot) => {
                    print_hint("server unreachable, showing the last known status");
                    snapshot
                }
                None => return Err(err.into()),
            }
        }
        Err(err) => {
            if err.is_unauthorized() {
                let _ = session.store.remove(SUBSCRIPTION_KEY);
            }
            return Err(err.into());
        }
    };

    if session.json() {
        return print_json(&status);
    }
    let subscription = Subscription::from_status(&status, OffsetDateTime::now_utc());
    print_fields(&[
        ("Subscription", Some(describe(subscription.status))),
        ("Expires", subscription.expires_at.clone()),
        (
            "Auto-renewal",
            status.autorenewal.map(|on| if on { "on" } else { "off" }.to_string()),
        ),
        ("Balance", status.balance.map(|b| format!("{b:.2}"))),
        (
            "Trial",
            status
                .trial_available
                .filter(|available| *available)
                .map(|_| "available".to_string()),
        ),
    ]);
    if !subscription.is_active() {
        print_hint("run `tgvpn tariffs` to pick a plan");
    }
    Ok(())
}

fn describe(status: SubscriptionStatus) -> String {
    match status {
        SubscriptionStatus::Active => "active".green().to_string(),
        SubscriptionStatus::Expired => "expired".red().to_string(),
        SubscriptionStatus::None => "none".yellow().to_string(),
        SubscriptionStatus::Loading => "unknown".dimmed().to_string(),
    }
}

pub async fn key(session: &Session) -> Result<()> {
    let config = session.client.vpn_config().await?;
    if session.json() {
        return print_json(&config);
    }
    match config.key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            println!("{key}");
            if let Some(url) = &config.subscription_url {
                print_hint(&format!("subscription URL: {url}"));
            }
        }
        None => anyhow::bail!("No VPN key yet. Buy a plan with `tgvpn buy <tariff>` first."),
    }
    Ok(())
}

pub async fn autorenew(session: &Session, state: Option<Toggle>) -> Result<()> {
    let renewal = match state {
        None => session.client.autorenewal().await?,
        Some(toggle) => {
            let enabled = matches!(toggle, Toggle::On);
            let renewal = session.client.set_autorenewal(enabled).await?;
            if !session.json() {
                print_success(&format!(
                    "Auto-renewal {}",
                    if renewal.enabled { "enabled" } else { "disabled" }
                ));
                return Ok(());
            }
            renewal
        }
    };
    if session.json() {
        return print_json(&renewal);
    }
    println!(
        "Auto-renewal is {}",
        if renewal.enabled { "on".green() } else { "off".yellow() }
    );
    Ok(())
}

pub async fn payments(session: &Session, page: u32, limit: u32) -> Result<()> {
    let history = session.client.payments(page, limit).await?;
    if session.json() {
        return print_json(&history);
    }
    print_table(
        &["ID", "Date", "Plan", "Amount", "Status"],
        history.payments.iter().map(|p| {
            [
                p.id.clone(),
                or_dash(p.created_at.as_ref()),
                or_dash(p.tariff_name.as_ref()),
                format_price(p.amount, p.currency.as_deref().unwrap_or("")),
                p.status.clone(),
            ]
        }),
        "No payments yet.",
    );
    println!("Page {page}, {} total", history.total);
    Ok(())
}

use anyhow::{Context, Result};
use serde_json::json;
use tgvpn_auth::extract_user;
use tgvpn_client::deeplink::{REFERRAL_PREFIX, mini_app_link, referral_link, share_link};

use super::Session;
use crate::cli::OutputFormat;
use crate::output::{or_dash, print_fields, print_json, print_table};

const SHARE_TEXT: &str = "Fast and private VPN right inside Telegram. Join with my link!";

pub async fn summary(session: &Session) -> Result<()> {
    let summary = session.client.referral_summary().await?;
    if session.json() {
        return print_json(&summary);
    }
    print_fields(&[
        ("Code", summary.referral_code.clone()),
        ("Invited", Some(summary.invited_count.to_string())),
        ("Active", Some(summary.active_count.to_string())),
        ("Bonus days", Some(summary.bonus_days.to_string())),
        ("Earned", Some(format!("{:.2}", summary.earned))),
    ]);
    Ok(())
}

pub async fn friends(session: &Session, page: u32, limit: u32) -> Result<()> {
    let friends = session.client.referral_friends(page, limit).await?;
    if session.json() {
        return print_json(&friends);
    }
    print_table(
        &["User", "Name", "Joined", "Active"],
        friends.friends.iter().map(|f| {
            [
                f.username
                    .as_ref()
                    .map(|u| format!("@{u}"))
                    .unwrap_or_else(|| f.user_id.to_string()),
                or_dash(f.name.as_ref()),
                or_dash(f.joined_at.as_ref()),
                if f.active { "yes" } else { "no" }.to_string(),
            ]
        }),
        "No friends invited yet.",
    );
    println!("Page {page}, {} total", friends.total);
    Ok(())
}

/// Print the caller's referral link. Needs no network access: the user id
/// comes from the init data.
pub fn link(
    init_data: Option<&str>,
    bot: Option<&str>,
    app: Option<&str>,
    share: bool,
    format: OutputFormat,
) -> Result<()> {
    let bot = bot.context(
        "No bot configured. Use --bot or run: tgvpn config set bot <bot_username>",
    )?;
    let user = init_data
        .and_then(extract_user)
        .context("No Telegram user in the init data. Set --init-data or TGVPN_INIT_DATA.")?;

    let link = match app {
        Some(app) => {
            mini_app_link(bot, app, Some(&format!("{REFERRAL_PREFIX}{}", user.id)))?
        }
        None => referral_link(bot, user.id)?,
    };
    let share_url = share.then(|| share_link(&link, SHARE_TEXT)).transpose()?;

    if matches!(format, OutputFormat::Json) {
        return print_json(&json!({
            "user_id": user.id,
            "link": link.as_str(),
            "share": share_url.as_ref().map(|u| u.as_str()),
        }));
    }
    println!("{link}");
    if let Some(url) = share_url {
        println!("{url}");
    }
    Ok(())
}

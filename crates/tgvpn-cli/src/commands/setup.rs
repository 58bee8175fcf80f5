use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tgvpn_client::Platform;
use tgvpn_client::local_store::PLATFORM_KEY;
use tgvpn_client::setup::steps;

use super::Session;
use crate::output::{print_hint, print_json};

/// Explicit flag, then the saved choice, then the running OS.
fn pick_platform(session: &mut Session, requested: Option<&str>) -> Result<Platform> {
    if let Some(raw) = requested {
        let platform: Platform = raw.parse()?;
        if let Err(e) = session.store.set(PLATFORM_KEY, &platform, None) {
            print_hint(&format!("could not remember platform: {e}"));
        }
        return Ok(platform);
    }
    session
        .store
        .get::<Platform>(PLATFORM_KEY)
        .or_else(Platform::current)
        .context("Cannot detect your platform. Pass --platform ios|android|windows|macos|linux")
}

pub async fn guide(session: &mut Session, requested: Option<&str>) -> Result<()> {
    let platform = pick_platform(session, requested)?;
    let config = session.client.vpn_config().await?;
    let key = config
        .key
        .filter(|k| !k.is_empty())
        .context("No VPN key yet. Buy a plan with `tgvpn buy <tariff>` first.")?;
    let steps = steps(platform, &key);

    if session.json() {
        return print_json(&json!({ "platform": platform, "steps": steps }));
    }
    println!("{} {}", "Setup for".cyan(), platform.to_string().bold());
    for (i, step) in steps.iter().enumerate() {
        println!();
        println!("{}. {}", i + 1, step.title.bold());
        println!("   {}", step.details.replace('\n', "\n   "));
        if let Some(link) = &step.link {
            println!("   {}", link.underline());
        }
    }
    Ok(())
}

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tgvpn_client::models::Contest;

use super::Session;
use crate::output::{or_dash, print_fields, print_json, print_table};

pub async fn show(
    session: &Session,
    with_participants: bool,
    with_tickets: bool,
    page: u32,
    limit: u32,
) -> Result<()> {
    let active = session.client.contest_active().await?;
    let Some(contest) = active.contest else {
        if session.json() {
            return print_json(&json!({ "contest": null }));
        }
        println!("No contest is running right now.");
        return Ok(());
    };

    let participants = if with_participants {
        Some(
            session
                .client
                .contest_participants(&contest.id, page, limit)
                .await?,
        )
    } else {
        None
    };
    let tickets = if with_tickets {
        Some(session.client.contest_tickets(&contest.id).await?)
    } else {
        None
    };

    if session.json() {
        return print_json(&json!({
            "contest": contest,
            "participants": participants,
            "tickets": tickets,
        }));
    }

    print_contest(&contest);
    if let Some(list) = participants {
        println!();
        print_table(
            &["Rank", "User", "Tickets"],
            list.participants.iter().map(|p| {
                [
                    or_dash(p.rank),
                    p.name.clone().unwrap_or_else(|| p.user_id.to_string()),
                    p.tickets.to_string(),
                ]
            }),
            "No participants yet.",
        );
        println!("Page {page}, {} total", list.total);
    }
    if let Some(tickets) = tickets {
        println!();
        println!("{} {}", "Your tickets:".cyan(), tickets.tickets);
        print_table(
            &["Date", "Change", "Reason"],
            tickets.history.iter().map(|t| {
                [
                    or_dash(t.created_at.as_ref()),
                    format!("{:+}", t.amount),
                    t.reason.clone(),
                ]
            }),
            "No ticket history.",
        );
    }
    Ok(())
}

fn print_contest(contest: &Contest) {
    println!("{}", contest.title.bold());
    if let Some(description) = &contest.description {
        println!("{description}");
    }
    print_fields(&[
        ("Prize", contest.prize.clone()),
        ("Starts", contest.starts_at.clone()),
        ("Ends", contest.ends_at.clone()),
        ("Participants", Some(contest.participants_count.to_string())),
        ("Your tickets", Some(contest.tickets.to_string())),
    ]);
}

//! CSV export of paged lists (payments, invited friends, contest entrants).

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tgvpn_client::models::{ContestParticipant, PaymentRecord, ReferralFriend};

use super::Session;
use crate::cli::ExportKind;
use crate::output::print_success;

/// Upper bound on pages fetched for one export.
const MAX_PAGES: u32 = 1_000;

#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    id: &'a str,
    created_at: &'a str,
    tariff: &'a str,
    amount: f64,
    currency: &'a str,
    status: &'a str,
}

impl<'a> From<&'a PaymentRecord> for PaymentRow<'a> {
    fn from(p: &'a PaymentRecord) -> Self {
        Self {
            id: &p.id,
            created_at: p.created_at.as_deref().unwrap_or(""),
            tariff: p.tariff_name.as_deref().unwrap_or(""),
            amount: p.amount,
            currency: p.currency.as_deref().unwrap_or(""),
            status: &p.status,
        }
    }
}

#[derive(Debug, Serialize)]
struct FriendRow<'a> {
    user_id: i64,
    username: &'a str,
    name: &'a str,
    joined_at: &'a str,
    active: bool,
}

impl<'a> From<&'a ReferralFriend> for FriendRow<'a> {
    fn from(f: &'a ReferralFriend) -> Self {
        Self {
            user_id: f.user_id,
            username: f.username.as_deref().unwrap_or(""),
            name: f.name.as_deref().unwrap_or(""),
            joined_at: f.joined_at.as_deref().unwrap_or(""),
            active: f.active,
        }
    }
}

#[derive(Debug, Serialize)]
struct ParticipantRow<'a> {
    rank: Option<u32>,
    user_id: i64,
    name: &'a str,
    tickets: u32,
}

impl<'a> From<&'a ContestParticipant> for ParticipantRow<'a> {
    fn from(p: &'a ContestParticipant) -> Self {
        Self {
            rank: p.rank,
            user_id: p.user_id,
            name: p.name.as_deref().unwrap_or(""),
            tickets: p.tickets,
        }
    }
}

/// Write `items` as CSV with a header row taken from `R`'s fields.
fn write_csv<'a, T, R, W>(out: W, items: &'a [T]) -> Result<()>
where
    R: Serialize + From<&'a T>,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(out);
    for item in items {
        writer.serialize(R::from(item))?;
    }
    writer.flush()?;
    Ok(())
}

/// Fetch pages of `batch` items until a short or empty page arrives, or until
/// `total` items are collected. A `total` of zero means the server did not
/// report one.
async fn collect_pages<T, F, Fut>(batch: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<(Vec<T>, u64)>>,
{
    let mut all = Vec::new();
    for page in 1..=MAX_PAGES {
        let (items, total) = fetch(page).await?;
        let short = (items.len() as u64) < u64::from(batch);
        all.extend(items);
        if short || (total > 0 && all.len() as u64 >= total) {
            break;
        }
    }
    Ok(all)
}

/// Write rows next to `output` and move them into place once complete, so a
/// failed export never leaves a partial file behind.
fn persist_csv<'a, T, R>(output: &Path, items: &'a [T]) -> Result<()>
where
    R: Serialize + From<&'a T>,
{
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    write_csv::<T, R, _>(file.as_file_mut(), items)?;
    file.persist(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

pub async fn export(
    session: &Session,
    kind: ExportKind,
    output: &Path,
    batch: u32,
    contest: Option<&str>,
) -> Result<()> {
    let batch = batch.max(1);
    let client = &session.client;

    let count = match kind {
        ExportKind::Payments => {
            let rows = collect_pages(batch, |page| async move {
                let history = client.payments(page, batch).await?;
                Ok::<_, anyhow::Error>((history.payments, history.total))
            })
            .await?;
            persist_csv::<_, PaymentRow>(output, &rows)?;
            rows.len()
        }
        ExportKind::Friends => {
            let rows = collect_pages(batch, |page| async move {
                let friends = client.referral_friends(page, batch).await?;
                Ok::<_, anyhow::Error>((friends.friends, friends.total))
            })
            .await?;
            persist_csv::<_, FriendRow>(output, &rows)?;
            rows.len()
        }
        ExportKind::Participants => {
            let contest_id = match contest {
                Some(id) => id.to_string(),
                None => {
                    client
                        .contest_active()
                        .await?
                        .contest
                        .context("No contest is running. Pass --contest <id>.")?
                        .id
                }
            };
            let contest_id = contest_id.as_str();
            let rows = collect_pages(batch, |page| async move {
                let list = client.contest_participants(contest_id, page, batch).await?;
                Ok::<_, anyhow::Error>((list.participants, list.total))
            })
            .await?;
            persist_csv::<_, ParticipantRow>(output, &rows)?;
            rows.len()
        }
    };

    print_success(&format!("Exported {count} rows to {}", output.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(id: &str, amount: f64) -> PaymentRecord {
        PaymentRecord {
            id: id.to_string(),
            amount,
            currency: Some("RUB".into()),
            status: "paid".into(),
            tariff_name: Some("Month, promo".into()),
            created_at: None,
        }
    }

    #[test]
    fn payments_are_written_with_header_and_quoting() {
        let mut buf = Vec::new();
        write_csv::<_, PaymentRow, _>(&mut buf, &[payment("1", 199.0), payment("2", 99.5)])
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,created_at,tariff,amount,currency,status")
        );
        assert_eq!(lines.next(), Some(r#"1,,"Month, promo",199.0,RUB,paid"#));
        assert_eq!(lines.count(), 1);
    }

    #[tokio::test]
    async fn paging_stops_at_total() {
        let mut calls = 0;
        let rows = collect_pages(2, |page| {
            calls += 1;
            async move {
                let items = match page {
                    1 => vec![1, 2],
                    2 => vec![3],
                    _ => vec![99],
                };
                Ok::<_, anyhow::Error>((items, 3))
            }
        })
        .await
        .unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn paging_stops_on_empty_page() {
        let rows: Vec<u8> =
            collect_pages(10, |_| async { Ok::<_, anyhow::Error>((Vec::new(), 50)) })
                .await
                .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn missing_total_pages_until_a_short_page() {
        let mut calls = 0;
        let rows = collect_pages(2, |page| {
            calls += 1;
            async move {
                let items = match page {
                    1..=3 => vec![page, page],
                    4 => vec![4],
                    _ => vec![99, 99],
                };
                Ok::<_, anyhow::Error>((items, 0))
            }
        })
        .await
        .unwrap();
        assert_eq!(rows, vec![1, 1, 2, 2, 3, 3, 4]);
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn missing_total_stops_on_empty_page() {
        let rows = collect_pages(2, |page| async move {
            let items = if page <= 3 { vec![page, page] } else { Vec::new() };
            Ok::<_, anyhow::Error>((items, 0))
        })
        .await
        .unwrap();
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn persisted_export_replaces_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("payments.csv");
        std::fs::write(&target, "old export").unwrap();

        persist_csv::<_, PaymentRow>(&target, &[payment("7", 10.0)]).unwrap();

        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.starts_with("id,created_at,tariff,amount,currency,status"));
        assert!(text.contains("7,,\"Month, promo\",10.0,RUB,paid"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_previous_export_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("friends.csv");
        std::fs::write(&target, "previous").unwrap();

        let result = async {
            let rows: Vec<ReferralFriend> = collect_pages(2, |_| async {
                Err::<(Vec<ReferralFriend>, u64), _>(anyhow::anyhow!("Network error"))
            })
            .await?;
            persist_csv::<_, FriendRow>(&target, &rows)
        }
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "previous");
    }
}

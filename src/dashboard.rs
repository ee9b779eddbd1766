//! Dashboard view assembly and staff alert polling.
//!
//! The staff view runs the fill-level refresh (persisting new levels) before
//! reading; the public view derives levels on the fly and writes nothing.
//! Alert polling is at-most-once for both sources: pending complaints and
//! overflow-flagged bins each carry a notified flag that is set when the
//! alert is first read and re-armed when the condition recurs.

use chrono::{DateTime, Utc};

use crate::model::{
    Alert, AlertPriority, AlertsResponse, BinCounts, BinStatus, Complaint, ComplaintSummary,
    DashboardResponse, GarbageBin, RecentComplaintsResponse,
};
use crate::simulation;
use crate::storage::Storage;

/// Maximum entries returned by the recent-complaints listing.
const RECENT_LIMIT: i64 = 10;

/// Characters of description shown in listings and alert details.
const SUMMARY_DESCRIPTION_CHARS: usize = 100;
const ALERT_DETAILS_CHARS: usize = 200;

/// Staff dashboard: refresh every bin's fill level, then assemble the view.
pub async fn staff_view(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<DashboardResponse> {
    let report = simulation::refresh_bins(storage, now).await?;
    let bins = storage.list_bins().await?;
    assemble_view(storage, bins, now, report.failed).await
}

/// Public dashboard: same aggregates, but fill levels are derived for
/// display only and nothing is persisted.
pub async fn public_view(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<DashboardResponse> {
    let bins = storage
        .list_bins()
        .await?
        .into_iter()
        .map(|mut bin| {
            bin.fill_level = simulation::fill_level_at(bin.last_emptied, now);
            bin.status = BinStatus::from_fill_level(bin.fill_level);
            bin
        })
        .collect();

    assemble_view(storage, bins, now, Vec::new()).await
}

async fn assemble_view(
    storage: &Storage,
    bins: Vec<GarbageBin>,
    now: DateTime<Utc>,
    refresh_failures: Vec<i64>,
) -> anyhow::Result<DashboardResponse> {
    let mut bin_counts = BinCounts {
        total: bins.len(),
        ..BinCounts::default()
    };
    for bin in &bins {
        match bin.status {
            BinStatus::Safe => bin_counts.safe += 1,
            BinStatus::Warning => bin_counts.warning += 1,
            BinStatus::Critical => bin_counts.critical += 1,
        }
    }

    let complaints = storage.visible_complaints(now).await?;
    let complaint_counts = storage.complaint_counts().await?;

    Ok(DashboardResponse {
        timestamp: now,
        bins,
        bin_counts,
        complaints,
        complaint_counts,
        refresh_failures,
    })
}

/// The recent-complaints listing: last 10, newest first, descriptions
/// truncated for display.
pub async fn recent_complaints(storage: &Storage) -> anyhow::Result<RecentComplaintsResponse> {
    let complaints = storage.recent_complaints(RECENT_LIMIT).await?;

    let complaints = complaints
        .iter()
        .map(|c| ComplaintSummary {
            id: c.id,
            complaint_type: c.complaint_type.display_name(),
            location: c.location.clone(),
            description: truncate(&c.description, SUMMARY_DESCRIPTION_CHARS),
            reported_by: c.reported_by.clone(),
            status: c.status,
            created_at: c.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    Ok(RecentComplaintsResponse { complaints })
}

/// Poll for staff alerts.
///
/// Each unannounced pending complaint yields a high-priority alert; each
/// unannounced overflow-flagged bin yields a critical one. Both are marked
/// announced as a side effect, so an unchanged state polls to zero alerts.
pub async fn poll_alerts(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<AlertsResponse> {
    let mut alerts = Vec::new();

    for complaint in storage.claim_pending_alerts().await? {
        alerts.push(complaint_alert(&complaint));
    }

    for bin in storage.claim_overflow_alerts().await? {
        alerts.push(overflow_alert(&bin, now));
    }

    Ok(AlertsResponse { alerts })
}

fn complaint_alert(complaint: &Complaint) -> Alert {
    Alert {
        kind: "complaint",
        title: format!("New Complaint: {}", complaint.complaint_type.display_name()),
        message: format!("Reported at {}", complaint.location),
        details: clip(&complaint.description, ALERT_DETAILS_CHARS),
        complaint_id: Some(complaint.id),
        bin_id: None,
        timestamp: complaint.created_at,
        priority: AlertPriority::High,
    }
}

fn overflow_alert(bin: &GarbageBin, now: DateTime<Utc>) -> Alert {
    Alert {
        kind: "bin_overflow",
        title: format!("Bin Overflow Risk: {}", bin.location),
        message: format!("Fill level: {}%", bin.fill_level),
        details: format!(
            "Last collected: {}",
            bin.last_emptied.format("%Y-%m-%d %H:%M")
        ),
        complaint_id: None,
        bin_id: Some(bin.id),
        timestamp: now,
        priority: AlertPriority::Critical,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut out = clip(text, max_chars);
        out.push_str("...");
        out
    } else {
        text.to_string()
    }
}

/// A hard character cut with no ellipsis, for alert details.
fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

//! Data models for the waste-management dashboard.
//!
//! The two persistent entities are [`GarbageBin`] and [`Complaint`]. Both
//! carry a status enum that is a pure function of a numeric field
//! ([`BinStatus::from_fill_level`], [`ComplaintStatus::from_progress`]),
//! which keeps the derivation logic testable without a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hours for a bin to fill linearly from 0% to 100%.
pub const FILL_CYCLE_HOURS: i64 = 480;

/// Fill percentage at or above which a dispatch run empties a bin.
pub const DISPATCH_THRESHOLD: i64 = 70;

/// Days a resolved complaint stays visible on the dashboard list.
pub const RESOLVED_VISIBILITY_DAYS: i64 = 5;

/// Raised when a stored or client-provided enum string is unrecognized.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Health status of a garbage bin, derived from its fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinStatus {
    /// Fill level below 75%.
    Safe,
    /// Fill level 75% to 89%.
    Warning,
    /// Fill level 90% or above.
    Critical,
}

impl BinStatus {
    /// Derive status from a fill level.
    ///
    /// # Thresholds
    ///
    /// - `critical`: fill >= 90
    /// - `warning`: 75 <= fill < 90
    /// - `safe`: fill < 75
    pub fn from_fill_level(fill_level: i64) -> Self {
        if fill_level >= 90 {
            BinStatus::Critical
        } else if fill_level >= 75 {
            BinStatus::Warning
        } else {
            BinStatus::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinStatus::Safe => "safe",
            BinStatus::Warning => "warning",
            BinStatus::Critical => "critical",
        }
    }
}

impl std::str::FromStr for BinStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(BinStatus::Safe),
            "warning" => Ok(BinStatus::Warning),
            "critical" => Ok(BinStatus::Critical),
            other => Err(ParseEnumError {
                kind: "bin status",
                value: other.to_string(),
            }),
        }
    }
}

/// A garbage bin tracked by the dashboard.
///
/// `fill_level` and `status` are recomputed from `last_emptied` on every
/// staff dashboard read; `overflow_risk` is set externally via the API.
/// `overflow_notified` marks whether the current overflow episode has
/// already produced an alert, so polling does not re-emit it.
#[derive(Debug, Clone, Serialize)]
pub struct GarbageBin {
    pub id: i64,
    pub location: String,
    /// Fill percentage in [0, 100].
    pub fill_level: i64,
    pub status: BinStatus,
    pub last_emptied: DateTime<Utc>,
    pub overflow_risk: bool,
    pub overflow_notified: bool,
}

/// Lifecycle state of a citizen complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Pending,
    Acknowledged,
    Resolved,
}

impl ComplaintStatus {
    /// Derive status from a progress percentage.
    ///
    /// 100 maps to resolved, 0 to pending, anything in between to
    /// acknowledged. This is the single source of truth for the
    /// progress/status invariant.
    pub fn from_progress(progress: i64) -> Self {
        if progress == 100 {
            ComplaintStatus::Resolved
        } else if progress > 0 {
            ComplaintStatus::Acknowledged
        } else {
            ComplaintStatus::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Acknowledged => "acknowledged",
            ComplaintStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComplaintStatus::Pending),
            "acknowledged" => Ok(ComplaintStatus::Acknowledged),
            "resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(ParseEnumError {
                kind: "complaint status",
                value: other.to_string(),
            }),
        }
    }
}

/// Category of a citizen complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintType {
    Overflow,
    MissedCollection,
    IllegalDumping,
    DamagedBin,
    Other,
}

impl ComplaintType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintType::Overflow => "overflow",
            ComplaintType::MissedCollection => "missed_collection",
            ComplaintType::IllegalDumping => "illegal_dumping",
            ComplaintType::DamagedBin => "damaged_bin",
            ComplaintType::Other => "other",
        }
    }

    /// Human-readable name used in alert titles and complaint listings.
    pub fn display_name(self) -> &'static str {
        match self {
            ComplaintType::Overflow => "Overflow",
            ComplaintType::MissedCollection => "Missed Collection",
            ComplaintType::IllegalDumping => "Illegal Dumping",
            ComplaintType::DamagedBin => "Damaged Bin",
            ComplaintType::Other => "Other",
        }
    }
}

impl std::str::FromStr for ComplaintType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overflow" => Ok(ComplaintType::Overflow),
            "missed_collection" => Ok(ComplaintType::MissedCollection),
            "illegal_dumping" => Ok(ComplaintType::IllegalDumping),
            "damaged_bin" => Ok(ComplaintType::DamagedBin),
            "other" => Ok(ComplaintType::Other),
            other => Err(ParseEnumError {
                kind: "complaint type",
                value: other.to_string(),
            }),
        }
    }
}

/// A citizen complaint. Never deleted; resolved complaints age out of the
/// dashboard list but stay in the store.
#[derive(Debug, Clone, Serialize)]
pub struct Complaint {
    pub id: i64,
    pub complaint_type: ComplaintType,
    pub location: String,
    pub description: String,
    pub reported_by: String,
    pub contact_info: String,
    pub status: ComplaintStatus,
    /// Progress percentage in [0, 100]. Invariant: 100 iff resolved,
    /// 0 iff pending.
    pub progress_percentage: i64,
    /// Whether this complaint has already produced a staff alert.
    pub gov_notified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a complaint being created; the store assigns id, status,
/// progress, and the notified flag.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub complaint_type: ComplaintType,
    pub location: String,
    pub description: String,
    pub reported_by: String,
    pub contact_info: String,
}

/// A staff action on a complaint's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// "Start" button: acknowledged at 50% progress.
    Start,
    /// "Complete" button: resolved at 100% progress.
    Complete,
    /// Progress slider: arbitrary 0-100 value, status derived.
    Custom(i64),
}

impl StatusAction {
    /// The (status, progress) pair this action assigns.
    pub fn apply(self) -> (ComplaintStatus, i64) {
        match self {
            StatusAction::Start => (ComplaintStatus::Acknowledged, 50),
            StatusAction::Complete => (ComplaintStatus::Resolved, 100),
            StatusAction::Custom(progress) => (ComplaintStatus::from_progress(progress), progress),
        }
    }
}

/// Priority of a staff alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Critical,
}

/// A single staff alert returned by the polling endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Alert source: "complaint" or "bin_overflow".
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub priority: AlertPriority,
}

/// Response for GET /alerts.
#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}

/// Bin counts by status for the dashboard cards.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BinCounts {
    pub total: usize,
    pub safe: usize,
    pub warning: usize,
    pub critical: usize,
}

/// Complaint counts by status, over all complaints (not just visible ones).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ComplaintCounts {
    pub pending: i64,
    pub acknowledged: i64,
    pub resolved: i64,
}

/// Response for the public and staff dashboard endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub timestamp: DateTime<Utc>,
    pub bins: Vec<GarbageBin>,
    pub bin_counts: BinCounts,
    /// Visible complaints, newest first: pending and acknowledged always,
    /// resolved only within the 5-day window.
    pub complaints: Vec<Complaint>,
    pub complaint_counts: ComplaintCounts,
    /// Bin ids whose fill-level refresh failed to persist. Always empty on
    /// the public view, which does not persist.
    pub refresh_failures: Vec<i64>,
}

/// Request body for POST /complaint.
///
/// Mirrors the citizen submission form: `type`, `location`, and
/// `description` are required; `name` and `contact` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitComplaintRequest {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// Response body for POST /complaint.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitComplaintResponse {
    pub success: bool,
    pub complaint_id: i64,
    pub message: &'static str,
}

/// One entry in the GET /complaints/recent listing.
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub complaint_type: &'static str,
    pub location: String,
    /// Description truncated to 100 characters.
    pub description: String,
    pub reported_by: String,
    pub status: ComplaintStatus,
    /// Formatted as `%Y-%m-%d %H:%M`.
    pub created_at: String,
}

/// Response for GET /complaints/recent.
#[derive(Debug, Clone, Serialize)]
pub struct RecentComplaintsResponse {
    pub complaints: Vec<ComplaintSummary>,
}

/// Request body for POST /login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response body for POST /login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Request body for POST /bins.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBinRequest {
    pub location: String,
}

/// Request body for POST /bins/:id/overflow-risk.
#[derive(Debug, Clone, Deserialize)]
pub struct OverflowRiskRequest {
    pub overflow_risk: bool,
}

/// Request body for the custom-progress status action.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomProgressRequest {
    pub progress: i64,
}

/// Response body for POST /dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub bins_reset: u64,
}

//! SQLite storage layer.
//!
//! Three tables: `garbage_bins`, `complaints`, and `sessions`. Timestamps
//! are stored as unix seconds and status enums as their lowercase string
//! form. Alert claiming (select-then-mark) runs inside a transaction so a
//! concurrent poll cannot double-deliver the same alert.

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::{
    BinStatus, Complaint, ComplaintCounts, ComplaintStatus, GarbageBin, NewComplaint,
    RESOLVED_VISIBILITY_DAYS,
};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

fn bin_from_row(row: &SqliteRow) -> anyhow::Result<GarbageBin> {
    let status: String = row.get("status");
    let last_emptied: i64 = row.get("last_emptied");
    Ok(GarbageBin {
        id: row.get("id"),
        location: row.get("location"),
        fill_level: row.get("fill_level"),
        status: status.parse::<BinStatus>()?,
        last_emptied: Utc
            .timestamp_opt(last_emptied, 0)
            .single()
            .context("bin last_emptied out of range")?,
        overflow_risk: row.get("overflow_risk"),
        overflow_notified: row.get("overflow_notified"),
    })
}

fn complaint_from_row(row: &SqliteRow) -> anyhow::Result<Complaint> {
    let complaint_type: String = row.get("complaint_type");
    let status: String = row.get("status");
    let created_at: i64 = row.get("created_at");
    Ok(Complaint {
        id: row.get("id"),
        complaint_type: complaint_type.parse()?,
        location: row.get("location"),
        description: row.get("description"),
        reported_by: row.get("reported_by"),
        contact_info: row.get("contact_info"),
        status: status.parse()?,
        progress_percentage: row.get("progress_percentage"),
        gov_notified: row.get("gov_notified"),
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .context("complaint created_at out of range")?,
    })
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:wasteboard.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Raw pool access for tests that need to manipulate the database
    /// beneath the storage API (e.g. installing triggers).
    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS garbage_bins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                fill_level INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'safe',
                last_emptied INTEGER NOT NULL,
                overflow_risk INTEGER NOT NULL DEFAULT 0,
                overflow_notified INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS complaints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                complaint_type TEXT NOT NULL,
                location TEXT NOT NULL,
                description TEXT NOT NULL,
                reported_by TEXT NOT NULL,
                contact_info TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                progress_percentage INTEGER NOT NULL DEFAULT 0,
                gov_notified INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Index for the dashboard's status + recency filters
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_complaints_status_created
            ON complaints(status, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Bins
    // ------------------------------------------------------------------

    /// Register a new bin, empty as of `last_emptied`.
    pub async fn insert_bin(
        &self,
        location: &str,
        last_emptied: DateTime<Utc>,
    ) -> anyhow::Result<GarbageBin> {
        let result = sqlx::query(
            r#"
            INSERT INTO garbage_bins (location, fill_level, status, last_emptied)
            VALUES (?, 0, 'safe', ?)
            "#,
        )
        .bind(location)
        .bind(last_emptied.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(GarbageBin {
            id: result.last_insert_rowid(),
            location: location.to_string(),
            fill_level: 0,
            status: BinStatus::Safe,
            last_emptied,
            overflow_risk: false,
            overflow_notified: false,
        })
    }

    pub async fn list_bins(&self) -> anyhow::Result<Vec<GarbageBin>> {
        let rows = sqlx::query("SELECT * FROM garbage_bins ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(bin_from_row).collect()
    }

    pub async fn get_bin(&self, id: i64) -> anyhow::Result<Option<GarbageBin>> {
        let row = sqlx::query("SELECT * FROM garbage_bins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(bin_from_row).transpose()
    }

    /// Persist a recomputed fill level and status for one bin.
    pub async fn update_bin_state(
        &self,
        id: i64,
        fill_level: i64,
        status: BinStatus,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE garbage_bins SET fill_level = ?, status = ? WHERE id = ?")
            .bind(fill_level)
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Reset every bin at or above `threshold` percent to empty/safe/now.
    ///
    /// A single UPDATE, so the bulk reset is all-or-nothing. Emptying a bin
    /// ends any overflow episode, so both overflow flags are cleared too.
    ///
    /// Returns the number of bins reset.
    pub async fn reset_full_bins(&self, threshold: i64, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE garbage_bins
            SET fill_level = 0, status = 'safe', last_emptied = ?,
                overflow_risk = 0, overflow_notified = 0
            WHERE fill_level >= ?
            "#,
        )
        .bind(now.timestamp())
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Set the externally-owned overflow-risk flag on a bin.
    ///
    /// Flagging (in either direction) re-arms the alert channel for the bin
    /// by clearing `overflow_notified`.
    ///
    /// Returns false if the bin does not exist.
    pub async fn set_overflow_risk(&self, id: i64, overflow_risk: bool) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE garbage_bins SET overflow_risk = ?, overflow_notified = 0 WHERE id = ?",
        )
        .bind(overflow_risk)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch bins with an unannounced overflow episode and mark them
    /// announced, in one transaction.
    pub async fn claim_overflow_alerts(&self) -> anyhow::Result<Vec<GarbageBin>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM garbage_bins
            WHERE overflow_risk = 1 AND overflow_notified = 0
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let bins: Vec<GarbageBin> = rows.iter().map(bin_from_row).collect::<Result<_, _>>()?;

        if !bins.is_empty() {
            sqlx::query(
                "UPDATE garbage_bins SET overflow_notified = 1 WHERE overflow_risk = 1 AND overflow_notified = 0",
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(bins)
    }

    // ------------------------------------------------------------------
    // Complaints
    // ------------------------------------------------------------------

    /// Create a complaint in the pending state.
    pub async fn insert_complaint(
        &self,
        new: &NewComplaint,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Complaint> {
        let result = sqlx::query(
            r#"
            INSERT INTO complaints
                (complaint_type, location, description, reported_by, contact_info,
                 status, progress_percentage, gov_notified, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', 0, 0, ?)
            "#,
        )
        .bind(new.complaint_type.as_str())
        .bind(&new.location)
        .bind(&new.description)
        .bind(&new.reported_by)
        .bind(&new.contact_info)
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(Complaint {
            id: result.last_insert_rowid(),
            complaint_type: new.complaint_type,
            location: new.location.clone(),
            description: new.description.clone(),
            reported_by: new.reported_by.clone(),
            contact_info: new.contact_info.clone(),
            status: ComplaintStatus::Pending,
            progress_percentage: 0,
            gov_notified: false,
            created_at,
        })
    }

    pub async fn get_complaint(&self, id: i64) -> anyhow::Result<Option<Complaint>> {
        let row = sqlx::query("SELECT * FROM complaints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(complaint_from_row).transpose()
    }

    /// Apply a staff transition. Always marks the complaint notified.
    ///
    /// Returns false if the complaint does not exist.
    pub async fn update_complaint_status(
        &self,
        id: i64,
        status: ComplaintStatus,
        progress_percentage: i64,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE complaints
            SET status = ?, progress_percentage = ?, gov_notified = 1
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(progress_percentage)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Complaints shown on the dashboard, newest first: pending and
    /// acknowledged always, resolved only while `created_at` is within the
    /// visibility window.
    pub async fn visible_complaints(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Complaint>> {
        let cutoff = now - Duration::days(RESOLVED_VISIBILITY_DAYS);

        let rows = sqlx::query(
            r#"
            SELECT * FROM complaints
            WHERE status IN ('pending', 'acknowledged')
               OR (status = 'resolved' AND created_at >= ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(cutoff.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(complaint_from_row).collect()
    }

    /// The most recent complaints regardless of status.
    pub async fn recent_complaints(&self, limit: i64) -> anyhow::Result<Vec<Complaint>> {
        let rows = sqlx::query(
            "SELECT * FROM complaints ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(complaint_from_row).collect()
    }

    /// Counts by status over all complaints.
    pub async fn complaint_counts(&self) -> anyhow::Result<ComplaintCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) as n FROM complaints GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = ComplaintCounts::default();
        for row in &rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            match status.parse::<ComplaintStatus>()? {
                ComplaintStatus::Pending => counts.pending = n,
                ComplaintStatus::Acknowledged => counts.acknowledged = n,
                ComplaintStatus::Resolved => counts.resolved = n,
            }
        }

        Ok(counts)
    }

    /// Fetch pending complaints that have not yet produced a staff alert
    /// and mark them notified, in one transaction.
    pub async fn claim_pending_alerts(&self) -> anyhow::Result<Vec<Complaint>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM complaints
            WHERE status = 'pending' AND gov_notified = 0
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let complaints: Vec<Complaint> =
            rows.iter().map(complaint_from_row).collect::<Result<_, _>>()?;

        if !complaints.is_empty() {
            sqlx::query(
                "UPDATE complaints SET gov_notified = 1 WHERE status = 'pending' AND gov_notified = 0",
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(complaints)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn create_session(
        &self,
        token: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO sessions (token, username, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(username)
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn session_exists(&self, token: &str) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Returns false if the token was not a live session.
    pub async fn delete_session(&self, token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

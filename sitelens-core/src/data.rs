use crate::error::{AuditError, Result};
use crate::insights::{Dimension, RedFlag};
use crate::report::{AuditReport, JobContext};
use rusqlite::{Connection, OptionalExtension, Row as SqlRow, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// SQLite-backed job registry for audit runs.
pub struct AuditStore {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub customer: String,
    pub target_url: String,
    pub status: JobStatus,
    pub created_at: i64,
    pub finished_at: Option<i64>,
    pub score: Option<u32>,
    pub total_issues: Option<usize>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn context(&self) -> JobContext {
        JobContext::new(&self.id, &self.customer, &self.target_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSection {
    pub position: usize,
    pub dimension: String,
    pub summary: String,
    pub meaning: String,
    pub details: String,
    pub red_flags: Vec<RedFlag>,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

const JOB_COLUMNS: &str =
    "id, customer, target_url, status, created_at, finished_at, score, total_issues, error";

fn job_from_row(row: &SqlRow<'_>) -> rusqlite::Result<JobRecord> {
    let status: String = row.get(3)?;
    Ok(JobRecord {
        id: row.get(0)?,
        customer: row.get(1)?,
        target_url: row.get(2)?,
        status: JobStatus::from_str(&status).unwrap_or(JobStatus::Failed),
        created_at: row.get(4)?,
        finished_at: row.get(5)?,
        score: row.get(6)?,
        total_issues: row.get::<_, Option<i64>>(7)?.map(|n| n as usize),
        error: row.get(8)?,
    })
}

impl AuditStore {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let store = AuditStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS audit_jobs (
    id TEXT PRIMARY KEY,
    customer TEXT NOT NULL,
    target_url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('queued', 'running', 'completed', 'failed')),
    created_at INTEGER NOT NULL,
    finished_at INTEGER,
    score INTEGER,
    total_issues INTEGER,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_audit_jobs_status ON audit_jobs(status);
CREATE INDEX IF NOT EXISTS idx_audit_jobs_created ON audit_jobs(created_at);

CREATE TABLE IF NOT EXISTS report_sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    dimension TEXT NOT NULL,
    summary TEXT NOT NULL,
    meaning TEXT NOT NULL,
    details TEXT NOT NULL,
    red_flags TEXT NOT NULL,  -- JSON array
    FOREIGN KEY(job_id) REFERENCES audit_jobs(id) ON DELETE CASCADE,
    UNIQUE(job_id, position)
);

CREATE INDEX IF NOT EXISTS idx_report_sections_job ON report_sections(job_id);
            ",
        )?;
        Ok(())
    }

    // Job lifecycle
    pub fn create_job(&self, customer: &str, target_url: &str) -> Result<JobContext> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO audit_jobs (id, customer, target_url, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&job_id, customer, target_url, JobStatus::Queued.as_str(), timestamp],
        )?;
        debug!("Created audit job {}", job_id);

        Ok(JobContext::new(job_id, customer, target_url))
    }

    fn set_status(&self, job_id: &str, status: JobStatus) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE audit_jobs SET status = ?1 WHERE id = ?2",
            params![status.as_str(), job_id],
        )?;
        if updated == 0 {
            return Err(AuditError::JobNotFound(job_id.to_string()));
        }
        Ok(())
    }

    pub fn mark_running(&self, job_id: &str) -> Result<()> {
        self.set_status(job_id, JobStatus::Running)
    }

    /// Record the final score and persist every report section.
    pub fn complete_job(&mut self, job_id: &str, report: &AuditReport) -> Result<()> {
        let timestamp = current_timestamp();
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE audit_jobs SET status = ?1, finished_at = ?2, score = ?3, total_issues = ?4, error = NULL WHERE id = ?5",
            params![
                JobStatus::Completed.as_str(),
                timestamp,
                report.score,
                report.total_issues as i64,
                job_id
            ],
        )?;
        if updated == 0 {
            return Err(AuditError::JobNotFound(job_id.to_string()));
        }

        tx.execute("DELETE FROM report_sections WHERE job_id = ?1", params![job_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO report_sections (job_id, position, dimension, summary, meaning, details, red_flags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, section) in report.sections.iter().enumerate() {
                let red_flags = serde_json::to_string(&section.insight.red_flags)?;
                stmt.execute(params![
                    job_id,
                    position as i64,
                    section.dimension.name(),
                    &section.insight.summary,
                    &section.insight.meaning,
                    &section.insight.details,
                    red_flags,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn fail_job(&self, job_id: &str, error: &str) -> Result<()> {
        let timestamp = current_timestamp();
        let updated = self.conn.execute(
            "UPDATE audit_jobs SET status = ?1, finished_at = ?2, error = ?3 WHERE id = ?4",
            params![JobStatus::Failed.as_str(), timestamp, error, job_id],
        )?;
        if updated == 0 {
            return Err(AuditError::JobNotFound(job_id.to_string()));
        }
        Ok(())
    }

    // Queries
    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM audit_jobs WHERE id = ?1",
            JOB_COLUMNS
        ))?;
        let job = stmt.query_row(params![job_id], job_from_row).optional()?;
        Ok(job)
    }

    pub fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM audit_jobs ORDER BY created_at DESC, rowid DESC",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map([], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    pub fn get_sections(&self, job_id: &str) -> Result<Vec<StoredSection>> {
        let mut stmt = self.conn.prepare(
            "SELECT position, dimension, summary, meaning, details, red_flags
             FROM report_sections WHERE job_id = ?1 ORDER BY position",
        )?;
        let raw = stmt
            .query_map(params![job_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(position, dimension, summary, meaning, details, flags)| {
                Ok(StoredSection {
                    position: position as usize,
                    dimension,
                    summary,
                    meaning,
                    details,
                    red_flags: serde_json::from_str(&flags)?,
                })
            })
            .collect()
    }

    /// Red flags stored for one dimension of a job.
    pub fn get_red_flags(&self, job_id: &str, dimension: Dimension) -> Result<Vec<RedFlag>> {
        let flags: Option<String> = self
            .conn
            .query_row(
                "SELECT red_flags FROM report_sections WHERE job_id = ?1 AND dimension = ?2",
                params![job_id, dimension.name()],
                |row| row.get(0),
            )
            .optional()?;
        match flags {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

// Tests for the audit job store

use sitelens_core::AuditError;
use sitelens_core::data::{AuditStore, JobStatus};
use sitelens_core::insights::{Dimension, Severity};
use sitelens_core::model::{PageRecord, PageStore};
use sitelens_core::report::{AssembleOptions, AuditReport, AuditTables, assemble};
use sitelens_core::reporters::{report_meta, report_status_codes};
use tempfile::TempDir;

fn create_test_store() -> (TempDir, AuditStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let store = AuditStore::new(&db_path).unwrap();
    (temp_dir, store)
}

fn sample_report(job: sitelens_core::JobContext) -> AuditReport {
    let mut page = PageRecord::new("https://a.com/");
    page.status = Some(500);
    let pages = PageStore::new(vec![page]);
    let tables = AuditTables {
        meta: report_meta(&pages),
        status: report_status_codes(&pages),
        ..AuditTables::default()
    };
    assemble(job, &tables, pages.len(), &AssembleOptions::default())
}

// ============================================================================
// Store Creation Tests
// ============================================================================

#[test]
fn test_store_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!AuditStore::exists(&db_path));
    let store = AuditStore::new(&db_path);
    assert!(store.is_ok());
    assert!(AuditStore::exists(&db_path));
}

#[test]
fn test_store_reopen_keeps_jobs() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let job_id = {
        let store = AuditStore::new(&db_path).unwrap();
        store.create_job("Acme", "https://a.com/").unwrap().job_id
    };

    let store = AuditStore::new(&db_path).unwrap();
    assert!(store.get_job(&job_id).unwrap().is_some());
}

// ============================================================================
// Job Lifecycle Tests
// ============================================================================

#[test]
fn test_create_job() {
    let (_temp_dir, store) = create_test_store();

    let job = store.create_job("Acme", "https://a.com/").unwrap();
    let record = store.get_job(&job.job_id).unwrap().unwrap();

    assert_eq!(record.customer, "Acme");
    assert_eq!(record.target_url, "https://a.com/");
    assert_eq!(record.status, JobStatus::Queued);
    assert!(record.finished_at.is_none());
    assert!(record.score.is_none());
    assert_eq!(record.context(), job);
}

#[test]
fn test_complete_job_persists_sections() {
    let (_temp_dir, mut store) = create_test_store();
    let job = store.create_job("Acme", "https://a.com/").unwrap();
    store.mark_running(&job.job_id).unwrap();
    assert_eq!(
        store.get_job(&job.job_id).unwrap().unwrap().status,
        JobStatus::Running
    );

    let report = sample_report(job.clone());
    store.complete_job(&job.job_id, &report).unwrap();

    let record = store.get_job(&job.job_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.score, Some(report.score));
    assert_eq!(record.total_issues, Some(report.total_issues));
    assert!(record.finished_at.is_some());

    let sections = store.get_sections(&job.job_id).unwrap();
    assert_eq!(sections.len(), Dimension::ALL.len());
    assert_eq!(sections[0].dimension, Dimension::RenderingMode.name());
    assert!(sections.windows(2).all(|w| w[0].position < w[1].position));

    let flags = store.get_red_flags(&job.job_id, Dimension::Status).unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].severity, Severity::Critical);
}

#[test]
fn test_complete_job_twice_replaces_sections() {
    let (_temp_dir, mut store) = create_test_store();
    let job = store.create_job("Acme", "https://a.com/").unwrap();
    let report = sample_report(job.clone());

    store.complete_job(&job.job_id, &report).unwrap();
    store.complete_job(&job.job_id, &report).unwrap();

    assert_eq!(
        store.get_sections(&job.job_id).unwrap().len(),
        Dimension::ALL.len()
    );
}

#[test]
fn test_fail_job() {
    let (_temp_dir, store) = create_test_store();
    let job = store.create_job("Acme", "https://a.com/").unwrap();

    store.fail_job(&job.job_id, "page store unreachable").unwrap();

    let record = store.get_job(&job.job_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("page store unreachable"));
    assert!(store.get_sections(&job.job_id).unwrap().is_empty());
}

#[test]
fn test_unknown_job() {
    let (_temp_dir, mut store) = create_test_store();

    assert!(store.get_job("missing").unwrap().is_none());
    assert!(matches!(
        store.mark_running("missing"),
        Err(AuditError::JobNotFound(_))
    ));
    assert!(matches!(
        store.fail_job("missing", "boom"),
        Err(AuditError::JobNotFound(_))
    ));

    let job = sitelens_core::JobContext::new("missing", "Acme", "https://a.com/");
    let report = sample_report(job);
    assert!(matches!(
        store.complete_job("missing", &report),
        Err(AuditError::JobNotFound(_))
    ));
    assert!(store.get_sections("missing").unwrap().is_empty());
}

// ============================================================================
// Query Tests
// ============================================================================

#[test]
fn test_list_jobs_newest_first() {
    let (_temp_dir, store) = create_test_store();

    let first = store.create_job("Acme", "https://a.com/").unwrap();
    let second = store.create_job("Globex", "https://globex.com/").unwrap();

    let jobs = store.list_jobs().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, second.job_id);
    assert_eq!(jobs[1].id, first.job_id);
}

#[test]
fn test_red_flags_for_dimension_without_section() {
    let (_temp_dir, store) = create_test_store();
    let job = store.create_job("Acme", "https://a.com/").unwrap();

    let flags = store.get_red_flags(&job.job_id, Dimension::Meta).unwrap();
    assert!(flags.is_empty());
}

use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use sitelens_core::artifacts::{file_prefix, write_artifacts};
use sitelens_core::data::{JobRecord, JobStatus};
use sitelens_core::insights::Severity;
use sitelens_core::model::{EntryPage, PageRecord, RobotsRecord, SitemapRecord};
use sitelens_core::pipeline::AuditProgressCallback;
use sitelens_core::report::{generate_json_report, generate_text_report, save_report};
use sitelens_core::{
    AuditInputs, AuditOptions, AuditReport, AuditStore, JobContext, ReportFormat, ScorePolicy,
    execute_audit,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const DB_FILE_NAME: &str = "sitelens.db";
pub const DEFAULT_DB: &str = "~/.config/sitelens/sitelens.db";
const DEFAULT_CUSTOMER: &str = "audit";

// Input loading

/// Parse records from either a JSON array or JSON Lines.
pub fn parse_records<T: DeserializeOwned>(content: &str, source_name: &str) -> Result<Vec<T>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .with_context(|| format!("Failed to parse {} as a JSON array", source_name));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse {} line {}", source_name, idx + 1))
        })
        .collect()
}

/// Load records from a file
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_records(&content, &path.display().to_string())
}

/// Split robots.txt into `directive: content` records, dropping comments.
pub fn parse_robots_txt(content: &str) -> Vec<RobotsRecord> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or_default().trim();
            let (directive, value) = line.split_once(':')?;
            let directive = directive.trim();
            (!directive.is_empty()).then(|| RobotsRecord::new(directive, value.trim()))
        })
        .collect()
}

/// Robots directives from a `.json`/`.jsonl` record file or a raw robots.txt.
pub fn load_robots(path: &Path) -> Result<Vec<RobotsRecord>> {
    let is_records = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "json" | "jsonl"));
    if is_records {
        return load_records(path);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_robots_txt(&content))
}

pub fn load_entry_page(path: &Path, url: &str) -> Result<EntryPage> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read entry page {}", path.display()))?;
    Ok(EntryPage {
        url: url.to_string(),
        html: Some(html),
    })
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Origin of the first page record with a parseable URL, e.g. `https://a.com/`.
pub fn derive_target_url(pages: &[PageRecord]) -> Option<String> {
    pages.iter().find_map(|page| {
        let url = Url::parse(page.url.trim()).ok()?;
        url.host_str()?;
        Some(format!("{}/", url.origin().ascii_serialization()))
    })
}

pub fn resolve_db_path(args: &ArgMatches) -> PathBuf {
    let raw = args
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DB);
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn open_store(path: &Path) -> Result<AuditStore> {
    if !AuditStore::exists(path) {
        bail!(
            "No job database at {}. Run `sitelens init` first.",
            path.display()
        );
    }
    AuditStore::new(path).with_context(|| format!("Failed to open {}", path.display()))
}

// Console helpers

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn colored_status(status: JobStatus) -> colored::ColoredString {
    match status {
        JobStatus::Queued => status.as_str().white(),
        JobStatus::Running => status.as_str().cyan(),
        JobStatus::Completed => status.as_str().green(),
        JobStatus::Failed => status.as_str().red(),
    }
}

fn colored_severity(severity: Severity) -> colored::ColoredString {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.blue(),
        Severity::Info => label.white(),
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

// Command handlers

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  SITELENS INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_arg = args
        .get_one::<String>("PATH")
        .ok_or_else(|| anyhow!("missing PATH argument"))?;
    let force = args.get_flag("force");
    let expanded = shellexpand::tilde(config_arg);
    let config_dir = Path::new(expanded.as_ref());
    let db_path = config_dir.join(DB_FILE_NAME);

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let db_exists = AuditStore::exists(&db_path);
    if db_exists && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A job database already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();
        println!(
            "{}",
            "This operation will delete every recorded audit job.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
    }

    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    println!("{} Configuration directory ready", "✓".green().bold());

    if db_exists {
        fs::remove_file(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        for suffix in ["-wal", "-shm"] {
            let sidecar = PathBuf::from(format!("{}{}", db_path.display(), suffix));
            if sidecar.exists() {
                let _ = fs::remove_file(sidecar);
            }
        }
        println!("{} Removed existing database", "✓".green().bold());
    }

    AuditStore::new(&db_path)
        .with_context(|| format!("Failed to create database at {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  ✓ Sitelens initialization complete!".green().bold());
    print_divider();
    println!(
        "  {} Config directory: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!(
        "  {} Database: {}",
        "→".blue(),
        db_path.display().to_string().bright_white()
    );
    Ok(())
}

/// Map audit flags onto pipeline options.
/// Persist a finished report, marking the job failed if the write is rejected.
pub fn record_completion(store: &mut AuditStore, job_id: &str, report: &AuditReport) -> Result<()> {
    if let Err(e) = store.complete_job(job_id, report) {
        if let Err(db_err) = store.fail_job(job_id, &e.to_string()) {
            warn!("Could not record failure of job {}: {}", job_id, db_err);
        }
        return Err(e).with_context(|| format!("Failed to store report for job {}", job_id));
    }
    Ok(())
}

pub fn build_audit_options(args: &ArgMatches, target_url: String) -> Result<AuditOptions> {
    let mut options = AuditOptions::new(target_url);
    options.domain_pattern = args.get_one::<String>("domain-pattern").cloned();
    options.brand_token = args
        .get_one::<String>("brand")
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty());
    options.resolve_redirects = !args.get_flag("no-resolve-redirects");
    if let Some(rows) = args.get_one::<usize>("preview-rows") {
        options.preview_rows = *rows;
    }
    if let Some(policy) = args.get_one::<String>("score-policy") {
        options.score_policy = ScorePolicy::from_str(policy)
            .ok_or_else(|| anyhow!("Unknown score policy '{}'", policy))?;
    }
    Ok(options)
}

pub fn handle_audit(args: &ArgMatches, quiet: bool) -> Result<()> {
    let pages_path = args
        .get_one::<PathBuf>("pages")
        .ok_or_else(|| anyhow!("--pages is required"))?;
    let pages: Vec<PageRecord> = load_records(pages_path)?;

    let sitemap: Vec<SitemapRecord> = match args.get_one::<PathBuf>("sitemap") {
        Some(path) => load_records(path)?,
        None => {
            warn!("No sitemap supplied; every crawled URL will read as uncatalogued");
            Vec::new()
        }
    };
    let robots = match args.get_one::<PathBuf>("robots") {
        Some(path) => match load_robots(path) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!("robots.txt could not be loaded: {:#}", e);
                None
            }
        },
        None => None,
    };

    let target_url = match args.get_one::<String>("url") {
        Some(raw) => parse_url_line(raw).ok_or_else(|| anyhow!("Invalid --url '{}'", raw))?,
        None => derive_target_url(&pages).ok_or_else(|| {
            anyhow!("No --url given and no page record carries a usable URL")
        })?,
    };
    let customer = args
        .get_one::<String>("customer")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CUSTOMER.to_string());

    let entry_page = match args.get_one::<PathBuf>("entry-html") {
        Some(path) => Some(load_entry_page(path, &target_url)?),
        None => None,
    };

    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;
    let options = build_audit_options(args, target_url.clone())?;

    let db_path = resolve_db_path(args);
    let mut store = if AuditStore::exists(&db_path) {
        Some(open_store(&db_path)?)
    } else {
        info!(
            "No job database at {}; the run will not be recorded",
            db_path.display()
        );
        None
    };
    let job = match &store {
        Some(store) => {
            let job = store.create_job(&customer, &target_url)?;
            store.mark_running(&job.job_id)?;
            job
        }
        None => JobContext::detached(&customer, &target_url),
    };

    if !quiet {
        println!(
            "{} Auditing {} ({} pages, {} sitemap entries)",
            "→".blue(),
            target_url.bright_white(),
            pages.len(),
            sitemap.len()
        );
        println!("{} Job: {}", "→".blue(), job.job_id.dimmed());
    }

    let spinner = new_spinner();
    let spinner_handle = spinner.clone();
    let progress: AuditProgressCallback = Arc::new(move |message: String| {
        spinner_handle.set_message(message);
    });

    let inputs = AuditInputs {
        pages,
        sitemap,
        robots,
        entry_page,
    };
    let job_id = job.job_id.clone();
    let outcome = match execute_audit(inputs, &options, job, Some(progress)) {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            if let Some(store) = &store
                && let Err(db_err) = store.fail_job(&job_id, &e.to_string())
            {
                warn!("Could not record failure of job {}: {}", job_id, db_err);
            }
            return Err(e).context("Audit failed");
        }
    };
    spinner.finish_and_clear();

    if let Some(store) = store.as_mut() {
        record_completion(store, &job_id, &outcome.report)?;
    }

    let content = match format {
        ReportFormat::Text => generate_text_report(&outcome.report),
        ReportFormat::Json => generate_json_report(&outcome.report)?,
    };

    match args.get_one::<PathBuf>("output") {
        Some(dir) => {
            let summary = write_artifacts(&outcome.tables, dir, &customer);
            let report_path = dir.join(format!(
                "{}_report.{}",
                file_prefix(&customer),
                format.extension()
            ));
            save_report(&content, &report_path)
                .with_context(|| format!("Failed to write {}", report_path.display()))?;

            println!(
                "{} {} artifacts written to {}",
                "✓".green().bold(),
                summary.written.len(),
                dir.display().to_string().bright_white()
            );
            for (name, err) in &summary.failed {
                println!("{} {} not written: {}", "✗".red().bold(), name, err);
            }
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                report_path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }

    if !quiet {
        let score = outcome.report.score.to_string();
        let score = match outcome.report.score {
            80..=100 => score.green().bold(),
            50..=79 => score.yellow().bold(),
            _ => score.red().bold(),
        };
        println!(
            "\n{} Audit complete: score {} with {} red flags",
            "✓".green().bold(),
            score,
            outcome.report.total_issues
        );
    }
    Ok(())
}

fn print_job_line(job: &JobRecord) {
    let score = job
        .score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {}  {:<10} {:>5}  {}  {}",
        job.id.dimmed(),
        colored_status(job.status),
        score,
        job.customer.bright_white(),
        job.target_url
    );
}

pub fn handle_jobs_list(args: &ArgMatches) -> Result<()> {
    let store = open_store(&resolve_db_path(args))?;
    let jobs = store.list_jobs()?;

    print_divider();
    println!("{}", "  AUDIT JOBS".bright_white().bold());
    print_divider();

    if jobs.is_empty() {
        println!("  No audit jobs recorded.");
        return Ok(());
    }
    for job in &jobs {
        print_job_line(job);
    }
    println!("\n  {} job(s)", jobs.len());
    Ok(())
}

pub fn handle_jobs_show(args: &ArgMatches) -> Result<()> {
    let job_id = args
        .get_one::<String>("ID")
        .ok_or_else(|| anyhow!("missing job ID"))?;
    let store = open_store(&resolve_db_path(args))?;
    let job = store
        .get_job(job_id)?
        .ok_or_else(|| anyhow!("Job not found: {}", job_id))?;

    print_divider();
    println!("{}", format!("  AUDIT JOB {}", job.id).bright_white().bold());
    print_divider();
    println!("  {} Customer: {}", "→".blue(), job.customer);
    println!("  {} Target: {}", "→".blue(), job.target_url);
    println!("  {} Status: {}", "→".blue(), colored_status(job.status));
    println!("  {} Created: {}", "→".blue(), format_timestamp(job.created_at));
    if let Some(finished) = job.finished_at {
        println!("  {} Finished: {}", "→".blue(), format_timestamp(finished));
    }
    if let Some(score) = job.score {
        println!(
            "  {} Score: {} ({} red flags)",
            "→".blue(),
            score.to_string().bold(),
            job.total_issues.unwrap_or_default()
        );
    }
    if let Some(error) = &job.error {
        println!("  {} Error: {}", "✗".red().bold(), error);
    }

    for section in store.get_sections(&job.id)? {
        println!();
        println!("{}", section.dimension.bright_cyan().bold());
        println!("  {}", section.summary);
        for flag in &section.red_flags {
            println!("  {} {}", colored_severity(flag.severity), flag.message);
        }
    }
    Ok(())
}

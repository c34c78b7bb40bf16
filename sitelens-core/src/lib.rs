pub mod artifacts;
pub mod data;
pub mod entry_page;
pub mod error;
pub mod insights;
pub mod link_graph;
pub mod model;
pub mod ngrams;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod reporters;
pub mod table;

pub use data::AuditStore;
pub use error::{AuditError, Result};
pub use pipeline::{AuditInputs, AuditOptions, AuditOutcome, execute_audit};
pub use report::{AuditReport, JobContext, ReportFormat, ScorePolicy};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════════════════════════════╗
    ║  ███████╗██╗████████╗███████╗██╗     ███████╗███╗   ██╗███████╗  ║
    ║  ██╔════╝██║╚══██╔══╝██╔════╝██║     ██╔════╝████╗  ██║██╔════╝  ║
    ║  ███████╗██║   ██║   █████╗  ██║     █████╗  ██╔██╗ ██║███████╗  ║
    ║  ╚════██║██║   ██║   ██╔══╝  ██║     ██╔══╝  ██║╚██╗██║╚════██║  ║
    ║  ███████║██║   ██║   ███████╗███████╗███████╗██║ ╚████║███████║  ║
    ║  ╚══════╝╚═╝   ╚═╝   ╚══════╝╚══════╝╚══════╝╚═╝  ╚═══╝╚══════╝  ║
    ║                                                                  ║
    ║                 On-page & structural SEO audits                  ║
    ╚══════════════════════════════════════════════════════════════════╝"#;
    println!("{}", banner.bright_cyan());
    println!("    {}\n", format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
}

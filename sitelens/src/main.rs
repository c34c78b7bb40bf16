use colored::Colorize;
use commands::command_argument_builder;
use sitelens::handlers::{handle_audit, handle_init, handle_jobs_list, handle_jobs_show};
use sitelens_core::print_banner;
use tracing::Level;

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    tracing_subscriber::fmt()
        .with_max_level(if quiet { Level::WARN } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        // No subcommand provided, just show the banner
        None => return,
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("audit", primary_command)) => handle_audit(primary_command, quiet),
        Some(("jobs", primary_command)) => match primary_command.subcommand() {
            Some(("list", secondary_command)) => handle_jobs_list(secondary_command),
            Some(("show", secondary_command)) => handle_jobs_show(secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

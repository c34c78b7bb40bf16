use crate::CLAP_STYLING;
use clap::{arg, command};
use sitelens::handlers::DEFAULT_DB;
use std::path::PathBuf;

const DEFAULT_CONFIG_DIR: &str = "~/.config/sitelens/";

fn db_arg() -> clap::Arg {
    arg!(--"db" <PATH>)
        .required(false)
        .help("Path to the sitelens job database")
        .default_value(DEFAULT_DB)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitelens")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitelens")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the sitelens job database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the sitelens database")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("audit")
                .about(
                    "Audit crawl output against the sitemap and produce a scored SEO report",
                )
                .arg(
                    arg!(-p --"pages" <FILE>)
                        .required(true)
                        .help("Crawled page records (JSON array or JSON Lines)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-s --"sitemap" <FILE>)
                        .required(false)
                        .help("Parsed sitemap records (JSON array or JSON Lines)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-r --"robots" <FILE>)
                        .required(false)
                        .help(
                            "robots.txt as plain text, or directive records as .json/.jsonl",
                        )
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-e --"entry-html" <FILE>)
                        .required(false)
                        .help("Saved HTML of the entry page for rendering and schema checks")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("Audit target; defaults to the origin of the first page record"),
                )
                .arg(
                    arg!(-c --"customer" <NAME>)
                        .required(false)
                        .help("Customer name used for the job and artifact file names"),
                )
                .arg(
                    arg!(--"domain-pattern" <REGEX>)
                        .required(false)
                        .help("Regex a link host must match to count as internal"),
                )
                .arg(
                    arg!(--"brand" <TOKEN>)
                        .required(false)
                        .help("Brand token checked for n-gram dominance"),
                )
                .arg(
                    arg!(--"no-resolve-redirects")
                        .help("Build the link graph without following redirect chains")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"preview-rows" <N>)
                        .required(false)
                        .help("Rows shown per table preview")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"score-policy" <POLICY>)
                        .required(false)
                        .help("Score for a run with no crawl data")
                        .value_parser(["clean", "failure"])
                        .default_value("clean"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory for CSV artifacts and the report file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(db_arg()),
        )
        .subcommand(
            command!("jobs")
                .about("Inspect recorded audit jobs")
                .subcommand_required(true)
                .subcommand(command!("list").about("List all audit jobs").arg(db_arg()))
                .subcommand(
                    command!("show")
                        .about("Show one audit job and its stored findings")
                        .arg(arg!(<ID>).required(true).help("The job identifier"))
                        .arg(db_arg()),
                ),
        )
}

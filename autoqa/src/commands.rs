use clap::{Arg, arg, command};
use std::path::PathBuf;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

fn url_arg() -> Arg {
    arg!(-u --"url" <URL>)
        .required(true)
        .help("Website URL to test (http:// is assumed when no scheme is given)")
}

fn common_args() -> Vec<Arg> {
    vec![
        arg!(-l --"loglevel" <LEVEL>)
            .required(false)
            .help("Set logging level")
            .value_parser(clap::builder::PossibleValuesParser::new(LOG_LEVELS))
            .ignore_case(true)
            .default_value("INFO"),
        arg!(--"log-dir" <DIR>)
            .required(false)
            .help("Also write the log to <DIR>/test_run_<timestamp>.log")
            .value_parser(clap::value_parser!(PathBuf)),
        arg!(-c --"config" <PATH>)
            .required(false)
            .help("Path to a TOML config file (default: ./autoqa.toml if present)"),
    ]
}

fn depth_arg() -> Arg {
    arg!(-d --"depth" <DEPTH>)
        .required(false)
        .help("Maximum crawl depth (default: 2)")
        .value_parser(clap::value_parser!(usize))
}

fn pipeline_args() -> Vec<Arg> {
    vec![
        arg!(--"username" <USERNAME>)
            .required(false)
            .help("Login username, overrides credentials.valid.username from the fixture file"),
        arg!(--"password" <PASSWORD>)
            .required(false)
            .help("Login password, overrides credentials.valid.password from the fixture file"),
        arg!(-f --"fixtures" <PATH>)
            .required(false)
            .help("Path to the JSON test data file (default: auth_test_data.json)"),
        arg!(-o --"output-dir" <DIR>)
            .required(false)
            .help("Directory receiving test_scripts/ and reports/"),
        arg!(-w --"workers" <NUM_WORKERS>)
            .required(false)
            .help("Test cases generated and executed concurrently per page")
            .value_parser(clap::value_parser!(usize)),
    ]
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("autoqa")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("autoqa")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("page")
                .about("Analyze a single page, generate tests for it and run them")
                .arg(url_arg())
                .args(common_args())
                .args(pipeline_args()),
        )
        .subcommand(
            command!("crawl")
                .about("Discover every same-host page from a start URL, then test each one")
                .arg(url_arg())
                .arg(depth_arg())
                .args(common_args())
                .args(pipeline_args()),
        )
        .subcommand(
            command!("extract-urls")
                .about("Only discover same-host URLs and print them")
                .arg(url_arg())
                .arg(depth_arg())
                .args(common_args()),
        )
}

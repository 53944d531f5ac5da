use autoqa::commands::command_argument_builder;
use autoqa::handlers::*;
use autoqa_core::Config;
use clap::ArgMatches;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::Level;

fn sub_matches(argv: &[&str]) -> ArgMatches {
    let matches = command_argument_builder()
        .try_get_matches_from(argv.iter().copied())
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    sub.clone()
}

// ============================================================================
// URL Parsing Tests
// ============================================================================

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_host_and_port() {
    let result = parse_url_line("localhost:8080/login");
    assert_eq!(result, Some("http://localhost:8080/login".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_extract_url_path() {
    assert_eq!(
        autoqa::extract_url_path("https://example.com/api/users"),
        "/api/users"
    );
    assert_eq!(autoqa::extract_url_path("https://example.com/"), "/");
}

// ============================================================================
// Log Level Tests
// ============================================================================

#[test]
fn test_parse_log_level_names() {
    assert_eq!(parse_log_level("DEBUG"), Some(Level::DEBUG));
    assert_eq!(parse_log_level("info"), Some(Level::INFO));
    assert_eq!(parse_log_level("Warning"), Some(Level::WARN));
    assert_eq!(parse_log_level("ERROR"), Some(Level::ERROR));
    assert_eq!(parse_log_level("critical"), Some(Level::ERROR));
    assert_eq!(parse_log_level("verbose"), None);
}

#[test]
fn test_init_logging_with_log_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_logging(Level::INFO, Some(&dir.path().join("logs")))
        .unwrap()
        .unwrap();

    assert!(path.is_file());
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("test_run_"));
    assert!(name.ends_with(".log"));
}

// ============================================================================
// Command Line Tests
// ============================================================================

#[test]
fn test_page_command_arguments() {
    let args = sub_matches(&[
        "autoqa",
        "page",
        "-u",
        "example.com/login",
        "--username",
        "alice",
        "--password",
        "pw",
        "-l",
        "debug",
        "-w",
        "4",
    ]);

    assert_eq!(target_url(&args).unwrap(), "http://example.com/login");
    let credentials = credentials_from(&args);
    assert_eq!(credentials.username.as_deref(), Some("alice"));
    assert_eq!(credentials.password.as_deref(), Some("pw"));

    let overrides = CliOverrides::from_matches(&args);
    assert_eq!(overrides.workers, Some(4));
    assert_eq!(overrides.depth, None);
}

#[test]
fn test_loglevel_rejects_unknown_names() {
    let result = command_argument_builder().try_get_matches_from([
        "autoqa",
        "page",
        "-u",
        "https://example.com",
        "--loglevel",
        "LOUD",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_url_is_required() {
    let result = command_argument_builder().try_get_matches_from(["autoqa", "crawl"]);
    assert!(result.is_err());
}

#[test]
fn test_extract_urls_has_no_credentials() {
    let args = sub_matches(&["autoqa", "extract-urls", "-u", "https://example.com", "-d", "3"]);

    let credentials = credentials_from(&args);
    assert_eq!(credentials.username, None);
    assert_eq!(CliOverrides::from_matches(&args).depth, Some(3));
}

#[test]
fn test_quiet_flag_is_global() {
    let args = sub_matches(&["autoqa", "crawl", "-u", "https://example.com", "-q"]);
    assert!(args.get_flag("quiet"));
}

// ============================================================================
// Config Resolution Tests
// ============================================================================

#[test]
fn test_overrides_apply_to_config() {
    let mut config = Config::default();
    CliOverrides {
        depth: Some(1),
        workers: Some(0),
        fixtures: Some(PathBuf::from("/data/creds.json")),
        output_dir: Some(PathBuf::from("/tmp/run")),
    }
    .apply(&mut config);

    assert_eq!(config.crawl.max_depth, 1);
    assert_eq!(config.workers, 1);
    assert_eq!(config.paths.fixture_file, PathBuf::from("/data/creds.json"));
    assert_eq!(config.paths.scripts_dir, PathBuf::from("/tmp/run/test_scripts"));
    assert_eq!(config.paths.reports_dir, PathBuf::from("/tmp/run/reports"));
}

#[test]
fn test_resolve_config_reads_file_then_flags() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "workers = 2")?;
    writeln!(file, "[crawl]")?;
    writeln!(file, "max_depth = 5")?;
    writeln!(file, "pacing_ms = 0")?;
    let path = file.path().to_str().unwrap().to_string();

    let args = sub_matches(&["autoqa", "crawl", "-u", "https://example.com", "-c", &path, "-d", "1"]);
    let config = resolve_config(&args)?;

    assert_eq!(config.workers, 2);
    assert_eq!(config.crawl.pacing_ms, 0);
    assert_eq!(config.crawl.max_depth, 1);
    Ok(())
}

#[test]
fn test_resolve_config_bad_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "workers = [")?;
    let path = file.path().to_str().unwrap().to_string();

    let args = sub_matches(&["autoqa", "page", "-u", "https://example.com", "-c", &path]);
    assert!(resolve_config(&args).is_err());
    Ok(())
}

#[test]
fn test_success_rate_formatting() {
    colored::control::set_override(false);
    assert_eq!(format_success_rate(2.0 / 3.0), "66.7%");
    assert_eq!(format_success_rate(0.0), "0.0%");
}

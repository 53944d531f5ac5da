use anyhow::{Context, Result, bail};
use autoqa_core::crawl::{CrawlOptions, execute_crawl, extract_url_path};
use autoqa_core::report::generate_text_report;
use autoqa_core::{Config, CredentialOverride, Pipeline, WorkflowMode, WorkflowOutcome};
use autoqa_scanner::{HttpDriver, LoadPolicy, PageDriver};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Level, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use url::Url;

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();

    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some()
    {
        return Some(with_scheme);
    }

    None
}

/// Map the `--loglevel` names onto tracing levels.
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARNING" | "WARN" => Some(Level::WARN),
        "ERROR" | "CRITICAL" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the fmt subscriber. With `log_dir`, lines are also written to
/// `test_run_<timestamp>.log` there and the file path is returned.
pub fn init_logging(level: Level, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let Some(dir) = log_dir else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(format!("test_run_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    let _ = builder
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Mutex::new(file)))
        .try_init();
    Ok(Some(path))
}

pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub depth: Option<usize>,
    pub workers: Option<usize>,
    pub fixtures: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl CliOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            depth: optional::<usize>(args, "depth"),
            workers: optional::<usize>(args, "workers"),
            fixtures: optional::<String>(args, "fixtures").map(PathBuf::from),
            output_dir: optional::<String>(args, "output-dir").map(PathBuf::from),
        }
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.crawl.max_depth = depth;
        }
        if let Some(workers) = self.workers {
            config.workers = workers.max(1);
        }
        if let Some(fixtures) = &self.fixtures {
            config.paths.fixture_file = fixtures.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.paths.scripts_dir = dir.join("test_scripts");
            config.paths.reports_dir = dir.join("reports");
        }

        config.paths.scripts_dir = expand_path(&config.paths.scripts_dir);
        config.paths.reports_dir = expand_path(&config.paths.reports_dir);
        config.paths.fixture_file = expand_path(&config.paths.fixture_file);
    }
}

// Subcommands don't all define the same arguments.
fn optional<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> Option<T> {
    args.try_get_one::<T>(id).ok().flatten().cloned()
}

pub fn credentials_from(args: &ArgMatches) -> CredentialOverride {
    CredentialOverride {
        username: optional::<String>(args, "username"),
        password: optional::<String>(args, "password"),
    }
}

pub fn resolve_config(args: &ArgMatches) -> Result<Config> {
    let config_path = optional::<String>(args, "config").map(|p| expand_path(Path::new(&p)));
    let mut config = Config::load_or_default(config_path.as_deref())?;
    CliOverrides::from_matches(args).apply(&mut config);
    Ok(config)
}

pub fn target_url(args: &ArgMatches) -> Result<String> {
    let raw = optional::<String>(args, "url").unwrap_or_default();
    match parse_url_line(&raw) {
        Some(url) => Ok(url),
        None => bail!("Invalid URL '{}'", raw),
    }
}

fn setup_logging(args: &ArgMatches) -> Result<()> {
    let level = optional::<String>(args, "loglevel")
        .and_then(|l| parse_log_level(&l))
        .unwrap_or(Level::INFO);
    let log_dir = optional::<PathBuf>(args, "log-dir").map(|d| expand_path(&d));

    if let Some(path) = init_logging(level, log_dir.as_deref())? {
        info!("Writing log to {}", path.display());
    }
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_banner() {
    print_divider();
    println!(
        "{}  {}",
        "  AUTOQA".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}", "  LLM-driven website test generation".bright_black());
    print_divider();
    println!();
}

pub async fn handle_page(args: &ArgMatches) -> Result<()> {
    run_pipeline(args, WorkflowMode::SinglePage).await
}

pub async fn handle_crawl(args: &ArgMatches) -> Result<()> {
    run_pipeline(args, WorkflowMode::Crawl).await
}

async fn run_pipeline(args: &ArgMatches, mode: WorkflowMode) -> Result<()> {
    setup_logging(args)?;
    let url = target_url(args)?;
    let config = resolve_config(args)?;
    let quiet = args.get_flag("quiet");

    // API keys may live in a .env file
    let _ = dotenvy::dotenv();

    let driver = HttpDriver::new(config.crawl.navigation_timeout())
        .context("Failed to start the page driver")?;
    let pipeline = Pipeline::from_config(driver, &config)?
        .with_credentials(credentials_from(args))
        .with_progress_bars(!quiet);

    if !quiet {
        let target = match mode {
            WorkflowMode::SinglePage => "page".to_string(),
            WorkflowMode::Crawl => format!("site (max depth {})", config.crawl.max_depth),
        };
        println!("{} Testing {} {}", "→".blue(), target, url.bright_white());
        println!(
            "{} Scripts: {}  Reports: {}\n",
            "→".blue(),
            config.paths.scripts_dir.display(),
            config.paths.reports_dir.display()
        );
    }

    let outcome = pipeline.run(mode, &url).await?;
    print_summary(&outcome);
    Ok(())
}

pub async fn handle_extract_urls(args: &ArgMatches) -> Result<()> {
    setup_logging(args)?;
    let url = target_url(args)?;
    let config = resolve_config(args)?;

    let options = CrawlOptions {
        max_depth: config.crawl.max_depth,
        pacing: config.crawl.pacing(),
        load_policy: LoadPolicy {
            attempts: config.crawl.attempts,
            backoff: config.crawl.backoff(),
        },
        show_progress_bars: !args.get_flag("quiet"),
    };

    let mut driver = HttpDriver::new(config.crawl.navigation_timeout())
        .context("Failed to start the page driver")?;
    let result = execute_crawl(&mut driver, &url, &options).await;
    driver.quit().await;
    let urls = result?;

    println!();
    print_divider();
    println!("Extracted {} URLs from {}:", urls.len(), url.bright_white());
    for found in &urls {
        println!("  {} {}", "-".bright_black(), found);
    }
    print_divider();
    Ok(())
}

pub fn format_success_rate(rate: f64) -> String {
    let text = format!("{:.1}%", rate * 100.0);
    if rate >= 0.8 {
        text.green().bold().to_string()
    } else if rate >= 0.5 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

pub fn print_summary(outcome: &WorkflowOutcome) {
    println!();
    print!("{}", generate_text_report(&outcome.report));

    for page in &outcome.pages {
        let marker = if !page.loaded {
            "✗".red().bold()
        } else if page.passed == page.executed {
            "✓".green().bold()
        } else {
            "⚠".yellow().bold()
        };
        println!(
            "  {} {}  {} cases, {} run, {} passed",
            marker,
            extract_url_path(&page.url),
            page.test_cases,
            page.executed,
            page.passed
        );
    }

    println!();
    println!(
        "{} Success rate: {}",
        "→".blue(),
        format_success_rate(outcome.report.success_rate)
    );
    println!(
        "{} Test report generated: {}",
        "✓".green().bold(),
        outcome.report_path.display().to_string().bright_white()
    );
}

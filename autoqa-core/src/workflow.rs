//! The end-to-end run: load, analyze, synthesize, generate, validate,
//! execute, record, report.
//!
//! Pages are processed one at a time. Within a page, up to `workers` test
//! cases are generated and executed concurrently; results are still
//! recorded in test-case order.

use crate::analyze::SemanticAnalyzer;
use crate::artifacts::ArtifactStore;
use crate::config::{Config, ModelRole};
use crate::crawl::{CrawlOptions, execute_crawl};
use crate::error::Result;
use crate::generate::{GeneratedScript, ScriptGenerator};
use crate::llm::{CallPolicy, ChatClient, TextGenerator};
use crate::report::{Report, ResultLog};
use crate::sandbox::{ExecutionResult, Sandbox};
use crate::synthesize::{CredentialOverride, Synthesizer};
use autoqa_scanner::{LoadPolicy, PageDriver, extract_structure, load_with_retry, normalize_url};
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowMode {
    /// Test exactly the given URL.
    SinglePage,
    /// Discover same-host URLs first, then test each of them.
    Crawl,
}

/// What happened on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub url: String,
    pub loaded: bool,
    pub test_cases: usize,
    pub scripts_accepted: usize,
    pub executed: usize,
    pub passed: usize,
}

#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub report: Report,
    pub report_path: PathBuf,
    pub pages: Vec<PageOutcome>,
}

pub struct Pipeline<D: PageDriver> {
    driver: D,
    analyzer: SemanticAnalyzer,
    synthesizer: Synthesizer,
    generator: ScriptGenerator,
    sandbox: Sandbox,
    artifacts: Arc<ArtifactStore>,
    load_policy: LoadPolicy,
    crawl_options: CrawlOptions,
    workers: usize,
    log: ResultLog,
    pages_visited: BTreeSet<String>,
    generated_scripts: Vec<String>,
    start_time: DateTime<Local>,
}

impl<D: PageDriver> Pipeline<D> {
    pub fn new(
        driver: D,
        analysis: Arc<dyn TextGenerator>,
        scripting: Arc<dyn TextGenerator>,
        config: &Config,
    ) -> Self {
        let policy = CallPolicy::from(&config.llm);
        let artifacts = Arc::new(ArtifactStore::new(
            config.paths.scripts_dir.clone(),
            config.paths.reports_dir.clone(),
        ));
        let load_policy = LoadPolicy {
            attempts: config.crawl.attempts,
            backoff: config.crawl.backoff(),
        };

        Self {
            driver,
            analyzer: SemanticAnalyzer::new(analysis.clone(), policy),
            synthesizer: Synthesizer::new(analysis, policy, config.paths.fixture_file.clone()),
            generator: ScriptGenerator::new(scripting, policy, artifacts.clone()),
            sandbox: Sandbox::from(&config.sandbox),
            artifacts,
            load_policy,
            crawl_options: CrawlOptions {
                max_depth: config.crawl.max_depth,
                pacing: config.crawl.pacing(),
                load_policy,
                show_progress_bars: false,
            },
            workers: config.workers.max(1),
            log: ResultLog::new(),
            pages_visited: BTreeSet::new(),
            generated_scripts: Vec::new(),
            start_time: Local::now(),
        }
    }

    /// Build a pipeline backed by the configured chat-completions endpoints.
    pub fn from_config(driver: D, config: &Config) -> Result<Self> {
        let analysis = ChatClient::from_config(&config.llm, ModelRole::Analysis)?;
        let scripting = ChatClient::from_config(&config.llm, ModelRole::Scripting)?;
        Ok(Self::new(driver, Arc::new(analysis), Arc::new(scripting), config))
    }

    pub fn with_credentials(mut self, credentials: CredentialOverride) -> Self {
        self.synthesizer = self.synthesizer.with_credentials(credentials);
        self
    }

    pub fn with_progress_bars(mut self, enabled: bool) -> Self {
        self.crawl_options.show_progress_bars = enabled;
        self
    }

    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Run to completion. The driver is always shut down and a report is
    /// always written; only a failure to write it is an error.
    pub async fn run(mut self, mode: WorkflowMode, url: &str) -> Result<WorkflowOutcome> {
        self.start_time = Local::now();
        let mut pages = Vec::new();

        match mode {
            WorkflowMode::SinglePage => pages.push(self.process_page(url).await),
            WorkflowMode::Crawl => {
                match execute_crawl(&mut self.driver, url, &self.crawl_options).await {
                    Ok(urls) => {
                        if urls.is_empty() {
                            warn!("No URLs found to test");
                        }
                        self.pages_visited.extend(urls.iter().cloned());
                        for page_url in urls {
                            pages.push(self.process_page(&page_url).await);
                        }
                    }
                    Err(e) => error!("URL extraction failed: {}", e),
                }
            }
        }

        self.finish(pages).await
    }

    pub async fn process_page(&mut self, url: &str) -> PageOutcome {
        let mut outcome = PageOutcome {
            url: url.to_string(),
            ..PageOutcome::default()
        };

        info!("Processing URL: {}", url);
        if let Err(e) = load_with_retry(&mut self.driver, url, &self.load_policy).await {
            error!("Failed to load {}: {}", url, e);
            return outcome;
        }
        outcome.loaded = true;

        let current_url = match self.driver.current_url() {
            current if current.is_empty() => url.to_string(),
            current => current,
        };
        let source = self.driver.page_source();
        let title = self.driver.title();
        self.pages_visited
            .insert(normalize_url(&current_url).unwrap_or_else(|| current_url.clone()));

        info!("Analyzing page: {}", current_url);
        let structural = extract_structure(&source, &current_url, &title);
        let metadata = self.analyzer.build_metadata(structural, &source).await;
        debug!("Page metadata: {}", metadata.to_json_pretty());

        let cases = self.synthesizer.synthesize(&metadata, &source).await;
        outcome.test_cases = cases.len();

        let generator = &self.generator;
        let sandbox = &self.sandbox;
        let metadata_ref = &metadata;
        let source_ref = source.as_str();

        let runs: Vec<(GeneratedScript, Option<ExecutionResult>)> = stream::iter(cases)
            .map(|case| async move {
                let script = generator.generate(case, metadata_ref, source_ref).await;
                let result = if script.valid {
                    Some(sandbox.execute(&script.source).await)
                } else {
                    None
                };
                (script, result)
            })
            .buffered(self.workers)
            .collect()
            .await;

        for (script, result) in runs {
            if let Some(name) = script.artifact.as_deref().and_then(|p| p.file_name()) {
                self.generated_scripts.push(name.to_string_lossy().into_owned());
            }

            let Some(result) = result else {
                info!("Skipping invalid script for '{}'", script.test_case.name);
                continue;
            };

            outcome.scripts_accepted += 1;
            outcome.executed += 1;
            if result.success {
                outcome.passed += 1;
                info!("Test passed: {}", script.test_case.name);
            } else {
                error!("Test failed: {}: {}", script.test_case.name, result.error.trim());
                debug!("Metadata for failed test: {}", metadata.to_json_pretty());
            }
            self.log.record(&current_url, result);
        }

        outcome
    }

    async fn finish(mut self, pages: Vec<PageOutcome>) -> Result<WorkflowOutcome> {
        self.driver.quit().await;

        let report = Report::build(
            self.start_time,
            self.pages_visited.into_iter().collect(),
            &self.log,
            self.generated_scripts,
        );
        let report_path = self.artifacts.write_report(&report)?;

        info!(
            "Run finished: {} tests executed, success rate {:.1}%",
            report.test_results.len(),
            report.success_rate * 100.0
        );

        Ok(WorkflowOutcome {
            report,
            report_path,
            pages,
        })
    }
}

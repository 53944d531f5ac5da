// Execution records and the end-of-session report

use crate::crawl::extract_url_path;
use crate::sandbox::ExecutionResult;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub timestamp: String,
    pub url: String,
    pub result: ExecutionResult,
}

/// Append-only log of executed scripts, in execution order.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    records: Vec<TestRecord>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, result: ExecutionResult) {
        self.records.push(TestRecord {
            timestamp: Local::now().to_rfc3339(),
            url: url.to_string(),
            result,
        });
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn success_rate(&self) -> f64 {
        success_rate(self.records.iter().map(|r| &r.result))
    }
}

/// Fraction of successful results, `0.0` when there are none.
pub fn success_rate<'a>(results: impl IntoIterator<Item = &'a ExecutionResult>) -> f64 {
    let (total, passed) = results
        .into_iter()
        .fold((0usize, 0usize), |(total, passed), result| {
            (total + 1, passed + usize::from(result.success))
        });

    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub start_time: String,
    pub pages_visited: Vec<String>,
    pub test_results: Vec<TestRecord>,
    pub success_rate: f64,
    pub generated_scripts: Vec<String>,
}

impl Report {
    pub fn build(
        start_time: DateTime<Local>,
        pages_visited: Vec<String>,
        log: &ResultLog,
        generated_scripts: Vec<String>,
    ) -> Self {
        Self {
            start_time: start_time.to_rfc3339(),
            pages_visited,
            test_results: log.records().to_vec(),
            success_rate: log.success_rate(),
            generated_scripts,
        }
    }

    pub fn passed(&self) -> usize {
        self.test_results.iter().filter(|r| r.result.success).count()
    }

    pub fn failed(&self) -> usize {
        self.test_results.len() - self.passed()
    }
}

/// Plain-text summary for the console.
pub fn generate_text_report(report: &Report) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("                           AUTOQA TEST RUN SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Started:       {}\n", report.start_time));
    out.push_str(&format!("Pages Tested:  {}\n", report.pages_visited.len()));
    out.push_str(&format!("Scripts Saved: {}\n", report.generated_scripts.len()));
    out.push_str(&format!(
        "Executed:      {} ({} passed, {} failed)\n",
        report.test_results.len(),
        report.passed(),
        report.failed()
    ));
    out.push_str(&format!("Success Rate:  {:.1}%\n\n", report.success_rate * 100.0));

    if !report.test_results.is_empty() {
        out.push_str(RULE);
        out.push_str("RESULTS BY PAGE\n");
        out.push_str(RULE);
        out.push('\n');

        let mut by_page: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for record in &report.test_results {
            let entry = by_page.entry(extract_url_path(&record.url)).or_default();
            entry.0 += 1;
            if record.result.success {
                entry.1 += 1;
            }
        }

        for (path, (total, passed)) in &by_page {
            out.push_str(&format!("  {:<50} {}/{} passed\n", path, passed, total));
        }
        out.push('\n');
    }

    out
}

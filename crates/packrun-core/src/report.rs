//! Hierarchical test report: one suite per package, one case per unit.
//!
//! Suites and cases are append-only. A case's result is recorded exactly
//! once, by the execution loop; plugins only write to the case's [`CaseLog`].

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use derive_more::Display;
use serde::{Serialize, Serializer};

use crate::{Error, Result};

/// Outcome of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[display("success")]
    Success,
    /// The plugin returned a non-zero code.
    #[display("failure")]
    Failure,
    #[display("skipped")]
    Skipped,
    /// The plugin faulted (error, panic or timeout).
    #[display("error")]
    Error,
}

impl CaseStatus {
    /// Whether this status counts toward the failure total.
    pub fn is_failure(&self) -> bool {
        matches!(self, CaseStatus::Failure | CaseStatus::Error)
    }
}

/// Result of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: CaseStatus,
    pub code: i32,
    pub message: Option<String>,
}

impl ExecutionResult {
    pub fn success() -> Self {
        Self {
            status: CaseStatus::Success,
            code: 0,
            message: None,
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            status: CaseStatus::Failure,
            code,
            message: Some(message.into()),
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: CaseStatus::Skipped,
            code: 0,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CaseStatus::Error,
            code: 1,
            message: Some(message.into()),
        }
    }
}

/// Output and diagnostics a plugin reports for its case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseLog {
    output: Vec<String>,
    failure_message: Option<String>,
}

impl CaseLog {
    /// Append a line of captured output.
    pub fn push_output(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    /// Explain why the plugin is about to report failure.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure_message = Some(message.into());
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }
}

/// One (plugin, target) unit within a package suite.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    name: String,
    class_name: String,
    result: Option<ExecutionResult>,
    #[serde(rename = "time", serialize_with = "seconds")]
    duration: Duration,
    log: CaseLog,
}

impl TestCase {
    fn new(name: String, class_name: String) -> Self {
        Self {
            name,
            class_name,
            result: None,
            duration: Duration::ZERO,
            log: CaseLog::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        self.result.as_ref()
    }

    pub fn status(&self) -> Option<CaseStatus> {
        self.result.as_ref().map(|r| r.status)
    }

    /// Record the outcome. A case's result can only be set once.
    pub fn set_result(&mut self, result: ExecutionResult) -> Result<()> {
        if self.result.is_some() {
            return Err(Error::Usage(format!(
                "result for case '{}' already recorded",
                self.name
            )));
        }
        self.result = Some(result);
        Ok(())
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn log(&self) -> &CaseLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut CaseLog {
        &mut self.log
    }
}

/// All cases run for one package.
#[derive(Debug, Clone, Serialize)]
pub struct TestSuite {
    name: String,
    package: String,
    cases: Vec<TestCase>,
}

impl TestSuite {
    /// Open a new case and return it for recording.
    pub fn new_case(
        &mut self,
        name: impl Into<String>,
        class_name: impl Into<String>,
    ) -> &mut TestCase {
        self.cases.push(TestCase::new(name.into(), class_name.into()));
        let last = self.cases.len() - 1;
        &mut self.cases[last]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn count(&self, status: CaseStatus) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status() == Some(status))
            .count()
    }

    /// Cases that failed or faulted, plus any left without a result.
    pub fn failed(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.status().is_none_or(|s| s.is_failure()))
            .count()
    }

    pub fn duration(&self) -> Duration {
        self.cases.iter().map(TestCase::duration).sum()
    }
}

/// Output format for [`TestReport::serialize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// JUnit XML, consumed by most CI systems.
    #[default]
    Junit,
    Json,
}

/// The whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestReport {
    suites: Vec<TestSuite>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new suite and return it for recording.
    pub fn new_suite(&mut self, name: impl Into<String>, package: impl Into<String>) -> &mut TestSuite {
        self.suites.push(TestSuite {
            name: name.into(),
            package: package.into(),
            cases: Vec::new(),
        });
        let last = self.suites.len() - 1;
        &mut self.suites[last]
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(TestSuite::failed).sum()
    }

    pub fn count(&self, status: CaseStatus) -> usize {
        self.suites.iter().map(|s| s.count(status)).sum()
    }

    /// Write the report to `path`, creating parent directories.
    pub fn serialize(&self, path: &Path, format: ReportFormat) -> Result<()> {
        let body = match format {
            ReportFormat::Junit => self.render_junit(),
            ReportFormat::Json => self.render_json()?,
        };

        let write_error = |source| Error::ReportWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, body).map_err(write_error)
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn render_junit(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_junit(&mut out);
        out
    }

    fn write_junit(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<testsuites tests="{}" failures="{}" errors="{}" skipped="{}" time="{}">"#,
            self.total(),
            self.count(CaseStatus::Failure),
            self.count(CaseStatus::Error),
            self.count(CaseStatus::Skipped),
            format_seconds(self.suites.iter().map(TestSuite::duration).sum()),
        )?;

        for (id, suite) in self.suites.iter().enumerate() {
            writeln!(
                out,
                r#"  <testsuite id="{}" name="{}" package="{}" tests="{}" failures="{}" errors="{}" skipped="{}" time="{}">"#,
                id,
                escape(&suite.name),
                escape(&suite.package),
                suite.cases.len(),
                suite.count(CaseStatus::Failure),
                suite.count(CaseStatus::Error),
                suite.count(CaseStatus::Skipped),
                format_seconds(suite.duration()),
            )?;
            for case in &suite.cases {
                write_case(out, case)?;
            }
            writeln!(out, "  </testsuite>")?;
        }

        writeln!(out, "</testsuites>")
    }
}

fn write_case(out: &mut String, case: &TestCase) -> std::fmt::Result {
    write!(
        out,
        r#"    <testcase classname="{}" name="{}" time="{}""#,
        escape(&case.class_name),
        escape(&case.name),
        format_seconds(case.duration),
    )?;

    let outcome = match &case.result {
        Some(r) => match r.status {
            CaseStatus::Success => None,
            CaseStatus::Skipped => Some("      <skipped/>".to_string()),
            CaseStatus::Failure => Some(format!(
                r#"      <failure message="{}" type="failure">code {}</failure>"#,
                escape(r.message.as_deref().unwrap_or_default()),
                r.code
            )),
            CaseStatus::Error => Some(format!(
                r#"      <error message="{}" type="error"/>"#,
                escape(r.message.as_deref().unwrap_or_default()),
            )),
        },
        None => Some(r#"      <error message="no result recorded" type="error"/>"#.to_string()),
    };

    if outcome.is_none() && case.log.output.is_empty() {
        return writeln!(out, "/>");
    }

    writeln!(out, ">")?;
    if let Some(outcome) = outcome {
        writeln!(out, "{}", outcome)?;
    }
    if !case.log.output.is_empty() {
        writeln!(
            out,
            "      <system-out>{}</system-out>",
            escape(&case.log.output.join("\n"))
        )?;
    }
    writeln!(out, "    </testcase>")
}

fn format_seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

fn seconds<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Escape text for use in XML attributes and character data.
fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' | '\r' | '\t' => escaped.push(c),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

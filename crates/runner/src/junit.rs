//! JUnit XML report ingestion
//!
//! Karate writes one JUnit XML file per feature into its report directory.
//! Files may use a `<testsuites>` root or a bare `<testsuite>` root, and
//! suites may nest. Every test case found anywhere becomes one step.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use walkdir::WalkDir;

use karate_executor_common::{ExecutionStatus, Result, StepResult};

/// Outcome of a single test case as recorded in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Skipped,
    Failed,
    Error,
}

impl CaseStatus {
    /// Map to a step status; skipped cases never fail a run
    pub fn step_status(&self) -> ExecutionStatus {
        match self {
            CaseStatus::Passed | CaseStatus::Skipped => ExecutionStatus::Passed,
            CaseStatus::Failed | CaseStatus::Error => ExecutionStatus::Failed,
        }
    }
}

/// A `<testcase>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub classname: String,
    pub duration: Duration,
    pub status: CaseStatus,
    /// `message` of the failure, error or skipped child
    pub message: Option<String>,
}

impl TestCase {
    pub fn to_step(&self) -> StepResult {
        StepResult {
            name: self.name.clone(),
            duration: format_duration(self.duration),
            status: self.status.step_status(),
        }
    }

    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut case = TestCase {
            name: String::new(),
            classname: String::new(),
            duration: Duration::ZERO,
            status: CaseStatus::Passed,
            message: None,
        };

        for attr in element.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"name" => case.name = attr.unescape_value()?.into_owned(),
                b"classname" => case.classname = attr.unescape_value()?.into_owned(),
                b"time" => case.duration = parse_seconds(&attr.unescape_value()?),
                _ => {}
            }
        }

        Ok(case)
    }

    /// Apply a `<failure>`, `<error>` or `<skipped>` child
    fn mark(&mut self, status: CaseStatus, element: &BytesStart<'_>) -> Result<()> {
        let current = rank(self.status);
        if rank(status) > current {
            self.status = status;
            self.message = None;
            for attr in element.attributes() {
                let attr = attr?;
                if attr.key.as_ref() == b"message" {
                    self.message = Some(attr.unescape_value()?.into_owned());
                }
            }
        }
        Ok(())
    }
}

fn rank(status: CaseStatus) -> u8 {
    match status {
        CaseStatus::Passed => 0,
        CaseStatus::Skipped => 1,
        CaseStatus::Failed => 2,
        CaseStatus::Error => 3,
    }
}

/// A `<testsuite>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
    pub suites: Vec<TestSuite>,
}

impl TestSuite {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut suite = TestSuite::default();
        for attr in element.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == b"name" {
                suite.name = attr.unescape_value()?.into_owned();
            }
        }
        Ok(suite)
    }

    /// Every case in this suite and its nested suites, depth first
    pub fn all_cases(&self) -> Vec<&TestCase> {
        let mut cases: Vec<&TestCase> = self.cases.iter().collect();
        for suite in &self.suites {
            cases.extend(suite.all_cases());
        }
        cases
    }
}

/// Parse one JUnit XML document
pub fn parse_report(xml: &str) -> Result<Vec<TestSuite>> {
    let mut reader = Reader::from_str(xml);

    let mut roots: Vec<TestSuite> = Vec::new();
    let mut open: Vec<TestSuite> = Vec::new();
    let mut case: Option<TestCase> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"testsuite" => open.push(TestSuite::from_element(&element)?),
                b"testcase" => case = Some(TestCase::from_element(&element)?),
                other => mark_case(case.as_mut(), other, &element)?,
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"testsuite" => close_suite(TestSuite::from_element(&element)?, &mut open, &mut roots),
                b"testcase" => add_case(TestCase::from_element(&element)?, &mut open, &mut roots),
                other => mark_case(case.as_mut(), other, &element)?,
            },
            Event::End(element) => match element.local_name().as_ref() {
                b"testsuite" => {
                    if let Some(suite) = open.pop() {
                        close_suite(suite, &mut open, &mut roots);
                    }
                }
                b"testcase" => {
                    if let Some(done) = case.take() {
                        add_case(done, &mut open, &mut roots);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    // Tolerate a truncated document by keeping whatever was read
    while let Some(suite) = open.pop() {
        close_suite(suite, &mut open, &mut roots);
    }

    Ok(roots)
}

fn mark_case(case: Option<&mut TestCase>, name: &[u8], element: &BytesStart<'_>) -> Result<()> {
    let status = match name {
        b"failure" => CaseStatus::Failed,
        b"error" => CaseStatus::Error,
        b"skipped" => CaseStatus::Skipped,
        _ => return Ok(()),
    };
    match case {
        Some(case) => case.mark(status, element),
        None => Ok(()),
    }
}

fn close_suite(suite: TestSuite, open: &mut [TestSuite], roots: &mut Vec<TestSuite>) {
    match open.last_mut() {
        Some(parent) => parent.suites.push(suite),
        None => roots.push(suite),
    }
}

fn add_case(case: TestCase, open: &mut [TestSuite], roots: &mut Vec<TestSuite>) {
    match open.last_mut() {
        Some(suite) => suite.cases.push(case),
        None => roots.push(TestSuite {
            cases: vec![case],
            ..Default::default()
        }),
    }
}

/// Read and parse one report file
pub fn ingest_file(path: &Path) -> Result<Vec<TestSuite>> {
    let xml = std::fs::read_to_string(path)?;
    parse_report(&xml)
}

/// Walk a report directory and flatten every test case into steps
///
/// A missing directory, unreadable entries and malformed files are skipped.
pub fn collect_steps(report_dir: &Path) -> Vec<StepResult> {
    let mut steps = Vec::new();

    for entry in WalkDir::new(report_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping report entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map(|e| e != "xml").unwrap_or(true) {
            continue;
        }

        match ingest_file(path) {
            Ok(suites) => {
                let before = steps.len();
                for case in suites.iter().flat_map(TestSuite::all_cases) {
                    if case.status.step_status() == ExecutionStatus::Failed {
                        debug!(
                            "{} {}: {}",
                            case.classname,
                            case.name,
                            case.message.as_deref().unwrap_or("failed")
                        );
                    }
                    steps.push(case.to_step());
                }
                debug!("Ingested {} step(s) from {}", steps.len() - before, path.display());
            }
            Err(e) => warn!("Skipping malformed report {}: {}", path.display(), e),
        }
    }

    steps
}

/// Parse a JUnit `time` attribute (seconds, possibly fractional)
pub fn parse_seconds(raw: &str) -> Duration {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();

    let (whole, frac) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if digits(whole) && digits(frac) && !(whole.is_empty() && frac.is_empty()) {
        let secs: u64 = if whole.is_empty() { 0 } else { whole.parse().unwrap_or(0) };
        let mut nanos_str: String = frac.chars().take(9).collect();
        while nanos_str.len() < 9 {
            nanos_str.push('0');
        }
        let nanos: u32 = nanos_str.parse().unwrap_or(0);
        return Duration::new(secs, nanos);
    }

    match cleaned.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_nanos((secs * 1e9).round() as u64),
        _ => Duration::ZERO,
    }
}

/// Render a duration the way Go's `time.Duration` prints it
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(duration.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(out, "{}s", decimal(secs, 1_000_000_000));
    out
}

/// `value / unit` with trailing fractional zeros dropped
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let frac = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

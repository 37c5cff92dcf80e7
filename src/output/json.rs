//! JSON output formatter

use super::OutputFormatter;
use crate::report::ValidationReport;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    violations: Vec<JsonEntry<'a>>,
    faults: Vec<JsonEntry<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    constraint: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    message: String,
}

#[derive(Serialize)]
struct JsonSummary {
    beans_checked: usize,
    beans_with_violations: usize,
    constraints_evaluated: usize,
    constraints_skipped: usize,
    violation_count: usize,
    fault_count: usize,
    duration_ms: u128,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> String {
        let violations = report
            .violations
            .iter()
            .map(|v| JsonEntry {
                constraint: &v.constraint,
                kind: v.kind,
                field: v.field.as_deref(),
                source: v.source.as_deref(),
                message: v.message.clone(),
            })
            .collect();
        let faults = report
            .faults
            .iter()
            .map(|f| JsonEntry {
                constraint: &f.constraint,
                kind: f.kind,
                field: f.field.as_deref(),
                source: f.source.as_deref(),
                message: f.message(),
            })
            .collect();

        let output = JsonOutput {
            violations,
            faults,
            summary: JsonSummary {
                beans_checked: report.beans_checked,
                beans_with_violations: report.beans_with_violations,
                constraints_evaluated: report.constraints_evaluated,
                constraints_skipped: report.constraints_skipped,
                violation_count: report.violations.len(),
                fault_count: report.faults.len(),
                duration_ms: report.duration.as_millis(),
            },
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }
}

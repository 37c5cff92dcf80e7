//! Human-readable text output formatter

use super::OutputFormatter;
use crate::report::{Fault, ValidationReport, Violation};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, s: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(s).to_string()
        } else {
            s.to_string()
        }
    }

    fn location(source: &Option<String>, field: &Option<String>) -> String {
        match (source, field) {
            (Some(source), Some(field)) => format!("{}: {}", source, field),
            (Some(source), None) => source.clone(),
            (None, Some(field)) => field.clone(),
            (None, None) => "<bean>".to_string(),
        }
    }

    pub fn format_violation(&self, violation: &Violation) -> String {
        format!(
            "{}: {}[{}]: {}\n",
            Self::location(&violation.source, &violation.field),
            self.paint("invalid", |s| s.yellow().bold()),
            self.paint(&violation.constraint, |s| s.cyan()),
            violation.message
        )
    }

    pub fn format_fault(&self, fault: &Fault) -> String {
        format!(
            "{}: {}[{}]: {}\n",
            Self::location(&fault.source, &fault.field),
            self.paint("fault", |s| s.red().bold()),
            self.paint(&fault.constraint, |s| s.cyan()),
            fault.message()
        )
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        for fault in &report.faults {
            output.push_str(&self.format_fault(fault));
        }
        for violation in &report.violations {
            output.push_str(&self.format_violation(violation));
        }

        if self.show_stats {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!(
                "{} checked against {}",
                plural(report.beans_checked, "bean", "beans"),
                plural(report.constraints_evaluated, "constraint", "constraints")
            ));

            let mut counts = Vec::new();
            if report.has_faults() {
                counts.push(self.paint(&plural(report.faults.len(), "fault", "faults"), |s| s.red()));
            }
            if report.has_violations() {
                counts.push(self.paint(
                    &plural(report.violations.len(), "violation", "violations"),
                    |s| s.yellow(),
                ));
            }
            if counts.is_empty() {
                counts.push(self.paint("all valid", |s| s.green()));
            }
            output.push_str(&format!(": {}\n", counts.join(", ")));

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                report.duration.as_secs_f64()
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ConstraintFault;

    fn violation() -> Violation {
        Violation {
            constraint: "name-size".to_string(),
            kind: "not-null-size",
            field: Some("name".to_string()),
            source: Some("order.json".to_string()),
            message: "must not be null and have a size between 1 and 64".to_string(),
        }
    }

    #[test]
    fn test_format_violation() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format_violation(&violation());
        assert_eq!(
            output,
            "order.json: name: invalid[name-size]: must not be null and have a size between 1 and 64\n"
        );
    }

    #[test]
    fn test_format_report() {
        let formatter = TextFormatter::new().without_color();
        let report = ValidationReport {
            violations: vec![violation()],
            faults: vec![Fault {
                constraint: "period".to_string(),
                kind: "expression-for-class",
                field: None,
                source: None,
                reason: ConstraintFault::UnknownLanguage("cobol-script".to_string()),
            }],
            beans_checked: 1,
            constraints_evaluated: 2,
            ..Default::default()
        };

        let output = formatter.format(&report);
        assert!(output.contains("<bean>: fault[period]: no engine registered for cobol-script"));
        assert!(output.contains("1 bean checked against 2 constraints: 1 fault, 1 violation"));
    }

    #[test]
    fn test_format_clean_report() {
        let formatter = TextFormatter::new().without_color();
        let report = ValidationReport {
            beans_checked: 3,
            constraints_evaluated: 1,
            ..Default::default()
        };
        let output = formatter.format(&report);
        assert!(output.starts_with("3 beans checked against 1 constraint: all valid"));
    }
}

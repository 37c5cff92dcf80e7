//! Validation reports

use crate::descriptor::ConstraintDecl;
use crate::outcome::{ConstraintFault, EvaluationResult};
use std::time::Duration;

/// A value that does not satisfy a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Declaration label (id, else `kind@field`)
    pub constraint: String,
    /// Declaration kind as written in declaration files
    pub kind: &'static str,
    /// Property path the declaration targets
    pub field: Option<String>,
    /// Where the bean came from, e.g. a file name
    pub source: Option<String>,
    /// What the declaration requires
    pub message: String,
}

/// A declaration that could not be evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub constraint: String,
    pub kind: &'static str,
    pub field: Option<String>,
    pub source: Option<String>,
    pub reason: ConstraintFault,
}

impl Fault {
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

/// Result of validating one or more beans
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Failed declarations
    pub violations: Vec<Violation>,

    /// Unusable declarations
    pub faults: Vec<Fault>,

    /// Beans validated
    pub beans_checked: usize,

    /// Beans with at least one violation
    pub beans_with_violations: usize,

    /// Declarations evaluated
    pub constraints_evaluated: usize,

    /// Declarations skipped as disabled
    pub constraints_skipped: usize,

    /// Processing duration
    pub duration: Duration,
}

impl ValidationReport {
    /// Report for one bean from per-declaration outcomes
    pub fn from_outcomes<'a>(
        source: Option<&str>,
        outcomes: impl IntoIterator<Item = (&'a ConstraintDecl, EvaluationResult)>,
    ) -> Self {
        let mut report = ValidationReport {
            beans_checked: 1,
            ..Default::default()
        };

        for (decl, outcome) in outcomes {
            report.record(source, decl, outcome);
        }
        if !report.violations.is_empty() {
            report.beans_with_violations = 1;
        }
        report
    }

    /// Record the outcome of one declaration
    pub fn record(&mut self, source: Option<&str>, decl: &ConstraintDecl, outcome: EvaluationResult) {
        self.constraints_evaluated += 1;

        match outcome {
            EvaluationResult::Valid => {}
            EvaluationResult::Invalid => self.violations.push(Violation {
                constraint: decl.label(),
                kind: decl.descriptor.kind_name(),
                field: decl.field.clone(),
                source: source.map(String::from),
                message: decl.descriptor.requirement(),
            }),
            EvaluationResult::ConfigurationFault(reason) => self.faults.push(Fault {
                constraint: decl.label(),
                kind: decl.descriptor.kind_name(),
                field: decl.field.clone(),
                source: source.map(String::from),
                reason,
            }),
        }
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    /// Check if every declaration passed
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.faults.is_empty()
    }

    /// Get exit code (0 = clean, 1 = violations, 2 = faults)
    pub fn exit_code(&self) -> i32 {
        if self.has_faults() {
            2
        } else if self.has_violations() {
            1
        } else {
            0
        }
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        self.violations.extend(other.violations);
        self.faults.extend(other.faults);
        self.beans_checked += other.beans_checked;
        self.beans_with_violations += other.beans_with_violations;
        self.constraints_evaluated += other.constraints_evaluated;
        self.constraints_skipped += other.constraints_skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{NotNullSize, UriConstraint};

    fn size_decl() -> ConstraintDecl {
        ConstraintDecl::new(NotNullSize::new(1, 3)).on_field("name")
    }

    #[test]
    fn test_from_outcomes() {
        let size = size_decl();
        let uri = ConstraintDecl::new(UriConstraint::new()).with_id("homepage");
        let report = ValidationReport::from_outcomes(
            Some("order.json"),
            vec![
                (&size, EvaluationResult::Invalid),
                (
                    &uri,
                    EvaluationResult::ConfigurationFault(ConstraintFault::InvalidAllowList(
                        "x".to_string(),
                    )),
                ),
            ],
        );

        assert_eq!(report.beans_checked, 1);
        assert_eq!(report.beans_with_violations, 1);
        assert_eq!(report.constraints_evaluated, 2);
        assert_eq!(report.violations[0].constraint, "not-null-size@name");
        assert_eq!(report.violations[0].source.as_deref(), Some("order.json"));
        assert_eq!(report.faults[0].constraint, "homepage");
        assert_eq!(report.faults[0].kind, "uri");
    }

    #[test]
    fn test_exit_code() {
        let mut report = ValidationReport::default();
        assert!(report.is_clean());
        assert_eq!(report.exit_code(), 0);

        let decl = size_decl();
        report.record(None, &decl, EvaluationResult::Invalid);
        assert_eq!(report.exit_code(), 1);

        report.record(
            None,
            &decl,
            EvaluationResult::ConfigurationFault(ConstraintFault::InvertedBounds { min: 3, max: 1 }),
        );
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_merge() {
        let decl = size_decl();
        let mut a = ValidationReport::from_outcomes(None, vec![(&decl, EvaluationResult::Valid)]);
        let b = ValidationReport::from_outcomes(None, vec![(&decl, EvaluationResult::Invalid)]);
        a.merge(b);

        assert_eq!(a.beans_checked, 2);
        assert_eq!(a.beans_with_violations, 1);
        assert_eq!(a.constraints_evaluated, 2);
        assert_eq!(a.violations.len(), 1);
    }
}

//! Validator: runs declarations against beans

use crate::bindings::lookup_path;
use crate::config::Config;
use crate::constraint;
use crate::descriptor::{ConstraintDecl, ConstraintDescriptor};
use crate::expression::ExpressionResolver;
use crate::outcome::EvaluationResult;
use crate::report::ValidationReport;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

static NULL: Value = Value::Null;

/// A bean and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedBean {
    pub source: String,
    pub value: Value,
}

impl SourcedBean {
    pub fn new(source: impl Into<String>, value: Value) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Dispatches declarations to their evaluators
#[derive(Debug, Clone)]
pub struct Validator {
    resolver: Arc<ExpressionResolver>,
    config: Config,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Validator {
    /// Validator with the languages the configuration allows
    pub fn new(config: Config) -> Self {
        let resolver = Arc::new(config.build_resolver());
        Self { resolver, config }
    }

    /// Validator sharing an existing registry
    pub fn with_resolver(resolver: Arc<ExpressionResolver>, config: Config) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &ExpressionResolver {
        &self.resolver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate one descriptor against one value
    pub fn evaluate(&self, descriptor: &ConstraintDescriptor, value: &Value) -> EvaluationResult {
        match descriptor {
            ConstraintDescriptor::ExpressionForClass(d) => {
                constraint::expression::evaluate(&self.resolver, d, value)
            }
            ConstraintDescriptor::NotNullSize(d) => constraint::size::evaluate_descriptor(d, value),
            ConstraintDescriptor::NotNullDecimalMin(d) => {
                constraint::decimal::evaluate_descriptor(d, value)
            }
            ConstraintDescriptor::Uri(d) => constraint::uri::evaluate(d, value),
        }
    }

    /// Evaluate a declaration against the field it targets
    pub fn evaluate_decl(&self, decl: &ConstraintDecl, bean: &Value) -> EvaluationResult {
        let value = match &decl.field {
            Some(path) => lookup_path(bean, path).unwrap_or(&NULL),
            None => bean,
        };
        let outcome = self.evaluate(&decl.descriptor, value);
        trace!("{} -> {}", decl, outcome);
        outcome
    }

    /// Whether the configuration leaves a declaration enabled
    pub fn is_enabled(&self, decl: &ConstraintDecl) -> bool {
        match &decl.id {
            Some(id) => self.config.is_constraint_enabled(id),
            None => true,
        }
    }

    /// Outcome of every enabled declaration, in order. Nothing short-circuits.
    pub fn evaluate_all<'d>(
        &self,
        decls: &'d [ConstraintDecl],
        bean: &Value,
    ) -> Vec<(&'d ConstraintDecl, EvaluationResult)> {
        decls
            .iter()
            .filter(|decl| self.is_enabled(decl))
            .map(|decl| (decl, self.evaluate_decl(decl, bean)))
            .collect()
    }

    /// Validate one bean; the declarations combine with logical AND
    pub fn validate(&self, decls: &[ConstraintDecl], bean: &Value) -> ValidationReport {
        self.validate_sourced(decls, None, bean)
    }

    fn validate_sourced(
        &self,
        decls: &[ConstraintDecl],
        source: Option<&str>,
        bean: &Value,
    ) -> ValidationReport {
        let start = Instant::now();
        let outcomes = self.evaluate_all(decls, bean);
        let skipped = decls.len() - outcomes.len();

        let mut report = ValidationReport::from_outcomes(source, outcomes);
        report.constraints_skipped = skipped;
        report.duration = start.elapsed();
        report
    }

    /// Validate many beans, in parallel unless the configuration says otherwise
    pub fn validate_batch(&self, decls: &[ConstraintDecl], beans: &[SourcedBean]) -> ValidationReport {
        let start = Instant::now();
        let validate_one =
            |bean: &SourcedBean| self.validate_sourced(decls, Some(&bean.source), &bean.value);

        let reports: Vec<ValidationReport> = match self.thread_pool() {
            Some(pool) => pool.install(|| beans.par_iter().map(validate_one).collect()),
            None => beans.iter().map(validate_one).collect(),
        };

        let mut combined = ValidationReport::default();
        for report in reports {
            combined.merge(report);
        }

        combined.duration = start.elapsed();
        debug!(
            "Validated {} beans against {} declarations in {:?}",
            combined.beans_checked,
            decls.len(),
            combined.duration
        );
        combined
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        if !self.config.engine.parallel {
            return None;
        }

        let jobs = if self.config.engine.jobs > 0 {
            self.config.engine.jobs
        } else {
            num_cpus::get()
        };
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Falling back to sequential validation: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::descriptor::{ExpressionForClass, NotNullDecimalMin, NotNullSize, UriConstraint};
    use crate::outcome::ConstraintFault;
    use serde_json::json;
    use std::thread;

    fn order_decls() -> Vec<ConstraintDecl> {
        vec![
            ConstraintDecl::new(ExpressionForClass::new("${bean.start < bean.end}"))
                .with_id("period-ordered"),
            ConstraintDecl::new(NotNullSize::new(1, 8)).on_field("name"),
            ConstraintDecl::new(NotNullDecimalMin::new("0").exclusive()).on_field("price.amount"),
            ConstraintDecl::new(UriConstraint::new().with_scheme(Some("https"))).on_field("homepage"),
        ]
    }

    #[test]
    fn test_dispatch() {
        let validator = Validator::default();
        let cases = [
            (ConstraintDescriptor::from(NotNullSize::new(1, 2)), json!("ab"), true),
            (ConstraintDescriptor::from(NotNullDecimalMin::new("1")), json!(0.5), false),
            (ConstraintDescriptor::from(UriConstraint::new()), Value::Null, true),
            (
                ConstraintDescriptor::from(ExpressionForClass::new("${bean > 1}")),
                json!(2),
                true,
            ),
        ];
        for (descriptor, value, valid) in cases {
            assert_eq!(
                validator.evaluate(&descriptor, &value),
                EvaluationResult::from_bool(valid),
                "{:?}",
                descriptor
            );
        }
    }

    #[test]
    fn test_valid_bean() {
        let bean = json!({
            "start": 1,
            "end": 2,
            "name": "widget",
            "price": {"amount": "9.99"},
            "homepage": "https://example.com"
        });
        let report = Validator::default().validate(&order_decls(), &bean);
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.constraints_evaluated, 4);
    }

    #[test]
    fn test_every_failure_is_reported() {
        let bean = json!({
            "start": 5,
            "end": 2,
            "name": "",
            "homepage": "ftp://example.com"
        });
        let report = Validator::default().validate(&order_decls(), &bean);

        let failed: Vec<&str> = report.violations.iter().map(|v| v.constraint.as_str()).collect();
        assert_eq!(
            failed,
            vec![
                "period-ordered",
                "not-null-size@name",
                "not-null-decimal-min@price.amount",
                "uri@homepage",
            ]
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_faults_do_not_stop_siblings() {
        let decls = vec![
            ConstraintDecl::new(ExpressionForClass::new("${true}").with_language("cobol-script")),
            ConstraintDecl::new(NotNullSize::new(5, 1)).on_field("name"),
            ConstraintDecl::new(NotNullSize::min(1)).on_field("name"),
        ];
        let report = Validator::default().validate(&decls, &json!({"name": ""}));

        assert_eq!(report.faults.len(), 2);
        assert_eq!(
            report.faults[0].reason,
            ConstraintFault::UnknownLanguage("cobol-script".to_string())
        );
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_disabled_declarations_are_skipped() {
        let mut config = Config::default();
        config.constraints.disabled.push("period-ordered".to_string());
        let validator = Validator::new(config);

        let report = validator.validate(&order_decls(), &json!({"start": 5, "end": 2}));
        assert_eq!(report.constraints_skipped, 1);
        assert!(report.violations.iter().all(|v| v.constraint != "period-ordered"));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let beans: Vec<SourcedBean> = (0..50)
            .map(|i| {
                SourcedBean::new(
                    format!("bean-{i}"),
                    json!({"start": i % 7, "end": 3, "name": "n", "price": {"amount": i}}),
                )
            })
            .collect();

        let parallel = Validator::default().validate_batch(&order_decls(), &beans);
        let sequential = Validator::new(Config {
            engine: EngineConfig {
                parallel: false,
                jobs: 0,
            },
            ..Config::default()
        })
        .validate_batch(&order_decls(), &beans);

        assert_eq!(parallel.beans_checked, 50);
        assert_eq!(parallel.violations, sequential.violations);
        assert_eq!(parallel.faults, sequential.faults);
        assert_eq!(parallel.beans_with_violations, sequential.beans_with_violations);
    }

    #[test]
    fn test_concurrent_evaluation_is_identical() {
        let validator = Arc::new(Validator::default());
        let descriptor = Arc::new(ConstraintDescriptor::from(ExpressionForClass::new(
            "${bean.start < bean.end}",
        )));
        let bean = Arc::new(json!({"start": 1, "end": 2}));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let validator = Arc::clone(&validator);
                let descriptor = Arc::clone(&descriptor);
                let bean = Arc::clone(&bean);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| validator.evaluate(&descriptor, &bean))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let results = handle.join().unwrap();
            assert!(results.iter().all(|r| *r == EvaluationResult::Valid));
        }
    }
}

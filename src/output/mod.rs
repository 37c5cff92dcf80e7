//! Output formatters for validation reports

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::report::ValidationReport;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire report
    fn format(&self, report: &ValidationReport) -> String;
}

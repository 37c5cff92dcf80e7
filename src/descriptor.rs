//! Constraint descriptors and declaration files

use crate::constraint::{decimal, uri};
use crate::expression::UNIFIED_EXPRESSION_LANGUAGE;
use crate::outcome::ConstraintFault;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Default name the bean is bound under in expressions
pub const DEFAULT_BEAN_ALIAS: &str = "bean";

/// Class-level expression over the whole bean
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionForClass {
    /// Expression text, evaluated with the bean bound under `bean_alias`
    pub expression: String,

    /// Language the expression is written in
    #[serde(default = "default_language")]
    pub language: String,

    /// Variable name the bean is exposed as
    #[serde(default = "default_bean_alias")]
    pub bean_alias: String,
}

impl ExpressionForClass {
    /// Unified-expression-language expression with the default alias
    pub fn new(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
            language: default_language(),
            bean_alias: default_bean_alias(),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_bean_alias(mut self, alias: &str) -> Self {
        self.bean_alias = alias.to_string();
        self
    }
}

/// Required value with an inclusive size range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotNullSize {
    #[serde(default)]
    pub min: usize,

    #[serde(default = "default_max")]
    pub max: usize,
}

impl Default for NotNullSize {
    fn default() -> Self {
        Self {
            min: 0,
            max: usize::MAX,
        }
    }
}

impl NotNullSize {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn min(min: usize) -> Self {
        Self {
            min,
            ..Self::default()
        }
    }

    pub fn max(max: usize) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }
}

/// Required decimal with a lower bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotNullDecimalMin {
    /// Decimal literal of the bound
    pub value: String,

    /// `true` requires `>= value`, `false` requires `> value`
    #[serde(default = "default_true")]
    pub inclusive: bool,
}

impl NotNullDecimalMin {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            inclusive: true,
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }
}

/// URI shape restrictions.
///
/// Empty allow-lists allow everything including absence. A `None` entry in a
/// non-empty list is what permits the part to be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UriConstraint {
    pub schemes: Vec<Option<String>>,
    pub ssp: Vec<Option<String>>,
    pub port: Vec<Option<u16>>,
    pub requires_path: bool,
    pub requires_query: bool,
    pub requires_fragment: bool,
    pub requires_user_info: bool,
}

impl UriConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a scheme; `None` allows URIs without one
    pub fn with_scheme(mut self, scheme: Option<&str>) -> Self {
        self.schemes.push(scheme.map(String::from));
        self
    }

    /// Allow a scheme-specific part; `None` allows URIs without one
    pub fn with_ssp(mut self, ssp: Option<&str>) -> Self {
        self.ssp.push(ssp.map(String::from));
        self
    }

    /// Allow a port; `None` allows URIs without one
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port.push(port);
        self
    }

    pub fn requires_path(mut self) -> Self {
        self.requires_path = true;
        self
    }

    pub fn requires_query(mut self) -> Self {
        self.requires_query = true;
        self
    }

    pub fn requires_fragment(mut self) -> Self {
        self.requires_fragment = true;
        self
    }

    pub fn requires_user_info(mut self) -> Self {
        self.requires_user_info = true;
        self
    }
}

fn default_language() -> String {
    UNIFIED_EXPRESSION_LANGUAGE.to_string()
}

fn default_bean_alias() -> String {
    DEFAULT_BEAN_ALIAS.to_string()
}

fn default_max() -> usize {
    usize::MAX
}

fn default_true() -> bool {
    true
}

/// One declared constraint. Immutable once built; evaluators only borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConstraintDescriptor {
    ExpressionForClass(ExpressionForClass),
    NotNullSize(NotNullSize),
    NotNullDecimalMin(NotNullDecimalMin),
    Uri(UriConstraint),
}

impl ConstraintDescriptor {
    /// Kind name as written in declaration files
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstraintDescriptor::ExpressionForClass(_) => "expression-for-class",
            ConstraintDescriptor::NotNullSize(_) => "not-null-size",
            ConstraintDescriptor::NotNullDecimalMin(_) => "not-null-decimal-min",
            ConstraintDescriptor::Uri(_) => "uri",
        }
    }

    /// What a satisfying value looks like, used in reports
    pub fn requirement(&self) -> String {
        match self {
            ConstraintDescriptor::ExpressionForClass(d) => {
                format!("expression `{}` must hold", d.expression)
            }
            ConstraintDescriptor::NotNullSize(d) if d.max == usize::MAX => {
                format!("must not be null and have a size of at least {}", d.min)
            }
            ConstraintDescriptor::NotNullSize(d) => format!(
                "must not be null and have a size between {} and {}",
                d.min, d.max
            ),
            ConstraintDescriptor::NotNullDecimalMin(d) if d.inclusive => format!(
                "must not be null and be greater than or equal to {}",
                d.value
            ),
            ConstraintDescriptor::NotNullDecimalMin(d) => {
                format!("must not be null and be greater than {}", d.value)
            }
            ConstraintDescriptor::Uri(_) => "must be a URI matching the declared restrictions".to_string(),
        }
    }

    /// Construction-time checks.
    ///
    /// Language resolution is not checked here since it depends on the
    /// resolver in use.
    pub fn validate(&self) -> Result<(), ConstraintFault> {
        match self {
            ConstraintDescriptor::ExpressionForClass(d) => {
                if d.language.trim().is_empty() {
                    return Err(ConstraintFault::EmptyLanguage);
                }
                if d.bean_alias.trim().is_empty() {
                    return Err(ConstraintFault::EmptyBeanAlias);
                }
                Ok(())
            }
            ConstraintDescriptor::NotNullSize(d) => {
                if d.min > d.max {
                    return Err(ConstraintFault::InvertedBounds {
                        min: d.min,
                        max: d.max,
                    });
                }
                Ok(())
            }
            ConstraintDescriptor::NotNullDecimalMin(d) => decimal::parse_bound(&d.value).map(|_| ()),
            ConstraintDescriptor::Uri(d) => uri::validate_allow_lists(d),
        }
    }
}

impl From<ExpressionForClass> for ConstraintDescriptor {
    fn from(d: ExpressionForClass) -> Self {
        ConstraintDescriptor::ExpressionForClass(d)
    }
}

impl From<NotNullSize> for ConstraintDescriptor {
    fn from(d: NotNullSize) -> Self {
        ConstraintDescriptor::NotNullSize(d)
    }
}

impl From<NotNullDecimalMin> for ConstraintDescriptor {
    fn from(d: NotNullDecimalMin) -> Self {
        ConstraintDescriptor::NotNullDecimalMin(d)
    }
}

impl From<UriConstraint> for ConstraintDescriptor {
    fn from(d: UriConstraint) -> Self {
        ConstraintDescriptor::Uri(d)
    }
}

/// A descriptor attached to a site of a bean
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDecl {
    /// Identifier used in reports and for disabling
    #[serde(default)]
    pub id: Option<String>,

    /// Dotted property path; `None` targets the whole bean
    #[serde(default)]
    pub field: Option<String>,

    #[serde(flatten)]
    pub descriptor: ConstraintDescriptor,
}

impl ConstraintDecl {
    /// Declaration on the whole bean
    pub fn new(descriptor: impl Into<ConstraintDescriptor>) -> Self {
        Self {
            id: None,
            field: None,
            descriptor: descriptor.into(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn on_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    /// Label for reports: the id, else `kind@field`
    pub fn label(&self) -> String {
        match (&self.id, &self.field) {
            (Some(id), _) => id.clone(),
            (None, Some(field)) => format!("{}@{}", self.descriptor.kind_name(), field),
            (None, None) => self.descriptor.kind_name().to_string(),
        }
    }
}

impl fmt::Display for ConstraintDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Error loading a declaration file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown declaration file format: {0}")]
    UnknownFormat(String),
}

/// Declaration file format (YAML or JSON)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintFile {
    /// File format version
    #[serde(default)]
    pub version: Option<String>,

    /// Declarations in file order
    #[serde(default)]
    pub constraints: Vec<ConstraintDecl>,
}

impl ConstraintFile {
    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::load_with_defaults(path, UNIFIED_EXPRESSION_LANGUAGE, DEFAULT_BEAN_ALIAS)
    }

    /// Load, filling in the language and bean alias of expression
    /// declarations that leave them out
    pub fn load_with_defaults(
        path: &Path,
        language: &str,
        bean_alias: &str,
    ) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut raw: serde_json::Value = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => return Err(LoadError::UnknownFormat(ext.to_string())),
        };
        fill_expression_defaults(&mut raw, language, bean_alias);
        Ok(serde_json::from_value(raw)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Construction-time faults of every declaration, in file order
    pub fn faults(&self) -> Vec<(String, ConstraintFault)> {
        self.constraints
            .iter()
            .filter_map(|decl| decl.descriptor.validate().err().map(|f| (decl.label(), f)))
            .collect()
    }
}

fn fill_expression_defaults(raw: &mut serde_json::Value, language: &str, bean_alias: &str) {
    let Some(constraints) = raw
        .get_mut("constraints")
        .and_then(serde_json::Value::as_array_mut)
    else {
        return;
    };

    for decl in constraints.iter_mut().filter_map(serde_json::Value::as_object_mut) {
        if decl.get("kind").and_then(serde_json::Value::as_str) != Some("expression-for-class") {
            continue;
        }
        decl.entry("language").or_insert_with(|| language.into());
        decl.entry("bean_alias").or_insert_with(|| bean_alias.into());
    }
}

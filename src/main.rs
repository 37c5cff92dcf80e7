//! beanrule CLI - validate JSON/YAML data against constraint declarations

use anyhow::{bail, Context};
use beanrule::config::{ColorMode, Config, ConfigError, OutputFormat};
use beanrule::output::{JsonFormatter, OutputFormatter, TextFormatter};
use beanrule::{ConstraintFile, SourcedBean, Validator};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use log::{debug, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "beanrule",
    version,
    about = "Constraint validator for structured data",
    long_about = "Validates JSON/YAML beans against expression, size, decimal and URI constraints."
)]
struct Cli {
    /// Value files or glob patterns to validate
    values: Vec<String>,

    /// Constraint declaration file (YAML or JSON)
    #[arg(short, long, required_unless_present = "list_languages")]
    rules: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable declarations by id (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// List registered expression languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Treat each value file as an array of beans
    #[arg(long)]
    each: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // `output.verbose` in a config file raises the log level like `-v`
    let loaded = load_config(&cli);
    let verbose = cli.verbose || matches!(&loaded, Ok((config, _)) if config.output.verbose);
    let filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = loaded.and_then(|(config, ignored)| {
        if let Some(e) = ignored {
            warn!("Ignoring configuration: {}", e);
        }
        run(cli, config)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(2);
        }
    }
}

/// Configuration from `--config`, or default discovery. A broken discovered
/// file is handed back so it can be reported once logging is up.
fn load_config(cli: &Cli) -> anyhow::Result<(Config, Option<ConfigError>)> {
    match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            Ok((config, None))
        }
        None => Ok(match Config::load_default() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }),
    }
}

fn run(cli: Cli, mut config: Config) -> anyhow::Result<i32> {
    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
    );

    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always if !cli.no_color => colored::control::set_override(true),
        _ => {}
    }

    let validator = Validator::new(config.clone());

    if cli.list_languages {
        let resolver = validator.resolver();
        for language in resolver.languages() {
            println!(
                "{:<30} {}",
                language.cyan(),
                resolver.description(language).unwrap_or_default()
            );
        }
        return Ok(0);
    }

    let Some(rules) = &cli.rules else {
        bail!("No declaration file given (use --rules)");
    };
    let declarations = ConstraintFile::load_with_defaults(
        rules,
        &config.expression.default_language,
        &config.expression.default_bean_alias,
    )
    .with_context(|| format!("Failed to load declarations from {}", rules.display()))?;

    for (label, fault) in declarations.faults() {
        warn!("Declaration '{}' is misconfigured: {}", label, fault);
    }

    let files = expand_patterns(&cli.values)?;
    if files.is_empty() {
        bail!("No value files found to validate");
    }

    let mut beans = Vec::new();
    for file in &files {
        beans.extend(load_beans(file, cli.each)?);
    }
    debug!(
        "Loaded {} beans from {} files",
        beans.len(),
        files.len()
    );

    let report = validator.validate_batch(&declarations.constraints, &beans);

    let formatter: Box<dyn OutputFormatter> = match config.output.format {
        OutputFormat::Text => {
            let mut f = TextFormatter::new();
            if cli.no_color || config.output.color == ColorMode::Never {
                f = f.without_color();
            }
            Box::new(f)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    };
    print!("{}", formatter.format(&report));

    Ok(report.exit_code())
}

/// Expand glob patterns to existing files
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        files.extend(paths.flatten().filter(|p| p.is_file()));
    }
    Ok(files)
}

fn load_value(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let value: Value = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        _ => bail!("Unknown value file format: {}", path.display()),
    };
    Ok(value)
}

fn load_beans(path: &Path, each: bool) -> anyhow::Result<Vec<SourcedBean>> {
    let value = load_value(path)?;
    let source = path.display().to_string();

    if !each {
        return Ok(vec![SourcedBean::new(source, value)]);
    }

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| SourcedBean::new(format!("{}[{}]", source, i), item))
            .collect()),
        _ => bail!("{} does not hold an array of beans", source),
    }
}

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, OutputFormat};
use crate::dsl::{CompileError, Expr, Schema, SchemaRegistry, compile};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Filter queries to compile
    pub queries: Vec<String>,

    /// Schema to compile against (tracking, user, or one from the config)
    #[arg(short, long, env = "FILTERC_SCHEMA")]
    pub schema: Option<String>,

    /// File with one query per line ("-" for stdin)
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (default: from config, else json)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Print the fields of the selected schema and exit
    #[arg(long)]
    pub list_fields: bool,

    /// Number of threads for batch compilation (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// A query together with where it came from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryInput {
    pub label: String,
    pub text: String,
}

/// `None` is an empty filter, which matches everything.
pub type Compiled = Option<Expr>;

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Config: Failed to load {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_schema<'a>(
    cli: &Cli,
    config: &AppConfig,
    registry: &'a SchemaRegistry,
) -> Result<&'a Schema> {
    let name = cli.schema.as_deref().unwrap_or_else(|| config.schema_name());
    registry.get(name).ok_or_else(|| {
        let known: Vec<&str> = registry.names().collect();
        anyhow!(
            "CLI: Unknown schema '{}' (known: {})",
            name,
            known.join(", ")
        )
    })
}

/// Positional queries first, then batch lines. Blank batch lines are skipped.
pub fn collect_inputs(cli: &Cli) -> Result<Vec<QueryInput>> {
    let mut inputs: Vec<QueryInput> = cli
        .queries
        .iter()
        .enumerate()
        .map(|(i, text)| QueryInput {
            label: format!("query {}", i + 1),
            text: text.clone(),
        })
        .collect();

    if let Some(path) = &cli.batch {
        let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
            Box::new(std::io::stdin().lock())
        } else {
            let file = std::fs::File::open(path)
                .with_context(|| format!("CLI: Failed to open batch file {}", path.display()))?;
            Box::new(std::io::BufReader::new(file))
        };

        for (i, line) in reader.lines().enumerate() {
            let line = line.context("CLI: Failed to read batch file")?;
            if line.trim().is_empty() {
                continue;
            }
            inputs.push(QueryInput {
                label: format!("{}:{}", path.display(), i + 1),
                text: line,
            });
        }
    }

    Ok(inputs)
}

pub fn compile_input(text: &str, schema: &Schema) -> Result<Compiled, CompileError> {
    if text.is_empty() {
        return Ok(None);
    }
    compile(text, schema).map(Some)
}

/// Compile every input in parallel, keeping input order.
pub fn compile_all(inputs: &[QueryInput], schema: &Schema) -> Vec<Result<Compiled, CompileError>> {
    inputs
        .par_iter()
        .map(|input| compile_input(&input.text, schema))
        .collect()
}

pub fn render(compiled: &Compiled, format: OutputFormat, pretty: bool) -> Result<String> {
    let document = compiled
        .as_ref()
        .map(Expr::to_document)
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

    let text = match format {
        OutputFormat::Json if pretty => serde_json::to_string_pretty(&document)?,
        OutputFormat::Json => serde_json::to_string(&document)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(&document)?.trim_end()),
        OutputFormat::Query => compiled
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
    };
    Ok(text)
}

pub fn list_fields(schema: &Schema, out: &mut impl Write) -> Result<()> {
    for (field, coercer) in schema.fields() {
        writeln!(out, "{}\t{}", field, coercer)?;
    }
    Ok(())
}

/// Compile and print everything the CLI was given. Returns the number of
/// queries that failed to compile.
pub fn run(cli: &Cli, config: &AppConfig, out: &mut impl Write) -> Result<usize> {
    let registry = config.registry();
    let schema = resolve_schema(cli, config, &registry)?;
    tracing::info!("Schema: {} ({} fields)", schema.name(), schema.fields().count());

    if cli.list_fields {
        list_fields(schema, out)?;
        return Ok(0);
    }

    let inputs = collect_inputs(cli)?;
    if inputs.is_empty() {
        anyhow::bail!("CLI: No queries given; pass QUERY arguments or --batch");
    }

    let format = cli.format.or(config.format).unwrap_or_default();
    let start = std::time::Instant::now();
    let results = compile_all(&inputs, schema);

    let mut failures = 0;
    for (input, result) in inputs.iter().zip(&results) {
        match result {
            Ok(compiled) => {
                if let Some(expr) = compiled {
                    tracing::debug!("{}: {} comparisons", input.label, expr.comparisons());
                }
                writeln!(out, "{}", render(compiled, format, config.pretty)?)?;
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}: {} [{}] ({})", input.label, err, err.code(), input.text);
            }
        }
    }

    tracing::info!(
        "Compiled {} queries in {:.2}ms ({} failed)",
        inputs.len(),
        start.elapsed().as_secs_f64() * 1000.0,
        failures
    );

    Ok(failures)
}

pub mod cli;
pub mod config;
pub mod database;
pub mod failure;
pub mod hint;
pub mod hints;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod table;
pub mod temporal;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, error, info};
use serde_json::json;

use crate::{
    cli::{Cli, Commands, PlanFormat},
    config::LoaderConfig,
    database::MySqlDatabase,
    hints::{FixedHintSource, HintSource, OllamaHintSource},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv2db", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Plan(args) => handle_plan(&args),
        Commands::Resolve(args) => handle_resolve(&args),
    }
}

fn hint_source(hints: Option<&Path>, config: &LoaderConfig) -> Result<Box<dyn HintSource>> {
    match hints {
        Some(path) => {
            info!("Using fixed hints from {path:?}");
            Ok(Box::new(FixedHintSource::load(path)?))
        }
        None => {
            info!(
                "Requesting hints from model '{}' at {}",
                config.generator.model, config.generator.endpoint
            );
            Ok(Box::new(OllamaHintSource::new(&config.generator)))
        }
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let mut config = LoaderConfig::load_or_default(args.config.as_deref())?;
    if let Some(host) = &args.host {
        config.database.host = host.clone();
    }
    if let Some(port) = args.port {
        config.database.port = port;
    }
    if let Some(user) = &args.user {
        config.database.user = user.clone();
    }
    if let Some(database) = &args.database {
        config.database.database = Some(database.clone());
    }
    if args.local_infile {
        config.load.local_infile = true;
    }
    if let Some(max_repairs) = args.max_repairs {
        config.load.max_repairs = max_repairs;
    }
    if let Some(delimiter) = args.delimiter {
        config.load.delimiter = delimiter;
    }
    config.apply_env();
    config.validate()?;

    let encoding = source::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = match &config.database.database {
        Some(name) => name.clone(),
        None => database_name_for(&args.dir)?,
    };
    let mut hints = hint_source(args.hints.as_deref(), &config)?;

    let summary = {
        let infile_root = config.load.local_infile.then_some(args.dir.as_path());
        let mut db = MySqlDatabase::connect(&config.database, &schema, infile_root)
            .with_context(|| format!("Connecting to database '{schema}'"))?;
        pipeline::run_directory(&args.dir, &config, hints.as_mut(), &mut db, encoding)?
    };

    for report in &summary.loaded {
        info!(
            "✓ {} ({} row(s), {} repair(s))",
            report.table,
            report
                .rows
                .map(|rows| rows.to_string())
                .unwrap_or_else(|| "?".to_string()),
            report.repairs.len()
        );
    }
    for (path, reason) in &summary.failed {
        error!("✗ {:?}: {reason}", path);
    }
    if !summary.is_success() {
        bail!(
            "{} of {} file(s) failed to load",
            summary.failed.len(),
            summary.failed.len() + summary.loaded.len()
        );
    }
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let mut config = LoaderConfig::load_or_default(args.config.as_deref())?;
    if let Some(delimiter) = args.delimiter {
        config.load.delimiter = delimiter;
    }
    config.validate()?;
    let encoding = source::resolve_encoding(args.input_encoding.as_deref())?;
    let mut hints = hint_source(args.hints.as_deref(), &config)?;
    let plan = pipeline::plan_table(&args.input, hints.as_mut(), &config, encoding)
        .with_context(|| format!("Planning table for {:?}", args.input))?;

    let create_sql = plan.definition.create_sql();
    let load_sql = plan.definition.load_sql(&args.input, &config.load);
    match args.format {
        PlanFormat::Table => {
            print!("{}", table::render_plan(&plan.definition, &plan.hints));
            println!();
            println!("{create_sql};");
            println!("{load_sql};");
        }
        PlanFormat::Json => {
            let document = json!({
                "definition": plan.definition,
                "hints": plan.hints,
                "rows_sampled": plan.sample.rows_sampled,
                "create_sql": create_sql,
                "load_sql": load_sql,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&document).context("Serializing plan")?
            );
        }
    }
    Ok(())
}

fn handle_resolve(args: &cli::ResolveArgs) -> Result<()> {
    let resolved = hint::resolve(&args.hint);
    match &resolved {
        Ok(resolved) => println!("{resolved}"),
        Err(err) => println!("unresolvable: {err}"),
    }
    let column = schema::plan_column(0, "column", resolved);
    println!("column type: {}", column.column_type);
    Ok(())
}

fn database_name_for(dir: &Path) -> Result<String> {
    let absolute = dir
        .canonicalize()
        .with_context(|| format!("Resolving input directory {dir:?}"))?;
    absolute
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| anyhow!("Cannot derive a database name from {dir:?}"))
}

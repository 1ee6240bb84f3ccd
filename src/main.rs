mod cliarguments;

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::*;

use cliarguments::{CLIArguments, CLICommand, Output};
use jvmut::{
    catalog::{CatalogBuilder, SignatureCatalog},
    classunit::ClassUnit,
    config::Config,
    defaults,
    mutation::MutationEngine,
    operator::OperatorRegistry,
    output,
    policy::MutationPolicy,
    reporter::{cli::CLIReporter, json::JSONReporter},
    templates,
};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Load the configuration from `path`, or from `jvmut.toml` in the
/// current directory, or fall back to the defaults.
fn load_config(path: Option<&str>) -> Result<Config> {
    if let Some(path) = path {
        log::info!("Loading configuration from {path}");
        return Config::parse_file(path)
            .with_context(|| format!("Could not load configuration from {path}"));
    }

    if Path::new(defaults::CONFIG_FILE).is_file() {
        log::info!("Loading configuration from {}", defaults::CONFIG_FILE);
        return Config::parse_file(defaults::CONFIG_FILE)
            .with_context(|| format!("Could not load {}", defaults::CONFIG_FILE));
    }

    log::info!("Using default configuration");
    Ok(Config::default())
}

fn load_units(paths: &[String]) -> Result<Vec<ClassUnit>> {
    paths
        .iter()
        .map(|path| {
            ClassUnit::from_file(path).with_context(|| format!("Could not load class unit {path}"))
        })
        .collect()
}

fn list_operators(config: &Config) -> Result<()> {
    let registry = OperatorRegistry::new(&config.operators.enabled)
        .context("Invalid operator configuration")?;

    for name in OperatorRegistry::all_operator_names() {
        let state = if registry.is_enabled(&name) {
            "enabled".green()
        } else {
            "disabled".red()
        };
        output::output_string(format!("{name:30} {state}\n"));
    }

    Ok(())
}

fn build_catalog(config: &Config, output: Option<String>, unit_paths: &[String]) -> Result<()> {
    let path = output
        .or_else(|| config.catalog.path.clone())
        .unwrap_or_else(|| defaults::CATALOG_FILE.into());

    let generation = if Path::new(&path).exists() {
        SignatureCatalog::load_or_empty(&path).generation() + 1
    } else {
        0
    };

    let policy = MutationPolicy::from_config(config)?;
    let mut builder = CatalogBuilder::new(generation);
    for unit in load_units(unit_paths)? {
        builder.scan_filtered(&unit, &policy);
    }

    builder
        .build()
        .save(&path)
        .with_context(|| format!("Could not write signature catalog to {path}"))?;
    log::info!("Wrote signature catalog to {path}");
    Ok(())
}

fn list_mutants(config: &Config, report: Output, unit_paths: &[String]) -> Result<()> {
    let units = load_units(unit_paths)?;
    let engine = MutationEngine::new(config)?;
    let sites = engine.discover_mutations(&units)?;

    match report {
        Output::Console => CLIReporter::new(&config.report)?.report(&sites)?,
        Output::Json => JSONReporter::new(&config.report, unit_paths)?.report(&sites)?,
    }

    Ok(())
}

fn mutate(config: &Config, index: usize, output: Option<String>, unit_path: &str) -> Result<()> {
    let unit = ClassUnit::from_file(unit_path)
        .with_context(|| format!("Could not load class unit {unit_path}"))?;
    let engine = MutationEngine::new(config)?;

    let (site, mutant) = engine
        .mutate_nth(std::slice::from_ref(&unit), index)
        .with_context(|| format!("Could not produce mutant #{index}"))?;
    log::info!("Applied {}: {}", site.id, site.description);

    match output {
        Some(path) => {
            mutant.save(&path)?;
            log::info!("Wrote mutant to {path}");
        }
        None => output::output_string(mutant.to_json()?),
    }

    Ok(())
}

fn new_config(path: Option<String>) -> Result<()> {
    let path = path.unwrap_or_else(|| defaults::CONFIG_FILE.into());

    if Path::new(&path).exists() {
        bail!("{path} already exists");
    }

    std::fs::write(&path, templates::DEFAULT_CONFIG)
        .with_context(|| format!("Could not write {path}"))?;
    log::info!("Created new configuration file {path}");
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let cli = CLIArguments::parse_args();

    match cli.command {
        CLICommand::ListOperators { config } => {
            let config = load_config(config.as_deref())?;
            list_operators(&config)?;
        }
        CLICommand::BuildCatalog {
            config,
            output,
            units,
        } => {
            let config = load_config(config.as_deref())?;
            build_catalog(&config, output, &units)?;
        }
        CLICommand::ListMutants {
            config,
            report,
            units,
        } => {
            let config = load_config(config.as_deref())?;
            list_mutants(&config, report, &units)?;
        }
        CLICommand::Mutate {
            config,
            index,
            output,
            unit,
        } => {
            let config = load_config(config.as_deref())?;
            mutate(&config, index, output, &unit)?;
        }
        CLICommand::NewConfig { path } => {
            new_config(path)?;
        }
    }

    Ok(())
}

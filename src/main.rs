use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ratepolicy::config::{AppConfig, LogFormat, LoggingConfig};
use ratepolicy::Policies;

/// Validate rate limit policies and resolve requests against them.
#[derive(Parser, Debug)]
#[command(name = "ratepolicy", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a policy document and list its rules in priority order
    Check {
        /// Policy document (YAML, JSON for .json, INI for .ini)
        file: Option<PathBuf>,
    },

    /// Print the rule that governs a request
    Resolve {
        /// Policy document (YAML, JSON for .json, INI for .ini)
        file: Option<PathBuf>,

        /// Domain to resolve in
        #[arg(short, long)]
        domain: Option<String>,

        /// Request attribute as field=value, repeatable
        #[arg(short = 'a', long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {:?}", raw))?;
    if field.is_empty() {
        return Err(format!("empty field name in {:?}", raw));
    }
    Ok((field.to_string(), value.to_string()))
}

fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::new("ratepolicy=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    init_tracing(cli.verbose, &config.logging);

    match cli.command {
        Commands::Check { file } => {
            let policies = load_policies(file, &config)?;
            for domain in policies.domains() {
                let Some(rules) = policies.get(domain) else {
                    continue;
                };
                println!("{} ({} rules)", domain, rules.len());
                for (index, rule) in rules.iter().enumerate() {
                    println!(
                        "  #{} {} -> {}/{}s actor={:?} {}",
                        index,
                        serde_json::to_string(rule.operation())?,
                        rule.credit_limit(),
                        rule.reset_seconds(),
                        rule.actor_field(),
                        rule.comment()
                    );
                }
            }
            info!("Policies are valid");
        }
        Commands::Resolve {
            file,
            domain,
            attributes,
        } => {
            let policies = load_policies(file, &config)?;
            let domain = domain.unwrap_or_else(|| config.policy.default_domain.clone());
            let rule = policies
                .resolve(&domain, &attributes)
                .with_context(|| format!("failed to resolve request in domain {:?}", domain))?;
            println!("{}", serde_json::to_string_pretty(&rule.summary())?);
        }
    }

    Ok(())
}

fn load_policies(file: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<Policies> {
    let path = file
        .or_else(|| config.policy.rules_path.clone())
        .context("no policy document given and policy.rules_path is not configured")?;
    Policies::from_file(&path).with_context(|| format!("invalid policy document {}", path.display()))
}

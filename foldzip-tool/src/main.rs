use clap::Parser;
use foldzip_lib::Config;
use std::{collections::HashMap, env, fs, path::Path};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod fs_utils;
mod naming;
mod packaging;
mod process;

use crate::fs_utils::encode_size;
use crate::process::archive_all_folders;

/// Exit code when the run completed but at least one folder failed.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Zip every subfolder of a directory into <folder>/<folder>.zip", long_about = None)]
pub struct Cli {
    /// Directory whose immediate subfolders get archived (default: ./)
    #[arg()]
    pub root: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Dry run (list what would be removed and archived)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Also remove .zip files in nested subdirectories before archiving
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub deep_clean: bool,

    /// Log every file added to an archive
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Step 1: Read environment
    let env_config = read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = merge_configs(env_config, file_config, cli_to_config(&cli));

    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    if merged.is_dry() {
        println!("--- DRY RUN ---");
        println!("{}", serde_yaml::to_string(&merged)?);
    }

    let root = Path::new(merged.root_or_default());
    let summary = archive_all_folders(root, &merged)?;

    for path in &summary.others {
        info!("Skipped {} (not a directory)", path.display());
    }
    info!(
        "Done: {} folders, {} archived, {} failed",
        summary.folders.len(),
        encode_size(summary.total_bytes()),
        summary.failed()
    );

    if !summary.is_clean() {
        warn!("Some folders were not archived, see errors above");
        std::process::exit(EXIT_PARTIAL_FAILURE);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads environment variables prefixed with FOLDZIP_
fn read_env() -> Config {
    config_from_vars(&env::vars().collect())
}

fn config_from_vars(vars: &HashMap<String, String>) -> Config {
    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("FOLDZIP_{}", $key)).cloned()
        };
    }

    Config {
        root: get_env!("ROOT"),
        config: get_env!("CONFIG"),
        dry: get_env!("DRY").map(|v| parse_flag(&v)),
        deep_clean: get_env!("DEEP_CLEAN").map(|v| parse_flag(&v)),
    }
}

fn parse_flag(v: &str) -> bool {
    v == "true" || v == "1" || v.eq_ignore_ascii_case("yes")
}

/// Reads YAML or JSON config from file
fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path)?;
    let lower = path.to_lowercase();
    let cfg = if lower.ends_with(".json") {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

/// Converts CLI struct into Config
///
/// Flags that were not given stay `None` so they don't shadow env or file values.
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        root: cli.root.clone(),
        config: cli.config.clone(),
        dry: cli.dry.then_some(true),
        deep_clean: cli.deep_clean.then_some(true),
    }
}

/// Merge configs by priority: env < file < cli
fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T: Clone>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        root: pick(env.root, file.root, cli.root),
        config: pick(env.config, file.config, cli.config),
        dry: pick(env.dry, file.dry, cli.dry),
        deep_clean: pick(env.deep_clean, file.deep_clean, cli.deep_clean),
    }
}

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use scout_engine::config::EngineConfig;
use scout_engine::loader;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let season = flag_values(&args, "--season")
        .into_iter()
        .next()
        .context("usage: fetch_season --season S [--league FILE..]")?;
    let leagues = flag_values(&args, "--league");

    let config = EngineConfig::from_env();
    let load = loader::load_season(&config, &season, &leagues)?;

    println!("Season {} fetch complete", load.season);
    if let Some(dir) = config.cache_dir.as_ref() {
        println!("Cache: {}", dir.display());
    }
    println!("Files loaded: {}", load.loaded.len());
    for file in &load.loaded {
        println!(" + {file}");
    }
    println!("Rows: {}", load.dataset.len());
    println!("Numeric columns: {}", load.dataset.numeric_columns().len());
    if !load.errors.is_empty() {
        println!("Errors: {}", load.errors.len());
        for err in load.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn flag_values(args: &[String], flag: &str) -> Vec<String> {
    let mut out = Vec::new();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                out.push(next.trim().to_string());
            }
        }
    }
    out
}

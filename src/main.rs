mod app;
mod config;
mod dsl;

use anyhow::{Context, Result};
use clap::Parser;

use app::{Cli, load_config, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let config = load_config(cli.config.as_deref())?;

    let mut stdout = std::io::stdout().lock();
    let failures = run(&cli, &config, &mut stdout)?;
    if failures > 0 {
        anyhow::bail!("{} queries failed to compile", failures);
    }

    Ok(())
}

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use gopkg::cli::Cli;
use gopkg::{GoGetResolver, PackageResolver, ResolverConfig};

/// Resolver messages arrive through tracing's `log` bridge; RUST_LOG wins
/// over the warn default
fn setup_logging() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let resolver = GoGetResolver::new(ResolverConfig {
        timeout_ms: cli.timeout_ms,
        ..Default::default()
    })
    .context("Failed to create resolver")?;

    info!("gopkg resolving {} packages", cli.packages.len());

    let mut unresolved = 0;
    for package in &cli.packages {
        match resolver.resolve(package).await {
            Some(repo) if cli.quiet => println!("{}", repo),
            Some(repo) => println!("{} {} {}", package, "->".dimmed(), repo.green()),
            None => {
                unresolved += 1;
                if !cli.quiet {
                    println!("{} {} {}", package, "->".dimmed(), "unresolved".red());
                }
            }
        }
    }

    if unresolved > 0 {
        std::process::exit(1);
    }

    Ok(())
}

//! ghmonitor - GitHub repository activity monitor
//!
//! CLI entry point for polling watched repositories and inspecting setup.

use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};

use clap::{CommandFactory, Parser};
use eyre::{Context, Result};
use gopkg::{GoGetResolver, PackageResolver};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use ghmonitor::cli::{Cli, Command, OutputFormat};
use ghmonitor::config::{Config, LogConfig};
use ghmonitor::dispatcher::Dispatcher;
use ghmonitor::github::{Credentials, GithubClient, RepositoryApi};
use ghmonitor::monitor::build_monitors;
use ghmonitor::notification::{BackendRegistry, create_backend};

fn setup_logging(log: &LogConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::level_filters::LevelFilter::DEBUG
    } else {
        log.level_filter()?
    };

    // Log to stderr unless a log file is configured
    let writer = match &log.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(log.file.is_none())
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {}, verbose: {})", level, verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration, then let the environment override it
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env().context("Invalid environment override")?;

    setup_logging(&config.log, cli.verbose).context("Failed to setup logging")?;

    match cli.command {
        Some(Command::Run { once }) => cmd_run(&config, once).await,
        Some(Command::Resolve { packages }) => cmd_resolve(&config, &packages).await,
        Some(Command::Backends) => cmd_backends(&config),
        Some(Command::ShowConfig { format }) => cmd_show_config(&config, format),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Translate packages and print the result
async fn cmd_resolve(config: &Config, packages: &[String]) -> Result<()> {
    let resolver = GoGetResolver::new(config.resolver.to_resolver_config()).context("Failed to create resolver")?;

    for package in packages {
        match resolver.resolve(package).await {
            Some(repository) => println!("{} -> {}", package, repository),
            None => println!("{} -> (unresolved)", package),
        }
    }
    Ok(())
}

/// List registered backends, marking the configured one
fn cmd_backends(config: &Config) -> Result<()> {
    let registry = BackendRegistry::with_builtin();
    for name in registry.names() {
        let marker = if name == config.backend.name { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

fn cmd_show_config(config: &Config, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Build the monitors and run the poll loop
async fn cmd_run(config: &Config, once: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    // The credential is fixed for the life of the process
    let credentials = Credentials::from_env(&config.github.token_env);
    if !credentials.is_authenticated() {
        warn!(
            "No token in {}, using unauthenticated GitHub API access",
            config.github.token_env
        );
    }
    let api: Arc<dyn RepositoryApi> = Arc::new(
        GithubClient::from_config(&config.github, credentials).context("Failed to create GitHub client")?,
    );

    let backend = create_backend(&config.backend).context("Failed to create notification backend")?;

    let resolver = GoGetResolver::new(config.resolver.to_resolver_config()).context("Failed to create resolver")?;
    let monitors = build_monitors(
        &config.watch.packages,
        &config.watch.repositories,
        &resolver,
        api.as_ref(),
    )
    .await;
    if monitors.is_empty() {
        backend.close().await;
        return Err(eyre::eyre!(
            "None of the watched packages or repositories can be monitored"
        ));
    }
    info!("Monitoring {} repositories", monitors.len());

    let mut dispatcher = Dispatcher::new(config.dispatcher.clone(), monitors, api, backend.clone());

    if once {
        if config.dispatcher.baseline_first_poll {
            warn!("--once with baseline-first-poll enabled only records the baseline, no notifications will be sent");
        }
        dispatcher.run_cycle().await;
        backend.close().await;
        return Ok(());
    }

    // Create shutdown channel for the dispatcher
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_rx));
    info!("Dispatcher running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                warn!("SIGINT received");
            }
            _ = sigterm.recv() => {
                warn!("SIGTERM received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On non-Unix, just wait for Ctrl+C
        tokio::signal::ctrl_c().await?;
    }

    let _ = shutdown_tx.send(()).await;
    info!("Shutting down...");

    // Let the in-flight batch finish, then flush pending notifications
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "Dispatcher task failed");
    }
    backend.close().await;

    Ok(())
}

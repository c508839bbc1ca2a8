use std::{path::PathBuf, sync::Arc, time::Duration};

use analytics_server::{api, events, generator, Service};
use anyhow::Result;
use clap::{error::ErrorKind, Parser};
use component::{with_constructor, with_logger, with_reader, Factory, Lifecycle};
use tracing_subscriber::{prelude::*, EnvFilter};

const STOP_DEADLINE: Duration = Duration::from_secs(3);

#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Config file, TOML or JSON
    #[clap(long, env = "ANALYTICS_CONFIG", default_value = "app.toml")]
    config: PathBuf,

    /// Log filter directives
    #[clap(long, env = "ANALYTICS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Service to run, every service if omitted
    #[clap(long = "service", value_parser = [api::SERVICE, generator::SERVICE])]
    services: Vec<String>,
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => (),
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Err(e) if e.kind() == ErrorKind::DisplayVersion || e.kind() == ErrorKind::DisplayHelp => {
            print!("{}", e);
            return Ok(());
        }
        Err(e) => Err(e)?,
        Ok(cli) => cli,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .with(EnvFilter::try_new(&cli.log_level)?)
        .init();

    let root = config::load(&cli.config)?.into_shared();
    let logger = tracing::dispatcher::get_default(|dispatch| dispatch.clone());
    let constructors = analytics_server::services()?;
    let mut names = match cli.services.is_empty() {
        true => vec![api::SERVICE.to_string(), generator::SERVICE.to_string()],
        false => cli.services,
    };
    names.sort();
    names.dedup();

    let mut services: Vec<(String, Arc<dyn Service>)> = vec![];
    for name in names {
        let service = constructors.build(
            &name,
            vec![
                with_logger(logger.clone()),
                with_constructor(events::HANDLER, events::constructor()),
                with_reader(Arc::clone(&root)),
            ],
        )?;
        services.push((name, Arc::from(service)));
    }

    for (name, service) in services.iter() {
        let (name, service) = (name.clone(), Arc::clone(service));
        tokio::spawn(async move {
            match service.run().await {
                Ok(()) => tracing::info!(service = name.as_str(), "service finished"),
                Err(e) => tracing::error!(service = name.as_str(), error = %e, "service failed"),
            }
        });
    }

    shutdown_signal().await?;
    tracing::info!("shutting down");
    for (name, service) in services.iter() {
        if let Err(e) = service.stop(STOP_DEADLINE).await {
            tracing::error!(service = name.as_str(), error = %e, "failed to stop service");
        }
    }
    Ok(())
}

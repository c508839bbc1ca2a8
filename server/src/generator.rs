//! Synthetic load generator
//!
//! Posts one event every `1s / rps` to `addr` until stopped.
use std::time::Duration;

use chrono::Utc;
use component::{
    apply, AsFactory, Capabilities, Configurable, Constructor, Lifecycle, LogWriter, Logger,
    Reader, StdError,
};
use config::get;
use futures::future::BoxFuture;
use tokio::time::MissedTickBehavior;
use tracing::instrument::WithSubscriber;
use url::Url;

use crate::{events::ApiEvent, Handler, Service, Shutdown};

pub const SERVICE: &str = "generator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub rps: i64,
    pub addr: Url,
}

/// Highest rate with a non-zero delay between requests
pub const MAX_RPS: i64 = 1_000_000_000;

/// Upper bound for a single request, a hanging target must not stall the loop
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

impl GeneratorConfig {
    pub fn read(reader: &dyn Reader) -> Result<Self, StdError> {
        let addr: String = get(reader, "addr")?;
        let rps: i64 = get(reader, "rps")?;
        if rps > MAX_RPS {
            Err(format!("generator rps {rps}: at most {MAX_RPS} requests per second"))?
        }
        Ok(Self {
            rps,
            addr: Url::parse(&addr).map_err(|e| format!("generator addr {addr:?}: {e}"))?,
        })
    }

    /// Delay between requests, `None` if generator is disabled
    pub fn interval(&self) -> Option<Duration> {
        u64::try_from(self.rps)
            .ok()
            .filter(|rps| *rps > 0)
            .map(|rps| Duration::from_nanos(1_000_000_000 / rps))
            .filter(|interval| !interval.is_zero())
    }
}

pub struct Generator {
    config: Option<GeneratorConfig>,
    logger: Logger,
    shutdown: Shutdown,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: tracing::dispatcher::get_default(|dispatch| dispatch.clone()),
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> Option<&GeneratorConfig> {
        self.config.as_ref()
    }

    async fn send(client: &reqwest::Client, addr: &Url, seq: u64) {
        let event = ApiEvent {
            dt: Utc::now() - chrono::Duration::days(365),
            event: SERVICE.into(),
            user_id: seq.to_string(),
            screen: String::new(),
            elem: String::new(),
            amount: 0,
        };
        match client.post(addr.clone()).json(&event).send().await {
            Err(e) => tracing::error!(error = %e, "failed to send event"),
            Ok(response) if !response.status().is_success() => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status, body = body.as_str(), "event rejected");
            }
            Ok(_) => (),
        }
    }
}

impl Configurable for Generator {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError> {
        match config::sub(reader, SERVICE) {
            Ok(generator) => self.config = Some(GeneratorConfig::read(&*generator)?),
            Err(e) if e.is_not_found() => {
                tracing::warn!("generator config not found");
                self.config = None;
            }
            Err(e) => Err(e)?,
        }
        Ok(())
    }
}

impl LogWriter for Generator {
    fn set_logger(&mut self, logger: Logger) -> Result<(), StdError> {
        self.logger = logger;
        Ok(())
    }
}

impl Capabilities for Generator {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }

    fn as_log_writer(&mut self) -> Option<&mut dyn LogWriter> {
        Some(self)
    }
}

impl AsFactory<dyn Handler> for Generator {}

impl Lifecycle for Generator {
    fn run(&self) -> BoxFuture<'_, Result<(), StdError>> {
        let logger = self.logger.clone();
        Box::pin(
            async move {
                let Some((config, interval)) = self
                    .config
                    .as_ref()
                    .and_then(|config| Some((config, config.interval()?)))
                else {
                    tracing::warn!("generator disabled");
                    return Ok(());
                };
                let _running = self.shutdown.start()?;
                let requested = self.shutdown.requested();
                let client = reqwest::Client::builder()
                    .timeout(REQUEST_TIMEOUT)
                    .build()?;
                tracing::info!(addr = %config.addr, "sending event every {interval:?}");
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut sent = 0;
                loop {
                    tokio::select! {
                        _ = requested.cancelled() => break,
                        _ = ticker.tick() => tokio::select! {
                            _ = requested.cancelled() => break,
                            _ = Self::send(&client, &config.addr, sent) => sent += 1,
                        },
                    }
                }
                tracing::info!(sent, "generator stopped");
                Ok(())
            }
            .with_subscriber(logger),
        )
    }

    fn stop(&self, deadline: Duration) -> BoxFuture<'_, Result<(), StdError>> {
        Box::pin(self.shutdown.stop("generator", deadline))
    }
}

pub fn constructor() -> Constructor<dyn Service> {
    component::constructor(|opts| {
        let mut generator = Generator::new();
        apply::<dyn Service>(&mut generator, opts)?;
        Ok(Box::new(generator))
    })
}

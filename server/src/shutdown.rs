use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use component::StdError;
use tokio_util::sync::CancellationToken;

/// Stop request and completion of one service run
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: CancellationToken,
    finished: CancellationToken,
    started: AtomicBool,
}

/// Marks run as finished when dropped
#[derive(Debug)]
pub struct Running<'a>(&'a Shutdown);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.finished.cancel();
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin the only run, later calls fail even after it finished
    pub fn start(&self) -> Result<Running<'_>, StdError> {
        if self.started.swap(true, Ordering::SeqCst) {
            Err("service already ran")?
        }
        if self.requested.is_cancelled() {
            self.finished.cancel();
            Err("service is stopped")?
        }
        Ok(Running(self))
    }

    /// Token cancelled once stop is requested
    pub fn requested(&self) -> CancellationToken {
        self.requested.clone()
    }

    /// Request stop and wait for the run, if one started, to finish
    pub async fn stop(&self, service: &str, deadline: Duration) -> Result<(), StdError> {
        self.requested.cancel();
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }
        tokio::time::timeout(deadline, self.finished.cancelled())
            .await
            .map_err(|_| format!("{service} didn't stop within {deadline:?}"))?;
        Ok(())
    }
}

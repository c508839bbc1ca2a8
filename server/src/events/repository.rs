use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;

use super::{ApiEvent, MemoryRepository, SqliteRepository};

/// Event storage
pub trait Repository: Send + Sync {
    fn insert<'a>(&'a self, event: &'a ApiEvent) -> BoxFuture<'a, Result<()>>;
}

/// Pick repository by storage url scheme
pub fn new_repository(storage: &str) -> Result<Arc<dyn Repository>> {
    let url = url::Url::parse(storage)?;
    let repository: Arc<dyn Repository> = match url.scheme() {
        "sqlite" => Arc::new(SqliteRepository::new(storage)?),
        "memory" => Arc::new(MemoryRepository::new()),
        unsupported => Err(anyhow::anyhow!(
            "unknown events repository type: {unsupported}"
        ))?,
    };
    tracing::info!(scheme = url.scheme(), "events repository ready");
    Ok(repository)
}

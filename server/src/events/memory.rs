use anyhow::Result;
use futures::future::BoxFuture;
use registry::Registry;

use super::{ApiEvent, Repository};

/// In-process storage, events grouped by event name
#[derive(Debug, Default)]
pub struct MemoryRepository {
    events: Registry<Vec<ApiEvent>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events named `event` in arrival order
    pub fn events(&self, event: &str) -> Vec<ApiEvent> {
        self.events.get(event).unwrap_or_default()
    }

    /// Distinct event names seen so far
    pub fn names(&self) -> Vec<String> {
        let mut names = self.events.all().into_keys().collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Repository for MemoryRepository {
    fn insert<'a>(&'a self, event: &'a ApiEvent) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.events.update(&event.event, |stored| {
                let mut events = stored.cloned().unwrap_or_default();
                events.push(event.clone());
                Ok::<_, anyhow::Error>(Some(events))
            })?;
            Ok(())
        })
    }
}

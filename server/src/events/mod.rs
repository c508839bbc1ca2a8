//! Event ingestion handler and its storage
mod handler;
mod memory;
mod model;
mod repository;
mod sqlite;

pub use handler::{constructor, EventsConfig, EventsHandler, HANDLER};
pub use memory::MemoryRepository;
pub use model::{ApiEvent, InvalidEvent};
pub use repository::{new_repository, Repository};
pub use sqlite::SqliteRepository;

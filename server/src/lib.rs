pub mod api;
pub mod events;
pub mod generator;
pub mod http;
pub mod metrics;
mod service;
mod shutdown;

use component::{Constructors, Factory, RegistryError};

pub use service::{Handler, Service};
pub use shutdown::{Running, Shutdown};

/// Constructors of every known service
pub fn services() -> Result<Constructors<dyn Service>, RegistryError> {
    let services = Constructors::new();
    services.register_constructor(api::SERVICE, api::constructor())?;
    services.register_constructor(generator::SERVICE, generator::constructor())?;
    Ok(services)
}

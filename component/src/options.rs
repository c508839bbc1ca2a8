use std::sync::Arc;

use crate::{AsFactory, Capabilities, Constructor, Logger, Reader, StdError};

/// Single wiring effect applied to a component
pub type Opt<C> = Box<dyn FnOnce(&mut C) -> Result<(), StdError> + Send>;

/// Apply options in order, first failure aborts
pub fn apply<C: ?Sized>(component: &mut C, opts: Vec<Opt<C>>) -> Result<(), StdError> {
    for opt in opts {
        opt(&mut *component)?;
    }
    Ok(())
}

/// Configure component with `reader`, if component is configurable
pub fn with_reader<C>(reader: Arc<dyn Reader>) -> Opt<C>
where
    C: Capabilities + ?Sized + 'static,
{
    Box::new(move |component: &mut C| match component.as_configurable() {
        Some(configurable) => configurable.configure(&*reader),
        None => Ok(()),
    })
}

/// Hand `logger` to component, if component accepts one
pub fn with_logger<C>(logger: Logger) -> Opt<C>
where
    C: Capabilities + ?Sized + 'static,
{
    Box::new(move |component: &mut C| match component.as_log_writer() {
        Some(log_writer) => log_writer.set_logger(logger),
        None => Ok(()),
    })
}

/// Register named child constructor, if component is a factory of `H`
pub fn with_constructor<C, H>(name: impl Into<String>, constructor: Constructor<H>) -> Opt<C>
where
    C: AsFactory<H> + ?Sized + 'static,
    H: ?Sized + 'static,
{
    let name = name.into();
    Box::new(move |component: &mut C| match component.as_factory() {
        Some(factory) => Ok(factory.register_constructor(&name, constructor)?),
        None => Ok(()),
    })
}

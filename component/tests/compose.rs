use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use component::*;
use config::{get, ConfigError, MapReader};
use serde_json::json;

trait Widget: Capabilities + Send {
    fn path(&self) -> &str;
}

#[derive(Default)]
struct Plain;

impl Capabilities for Plain {}

impl AsFactory<dyn Widget> for Plain {}

impl Widget for Plain {
    fn path(&self) -> &str {
        "/plain"
    }
}

#[derive(Default)]
struct Routed {
    path: String,
    logger: Option<Logger>,
}

impl Configurable for Routed {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError> {
        self.path = get(reader, "path")?;
        Ok(())
    }
}

impl LogWriter for Routed {
    fn set_logger(&mut self, logger: Logger) -> Result<(), StdError> {
        self.logger = Some(logger);
        Ok(())
    }
}

impl Capabilities for Routed {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }

    fn as_log_writer(&mut self) -> Option<&mut dyn LogWriter> {
        Some(self)
    }
}

impl Widget for Routed {
    fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Default)]
struct Group {
    widgets: Constructors<dyn Widget>,
    mounted: Vec<String>,
}

impl Configurable for Group {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError> {
        let children = compose(&self.widgets, reader, "widgets", |_| vec![])?;
        self.mounted = children
            .into_iter()
            .map(|child| format!("{}={}", child.name, child.component.path()))
            .collect();
        Ok(())
    }
}

impl Capabilities for Group {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }
}

impl AsFactory<dyn Widget> for Group {
    fn as_factory(&self) -> Option<&dyn Factory<dyn Widget>> {
        Some(&self.widgets)
    }
}

fn plain() -> Constructor<dyn Widget> {
    constructor(|opts| {
        let mut widget = Plain;
        apply::<dyn Widget>(&mut widget, opts)?;
        Ok(Box::new(widget))
    })
}

fn routed() -> Constructor<dyn Widget> {
    constructor(|opts| {
        let mut widget = Routed::default();
        apply::<dyn Widget>(&mut widget, opts)?;
        Ok(Box::new(widget))
    })
}

fn reader(value: serde_json::Value) -> Arc<dyn Reader> {
    MapReader::try_from(value).unwrap().into_shared()
}

#[test]
fn test_with_reader_configures_only_configurable() {
    let mut widget = Routed::default();
    let opt = with_reader::<dyn Widget>(reader(json!({"path": "/events"})));
    opt(&mut widget).unwrap();
    assert_eq!(widget.path(), "/events");

    let mut widget = Plain;
    let opt = with_reader::<dyn Widget>(reader(json!({"path": "/events"})));
    opt(&mut widget).unwrap();
    assert_eq!(widget.path(), "/plain");
}

#[test]
fn test_with_reader_reports_configure_failure() {
    let mut widget = Routed::default();
    let err = with_reader::<dyn Widget>(reader(json!({})))(&mut widget).unwrap_err();
    let err = err.downcast_ref::<ConfigError>().unwrap();
    assert!(err.is_not_found());
}

#[test]
fn test_with_logger() {
    let mut widget = Routed::default();
    with_logger::<dyn Widget>(Logger::default())(&mut widget).unwrap();
    assert!(widget.logger.is_some());

    let mut widget = Plain;
    assert!(with_logger::<dyn Widget>(Logger::default())(&mut widget).is_ok());
}

#[test]
fn test_with_constructor() {
    let mut group = Group::default();
    apply(
        &mut group,
        vec![
            with_constructor("plain", plain()),
            with_constructor("routed", routed()),
        ],
    )
    .unwrap();
    assert!(group.widgets.contains("plain"));
    assert!(group.widgets.contains("routed"));

    let err = apply(&mut group, vec![with_constructor("plain", plain())]).unwrap_err();
    let err = err.downcast_ref::<RegistryError>().unwrap();
    assert!(err.is_already_exists());

    // not a factory
    let mut widget = Plain;
    apply(&mut widget, vec![with_constructor("plain", plain())]).unwrap();
}

#[test]
fn test_compose_reports_missing_constructor_once() {
    let widgets = Constructors::<dyn Widget>::new();
    widgets.register_constructor("plain", plain()).unwrap();
    widgets.register_constructor("routed", routed()).unwrap();
    let root = reader(json!({
        "widgets": {
            "plain": {},
            "routed": {"path": "/routed"},
            "missing": {},
        }
    }));

    let err = compose(&widgets, &*root, "widgets", |_| vec![]).unwrap_err();
    assert_eq!(err.key, "widgets");
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].name, "missing");
    assert!(err.failures[0].error.is_not_found());

    // valid children are still constructible on their own
    let children = config::sub(&*root, "widgets").unwrap();
    for name in ["plain", "routed"] {
        let child_reader = config::sub(&*children, name).unwrap();
        let widget = widgets.build(name, vec![with_reader(child_reader)]).unwrap();
        assert!(widget.path().starts_with('/'));
    }
}

#[test]
fn test_compose_attempts_every_child() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let widgets = Constructors::<dyn Widget>::new();
    for name in ["a", "b", "c"] {
        let attempts = Arc::clone(&attempts);
        widgets
            .register_constructor(
                name,
                constructor(move |opts| {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let mut widget = Routed::default();
                    apply::<dyn Widget>(&mut widget, opts)?;
                    Ok(Box::new(widget))
                }),
            )
            .unwrap();
    }
    let root = reader(json!({
        "widgets": {
            "a": {"path": 1},
            "b": {"path": "/b"},
            "c": {},
        }
    }));

    let err = compose(&widgets, &*root, "widgets", |_| vec![]).unwrap_err();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let failed = err
        .failures
        .iter()
        .map(|failure| failure.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(failed, vec!["a", "c"]);
    assert!(err
        .failures
        .iter()
        .all(|failure| matches!(failure.error, ChildError::Build(FactoryError::Construction { .. }))));
    let message = err.to_string();
    assert!(message.starts_with("failed to compose \"widgets\":"));
    assert!(message.contains("\na: "));
    assert!(message.contains("\nc: "));
}

#[test]
fn test_compose_absent_and_malformed_children() {
    let widgets = Constructors::<dyn Widget>::new();
    widgets.register_constructor("plain", plain()).unwrap();

    let empty = reader(json!({}));
    let children = compose(&widgets, &*empty, "widgets", |_| vec![]).unwrap();
    assert!(children.is_empty());

    let err = compose_required(&widgets, &*empty, "widgets", |_| vec![]).unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert!(err.failures[0].error.is_not_found());

    let scalar = reader(json!({"widgets": "plain"}));
    let err = compose(&widgets, &*scalar, "widgets", |_| vec![]).unwrap_err();
    assert!(matches!(
        err.failures[0].error,
        ChildError::Config(ConfigError::WrongType { .. })
    ));

    let scalar_child = reader(json!({"widgets": {"plain": true}}));
    let err = compose(&widgets, &*scalar_child, "widgets", |_| vec![]).unwrap_err();
    assert_eq!(err.failures[0].name, "plain");
    assert!(matches!(err.failures[0].error, ChildError::Config(_)));
}

#[test]
fn test_compose_passes_extra_options() {
    let widgets = Constructors::<dyn Widget>::new();
    widgets.register_constructor("routed", routed()).unwrap();
    let root = reader(json!({"widgets": {"routed": {"path": "/r"}}}));

    let children = compose(&widgets, &*root, "widgets", |name| {
        assert_eq!(name, "routed");
        vec![with_logger(Logger::default())]
    })
    .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].component.path(), "/r");
}

#[test]
fn test_parent_mounts_only_when_all_children_built() {
    let mut group = Group::default();
    apply(
        &mut group,
        vec![
            with_constructor("plain", plain()),
            with_constructor("routed", routed()),
        ],
    )
    .unwrap();

    let broken = reader(json!({"widgets": {"plain": {}, "routed": {}}}));
    assert!(apply(&mut group, vec![with_reader(broken)]).is_err());
    assert!(group.mounted.is_empty());

    let valid = reader(json!({"widgets": {"plain": {}, "routed": {"path": "/r"}}}));
    apply(&mut group, vec![with_reader(valid)]).unwrap();
    assert_eq!(group.mounted, vec!["plain=/plain", "routed=/r"]);
}

//! Named, concurrency-safe store for values of one type
//!
//! Whole registry is guarded by single `RwLock`: reads share it, `register`, `deregister` and
//! `update` take it exclusively, so operations on one key are totally ordered.
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound(String),
    AlreadyExists(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "key \"{key}\": not found"),
            Self::AlreadyExists(key) => write!(f, "key \"{key}\": already exists"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failed registration, carries value which is already stored under the key
pub struct AlreadyExists<T> {
    pub key: String,
    pub existing: T,
}

impl<T> std::fmt::Debug for AlreadyExists<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlreadyExists")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<T> std::fmt::Display for AlreadyExists<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key \"{}\": already exists", self.key)
    }
}

impl<T> std::error::Error for AlreadyExists<T> {}

impl<T> From<AlreadyExists<T>> for RegistryError {
    fn from(e: AlreadyExists<T>) -> Self {
        RegistryError::AlreadyExists(e.key)
    }
}

pub struct Registry<T> {
    data: RwLock<HashMap<String, T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("Registry")
            .field("keys", &data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove entry, returns removed value
    pub fn deregister(&self, key: &str) -> Result<T, RegistryError> {
        self.data
            .write()
            .remove(key)
            .ok_or_else(|| RegistryError::NotFound(key.into()))
    }

    /// Visit entries in unspecified order until `visit` returns false
    ///
    /// Registry is read-locked for the whole walk, `visit` must not write into the same registry.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &T) -> bool,
    {
        for (key, value) in self.data.read().iter() {
            if !visit(key, value) {
                return;
            }
        }
    }

    /// Atomic read-modify-write of a single key
    ///
    /// `mutate` receives current value (if any) while registry is write-locked:
    /// - `Err(_)` leaves registry untouched and is returned as is;
    /// - `Ok(None)` removes the key;
    /// - `Ok(Some(value))` stores the value.
    ///
    /// `mutate` must not call back into the same registry and must not block.
    pub fn update<F, E>(&self, key: &str, mutate: F) -> Result<Option<T>, E>
    where
        F: FnOnce(Option<&T>) -> Result<Option<T>, E>,
        T: Clone,
    {
        let mut data = self.data.write();
        match mutate(data.get(key))? {
            None => {
                data.remove(key);
                Ok(None)
            }
            Some(value) => {
                data.insert(key.into(), value.clone());
                Ok(Some(value))
            }
        }
    }
}

impl<T: Clone> Registry<T> {
    /// Store value under a new key
    ///
    /// Existing entry is never overwritten, conflicting registration returns it back.
    pub fn register(&self, key: impl Into<String>, value: T) -> Result<T, AlreadyExists<T>> {
        match self.data.write().entry(key.into()) {
            Entry::Occupied(entry) => Err(AlreadyExists {
                key: entry.key().clone(),
                existing: entry.get().clone(),
            }),
            Entry::Vacant(entry) => Ok(entry.insert(value).clone()),
        }
    }

    pub fn get(&self, key: &str) -> Result<T, RegistryError> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.into()))
    }

    /// Snapshot of all entries
    pub fn all(&self) -> HashMap<String, T> {
        self.data.read().clone()
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use quickcheck::TestResult;

    use super::*;

    #[test]
    fn register_never_overwrites() {
        let check = |key: String, first: u64, second: u64| -> TestResult {
            let registry = Registry::new();
            assert_eq!(registry.register(key.as_str(), first).unwrap(), first);
            let err = registry.register(key.as_str(), second).unwrap_err();
            assert_eq!(err.key, key);
            assert_eq!(err.existing, first);
            assert_eq!(registry.get(&key), Ok(first));
            TestResult::from_bool(registry.len() == 1)
        };
        quickcheck::quickcheck(check as fn(String, u64, u64) -> TestResult)
    }

    #[test]
    fn register_get_round_trip() {
        let check = |input: Vec<(String, u64)>| -> TestResult {
            let registry = Registry::new();
            let mut expected = HashMap::new();
            for (key, value) in input {
                if registry.register(key.as_str(), value).is_ok() {
                    expected.insert(key, value);
                }
            }
            for (key, value) in expected.iter() {
                assert_eq!(registry.get(key), Ok(*value));
            }
            TestResult::from_bool(registry.all() == expected)
        };
        quickcheck::quickcheck(check as fn(Vec<(String, u64)>) -> TestResult)
    }

    #[test]
    fn get_unknown() {
        let registry = Registry::<i32>::new();
        assert_eq!(registry.get("unknown"), Err(RegistryError::NotFound("unknown".into())));
        registry.register("test", 1).unwrap();
        assert!(registry.get("unknown").unwrap_err().is_not_found());
        assert_eq!(registry.get("test"), Ok(1));
    }

    #[test]
    fn deregister() {
        let registry = Registry::<i32>::new();
        assert!(registry.deregister("unknown").unwrap_err().is_not_found());
        registry.register("test", 1).unwrap();
        assert!(registry.deregister("unknown").unwrap_err().is_not_found());
        assert_eq!(registry.deregister("test"), Ok(1));
        assert!(registry.get("test").unwrap_err().is_not_found());
        assert!(registry.is_empty());
    }

    #[test]
    fn all_is_a_copy() {
        let registry = Registry::<i32>::new();
        assert!(registry.all().is_empty());
        registry.register("test", 1).unwrap();
        let snapshot = registry.all();
        registry.deregister("test").unwrap();
        assert_eq!(snapshot, HashMap::from([("test".to_string(), 1)]));
        assert!(registry.all().is_empty());
    }

    #[test]
    fn for_each_stops_early() {
        let registry = Registry::<i32>::new();
        let mut visits = 0;
        registry.for_each(|_, _| {
            visits += 1;
            true
        });
        assert_eq!(visits, 0);

        registry.register("test", 1).unwrap();
        registry.register("test2", 2).unwrap();
        registry.for_each(|_, _| {
            visits += 1;
            true
        });
        assert_eq!(visits, 2);

        visits = 0;
        registry.for_each(|_, _| {
            visits += 1;
            false
        });
        assert_eq!(visits, 1);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TestError;

    type Mutate = fn(Option<&Vec<bool>>) -> Result<Option<Vec<bool>>, TestError>;

    #[test]
    fn update() {
        struct Case {
            name: &'static str,
            init: Vec<(&'static str, Vec<bool>)>,
            key: &'static str,
            mutate: Mutate,
            update_err: bool,
            expected: Option<Vec<bool>>,
        }
        let cases = [
            Case {
                name: "create_key",
                init: vec![],
                key: "new_key",
                mutate: |_| Ok(Some(vec![true])),
                update_err: false,
                expected: Some(vec![true]),
            },
            Case {
                name: "create_err",
                init: vec![],
                key: "new_key_err",
                mutate: |_| Err(TestError),
                update_err: true,
                expected: None,
            },
            Case {
                name: "delete_unknown_key",
                init: vec![],
                key: "delete_key",
                mutate: |_| Ok(None),
                update_err: false,
                expected: None,
            },
            Case {
                name: "delete_existing_key",
                init: vec![("delete_key", vec![true])],
                key: "delete_key",
                mutate: |_| Ok(None),
                update_err: false,
                expected: None,
            },
            Case {
                name: "delete_err",
                init: vec![("delete_key_err", vec![true])],
                key: "delete_key_err",
                mutate: |_| Err(TestError),
                update_err: true,
                expected: Some(vec![true]),
            },
            Case {
                name: "update_key",
                init: vec![("update_key", vec![true])],
                key: "update_key",
                mutate: |_| Ok(Some(vec![false])),
                update_err: false,
                expected: Some(vec![false]),
            },
            Case {
                name: "update_error",
                init: vec![("update_key", vec![true])],
                key: "update_key",
                mutate: |_| Err(TestError),
                update_err: true,
                expected: Some(vec![true]),
            },
            Case {
                name: "append_to_existing",
                init: vec![("append_key", vec![true])],
                key: "append_key",
                mutate: |current| {
                    let mut entries = current.cloned().unwrap_or_default();
                    entries.push(false);
                    Ok(Some(entries))
                },
                update_err: false,
                expected: Some(vec![true, false]),
            },
        ];
        for case in cases {
            let registry = Registry::new();
            for (key, value) in case.init {
                registry.register(key, value).unwrap();
            }
            let result = registry.update(case.key, case.mutate);
            assert_eq!(result.is_err(), case.update_err, "case {}", case.name);
            if !case.update_err {
                assert_eq!(result.unwrap(), case.expected, "case {}", case.name);
            }
            match case.expected {
                Some(expected) => assert_eq!(registry.get(case.key), Ok(expected), "case {}", case.name),
                None => assert!(
                    registry.get(case.key).unwrap_err().is_not_found(),
                    "case {}",
                    case.name
                ),
            }
        }
    }

    fn append_unique(
        registry: &Registry<Vec<String>>,
        key: usize,
        entry: usize,
    ) -> Result<Option<Vec<String>>, RegistryError> {
        let key = key.to_string();
        let entry = entry.to_string();
        registry.update(&key, |entries| {
            let mut entries = entries.cloned().unwrap_or_default();
            if entries.contains(&entry) {
                return Err(RegistryError::AlreadyExists(entry));
            }
            entries.push(entry);
            Ok(Some(entries))
        })
    }

    #[test]
    fn update_parallel() {
        let registry = Registry::<Vec<String>>::new();
        let entry_count = 50;
        let key_count = 100;
        let doubles_count = 10;

        let errors = std::thread::scope(|scope| {
            let mut handles = vec![];
            for entry in 0..entry_count {
                let registry = &registry;
                handles.push(scope.spawn(move || {
                    (0..key_count)
                        .filter_map(|key| append_unique(registry, key, entry).err())
                        .collect::<Vec<_>>()
                }));
                handles.push(scope.spawn(move || {
                    (0..doubles_count)
                        .filter_map(|key| append_unique(registry, key, entry).err())
                        .collect::<Vec<_>>()
                }));
            }
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(errors.len(), doubles_count * entry_count);
        assert!(errors.iter().all(RegistryError::is_already_exists));

        let all = registry.all();
        assert_eq!(all.len(), key_count);
        for key in 0..key_count {
            let entries = &all[&key.to_string()];
            assert_eq!(entries.len(), entry_count);
            let unique = entries.iter().collect::<BTreeSet<_>>();
            assert_eq!(unique.len(), entry_count);
        }
    }

    #[test]
    fn all_sees_whole_entries_under_contention() {
        let registry = Registry::<Vec<usize>>::new();
        std::thread::scope(|scope| {
            for writer in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    for round in 0..200 {
                        let id = writer * 1000 + round;
                        let key = id.to_string();
                        registry.register(key.as_str(), vec![id; 16]).unwrap();
                        if round % 2 == 0 {
                            registry.deregister(&key).unwrap();
                        }
                    }
                });
            }
            for _ in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    for _ in 0..200 {
                        for (key, value) in registry.all() {
                            let id: usize = key.parse().unwrap();
                            assert_eq!(value, vec![id; 16]);
                        }
                    }
                });
            }
        });
        assert_eq!(registry.len(), 4 * 100);
    }
}

//! Registry turning catalog entries into runnable instances.

use async_trait::async_trait;
use netvet_common::{CatalogEntry, Command, TestResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::definition::NetworkTest;
use crate::device::Device;
use crate::instance::TestInstance;
use crate::runner::Engine;

/// A test instance with its input type erased.
#[async_trait]
pub trait DynTest: Send {
    fn name(&self) -> &str;

    fn commands(&self) -> &[Command];

    fn result(&self) -> &TestResult;

    /// Run verification; see [`TestInstance::run`].
    async fn run(&mut self, engine: &Engine, device: &dyn Device) -> TestResult;

    fn into_result(self: Box<Self>) -> TestResult;
}

#[async_trait]
impl<T: NetworkTest> DynTest for TestInstance<T> {
    fn name(&self) -> &str {
        TestInstance::name(self)
    }

    fn commands(&self) -> &[Command] {
        TestInstance::commands(self)
    }

    fn result(&self) -> &TestResult {
        TestInstance::result(self)
    }

    async fn run(&mut self, engine: &Engine, device: &dyn Device) -> TestResult {
        TestInstance::run(self, engine, device, None).await.clone()
    }

    fn into_result(self: Box<Self>) -> TestResult {
        TestInstance::into_result(*self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("test '{0}' is already registered")]
    Duplicate(String),

    #[error("unknown test '{0}'")]
    UnknownTest(String),
}

type Factory = Box<dyn Fn(&dyn Device, &CatalogEntry) -> Box<dyn DynTest> + Send + Sync>;

/// Test definitions by name.
#[derive(Default)]
pub struct TestRegistry {
    factories: BTreeMap<String, Factory>,
}

impl std::fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRegistry")
            .field("tests", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its own name.
    pub fn register<T: NetworkTest>(&mut self, definition: Arc<T>) -> Result<(), RegistryError> {
        let name = definition.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        let factory: Factory = Box::new(move |device: &dyn Device, entry: &CatalogEntry| {
            Box::new(TestInstance::new(
                Arc::clone(&definition),
                device,
                entry.inputs.clone(),
                entry.outputs.clone(),
            )) as Box<dyn DynTest>
        });
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build the instance described by `entry` for `device`.
    pub fn instantiate(
        &self,
        entry: &CatalogEntry,
        device: &dyn Device,
    ) -> Result<Box<dyn DynTest>, RegistryError> {
        let factory = self
            .factories
            .get(&entry.test)
            .ok_or_else(|| RegistryError::UnknownTest(entry.test.clone()))?;
        Ok(factory(device, entry))
    }
}

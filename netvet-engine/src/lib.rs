//! Execution engine for netvet network tests.
//!
//! A [`NetworkTest`] declares commands and templates and implements a
//! verification step. [`TestInstance`] binds it to a device and inputs and
//! drives the lifecycle: input validation, command expansion, policies,
//! the safety deny list, collection through a [`Device`], error
//! classification and verification. [`Engine::run_catalog`] runs many
//! instances against one device.

pub mod catalog;
pub mod definition;
pub mod device;
pub mod instance;
pub mod mock_device;
pub mod policy;
pub mod runner;
pub mod safety;

pub use catalog::{DynTest, RegistryError, TestRegistry};
pub use definition::{Declaration, NetworkTest, TestContext};
pub use device::{Device, DeviceError};
pub use instance::TestInstance;
pub use mock_device::{CollectCall, MockDevice, MockDeviceBuilder, MockResponse};
pub use policy::{Deprecated, DeprecationStage, PlatformSkip, Policy, PolicyContext, PolicyDecision};
pub use runner::Engine;
pub use safety::{BlockList, BlockedCommand, DEFAULT_BLOCKED_PATTERNS};

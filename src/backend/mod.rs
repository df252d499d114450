//! Backend abstraction layer
//!
//! Provides the trait the upload pipeline is written against, the types it
//! exchanges with backends, and two implementations: an in-memory dummy for
//! tests and headless runs, and Vulkan.

pub mod dummy;
pub mod traits;
pub mod types;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

pub use dummy::DummyBackend;
pub use traits::*;
pub use types::*;

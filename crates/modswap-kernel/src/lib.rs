//! modswap kernel
//!
//! Shared model for in-process hot reload of host-loaded mods: the module
//! image codec, the mod manifest, mod instances, the configuration schema
//! and the traits the host implements (module system, loader adapter and
//! trigger surface).

// error module
pub mod error;

// settings loader
#[cfg(feature = "config")]
pub mod config;

// configuration schema
pub mod schema;
pub use schema::*;

// module image codec
pub mod image;

// mod manifest
pub mod manifest;

// host module system
pub mod module;

// mod instances
pub mod instance;

// host loader adapter
pub mod adapter;

// trigger surface
pub mod trigger;

pub use adapter::{AdapterError, HostAdapter};
pub use error::{KernelError, KernelResult};
pub use image::{ImageError, ModuleImage};
pub use instance::{InstanceError, InstanceHandle, ModInstance, Registration};
pub use manifest::{ConfigKeySpec, ModManifest, ModTypeDescriptor, TypeSpec};
pub use module::{HookError, HookKind, LoadedModule, ModuleError, ModuleLoader};
pub use trigger::{TriggerAction, TriggerSurface};

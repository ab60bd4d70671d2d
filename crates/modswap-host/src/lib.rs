//! modswap host
//!
//! A small reference host for mods: a wasmtime module system that refuses
//! duplicate module names, the two mod loader layouts hot reload integrates
//! with, and the developer action menu reload triggers live in.

pub mod error;
pub mod loader;
pub mod menu;
pub mod module_system;
pub mod package;

#[cfg(test)]
mod testing;

pub use error::{HostError, HostResult};
pub use loader::{MODULE_EXTENSION, ModLoader, is_module_file, sha256_hex};
pub use menu::ActionMenu;
pub use module_system::{WasmModule, WasmModuleSystem};
pub use package::{MemoryFileSystem, ModPackage, PackageLoader, PackageState, PackageVersion};

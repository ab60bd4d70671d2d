//! CLI command implementations

pub mod host;
pub mod inspect;
pub mod rewrite;
pub mod settings;

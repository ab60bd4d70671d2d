//! Trigger surface
//!
//! The host-provided registry of named, user-invokable actions (a developer
//! menu). Each hot-reload-enabled mod owns one action in it.

use std::sync::Arc;

/// An action bound to a menu entry
pub type TriggerAction = Arc<dyn Fn() + Send + Sync>;

pub trait TriggerSurface: Send + Sync {
    /// Add an action under `path` with `label`
    fn add_action(&self, path: &str, label: &str, action: TriggerAction);

    /// Remove the action under `path` with `label`; false if there was none
    fn remove_action(&self, path: &str, label: &str) -> bool;
}

//! Reload registry
//!
//! Tracks every mod that opted into hot reload: the instance it started as,
//! the instance currently serving it, how many times it was reloaded, and the
//! label of the reload trigger it owns in the action menu.
//!
//! The registry lock is never held while the menu is called.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use modswap_kernel::instance::ModInstance;
use modswap_kernel::trigger::{TriggerAction, TriggerSurface};

use crate::error::{ReloadError, ReloadResult};

/// Label of the reload trigger for `instance` after `count` reloads
pub fn trigger_label(instance: &ModInstance, count: u32) -> String {
    format!(
        "({}) Reload {} by {}",
        count,
        instance.name().unwrap_or("NULL"),
        instance.author().unwrap_or("NULL")
    )
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub original: Arc<ModInstance>,
    pub current: Arc<ModInstance>,
    pub reload_count: u32,
    pub label: String,
}

impl RegistryEntry {
    fn tracks(&self, instance: &Arc<ModInstance>) -> bool {
        Arc::ptr_eq(&self.current, instance) || Arc::ptr_eq(&self.original, instance)
    }
}

pub struct ReloadRegistry {
    menu: Arc<dyn TriggerSurface>,
    menu_path: String,
    entries: RwLock<Vec<RegistryEntry>>,
}

impl ReloadRegistry {
    pub fn new(menu: Arc<dyn TriggerSurface>, menu_path: &str) -> Self {
        Self {
            menu,
            menu_path: menu_path.to_string(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn menu(&self) -> &Arc<dyn TriggerSurface> {
        &self.menu
    }

    pub fn menu_path(&self) -> &str {
        &self.menu_path
    }

    /// Track `instance` with count 0 and add its reload trigger
    pub fn register(&self, instance: &Arc<ModInstance>, action: TriggerAction) -> ReloadResult<()> {
        let label = trigger_label(instance, 0);
        {
            let mut entries = self.entries.write();
            if entries
                .iter()
                .any(|e| e.tracks(instance) || e.current.type_name() == instance.type_name())
            {
                return Err(ReloadError::AlreadyRegistered(
                    instance.type_name().to_string(),
                ));
            }
            entries.push(RegistryEntry {
                original: instance.clone(),
                current: instance.clone(),
                reload_count: 0,
                label: label.clone(),
            });
        }

        self.menu.add_action(&self.menu_path, &label, action);
        info!("Registered {} for hot reload", instance.type_name());
        Ok(())
    }

    /// Instance currently serving the mod type `type_name`
    pub fn find_by_type_name(&self, type_name: &str) -> Option<Arc<ModInstance>> {
        self.entry_for_type(type_name).map(|e| e.current)
    }

    pub fn entry_for_type(&self, type_name: &str) -> Option<RegistryEntry> {
        self.entries
            .read()
            .iter()
            .find(|e| e.current.type_name() == type_name)
            .cloned()
    }

    /// The instance `instance`'s mod was first registered as
    pub fn original_of(&self, instance: &Arc<ModInstance>) -> Option<Arc<ModInstance>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.tracks(instance))
            .map(|e| e.original.clone())
    }

    /// Increment the reload count, returning the new value
    pub fn bump_count(&self, instance: &Arc<ModInstance>) -> ReloadResult<u32> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.tracks(instance))
            .ok_or_else(|| ReloadError::NotTracked(instance.type_name().to_string()))?;
        entry.reload_count += 1;
        Ok(entry.reload_count)
    }

    /// Remove the reload trigger of `instance`'s mod; false if none was present
    pub fn remove_trigger(&self, instance: &Arc<ModInstance>) -> bool {
        let Some(label) = self.label_for(instance) else {
            return false;
        };
        let removed = self.menu.remove_action(&self.menu_path, &label);
        debug!("Removed reload trigger {:?}: {}", label, removed);
        removed
    }

    /// Make `new` the current instance and re-add the trigger under a label
    /// reflecting the current count; returns the new label
    pub fn rebind_trigger(
        &self,
        old: &Arc<ModInstance>,
        new: &Arc<ModInstance>,
        action: TriggerAction,
    ) -> ReloadResult<String> {
        let (old_label, new_label) = {
            let mut entries = self.entries.write();
            let entry = entries
                .iter_mut()
                .find(|e| e.tracks(old))
                .ok_or_else(|| ReloadError::NotTracked(old.type_name().to_string()))?;
            let new_label = trigger_label(new, entry.reload_count);
            entry.current = new.clone();
            let old_label = std::mem::replace(&mut entry.label, new_label.clone());
            (old_label, new_label)
        };

        self.menu.remove_action(&self.menu_path, &old_label);
        self.menu.add_action(&self.menu_path, &new_label, action);
        debug!("Rebound reload trigger {:?} -> {:?}", old_label, new_label);
        Ok(new_label)
    }

    /// Reloads performed for `type_name`; 0 if it is not registered
    pub fn reload_count_of_type(&self, type_name: &str) -> u32 {
        self.entry_for_type(type_name)
            .map(|e| e.reload_count)
            .unwrap_or(0)
    }

    pub fn label_for(&self, instance: &Arc<ModInstance>) -> Option<String> {
        self.entries
            .read()
            .iter()
            .find(|e| e.tracks(instance))
            .map(|e| e.label.clone())
    }

    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

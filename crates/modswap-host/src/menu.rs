//! Developer action menu
//!
//! Named actions grouped by category path. Actions added before the host
//! finishes initialising are held back and installed by
//! [`ActionMenu::mark_initialized`].

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use modswap_kernel::trigger::{TriggerAction, TriggerSurface};

struct MenuEntry {
    label: String,
    action: TriggerAction,
}

#[derive(Default)]
struct MenuState {
    initialized: bool,
    pending: Vec<(String, MenuEntry)>,
    categories: BTreeMap<String, Vec<MenuEntry>>,
}

#[derive(Default)]
pub struct ActionMenu {
    state: Mutex<MenuState>,
}

impl ActionMenu {
    /// A menu for a host that is still starting up
    pub fn new() -> Self {
        Self::default()
    }

    /// A menu for a host that has already started
    pub fn initialized() -> Self {
        let menu = Self::new();
        menu.state.lock().initialized = true;
        menu
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Install every action deferred so far
    pub fn mark_initialized(&self) {
        let mut state = self.state.lock();
        state.initialized = true;
        let pending = std::mem::take(&mut state.pending);
        debug!("Installing {} deferred menu actions", pending.len());
        for (path, entry) in pending {
            state.categories.entry(path).or_default().push(entry);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Labels under `path`, in insertion order
    pub fn labels(&self, path: &str) -> Vec<String> {
        self.state
            .lock()
            .categories
            .get(path)
            .map(|entries| entries.iter().map(|e| e.label.clone()).collect())
            .unwrap_or_default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().categories.keys().cloned().collect()
    }

    /// Run the action under `path` with `label`; false if there is none
    pub fn invoke(&self, path: &str, label: &str) -> bool {
        let action = {
            let state = self.state.lock();
            state
                .categories
                .get(path)
                .and_then(|entries| entries.iter().find(|e| e.label == label))
                .map(|e| e.action.clone())
        };

        match action {
            Some(action) => {
                debug!("Invoking menu action {}/{}", path, label);
                action();
                true
            }
            None => false,
        }
    }
}

impl TriggerSurface for ActionMenu {
    fn add_action(&self, path: &str, label: &str, action: TriggerAction) {
        let entry = MenuEntry {
            label: label.to_string(),
            action,
        };
        let mut state = self.state.lock();
        if state.initialized {
            state.categories.entry(path.to_string()).or_default().push(entry);
            debug!("Added menu action {}/{}", path, label);
        } else {
            state.pending.push((path.to_string(), entry));
            debug!("Deferred menu action {}/{} until initialization", path, label);
        }
    }

    fn remove_action(&self, path: &str, label: &str) -> bool {
        let mut state = self.state.lock();

        if let Some(index) = state
            .pending
            .iter()
            .position(|(p, e)| p == path && e.label == label)
        {
            state.pending.remove(index);
            return true;
        }

        let Some(entries) = state.categories.get_mut(path) else {
            return false;
        };
        match entries.iter().position(|e| e.label == label) {
            Some(index) => {
                entries.remove(index);
                debug!("Removed menu action {}/{}", path, label);
                true
            }
            None => false,
        }
    }
}

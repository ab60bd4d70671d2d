//! Replacement directory watcher
//!
//! Watches the replacement directories of registered mods and queues change
//! events. The watcher never reloads anything itself; the host drains the
//! queue on its main path.
//!
//! Events are coalesced per path and only handed out once the path has been
//! quiet for the debounce window, so a file still being written is never
//! reported as ready.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::settings::HotReloadSettings;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WatchError {
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
    Renamed { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
    pub timestamp: Instant,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            timestamp: Instant::now(),
        }
    }

    /// Whether the event leaves a file at `path`
    pub fn is_replacement(&self) -> bool {
        !matches!(self.kind, WatchEventKind::Removed)
    }

    /// Fold a later event for the same path into this one
    fn absorb(&mut self, later: WatchEvent) {
        let keeps_kind = matches!(later.kind, WatchEventKind::Modified)
            && matches!(
                self.kind,
                WatchEventKind::Created | WatchEventKind::Renamed { .. }
            );
        if !keeps_kind {
            self.kind = later.kind;
        }
        self.timestamp = later.timestamp;
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// A path must be quiet this long before its event is handed out
    pub debounce_duration: Duration,
    /// Watched extensions, compared ignoring case; empty watches everything
    pub extensions: Vec<String>,
    /// Simple `*suffix`, `prefix*` or exact file name patterns
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
            extensions: vec!["wasm".to_string()],
            ignore_patterns: vec!["*.tmp".to_string(), "*.swp".to_string(), "*~".to_string()],
        }
    }
}

impl WatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch configuration matching the hot reload settings
    pub fn from_settings(settings: &HotReloadSettings) -> Self {
        Self {
            debounce_duration: settings.debounce(),
            extensions: vec![settings.module_extension.clone()],
            ignore_patterns: settings.ignore_patterns.clone(),
        }
    }

    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce_duration = duration;
        self
    }

    pub fn with_extension(mut self, ext: &str) -> Self {
        self.extensions.push(ext.to_string());
        self
    }

    pub fn with_ignore(mut self, pattern: &str) -> Self {
        self.ignore_patterns.push(pattern.to_string());
        self
    }

    pub fn should_watch(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.extensions.is_empty() && !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        {
            return false;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        !self.ignore_patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix('*') {
                file_name.ends_with(suffix)
            } else if let Some(prefix) = pattern.strip_suffix('*') {
                file_name.starts_with(prefix)
            } else {
                file_name == pattern
            }
        })
    }
}

struct EventFilter {
    config: WatchConfig,
    sender: Sender<WatchEvent>,
    rename_from: Option<PathBuf>,
}

impl EventFilter {
    fn handle(&mut self, event: Event) {
        if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
            if let [from, to] = event.paths.as_slice() {
                let kind = WatchEventKind::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                };
                self.emit(kind, to.clone());
            }
            return;
        }

        for path in event.paths {
            let kind = match event.kind {
                EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => {
                    Some(WatchEventKind::Created)
                }
                EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                    Some(WatchEventKind::Modified)
                }
                EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
                    Some(WatchEventKind::Removed)
                }
                EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                    self.rename_from = Some(path.clone());
                    None
                }
                EventKind::Modify(ModifyKind::Name(RenameMode::To)) => match self.rename_from.take() {
                    Some(from) => Some(WatchEventKind::Renamed {
                        from,
                        to: path.clone(),
                    }),
                    None => Some(WatchEventKind::Created),
                },
                _ => None,
            };

            if let Some(kind) = kind {
                self.emit(kind, path);
            }
        }
    }

    fn emit(&mut self, kind: WatchEventKind, path: PathBuf) {
        if !self.config.should_watch(&path) {
            return;
        }

        let event = WatchEvent::new(kind, path);
        debug!("Watch event: {:?}", event);
        if self.sender.send(event).is_err() {
            warn!("Watch event queue closed");
        }
    }
}

/// Watches replacement directories and queues their events
pub struct ReplacementWatcher {
    config: WatchConfig,
    watcher: Mutex<RecommendedWatcher>,
    watch_paths: Mutex<Vec<PathBuf>>,
    events: Receiver<WatchEvent>,
    pending: Mutex<HashMap<PathBuf, WatchEvent>>,
}

impl ReplacementWatcher {
    pub fn new(config: WatchConfig) -> Result<Self, WatchError> {
        let (sender, events) = unbounded();
        let mut filter = EventFilter {
            config: config.clone(),
            sender,
            rename_from: None,
        };

        let watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => filter.handle(event),
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default().with_poll_interval(Duration::from_millis(100)),
        )?;

        Ok(Self {
            config,
            watcher: Mutex::new(watcher),
            watch_paths: Mutex::new(Vec::new()),
            events,
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Start watching `path`; false if it does not exist or is already watched
    pub fn watch(&self, path: &Path) -> Result<bool, WatchError> {
        if !path.is_dir() {
            warn!("Watch path does not exist: {:?}", path);
            return Ok(false);
        }

        let mut paths = self.watch_paths.lock();
        if paths.iter().any(|p| p == path) {
            return Ok(false);
        }
        self.watcher.lock().watch(path, RecursiveMode::NonRecursive)?;
        paths.push(path.to_path_buf());
        info!("Watching {:?}", path);
        Ok(true)
    }

    /// Events for every path that has been quiet for the debounce window
    ///
    /// Paths still receiving events stay queued for a later call.
    pub fn drain(&self) -> Vec<WatchEvent> {
        self.drain_at(Instant::now())
    }

    fn drain_at(&self, now: Instant) -> Vec<WatchEvent> {
        let mut pending = self.pending.lock();
        for event in self.events.try_iter() {
            match pending.get_mut(&event.path) {
                Some(queued) => queued.absorb(event),
                None => {
                    pending.insert(event.path.clone(), event);
                }
            }
        }

        let settled: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, event)| {
                now.saturating_duration_since(event.timestamp) >= self.config.debounce_duration
            })
            .map(|(path, _)| path.clone())
            .collect();

        let mut ready: Vec<WatchEvent> = settled
            .iter()
            .filter_map(|path| pending.remove(path))
            .collect();
        if !pending.is_empty() {
            debug!("{} watch events still settling", pending.len());
        }
        ready.sort_by_key(|event| event.timestamp);
        ready
    }
}

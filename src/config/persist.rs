//! Saving user settings: atomic file replacement plus a debounced writer.

use parking_lot::{Condvar, Mutex};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::sources::global_file::global_config_path;
use super::AutomatorConfig;
use crate::error::AutomatorError;

/// Quiet period before a scheduled save is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// A TOML config file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user config file.
    pub fn user() -> Self {
        Self::new(global_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. A missing file yields defaults; so does a corrupt one,
    /// with a warning.
    pub fn load(&self) -> AutomatorConfig {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return AutomatorConfig::default(),
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    config_path = %self.path.display(),
                    error = %e,
                    "Config file is corrupt; using defaults"
                );
                AutomatorConfig::default()
            }
        }
    }

    /// Write the file atomically: temp file in the same directory, fsync, rename.
    pub fn save(&self, config: &AutomatorConfig) -> Result<(), AutomatorError> {
        let contents = toml::to_string_pretty(config)
            .map_err(|e| AutomatorError::ConfigError(format!("Cannot serialize config: {}", e)))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.toml".to_string());
        let tmp = dir.join(format!(".{}.tmp", file_name));

        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(config_path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

#[derive(Default)]
struct Pending {
    config: Option<AutomatorConfig>,
    deadline: Option<Instant>,
    shutdown: bool,
}

struct Shared {
    store: ConfigStore,
    state: Mutex<Pending>,
    wake: Condvar,
}

impl Shared {
    /// Write whatever is pending. Runs with the state lock held so a flush and
    /// the background writer never interleave.
    /// A failed write keeps the snapshot pending for the next attempt.
    fn write_pending(&self, state: &mut Pending) -> Result<bool, AutomatorError> {
        state.deadline = None;
        let Some(config) = state.config.take() else {
            return Ok(false);
        };
        match self.store.save(&config) {
            Ok(()) => Ok(true),
            Err(e) => {
                state.config = Some(config);
                Err(e)
            }
        }
    }
}

/// Coalesces bursts of settings changes into one write.
///
/// Every `schedule` replaces the pending snapshot and pushes the deadline
/// out under one lock, so only the latest snapshot is ever written. Dropping
/// the saver writes anything still pending.
pub struct DebouncedSaver {
    shared: Arc<Shared>,
    delay: Duration,
    worker: Option<JoinHandle<()>>,
}

impl DebouncedSaver {
    pub fn new(store: ConfigStore, delay: Duration) -> Self {
        let shared = Arc::new(Shared {
            store,
            state: Mutex::new(Pending::default()),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("config-saver".to_string())
            .spawn(move || run_worker(&worker_shared))
            .map_err(|e| warn!(error = %e, "Cannot start config saver; saves happen on flush"))
            .ok();
        Self {
            shared,
            delay,
            worker,
        }
    }

    pub fn with_default_delay(store: ConfigStore) -> Self {
        Self::new(store, DEFAULT_DEBOUNCE)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.shared.store
    }

    pub fn schedule(&self, config: AutomatorConfig) {
        let mut state = self.shared.state.lock();
        state.config = Some(config);
        state.deadline = Some(Instant::now() + self.delay);
        self.shared.wake.notify_one();
    }

    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().config.is_some()
    }

    /// Write the pending snapshot now. Returns whether anything was written.
    pub fn flush(&self) -> Result<bool, AutomatorError> {
        let mut state = self.shared.state.lock();
        self.shared.write_pending(&mut state)
    }
}

fn run_worker(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            if let Err(e) = shared.write_pending(&mut state) {
                warn!(error = %e, "Final config save failed");
            }
            return;
        }
        match state.deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                if let Err(e) = shared.write_pending(&mut state) {
                    warn!(error = %e, "Debounced config save failed");
                }
            }
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
        }
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wake.notify_one();
        }
        match self.worker.take() {
            Some(worker) => {
                let _ = worker.join();
            }
            None => {
                let mut state = self.shared.state.lock();
                if let Err(e) = self.shared.write_pending(&mut state) {
                    warn!(error = %e, "Final config save failed");
                }
            }
        }
    }
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fetch::DEFAULT_MARKET;
use crate::scale::ScaleMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub preferences_file: PathBuf,
    pub wallpaper_file: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "bingwall", "bingwall")
            .context("Failed to get project directories")?;

        Self::from_dirs(
            proj_dirs.config_dir().to_path_buf(),
            proj_dirs.cache_dir().to_path_buf(),
        )
    }

    /// Keeps configuration and cache under `root/config` and `root/cache`.
    pub fn with_root(root: &Path) -> Result<Self> {
        Self::from_dirs(root.join("config"), root.join("cache"))
    }

    fn from_dirs(config_dir: PathBuf, cache_dir: PathBuf) -> Result<Self> {
        let preferences_file = config_dir.join("preferences.json");
        let wallpaper_file = cache_dir.join("wallpaper.jpg");

        // Create directories if they don't exist
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

        Ok(Config {
            config_dir,
            cache_dir,
            preferences_file,
            wallpaper_file,
        })
    }
}

/// Pixel size of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// User-editable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Only download while a WiFi link is up.
    pub wifi_download_only: bool,
    /// Market code passed to the homepage, e.g. `en-US`.
    pub market: String,
    pub scale_mode: ScaleMode,
    pub viewport: Viewport,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            wifi_download_only: false,
            market: DEFAULT_MARKET.to_string(),
            scale_mode: ScaleMode::default(),
            viewport: Viewport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Preferences)>;

/// Preferences persisted as JSON, with change notification.
///
/// Subscribers are called after every change made through [`update`] and
/// after [`poll`] picks up an edit made by another process.
///
/// [`update`]: PreferenceStore::update
/// [`poll`]: PreferenceStore::poll
pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
    modified: Option<SystemTime>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl PreferenceStore {
    /// Opens the store at `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let current = read_preferences(path)?;
        let modified = modified_time(path);

        debug!("Loaded preferences from {}: {:?}", path.display(), current);

        Ok(Self {
            path: path.to_path_buf(),
            current,
            modified,
            subscribers: Vec::new(),
            next_id: 0,
        })
    }

    pub fn get(&self) -> &Preferences {
        &self.current
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Preferences) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Applies `change`, writes the result and notifies on a real change.
    pub fn update<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut next = self.current.clone();
        change(&mut next);

        let content = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, content + "\n")
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.modified = modified_time(&self.path);

        if next != self.current {
            info!("Preferences changed: {:?}", next);
            self.current = next;
            self.notify();
        }

        Ok(())
    }

    /// Re-reads the file if it changed on disk since the last read or write.
    ///
    /// Returns whether the preferences changed.
    pub fn poll(&mut self) -> Result<bool> {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return Ok(false);
        }
        self.modified = modified;

        let next = read_preferences(&self.path)?;
        if next == self.current {
            return Ok(false);
        }

        info!("Preferences reloaded from {}: {:?}", self.path.display(), next);
        self.current = next;
        self.notify();
        Ok(true)
    }

    fn notify(&mut self) {
        let current = &self.current;
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(current);
        }
    }
}

fn read_preferences(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Preferences::default());
    }

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

//! Cooperative scheduler driving a [`WallpaperEngine`].
//!
//! Everything runs on the thread that calls [`Session::run`]: lifecycle
//! events, preference polling, and the ticks themselves, which may block on
//! the network. A tick is scheduled one interval after the previous tick or
//! draw completes, and only while the engine is visible. Other threads talk
//! to the session through a [`SessionHandle`].

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::conf::{PreferenceStore, Preferences, Viewport};
use crate::engine::WallpaperEngine;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The drawing surface exists and is shown.
    Start,
    Visibility(bool),
    Resize(Viewport),
    /// Horizontal scroll position, `0.0..=1.0`.
    Offset(f32),
    PreferencesChanged(Preferences),
    Shutdown,
}

/// Sending side of a session's event queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: Sender<SessionEvent>,
}

impl SessionHandle {
    /// Returns false once the session is gone.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(SessionEvent::Start)
    }

    pub fn set_visible(&self, visible: bool) -> bool {
        self.send(SessionEvent::Visibility(visible))
    }

    pub fn resize(&self, viewport: Viewport) -> bool {
        self.send(SessionEvent::Resize(viewport))
    }

    pub fn offset_changed(&self, x_offset: f32) -> bool {
        self.send(SessionEvent::Offset(x_offset))
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionEvent::Shutdown)
    }
}

pub struct Session {
    engine: WallpaperEngine,
    events: Receiver<SessionEvent>,
    handle: SessionHandle,
    preferences: Option<PreferenceStore>,
    tick_interval: Duration,
    max_ticks: Option<u64>,
    ticks: u64,
}

enum Step {
    Continue,
    Stop,
}

impl Session {
    pub fn new(engine: WallpaperEngine) -> Self {
        let (sender, events) = mpsc::channel();

        Self {
            engine,
            events,
            handle: SessionHandle { sender },
            preferences: None,
            tick_interval: TICK_INTERVAL,
            max_ticks: None,
            ticks: 0,
        }
    }

    /// Watches `store` and forwards its changes to the engine.
    pub fn with_preferences(mut self, mut store: PreferenceStore) -> Self {
        let handle = self.handle.clone();
        store.subscribe(move |preferences: &Preferences| {
            handle.send(SessionEvent::PreferencesChanged(preferences.clone()));
        });
        self.preferences = Some(store);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Ends `run` after this many ticks.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn engine(&self) -> &WallpaperEngine {
        &self.engine
    }

    pub fn preferences_mut(&mut self) -> Option<&mut PreferenceStore> {
        self.preferences.as_mut()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Processes events and ticks until shutdown or the tick limit.
    ///
    /// Returns the number of ticks performed by this call.
    pub fn run(&mut self) -> Result<u64> {
        let started_with = self.ticks;
        let mut next_tick: Option<Instant> = None;

        loop {
            if self.max_ticks.is_some_and(|max| self.ticks >= max) {
                break;
            }

            if !self.engine.is_visible() {
                next_tick = None;
            } else if next_tick.is_none() {
                next_tick = Some(Instant::now() + self.tick_interval);
            }

            let event = match next_tick {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match self.events.recv_timeout(wait) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };

            match event {
                Some(event) => {
                    if let Step::Stop = self.dispatch(event) {
                        break;
                    }
                    // A draw reschedules the next tick, as posting a fresh delay would.
                    next_tick = None;
                }
                None => {
                    if let Step::Stop = self.before_tick() {
                        break;
                    }
                    let again = self.engine.tick();
                    self.ticks += 1;
                    next_tick = again.then(|| Instant::now() + self.tick_interval);
                }
            }
        }

        info!("Session stopped after {} ticks", self.ticks - started_with);
        Ok(self.ticks - started_with)
    }

    /// Rereads the preference file and hands any edit straight to the engine.
    fn sync_preferences(&mut self) {
        let Some(store) = self.preferences.as_mut() else {
            return;
        };

        match store.poll() {
            Ok(true) => self.engine.apply_preferences(store.get()),
            Ok(false) => {}
            Err(e) => warn!("Failed to reload preferences: {:#}", e),
        }
    }

    /// Picks up preference edits and handles whatever events are queued.
    fn before_tick(&mut self) -> Step {
        self.sync_preferences();

        while let Ok(event) = self.events.try_recv() {
            if let Step::Stop = self.dispatch(event) {
                return Step::Stop;
            }
        }

        Step::Continue
    }

    fn dispatch(&mut self, event: SessionEvent) -> Step {
        debug!("Session event: {:?}", event);

        match event {
            SessionEvent::Start => {
                self.sync_preferences();
                self.engine.start();
            }
            SessionEvent::Visibility(visible) => {
                if visible {
                    self.sync_preferences();
                }
                self.engine.set_visible(visible);
            }
            SessionEvent::Resize(viewport) => self.engine.resize(viewport),
            SessionEvent::Offset(x_offset) => self.engine.offset_changed(x_offset),
            SessionEvent::PreferencesChanged(preferences) => self.engine.apply_preferences(&preferences),
            SessionEvent::Shutdown => {
                self.engine.stop();
                return Step::Stop;
            }
        }

        Step::Continue
    }
}

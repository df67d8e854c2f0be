// In-process fakes shared by the unit tests.
use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::conf::Viewport;
use crate::engine::{Renderer, Wallpaper};
use crate::services::{Clock, HttpTransport};

#[derive(Default)]
struct FakeState {
    texts: HashMap<String, String>,
    bytes: HashMap<String, Vec<u8>>,
    calls: Vec<String>,
}

/// Transport answering from canned bodies; unknown URLs fail.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.set_text(url, body);
        self
    }

    pub fn with_bytes(self, url: &str, body: Vec<u8>) -> Self {
        self.set_bytes(url, body);
        self
    }

    pub fn set_bytes(&self, url: &str, body: Vec<u8>) {
        self.state.lock().unwrap().bytes.insert(url.to_string(), body);
    }

    pub fn set_text(&self, url: &str, body: &str) {
        self.state.lock().unwrap().texts.insert(url.to_string(), body.to_string());
    }

    /// Drops every canned body so further requests fail.
    pub fn go_offline(&self) {
        let mut state = self.state.lock().unwrap();
        state.texts.clear();
        state.bytes.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl HttpTransport for FakeTransport {
    fn get_text(&self, url: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(url.to_string());
        state.texts.get(url).cloned().ok_or_else(|| anyhow!("no route to {}", url))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(url.to_string());
        state.bytes.get(url).cloned().ok_or_else(|| anyhow!("no route to {}", url))
    }
}

/// Clock whose day is set by the test.
#[derive(Clone)]
pub struct FakeClock {
    day: Arc<AtomicU32>,
}

impl FakeClock {
    pub fn new(day: u32) -> Self {
        Self { day: Arc::new(AtomicU32::new(day)) }
    }

    pub fn set_day(&self, day: u32) {
        self.day.store(day, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn day_of_month(&self) -> u32 {
        self.day.load(Ordering::SeqCst)
    }
}

/// One recorded `render` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
}

/// Renderer remembering what it was asked to draw.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingRenderer {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, wallpaper: &Wallpaper, x_offset: i32, _viewport: Viewport) -> Result<()> {
        self.frames.lock().unwrap().push(Frame {
            generation: wallpaper.generation,
            width: wallpaper.image.width(),
            height: wallpaper.image.height(),
            x_offset,
        });
        Ok(())
    }
}

/// PNG-encoded solid image of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([40, 90, 160, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

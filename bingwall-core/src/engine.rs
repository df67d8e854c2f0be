//! Redraw and cache controller.
//!
//! The engine owns at most one scaled wallpaper. It starts out empty, fills
//! the cache on the first successful fetch, locate and load, and empties it
//! again when the calendar day rolls over. Failures leave the cache as it
//! was; an empty cache is simply retried on the next tick.

use anyhow::Result;
use image::DynamicImage;
use log::{debug, info, warn};

use crate::conf::{Preferences, Viewport};
use crate::fetch::{fetch_page_source, BING_HOST};
use crate::load::load_wallpaper_image;
use crate::locate::{locate_image, ImageReference};
use crate::network::DownloadPolicy;
use crate::scale::ScaleMode;
use crate::services::{AttoHttpTransport, Clock, Connectivity, HttpTransport, LocalClock, SysfsConnectivity};

/// A scaled image ready for drawing.
#[derive(Debug, Clone)]
pub struct Wallpaper {
    pub image: DynamicImage,
    pub reference: ImageReference,
    /// Increases with every successful load.
    pub generation: u64,
}

/// Consumer of the engine's output.
pub trait Renderer {
    /// Draw `wallpaper` shifted horizontally by `x_offset` pixels.
    fn render(&mut self, wallpaper: &Wallpaper, x_offset: i32, viewport: Viewport) -> Result<()>;
}

#[derive(Debug)]
pub enum CacheState {
    Empty,
    Cached(Wallpaper),
}

/// Everything the engine talks to outside itself.
pub struct EngineServices {
    pub transport: Box<dyn HttpTransport>,
    pub connectivity: Box<dyn Connectivity>,
    pub clock: Box<dyn Clock>,
    pub renderer: Box<dyn Renderer>,
}

impl EngineServices {
    /// Real network, sysfs WiFi state and the local clock.
    pub fn system(renderer: Box<dyn Renderer>) -> Self {
        Self {
            transport: Box::new(AttoHttpTransport),
            connectivity: Box::new(SysfsConnectivity::new()),
            clock: Box::new(LocalClock),
            renderer,
        }
    }
}

/// Runs one fetch, locate and load cycle.
///
/// Returns `None` if any step produced nothing.
pub fn fetch_image_of_the_day(
    transport: &dyn HttpTransport,
    policy: DownloadPolicy,
    connectivity: &dyn Connectivity,
    market: &str,
    target_height: u32,
    mode: ScaleMode,
) -> Option<(ImageReference, DynamicImage)> {
    let source = fetch_page_source(transport, policy, connectivity, market);
    if source.is_empty() {
        return None;
    }

    let Some(reference) = locate_image(&source, BING_HOST) else {
        warn!("No image reference found in {} bytes of homepage markup", source.len());
        return None;
    };

    let image = load_wallpaper_image(transport, policy, connectivity, &reference, target_height, mode)?;
    Some((reference, image))
}

pub struct WallpaperEngine {
    services: EngineServices,
    state: CacheState,
    reference_day: u32,
    visible: bool,
    viewport: Viewport,
    x_offset: f32,
    policy: DownloadPolicy,
    market: String,
    scale_mode: ScaleMode,
    generation: u64,
}

impl WallpaperEngine {
    pub fn new(services: EngineServices, preferences: &Preferences) -> Self {
        let reference_day = services.clock.day_of_month();

        Self {
            services,
            state: CacheState::Empty,
            reference_day,
            visible: false,
            viewport: preferences.viewport,
            x_offset: 0.0,
            policy: DownloadPolicy::new(preferences.wifi_download_only),
            market: preferences.market.clone(),
            scale_mode: preferences.scale_mode,
            generation: 0,
        }
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn wallpaper(&self) -> Option<&Wallpaper> {
        match &self.state {
            CacheState::Cached(wallpaper) => Some(wallpaper),
            CacheState::Empty => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn reference_day(&self) -> u32 {
        self.reference_day
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn policy(&self) -> DownloadPolicy {
        self.policy
    }

    /// Current horizontal shift in pixels, zero while nothing is cached.
    pub fn pixel_offset(&self) -> i32 {
        self.wallpaper()
            .map(|w| pixel_offset(self.viewport, w.image.width(), self.x_offset))
            .unwrap_or(0)
    }

    /// One scheduled beat: day check, then draw.
    ///
    /// Returns whether another tick should be scheduled.
    pub fn tick(&mut self) -> bool {
        self.check_for_update();
        self.draw();
        self.visible
    }

    /// Empties the cache when the calendar day has changed.
    ///
    /// Returns whether the cache was invalidated.
    pub fn check_for_update(&mut self) -> bool {
        let today = self.services.clock.day_of_month();
        if today == self.reference_day {
            return false;
        }

        info!("Day changed from {} to {}, dropping cached wallpaper", self.reference_day, today);
        self.state = CacheState::Empty;
        self.reference_day = today;
        true
    }

    /// Fills the cache if needed, then hands the wallpaper to the renderer.
    pub fn draw(&mut self) {
        if matches!(self.state, CacheState::Empty) {
            self.refresh();
        }

        if let CacheState::Cached(wallpaper) = &self.state {
            let x = pixel_offset(self.viewport, wallpaper.image.width(), self.x_offset);
            if let Err(e) = self.services.renderer.render(wallpaper, x, self.viewport) {
                warn!("Failed to render wallpaper: {:#}", e);
            }
        }
    }

    fn refresh(&mut self) -> bool {
        let fetched = fetch_image_of_the_day(
            self.services.transport.as_ref(),
            self.policy,
            self.services.connectivity.as_ref(),
            &self.market,
            self.viewport.height,
            self.scale_mode,
        );

        let Some((reference, image)) = fetched else {
            debug!("Wallpaper refresh produced nothing, will retry");
            return false;
        };

        self.generation += 1;
        info!(
            "Cached wallpaper #{} from {} ({}x{})",
            self.generation,
            reference,
            image.width(),
            image.height()
        );
        self.state = CacheState::Cached(Wallpaper {
            image,
            reference,
            generation: self.generation,
        });
        true
    }

    /// The surface became available.
    pub fn start(&mut self) {
        self.visible = true;
        self.draw();
    }

    /// The surface went away or the session is being torn down.
    pub fn stop(&mut self) {
        self.visible = false;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.draw();
        }
    }

    /// New surface size; the height applies to the next load.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.draw();
    }

    /// Horizontal scroll position, `0.0` (left) to `1.0` (right).
    pub fn offset_changed(&mut self, x_offset: f32) {
        self.x_offset = x_offset.clamp(0.0, 1.0);
        self.draw();
    }

    pub fn apply_preferences(&mut self, preferences: &Preferences) {
        self.policy = DownloadPolicy::new(preferences.wifi_download_only);
        self.market = preferences.market.clone();
        self.scale_mode = preferences.scale_mode;
        self.viewport = preferences.viewport;
        debug!("Engine preferences applied: {:?}", preferences);
    }
}

fn pixel_offset(viewport: Viewport, bitmap_width: u32, x_offset: f32) -> i32 {
    let slack = i64::from(viewport.width) - i64::from(bitmap_width);
    (slack as f32 * x_offset) as i32
}

//! Image-of-the-day wallpaper engine.
//!
//! Fetches the Bing homepage, finds the background image it advertises,
//! scales that image to the viewport height and keeps it until the
//! calendar day changes. A [`Session`] drives a [`WallpaperEngine`] on a
//! one-second cadence while it is visible; a [`Renderer`] consumes the
//! result.

pub mod conf;
pub mod desktop;
pub mod engine;
pub mod fetch;
pub mod load;
pub mod locate;
pub mod network;
pub mod render;
pub mod scale;
pub mod services;
pub mod session;

#[cfg(test)]
mod testing;

pub use conf::{Config, PreferenceStore, Preferences, SubscriptionId, Viewport};
pub use desktop::{get_desktop_environment, SystemWallpaperSetter, WallpaperSetter};
pub use engine::{fetch_image_of_the_day, CacheState, EngineServices, Renderer, Wallpaper, WallpaperEngine};
pub use fetch::{fetch_page_source, homepage_url, BING_HOST, DEFAULT_MARKET};
pub use load::load_wallpaper_image;
pub use locate::{locate_image, ImageReference, MARKER};
pub use network::DownloadPolicy;
pub use render::{compose_frame, DesktopRenderer};
pub use scale::{scale_to_height, scaled_dimensions, ScaleMode};
pub use services::{
    AttoHttpTransport, Clock, Connectivity, HttpTransport, LocalClock, StaticConnectivity, SysfsConnectivity,
};
pub use session::{Session, SessionEvent, SessionHandle, TICK_INTERVAL};

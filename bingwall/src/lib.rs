pub use crate::app::{BingWallCliApp, PreferenceChanges};

mod app {
    use anyhow::{bail, Context, Result};
    use bingwall_core::*;
    use image::DynamicImage;
    use log::{info, warn};
    use std::path::{Path, PathBuf};

    /// Requested preference edits; `None` leaves a field alone.
    #[derive(Debug, Default, Clone)]
    pub struct PreferenceChanges {
        pub wifi_only: Option<bool>,
        pub market: Option<String>,
        pub scale: Option<ScaleMode>,
        pub width: Option<u32>,
        pub height: Option<u32>,
    }

    impl PreferenceChanges {
        pub fn is_empty(&self) -> bool {
            self.wifi_only.is_none()
                && self.market.is_none()
                && self.scale.is_none()
                && self.width.is_none()
                && self.height.is_none()
        }

        pub fn apply(&self, preferences: &mut Preferences) {
            if let Some(wifi_only) = self.wifi_only {
                preferences.wifi_download_only = wifi_only;
            }
            if let Some(market) = &self.market {
                preferences.market = market.clone();
            }
            if let Some(scale) = self.scale {
                preferences.scale_mode = scale;
            }
            if let Some(width) = self.width {
                preferences.viewport.width = width;
            }
            if let Some(height) = self.height {
                preferences.viewport.height = height;
            }
        }
    }

    pub struct BingWallCliApp {
        config: Config,
        preferences: PreferenceStore,
    }

    impl BingWallCliApp {
        pub fn new() -> Result<Self> {
            let config = Config::new()?;
            Self::with_config(config)
        }

        pub fn with_config(config: Config) -> Result<Self> {
            let preferences = PreferenceStore::load(&config.preferences_file)?;

            Ok(Self { config, preferences })
        }

        pub fn config(&self) -> &Config {
            &self.config
        }

        pub fn preferences(&self) -> &Preferences {
            self.preferences.get()
        }

        fn policy(&self) -> DownloadPolicy {
            DownloadPolicy::new(self.preferences().wifi_download_only)
        }

        /// Runs the wallpaper session until the process is stopped.
        ///
        /// With `once`, starts the engine, draws a single time and returns.
        pub fn run(self, once: bool) -> Result<()> {
            let renderer = DesktopRenderer::new(&self.config.wallpaper_file);
            let services = EngineServices::system(Box::new(renderer));
            let mut engine = WallpaperEngine::new(services, self.preferences.get());

            if once {
                engine.start();
                match engine.wallpaper() {
                    Some(wallpaper) => info!("Wallpaper applied from {}", wallpaper.reference),
                    None => warn!("No wallpaper available right now"),
                }
                return Ok(());
            }

            let mut session = Session::new(engine).with_preferences(self.preferences);
            session.handle().start();
            info!("Wallpaper session started");
            session.run()?;

            Ok(())
        }

        /// Resolves today's image reference without downloading the image.
        pub fn locate(&self) -> Option<ImageReference> {
            self.locate_with(&AttoHttpTransport, &SysfsConnectivity::new())
        }

        pub fn locate_with(
            &self,
            transport: &dyn HttpTransport,
            connectivity: &dyn Connectivity,
        ) -> Option<ImageReference> {
            let source = fetch_page_source(transport, self.policy(), connectivity, &self.preferences().market);
            locate_image(&source, BING_HOST)
        }

        /// Downloads and scales today's image, writing it to `output` or the
        /// cached wallpaper file.
        pub fn fetch(&self, output: Option<&Path>) -> Result<PathBuf> {
            self.fetch_with(&AttoHttpTransport, &SysfsConnectivity::new(), output)
        }

        pub fn fetch_with(
            &self,
            transport: &dyn HttpTransport,
            connectivity: &dyn Connectivity,
            output: Option<&Path>,
        ) -> Result<PathBuf> {
            let preferences = self.preferences();
            let Some((reference, image)) = fetch_image_of_the_day(
                transport,
                self.policy(),
                connectivity,
                &preferences.market,
                preferences.viewport.height,
                preferences.scale_mode,
            ) else {
                bail!("No wallpaper available for market {}", preferences.market);
            };

            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.config.wallpaper_file.clone());
            DynamicImage::ImageRgb8(image.to_rgb8())
                .save(&path)
                .with_context(|| format!("Failed to save wallpaper to {}", path.display()))?;

            info!("Saved {} to {}", reference, path.display());
            Ok(path)
        }

        pub fn update_preferences(&mut self, changes: &PreferenceChanges) -> Result<()> {
            if changes.is_empty() {
                return Ok(());
            }
            self.preferences.update(|p| changes.apply(p))
        }

        pub fn status_json(&self) -> Result<String> {
            let status = serde_json::json!({
                "config_dir": self.config.config_dir,
                "cache_dir": self.config.cache_dir,
                "preferences_file": self.config.preferences_file,
                "wallpaper_file": self.config.wallpaper_file,
                "wifi_enabled": SysfsConnectivity::new().is_wifi_enabled(),
                "desktop": get_desktop_environment(),
                "preferences": self.preferences(),
            });
            Ok(serde_json::to_string_pretty(&status)?)
        }

        pub fn preferences_json(&self) -> Result<String> {
            Ok(serde_json::to_string_pretty(self.preferences())?)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use anyhow::anyhow;
        use image::{ImageFormat, Rgb, RgbImage};
        use std::collections::HashMap;
        use std::io::Cursor;

        #[derive(Default)]
        struct CannedTransport {
            texts: HashMap<String, String>,
            bytes: HashMap<String, Vec<u8>>,
        }

        impl HttpTransport for CannedTransport {
            fn get_text(&self, url: &str) -> Result<String> {
                self.texts.get(url).cloned().ok_or_else(|| anyhow!("offline"))
            }

            fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
                self.bytes.get(url).cloned().ok_or_else(|| anyhow!("offline"))
            }
        }

        fn canned_day() -> CannedTransport {
            let mut png = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([10, 20, 30])))
                .write_to(&mut png, ImageFormat::Png)
                .unwrap();

            let mut transport = CannedTransport::default();
            transport.texts.insert(
                homepage_url("en-US"),
                "<div style=\"x\">g_img={url:'/th?id=OHR.Cli_1920x1080.jpg'}</div>".to_string(),
            );
            transport
                .bytes
                .insert("http://www.bing.com/th?id=OHR.Cli_1920x1080.jpg".to_string(), png.into_inner());
            transport
        }

        fn app() -> (tempfile::TempDir, BingWallCliApp) {
            let root = tempfile::tempdir().unwrap();
            let config = Config::with_root(root.path()).unwrap();
            (root, BingWallCliApp::with_config(config).unwrap())
        }

        #[test]
        fn changes_only_touch_given_fields() {
            let mut preferences = Preferences::default();
            let changes = PreferenceChanges {
                wifi_only: Some(true),
                height: Some(2340),
                ..PreferenceChanges::default()
            };

            changes.apply(&mut preferences);

            assert!(preferences.wifi_download_only);
            assert_eq!(preferences.viewport, Viewport::new(1920, 2340));
            assert_eq!(preferences.market, "en-US");
            assert!(PreferenceChanges::default().is_empty());
        }

        #[test]
        fn preference_updates_persist() {
            let (root, mut app) = app();
            app.update_preferences(&PreferenceChanges {
                market: Some("ja-JP".to_string()),
                scale: Some(ScaleMode::Proportional),
                ..PreferenceChanges::default()
            })
            .unwrap();

            let reopened = BingWallCliApp::with_config(Config::with_root(root.path()).unwrap()).unwrap();
            assert_eq!(reopened.preferences().market, "ja-JP");
            assert_eq!(reopened.preferences().scale_mode, ScaleMode::Proportional);
            assert!(reopened.preferences_json().unwrap().contains("\"proportional\""));
        }

        #[test]
        fn locate_reports_todays_reference() {
            let (_root, app) = app();
            let found = app.locate_with(&canned_day(), &StaticConnectivity(true)).unwrap();
            assert_eq!(found.as_str(), "http://www.bing.com/th?id=OHR.Cli_1920x1080.jpg");
        }

        #[test]
        fn fetch_writes_scaled_image() {
            let (_root, mut app) = app();
            app.update_preferences(&PreferenceChanges {
                width: Some(64),
                height: Some(18),
                ..PreferenceChanges::default()
            })
            .unwrap();

            let path = app.fetch_with(&canned_day(), &StaticConnectivity(true), None).unwrap();

            assert_eq!(path, app.config().wallpaper_file);
            let written = image::open(&path).unwrap();
            assert_eq!((written.width(), written.height()), (25, 18));
        }

        #[test]
        fn fetch_respects_wifi_only() {
            let (_root, mut app) = app();
            app.update_preferences(&PreferenceChanges {
                wifi_only: Some(true),
                ..PreferenceChanges::default()
            })
            .unwrap();

            assert!(app.fetch_with(&canned_day(), &StaticConnectivity(false), None).is_err());
            assert!(!app.config().wallpaper_file.exists());
        }

        #[test]
        fn status_lists_paths_and_preferences() {
            let (_root, app) = app();
            let status: serde_json::Value = serde_json::from_str(&app.status_json().unwrap()).unwrap();

            assert_eq!(status["preferences"]["market"], "en-US");
            assert!(status["wallpaper_file"].as_str().unwrap().ends_with("wallpaper.jpg"));
        }
    }
}

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::process::Command;

/// Applies an image file as the desktop background.
pub trait WallpaperSetter {
    /// Returns whether the desktop accepted the image.
    fn set_wallpaper(&self, file_path: &Path) -> Result<bool>;
}

/// Uses the `wallpaper` crate, then desktop-specific tools on Linux.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallpaperSetter;

impl WallpaperSetter for SystemWallpaperSetter {
    fn set_wallpaper(&self, file_path: &Path) -> Result<bool> {
        let file_loc = file_path.to_string_lossy();

        match ::wallpaper::set_from_path(&file_loc) {
            Ok(_) => {
                info!("Wallpaper set successfully to: {}", file_loc);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to set wallpaper through the desktop API: {}", e);
                if cfg!(target_os = "linux") {
                    return set_wallpaper_linux_fallback(file_path);
                }
                Ok(false)
            }
        }
    }
}

/// Names the running desktop from the session environment.
pub fn get_desktop_environment() -> String {
    desktop_environment_from(
        std::env::var("DESKTOP_SESSION").ok().as_deref(),
        std::env::var("KDE_FULL_SESSION").ok().as_deref(),
        std::env::var("GNOME_DESKTOP_SESSION_ID").is_ok(),
    )
}

fn desktop_environment_from(
    desktop_session: Option<&str>,
    kde_full_session: Option<&str>,
    gnome_session_id: bool,
) -> String {
    const KNOWN: [&str; 14] = [
        "gnome", "unity", "cinnamon", "mate", "xfce4", "lxde", "fluxbox",
        "blackbox", "openbox", "icewm", "jwm", "afterstep", "trinity", "kde",
    ];
    const FLAVOURS: [(&str, &str); 5] = [
        ("xubuntu", "xfce4"),
        ("ubuntustudio", "kde"),
        ("lubuntu", "lxde"),
        ("kubuntu", "kde"),
        ("ubuntu", "gnome"),
    ];

    if let Some(session) = desktop_session.map(str::to_lowercase) {
        if KNOWN.contains(&session.as_str()) {
            return session;
        }
        if session.contains("xfce") {
            return "xfce4".to_string();
        }
        if let Some((_, desktop)) = FLAVOURS.iter().find(|(prefix, _)| session.starts_with(prefix)) {
            return desktop.to_string();
        }
    }

    if kde_full_session == Some("true") {
        return "kde".to_string();
    }

    if gnome_session_id {
        return "gnome".to_string();
    }

    "unknown".to_string()
}

/// Per-monitor `last-image` properties from an `xfconf-query -l` listing.
fn xfce_last_image_properties(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("workspace0/last-image"))
        .map(str::to_string)
        .collect()
}

/// Commands that set `file_loc` as the background on `desktop`.
///
/// `xfce_monitors` lists the XFCE `last-image` properties to set before
/// the legacy monitor0 ones. The last command's exit status decides
/// success.
fn fallback_commands(
    desktop: &str,
    file_loc: &str,
    xfce_monitors: &[String],
) -> Vec<(&'static str, Vec<String>)> {
    let args = |list: &[&str]| list.iter().map(|a| a.to_string()).collect::<Vec<_>>();

    match desktop {
        "gnome" | "unity" | "cinnamon" => vec![(
            "gsettings",
            args(&["set", "org.gnome.desktop.background", "picture-uri", &format!("file://{}", file_loc)]),
        )],
        "mate" => vec![(
            "gsettings",
            args(&["set", "org.mate.background", "picture-filename", file_loc]),
        )],
        "xfce4" => {
            let prop = |name: &str, value: &str| {
                args(&["-c", "xfce4-desktop", "-p", &format!("/backdrop/screen0/monitor0/{}", name), "-s", value])
            };
            let mut commands: Vec<_> = xfce_monitors
                .iter()
                .map(|property| ("xfconf-query", args(&["-c", "xfce4-desktop", "-p", property.as_str(), "-s", file_loc])))
                .collect();
            commands.extend([
                ("xfconf-query", prop("image-path", file_loc)),
                ("xfconf-query", prop("image-style", "3")),
                ("xfconf-query", prop("image-show", "true")),
                ("xfdesktop", args(&["--reload"])),
            ]);
            commands
        }
        "lxde" => vec![(
            "pcmanfm",
            args(&["--set-wallpaper", file_loc, "--wallpaper-mode=scaled"]),
        )],
        "fluxbox" | "jwm" | "openbox" | "afterstep" => vec![("fbsetbg", args(&[file_loc]))],
        "icewm" => vec![("icewmbg", args(&[file_loc]))],
        "blackbox" => vec![("bsetbg", args(&["-full", file_loc]))],
        _ => Vec::new(),
    }
}

fn list_xfce_monitors() -> Vec<String> {
    match Command::new("xfconf-query").args(["-c", "xfce4-desktop", "-l"]).output() {
        Ok(output) if output.status.success() => {
            xfce_last_image_properties(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            warn!("xfconf-query -l exited with {}", output.status);
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to list XFCE desktop properties: {}", e);
            Vec::new()
        }
    }
}

fn set_wallpaper_linux_fallback(file_path: &Path) -> Result<bool> {
    let file_loc = file_path.to_string_lossy();
    let desktop_env = get_desktop_environment();
    let xfce_monitors = if desktop_env == "xfce4" {
        list_xfce_monitors()
    } else {
        Vec::new()
    };
    let commands = fallback_commands(&desktop_env, &file_loc, &xfce_monitors);

    if commands.is_empty() {
        warn!("Desktop environment '{}' not supported", desktop_env);
        return Ok(false);
    }

    let mut success = false;
    for (program, args) in commands {
        let output = Command::new(program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;
        success = output.status.success();
    }

    Ok(success)
}

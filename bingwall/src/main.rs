use anyhow::Result;
use bingwall::{BingWallCliApp, PreferenceChanges};
use bingwall_core::ScaleMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bingwall")]
#[command(about = "Bing image of the day as your desktop wallpaper")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the wallpaper current, refreshing when the day changes
    Run {
        /// Apply today's image once and exit
        #[arg(long)]
        once: bool,
    },
    /// Download and scale today's image without changing the wallpaper
    Fetch {
        /// Where to write the image (defaults to the cache directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the address of today's image
    Locate,
    /// Change preferences and print the result
    Config {
        /// Only download while connected to WiFi
        #[arg(long)]
        wifi_only: Option<bool>,
        /// Market code, e.g. en-US
        #[arg(long)]
        market: Option<String>,
        /// stepwise or proportional
        #[arg(long)]
        scale: Option<ScaleMode>,
        /// Viewport width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Viewport height in pixels
        #[arg(long)]
        height: Option<u32>,
    },
    /// Show paths, connectivity and preferences
    Status,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut app = BingWallCliApp::new()?;

    match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Run { once } => app.run(once)?,
        Commands::Fetch { output } => {
            let path = app.fetch(output.as_deref())?;
            println!("{}", path.display());
        }
        Commands::Locate => match app.locate() {
            Some(reference) => println!("{}", reference),
            None => println!("(no image found)"),
        },
        Commands::Config {
            wifi_only,
            market,
            scale,
            width,
            height,
        } => {
            app.update_preferences(&PreferenceChanges {
                wifi_only,
                market,
                scale,
                width,
                height,
            })?;
            println!("{}", app.preferences_json()?);
        }
        Commands::Status => println!("{}", app.status_json()?),
    }

    Ok(())
}

//! Shorts feed (dzm-shorts) - Main entry point
//!
//! Headless driver for the feed engine: reads viewer intents from stdin,
//! prints the active listing and logs playback commands in place of real
//! video surfaces.
//!
//! Commands: `next`, `prev`, `like`, `pause`, `category <name>`, `all`,
//! `cats`, `reload`, `quit`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dzm_common::config::{ClientSettings, CliOverrides, TomlConfig};
use dzm_common::FeedItem;
use dzm_shorts::{
    FeedSession, FeedStatus, HttpCatalog, MediaSurface, Navigation, SessionOptions, SessionUpdate,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for dzm-shorts
#[derive(Parser, Debug)]
#[command(name = "dzm-shorts")]
#[command(about = "Short-video feed for the DZM marketplace")]
#[command(version)]
struct Args {
    /// Config file (defaults to <config dir>/dzm/shorts.toml)
    #[arg(short, long, env = "DZM_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog API root, e.g. https://api.example.dz/api
    #[arg(long)]
    api_base_url: Option<String>,

    /// Viewer session token
    #[arg(long)]
    token: Option<String>,

    /// Listings per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Start filtered to this category
    #[arg(long)]
    category: Option<String>,
}

/// Stand-in video surface that logs what it is told to do
struct LoggingSurface {
    item_id: String,
    playing: AtomicBool,
}

impl LoggingSurface {
    fn new(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            playing: AtomicBool::new(false),
        }
    }
}

impl MediaSurface for LoggingSurface {
    fn play(&self) {
        if !self.playing.swap(true, Ordering::SeqCst) {
            info!(item_id = %self.item_id, "play");
        }
    }

    fn pause(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            info!(item_id = %self.item_id, "pause");
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load config file")?;
    let settings = ClientSettings::resolve(
        CliOverrides {
            api_base_url: args.api_base_url,
            session_token: args.token,
            page_size: args.page_size,
            log_level: args.log_level,
        },
        toml_config,
    )
    .context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "dzm_shorts={level},dzm_common={level}",
                    level = settings.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        api_base_url = %settings.api_base_url,
        page_size = settings.page_size,
        signed_in = settings.session_token.is_some(),
        "Starting DZM shorts feed"
    );

    let catalog = Arc::new(HttpCatalog::new(&settings).context("Failed to build catalog client")?);
    let mut session = FeedSession::new(catalog, SessionOptions::from_settings(&settings));

    if args.category.is_some() {
        session.set_category(args.category);
    } else {
        session.start();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            update = session.next_update(), if session.has_pending() => {
                if let Some(update) = update {
                    on_update(&mut session, update);
                }
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !on_command(&mut session, line.trim()) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    session.close().await;
    info!("Feed session shut down");
    Ok(())
}

/// Handle one stdin command; returns false to quit
fn on_command(session: &mut FeedSession, line: &str) -> bool {
    let (command, argument) = match line.split_once(' ') {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "next" | "n" => match session.advance() {
            Navigation::Moved { .. } => render(session),
            Navigation::FetchingMore => println!("loading more..."),
            Navigation::AtStart | Navigation::Unavailable => {}
        },
        "prev" | "p" => {
            if let Navigation::Moved { .. } = session.retreat() {
                render(session);
            }
        }
        "like" | "l" => {
            let Some(item_id) = session.current_item().map(|item| item.id.clone()) else {
                return true;
            };
            if let Some(liked) = session.toggle_like(&item_id) {
                let count = session.display_like_count(&item_id).unwrap_or(0);
                println!("{} ({} likes)", if liked { "liked" } else { "unliked" }, count);
            }
        }
        "pause" | "space" => {
            if let Some(state) = session.toggle_playback() {
                println!("{}", state);
            }
        }
        "category" | "c" if !argument.is_empty() => session.toggle_category(argument),
        "all" => session.set_category(None),
        "cats" => {
            for category in session.categories() {
                println!("{} ({} videos)", category.name, category.item_count);
            }
        }
        "reload" => session.reload(),
        "quit" | "q" => return false,
        other => warn!(command = %other, "Unknown command"),
    }
    true
}

fn on_update(session: &mut FeedSession, update: SessionUpdate) {
    match update {
        SessionUpdate::Loaded { .. } => {
            session.unmount_unloaded();
            mount_video_surfaces(session);
            render(session);
        }
        SessionUpdate::Appended { moved_to, .. } => {
            mount_video_surfaces(session);
            if moved_to.is_some() {
                render(session);
            }
        }
        SessionUpdate::Empty => {
            session.unmount_unloaded();
            println!("no shorts in this category yet");
        }
        SessionUpdate::EndOfFeed => println!("you have reached the end"),
        SessionUpdate::FetchFailed { error, .. } => {
            println!("could not load the feed: {}", error);
            if session.status() == FeedStatus::Failed {
                println!("type `reload` to try again");
            }
        }
        SessionUpdate::CategoriesLoaded { .. } | SessionUpdate::Stale => {}
    }
}

/// Give every loaded video listing a surface, the way a list view would
fn mount_video_surfaces(session: &mut FeedSession) {
    let unmounted: Vec<String> = session
        .items()
        .iter()
        .filter(|item| item.has_video() && !session.playback().is_mounted(&item.id))
        .map(|item| item.id.clone())
        .collect();

    for item_id in unmounted {
        let surface = Arc::new(LoggingSurface::new(&item_id));
        session.mount_surface(&item_id, surface);
    }
}

fn render(session: &FeedSession) {
    let (Some(item), Some((position, total))) = (session.current_item(), session.position())
    else {
        return;
    };
    println!("[{}/{}] {}", position, total, describe(item));
    println!(
        "        {} likes, {} comments{}",
        session.display_like_count(&item.id).unwrap_or(item.like_count),
        item.comment_count,
        if session.is_liked(&item.id) { ", liked" } else { "" }
    );
}

fn describe(item: &FeedItem) -> String {
    let verified = if item.seller.verified { " ✓" } else { "" };
    format!(
        "{} - {:.0} {} - {} - {}{}",
        item.title, item.price, item.currency, item.location, item.seller.name, verified
    )
}

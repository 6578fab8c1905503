pub mod assets;
pub mod channel;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod font;
pub mod host;
pub mod item;
pub mod protocol;
pub mod resource_key;
pub mod session;
pub mod snbt;
pub mod text;
pub mod tooltip;

use anyhow::{anyhow, Context, Result};
use assets::{AssetPaths, VersionAssetManager};
use channel::PreviewChannel;
use cli::CliOverrides;
use config::{AppConfig, PreviewConfig};
use host::PreviewHost;
use image::{ImageFormat, RgbaImage};
use item::Item;
use session::PreviewSession;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

pub fn run_with_overrides(cli: CliOverrides) -> Result<()> {
    let mut config = AppConfig::load_or_default(cli.config_path());
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        log::info!(target: "config", "CLI overrides: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);

    let item_path = cli.item.clone().ok_or_else(|| anyhow!("An item document is required (--item <file.json>)"))?;
    let mut item = Item::load(&item_path)?;
    if let Some(version) = &cli.version {
        item.version = version.clone();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let frame = LocalSet::new().block_on(&runtime, render_preview(&config, item, cli.time.unwrap_or(0.0)))?;

    let out = cli.output_path();
    frame
        .save_with_format(&out, ImageFormat::Png)
        .with_context(|| format!("Failed to write preview {}", out.display()))?;
    log::info!(target: "preview", "Preview written to {}", out.display());
    Ok(())
}

/// Resolves everything `item` needs and renders one frame at `time` seconds.
///
/// Must run inside a [`LocalSet`].
pub async fn render_preview(config: &AppConfig, item: Item, time: f32) -> Result<RgbaImage> {
    let paths = AssetPaths::from_config(&config.assets);
    log::info!(target: "assets", "Game directory {}, cache {}", paths.game_dir().display(), paths.unpacked_root().display());
    let manager = VersionAssetManager::new(paths, config.datagen.clone());
    render_with_manager(manager, &config.preview, item, time).await
}

pub async fn render_with_manager(
    manager: VersionAssetManager,
    preview: &PreviewConfig,
    item: Item,
    time: f32,
) -> Result<RgbaImage> {
    let host = Rc::new(PreviewHost::new(manager, Some(item)));
    let mut channel = PreviewChannel::new(host);
    let mut session = PreviewSession::new(preview.clone());
    let timeout = Duration::from_millis(preview.settle_timeout_ms);
    channel::run_until_settled(&mut session, &mut channel, timeout).await?;
    let frame = session.frame(time);
    session.dispose();
    Ok(frame)
}

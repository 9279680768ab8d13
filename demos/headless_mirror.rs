#![allow(clippy::cast_precision_loss)]
//! Mirror a host offscreen and write a few frames as PNG.
//!
//! Run with: cargo run --example headless_mirror -- [config.json] [frames]
//!
//! The host address comes from the config file, or from `EITMIRROR_HOST`.
//! Frames are written to `mirror_frames/`.

use std::path::PathBuf;

use eitmirror::{
    init_logging, save_image, MirrorConfig, MirrorSession, Rect, SessionEvent, WgpuBackend,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const OUT_DIR: &str = "mirror_frames";
const BACKGROUND: [f32; 4] = [0.05, 0.05, 0.08, 1.0];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let frames: usize = args.next().map(|n| n.parse()).transpose()?.unwrap_or(10);

    let config = MirrorConfig::load(config_path.as_deref())?;
    let backend = WgpuBackend::new_headless(WIDTH, HEIGHT).await?;
    let (session, mut renderer) = MirrorSession::connect(&config, backend).await?;
    let mut updates = session.spawn_updates();

    std::fs::create_dir_all(OUT_DIR)?;
    let rect = Rect::new(0.0, 0.0, WIDTH as f32, HEIGHT as f32);

    for frame in 0..frames {
        // Wait for the next accepted vertices update before drawing
        loop {
            match updates.next_event().await {
                Some(SessionEvent::Applied { .. }) => break,
                Some(SessionEvent::Stopped(reason)) => {
                    log::warn!("updates ended early: {reason:?}");
                    return Ok(());
                }
                None => return Ok(()),
                Some(event) => log::warn!("{event:?}"),
            }
        }

        renderer.backend_mut().clear(BACKGROUND);
        renderer.draw_in_rect(rect);

        let pixels = renderer.backend().capture_rgba()?;
        let path = format!("{OUT_DIR}/frame_{frame:03}.png");
        save_image(&path, &pixels, WIDTH, HEIGHT)?;
        println!("{path}");
    }

    updates.shutdown().await;
    Ok(())
}

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::SceneConfig;
use crate::gpu::offscreen::OffscreenBackend;
use crate::host::{HeadlessHost, HostEvent};
use crate::render_loop::ManualTime;
use crate::rng::SceneRng;
use crate::session::{MountOptions, SceneSession};
use crate::texture::SceneTextures;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scene config JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fixed seed (overrides the config file)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the scene in a window
    View {
        #[arg(long, default_value_t = 1280)]
        width: u32,

        #[arg(long, default_value_t = 720)]
        height: u32,
    },

    /// Render frames to disk
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 2.0)]
        duration: f32,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,
    },

    /// Write the procedural textures as PNG files
    Textures {
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match cli.command {
        Commands::View { width, height } => crate::app::run(config, width, height)?,
        Commands::Render {
            out,
            fps,
            duration,
            width,
            height,
        } => render_offline(config, &out, fps, duration, width, height)?,
        Commands::Textures { out } => dump_textures(&config, &out)?,
    }
    Ok(())
}

fn render_offline(config: SceneConfig, out_dir: &Path, fps: f32, duration: f32, width: u32, height: u32) -> Result<()> {
    anyhow::ensure!(fps > 0.0, "fps must be positive");
    let total_frames = (duration * fps).ceil().max(1.0) as usize;
    let dt = 1.0 / fps as f64;

    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    let time = ManualTime::new();
    let options = MountOptions {
        config,
        ..MountOptions::default()
    };
    let host = HeadlessHost::new(width as f32, height as f32);
    let mut session = SceneSession::mount(
        host,
        options,
        |rect, ratio| pollster::block_on(OffscreenBackend::new(rect.width as u32, rect.height as u32, ratio)),
        Rc::new(time.clone()),
    )?
    .context("headless host has no container")?;

    println!("Rendering {} frames to {:?}...", total_frames, out_dir);

    // Mounting already rendered the frame at t = 0.
    for i in 0..total_frames {
        if i > 0 {
            time.advance(dt);
            if session.host_mut().take_frame().is_some() {
                session.handle(HostEvent::Frame);
            }
        }

        let frame = session.backend().capture()?;
        let frame_path = out_dir.join(format!("frame_{:05}.png", i));
        frame
            .save(&frame_path)
            .with_context(|| format!("failed to write {}", frame_path.display()))?;

        if i % 60 == 0 {
            print!(".");
            use std::io::Write;
            std::io::stdout().flush()?;
        }
    }

    let info = session.debug_info();
    println!("\nDone. {} triangles per frame.", info.triangles);
    session.unmount();
    Ok(())
}

fn dump_textures(config: &SceneConfig, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    let seed = config.resolve_seed(0);
    let mut rng = SceneRng::new(seed);
    let textures = SceneTextures::generate(&mut rng);
    for (i, texture) in textures.all().into_iter().enumerate() {
        let path = out_dir.join(format!("{:02}-{}.png", i, texture.label));
        texture
            .image()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("{} ({}x{})", path.display(), texture.width(), texture.height());
    }
    Ok(())
}

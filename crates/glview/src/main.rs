//! # glview
//!
//! Boots a map-viewer module headlessly: loads its payloads from a
//! directory, runs the startup sequence against a recording backend and
//! prints what the module presented.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use glrun::DirLoader;
use glrun::HarnessConfig;
use glrun::InputEvent;
use glrun::RecordingBackend;
use glrun::Runtime;
use glrun::TagBoard;
use glrun::Viewport;

#[derive(Debug, Parser)]
#[command(name = "glview", about = "Run a map-viewer module without a GPU")]
struct Args {
    /// Directory holding the module and its payloads.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// JSON harness config. Defaults reproduce the stock viewer.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra frames to render after startup.
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Resize the surface after startup, e.g. `1280x720`.
    #[arg(long, value_parser = parse_size)]
    size: Option<(f32, f32)>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_size(s: &str) -> Result<(f32, f32), String> {
    let (w, h) = s.split_once('x').ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: f32 = w.parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: f32 = h.parse().map_err(|_| format!("bad height '{}'", h))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("size must be positive, got {}x{}", w, h));
    }
    Ok((w, h))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = match &args.config {
        Some(path) => HarnessConfig::from_path(path)?,
        None => HarnessConfig::default(),
    };

    let runtime = Arc::new(Runtime::new()?);
    let module_path = args.root.join(&config.module);
    let id = runtime
        .add_module_file(&module_path)
        .with_context(|| format!("loading {}", module_path.display()))?;

    let board = TagBoard::new();
    let mut session = runtime
        .session(id, RecordingBackend::new())
        .configure(&config)
        .presenter(board.clone())
        .build()
        .await?;

    let loader = DirLoader::new(&args.root);
    let transfers = session.boot(&loader, &config).await?;
    for (payload, transfer) in config.payloads.iter().zip(&transfers) {
        info!(uri = %payload.uri, chunks = transfer.chunks, bytes = transfer.bytes, "loaded");
    }

    if let Some((width, height)) = args.size {
        let mut viewport = Viewport::new(width, height);
        session
            .handle_input(&mut viewport, InputEvent::Resize { width, height })
            .await?;
        session.render().await?;
    }
    for _ in 0..args.frames {
        session.render().await?;
    }

    let live = session.registry().len();
    let backend = session.shutdown();
    let board = board.snapshot();

    println!("handles live at shutdown: {}", live);
    println!("backend calls: {}", backend.calls().len());
    if let Some(id) = board.node_id {
        println!("closest node: {}", id);
    }
    for (key, value) in &board.tags {
        println!("  {}: {}", key, value);
    }
    for diagnostic in &board.diagnostics {
        println!("warning: {}", diagnostic);
    }
    Ok(())
}

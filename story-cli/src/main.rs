//! # Storyframe CLI
//!
//! Flattens scene documents to images and prints frame fits.
//!
//! ```text
//! storyframe render --scene story.json --out frame.png --width 540
//! storyframe fit --logical 1080x1920 --max 400x400 --mode cover
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use story_core::{fit, EditorConfig, FitMode, FrameSize, SceneDocument};
use story_renderer::{
    CompositeRenderer, ExportFormat, ExportTarget, FileImageSource, RenderConfig, RenderResult,
    SnapshotExporter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "storyframe")]
#[command(about = "Flatten story-frame scene documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a scene document to an image.
    Render {
        /// Scene document (JSON).
        #[arg(long)]
        scene: PathBuf,
        /// Output file.
        #[arg(long)]
        out: PathBuf,
        /// Output format (default: from the output extension, else PNG).
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Maximum output width in pixels.
        #[arg(long)]
        width: Option<u32>,
        /// Maximum output height in pixels.
        #[arg(long)]
        height: Option<u32>,
        /// Editor configuration the document must match.
        #[arg(long, env = "STORYFRAME_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Fit a logical frame into a bounding box.
    Fit {
        /// Logical size, e.g. 1080x1920.
        #[arg(long, value_parser = parse_size)]
        logical: FrameSize,
        /// Bounding box, e.g. 400x400.
        #[arg(long, value_parser = parse_size)]
        max: FrameSize,
        /// Fit mode.
        #[arg(long, value_enum, default_value = "contain")]
        mode: ModeArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
    Svg,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => Self::Png,
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Svg => Self::Svg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Contain,
    Cover,
}

impl From<ModeArg> for FitMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Contain => Self::Contain,
            ModeArg::Cover => Self::Cover,
        }
    }
}

/// Parse `WIDTHxHEIGHT`.
fn parse_size(text: &str) -> Result<FrameSize, String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let width: f32 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: f32 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    let size = FrameSize::new(width, height);
    if size.is_empty() {
        return Err(format!("size must be positive, got {text:?}"));
    }
    Ok(size)
}

/// Writes the export to one fixed path.
struct OutputFile(PathBuf);

#[async_trait]
impl ExportTarget for OutputFile {
    async fn persist(&self, bytes: Vec<u8>, _format: ExportFormat) -> RenderResult<String> {
        if let Some(parent) = self.0.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.0, bytes).await?;
        Ok(self.0.display().to_string())
    }
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,story_core=debug,story_renderer=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,story_core=debug,story_renderer=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn output_format(format: Option<FormatArg>, out: &Path) -> ExportFormat {
    format.map_or_else(
        || {
            out.extension()
                .and_then(|ext| ext.to_str())
                .and_then(ExportFormat::from_extension)
                .unwrap_or(ExportFormat::Png)
        },
        ExportFormat::from,
    )
}

async fn run_render(
    scene_path: &Path,
    out: PathBuf,
    format: ExportFormat,
    width: Option<u32>,
    height: Option<u32>,
    config: Option<&Path>,
) -> anyhow::Result<String> {
    let json = tokio::fs::read_to_string(scene_path)
        .await
        .with_context(|| format!("Failed to read {}", scene_path.display()))?;
    let doc = SceneDocument::from_json(&json).context("Invalid scene document")?;
    let canvas = doc.canvas;

    if let Some(path) = config {
        let config = EditorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        anyhow::ensure!(
            config.canvas == canvas,
            "Document canvas {}x{} does not match configured canvas {}x{}",
            canvas.width,
            canvas.height,
            config.canvas.width,
            config.canvas.height
        );
    }

    let scene = doc.into_scene().context("Invalid scene document")?;
    tracing::info!(
        "Rendering {} layers from {}",
        scene.len(),
        scene_path.display()
    );

    let root = scene_path
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    let renderer = CompositeRenderer::new(RenderConfig {
        logical: canvas,
        width,
        height,
        ..RenderConfig::default()
    })
    .with_image_source(Arc::new(FileImageSource::with_root(root)));

    let exporter =
        SnapshotExporter::new(renderer, Arc::new(OutputFile(out))).with_format(format);
    let snapshot = exporter.export(scene).await?;
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

fn run_fit(logical: FrameSize, max: FrameSize, mode: ModeArg) -> anyhow::Result<String> {
    let placement = fit(mode.into(), logical, max);
    Ok(serde_json::to_string_pretty(&placement)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = match cli.command {
        Command::Render {
            scene,
            out,
            format,
            width,
            height,
            config,
        } => {
            let format = output_format(format, &out);
            run_render(&scene, out, format, width, height, config.as_deref()).await?
        }
        Command::Fit { logical, max, mode } => run_fit(logical, max, mode)?,
    };

    println!("{output}");
    Ok(())
}

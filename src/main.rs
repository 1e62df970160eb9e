mod config;
mod export;
mod loader;
mod processing;
mod session;
mod state;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use config::AppConfig;
use export::{ExportOptions, OutputFormat};
use processing::compose::{MAX_WATERMARK_TEXT_CHARS, Watermark};
use processing::text::{self, TextRenderer};
use session::EditSession;
use state::{FilterKind, FilterSet, FilterSetting, Recipe};

#[derive(Parser, Debug)]
#[command(name = "mist", version, about = "Filter a photo and stamp it with a watermark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply filters and an optional watermark to an image and save the result.
    Compose(ComposeArgs),
    /// List the available filters and their intensity ranges.
    Filters(FiltersArgs),
}

#[derive(Args, Debug)]
struct FiltersArgs {
    /// Also show which filters this recipe enables, and at what intensity.
    #[arg(long)]
    recipe: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// Base image to edit, or `-` to read it from stdin.
    base: PathBuf,
    /// Where to write the composited image.
    #[arg(short, long)]
    output: PathBuf,
    /// Filter for the base image, as `name=intensity`. Repeat to chain; order is kept.
    #[arg(short, long = "filter", value_name = "NAME=VALUE")]
    filters: Vec<FilterSetting>,
    /// Image to use as the watermark.
    #[arg(long, conflicts_with = "watermark_text")]
    watermark_image: Option<PathBuf>,
    /// Short text to use as the watermark; empty text drops the watermark.
    #[arg(long)]
    watermark_text: Option<String>,
    /// Flip a base image filter on or off after the recipe and `--filter` flags.
    #[arg(long = "toggle", value_name = "NAME=VALUE")]
    toggles: Vec<FilterSetting>,
    /// Filter for the watermark image, as `name=intensity`.
    #[arg(long = "watermark-filter", value_name = "NAME=VALUE")]
    watermark_filters: Vec<FilterSetting>,
    /// Text watermark slant, 0..=1.
    #[arg(long)]
    obliqueness: Option<f32>,
    /// Draw the text watermark as an outline of this width, 3..=5.
    #[arg(long)]
    stroke: Option<f32>,
    /// Extra spacing between text watermark characters, 0..=5.
    #[arg(long)]
    kern: Option<f32>,
    /// TOML or JSON recipe with filters and text style; flags are applied on top.
    #[arg(long)]
    recipe: Option<PathBuf>,
    /// Font file for text watermarks.
    #[arg(long)]
    font: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// JPEG quality, 1..=100.
    #[arg(long)]
    quality: Option<u8>,
    /// Downscale so the long edge is at most this many pixels.
    #[arg(long)]
    resize: Option<u32>,
}

/// Opens an image path, treating `-` as encoded image data on stdin.
fn open_input(path: &Path) -> anyhow::Result<image::DynamicImage> {
    if path != Path::new("-") {
        return loader::open_image(path);
    }
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .context("failed to read image from stdin")?;
    loader::decode_bytes(&bytes)
}

fn build_session(args: &ComposeArgs) -> anyhow::Result<EditSession> {
    if args.base == Path::new("-") && args.watermark_image.as_deref() == Some(Path::new("-")) {
        anyhow::bail!("only one of the base and watermark images can be read from stdin");
    }
    let mut session = EditSession::new();
    session.set_base(open_input(&args.base)?);

    if let Some(path) = args.recipe.as_deref() {
        session.apply_recipe(&Recipe::load(path)?);
    }
    for setting in &args.filters {
        session
            .image_filters_mut()
            .set_intensity(setting.kind, setting.intensity);
    }
    for setting in &args.toggles {
        session
            .image_filters_mut()
            .toggle(setting.kind, setting.intensity);
    }
    for setting in &args.watermark_filters {
        session
            .watermark_filters_mut()
            .set_intensity(setting.kind, setting.intensity);
    }

    let style = session.text_style_mut();
    if let Some(v) = args.obliqueness {
        style.obliqueness = v;
    }
    if let Some(v) = args.stroke {
        style.stroke = Some(v);
    }
    if let Some(v) = args.kern {
        style.kern = v;
    }

    if let Some(path) = args.watermark_image.as_deref() {
        session.set_watermark_image(open_input(path)?);
    } else if let Some(t) = args.watermark_text.as_deref() {
        if t.is_empty() {
            session.clear_watermark();
        } else {
            session.set_watermark_text(t)?;
        }
    }

    tracing::debug!(
        image_filters = %describe_filters(session.image_filters()),
        watermark_filters = %describe_filters(session.watermark_filters()),
        text_style = ?session.text_style(),
        "session ready"
    );
    Ok(session)
}

fn describe_filters(set: &FilterSet) -> String {
    set.iter()
        .map(|s| format!("{}={}", s.kind, s.intensity))
        .collect::<Vec<_>>()
        .join(",")
}

fn export_options(args: &ComposeArgs, config: &AppConfig) -> ExportOptions {
    let mut options = config.export_options();
    if args.format.is_some() {
        options.format = args.format;
    }
    if let Some(q) = args.quality {
        options.jpg_quality = q;
    }
    if let Some(edge) = args.resize {
        options.resize_long_edge = Some(edge).filter(|&e| e > 0);
    }
    options
}

fn load_text_renderer(
    session: &EditSession,
    explicit: Option<&Path>,
    config: &AppConfig,
) -> anyhow::Result<Option<TextRenderer>> {
    if !matches!(session.watermark(), Some(Watermark::Text(t)) if !t.is_empty()) {
        return Ok(None);
    }
    let Some(path) = text::resolve_font_path(explicit, config.font_path.as_deref()) else {
        // compose reports the missing font
        return Ok(None);
    };
    tracing::info!(font = %path.display(), "using font for text watermark");
    Ok(Some(TextRenderer::from_file(&path)?))
}

fn run_compose(args: &ComposeArgs, config: &AppConfig) -> anyhow::Result<()> {
    let session = build_session(args)?;
    let renderer = load_text_renderer(&session, args.font.as_deref(), config)?;
    let options = export_options(args, config);
    session
        .save(&args.output, renderer.as_ref(), &options)
        .with_context(|| format!("failed to save {}", args.output.display()))?;
    println!("{}", args.output.display());
    Ok(())
}

fn print_filters(args: &FiltersArgs) -> anyhow::Result<()> {
    let recipe = args.recipe.as_deref().map(Recipe::load).transpose()?;
    for kind in FilterKind::ALL {
        let range = kind.range();
        let enabled = recipe
            .as_ref()
            .filter(|r| r.image_filters.contains(kind))
            .and_then(|r| r.image_filters.intensity(kind))
            .map(|v| format!("  [on: {v}]"))
            .unwrap_or_default();
        println!(
            "{:<9} {:<15} {}..={}{enabled}",
            kind.name(),
            kind.alias(),
            range.start(),
            range.end()
        );
    }
    println!(
        "text watermark: obliqueness {:?}, stroke {:?}, kern {:?}, max {} characters",
        state::OBLIQUENESS_RANGE,
        state::STROKE_RANGE,
        state::KERN_RANGE,
        MAX_WATERMARK_TEXT_CHARS
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load();

    match &cli.command {
        Command::Compose(args) => run_compose(args, &config),
        Command::Filters(args) => print_filters(args),
    }
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use leafview_core::{parse_script, PageView, ViewerConfig, ViewerController, Zoom};
use leafview_engine::{Document, OpenSource, Passwords, RenderBackend, RenderSession, RgbaImage};
use leafview_storage::Storage;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "leafview")]
#[command(about = "Leafview single-page PDF viewer")]
pub struct Cli {
    /// Viewer config JSON, used instead of the stored one.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page geometry.
    Info {
        #[command(flatten)]
        open: OpenArgs,
    },
    /// Render one viewport frame of a page to PNG.
    Render(RenderArgs),
    /// Drive the viewer with a command script.
    View(ViewArgs),
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct OpenArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    #[arg(long)]
    password: Option<String>,
}

impl OpenArgs {
    fn passwords(&self) -> Passwords {
        Passwords { owner: None, user: self.password.clone() }
    }
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[command(flatten)]
    open: OpenArgs,
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Scale factor, or `fit` for fit-width.
    #[arg(long, value_parser = parse_zoom)]
    zoom: Option<Zoom>,
    /// Scroll offset as `X,Y` content pixels.
    #[arg(long, value_parser = parse_offset)]
    offset: Option<(i64, i64)>,
    /// Frame size as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<(u32, u32)>,
    /// Page cache budget in bytes.
    #[arg(long)]
    budget: Option<u64>,
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct ViewArgs {
    #[command(flatten)]
    open: OpenArgs,
    /// Commands separated by `;` or newlines, e.g. `next;zoom 2;goto 3`.
    #[arg(long, default_value = "")]
    commands: String,
    /// Restore the page and zoom saved for this document.
    #[arg(long)]
    resume: bool,
    /// Directory for config and saved views.
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,
    /// Write the final frame to this PNG.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    media_width_pt: f32,
    media_height_pt: f32,
    crop_width_pt: f32,
    crop_height_pt: f32,
    rotation: u16,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { open } => run_info(&open),
        Commands::Render(args) => {
            let config = resolve_config(cli.config.as_deref(), None)?;
            run_render(config, &args)
        }
        Commands::View(args) => {
            let storage = match &args.state_dir {
                Some(dir) => Storage::with_root(dir),
                None => Storage::from_default_project()?,
            };
            let config = resolve_config(cli.config.as_deref(), Some(&storage))?;
            run_view(&config, &storage, &args)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn backend() -> Result<impl RenderBackend> {
    Ok(leafview_engine::default_backend())
}

#[cfg(feature = "pdfium")]
fn backend() -> Result<impl RenderBackend> {
    leafview_engine::pdfium_backend::PdfiumBackend::from_system_library()
        .context("failed to load pdfium")
}

fn run_info(open: &OpenArgs) -> Result<()> {
    ensure_pdf_exists(&open.file)?;

    let backend = backend()?;
    let source = OpenSource::from(open.file.as_path());
    let document =
        Document::open(&backend, source, &open.passwords()).context("failed to open PDF")?;
    if !document.is_ok() {
        anyhow::bail!("failed to open PDF: document was rejected by the renderer");
    }

    let page_count = document.page_count();
    let pages = (1..=page_count)
        .map(|page| -> Result<PageOutput> {
            let geometry = document.session().page_geometry(page)?;
            Ok(PageOutput {
                page,
                media_width_pt: geometry.media_width_pt,
                media_height_pt: geometry.media_height_pt,
                crop_width_pt: geometry.crop_width_pt,
                crop_height_pt: geometry.crop_height_pt,
                rotation: geometry.rotation,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(page_count, "read page geometry");

    let payload = InfoOutput { path: open.file.display().to_string(), page_count, pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_render(mut config: ViewerConfig, args: &RenderArgs) -> Result<()> {
    ensure_pdf_exists(&args.open.file)?;

    if args.page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    if let Some((width, height)) = args.viewport {
        config.viewport_width = width;
        config.viewport_height = height;
    }
    if let Some(budget) = args.budget {
        config.cache_budget_bytes = budget;
    }

    let mut view = PageView::new(backend()?, &config);
    view.set_passwords(args.open.passwords());
    if let Some(zoom) = args.zoom {
        view.set_zoom(zoom);
    }

    view.open(OpenSource::from(args.open.file.as_path())).context("failed to open PDF")?;

    if args.page != view.current_page() && !view.goto_page(args.page) {
        anyhow::bail!("page {} out of range (page_count={})", args.page, view.page_count());
    }
    if let Some((dx, dy)) = args.offset {
        view.scroll_by(dx, dy);
    }

    let viewport = view.viewport();
    let mut frame = RgbaImage::new(viewport.width, viewport.height);
    let outcome = view.render(&mut frame).context("failed to render page")?;

    write_png(&frame, &args.output)?;
    println!("{outcome}");

    Ok(())
}

fn run_view(config: &ViewerConfig, storage: &Storage, args: &ViewArgs) -> Result<()> {
    let file = &args.open.file;
    ensure_pdf_exists(file)?;

    let commands = parse_script(&args.commands).context("invalid command script")?;
    let key = fs::canonicalize(file).unwrap_or_else(|_| file.clone());

    tracing::debug!(state_dir = %storage.root().display(), "using state directory");

    let mut controller = ViewerController::new(backend()?, config);
    controller.view_mut().set_passwords(args.open.passwords());
    controller.open(OpenSource::from(file.as_path())).context("failed to open PDF")?;

    if args.resume {
        if let Some(saved) = storage.load_view(&key)? {
            tracing::debug!(page = saved.page, zoom = saved.zoom, "resuming saved view");
            controller.resume(&saved);
        }
    }

    println!("{}", controller.toolbar().label);

    for (index, command) in commands.into_iter().enumerate() {
        controller.apply(command).with_context(|| format!("command {} failed", index + 1))?;
        println!("{}", controller.toolbar().label);
    }

    if let Some(output) = &args.output {
        let viewport = controller.view().viewport();
        let mut frame = RgbaImage::new(viewport.width, viewport.height);
        controller.render(&mut frame).context("failed to render page")?;
        write_png(&frame, output)?;
    }

    storage.save_view(&key, &controller.suspend()).context("failed to save view state")?;

    Ok(())
}

fn resolve_config(explicit: Option<&Path>, storage: Option<&Storage>) -> Result<ViewerConfig> {
    if let Some(path) = explicit {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
        return serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid config {}", path.display()));
    }

    if let Some(storage) = storage {
        return Ok(storage.load_config()?);
    }

    match Storage::from_default_project() {
        Ok(storage) => Ok(storage.load_config()?),
        Err(err) => {
            tracing::warn!(error = %err, "using default config");
            Ok(ViewerConfig::default())
        }
    }
}

fn write_png(frame: &RgbaImage, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    frame.save(output).with_context(|| format!("failed to write image to {}", output.display()))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn parse_zoom(value: &str) -> Result<Zoom, String> {
    if value.eq_ignore_ascii_case("fit") {
        return Ok(Zoom::FitWidth);
    }

    value
        .parse::<f32>()
        .map(Zoom::from_legacy)
        .map_err(|_| format!("expected a scale or `fit`, got `{value}`"))
}

fn parse_offset(value: &str) -> Result<(i64, i64), String> {
    let (x, y) = value.split_once(',').ok_or_else(|| format!("expected X,Y, got `{value}`"))?;
    let x = x.trim().parse().map_err(|_| format!("invalid x offset `{x}`"))?;
    let y = y.trim().parse().map_err(|_| format!("invalid y offset `{y}`"))?;
    Ok((x, y))
}

fn parse_viewport(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width.trim().parse().map_err(|_| format!("invalid width `{width}`"))?;
    let height: u32 = height.trim().parse().map_err(|_| format!("invalid height `{height}`"))?;

    if width == 0 || height == 0 {
        return Err("viewport must be at least 1x1".to_owned());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zoom_values() {
        assert_eq!(parse_zoom("fit"), Ok(Zoom::FitWidth));
        assert_eq!(parse_zoom("1.5"), Ok(Zoom::Scale(1.5)));
        assert_eq!(parse_zoom("-1"), Ok(Zoom::FitWidth));
        assert!(parse_zoom("big").is_err());
    }

    #[test]
    fn parses_offsets_and_viewports() {
        assert_eq!(parse_offset("10,-4"), Ok((10, -4)));
        assert!(parse_offset("10").is_err());

        assert_eq!(parse_viewport("320x240"), Ok((320, 240)));
        assert!(parse_viewport("0x240").is_err());
        assert!(parse_viewport("320").is_err());
    }
}

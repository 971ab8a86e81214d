use std::path::{Path, PathBuf};

use anyhow::Context as _;
use avatar_composer::{
    AssetRef, Canvas, CpuSurface, FsImageLoader, Manifest, RenderOpts, Rgb8, Session,
    scan_assets_dir,
};
use clap::{ArgAction, Parser, Subcommand};
use rand::{SeedableRng as _, rngs::StdRng};

#[derive(Parser, Debug)]
#[command(name = "avatar", version)]
struct Cli {
    /// Log more (repeat for trace output).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan an assets directory and write the asset index JSON.
    Index(IndexArgs),
    /// Resolve a recipe and render it as a PNG.
    Generate(GenerateArgs),
    /// Render the picker thumbnails of one layer.
    Thumbs(ThumbsArgs),
}

#[derive(Parser, Debug)]
struct IndexArgs {
    /// Assets root (one folder per layer).
    #[arg(long)]
    assets: PathBuf,

    /// Manifest JSON listing the layers.
    #[arg(long)]
    manifest: PathBuf,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Asset index JSON.
    #[arg(long)]
    index: PathBuf,

    /// Assets root the index paths are relative to.
    #[arg(long)]
    assets: PathBuf,

    /// Seed for reproducible resolution.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Background color (`#rrggbb`); transparent when omitted.
    #[arg(long)]
    color: Option<String>,

    /// Manual pick applied after resolution: `layer=file`, `layer=mode/file` or `layer=none`.
    #[arg(long = "select")]
    selections: Vec<String>,

    /// Output edge length in pixels.
    #[arg(long, default_value_t = Canvas::PREVIEW.width)]
    size: u32,

    /// Output PNG path; defaults to `avatar-<fingerprint>.png`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ThumbsArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Layer whose picker grid to render.
    #[arg(long)]
    layer: String,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Index(args) => cmd_index(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Thumbs(args) => cmd_thumbs(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn cmd_index(args: IndexArgs) -> anyhow::Result<()> {
    let manifest = Manifest::from_path(&args.manifest)?;
    let index = scan_assets_dir(&args.assets, manifest.layer_names())?;
    let json = index.to_json_pretty()?;

    match args.out {
        Some(out) => {
            create_parent(&out)?;
            std::fs::write(&out, json + "\n")
                .with_context(|| format!("write index '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.session)?.with_render_opts(RenderOpts {
        preview: Canvas::square(args.size),
        ..RenderOpts::default()
    });
    let mut rng = make_rng(args.session.seed);
    session.generate(&mut rng)?;

    for raw in &args.selections {
        let (layer, asset) = parse_selection(raw)?;
        session
            .select_asset(layer, asset)
            .with_context(|| format!("apply selection '{raw}'"))?;
    }
    if let Some(color) = &args.color {
        session.set_background(color.parse::<Rgb8>()?);
    }

    let loader = FsImageLoader::new(&args.session.assets);
    let frame = session.render_preview(&loader, &CpuSurface::default())?;

    let out = match args.out {
        Some(out) => out,
        None => PathBuf::from(
            session
                .export_file_name()
                .context("session has no recipe to name the export after")?,
        ),
    };
    frame.save_png(&out)?;

    if let Some(text) = session.recipe_text() {
        println!("{text}");
    }
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_thumbs(args: ThumbsArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.session)?;
    if let Some(seed) = args.session.seed {
        session.generate(&mut StdRng::seed_from_u64(seed))?;
    }

    let loader = FsImageLoader::new(&args.session.assets);
    let grid = session.thumbnail_grid(&args.layer, &loader, &CpuSurface::default())?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut written = 0usize;
    for (i, entry) in grid.iter().enumerate() {
        let Some(image) = &entry.image else {
            eprintln!("skipped {} (render failed)", entry.candidate);
            continue;
        };
        let name = format!("{i:03}-{}.png", thumb_stem(&entry.candidate));
        image.save_png(args.out_dir.join(name))?;
        written += 1;
    }
    eprintln!("wrote {written} thumbnails to {}", args.out_dir.display());
    Ok(())
}

fn open_session(args: &SessionArgs) -> anyhow::Result<Session> {
    Session::from_paths(&args.manifest, &args.index).with_context(|| {
        format!(
            "load manifest '{}' and index '{}'",
            args.manifest.display(),
            args.index.display()
        )
    })
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn parse_selection(raw: &str) -> anyhow::Result<(&str, AssetRef)> {
    let (layer, asset) = raw
        .split_once('=')
        .with_context(|| format!("selection '{raw}' must look like layer=file"))?;
    Ok((layer.trim(), asset.parse::<AssetRef>()?))
}

fn thumb_stem(candidate: &AssetRef) -> String {
    let text = candidate.to_string();
    let text = text.strip_suffix(".png").unwrap_or(&text);
    text.replace('/', "_")
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "motionreel", version)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the export resolution for a template size as `W H scale`.
    Resolution(ResolutionArgs),
    /// Export a template headlessly; handshake events go to stdout as JSON lines.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ResolutionArgs {
    #[arg(long)]
    width: f64,

    #[arg(long)]
    height: f64,

    /// Pixel length of the longer output side.
    #[arg(long, default_value_t = motionreel::ExportSettings::default().ideal_resolution)]
    ideal: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RecorderKind {
    /// Keep raw frames in memory.
    Memory,
    /// Encode with `ffmpeg` from PATH.
    Ffmpeg,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Size identifier; names the exported asset.
    #[arg(long)]
    size_id: String,

    /// Container: webm, mp4 or gif.
    #[arg(long, default_value = "webm")]
    extension: motionreel::ExportFormat,

    /// Recording length; defaults to the template's own timing.
    #[arg(long)]
    duration_ms: Option<f64>,

    #[arg(long, default_value_t = motionreel::ExportSettings::default().frame_rate)]
    fps: u32,

    #[arg(long, value_enum, default_value_t = RecorderKind::Memory)]
    recorder: RecorderKind,

    /// Also write the decoded video and poster into this directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.cmd {
        Command::Resolution(args) => cmd_resolution(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_resolution(args: ResolutionArgs) -> anyhow::Result<()> {
    let res = motionreel::Resolution::fit(args.width, args.height, args.ideal)?;
    println!("{} {} {}", res.width, res.height, res.scale);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut template = motionreel::TemplateDoc::from_path(&args.template)?;
    template.size_id = Some(args.size_id.clone());
    let base_dir = args
        .template
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let settings = motionreel::ExportSettings {
        duration_ms: args.duration_ms,
        frame_rate: args.fps,
        format: args.extension,
        ..motionreel::ExportSettings::default()
    };

    let recorder: Box<dyn motionreel::Recorder> = match args.recorder {
        RecorderKind::Memory => Box::new(motionreel::MemoryRecorder::default()),
        RecorderKind::Ffmpeg => {
            if !motionreel::is_ffmpeg_on_path() {
                anyhow::bail!("ffmpeg recorder requested but `ffmpeg` is not on PATH");
            }
            let work_dir = args.out.clone().unwrap_or_else(std::env::temp_dir);
            std::fs::create_dir_all(&work_dir)
                .with_context(|| format!("create work dir '{}'", work_dir.display()))?;
            Box::new(motionreel::FfmpegRecorder::new(
                motionreel::FfmpegRecorderOpts::new(work_dir),
            ))
        }
    };

    let session = motionreel::ExportSession::new(template, settings).with_base_dir(base_dir);
    let stdout = std::io::stdout();
    let mut handshake =
        motionreel::CompletionHandshake::new(motionreel::JsonLinesHandshake::new(stdout.lock()));
    let clock = motionreel::SystemClock::new();

    let outcome = session
        .run(recorder, &mut handshake, &clock)
        .with_context(|| format!("export '{}'", args.template.display()))?;

    match outcome {
        motionreel::ExportOutcome::Delivered(output) => {
            eprintln!(
                "exported {} frames at {}x{} (digest {:016x})",
                output.report.captured_frames,
                output.resolution.width,
                output.resolution.height,
                output.report.digest
            );
            if let Some(dir) = &args.out
                && let Err(e) = write_assets(dir, &args.size_id, args.extension, &output.asset)
            {
                handshake.report_delivery_failure()?;
                return Err(e);
            }
        }
        motionreel::ExportOutcome::Cancelled { .. } => eprintln!("export cancelled"),
    }
    Ok(())
}

fn write_assets(
    dir: &Path,
    size_id: &str,
    format: motionreel::ExportFormat,
    asset: &motionreel::FinalAsset,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output dir '{}'", dir.display()))?;

    let video = dir.join(format!("{size_id}.{}", format.extension()));
    std::fs::write(&video, &asset.video)
        .with_context(|| format!("write video '{}'", video.display()))?;
    let poster = dir.join(format!("{size_id}.jpg"));
    std::fs::write(&poster, &asset.poster)
        .with_context(|| format!("write poster '{}'", poster.display()))?;

    eprintln!("wrote {} and {}", video.display(), poster.display());
    Ok(())
}

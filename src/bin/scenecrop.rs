use std::{path::PathBuf, time::SystemTime};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "scenecrop", version)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract artifacts for every stale scene directory.
    Run(RunArgs),
    /// Report what `run` would do without writing anything.
    Status(SelectArgs),
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// A scene directory, or a directory of scene directories.
    #[arg(long)]
    root: PathBuf,

    /// Pipeline config JSON; defaults apply to omitted fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Artifact kinds to produce (repeatable); overrides the config.
    #[arg(long = "kind", value_enum)]
    kinds: Vec<KindChoice>,

    /// Only process sub-directories with these names (repeatable).
    #[arg(long = "case")]
    cases: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Regenerate directories even when they are up to date.
    #[arg(long)]
    force: bool,

    /// Process directories on a worker pool, one session per worker.
    #[arg(long)]
    parallel: bool,

    /// Worker count for `--parallel` (default: one per CPU).
    #[arg(long)]
    threads: Option<usize>,

    /// Keep scratch and obsolete output directories.
    #[arg(long)]
    no_tidy: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Seg,
    Crop,
    Transp,
}

impl From<KindChoice> for scenecrop::ArtifactKind {
    fn from(k: KindChoice) -> Self {
        match k {
            KindChoice::Seg => Self::SegImage,
            KindChoice::Crop => Self::CropImage,
            KindChoice::Transp => Self::TranspImage,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Status(args) => cmd_status(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_pipeline(select: &SelectArgs) -> anyhow::Result<scenecrop::PipelineConfig> {
    let mut cfg = match &select.config {
        Some(path) => scenecrop::PipelineConfig::from_path(path)?,
        None => scenecrop::PipelineConfig::default(),
    };
    if !select.kinds.is_empty() {
        cfg.kinds = select.kinds.iter().map(|&k| k.into()).collect();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn scene_dirs(select: &SelectArgs) -> anyhow::Result<Vec<PathBuf>> {
    let dirs = scenecrop::discover_scene_dirs(&select.root, &select.cases)
        .with_context(|| format!("scan '{}'", select.root.display()))?;
    if dirs.is_empty() {
        anyhow::bail!("no scene directories under '{}'", select.root.display());
    }
    Ok(dirs)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let pipeline = load_pipeline(&args.select)?;
    let dirs = scene_dirs(&args.select)?;
    let opts = scenecrop::BatchOptions {
        pipeline,
        force: args.force,
        tidy: !args.no_tidy,
        parallel: args.parallel,
        threads: args.threads,
    };

    tracing::info!(dirs = dirs.len(), parallel = opts.parallel, "starting batch");
    let report = scenecrop::run_batch(&dirs, scenecrop::SnapshotSession::new, &opts)?;

    for dir in &report.dirs {
        if let scenecrop::DirOutcome::Failed(msg) = &dir.outcome {
            eprintln!("failed {}: {msg}", dir.scene_dir.display());
        }
    }
    eprintln!(
        "{} processed, {} skipped, {} failed, {} artifacts written",
        report.processed(),
        report.skipped(),
        report.failed(),
        report.written()
    );
    if report.failed() > 0 {
        anyhow::bail!("{} scene directories failed", report.failed());
    }
    Ok(())
}

fn cmd_status(args: SelectArgs) -> anyhow::Result<()> {
    let pipeline = load_pipeline(&args)?;
    let now = SystemTime::now();
    for dir in scene_dirs(&args)? {
        let plan = match scenecrop::plan_dir(&dir, &pipeline, now) {
            Ok(plan) => plan,
            Err(e) => {
                println!("{}: error: {e}", dir.display());
                continue;
            }
        };
        let verdict = if plan.decision.is_skip() {
            "up to date"
        } else {
            "stale"
        };
        println!(
            "{}: {verdict} (marker {:?}, expected {})",
            dir.display(),
            plan.decision.marker,
            plan.decision.expected
        );
        for kind in &plan.decision.kinds {
            println!("    {:<12} {}", kind.kind.as_str(), kind.existing);
        }
        if !plan.index.rejected().is_empty() {
            println!("    {} malformed object keys", plan.index.rejected().len());
        }
    }
    Ok(())
}

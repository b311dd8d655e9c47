use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cocotext_inspect::app::{App, PrepareOptions, PrepareResult, ShowResult};
use cocotext_inspect::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use cocotext_inspect::error::CocoError;
use cocotext_inspect::fetch::{FetchOutcome, HttpDownloader};
use cocotext_inspect::output::{JsonOutput, OutputMode};
use cocotext_inspect::progress::{ConsoleProgress, ProgressSink};
use cocotext_inspect::render::{FileExport, Presenter, SystemViewer};

#[derive(Parser)]
#[command(name = "cocotext")]
#[command(about = "Download COCO-Text and draw its text annotations over training images")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (defaults to ./cocotext.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding the archives and extracted dataset
    #[arg(long, global = true)]
    base_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download and extract the dataset archives")]
    Prepare(PrepareArgs),
    #[command(about = "List images matching the file-name prefix")]
    List(ListArgs),
    #[command(about = "Draw the annotations of one selected image")]
    Show(ShowArgs),
}

#[derive(Args)]
struct PrepareArgs {
    /// Extract archives even if their contents are already on disk
    #[arg(long)]
    force_extract: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SelectionArgs {
    /// File-name prefix to filter images by
    #[arg(long)]
    prefix: Option<String>,

    /// Only keep images with at least one annotation
    #[arg(long)]
    annotated_only: bool,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ShowArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Position within the filtered images
    #[arg(long)]
    index: Option<usize>,

    /// Write the rendered image here instead of opening a viewer
    #[arg(long)]
    output: Option<String>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CocoError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CocoError) -> u8 {
    match error {
        CocoError::SelectionOutOfRange { .. } => 2,
        CocoError::Http(_) | CocoError::HttpStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base = ConfigLoader::resolve(cli.config.as_deref())?;
    let global = ConfigOverrides {
        base_dir: cli.base_dir.clone(),
        ..ConfigOverrides::default()
    };

    match cli.command {
        Some(Commands::Prepare(args)) => {
            let config = base.apply(&global);
            let mode = output_mode(args.json);
            let app = App::new(config, SystemViewer);
            let options = PrepareOptions {
                force_extract: args.force_extract,
            };
            let downloader = HttpDownloader::new()?;
            let result = app.prepare(&downloader, &options, sink_for(mode).as_ref())?;
            match mode {
                OutputMode::Json => JsonOutput::print_prepare(&result).into_diagnostic()?,
                OutputMode::Human => print_prepare_summary(&result),
            }
            Ok(())
        }
        Some(Commands::List(args)) => {
            let config = base.apply(&selection_overrides(&global, &args.selection, None));
            let app = App::new(config, SystemViewer);
            let result = app.list()?;
            match output_mode(args.json) {
                OutputMode::Json => JsonOutput::print_list(&result).into_diagnostic()?,
                OutputMode::Human => {
                    for image in &result.images {
                        println!("{}\t{}", image.id, image.file_name);
                    }
                    println!("{} images match '{}'", result.total, result.prefix);
                }
            }
            Ok(())
        }
        Some(Commands::Show(args)) => {
            let config =
                base.apply(&selection_overrides(&global, &args.selection, args.index));
            let presenter: Box<dyn Presenter> = match &args.output {
                Some(path) => Box::new(FileExport::new(path)),
                None => Box::new(SystemViewer),
            };
            let app = App::new(config, presenter);
            let result = app.show()?;
            match output_mode(args.json) {
                OutputMode::Json => JsonOutput::print_show(&result).into_diagnostic()?,
                OutputMode::Human => print_show_summary(&result),
            }
            Ok(())
        }
        None => run_scenario(base.apply(&global)),
    }
}

fn run_scenario(config: ResolvedConfig) -> miette::Result<()> {
    let app = App::new(config, SystemViewer);
    let progress = ConsoleProgress::new();
    let downloader = HttpDownloader::new()?;
    let prepared = app.prepare(&downloader, &PrepareOptions::default(), &progress)?;
    print_prepare_summary(&prepared);
    let result = app.show()?;
    print_show_summary(&result);
    Ok(())
}

fn selection_overrides(
    global: &ConfigOverrides,
    selection: &SelectionArgs,
    index: Option<usize>,
) -> ConfigOverrides {
    ConfigOverrides {
        base_dir: global.base_dir.clone(),
        prefix: selection.prefix.clone(),
        selection_index: index,
        annotated_only: selection.annotated_only,
    }
}

fn output_mode(json: bool) -> OutputMode {
    if json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn sink_for(mode: OutputMode) -> Box<dyn ProgressSink> {
    match mode {
        OutputMode::Json => Box::new(JsonOutput),
        OutputMode::Human => Box::new(ConsoleProgress::new()),
    }
}

fn print_prepare_summary(result: &PrepareResult) {
    for outcome in &result.downloads {
        match outcome {
            FetchOutcome::Cached { path } => println!("cached      {}", path.display()),
            FetchOutcome::Downloaded { path, bytes } => {
                println!("downloaded  {} ({bytes} bytes)", path.display())
            }
            FetchOutcome::Failed { path, message } => {
                println!("failed      {} ({message})", path.display())
            }
        }
    }
    for item in &result.extractions {
        match item.entries {
            Some(entries) => println!("{:<11} {} ({entries} entries)", item.action, item.archive),
            None => println!("{:<11} {}", item.action, item.archive),
        }
    }
}

fn print_show_summary(result: &ShowResult) {
    println!("{}", result.image_id);
    println!("{}", result.matched);
    println!(
        "{} with {} annotation(s)",
        result.file_name,
        result.annotations.len()
    );
}

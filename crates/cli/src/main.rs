use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::ArgAction;
use clap::{Args, Parser, Subcommand, ValueEnum};
use storage_inspector_core::{
    backend_for, human_bytes, load_config, render_directory_page, render_drive_table,
    InspectorConfig, SizeBackendKind, SortMode,
};
use storage_inspector_service::{
    ApiResponse, CompressRequest, DirectoryQuery, InspectorService, RemoveFileRequest,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "storage-inspector",
    version,
    about = "Inspect drives and directories, rank entries by size or recency, and suggest cleanup candidates."
)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drive usage percent at or above which removal candidates are suggested.
    #[arg(long, global = true, value_name = "PERCENT")]
    threshold: Option<f32>,

    /// Subdirectory size backend (`native` or `pdu-library`).
    #[arg(long, global = true)]
    backend: Option<CliBackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List mounted drives with usage statistics.
    Drives(OutputArgs),
    /// List a directory's children with sizes, timestamps and removal suggestions.
    List(ListArgs),
    /// Suggest least-recently-accessed files when the drive is nearly full.
    Suggest(PathArgs),
    /// Compute the recursive size of a directory.
    Size(PathArgs),
    /// Delete a single file.
    Remove(RemoveArgs),
    /// Zip files and directories into their common parent.
    Compress(CompressArgs),
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliBackendKind {
    Native,
    #[value(name = "pdu_library", alias = "pdu-library", alias = "pdu")]
    PduLibrary,
}

impl From<CliBackendKind> for SizeBackendKind {
    fn from(value: CliBackendKind) -> Self {
        match value {
            CliBackendKind::Native => SizeBackendKind::Native,
            CliBackendKind::PduLibrary => SizeBackendKind::PduLibrary,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliSortMode {
    Size,
    Recent,
    Least,
}

impl From<CliSortMode> for SortMode {
    fn from(value: CliSortMode) -> Self {
        match value {
            CliSortMode::Size => SortMode::BySize,
            CliSortMode::Recent => SortMode::ByRecentAccess,
            CliSortMode::Least => SortMode::ByLeastRecentAccess,
        }
    }
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Print the JSON payload instead of the rendered summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Directory to list.
    #[arg(long, value_name = "PATH")]
    path: PathBuf,

    /// Sort order for files and directories.
    #[arg(long, default_value = "size")]
    sort: CliSortMode,

    /// Print the bare listing (no suggestions) as JSON.
    #[arg(long)]
    api: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct PathArgs {
    #[arg(long, value_name = "PATH")]
    path: PathBuf,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// File to delete.
    #[arg(long, value_name = "FILE")]
    file: PathBuf,
}

#[derive(Debug, Args)]
struct CompressArgs {
    /// File or directory to include (repeatable).
    #[arg(long = "item", value_name = "PATH", num_args = 1.., action = ArgAction::Append, required = true)]
    items: Vec<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if let Commands::Size(args) = &cli.command {
        return run_size_command(&config, args);
    }

    let service = InspectorService::new(config)?;
    match cli.command {
        Commands::Drives(args) => run_drives_command(&service, args),
        Commands::List(args) => run_list_command(&service, args),
        Commands::Suggest(args) => run_suggest_command(&service, args),
        Commands::Remove(args) => run_remove_command(&service, args),
        Commands::Compress(args) => run_compress_command(&service, args),
        Commands::Size(_) => Ok(()),
    }
}

fn resolve_config(cli: &Cli) -> Result<InspectorConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => InspectorConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.removal_threshold_percent = threshold;
    }
    if let Some(backend) = cli.backend {
        config.size_backend = backend.into();
    }
    config.validate()?;
    debug!(
        "threshold {:.1}%, size backend {:?}, cache capacity {}",
        config.removal_threshold_percent, config.size_backend, config.cache_capacity
    );
    Ok(config)
}

fn run_drives_command(service: &InspectorService, args: OutputArgs) -> Result<()> {
    if args.json {
        return print_response(&service.home());
    }
    print!("{}", render_drive_table(&service.drives()));
    Ok(())
}

fn run_list_command(service: &InspectorService, args: ListArgs) -> Result<()> {
    let query = DirectoryQuery {
        path: args.path.to_string_lossy().to_string(),
        sort: SortMode::from(args.sort).as_str().to_string(),
    };

    if args.api {
        return print_response(&service.api_directory(&query));
    }
    if args.output.json {
        return print_response(&service.directory_view(&query));
    }

    match service.directory_page(&query) {
        Ok(page) => {
            print!(
                "{}",
                render_directory_page(&page.directory, &page.data, &page.suggestions)
            );
            Ok(())
        }
        Err(response) => print_response(&response),
    }
}

fn run_suggest_command(service: &InspectorService, args: PathArgs) -> Result<()> {
    let query = DirectoryQuery {
        path: args.path.to_string_lossy().to_string(),
        sort: SortMode::ByLeastRecentAccess.as_str().to_string(),
    };
    match service.directory_page(&query) {
        Ok(page) => {
            if page.suggestions.is_empty() {
                println!(
                    "No removal suggestions: no drive holding {} is at or above {:.1}% usage.",
                    page.directory,
                    service.config().removal_threshold_percent
                );
                return Ok(());
            }
            println!("Removal suggestions for {}:", page.directory);
            for file in &page.suggestions {
                println!("- {} ({})", file.path, human_bytes(file.size_bytes));
            }
            Ok(())
        }
        Err(response) => print_response(&response),
    }
}

fn run_size_command(config: &InspectorConfig, args: &PathArgs) -> Result<()> {
    if !args.path.exists() {
        bail!("path does not exist: {}", args.path.display());
    }
    let backend = backend_for(&config.size_backend);
    let measured = backend.measure(&args.path);
    println!(
        "{}: {} ({} bytes, backend {:?})",
        args.path.display(),
        human_bytes(measured.total_bytes),
        measured.total_bytes,
        backend.kind()
    );
    if !measured.skipped.is_empty() {
        println!("Skipped {} unreadable entries.", measured.skipped.len());
    }
    Ok(())
}

fn run_remove_command(service: &InspectorService, args: RemoveArgs) -> Result<()> {
    let request = RemoveFileRequest {
        file_path: args.file.to_string_lossy().to_string(),
    };
    print_response(&service.remove_file(&request))
}

fn run_compress_command(service: &InspectorService, args: CompressArgs) -> Result<()> {
    let request = CompressRequest {
        items: args
            .items
            .iter()
            .map(|item| item.to_string_lossy().to_string())
            .collect(),
    };
    print_response(&service.compress(&request))
}

fn print_response(response: &ApiResponse) -> Result<()> {
    let payload =
        serde_json::to_string_pretty(&response.body).context("failed to serialize response")?;
    println!("{payload}");
    if !response.is_success() {
        bail!("request failed with status {}", response.status);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

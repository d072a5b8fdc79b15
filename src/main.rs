use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use media_viewer::logging::{self, LogConfig};
use media_viewer::settings::keys;
use media_viewer::state::{FolderIndex, FolderModel, FolderRole, RoleValue, SortKey, SortOrder};
use media_viewer::thumbnail::{ThumbnailOrigin, ThumbnailSize};
use media_viewer::{AppContext, AppError, Settings};

#[derive(Parser, Debug)]
#[command(name = "media-viewer", version, about = "Browse folders, media lists and thumbnails")]
struct Cli {
    /// Log filter, e.g. `info` or `media_viewer=debug`
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also write daily log files into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the media files of a folder
    List {
        folder: PathBuf,
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Defaults to the persisted `Media.SortOrder`
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
    },
    /// Print the folder tree below one or more roots
    Tree {
        #[arg(required = true)]
        roots: Vec<PathBuf>,
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
    /// Generate thumbnails for every media file of a folder
    Thumbs {
        folder: PathBuf,
        /// Edge length of the bounding box; defaults to `Media.ThumbnailSize`
        #[arg(long)]
        size: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Name,
    Size,
    Date,
    Type,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => SortOrder::Ascending,
            OrderArg::Desc => SortOrder::Descending,
        }
    }
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Size => SortKey::Size,
            SortArg::Date => SortKey::Date,
            SortArg::Type => SortKey::Type,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level.clone(),
        log_dir: cli.log_dir.clone(),
    };
    let _guard = match logging::init(&log_config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("media-viewer: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("media-viewer: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let mut ctx = AppContext::new(Arc::new(Settings::open(settings_path)?))?;

    match cli.command {
        Command::List {
            folder,
            sort,
            order,
        } => {
            let key = sort.map_or(ctx.media().sort_key(), SortKey::from);
            let order = order.map_or(ctx.media().sort_order(), SortOrder::from);
            ctx.set_sort(key, order)?;
            ctx.open_folder(&folder)?;

            for entry in ctx.media().entries().iter() {
                println!(
                    "{:<40} {:>12} {}  {:?}",
                    entry.name,
                    entry.size,
                    entry.modified.format("%Y-%m-%d %H:%M"),
                    entry.kind
                );
            }
        }
        Command::Tree { roots, depth } => {
            ctx.show_folders(&roots, depth);
            for row in 0..ctx.folders().row_count(None) {
                if let Some(index) = ctx.folders().index(row, None) {
                    print_folder(ctx.folders(), index, 0);
                }
            }
        }
        Command::Thumbs { folder, size } => {
            let edge = size.unwrap_or_else(|| ctx.settings().get_or(keys::THUMBNAIL_SIZE, 0));
            let size = ThumbnailSize::square(edge);
            ctx.open_folder(&folder)?;

            let requests: Vec<_> = ctx
                .media()
                .entries()
                .iter()
                .map(|entry| (entry.name.clone(), ctx.thumbnails().request(&entry.path, size)))
                .collect();

            for (name, request) in requests {
                match ctx.block_on(request) {
                    Ok(thumbnail) => {
                        let origin = match thumbnail.origin {
                            ThumbnailOrigin::Generated => "generated",
                            ThumbnailOrigin::DiskCache => "cached",
                        };
                        println!(
                            "{name}: {}x{} ({origin})",
                            thumbnail.image.width(),
                            thumbnail.image.height()
                        );
                    }
                    Err(err) => println!("{name}: {err}"),
                }
            }
        }
    }

    ctx.shutdown()
}

fn print_folder(model: &FolderModel, index: FolderIndex, level: usize) {
    let name = match model.data(index, FolderRole::Name) {
        Some(RoleValue::Text(name)) => name,
        _ => String::new(),
    };
    let count = match model.data(index, FolderRole::MediaCount) {
        Some(RoleValue::Count(count)) => count,
        _ => 0,
    };
    println!("{:indent$}{name} ({count})", "", indent = level * 2);

    for row in 0..model.row_count(Some(index)) {
        if let Some(child) = model.index(row, Some(index)) {
            print_folder(model, child, level + 1);
        }
    }
}

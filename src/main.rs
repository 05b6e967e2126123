use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use humansize::{DECIMAL, format_size};
use offline_shelf::{
    DownloadLibrary, DownloadedItems, DownloadedShow, LibraryConfig, OfflineShelfError, ScanEvent,
};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "offline-shelf",
    version,
    about = "Browse and manage downloaded shows and movies"
)]
struct Cli {
    /// Downloads folder to operate on (defaults to the platform data directory)
    #[arg(long, global = true, env = "OFFLINE_SHELF_DOWNLOADS_ROOT")]
    downloads_root: Option<PathBuf>,

    /// Increase log output (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List downloaded shows and movies
    List {
        /// Print the full library as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the seasons and episodes of one downloaded show
    Show {
        /// Show identifier
        id: String,
    },
    /// Delete one downloaded item
    Delete {
        /// Item folder identifier
        id: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Delete every download
    DeleteAll {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Print storage used by downloads
    Usage,
}

/// Errors surfaced by the command line front end
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Library(#[from] OfflineShelfError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No downloaded show with id '{0}'")]
    ShowNotFound(String),

    #[error("Could not delete '{0}'")]
    DeleteFailed(String),
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "offline_shelf=warn",
        1 => "offline_shelf=info",
        _ => "offline_shelf=debug",
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Reports folders the scan had to skip
fn handle_scan_event(event: ScanEvent) {
    match event {
        ScanEvent::SeasonSkipped { path, reason } => {
            eprintln!("Skipped season {}: {}", path.display(), reason);
        }
        ScanEvent::ItemSkipped { item_id, reason } => {
            eprintln!("Skipped item {}: {}", item_id, reason);
        }
        ScanEvent::Started { .. } | ScanEvent::ScanningItem { .. } | ScanEvent::Complete { .. } => {}
    }
}

fn print_library(items: &DownloadedItems) {
    if items.is_empty() {
        println!("No downloads found.");
        return;
    }

    if !items.shows.is_empty() {
        println!("=== Shows ===\n");
        for show in &items.shows {
            println!(
                "{}  [{}]  {} season(s), {} episode(s)",
                show.display_title,
                show.id,
                show.seasons.len(),
                show.episode_count()
            );
        }
        println!();
    }

    if !items.movies.is_empty() {
        println!("=== Movies ===\n");
        for movie in &items.movies {
            let year = movie
                .item
                .production_year
                .map(|year| format!(" ({year})"))
                .unwrap_or_default();
            println!(
                "{}{}  [{}]  {} version(s)",
                movie.display_title(),
                year,
                movie.id,
                movie.versions.len()
            );
        }
        println!();
    }

    println!("{} playable item(s)", items.item_count());
}

fn print_show(show: &DownloadedShow) {
    println!("=== {} ===", show.display_title);

    for season in &show.seasons {
        println!("\nSeason {}", season.season_number);
        for episode in &season.episodes {
            let number = episode
                .episode_number()
                .map(|n| format!("E{n:02}"))
                .unwrap_or_else(|| "E??".to_string());
            let runtime = episode
                .episode_item
                .runtime_minutes()
                .map(|minutes| format!(" ({minutes} min)"))
                .unwrap_or_default();
            println!("  {} - {}{}", number, episode.display_title(), runtime);
            println!("    File: {}", episode.media_path.display());

            if let Some(overview) = &episode.episode_item.overview {
                let text = nanohtml2text::html2text(overview);
                let text = text.trim();
                if !text.is_empty() {
                    println!("    {}", text);
                }
            }
        }
    }
}

fn confirm(prompt: &str, skip: bool) -> Result<bool, CliError> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = LibraryConfig::resolve(cli.downloads_root).map_err(OfflineShelfError::from)?;
    let library = DownloadLibrary::new(config);

    match cli.command.unwrap_or(Command::List { json: false }) {
        Command::List { json } => {
            let items = library.load_with_progress(handle_scan_event);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_library(&items);
            }
        }
        Command::Show { id } => {
            let items = library.load_with_progress(handle_scan_event);
            let show = items.show(&id).ok_or(CliError::ShowNotFound(id.clone()))?;
            print_show(show);
        }
        Command::Delete { id, yes } => {
            if !library.is_item_downloaded(&id) {
                println!("Nothing downloaded for '{}'.", id);
                return Ok(());
            }
            if !confirm(&format!("Delete download '{id}'?"), yes)? {
                println!("Aborted.");
                return Ok(());
            }
            if !library.delete_item(&id) {
                return Err(CliError::DeleteFailed(id));
            }
            println!("Deleted '{}'.", id);
        }
        Command::DeleteAll { yes } => {
            if !confirm("Delete ALL downloads?", yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let removed = library.delete_all().map_err(OfflineShelfError::from)?;
            println!("Deleted {} download(s).", removed);
        }
        Command::Usage => {
            println!("Downloads folder: {}\n", library.config().downloads_root().display());
            for id in library.downloaded_item_ids() {
                match library.download_size(&id) {
                    Some(bytes) => println!("{:>12}  {}", format_size(bytes, DECIMAL), id),
                    None => println!("{:>12}  {}", "?", id),
                }
            }
            match library.total_download_size() {
                Some(bytes) => println!("\nTotal: {}", format_size(bytes, DECIMAL)),
                None => println!("\nTotal: unknown"),
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

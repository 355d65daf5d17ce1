use clap::{Parser, Subcommand};
use mediafind_core::albums::{AlbumError, AlbumRegistry};
use mediafind_core::common::{BatchKind, SearchResponse};
use mediafind_core::config::Config;
use mediafind_core::media_file::{select_media_files, MediaFile};
use mediafind_core::search::{SearchDispatcher, SearchError, SearchForm, SearchOutcome};
use mediafind_core::transport::{HttpTransport, InMemoryTransport, TransportError, TransportPort};
use mediafind_core::upload::{UploadError, UploadOrchestrator, UploadProgress, UploadQueue};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// mediafind: upload media to a search index and query it by text or example.
#[derive(Parser)]
#[command(name = "mediafind")]
struct Args {
    /// Path to a YAML config file. Defaults to <config dir>/mediafind/config.yaml.
    #[arg(long, env = "MEDIAFIND_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the media index API. Overrides the config file.
    #[arg(long)]
    api_url: Option<String>,

    /// Use a throwaway in-memory index instead of the HTTP API.
    #[arg(long)]
    offline: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show server version, media count and supported types.
    Info,
    /// List albums.
    Albums,
    /// Create an album.
    CreateAlbum { name: String },
    /// Upload image and video files.
    Upload {
        /// Album to add the files to.
        #[arg(long)]
        album: Option<String>,
        /// JSON object stored with every file.
        #[arg(long)]
        metadata: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Search by text, or by an example file when --file is given.
    Search {
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        max_results: Option<u32>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Album(#[from] AlbumError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("no files to upload")]
    NothingToUpload,
    #[error("all {0} upload(s) failed")]
    AllUploadsFailed(usize),
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() {
    configure_logging();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).unwrap_or_else(|e| {
        error!("Failed to load config: {e}");
        std::process::exit(1);
    });
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }

    let transport: Arc<dyn TransportPort> = if args.offline {
        info!("Using in-memory index");
        Arc::new(InMemoryTransport::with_sample_albums())
    } else {
        info!("Using media index at {}", config.api_url);
        Arc::new(HttpTransport::from_config(&config))
    };

    if let Err(e) = run(args.command, args.json, &config, transport).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(
    command: Command,
    json: bool,
    config: &Config,
    transport: Arc<dyn TransportPort>,
) -> Result<(), CliError> {
    let albums = AlbumRegistry::new(transport.clone());

    match command {
        Command::Info => {
            let info = transport.server_info().await?;
            if json {
                print_json(&info);
                return Ok(());
            }
            println!("version:         {}", info.version);
            println!("media:           {}", info.total_media_count);
            println!("supported types: {}", info.supported_types.join(", "));
            println!("albums:          {}", info.albums.len());
        }
        Command::Albums => {
            let list = albums.refresh().await?;
            if json {
                print_json(&list);
                return Ok(());
            }
            for album in &list {
                println!("{}\t{} ({})", album.id, album.name, album.media_count);
            }
        }
        Command::CreateAlbum { name } => {
            let album = albums.create(&name).await?;
            println!("{}\t{}", album.id, album.name);
        }
        Command::Upload {
            album,
            metadata,
            files,
        } => {
            upload(config, transport, albums, album, metadata, files).await?;
        }
        Command::Search {
            text,
            file,
            album,
            max_results,
        } => {
            if album.is_some() {
                if let Err(e) = albums.refresh().await {
                    warn!("Could not load albums: {e}");
                }
            }
            let dispatcher = SearchDispatcher::new(transport).with_albums(albums);
            let form = SearchForm {
                text,
                file: file.map(MediaFile::from_path),
            };
            let max_results = max_results.unwrap_or(config.default_max_results);

            match dispatcher
                .search(form.into_query(), max_results, album.as_deref())
                .await?
            {
                SearchOutcome::Skipped => info!("Nothing to search for"),
                SearchOutcome::Applied(response) | SearchOutcome::Stale(response) => {
                    if json {
                        print_json(&response);
                    } else {
                        print_results(&response);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn upload(
    config: &Config,
    transport: Arc<dyn TransportPort>,
    albums: AlbumRegistry,
    album: Option<String>,
    metadata: Option<String>,
    paths: Vec<PathBuf>,
) -> Result<(), CliError> {
    let picked = paths.into_iter().map(MediaFile::from_path).collect();
    let (files, rejected) = select_media_files(picked, config.max_upload_bytes).await;
    for reject in &rejected {
        warn!("Skipping {}: {}", reject.file.file_name, reject.reason);
    }
    if files.is_empty() {
        return Err(CliError::NothingToUpload);
    }

    if album.is_some() {
        if let Err(e) = albums.refresh().await {
            warn!("Could not load albums: {e}");
        }
    }

    let mut orchestrator = UploadOrchestrator::new(transport)
        .with_albums(albums)
        .with_queue(UploadQueue::new(config.upload_concurrency));
    let mut progress = orchestrator.subscribe();
    let reporter = tokio::spawn(async move {
        while let Some(event) = progress.recv().await {
            if let UploadProgress::FileProgress {
                file_name,
                succeeded,
                percent,
                ..
            } = event
            {
                let status = if succeeded { "ok" } else { "failed" };
                info!("[{:>3}%] {} {}", percent, file_name, status);
            }
        }
    });

    let outcome = orchestrator
        .upload_batch(files, album.as_deref(), metadata.as_deref())
        .await;
    let retained: Vec<PathBuf> = orchestrator
        .retained_files()
        .iter()
        .filter_map(|f| f.path().map(|p| p.to_path_buf()))
        .collect();
    drop(orchestrator);
    reporter.await.ok();
    let outcome = outcome?;

    match outcome.kind {
        BatchKind::AllSucceeded => {
            println!("Uploaded {} file(s)", outcome.total);
        }
        BatchKind::PartialSuccess {
            success_count,
            total,
        } => {
            println!("Uploaded {success_count} of {total} file(s). To retry:");
            for path in retained {
                println!("  {}", path.display());
            }
        }
        BatchKind::AllFailed => return Err(CliError::AllUploadsFailed(outcome.total)),
        BatchKind::Empty => {}
    }
    for id in &outcome.media_ids {
        println!("{id}");
    }
    Ok(())
}

fn print_results(response: &SearchResponse) {
    for result in &response.results {
        println!(
            "{:.3}\t{}\t{}\t{}",
            result.score, result.media_id, result.media_type, result.url
        );
    }
    if response.truncated {
        println!(
            "Showing {} of {} results",
            response.len(),
            response.total_results
        );
    } else {
        println!("{} result(s)", response.len());
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("Failed to encode output: {e}"),
    }
}

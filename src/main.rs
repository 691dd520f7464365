use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use apidex::card::TextTarget;
use apidex::channel::ChannelState;
use apidex::config::Settings;
use apidex::dataset::{self, RawDataset};
use apidex::viewer::Viewer;
use apidex::{ApidexError, Result};

type TerminalViewer = Viewer<TextTarget<Stdout>>;

#[derive(Parser, Debug)]
#[command(name = "apidex")]
#[command(about = "Filter an API-reference dataset with boolean expressions")]
#[command(version)]
struct Args {
    /// Dataset JSON file (overrides the config file)
    #[arg(short, long)]
    dataset: Option<PathBuf>,
    /// Config file (defaults to ./apidex.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Run a single query, print the first batch and exit
    #[arg(short, long)]
    query: Option<String>,
    /// Number of results rendered per batch
    #[arg(long)]
    batch_size: Option<usize>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dataset) = args.dataset {
        settings.dataset = Some(dataset);
    }
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size;
    }

    // RUST_LOG wins over the configured filter; logs go to stderr, cards to stdout
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).compact().init();

    match run(args.query, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "apidex failed");
            ExitCode::FAILURE
        }
    }
}

fn run(query: Option<String>, settings: Settings) -> Result<()> {
    let path = settings.dataset.clone().ok_or_else(|| {
        ApidexError::Config("No dataset given, use --dataset or set `dataset` in apidex.toml".into())
    })?;
    let dataset = dataset::load(&path)?;
    let viewer = Viewer::spawn(TextTarget::new(io::stdout()), &settings)?;
    match query {
        Some(query) => one_shot(viewer, dataset, &query),
        None => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| ApidexError::Channel(format!("Failed to start runtime: {e}")))?;
            runtime.block_on(interactive(viewer, dataset))
        }
    }
}

fn one_shot(mut viewer: TerminalViewer, dataset: RawDataset, query: &str) -> Result<()> {
    // held until the worker reports init_complete, then submitted
    viewer.set_query(query);
    viewer.load(dataset);
    // init_complete, then the query's result
    for _ in 0..2 {
        if !viewer.wait() {
            return Err(ApidexError::Channel("Worker terminated unexpectedly".into()));
        }
    }
    if let Some(error) = viewer.error() {
        return Err(ApidexError::query(error));
    }
    println!("{}", viewer.stats());
    Ok(())
}

async fn interactive(mut viewer: TerminalViewer, dataset: RawDataset) -> Result<()> {
    viewer.load(dataset);
    println!("API version {} (updated {})", viewer.version(), viewer.updated(Utc::now()));
    println!("Type a query; :more loads the next batch, :reset clears, :quit exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        let deadline = viewer.debounce_deadline();
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    ":quit" => break,
                    ":more" => {
                        viewer.on_visible(true);
                    }
                    ":reset" => {
                        viewer.reset();
                    }
                    text => viewer.input(text, Instant::now()),
                },
                Ok(None) => {
                    stdin_open = false;
                    if viewer.debounce_deadline().is_some() {
                        let query = viewer.query().to_string();
                        viewer.set_query(&query);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
            response = viewer.next_response() => match response {
                Some(response) => {
                    viewer.handle_response(response);
                    match viewer.error() {
                        Some(error) => println!("{error}"),
                        None if viewer.state() == ChannelState::Ready => println!("{}", viewer.stats()),
                        None => {}
                    }
                }
                None => {
                    viewer.disconnected();
                    return Err(ApidexError::Channel("Worker terminated unexpectedly".into()));
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now).into()), if deadline.is_some() => {
                viewer.tick(Instant::now());
            }
        }
        if !stdin_open && viewer.state() == ChannelState::Ready && viewer.debounce_deadline().is_none() {
            break;
        }
    }
    info!("bye");
    Ok(())
}

//! Binary entrypoint for the showcase site.

use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use carousel_showcase::caption_store::{CaptionStore, JsonCaptionStore};
use carousel_showcase::config::Configuration;
use carousel_showcase::events::{NavCommand, SlideChanged};
use carousel_showcase::session::Session;
use carousel_showcase::tasks::autoplay;
use carousel_showcase::web;

#[derive(Debug, Parser)]
#[command(name = "showcase", version, about = "Image carousel showcase site")]
struct Cli {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the page over HTTP
    Serve {
        /// Override the configured bind address
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Run the carousels headless, logging each slide; stdin accepts
    /// `next [name]`, `prev [name]` and `<name> <index>`
    Play {
        /// Stop after this long (e.g. `30s`)
        #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
        duration: Option<Duration>,
    },
    /// Print the resolved images and captions without serving anything
    Scan,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("carousel_showcase={level}")
                .parse()
                .context("building log filter")?,
        )
        .add_directive(format!("showcase={level}").parse().context("building log filter")?);
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", cli.config.display(), cfg);

    let store: Arc<dyn CaptionStore> = Arc::new(JsonCaptionStore::new(cfg.captions_path.clone()));

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(cfg.bind_address);
            let cancel = CancellationToken::new();
            spawn_ctrl_c(cancel.clone());
            web::serve(Arc::new(cfg), store, bind, cancel).await
        }
        Command::Play { duration } => run_play(&cfg, store, duration).await,
        Command::Scan => {
            let session = Session::start(&cfg, store, Instant::now());
            for named in session.carousels() {
                println!("{} (?{}=N)", named.name, named.param);
                if named.controller.is_empty() {
                    println!("  <no images>");
                }
                for (i, asset) in named.controller.items().iter().enumerate() {
                    println!(
                        "  {i:>3}  {}  {}",
                        asset.path.display(),
                        session.caption_for(asset)
                    );
                }
            }
            Ok(())
        }
    }
}

async fn run_play(
    cfg: &Configuration,
    store: Arc<dyn CaptionStore>,
    duration: Option<Duration>,
) -> Result<()> {
    let session = Session::start(cfg, store, Instant::now());
    session.log_summary();

    let (cmd_tx, cmd_rx) = mpsc::channel::<NavCommand>(16); // stdin -> autoplay
    let (shown_tx, mut shown_rx) = mpsc::channel::<SlideChanged>(64); // autoplay -> log
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    if let Some(limit) = duration {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            info!("play duration elapsed; stopping");
            cancel.cancel();
        });
    }

    // Detached so a pending stdin read never blocks shutdown.
    let default_carousel = cfg.carousels[0].name.clone();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match NavCommand::parse_line(&line, &default_carousel) {
                Some(cmd) => {
                    if cmd_tx.blocking_send(cmd).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!(input = %line.trim(), "unrecognised command"),
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(slide) = shown_rx.recv().await {
            info!(
                carousel = %slide.carousel,
                index = slide.index,
                path = %slide.path.display(),
                caption = %slide.caption,
                "slide"
            );
        }
    });

    let session = autoplay::run(session, cfg.autoplay_poll, cmd_rx, shown_tx, cancel)
        .await
        .context("autoplay task failed")?;
    printer.await.context("slide logger panicked")?;
    info!(edited_captions = session.overrides().len(), "play finished");
    Ok(())
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received; shutting down");
                cancel.cancel();
            }
            Err(err) => warn!(%err, "ctrl-c handler unavailable"),
        }
    });
}

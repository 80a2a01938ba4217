use anyhow::{Context, Result};
use bin_limiter::context::AppContext;
use bin_limiter::monitor::MonitorEvent;
use bin_limiter::platform::{self, BinGateway};
use bin_limiter::presence::PresenceState;
use bin_limiter::tui;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Empty the recycle bin automatically once it grows past a size limit
#[derive(Parser, Debug)]
#[command(name = "bin-limiter", version, about)]
struct Cli {
    /// Arm monitoring at startup with this limit in GB (1-10)
    #[arg(long, value_name = "GB")]
    limit: Option<String>,

    /// Start with the window hidden to the status line
    #[arg(long)]
    hidden: bool,

    /// Run without the control panel until Ctrl+C
    #[arg(long, requires = "limit")]
    headless: bool,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // The panel owns the terminal, so logs only go to stderr headless.
        None if cli.headless => builder.with_writer(std::io::stderr).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
    Ok(())
}

async fn run_headless(ctx: &mut AppContext, raw_limit: &str) -> Result<()> {
    let mut events = ctx.take_events().context("monitor events already taken")?;
    let config = ctx.controller.start(raw_limit)?;
    println!(
        "Monitoring the recycle bin, emptying it at {} GB. Press Ctrl+C to stop.",
        config.size_limit_gb
    );

    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.request();
        }
    });

    while let Some(event) = events.recv().await {
        match event {
            MonitorEvent::CycleCompleted { size_gb, purged: true } => {
                info!("Emptied the recycle bin at {} GB", size_gb);
            }
            MonitorEvent::CycleCompleted { .. } => {}
            MonitorEvent::QueryFailed { message } => error!("{}", message),
            MonitorEvent::PurgeFailed { message } => warn!("Could not empty the bin: {}", message),
            MonitorEvent::Stopped => break,
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("bin-limiter-worker")
        .build()
        .context("failed to start the async runtime")?;

    let gateway: Arc<dyn BinGateway> = Arc::new(platform::system_bin()?);
    let initial = if cli.hidden {
        PresenceState::Hidden
    } else {
        PresenceState::Visible
    };
    let mut ctx = AppContext::new(gateway, runtime.handle().clone(), initial);
    info!("bin-limiter v{} started", env!("CARGO_PKG_VERSION"));

    let result = match (&cli.limit, cli.headless) {
        (Some(limit), true) => runtime.block_on(run_headless(&mut ctx, limit)),
        _ => {
            let tray = ctx.install_presence().context("failed to create the status presence")?;
            tui::run_tui(&mut ctx, tray, cli.limit.as_deref()).context("control panel failed")
        }
    };

    ctx.exit();
    // An in-flight size query or purge must not hold the process open.
    runtime.shutdown_background();
    result
}

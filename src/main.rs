use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rs232_session::constants::DEFAULT_BAUD_RATE;
use rs232_session::{LinkConfig, SessionConfig, SessionError, SessionFiles, SessionReport, open_session, run_with_files};

/// Send a key, stream ciphertext blocks and a trailer to a serial-attached device,
/// writing its per-block responses to the output file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port the device is attached to (e.g. /dev/ttyUSB0 or COM3).
    port: String,
    /// Directory holding key.bin, enc1.bin, end.bin and receiving dec1.bin.
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
    /// Key file, overrides <DIR>/key.bin.
    #[arg(long)]
    key: Option<PathBuf>,
    /// Ciphertext file, overrides <DIR>/enc1.bin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Response file, overrides <DIR>/dec1.bin.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Trailer file, overrides <DIR>/end.bin.
    #[arg(long)]
    trailer: Option<PathBuf>,
    /// Deadline for each block response in milliseconds; 0 waits forever.
    #[arg(short, long, default_value_t = 5000)]
    timeout_ms: u64,
    /// Serial line speed.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

impl Cli {
    fn session_files(&self) -> SessionFiles {
        let mut files = SessionFiles::in_dir(&self.dir);
        if let Some(ref key) = self.key {
            files.key = key.clone();
        }
        if let Some(ref input) = self.input {
            files.ciphertext = input.clone();
        }
        if let Some(ref output) = self.output {
            files.output = output.clone();
        }
        if let Some(ref trailer) = self.trailer {
            files.trailer = trailer.clone();
        }
        files
    }

    fn session_config(&self) -> SessionConfig {
        let read_timeout = match self.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        SessionConfig::default().with_read_timeout(read_timeout)
    }
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG (hex dumps of link traffic) with -v.
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;
    let output = cli.session_files().output;

    // The session does blocking serial I/O, keep it off the async workers so
    // Ctrl+C is still observed while a read is pending.
    let session = tokio::task::spawn_blocking(move || run(cli));

    let code = tokio::select! {
        res = session => match res {
            Ok(Ok(report)) => {
                info!(
                    blocks = report.blocks,
                    response_bytes = report.response_bytes,
                    trailer_bytes = report.trailer_bytes,
                    "Done"
                );
                0
            }
            Ok(Err(e)) => {
                error!("Session failed: {:?}", e);
                e.downcast_ref::<SessionError>().map_or(1, SessionError::exit_code)
            }
            Err(e) => {
                error!("Session task panicked: {}", e);
                1
            }
        },
        _ = signal::ctrl_c() => {
            warn!("Ctrl+C received, aborting session; {:?} may be incomplete", output);
            130
        }
    };

    // Flush the file appender before leaving.
    drop(guard);
    // A blocked serial read cannot be cancelled, so exit without waiting on it.
    process::exit(code);
}

fn run(cli: Cli) -> Result<SessionReport> {
    let files = cli.session_files();
    let config = cli.session_config();
    let link_config = LinkConfig::default().with_baud_rate(cli.baud);

    let report = run_with_files(&files, config, || open_session(&cli.port, &link_config))
        .with_context(|| format!("Session on {} failed", cli.port))?;
    Ok(report)
}

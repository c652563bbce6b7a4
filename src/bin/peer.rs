//! Vigil Peer Process
//!
//! Runs one half of the mutual-watchdog pair. Each peer listens on its own
//! socket, keeps a binding open to its counterpart, relaunches the
//! counterpart when that binding drops, and converges on the newest
//! configuration record pushed over a wakeup.
//!
//! Usage:
//!   vigil-peer --role <local|remote> [--dir <path>] [--config <path>]
//!
//! The peer adopts its record from, in order: the --config start payload,
//! the persisted snapshot in the runtime directory, or defaults until the
//! first wakeup arrives.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use tokio::sync::mpsc;

use vigil::config::SnapshotStore;
use vigil::peer::{Command, PeerController, PeerRole, ProcessLauncher};
use vigil::presenter::create_presenter;
use vigil::RuntimePaths;

/// Command line arguments
struct Args {
    /// Which peer this process serves
    role: PeerRole,
    /// Runtime directory holding sockets and state files
    dir: Option<PathBuf>,
    /// Explicit start payload
    config: Option<PathBuf>,
    /// Enable verbose logging
    debug: bool,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let mut role = None;
        let mut dir = None;
        let mut config = None;
        let mut debug = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--role" | "-r" => {
                    role = args
                        .next()
                        .map(|value| PeerRole::from_str(&value))
                        .transpose()?;
                }
                "--dir" | "-d" => {
                    dir = args.next().map(PathBuf::from);
                }
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--debug" => {
                    debug = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("Unknown argument: {}", arg));
                }
            }
        }

        let role = role.ok_or("--role is required")?;

        Ok(Self {
            role,
            dir,
            config,
            debug,
        })
    }
}

fn print_help() {
    println!(
        r#"Vigil Peer - mutual-watchdog service process

USAGE:
    vigil-peer [OPTIONS] --role <local|remote>

OPTIONS:
    -r, --role <ROLE>      Which peer this process serves (required)
    -d, --dir <PATH>       Runtime directory for sockets and state files
    -c, --config <PATH>    Start payload to adopt before binding
        --debug            Enable verbose logging
    -h, --help             Print this help message

DESCRIPTION:
    Each peer binds to its counterpart's socket, launching the counterpart
    process if it is absent. Losing the binding means the counterpart died;
    the survivor relaunches it and rebinds. On every fresh connect the
    current configuration record is pushed so both sides converge on the
    newest one, whichever of them restarted.
"#
    );
}

fn init_logging(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run_peer(args: Args) -> anyhow::Result<()> {
    let paths = args.dir.clone().map(RuntimePaths::new).unwrap_or_default();
    let storage = SnapshotStore::new(&paths);

    // Start payload, persisted snapshot, or nothing. A peer holding no
    // record presents defaults and waits for the first wakeup.
    let initial = match &args.config {
        Some(path) => Some(
            SnapshotStore::at(path)
                .load()
                .context("Failed to read start payload")?
                .with_context(|| format!("Start payload not found: {}", path.display()))?,
        ),
        None => match storage.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable snapshot");
                None
            }
        },
    };

    let debug = args.debug || initial.as_ref().is_some_and(|c| c.behavior.debug);
    let launcher = ProcessLauncher::from_current_exe()
        .context("Failed to resolve the peer executable")?
        .debug(debug);

    let mut controller = PeerController::new(
        args.role,
        paths.clone(),
        Box::new(launcher),
        create_presenter(&paths),
    );
    if let Some(record) = initial {
        controller = controller.with_start_payload(record);
    }

    let (commands, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested");
            let _ = commands.send(Command::Stop).await;
        }
    });

    tracing::info!(role = %args.role, dir = %paths.base().display(), "Peer starting");
    controller.run(rx).await.context("Peer controller failed")?;
    Ok(())
}

fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(args.debug);

    // Lifecycle events are handled serially on one thread, mirroring the
    // platform's single service-callback thread
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_peer(args)) {
        tracing::error!("Peer failed: {:#}", e);
        std::process::exit(1);
    }
}

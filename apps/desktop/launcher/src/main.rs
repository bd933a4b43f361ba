use launcher::error::LauncherError;
use launcher::forward::forward_args;
use launcher::logger::initialize as LoggerInitialize;
use launcher::serve::serve_until;
use launcher::{APP_NAME, APP_VERSION};

use common::ErrorLocation;

use pipe_core::{PipeBuilder, PipeConfig, Role};

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use log::{error, info, warn};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), LauncherError> {
    let log_dir = app_dir(dirs::data_local_dir(), "data")?;
    create_dir_all(&log_dir).map_err(|e| LauncherError::Launcher {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;
    info!("{APP_NAME} {APP_VERSION} starting");

    let config_dir = app_dir(dirs::config_dir(), "config")?;
    let config = PipeConfig::load(&config_dir)?;

    let args: Vec<String> = env::args().skip(1).collect();
    let pipe = PipeBuilder::default()
        .with_app_name(APP_NAME)
        .with_app_version(APP_VERSION)
        .with_args(args.iter().cloned())
        .with_config(config.clone())
        .build()?;

    match pipe.role() {
        Role::Connector => {
            if args.is_empty() {
                info!("{APP_NAME} is already running at {}", pipe.path());
                return Ok(());
            }

            match forward_args(&pipe, &args, config.send_retry_budget()) {
                Ok(count) => {
                    info!("Handed {count} argument(s) to the running instance");
                    Ok(())
                }
                Err(e) => {
                    warn!("{e}");
                    warn!("Running independently");
                    args.iter().for_each(|arg| open(arg));
                    Ok(())
                }
            }
        }
        Role::Listener => {
            if pipe.path_was_forced() {
                warn!("Listening on fallback pipe {}", pipe.path());
            }
            args.iter().for_each(|arg| open(arg));

            let stop = AtomicBool::new(false);
            serve_until(&pipe, &stop, |arg| open(&arg));
            Ok(())
        }
    }
}

#[track_caller]
fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf, LauncherError> {
    base.map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| LauncherError::Launcher {
            message: format!("No {kind} directory available on this platform"),
            location: ErrorLocation::from(Location::caller()),
        })
}

fn open(arg: &str) {
    info!("Opening {arg}");
}

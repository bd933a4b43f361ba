//! Candidate directories for Unix pipe files.
//!
//! Lookup order:
//! 1. `PipeConfig::pipe_dir` (explicit override, exclusive)
//! 2. `PIPE_CORE_DIR` environment variable (exclusive)
//! 3. Per-user runtime directory via `dirs` (`$XDG_RUNTIME_DIR`)
//! 4. `{config dir}/{app}/pipes` (`{data dir}` on macOS)

use crate::PIPE_DIR_ENV;
use crate::config::PipeConfig;

use std::env;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

const PIPES_SUBDIR: &str = "pipes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeDir {
    pub path: PathBuf,
    pub source: PathSource,
}

/// How a pipe directory was chosen (for logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Config,
    EnvVar,
    RuntimeDir,
    AppDir,
}

impl Display for PathSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            PathSource::Config => write!(f, "pipe config"),
            PathSource::EnvVar => write!(f, "{PIPE_DIR_ENV}"),
            PathSource::RuntimeDir => write!(f, "runtime dir"),
            PathSource::AppDir => write!(f, "app dir"),
        }
    }
}

/// Directories that may hold the pipe file, most preferred first.
pub fn candidate_dirs(app_name: &str, config: &PipeConfig) -> Vec<PipeDir> {
    if let Some(dir) = &config.pipe_dir {
        debug!("Using pipe dir from config: {}", dir.display());
        return vec![PipeDir {
            path: dir.clone(),
            source: PathSource::Config,
        }];
    }

    if let Ok(dir) = env::var(PIPE_DIR_ENV)
        && !dir.trim().is_empty()
    {
        info!("Using {PIPE_DIR_ENV} override: {dir}");
        return vec![PipeDir {
            path: PathBuf::from(dir),
            source: PathSource::EnvVar,
        }];
    }

    let mut candidates = Vec::new();

    if let Some(runtime) = dirs::runtime_dir() {
        candidates.push(PipeDir {
            path: runtime,
            source: PathSource::RuntimeDir,
        });
    }

    #[cfg(target_os = "macos")]
    let app_base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let app_base = dirs::config_dir();

    if let Some(base) = app_base {
        candidates.push(PipeDir {
            path: base.join(app_name).join(PIPES_SUBDIR),
            source: PathSource::AppDir,
        });
    }

    candidates
}

/// Make sure `dir` exists. Directories created here are private to the user.
pub fn prepare_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    debug!("Created pipe dir {}", dir.display());
    Ok(())
}

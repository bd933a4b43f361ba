//! Test helpers for pipe integration tests.
//!
//! Every test gets a unique short app name and its own pipe directory, so
//! tests never meet each other or a real running instance.

use pipe_core::message::is_application_message;
use pipe_core::{Pipe, PipeBuilder, PipeConfig};

use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use uuid::Uuid;

pub const TEST_VERSION: &str = "1.0";
pub const TEST_USER: &str = "t";
pub const MAX_ATTEMPTS: usize = 2_000;

const RETRY_SLEEP: Duration = Duration::from_millis(1);

/// Short enough that fallback socket paths stay under the Unix path limit.
pub fn unique_app_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("pt-{}", &id[..8])
}

pub fn test_config(dir: &Path) -> PipeConfig {
    PipeConfig {
        pipe_dir: Some(dir.to_path_buf()),
        ..PipeConfig::default()
    }
}

pub fn builder(app_name: &str, dir: &Path) -> PipeBuilder {
    PipeBuilder::default()
        .with_app_name(app_name)
        .with_app_version(TEST_VERSION)
        .with_user_scope(TEST_USER)
        .with_config(test_config(dir))
}

/// Caller-side retry loop: keep sending until accepted or attempts run out.
pub fn send_until_accepted(writer: &Pipe, message: &str) -> bool {
    for _ in 0..MAX_ATTEMPTS {
        if writer.send_to_pipe(message) {
            return true;
        }
        sleep(RETRY_SLEEP);
    }
    false
}

/// Caller-side read loop: poll until a real message arrives or attempts run out.
pub fn receive_one(listener: &Pipe) -> Option<String> {
    for _ in 0..MAX_ATTEMPTS {
        if let Some(message) = listener
            .read_from_pipe()
            .into_iter()
            .find(|m| is_application_message(m))
        {
            return Some(message);
        }
    }
    None
}

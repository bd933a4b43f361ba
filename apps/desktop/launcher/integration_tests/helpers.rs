use pipe_core::{Pipe, PipeBuilder, PipeConfig};

use std::path::Path;

pub const TEST_APP: &str = "launcher-test";
pub const TEST_VERSION: &str = "1.0";

/// Every test passes its own directory, so a fixed app name never collides.
pub fn pipe_in(dir: &Path, args: &[&str]) -> Pipe {
    PipeBuilder::default()
        .with_app_name(TEST_APP)
        .with_app_version(TEST_VERSION)
        .with_user_scope("t")
        .with_args(args.iter().copied())
        .with_config(PipeConfig {
            pipe_dir: Some(dir.to_path_buf()),
            ..PipeConfig::default()
        })
        .build()
        .unwrap()
}

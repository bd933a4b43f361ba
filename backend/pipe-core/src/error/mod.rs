pub mod config;
pub mod frame;
pub mod pipe;

pub use config::ConfigError;
pub use frame::FrameError;
pub use pipe::PipeError;

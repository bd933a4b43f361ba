mod codec;
mod config;
mod identity;
mod message;
mod paths;

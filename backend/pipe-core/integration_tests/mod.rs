mod error;
mod pipe;

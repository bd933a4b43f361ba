mod helpers;
mod protocol;
mod validation;

#[cfg(unix)]
mod collision;

#[cfg(windows)]
mod named_pipe;

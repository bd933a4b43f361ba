use crate::address;
use crate::config::PipeConfig;
use crate::error::PipeError;
use crate::identity;
use crate::message::Message;
use crate::pipe::Pipe;

use common::ErrorLocation;

use std::panic::Location;

use log::info;

/// Builder for [`Pipe`].
///
/// Validation happens in [`build`](Self::build), before any OS resource is touched.
#[derive(Debug, Default)]
pub struct PipeBuilder {
    app_name: Option<String>,
    app_version: Option<String>,
    user_scope: Option<String>,
    args: Vec<String>,
    forced_path: Option<String>,
    config: Option<PipeConfig>,
}

impl PipeBuilder {
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Scope the channel to a user or session other than the current user.
    pub fn with_user_scope(mut self, scope: impl Into<String>) -> Self {
        self.user_scope = Some(scope.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Use `path` verbatim instead of deriving one. An empty path is ignored.
    pub fn with_forced_path(mut self, path: impl Into<String>) -> Self {
        self.forced_path = Some(path.into());
        self
    }

    pub fn with_config(mut self, config: PipeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate, resolve the address and open the backend.
    #[track_caller]
    pub fn build(self) -> Result<Pipe, PipeError> {
        let app_name = self.app_name.ok_or_else(|| PipeError::InvalidAppData {
            message: String::from("App name is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let app_version = self.app_version.ok_or_else(|| PipeError::InvalidAppData {
            message: String::from("App version is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let identity = match &self.user_scope {
            Some(scope) => identity::resolve_for_user(&app_name, &app_version, scope)?,
            None => identity::resolve(&app_name, &app_version)?,
        };

        validate_args(&self.args)?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let resolution = address::resolve_address(
            &identity,
            self.forced_path.as_deref(),
            &self.args,
            &config,
        )?;

        info!(
            "Pipe for {} ready at {} as {:?} (forced: {})",
            identity.channel_name(),
            resolution.address.path(),
            resolution.role,
            resolution.address.is_forced()
        );

        Ok(Pipe::from_parts(
            identity,
            resolution.address,
            resolution.role,
            self.args,
            config.poll_window(),
            resolution.backend,
        ))
    }
}

/// Every argument must be deliverable: non-empty, no NUL, not a reserved string.
#[track_caller]
fn validate_args(args: &[String]) -> Result<(), PipeError> {
    for (position, arg) in args.iter().enumerate() {
        if arg.is_empty() {
            return Err(PipeError::InvalidArgs {
                message: format!("Argument {position} is empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if Message::is_reserved(arg) || arg.contains('\0') {
            return Err(PipeError::InvalidArgs {
                message: format!("Argument {position} collides with a reserved pipe message"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    Ok(())
}
